//! Unit tests for per-instance teardown

#[cfg(test)]
mod tests {
    use crate::provisioner::allocate::InstanceRequest;
    use crate::store::NetworkStore;
    use crate::test_utils::*;
    use ipam_client::IpamCall;
    use netctl_client::NetCtlCall;

    fn request(instance_id: &str, tenant_id: &str) -> InstanceRequest {
        InstanceRequest {
            instance_id: instance_id.to_string(),
            tenant_id: tenant_id.to_string(),
            flavor: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_teardown_releases_everything_allocated() {
        let h = harness(test_config());
        h.seed_network("public", None, Some(1), "77.1.0.0/24").await;
        h.seed_network("private", Some("t1"), None, "10.1.1.0/24").await;
        h.provisioner.allocate_for_instance(&request("inst-1", "t1")).await.unwrap();

        let report = h.provisioner.deallocate_for_instance("inst-1").await.unwrap();

        assert_eq!(report.interfaces_removed, 2);
        assert_eq!(report.ports_removed, 2);
        assert_eq!(report.releases, 2);
        assert!(report.failures.is_empty());
        assert!(h.store.vifs_for_instance("inst-1").await.unwrap().is_empty());
        assert!(h.netctl.port_ids().is_empty());
        assert_eq!(h.ipam.live_allocation_count(), 0);

        // Every allocation has a release with the same (network, interface, tenant)
        let calls = h.ipam.calls();
        let allocated: Vec<_> = calls
            .iter()
            .filter_map(|c| match c {
                IpamCall::Allocate { network_id, vif_id, tenant_id, .. } => Some((*network_id, *vif_id, tenant_id.clone())),
                _ => None,
            })
            .collect();
        let released: Vec<_> = calls
            .iter()
            .filter_map(|c| match c {
                IpamCall::Deallocate { network_id, vif_id, tenant_id } => Some((*network_id, *vif_id, tenant_id.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(allocated, released);
    }

    #[tokio::test]
    async fn test_teardown_twice_is_a_no_op() {
        let h = harness(test_config());
        h.seed_network("private", Some("t1"), None, "10.1.1.0/24").await;
        h.provisioner.allocate_for_instance(&request("inst-1", "t1")).await.unwrap();
        h.provisioner.deallocate_for_instance("inst-1").await.unwrap();
        h.netctl.clear_calls();
        h.ipam.clear_calls();

        let report = h.provisioner.deallocate_for_instance("inst-1").await.unwrap();

        assert_eq!(report.interfaces_removed, 0);
        assert!(report.failures.is_empty());
        assert!(h.netctl.calls().is_empty());
        assert!(h.ipam.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_port_is_not_fatal() {
        let h = harness(test_config());
        let private = h.seed_network("private", Some("t1"), None, "10.1.1.0/24").await;
        // Interface recorded but never plugged
        h.store.create_vif("inst-1", private.id, "02:16:3e:00:00:01").await.unwrap();

        let report = h.provisioner.deallocate_for_instance("inst-1").await.unwrap();

        assert_eq!(report.ports_removed, 0);
        assert_eq!(report.releases, 1);
        assert!(report.failures.is_empty());
        assert_eq!(report.interfaces_removed, 1);
        assert!(!h.netctl.calls().iter().any(|c| matches!(c, NetCtlCall::DeletePort { .. })));
    }

    #[tokio::test]
    async fn test_port_lookup_is_retried() {
        let h = harness(test_config());
        h.seed_network("private", Some("t1"), None, "10.1.1.0/24").await;
        h.provisioner.allocate_for_instance(&request("inst-1", "t1")).await.unwrap();
        h.netctl.fail_next_reads(1);

        let report = h.provisioner.deallocate_for_instance("inst-1").await.unwrap();

        assert_eq!(report.ports_removed, 1);
        assert!(report.failures.is_empty());
        let lookups = h
            .netctl
            .calls()
            .iter()
            .filter(|c| matches!(c, NetCtlCall::FindPortByAttachment { .. }))
            .count();
        assert_eq!(lookups, 2);
    }

    #[tokio::test]
    async fn test_backend_failures_are_recorded_and_records_still_deleted() {
        let h = harness(crate::config::ProvisionerConfig {
            read_retries: 1,
            ..test_config()
        });
        h.seed_network("private", Some("t1"), None, "10.1.1.0/24").await;
        h.provisioner.allocate_for_instance(&request("inst-1", "t1")).await.unwrap();
        h.netctl.fail_next_reads(1);

        let report = h.provisioner.deallocate_for_instance("inst-1").await.unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.releases, 1);
        assert_eq!(report.interfaces_removed, 1);
        assert!(h.store.vifs_for_instance("inst-1").await.unwrap().is_empty());
    }
}
