//! Unit tests for the network creation workflow

#[cfg(test)]
mod tests {
    use crate::config::ProvisionerConfig;
    use crate::error::ProvisionError;
    use crate::partition::PartitionRequest;
    use crate::store::NetworkStore;
    use crate::test_utils::*;
    use ipam_client::IpamCall;
    use netctl_client::NetCtlCall;

    fn request(cidr: &str, num_networks: u32, network_size: u32, tenant_id: Option<&str>) -> PartitionRequest {
        PartitionRequest {
            label: "net".to_string(),
            cidr: cidr.parse().unwrap(),
            num_networks,
            network_size,
            cidr_v6: None,
            gateway_v6: None,
            tenant_id: tenant_id.map(|t| t.to_string()),
            priority: None,
            multi_host: false,
            bridge: None,
            bridge_interface: None,
            dns1: None,
            dns2: None,
            vpn: None,
        }
    }

    fn created_networks(calls: &[NetCtlCall]) -> Vec<String> {
        calls
            .iter()
            .filter_map(|c| match c {
                NetCtlCall::CreateNetwork { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_tenant_networks_share_private_backend_network() {
        let h = harness(test_config());

        let created = h
            .provisioner
            .create_networks(&request("10.1.0.0/20", 2, 256, Some("t1")))
            .await
            .unwrap();

        assert_eq!(created.len(), 2);
        assert_eq!(created[0].label, "net_0");
        assert_eq!(created[1].cidr.to_string(), "10.1.1.0/24");
        assert_eq!(created[0].backend_handle, created[1].backend_handle);
        assert_eq!(created_networks(&h.netctl.calls()), vec!["t1_private"]);

        let blocks: Vec<IpamCall> = h.ipam.calls();
        assert_eq!(
            blocks[0],
            IpamCall::CreateBlock {
                network_id: created[0].id,
                cidr: "10.1.0.0/24".to_string(),
                tenant_id: Some("t1".to_string()),
                dns1: None,
                dns2: None,
            }
        );
        assert_eq!(h.ipam.blocks_of(created[1].id), vec!["10.1.1.0/24"]);
    }

    #[tokio::test]
    async fn test_existing_private_network_is_reused() {
        let h = harness(test_config());
        h.netctl.add_network("t1", "pre-existing", "t1_private");

        let created = h
            .provisioner
            .create_networks(&request("10.1.0.0/24", 1, 256, Some("t1")))
            .await
            .unwrap();

        assert_eq!(created[0].backend_handle.as_deref(), Some("pre-existing"));
        assert!(created_networks(&h.netctl.calls()).is_empty());
    }

    #[tokio::test]
    async fn test_configured_existing_network_is_verified() {
        let h = harness(ProvisionerConfig {
            existing_network_id: Some("uuid-1".to_string()),
            ..test_config()
        });
        h.netctl.add_network("default", "uuid-1", "shared");

        let created = h
            .provisioner
            .create_networks(&request("10.1.0.0/24", 1, 256, Some("t1")))
            .await
            .unwrap();
        assert_eq!(created[0].backend_handle.as_deref(), Some("uuid-1"));
        assert!(created_networks(&h.netctl.calls()).is_empty());
    }

    #[tokio::test]
    async fn test_configured_existing_network_missing() {
        let h = harness(ProvisionerConfig {
            existing_network_id: Some("uuid-missing".to_string()),
            ..test_config()
        });

        let result = h
            .provisioner
            .create_networks(&request("10.1.0.0/24", 1, 256, Some("t1")))
            .await;
        assert!(matches!(result, Err(ProvisionError::NotFound(_))));
        assert!(h.store.list_networks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_conflict_aborts_rest_of_batch() {
        let h = harness(test_config());
        h.provisioner
            .create_networks(&request("10.0.1.0/24", 1, 256, Some("t1")))
            .await
            .unwrap();

        let result = h
            .provisioner
            .create_networks(&request("10.0.0.0/22", 3, 256, Some("t1")))
            .await;

        assert!(matches!(result, Err(ProvisionError::Conflict(_))));
        let cidrs: Vec<String> = h
            .store
            .list_networks()
            .await
            .unwrap()
            .iter()
            .map(|n| n.cidr.to_string())
            .collect();
        assert_eq!(cidrs, vec!["10.0.1.0/24", "10.0.0.0/24"]);
    }

    #[tokio::test]
    async fn test_shared_networks_need_priority() {
        let h = harness(test_config());
        let result = h
            .provisioner
            .create_networks(&request("77.1.0.0/24", 1, 256, None))
            .await;
        assert!(matches!(result, Err(ProvisionError::Validation(_))));

        let mut shared = request("77.1.0.0/24", 1, 256, Some("0"));
        shared.priority = Some(2);
        let created = h.provisioner.create_networks(&shared).await.unwrap();
        assert_eq!(created[0].tenant_id, None);
        assert_eq!(created[0].priority, Some(2));
        assert_eq!(created_networks(&h.netctl.calls()), vec!["net"]);
        assert!(matches!(&h.ipam.calls()[0], IpamCall::CreateBlock { tenant_id: None, .. }));
    }

    #[tokio::test]
    async fn test_v6_blocks_are_registered() {
        let h = harness(ProvisionerConfig {
            use_ipv6: true,
            ..test_config()
        });
        let mut req = request("10.1.0.0/20", 2, 256, Some("t1"));
        req.cidr_v6 = Some("fe::/60".parse().unwrap());
        req.dns1 = Some("8.8.8.8".parse().unwrap());

        let created = h.provisioner.create_networks(&req).await.unwrap();

        assert_eq!(h.ipam.blocks_of(created[1].id), vec!["10.1.1.0/24", "fe:0:0:1::/64"]);
        assert!(h.ipam.calls().iter().all(|c| matches!(
            c,
            IpamCall::CreateBlock { dns1: Some(d), .. } if d == "8.8.8.8"
        )));
    }

    #[tokio::test]
    async fn test_created_networks_can_be_provisioned() {
        let h = harness(test_config());
        h.provisioner
            .create_networks(&request("10.1.0.0/24", 1, 256, Some("t1")))
            .await
            .unwrap();

        let report = h
            .provisioner
            .allocate_for_instance(&crate::provisioner::allocate::InstanceRequest {
                instance_id: "inst-1".to_string(),
                tenant_id: "t1".to_string(),
                flavor: Default::default(),
            })
            .await
            .unwrap();
        assert_eq!(report.descriptors.len(), 1);
        assert_eq!(report.descriptors[0].configuration.ips[0].ip, "10.1.0.2");
    }
}
