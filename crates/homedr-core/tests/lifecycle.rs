//! End-to-end lifecycle: events in both regions feed the mapping stores, then
//! a failover recovers the workspace under the secondary owner id.

mod common;

use common::{TestDeployment, PRIMARY_DOMAIN, PRIMARY_REGION, SECONDARY_DOMAIN, SECONDARY_REGION};
use homedr_core::{
    MappingStore, ProfileEvent, ProfileStatus, ReplicaOutcome, SyncOutcome, REPLICA_PARAMETER_NAME,
};
use serde_json::json;
use std::fs;
use std::sync::Arc;

fn event(name: &str, region: &str, domain: &str, profile: &str) -> ProfileEvent {
    ProfileEvent::from_json(&json!({
        "time": "2024-03-01T10:00:05Z",
        "region": region,
        "detail": {
            "eventName": name,
            "eventTime": "2024-03-01T10:00:00Z",
            "requestParameters": {
                "domainId": domain,
                "userProfileName": profile
            }
        }
    }))
    .unwrap()
}

#[tokio::test]
async fn test_events_then_failover() {
    let d = TestDeployment::new().await;
    d.primary_profiles
        .add_profile(PRIMARY_DOMAIN, "sagemaker-user-7", "1001", ProfileStatus::InService)
        .await;
    d.secondary_profiles
        .add_profile(SECONDARY_DOMAIN, "sagemaker-user-7", "2001", ProfileStatus::InService)
        .await;

    let outcome = d
        .primary_maintainer()
        .handle(&event("CreateUserProfile", PRIMARY_REGION, PRIMARY_DOMAIN, "sagemaker-user-7"))
        .await
        .unwrap();
    let replica = match outcome.replica {
        Some(ReplicaOutcome::Created(config)) => config,
        other => panic!("unexpected replica outcome {:?}", other),
    };
    assert_eq!(
        d.parameters.get(REPLICA_PARAMETER_NAME).await,
        Some(replica.destination_volume_id)
    );

    d.secondary_maintainer()
        .handle(&event(
            "CreateUserProfile",
            SECONDARY_REGION,
            SECONDARY_DOMAIN,
            "sagemaker-user-7",
        ))
        .await
        .unwrap();
    assert_eq!(d.replication.create_calls(), 1);

    d.write_source("1001/notebook.ipynb", "{}");
    let report = d.synchronizer().run().await.unwrap();
    assert!(matches!(report.profiles[0].outcome, SyncOutcome::Synced { .. }));
    assert_eq!(
        fs::read_to_string(d.target_root().join("2001/notebook.ipynb")).unwrap(),
        "{}"
    );
}

#[tokio::test]
async fn test_create_then_delete_clears_both_regions() {
    let d = TestDeployment::new().await;
    d.primary_profiles
        .add_profile(PRIMARY_DOMAIN, "u", "1001", ProfileStatus::InService)
        .await;
    d.secondary_profiles
        .add_profile(SECONDARY_DOMAIN, "u", "2001", ProfileStatus::InService)
        .await;

    let primary = d.primary_maintainer();
    let secondary = d.secondary_maintainer();
    primary
        .handle(&event("CreateUserProfile", PRIMARY_REGION, PRIMARY_DOMAIN, "u"))
        .await
        .unwrap();
    secondary
        .handle(&event("CreateUserProfile", SECONDARY_REGION, SECONDARY_DOMAIN, "u"))
        .await
        .unwrap();
    primary
        .handle(&event("DeleteUserProfile", PRIMARY_REGION, PRIMARY_DOMAIN, "u"))
        .await
        .unwrap();
    secondary
        .handle(&event("DeleteUserProfile", SECONDARY_REGION, SECONDARY_DOMAIN, "u"))
        .await
        .unwrap();

    assert!(d.primary_store.get("u").await.unwrap().is_none());
    assert!(d.secondary_store.get("u").await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_primary_events_single_replica() {
    let d = TestDeployment::new().await;
    for i in 0..16 {
        d.primary_profiles
            .add_profile(
                PRIMARY_DOMAIN,
                &format!("user-{}", i),
                &format!("{}", 1000 + i),
                ProfileStatus::InService,
            )
            .await;
    }
    let maintainer = Arc::new(d.primary_maintainer());

    let mut handles = Vec::new();
    for i in 0..16 {
        let m = maintainer.clone();
        handles.push(tokio::spawn(async move {
            let ev = event(
                "CreateUserProfile",
                PRIMARY_REGION,
                PRIMARY_DOMAIN,
                &format!("user-{}", i),
            );
            m.handle(&ev).await
        }));
    }
    for h in handles {
        h.await.unwrap().unwrap();
    }

    assert_eq!(d.replication.config_count().await, 1);
    assert_eq!(d.parameters.put_count(), 1);
    assert_eq!(d.primary_store.len().await, 16);
}
