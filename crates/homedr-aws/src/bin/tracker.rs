//! Lambda entrypoint: one invocation per SageMaker user profile event.

use anyhow::Result;
use clap::Parser;
use homedr_aws::cli::TrackerArgs;
use homedr_aws::{
    sdk, telemetry, DynamoMappingStore, EfsReplicationApi, SageMakerProfileService,
    SsmParameterStore,
};
use homedr_core::{MappingMaintainer, ProfileEvent, ReplicaProvisioner, TrackerClients};
use lambda_runtime::{service_fn, LambdaEvent};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();

    let config = TrackerArgs::parse().into_config()?;
    tracing::info!(
        table = %config.table_name,
        primary_region = %config.primary_region,
        secondary_region = %config.secondary_region,
        "uid tracker starting"
    );

    let sdk_config = sdk::load_config().await;
    let clients = TrackerClients {
        store: Arc::new(DynamoMappingStore::new(
            &sdk_config,
            config.table_name.clone(),
            config.table_primary_key.clone(),
        )),
        profiles: Arc::new(SageMakerProfileService::new(&sdk_config)),
        replication: Arc::new(EfsReplicationApi::new(&sdk_config)),
        parameters: Arc::new(SsmParameterStore::new(&sdk_config)),
    };
    let provisioner = ReplicaProvisioner::new(
        clients.profiles.clone(),
        clients.replication.clone(),
        clients.parameters.clone(),
        config.secondary_region.clone(),
    )
    .with_parameter_name(config.replica_parameter_name.clone());
    tracing::debug!(parameter = provisioner.parameter_name(), "replica id parameter");

    let mut maintainer = MappingMaintainer::new(
        clients,
        config.primary_region.clone(),
        config.secondary_region.clone(),
    )
    .with_provisioner(provisioner);
    if config.timeout_secs > 0 {
        maintainer = maintainer.with_timeout(Duration::from_secs(config.timeout_secs));
    }
    let maintainer = Arc::new(maintainer);

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let maintainer = maintainer.clone();
        async move { handle(&maintainer, event).await }
    }))
    .await
    .map_err(|e| anyhow::anyhow!("lambda runtime error: {}", e))
}

async fn handle(
    maintainer: &MappingMaintainer,
    event: LambdaEvent<Value>,
) -> std::result::Result<Value, lambda_runtime::Error> {
    let request_id = event.context.request_id.clone();
    let profile_event = ProfileEvent::from_json(&event.payload).map_err(|e| {
        tracing::error!(request_id = %request_id, error = %e, "rejecting event");
        e
    })?;
    tracing::info!(
        request_id = %request_id,
        event = ?profile_event.kind,
        profile = %profile_event.profile_name,
        region = %profile_event.origination_region,
        "handling event"
    );

    match maintainer.handle(&profile_event).await {
        Ok(outcome) => Ok(serde_json::to_value(&outcome)?),
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                profile = %profile_event.profile_name,
                error = %e,
                "event handling failed"
            );
            Err(e.into())
        }
    }
}
