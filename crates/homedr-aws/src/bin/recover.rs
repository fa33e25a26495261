//! Failover job: merge replicated primary home directories into the
//! secondary domain's home volume.

use anyhow::{bail, Result};
use clap::Parser;
use homedr_aws::cli::RecoverArgs;
use homedr_aws::{sdk, telemetry, DynamoMappingStore, SageMakerProfileService};
use homedr_core::{LocalFs, RecoveryClients, RecoverySynchronizer};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();

    let args = RecoverArgs::parse();
    let config = args.to_config()?;
    tracing::info!(
        domain_id = %config.secondary_domain_id,
        source = %config.source_root.display(),
        target = %config.target_root.display(),
        dry_run = config.dry_run,
        "workspace recovery starting"
    );

    let sdk_config = sdk::load_config().await;
    let clients = RecoveryClients {
        primary_store: Arc::new(DynamoMappingStore::new(
            &sdk_config,
            config.primary_table.clone(),
            config.table_primary_key.clone(),
        )),
        secondary_store: Arc::new(DynamoMappingStore::new(
            &sdk_config,
            config.secondary_table.clone(),
            config.table_primary_key.clone(),
        )),
        profiles: Arc::new(SageMakerProfileService::new(&sdk_config)),
    };

    let synchronizer = RecoverySynchronizer::new(clients, Arc::new(LocalFs::new()), config);
    let report = synchronizer.run().await?;

    println!("{}", report.summary());
    for name in report.failed_profiles() {
        tracing::warn!(profile = name, "profile needs attention");
    }
    if let Some(path) = &args.report {
        report.write_json(path)?;
        tracing::info!(path = %path.display(), "report written");
    }

    if args.fail_on_profile_error && report.has_failures() {
        bail!("{} profile(s) failed", report.failed_count());
    }
    Ok(())
}
