#![warn(missing_docs)]

//! AWS adapters for HomeDR: the UID tracker table on DynamoDB, SageMaker
//! profile lookups, EFS replication and SSM parameters, plus the shared
//! configuration and tracing setup of the `homedr-tracker` and
//! `homedr-recover` binaries.

pub mod cli;
pub mod dynamo;
pub mod efs;
pub mod sagemaker;
pub mod sdk;
pub mod ssm;
pub mod telemetry;

pub use dynamo::DynamoMappingStore;
pub use efs::EfsReplicationApi;
pub use sagemaker::SageMakerProfileService;
pub use ssm::SsmParameterStore;
