//! AWS (Amazon Web Services) modules.
//!
//! ## Available Modules
//!
//! - [`ScalingPolicyModule`](scaling_policy::ScalingPolicyModule): `ec2_scaling_policy`
//! - [`CloudWatchLogModule`](cloudwatch_log::CloudWatchLogModule): `cloudwatch_log`
//! - [`ElasticsearchFactsModule`](elasticsearch_facts::ElasticsearchFactsModule): `aws_elasticsearch_facts`
//! - [`RdsInstanceFactsModule`](rds_instance_facts::RdsInstanceFactsModule): `rds_instance_facts`
//!
//! ## Authentication
//!
//! With the `aws` feature, credentials come from the standard AWS credential
//! chain (environment, `~/.aws/credentials`, instance profile). The region
//! and profile can be set in the `[aws]` config section or via `AWS_REGION`
//! and `AWS_PROFILE`.

pub mod cloudwatch_log;
pub mod convert;
pub mod elasticsearch_facts;
pub mod rds_instance_facts;
pub mod scaling_policy;
pub mod step_adjustment;

#[cfg(feature = "aws")]
pub mod sdk;

pub use cloudwatch_log::{CloudWatchLogModule, LogGroup, LogGroupClient, LogGroupProvider};
pub use elasticsearch_facts::{ElasticsearchClient, ElasticsearchFactsModule};
pub use rds_instance_facts::{DbInstancePage, RdsClient, RdsInstance, RdsInstanceFactsModule, RdsSnapshot};
pub use scaling_policy::{PolicyPayload, PolicyValidator, ScalingPolicyModule};
pub use step_adjustment::StepAdjustment;

use std::sync::Arc;

use crate::modules::ModuleRegistry;
use crate::reconcile::ResourceProvider;

/// Clients backing the AWS modules.
#[derive(Clone)]
pub struct AwsClients {
    pub scaling_policies: Arc<dyn ResourceProvider>,
    pub log_groups: Arc<dyn LogGroupClient>,
    pub elasticsearch: Arc<dyn ElasticsearchClient>,
    pub rds: Arc<dyn RdsClient>,
}

/// Registers every AWS module against the given clients.
pub fn register_modules(registry: &mut ModuleRegistry, clients: &AwsClients) {
    registry.register(Arc::new(ScalingPolicyModule::new(clients.scaling_policies.clone())));
    registry.register(Arc::new(CloudWatchLogModule::new(clients.log_groups.clone())));
    registry.register(Arc::new(ElasticsearchFactsModule::new(clients.elasticsearch.clone())));
    registry.register(Arc::new(RdsInstanceFactsModule::new(clients.rds.clone())));
}
