//! AWS SDK implementations of the module client traits.
//!
//! Every trait in this crate is synchronous. SDK futures are driven on the
//! ambient tokio runtime from a scoped helper thread, so calls made from
//! inside an async context do not block the runtime's own worker.

mod autoscaling;
mod elasticsearch;
mod kms;
mod logs;
mod rds;

pub use autoscaling::SdkScalingPolicies;
pub use elasticsearch::SdkElasticsearch;
pub use kms::SdkKmsConnector;
pub use logs::SdkLogGroups;
pub use rds::SdkRds;

use std::future::Future;
use std::sync::Arc;

use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_autoscaling::error::ProvideErrorMetadata;
use serde_json::{Map, Value};
use tracing::debug;

use super::AwsClients;
use crate::config::AwsConfig;
use crate::error::ProviderError;
use crate::reconcile::ProviderResult;

/// Runs an SDK future to completion from synchronous code.
pub(crate) fn block_on<F, T>(future: F) -> ProviderResult<T>
where
    F: Future<Output = ProviderResult<T>> + Send,
    T: Send,
{
    let handle = tokio::runtime::Handle::try_current().map_err(|_| {
        ProviderError::new("RuntimeUnavailable", "No tokio runtime available")
    })?;

    std::thread::scope(|s| s.spawn(|| handle.block_on(future)).join())
        .unwrap_or_else(|_| Err(ProviderError::new("InternalError", "AWS call panicked")))
}

/// Maps any SDK error onto a [`ProviderError`], keeping the AWS error code.
pub(crate) fn sdk_error<E>(err: E) -> ProviderError
where
    E: ProvideErrorMetadata + std::fmt::Display,
{
    let code = err.code().unwrap_or("Unknown").to_string();
    let message = err
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| err.to_string());
    ProviderError::new(code, message)
}

/// Inserts `value` under `key` when it is set.
pub(crate) fn put<V: Into<Value>>(doc: &mut Map<String, Value>, key: &str, value: Option<V>) {
    if let Some(value) = value {
        doc.insert(key.to_string(), value.into());
    }
}

/// Loads shared SDK configuration from the `[aws]` settings.
pub async fn load_sdk_config(settings: &AwsConfig) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = &settings.region {
        loader = loader.region(aws_config::Region::new(region.clone()));
    }
    if let Some(profile) = &settings.profile {
        loader = loader.profile_name(profile);
    }
    if let Some(endpoint) = &settings.endpoint_url {
        loader = loader.endpoint_url(endpoint);
    }
    debug!(region = ?settings.region, profile = ?settings.profile, "Loading AWS configuration");
    loader.load().await
}

/// Builds SDK-backed clients for every AWS module.
pub async fn load_clients(settings: &AwsConfig) -> AwsClients {
    let config = load_sdk_config(settings).await;
    AwsClients {
        scaling_policies: Arc::new(SdkScalingPolicies::new(&config)),
        log_groups: Arc::new(SdkLogGroups::new(&config)),
        elasticsearch: Arc::new(SdkElasticsearch::new(&config)),
        rds: Arc::new(SdkRds::new(&config)),
    }
}
