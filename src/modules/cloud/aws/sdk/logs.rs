use aws_config::SdkConfig;
use aws_sdk_cloudwatchlogs::Client;

use super::{block_on, sdk_error};
use crate::error::ProviderError;
use crate::modules::cloud::aws::cloudwatch_log::{LogGroup, LogGroupClient};
use crate::reconcile::ProviderResult;

/// Log groups through the CloudWatch Logs API.
pub struct SdkLogGroups {
    client: Client,
}

impl SdkLogGroups {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

impl LogGroupClient for SdkLogGroups {
    fn describe_log_groups(&self, prefix: Option<&str>, limit: i32) -> ProviderResult<Vec<LogGroup>> {
        block_on(async {
            let output = self
                .client
                .describe_log_groups()
                .set_log_group_name_prefix(prefix.map(str::to_string))
                .limit(limit)
                .send()
                .await
                .map_err(sdk_error)?;

            Ok::<_, ProviderError>(output
                .log_groups()
                .iter()
                .map(|group| LogGroup {
                    log_group_name: group.log_group_name().unwrap_or_default().to_string(),
                    arn: group.arn().map(str::to_string),
                    creation_time: group.creation_time(),
                    retention_in_days: group.retention_in_days(),
                    stored_bytes: group.stored_bytes(),
                })
                .collect())
        })
    }

    fn create_log_group(&self, name: &str) -> ProviderResult<()> {
        block_on(async {
            self.client
                .create_log_group()
                .log_group_name(name)
                .send()
                .await
                .map_err(sdk_error)?;
            Ok::<_, ProviderError>(())
        })
    }

    fn delete_log_group(&self, name: &str) -> ProviderResult<()> {
        block_on(async {
            self.client
                .delete_log_group()
                .log_group_name(name)
                .send()
                .await
                .map_err(sdk_error)?;
            Ok::<_, ProviderError>(())
        })
    }
}
