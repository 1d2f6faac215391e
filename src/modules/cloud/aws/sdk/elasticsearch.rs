use aws_config::SdkConfig;
use aws_sdk_elasticsearch::types::{ElasticsearchClusterConfig, ElasticsearchDomainStatus};
use aws_sdk_elasticsearch::Client;
use serde_json::{json, Map, Value};

use super::{block_on, put, sdk_error};
use crate::error::ProviderError;
use crate::modules::cloud::aws::elasticsearch_facts::ElasticsearchClient;
use crate::reconcile::ProviderResult;

/// Domains through the Elasticsearch Service API.
pub struct SdkElasticsearch {
    client: Client,
}

impl SdkElasticsearch {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

/// Converts a domain status into Elasticsearch Service field names.
fn domain_status(status: &ElasticsearchDomainStatus) -> Value {
    let mut doc = Map::new();
    let name: Option<&str> = status.domain_name().into();
    let id: Option<&str> = status.domain_id().into();
    let arn: Option<&str> = status.arn().into();
    put(&mut doc, "DomainName", name);
    put(&mut doc, "DomainId", id);
    put(&mut doc, "ARN", arn);
    put(&mut doc, "Created", status.created());
    put(&mut doc, "Deleted", status.deleted());
    put(&mut doc, "Processing", status.processing());
    put(&mut doc, "Endpoint", status.endpoint());
    put(&mut doc, "ElasticsearchVersion", status.elasticsearch_version());

    let mut cluster = Map::new();
    let config: Option<&ElasticsearchClusterConfig> = status.elasticsearch_cluster_config().into();
    if let Some(config) = config {
        put(&mut cluster, "InstanceType", config.instance_type().map(|t| t.as_str()));
        put(&mut cluster, "InstanceCount", config.instance_count());
        put(&mut cluster, "DedicatedMasterEnabled", config.dedicated_master_enabled());
        put(&mut cluster, "DedicatedMasterType", config.dedicated_master_type().map(|t| t.as_str()));
        put(&mut cluster, "DedicatedMasterCount", config.dedicated_master_count());
        put(&mut cluster, "ZoneAwarenessEnabled", config.zone_awareness_enabled());
    }
    doc.insert("ElasticsearchClusterConfig".to_string(), Value::Object(cluster));

    json!({ "DomainStatus": doc })
}

impl ElasticsearchClient for SdkElasticsearch {
    fn describe_domain(&self, name: &str) -> ProviderResult<Value> {
        block_on(async {
            let output = self
                .client
                .describe_elasticsearch_domain()
                .domain_name(name)
                .send()
                .await
                .map_err(sdk_error)?;

            let status: Option<&ElasticsearchDomainStatus> = output.domain_status().into();
            Ok::<_, ProviderError>(status.map(domain_status).unwrap_or(Value::Null))
        })
    }
}
