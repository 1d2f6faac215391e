//! Elasticsearch domain facts.
//!
//! Describes one domain. Lookup failures are not fatal: the module reports an
//! empty domain with zero instances so callers can branch on the counts.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;

use crate::modules::{Module, ModuleContext, ModuleOutput, ModuleParams, ModuleResult, ParamExt};
use crate::reconcile::ProviderResult;

/// `DescribeElasticsearchDomain` returning the raw response document.
pub trait ElasticsearchClient: Send + Sync {
    fn describe_domain(&self, name: &str) -> ProviderResult<Value>;
}

/// Result reported when the domain cannot be described.
pub fn empty_result(domain_name: Option<&str>) -> Value {
    json!({
        "DomainStatus": {
            "DomainName": domain_name,
            "ElasticsearchClusterConfig": {
                "DedicatedMasterCount": 0,
                "InstanceCount": 0
            }
        }
    })
}

pub struct ElasticsearchFactsModule {
    client: Arc<dyn ElasticsearchClient>,
}

impl ElasticsearchFactsModule {
    pub fn new(client: Arc<dyn ElasticsearchClient>) -> Self {
        Self { client }
    }
}

impl Module for ElasticsearchFactsModule {
    fn name(&self) -> &'static str {
        "aws_elasticsearch_facts"
    }

    fn description(&self) -> &'static str {
        "Gather facts about an Elasticsearch domain"
    }

    fn execute(
        &self,
        params: &ModuleParams,
        _context: &ModuleContext,
    ) -> ModuleResult<ModuleOutput> {
        let domain_name = params.get_string("domain_name")?;

        let result = match domain_name.as_deref() {
            Some(name) => match self.client.describe_domain(name) {
                Ok(Value::Object(mut response)) => {
                    response.remove("ResponseMetadata");
                    Value::Object(response)
                }
                Ok(_) => empty_result(Some(name)),
                Err(e) => {
                    debug!(domain = name, error = %e, "Domain lookup failed, reporting empty domain");
                    empty_result(Some(name))
                }
            },
            None => empty_result(None),
        };

        Ok(ModuleOutput::ok("Elasticsearch domain facts gathered").with_data("result", result))
    }
}
