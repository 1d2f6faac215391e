//! RDS instance facts.
//!
//! Lists DB instances, optionally narrowed by identifier or describe filters,
//! and normalizes each into a flat [`RdsInstance`] record.
//!
//! ### Parameters
//!
//! | Parameter | Required | Description |
//! |-----------|----------|-------------|
//! | `name` | No | DB instance identifier (alias: `instance_name`) |
//! | `filters` | No | Mapping of describe filter names to a value or list of values |

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::convert::{filter_list, tag_list_to_dict, NamedFilter};
use crate::modules::{
    Diff, Module, ModuleContext, ModuleError, ModuleOutput, ModuleParams, ModuleResult, ParamExt,
};
use crate::reconcile::ProviderResult;

/// Error code AWS returns for an unknown instance identifier.
pub const DB_INSTANCE_NOT_FOUND: &str = "DBInstanceNotFound";
/// Error code AWS returns for an unknown snapshot identifier.
pub const DB_SNAPSHOT_NOT_FOUND: &str = "DBSnapshotNotFound";

/// One page of `DescribeDBInstances`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DbInstancePage {
    /// Raw instance documents in AWS naming
    pub instances: Vec<Value>,
    /// Pagination marker for the next page, if any
    pub marker: Option<String>,
}

/// RDS calls used by the module.
pub trait RdsClient: Send + Sync {
    fn describe_db_instances(
        &self,
        identifier: Option<&str>,
        filters: &[NamedFilter],
        marker: Option<&str>,
    ) -> ProviderResult<DbInstancePage>;

    fn describe_db_snapshots(&self, identifier: &str) -> ProviderResult<Vec<Value>>;
}

/// Flat facts about one DB instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RdsInstance {
    pub id: Option<String>,
    pub create_time: String,
    pub db_engine: String,
    pub db_name: Option<String>,
    pub status: Option<String>,
    pub availability_zone: Option<String>,
    pub backup_retention: i64,
    pub maintenance_window: String,
    pub multi_zone: bool,
    pub instance_type: String,
    pub username: String,
    pub replication_source: Option<String>,
    pub size: Option<i64>,
    pub storage_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iops: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_security_groups: Option<String>,
    pub endpoint: Option<String>,
    pub port: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Map<String, Value>>,
}

/// Fields compared by [`RdsInstance::diff`], named as module parameters.
const COMPARE_KEYS: &[&str] = &[
    "backup_retention",
    "instance_type",
    "iops",
    "maintenance_window",
    "multi_zone",
    "replication_source",
    "size",
    "storage_type",
    "tags",
    "zone",
    "port",
];

impl RdsInstance {
    /// Normalizes a raw `DBInstance` document.
    pub fn from_response(instance: &Value) -> ModuleResult<Self> {
        let endpoint = instance.get("Endpoint").filter(|e| e.is_object());
        let iops = opt_i64(instance, "Iops").filter(|v| *v != 0);

        Ok(Self {
            id: opt_str(instance, "DBInstanceIdentifier"),
            create_time: opt_str(instance, "InstanceCreateTime").unwrap_or_default(),
            db_engine: req_str(instance, "Engine")?,
            db_name: opt_str(instance, "DBName"),
            status: opt_str(instance, "DBInstanceStatus"),
            availability_zone: opt_str(instance, "AvailabilityZone"),
            backup_retention: opt_i64(instance, "BackupRetentionPeriod")
                .ok_or_else(|| missing("BackupRetentionPeriod"))?,
            maintenance_window: req_str(instance, "PreferredMaintenanceWindow")?,
            multi_zone: instance
                .get("MultiAZ")
                .and_then(Value::as_bool)
                .ok_or_else(|| missing("MultiAZ"))?,
            instance_type: req_str(instance, "DBInstanceClass")?,
            username: req_str(instance, "MasterUsername")?,
            replication_source: opt_str(instance, "ReadReplicaSourceDBInstanceIdentifier"),
            size: opt_i64(instance, "AllocatedStorage"),
            storage_type: opt_str(instance, "StorageType"),
            iops,
            vpc_security_groups: instance
                .get("VpcSecurityGroups")
                .and_then(Value::as_array)
                .map(|groups| {
                    groups
                        .iter()
                        .filter_map(|g| g.get("VpcSecurityGroupId").and_then(Value::as_str))
                        .collect::<Vec<_>>()
                        .join(",")
                }),
            endpoint: endpoint.and_then(|e| opt_str(e, "Address")),
            port: endpoint.and_then(|e| opt_i64(e, "Port")),
            tags: instance
                .get("TagList")
                .filter(|t| t.as_array().is_some_and(|a| !a.is_empty()))
                .map(tag_list_to_dict),
        })
    }

    /// Compares these facts to module-style parameters.
    ///
    /// Returns `None` when nothing differs. `zone` is compared against
    /// `availability_zone`; the after header is `new_instance_name`, falling
    /// back to `instance_name`.
    pub fn diff(&self, params: &Map<String, Value>) -> Option<Diff> {
        let facts = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => return None,
        };

        let mut before = Map::new();
        let mut after = Map::new();
        for key in COMPARE_KEYS {
            let fact_key = if *key == "zone" { "availability_zone" } else { *key };
            let have = facts.get(fact_key).cloned().unwrap_or(Value::Null);
            let want = params.get(*key).cloned().unwrap_or(Value::Null);
            if have != want {
                before.insert((*key).to_string(), have);
                after.insert((*key).to_string(), want);
            }
        }

        if before.is_empty() {
            return None;
        }

        let after_header = params
            .get("new_instance_name")
            .or_else(|| params.get("instance_name"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        Some(
            Diff::new(Value::Object(before), Value::Object(after))
                .with_headers(self.id.clone().unwrap_or_default(), after_header),
        )
    }
}

/// Flat facts about one DB snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RdsSnapshot {
    pub id: Option<String>,
    pub create_time: String,
    pub status: Option<String>,
    pub availability_zone: String,
    pub instance_id: String,
    pub instance_created: String,
    pub snapshot_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iops: Option<i64>,
}

impl RdsSnapshot {
    pub fn from_response(snapshot: &Value) -> ModuleResult<Self> {
        Ok(Self {
            id: opt_str(snapshot, "DBSnapshotIdentifier"),
            create_time: opt_str(snapshot, "SnapshotCreateTime").unwrap_or_default(),
            status: opt_str(snapshot, "Status"),
            availability_zone: req_str(snapshot, "AvailabilityZone")?,
            instance_id: req_str(snapshot, "DBInstanceIdentifier")?,
            instance_created: req_str(snapshot, "InstanceCreateTime")?,
            snapshot_type: req_str(snapshot, "SnapshotType")?,
            iops: opt_i64(snapshot, "Iops").filter(|v| *v != 0),
        })
    }
}

fn opt_str(doc: &Value, key: &str) -> Option<String> {
    doc.get(key).and_then(Value::as_str).map(str::to_string)
}

fn opt_i64(doc: &Value, key: &str) -> Option<i64> {
    doc.get(key).and_then(Value::as_i64)
}

fn req_str(doc: &Value, key: &str) -> ModuleResult<String> {
    opt_str(doc, key).ok_or_else(|| missing(key))
}

fn missing(key: &str) -> ModuleError {
    ModuleError::ExecutionFailed(format!("RDS response is missing '{}'", key))
}

/// Fetches one instance by identifier. An unknown identifier is `None`.
pub fn get_db_instance(client: &dyn RdsClient, name: &str) -> ModuleResult<Option<RdsInstance>> {
    match client.describe_db_instances(Some(name), &[], None) {
        Ok(page) => page
            .instances
            .first()
            .map(RdsInstance::from_response)
            .transpose(),
        Err(e) if e.code == DB_INSTANCE_NOT_FOUND => Ok(None),
        Err(e) => Err(ModuleError::provider(
            format!("Failed to describe DB instance {}", name),
            e,
        )),
    }
}

/// Fetches one snapshot by identifier. An unknown identifier is `None`.
pub fn get_db_snapshot(client: &dyn RdsClient, id: &str) -> ModuleResult<Option<RdsSnapshot>> {
    match client.describe_db_snapshots(id) {
        Ok(snapshots) => snapshots
            .first()
            .map(RdsSnapshot::from_response)
            .transpose(),
        Err(e) if e.code == DB_SNAPSHOT_NOT_FOUND => Ok(None),
        Err(e) => Err(ModuleError::provider(
            format!("Failed to describe DB snapshot {}", id),
            e,
        )),
    }
}

/// Module for `rds_instance_facts`.
pub struct RdsInstanceFactsModule {
    client: Arc<dyn RdsClient>,
}

impl RdsInstanceFactsModule {
    pub fn new(client: Arc<dyn RdsClient>) -> Self {
        Self { client }
    }

    fn filters(params: &ModuleParams) -> ModuleResult<Vec<NamedFilter>> {
        match params.get("filters") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Object(map)) => Ok(filter_list(map)),
            Some(Value::Array(items)) if items.is_empty() => Ok(Vec::new()),
            Some(_) => Err(ModuleError::InvalidParameter(
                "filters must be a mapping of filter names to values".to_string(),
            )),
        }
    }

    /// Follows `Marker` until the last page. An unknown identifier ends the
    /// listing without error.
    fn describe_all(
        &self,
        name: Option<&str>,
        filters: &[NamedFilter],
    ) -> ModuleResult<Vec<Value>> {
        let mut results = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            match self
                .client
                .describe_db_instances(name, filters, marker.as_deref())
            {
                Ok(page) => {
                    results.extend(page.instances);
                    marker = page.marker.filter(|m| !m.is_empty());
                }
                Err(e) if e.code == DB_INSTANCE_NOT_FOUND => {
                    debug!(instance = ?name, "DB instance not found");
                    break;
                }
                Err(e) => return Err(ModuleError::provider("Failed to describe DB instances", e)),
            }

            if marker.is_none() {
                break;
            }
        }

        Ok(results)
    }
}

impl Module for RdsInstanceFactsModule {
    fn name(&self) -> &'static str {
        "rds_instance_facts"
    }

    fn description(&self) -> &'static str {
        "Gather facts about RDS instances"
    }

    fn validate_params(&self, params: &ModuleParams) -> ModuleResult<()> {
        Self::filters(params).map(|_| ())
    }

    fn execute(
        &self,
        params: &ModuleParams,
        _context: &ModuleContext,
    ) -> ModuleResult<ModuleOutput> {
        let name = params.get_string_any(&["name", "instance_name"])?;
        let filters = Self::filters(params)?;

        let instances = self
            .describe_all(name.as_deref(), &filters)?
            .iter()
            .map(RdsInstance::from_response)
            .collect::<ModuleResult<Vec<_>>>()?;

        let count = instances.len();
        let instances = serde_json::to_value(instances)
            .map_err(|e| ModuleError::ExecutionFailed(e.to_string()))?;

        Ok(ModuleOutput::ok(format!("Found {} DB instance(s)", count))
            .with_data("instances", instances))
    }
}
