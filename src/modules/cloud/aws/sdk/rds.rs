use aws_config::SdkConfig;
use aws_sdk_rds::primitives::{DateTime, DateTimeFormat};
use aws_sdk_rds::types::{DbInstance, DbSnapshot, Filter};
use aws_sdk_rds::Client;
use serde_json::{Map, Value};

use super::{block_on, put, sdk_error};
use crate::error::ProviderError;
use crate::modules::cloud::aws::convert::NamedFilter;
use crate::modules::cloud::aws::rds_instance_facts::{DbInstancePage, RdsClient};
use crate::reconcile::ProviderResult;

/// Instances and snapshots through the RDS API.
pub struct SdkRds {
    client: Client,
}

impl SdkRds {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

fn timestamp(value: Option<&DateTime>) -> Option<String> {
    value.and_then(|t| t.fmt(DateTimeFormat::DateTime).ok())
}

fn to_sdk_filter(filter: &NamedFilter) -> ProviderResult<Filter> {
    Filter::builder()
        .name(&filter.name)
        .set_values(Some(filter.values.clone()))
        .build()
        .map_err(|e| ProviderError::new("InvalidParameterValue", e.to_string()))
}

/// Converts a described instance into RDS field names.
fn instance_doc(instance: &DbInstance) -> Value {
    let mut doc = Map::new();
    put(&mut doc, "DBInstanceIdentifier", instance.db_instance_identifier());
    put(&mut doc, "InstanceCreateTime", timestamp(instance.instance_create_time()));
    put(&mut doc, "Engine", instance.engine());
    put(&mut doc, "DBName", instance.db_name());
    put(&mut doc, "DBInstanceStatus", instance.db_instance_status());
    put(&mut doc, "AvailabilityZone", instance.availability_zone());
    put(&mut doc, "BackupRetentionPeriod", instance.backup_retention_period());
    put(&mut doc, "PreferredMaintenanceWindow", instance.preferred_maintenance_window());
    put(&mut doc, "MultiAZ", instance.multi_az());
    put(&mut doc, "DBInstanceClass", instance.db_instance_class());
    put(&mut doc, "MasterUsername", instance.master_username());
    put(
        &mut doc,
        "ReadReplicaSourceDBInstanceIdentifier",
        instance.read_replica_source_db_instance_identifier(),
    );
    put(&mut doc, "AllocatedStorage", instance.allocated_storage());
    put(&mut doc, "StorageType", instance.storage_type());
    put(&mut doc, "Iops", instance.iops());

    let groups: Vec<Value> = instance
        .vpc_security_groups()
        .iter()
        .map(|g| {
            let mut group = Map::new();
            put(&mut group, "VpcSecurityGroupId", g.vpc_security_group_id());
            put(&mut group, "Status", g.status());
            Value::Object(group)
        })
        .collect();
    doc.insert("VpcSecurityGroups".to_string(), Value::Array(groups));

    if let Some(endpoint) = instance.endpoint() {
        let mut ep = Map::new();
        put(&mut ep, "Address", endpoint.address());
        put(&mut ep, "Port", endpoint.port());
        doc.insert("Endpoint".to_string(), Value::Object(ep));
    }

    let tags: Vec<Value> = instance
        .tag_list()
        .iter()
        .map(|t| {
            let mut tag = Map::new();
            put(&mut tag, "Key", t.key());
            put(&mut tag, "Value", t.value());
            Value::Object(tag)
        })
        .collect();
    doc.insert("TagList".to_string(), Value::Array(tags));

    Value::Object(doc)
}

fn snapshot_doc(snapshot: &DbSnapshot) -> Value {
    let mut doc = Map::new();
    put(&mut doc, "DBSnapshotIdentifier", snapshot.db_snapshot_identifier());
    put(&mut doc, "SnapshotCreateTime", timestamp(snapshot.snapshot_create_time()));
    put(&mut doc, "Status", snapshot.status());
    put(&mut doc, "AvailabilityZone", snapshot.availability_zone());
    put(&mut doc, "DBInstanceIdentifier", snapshot.db_instance_identifier());
    put(&mut doc, "InstanceCreateTime", timestamp(snapshot.instance_create_time()));
    put(&mut doc, "SnapshotType", snapshot.snapshot_type());
    put(&mut doc, "Iops", snapshot.iops());
    Value::Object(doc)
}

impl RdsClient for SdkRds {
    fn describe_db_instances(
        &self,
        identifier: Option<&str>,
        filters: &[NamedFilter],
        marker: Option<&str>,
    ) -> ProviderResult<DbInstancePage> {
        let filters = filters
            .iter()
            .map(to_sdk_filter)
            .collect::<ProviderResult<Vec<_>>>()?;

        block_on(async {
            let output = self
                .client
                .describe_db_instances()
                .set_db_instance_identifier(identifier.map(str::to_string))
                .set_filters((!filters.is_empty()).then_some(filters))
                .set_marker(marker.map(str::to_string))
                .send()
                .await
                .map_err(sdk_error)?;

            Ok::<_, ProviderError>(DbInstancePage {
                instances: output.db_instances().iter().map(instance_doc).collect(),
                marker: output.marker().map(str::to_string),
            })
        })
    }

    fn describe_db_snapshots(&self, identifier: &str) -> ProviderResult<Vec<Value>> {
        block_on(async {
            let output = self
                .client
                .describe_db_snapshots()
                .db_snapshot_identifier(identifier)
                .send()
                .await
                .map_err(sdk_error)?;
            Ok::<_, ProviderError>(output.db_snapshots().iter().map(snapshot_doc).collect())
        })
    }
}
