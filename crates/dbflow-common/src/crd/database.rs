//! Database Custom Resource Definition
//!
//! A `Database` is either a fresh instance provisioned by the control plane or
//! a clone restored from a snapshot of an existing database. The two shapes are
//! a closed set, so they are modelled as one tagged enum rather than a boolean
//! flag with two optional bodies.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{Error, Result, DATABASE_STATUS_READY, DEFAULT_NAMESPACE, NO_SLA_NAMES};

/// Requested backup policy for a fresh instance
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimeMachineInfo {
    /// Time machine name
    #[serde(default)]
    pub name: String,

    /// Free-text description
    #[serde(default)]
    pub description: String,

    /// SLA name; empty or "NONE" requests no backup policy
    #[serde(default)]
    pub sla_name: String,

    /// Wall-clock time of the daily snapshot, `HH:MM:SS`
    #[serde(default)]
    pub daily_snapshot_time: String,

    /// Number of snapshots taken per day
    #[serde(default)]
    pub snapshots_per_day: u32,

    /// Log catch-up frequency in minutes
    #[serde(default)]
    pub log_catch_up_frequency: u32,

    /// Day of the week for the weekly snapshot (e.g. "WEDNESDAY")
    #[serde(default)]
    pub weekly_snapshot_day: String,

    /// Day of the month for the monthly snapshot
    #[serde(default)]
    pub monthly_snapshot_day: u32,
}

impl TimeMachineInfo {
    /// Whether a backup policy was requested at all
    pub fn requests_backup_policy(&self) -> bool {
        !NO_SLA_NAMES.contains(&self.sla_name.as_str())
    }
}

/// Fresh-instance provisioning parameters
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSpec {
    /// Name of the database instance on the control plane
    pub name: String,

    /// Free-text description
    #[serde(default)]
    pub description: String,

    /// Compute cluster to provision on; injected from the environment
    #[serde(default)]
    pub cluster_id: String,

    /// Logical databases created inside the instance
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub database_names: Vec<String>,

    /// Secret holding the database password
    pub credential_secret: String,

    /// Storage size in GiB
    #[serde(default)]
    pub size: u32,

    /// Timezone of the instance
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub timezone: String,

    /// Engine type (e.g. "postgres", "mysql")
    #[serde(rename = "type")]
    pub db_type: String,

    /// Requested backup policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_machine: Option<TimeMachineInfo>,
}

/// Clone-from-snapshot parameters
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloneSpec {
    /// Name of the clone on the control plane
    pub name: String,

    /// Free-text description
    #[serde(default)]
    pub description: String,

    /// Compute cluster to clone onto; injected from the environment
    #[serde(default)]
    pub cluster_id: String,

    /// Id of the database being cloned
    #[serde(default)]
    pub source_database_id: String,

    /// Id of the snapshot to restore from
    #[serde(default)]
    pub snapshot_id: String,

    /// Secret holding the clone's password
    pub credential_secret: String,

    /// Timezone of the clone
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub timezone: String,

    /// Engine type (e.g. "postgres", "mysql")
    #[serde(rename = "type")]
    pub db_type: String,
}

impl CloneSpec {
    /// Names of the required clone fields that are still empty
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("sourceDatabaseId", &self.source_database_id),
            ("clusterId", &self.cluster_id),
            ("snapshotId", &self.snapshot_id),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect()
    }

    /// Reject a clone that cannot be submitted
    pub fn validate(&self, resource: &str) -> Result<()> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::validation_for(
                resource,
                format!("clone requires non-empty {}", missing.join(", ")),
            ))
        }
    }
}

/// Instance or clone
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum DatabaseMode {
    /// Freshly provisioned instance
    Instance(InstanceSpec),
    /// Clone restored from a snapshot
    Clone(CloneSpec),
}

/// Desired state of a Database
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "dbflow.dev",
    version = "v1alpha1",
    kind = "Database",
    plural = "databases",
    shortname = "db",
    namespaced,
    status = "DatabaseStatus",
    printcolumn = r#"{"name":"Status","type":"string","jsonPath":".status.status"}"#,
    printcolumn = r#"{"name":"Id","type":"string","jsonPath":".status.id"}"#,
    printcolumn = r#"{"name":"IP","type":"string","jsonPath":".status.ipAddress"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSpec {
    /// Name of the ControlPlaneServer this database is managed through
    pub server_ref: String,

    /// Instance or clone parameters
    #[serde(flatten)]
    pub mode: DatabaseMode,
}

impl DatabaseSpec {
    /// Whether this record restores from a snapshot
    pub fn is_clone(&self) -> bool {
        matches!(self.mode, DatabaseMode::Clone(_))
    }

    /// Name of the database on the control plane
    pub fn database_name(&self) -> &str {
        match &self.mode {
            DatabaseMode::Instance(instance) => &instance.name,
            DatabaseMode::Clone(clone) => &clone.name,
        }
    }

    /// Compute cluster the database is placed on
    pub fn cluster_id(&self) -> &str {
        match &self.mode {
            DatabaseMode::Instance(instance) => &instance.cluster_id,
            DatabaseMode::Clone(clone) => &clone.cluster_id,
        }
    }

    /// Set the compute cluster for whichever mode this record is in
    pub fn set_cluster_id(&mut self, cluster_id: impl Into<String>) {
        let cluster_id = cluster_id.into();
        match &mut self.mode {
            DatabaseMode::Instance(instance) => instance.cluster_id = cluster_id,
            DatabaseMode::Clone(clone) => clone.cluster_id = cluster_id,
        }
    }

    /// Requested backup policy (instances only)
    pub fn time_machine(&self) -> Option<&TimeMachineInfo> {
        match &self.mode {
            DatabaseMode::Instance(instance) => instance.time_machine.as_ref(),
            DatabaseMode::Clone(_) => None,
        }
    }
}

/// Status of a Database, written by the operator from control plane state
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseStatus {
    /// Control plane id of the instance or clone
    #[serde(default)]
    pub id: String,

    /// Control plane status string (e.g. "CREATING", "READY", "ERROR")
    #[serde(default)]
    pub status: String,

    /// Id of the server VM hosting the database
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub db_server_id: String,

    /// Address the database listens on
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ip_address: String,

    /// Engine type as reported by the control plane
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub db_type: String,
}

impl Database {
    /// Namespace of the record, falling back to the default namespace
    pub fn namespace_or_default(&self) -> String {
        self.metadata
            .namespace
            .clone()
            .filter(|ns| !ns.is_empty())
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string())
    }

    /// Last status string reported for this record ("" before the first update)
    pub fn current_status(&self) -> &str {
        self.status
            .as_ref()
            .map(|s| s.status.as_str())
            .unwrap_or_default()
    }

    /// Control plane id assigned to this record ("" until assigned)
    pub fn control_plane_id(&self) -> &str {
        self.status
            .as_ref()
            .map(|s| s.id.as_str())
            .unwrap_or_default()
    }

    /// Whether the control plane reports the database as READY
    pub fn is_ready(&self) -> bool {
        self.current_status() == DATABASE_STATUS_READY
    }
}
