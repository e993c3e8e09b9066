//! Control plane response types
//!
//! Only the fields the workflow reads are modelled; everything else in the
//! responses is ignored during deserialization.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A database instance or clone as reported by the control plane
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseResponse {
    /// Control plane id
    pub id: String,
    /// Name on the control plane
    pub name: String,
    /// Free-text description
    #[serde(default)]
    pub description: String,
    /// Lifecycle status (e.g. "CREATING", "READY")
    #[serde(default)]
    pub status: String,
    /// Engine type
    #[serde(default, rename = "type")]
    pub db_type: String,
    /// Time machine attached to this database
    #[serde(default)]
    pub time_machine_id: String,
    /// Whether this record is a clone
    #[serde(default)]
    pub clone: bool,
}

/// Time of day at which the daily snapshot is taken
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotTimeOfDay {
    /// Hour, 0-23
    pub hours: u32,
    /// Minute, 0-59
    pub minutes: u32,
    /// Second, 0-59
    pub seconds: u32,
}

impl std::fmt::Display for SnapshotTimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}

/// Continuous (log-based) backup schedule
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContinuousSchedule {
    /// Whether continuous backups are on
    #[serde(default)]
    pub enabled: bool,
    /// Log backup interval in minutes
    #[serde(default)]
    pub log_backup_interval: u32,
    /// Snapshots taken per day
    #[serde(default)]
    pub snapshots_per_day: u32,
}

/// Weekly snapshot schedule
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklySchedule {
    /// Whether weekly snapshots are on
    #[serde(default)]
    pub enabled: bool,
    /// Day of the week (e.g. "WEDNESDAY")
    #[serde(default)]
    pub day_of_week: String,
}

/// Monthly snapshot schedule
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySchedule {
    /// Whether monthly snapshots are on
    #[serde(default)]
    pub enabled: bool,
    /// Day of the month
    #[serde(default)]
    pub day_of_month: u32,
}

/// Recurring schedule attached to a time machine
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleResponse {
    /// Schedule id
    #[serde(default)]
    pub id: String,
    /// Schedule name
    #[serde(default)]
    pub name: String,
    /// Daily snapshot time
    #[serde(default)]
    pub snapshot_time_of_day: SnapshotTimeOfDay,
    /// Continuous schedule
    #[serde(default)]
    pub continuous_schedule: ContinuousSchedule,
    /// Weekly schedule
    #[serde(default)]
    pub weekly_schedule: WeeklySchedule,
    /// Monthly schedule
    #[serde(default)]
    pub monthly_schedule: MonthlySchedule,
}

/// SLA attached to a time machine
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SlaResponse {
    /// SLA id
    #[serde(default)]
    pub id: String,
    /// SLA name
    #[serde(default)]
    pub name: String,
}

/// A time machine (recurring backup policy) as reported by the control plane
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimeMachineResponse {
    /// Time machine id
    pub id: String,
    /// Time machine name
    #[serde(default)]
    pub name: String,
    /// Free-text description
    #[serde(default)]
    pub description: String,
    /// Id of the attached SLA
    #[serde(default)]
    pub sla_id: String,
    /// Id of the attached schedule
    #[serde(default)]
    pub schedule_id: String,
    /// Attached SLA, when loaded
    #[serde(default)]
    pub sla: Option<SlaResponse>,
    /// Attached schedule, when loaded
    #[serde(default)]
    pub schedule: Option<ScheduleResponse>,
}

impl TimeMachineResponse {
    /// Flatten into the shape the schedule validator compares against
    ///
    /// Missing SLA or schedule sections turn into empty/zero values so that
    /// validation reports them as mismatches instead of failing outright.
    pub fn schedule_report(&self) -> ScheduleReport {
        let schedule = self.schedule.clone().unwrap_or_default();
        ScheduleReport {
            name: self.name.clone(),
            description: self.description.clone(),
            sla_name: self
                .sla
                .as_ref()
                .map(|sla| sla.name.clone())
                .unwrap_or_default(),
            snapshot_time_of_day: schedule.snapshot_time_of_day,
            continuous_schedule: schedule.continuous_schedule,
            weekly_schedule: schedule.weekly_schedule,
            monthly_schedule: schedule.monthly_schedule,
        }
    }
}

/// A recurring backup policy as reported by the control plane
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScheduleReport {
    /// Time machine name
    pub name: String,
    /// Time machine description
    pub description: String,
    /// SLA name
    pub sla_name: String,
    /// Daily snapshot time
    pub snapshot_time_of_day: SnapshotTimeOfDay,
    /// Continuous schedule
    pub continuous_schedule: ContinuousSchedule,
    /// Weekly schedule
    pub weekly_schedule: WeeklySchedule,
    /// Monthly schedule
    pub monthly_schedule: MonthlySchedule,
}

/// Reference to one snapshot
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRef {
    /// Snapshot id
    pub id: String,
    /// Snapshot name
    #[serde(default)]
    pub name: String,
}

/// Snapshots of one schedule type, in the order the control plane listed them
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotGroup {
    /// Snapshots in this group
    #[serde(default)]
    pub snapshots: Vec<SnapshotRef>,
}

impl SnapshotGroup {
    /// Build a group from bare ids
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            snapshots: ids
                .into_iter()
                .map(|id| SnapshotRef {
                    id: id.into(),
                    name: String::new(),
                })
                .collect(),
        }
    }
}

/// Snapshots of a time machine, grouped per compute cluster and schedule type
///
/// Group index 0 holds daily snapshots, 1 continuous, 2 manual.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotCollection {
    /// Snapshot groups keyed by compute cluster id
    #[serde(default)]
    pub snapshots_per_cluster: BTreeMap<String, Vec<SnapshotGroup>>,
}
