//! Comparison of a requested backup schedule against the reported one
//!
//! Every field is compared independently and all mismatches are collected,
//! so one validation run shows every divergence at once.

use dbflow_client::{ScheduleReport, SnapshotTimeOfDay};
use dbflow_common::crd::TimeMachineInfo;
use dbflow_common::error::FieldMismatch;
use dbflow_common::{Error, Result};

/// Parse `HH:MM:SS` into a time of day
///
/// Returns `None` for anything else, including out-of-range components.
pub fn parse_time_of_day(text: &str) -> Option<SnapshotTimeOfDay> {
    let mut parts = text.trim().split(':');
    let mut next = |max: u32| -> Option<u32> {
        let part = parts.next()?;
        if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        part.parse().ok().filter(|value| *value <= max)
    };

    let time = SnapshotTimeOfDay {
        hours: next(23)?,
        minutes: next(59)?,
        seconds: next(59)?,
    };
    match parts.next() {
        Some(_) => None,
        None => Some(time),
    }
}

/// Every field where `reported` differs from `requested`, in comparison order
pub fn schedule_mismatches(
    requested: &TimeMachineInfo,
    reported: &ScheduleReport,
) -> Vec<FieldMismatch> {
    let mut mismatches = Vec::new();
    let mut check = |field: &str, expected: String, got: String| {
        if expected != got {
            mismatches.push(FieldMismatch::new(field, expected, got));
        }
    };

    check("name", requested.name.clone(), reported.name.clone());
    check(
        "description",
        requested.description.clone(),
        reported.description.clone(),
    );
    check(
        "slaName",
        requested.sla_name.clone(),
        reported.sla_name.clone(),
    );

    let reported_time = reported.snapshot_time_of_day.to_string();
    match parse_time_of_day(&requested.daily_snapshot_time) {
        Some(time) => check("dailySnapshotTime", time.to_string(), reported_time),
        None => check(
            "dailySnapshotTime",
            format!(
                "a valid HH:MM:SS time (requested '{}')",
                requested.daily_snapshot_time
            ),
            reported_time,
        ),
    }

    check(
        "snapshotsPerDay",
        requested.snapshots_per_day.to_string(),
        reported.continuous_schedule.snapshots_per_day.to_string(),
    );
    check(
        "logCatchUpFrequency",
        requested.log_catch_up_frequency.to_string(),
        reported.continuous_schedule.log_backup_interval.to_string(),
    );
    check(
        "weeklySnapshotDay",
        requested.weekly_snapshot_day.clone(),
        reported.weekly_schedule.day_of_week.clone(),
    );
    check(
        "monthlySnapshotDay",
        requested.monthly_snapshot_day.to_string(),
        reported.monthly_schedule.day_of_month.to_string(),
    );

    mismatches
}

/// Succeed only if every field matches; otherwise list all mismatches
pub fn validate_schedule(requested: &TimeMachineInfo, reported: &ScheduleReport) -> Result<()> {
    let mismatches = schedule_mismatches(requested, reported);
    if mismatches.is_empty() {
        Ok(())
    } else {
        Err(Error::ScheduleMismatch { mismatches })
    }
}
