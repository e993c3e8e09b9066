//! Client for the database-service control plane
//!
//! Read-only queries used to verify what the control plane actually did with
//! the desired state submitted to the cluster: database and clone status,
//! time machine schedules, and snapshot listings for clone sources.

#![deny(missing_docs)]

pub mod api;
pub mod client;
pub mod credentials;
pub mod types;

pub use api::{ControlPlaneApi, ControlPlaneConnector, HttpConnector};
pub use client::ControlPlaneClient;
pub use credentials::ControlPlaneCredentials;
pub use types::{
    ContinuousSchedule, DatabaseResponse, MonthlySchedule, ScheduleReport, ScheduleResponse,
    SlaResponse, SnapshotCollection, SnapshotGroup, SnapshotRef, SnapshotTimeOfDay,
    TimeMachineResponse, WeeklySchedule,
};
