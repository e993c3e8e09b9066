//! Custom Resource Definitions for dbflow
//!
//! The cluster holds the desired state of every database managed through the
//! control plane: a `ControlPlaneServer` registration and one `Database`
//! record per instance or clone.

mod database;
mod server;

pub use database::{
    CloneSpec, Database, DatabaseMode, DatabaseSpec, DatabaseStatus, InstanceSpec, TimeMachineInfo,
};
pub use server::{ControlPlaneServer, ControlPlaneServerSpec, ControlPlaneServerStatus};
