//! Control plane API seam
//!
//! The workflow only talks to the control plane through these traits so it
//! can be exercised without a live service.

use std::sync::Arc;

use async_trait::async_trait;
use dbflow_common::Result;

use crate::client::ControlPlaneClient;
use crate::credentials::ControlPlaneCredentials;
use crate::types::{DatabaseResponse, SnapshotCollection, TimeMachineResponse};

/// Read-only control plane operations used by the workflow
#[async_trait]
pub trait ControlPlaneApi: Send + Sync {
    /// Fetch a database instance by its control plane id
    async fn get_database_by_id(&self, id: &str) -> Result<DatabaseResponse>;

    /// Fetch a database instance by name
    async fn get_database_by_name(&self, name: &str) -> Result<DatabaseResponse>;

    /// Fetch a clone by its control plane id
    async fn get_clone_by_id(&self, id: &str) -> Result<DatabaseResponse>;

    /// Fetch a time machine, with its SLA and schedule, by id
    async fn get_time_machine_by_id(&self, id: &str) -> Result<TimeMachineResponse>;

    /// Fetch all snapshots of a time machine, grouped per compute cluster
    async fn get_snapshots_for_time_machine(
        &self,
        time_machine_id: &str,
    ) -> Result<SnapshotCollection>;
}

/// Builds a control plane client from resolved credentials
pub trait ControlPlaneConnector: Send + Sync {
    /// Connect using the given credentials
    fn connect(&self, credentials: ControlPlaneCredentials) -> Result<Arc<dyn ControlPlaneApi>>;
}

/// Connector producing HTTP clients
#[derive(Clone, Copy, Debug, Default)]
pub struct HttpConnector;

impl ControlPlaneConnector for HttpConnector {
    fn connect(&self, credentials: ControlPlaneCredentials) -> Result<Arc<dyn ControlPlaneApi>> {
        Ok(Arc::new(ControlPlaneClient::new(credentials)?))
    }
}
