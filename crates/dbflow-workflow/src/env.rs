//! Workflow inputs taken from the process environment
//!
//! Secrets and placement never live in templates. They are captured once at
//! workflow start into a `WorkflowEnv` and injected into the bundle from there,
//! so nothing downstream reads the process environment directly.

use std::fmt;

use dbflow_client::ControlPlaneCredentials;
use dbflow_common::retry::RetryConfig;
use dbflow_common::{Error, Result};

/// Password injected into the database credential record
pub const ENV_DB_PASSWORD: &str = "DB_SECRET_PASSWORD";
/// Username injected into the control plane credential record
pub const ENV_CONTROL_PLANE_USERNAME: &str = "CONTROL_PLANE_USERNAME";
/// Password injected into the control plane credential record
pub const ENV_CONTROL_PLANE_PASSWORD: &str = "CONTROL_PLANE_PASSWORD";
/// Endpoint injected into the server registration
pub const ENV_CONTROL_PLANE_SERVER: &str = "CONTROL_PLANE_SERVER";
/// Compute cluster for fresh instances
pub const ENV_INSTANCE_CLUSTER_ID: &str = "INSTANCE_CLUSTER_ID";
/// Compute cluster for clones
pub const ENV_CLONE_CLUSTER_ID: &str = "CLONE_CLUSTER_ID";

/// Values captured from the environment at workflow start
#[derive(Clone, Default, PartialEq, Eq)]
pub struct WorkflowEnv {
    /// Database password
    pub db_password: Option<String>,
    /// Control plane username
    pub control_plane_username: Option<String>,
    /// Control plane password
    pub control_plane_password: Option<String>,
    /// Control plane endpoint
    pub control_plane_endpoint: Option<String>,
    /// Compute cluster id for instances
    pub instance_cluster_id: Option<String>,
    /// Compute cluster id for clones
    pub clone_cluster_id: Option<String>,
}

impl WorkflowEnv {
    /// Capture from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Capture through an arbitrary lookup; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        Self {
            db_password: get(ENV_DB_PASSWORD),
            control_plane_username: get(ENV_CONTROL_PLANE_USERNAME),
            control_plane_password: get(ENV_CONTROL_PLANE_PASSWORD),
            control_plane_endpoint: get(ENV_CONTROL_PLANE_SERVER),
            instance_cluster_id: get(ENV_INSTANCE_CLUSTER_ID),
            clone_cluster_id: get(ENV_CLONE_CLUSTER_ID),
        }
    }

    /// Compute cluster id for the given mode, if set
    pub fn cluster_id_for(&self, is_clone: bool) -> Option<&str> {
        if is_clone {
            self.clone_cluster_id.as_deref()
        } else {
            self.instance_cluster_id.as_deref()
        }
    }

    /// Control plane credentials straight from the environment
    ///
    /// Used before the credential record exists, e.g. to look up a clone source.
    pub fn control_plane_credentials(&self) -> Result<ControlPlaneCredentials> {
        Ok(ControlPlaneCredentials {
            endpoint: Self::require(&self.control_plane_endpoint, ENV_CONTROL_PLANE_SERVER)?
                .to_string(),
            username: Self::require(&self.control_plane_username, ENV_CONTROL_PLANE_USERNAME)?
                .to_string(),
            password: Self::require(&self.control_plane_password, ENV_CONTROL_PLANE_PASSWORD)?
                .to_string(),
            tenant: None,
            insecure: false,
        })
    }

    /// Return a value or a configuration error naming the variable
    pub fn require<'a>(value: &'a Option<String>, variable: &str) -> Result<&'a str> {
        value
            .as_deref()
            .ok_or_else(|| Error::configuration(format!("{} is not set", variable)))
    }
}

impl fmt::Debug for WorkflowEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("WorkflowEnv")
            .field("db_password", &redact(&self.db_password))
            .field("control_plane_username", &self.control_plane_username)
            .field(
                "control_plane_password",
                &redact(&self.control_plane_password),
            )
            .field("control_plane_endpoint", &self.control_plane_endpoint)
            .field("instance_cluster_id", &self.instance_cluster_id)
            .field("clone_cluster_id", &self.clone_cluster_id)
            .finish()
    }
}

/// Poll budgets for the waits in a workflow run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkflowTimings {
    /// Waiting for `Database.status.status == READY`
    pub database_ready: RetryConfig,
    /// Waiting for the verification pod to be Running
    pub workload_running: RetryConfig,
    /// Waiting for a deleted Database to disappear
    pub database_deleted: RetryConfig,
}

impl Default for WorkflowTimings {
    fn default() -> Self {
        Self {
            database_ready: RetryConfig::DATABASE_READY,
            workload_running: RetryConfig::WORKLOAD_RUNNING,
            database_deleted: RetryConfig::DATABASE_DELETED,
        }
    }
}
