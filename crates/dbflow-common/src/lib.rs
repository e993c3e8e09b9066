//! Common types for dbflow: custom resources, errors, and retry primitives

#![deny(missing_docs)]

pub mod crd;
pub mod error;
pub mod retry;

pub use error::{log_failure, Error};

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Namespace used when a database record does not name one
pub const DEFAULT_NAMESPACE: &str = "default";

/// `Database.status.status` value reported once the control plane finished provisioning
pub const DATABASE_STATUS_READY: &str = "READY";

/// Pod phase that marks the verification workload as started
pub const POD_PHASE_RUNNING: &str = "Running";

/// Suffix appended to a database name to derive its network-exposure Service
pub const SERVICE_NAME_SUFFIX: &str = "-svc";

/// Credential record key holding the username
pub const SECRET_KEY_USERNAME: &str = "username";

/// Credential record key holding the password
pub const SECRET_KEY_PASSWORD: &str = "password";

/// SLA names that mean "no backup policy requested"
pub const NO_SLA_NAMES: [&str; 2] = ["", "NONE"];

/// Name of the Service that exposes a database
pub fn service_name_for(database_name: &str) -> String {
    format!("{}{}", database_name, SERVICE_NAME_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_name_derivation() {
        assert_eq!(service_name_for("orders"), "orders-svc");
    }
}
