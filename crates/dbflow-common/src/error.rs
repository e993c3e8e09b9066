//! Error types for dbflow workflows
//!
//! Errors are structured with fields to aid debugging: resource kinds and names,
//! the last observed status of a resource that never became ready, and every
//! field-level mismatch found while validating a backup schedule.

use std::fmt;

use thiserror::Error;
use tracing::error;

/// A single field that differs between a requested and a reported value
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldMismatch {
    /// Field name as it appears in the requested resource (e.g. "dailySnapshotTime")
    pub field: String,
    /// Requested value, rendered for display
    pub expected: String,
    /// Reported value, rendered for display
    pub got: String,
}

impl FieldMismatch {
    /// Create a mismatch from anything displayable
    pub fn new(field: impl Into<String>, expected: impl fmt::Display, got: impl fmt::Display) -> Self {
        Self {
            field: field.into(),
            expected: expected.to_string(),
            got: got.to_string(),
        }
    }
}

impl fmt::Display for FieldMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "for '{}', expected: {}, got: {}",
            self.field, self.expected, self.got
        )
    }
}

fn join_mismatches(mismatches: &[FieldMismatch]) -> String {
    mismatches
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Main error type for dbflow operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// Required input is missing; never retried
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of what is missing
        message: String,
    },

    /// A resource is internally inconsistent and cannot be submitted
    #[error("validation error for {resource}: {message}")]
    Validation {
        /// Name of the offending resource
        resource: String,
        /// Description of what's invalid
        message: String,
    },

    /// A resource, record, or snapshot could not be found
    #[error("{kind} '{name}' not found")]
    NotFound {
        /// Kind of the missing thing (e.g. "Database", "snapshot")
        kind: String,
        /// Name or id that was looked up
        name: String,
    },

    /// Credential record missing or incomplete
    #[error("invalid credential in secret '{secret}': {message}")]
    InvalidCredential {
        /// Name of the credential record
        secret: String,
        /// What was wrong with it
        message: String,
    },

    /// A polled resource has not reached its ready state yet
    #[error("{kind} '{name}' not ready, current status: '{status}'")]
    NotReady {
        /// Kind of the polled resource
        kind: String,
        /// Name of the polled resource
        name: String,
        /// Last observed status string
        status: String,
    },

    /// Reported backup schedule differs from the requested one
    #[error("schedule mismatch: {}", join_mismatches(.mismatches))]
    ScheduleMismatch {
        /// Every mismatch found, in comparison order
        mismatches: Vec<FieldMismatch>,
    },

    /// Control-plane REST call failed
    #[error("control plane error in {operation}: {message}")]
    ControlPlane {
        /// Client operation that failed
        operation: String,
        /// HTTP status code, if a response was received
        status: Option<u16>,
        /// Description of what failed
        message: String,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The resource kind being processed (if known)
        kind: Option<String>,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred
        context: String,
    },
}

impl Error {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }

    /// Create a validation error for a named resource
    pub fn validation_for(resource: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            resource: resource.into(),
            message: msg.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create an invalid-credential error
    pub fn invalid_credential(secret: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::InvalidCredential {
            secret: secret.into(),
            message: msg.into(),
        }
    }

    /// Create a not-ready error carrying the last observed status
    pub fn not_ready(
        kind: impl Into<String>,
        name: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self::NotReady {
            kind: kind.into(),
            name: name.into(),
            status: status.into(),
        }
    }

    /// Create a control-plane error without an HTTP status
    pub fn control_plane(operation: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ControlPlane {
            operation: operation.into(),
            status: None,
            message: msg.into(),
        }
    }

    /// Create a control-plane error for a non-success HTTP response
    pub fn control_plane_status(
        operation: impl Into<String>,
        status: u16,
        msg: impl Into<String>,
    ) -> Self {
        Self::ControlPlane {
            operation: operation.into(),
            status: Some(status),
            message: msg.into(),
        }
    }

    /// Create a serialization error with resource kind context
    pub fn serialization_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Check if this error is a not-found condition
    ///
    /// A Kubernetes 404 counts as not-found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound { .. } => true,
            Error::Kube { source } => matches!(source, kube::Error::Api(ae) if ae.code == 404),
            Error::ControlPlane { status, .. } => *status == Some(404),
            _ => false,
        }
    }

    /// Check if this error is worth retrying
    ///
    /// Configuration, validation, credential and schedule errors need a fix
    /// to the inputs. Readiness waits stop as soon as they see one.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube { source } => {
                !matches!(
                    source,
                    kube::Error::Api(ae) if (400..500).contains(&ae.code) && ae.code != 429
                )
            }
            Error::Configuration { .. } => false,
            Error::Validation { .. } => false,
            Error::NotFound { .. } => true,
            Error::InvalidCredential { .. } => false,
            Error::NotReady { .. } => true,
            Error::ScheduleMismatch { .. } => false,
            Error::ControlPlane { status, .. } => !matches!(status, Some(400..=499)),
            Error::Serialization { .. } => false,
            Error::Internal { .. } => true,
        }
    }

    /// Schedule mismatches carried by this error, if any
    pub fn mismatches(&self) -> &[FieldMismatch] {
        match self {
            Error::ScheduleMismatch { mismatches } => mismatches,
            _ => &[],
        }
    }
}

/// Log `<operation>() failed! <cause>` at error level and hand the error back.
///
/// Keeps a single message shape across the workflow so failures can be
/// asserted on and grepped for the same way.
pub fn log_failure<E: fmt::Display>(operation: &str, err: E) -> E {
    error!("{}() failed! {}", operation, err);
    err
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Story: a database that never turns READY reports the status it was stuck in
    #[test]
    fn story_not_ready_keeps_last_status() {
        let err = Error::not_ready("Database", "orders", "CREATING");
        assert_eq!(
            err.to_string(),
            "Database 'orders' not ready, current status: 'CREATING'"
        );
        assert!(err.is_retryable());
    }

    /// Story: schedule validation surfaces every divergence in one message
    #[test]
    fn story_schedule_mismatch_lists_every_field() {
        let err = Error::ScheduleMismatch {
            mismatches: vec![
                FieldMismatch::new("name", "tm-a", "tm-b"),
                FieldMismatch::new("monthlySnapshotDay", 24, 1),
            ],
        };

        let msg = err.to_string();
        assert!(msg.contains("for 'name', expected: tm-a, got: tm-b"));
        assert!(msg.contains("for 'monthlySnapshotDay', expected: 24, got: 1"));
        assert_eq!(err.mismatches().len(), 2);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_configuration_errors_are_permanent() {
        let err = Error::configuration("DB_SECRET_PASSWORD is not set");
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("DB_SECRET_PASSWORD"));
    }

    #[test]
    fn test_not_found_classification() {
        assert!(Error::not_found("snapshot", "cluster-1").is_not_found());
        assert!(Error::control_plane_status("get_database_by_id", 404, "gone").is_not_found());
        assert!(!Error::control_plane("get_database_by_id", "timeout").is_not_found());
    }

    #[test]
    fn test_control_plane_client_errors_are_permanent() {
        assert!(!Error::control_plane_status("op", 401, "unauthorized").is_retryable());
        assert!(Error::control_plane_status("op", 503, "unavailable").is_retryable());
        assert!(Error::control_plane("op", "connection reset").is_retryable());
    }

    #[test]
    fn test_log_failure_returns_error_unchanged() {
        let err = log_failure("provision", Error::configuration("no resources"));
        assert!(matches!(err, Error::Configuration { .. }));
    }
}
