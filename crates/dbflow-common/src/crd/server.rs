//! ControlPlaneServer Custom Resource Definition
//!
//! Registers a database-service control plane endpoint and names the secret
//! that holds the username/password used to talk to it.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Desired state of a ControlPlaneServer
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "dbflow.dev",
    version = "v1alpha1",
    kind = "ControlPlaneServer",
    plural = "controlplaneservers",
    shortname = "cps",
    namespaced,
    status = "ControlPlaneServerStatus",
    printcolumn = r#"{"name":"Server","type":"string","jsonPath":".spec.server"}"#,
    printcolumn = r#"{"name":"Status","type":"string","jsonPath":".status.status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ControlPlaneServerSpec {
    /// Base URL of the control plane REST API
    #[serde(default)]
    pub server: String,

    /// Name of the secret holding `username` and `password`
    pub credential_secret: String,

    /// Accept self-signed control plane certificates
    #[serde(default)]
    pub skip_certificate_verification: bool,

    /// Tenant to act as, for multi-tenant control planes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
}

/// Status of a ControlPlaneServer
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ControlPlaneServerStatus {
    /// Connectivity status reported by the operator
    #[serde(default)]
    pub status: String,

    /// Last time the status was refreshed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}
