//! Control plane credentials
//!
//! Resolved from a credential record (secret) plus the server registration;
//! never read from templates.

use std::collections::BTreeMap;
use std::fmt;

use dbflow_common::{Error, Result, SECRET_KEY_PASSWORD, SECRET_KEY_USERNAME};

/// Everything needed to build a control plane client
#[derive(Clone, PartialEq, Eq)]
pub struct ControlPlaneCredentials {
    /// Base URL of the control plane REST API
    pub endpoint: String,
    /// Username for basic auth
    pub username: String,
    /// Password for basic auth
    pub password: String,
    /// Tenant to act as, if any
    pub tenant: Option<String>,
    /// Skip TLS certificate verification
    pub insecure: bool,
}

impl ControlPlaneCredentials {
    /// Build credentials from a secret's decoded key/value data
    ///
    /// Fails with `InvalidCredential` if `username` or `password` is missing or empty.
    pub fn from_secret_data(
        secret_name: &str,
        data: &BTreeMap<String, String>,
        endpoint: impl Into<String>,
    ) -> Result<Self> {
        let field = |key: &str| -> Result<String> {
            data.get(key)
                .filter(|value| !value.is_empty())
                .cloned()
                .ok_or_else(|| {
                    Error::invalid_credential(secret_name, format!("'{}' is missing or empty", key))
                })
        };

        Ok(Self {
            endpoint: endpoint.into(),
            username: field(SECRET_KEY_USERNAME)?,
            password: field(SECRET_KEY_PASSWORD)?,
            tenant: None,
            insecure: false,
        })
    }

    /// Act as the given tenant
    pub fn with_tenant(mut self, tenant: Option<String>) -> Self {
        self.tenant = tenant.filter(|t| !t.is_empty());
        self
    }

    /// Skip (or enforce) TLS certificate verification
    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }
}

impl fmt::Debug for ControlPlaneCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlPlaneCredentials")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("tenant", &self.tenant)
            .field("insecure", &self.insecure)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_credentials_from_secret_data() {
        let creds = ControlPlaneCredentials::from_secret_data(
            "cp-secret",
            &data(&[("username", "admin"), ("password", "hunter2")]),
            "https://cp.local/api",
        )
        .expect("credentials");

        assert_eq!(creds.username, "admin");
        assert_eq!(creds.endpoint, "https://cp.local/api");
        assert!(!creds.insecure);
    }

    #[test]
    fn test_empty_password_is_invalid() {
        let err = ControlPlaneCredentials::from_secret_data(
            "cp-secret",
            &data(&[("username", "admin"), ("password", "")]),
            "https://cp.local/api",
        )
        .unwrap_err();

        assert!(matches!(err, Error::InvalidCredential { .. }));
        assert!(err.to_string().contains("'password'"));
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = ControlPlaneCredentials::from_secret_data(
            "cp-secret",
            &data(&[("username", "admin"), ("password", "hunter2")]),
            "https://cp.local/api",
        )
        .expect("credentials");

        let debug = format!("{:?}", creds);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_empty_tenant_is_dropped() {
        let creds = ControlPlaneCredentials::from_secret_data(
            "cp-secret",
            &data(&[("username", "admin"), ("password", "pw")]),
            "https://cp.local/api",
        )
        .expect("credentials")
        .with_tenant(Some(String::new()));

        assert!(creds.tenant.is_none());
    }
}
