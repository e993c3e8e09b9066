//! Resource bundle loaded from YAML templates
//!
//! A bundle directory holds up to five templates. A missing file leaves the
//! corresponding resource absent and the workflow skips it.

use std::path::Path;

use k8s_openapi::api::core::v1::{Pod, Secret};
use kube::ResourceExt;
use serde::de::DeserializeOwned;
use tracing::debug;

use dbflow_common::crd::{ControlPlaneServer, Database};
use dbflow_common::{Error, Result, DEFAULT_NAMESPACE};

/// Template for the database credential record
pub const DATABASE_SECRET_FILE: &str = "database-secret.yaml";
/// Template for the control plane credential record
pub const SERVER_SECRET_FILE: &str = "server-secret.yaml";
/// Template for the server registration
pub const SERVER_FILE: &str = "server.yaml";
/// Template for the database record
pub const DATABASE_FILE: &str = "database.yaml";
/// Template for the verification workload
pub const APP_POD_FILE: &str = "app-pod.yaml";

/// The records one workflow run operates on
#[derive(Clone, Debug, Default)]
pub struct ResourceBundle {
    /// Credentials of the database itself
    pub database_secret: Option<Secret>,
    /// Credentials for the control plane
    pub server_secret: Option<Secret>,
    /// Control plane server registration
    pub server: Option<ControlPlaneServer>,
    /// The database record
    pub database: Option<Database>,
    /// Workload used to verify connectivity
    pub app_pod: Option<Pod>,
}

impl ResourceBundle {
    /// Load every template present in `dir`
    pub fn load_dir(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(Error::configuration(format!(
                "template directory '{}' does not exist",
                dir.display()
            )));
        }

        Ok(Self {
            database_secret: load_template(dir, DATABASE_SECRET_FILE)?,
            server_secret: load_template(dir, SERVER_SECRET_FILE)?,
            server: load_template(dir, SERVER_FILE)?,
            database: load_template(dir, DATABASE_FILE)?,
            app_pod: load_template(dir, APP_POD_FILE)?,
        })
    }

    /// True when no resource is present
    pub fn is_empty(&self) -> bool {
        self.database_secret.is_none()
            && self.server_secret.is_none()
            && self.server.is_none()
            && self.database.is_none()
            && self.app_pod.is_none()
    }

    /// Namespace the bundle targets, taken from the database record
    pub fn namespace(&self) -> String {
        self.database
            .as_ref()
            .map(Database::namespace_or_default)
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string())
    }
}

/// Namespace of `resource`, or `fallback` when it has none
pub(crate) fn namespace_or<K: ResourceExt>(resource: &K, fallback: &str) -> String {
    resource
        .namespace()
        .filter(|ns| !ns.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

fn load_template<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<Option<T>> {
    let path = dir.join(file);
    if !path.exists() {
        debug!(path = %path.display(), "Template not present, skipping");
        return Ok(None);
    }

    let content = std::fs::read_to_string(&path).map_err(|e| {
        Error::configuration(format!("failed to read '{}': {}", path.display(), e))
    })?;
    serde_yaml::from_str(&content).map(Some).map_err(|e| {
        Error::serialization_for_kind(file, format!("invalid template '{}': {}", path.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbflow_common::crd::DatabaseMode;

    const DATABASE_YAML: &str = r#"
apiVersion: dbflow.dev/v1alpha1
kind: Database
metadata:
  name: orders
  namespace: shop
spec:
  serverRef: cp
  instance:
    name: orders
    databaseNames: [orders]
    credentialSecret: orders-db
    size: 10
    timezone: UTC
    type: postgres
"#;

    const SECRET_YAML: &str = r#"
apiVersion: v1
kind: Secret
metadata:
  name: orders-db
stringData:
  password: ""
"#;

    fn write(dir: &Path, file: &str, content: &str) {
        std::fs::write(dir.join(file), content).expect("write template");
    }

    #[test]
    fn test_missing_files_leave_resources_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), DATABASE_FILE, DATABASE_YAML);

        let bundle = ResourceBundle::load_dir(dir.path()).expect("load");
        assert!(bundle.database.is_some());
        assert!(bundle.server.is_none());
        assert!(bundle.app_pod.is_none());
        assert!(!bundle.is_empty());
        assert_eq!(bundle.namespace(), "shop");
    }

    #[test]
    fn test_loads_typed_resources() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), DATABASE_FILE, DATABASE_YAML);
        write(dir.path(), DATABASE_SECRET_FILE, SECRET_YAML);

        let bundle = ResourceBundle::load_dir(dir.path()).expect("load");
        let database = bundle.database.expect("database");
        assert!(matches!(database.spec.mode, DatabaseMode::Instance(_)));
        assert_eq!(
            bundle.database_secret.and_then(|s| s.metadata.name),
            Some("orders-db".to_string())
        );
    }

    #[test]
    fn test_empty_directory_yields_empty_bundle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let bundle = ResourceBundle::load_dir(dir.path()).expect("load");
        assert!(bundle.is_empty());
        assert_eq!(bundle.namespace(), DEFAULT_NAMESPACE);
    }

    #[test]
    fn test_malformed_template_is_a_serialization_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), SERVER_FILE, "spec: [not, a, map");

        let err = ResourceBundle::load_dir(dir.path()).unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
    }

    #[test]
    fn test_missing_directory_is_a_configuration_error() {
        let err = ResourceBundle::load_dir(Path::new("/nonexistent/dbflow")).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }
}
