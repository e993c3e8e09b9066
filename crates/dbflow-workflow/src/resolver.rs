//! Resolve a provisioned database to its control plane view
//!
//! Credentials come from the server registration's credential record, never
//! from templates. The bundle only names which records to look at.

use std::collections::BTreeMap;
use std::sync::Arc;

use k8s_openapi::api::core::v1::Secret;
use kube::ResourceExt;
use tracing::{debug, info};

use dbflow_client::{ControlPlaneApi, ControlPlaneConnector, ControlPlaneCredentials, DatabaseResponse};
use dbflow_common::crd::{ControlPlaneServer, Database};
use dbflow_common::{log_failure, Error, Result};

use crate::bundle::{namespace_or, ResourceBundle};
use crate::store::ResourceStore;

/// A database record paired with a client for its control plane
pub struct ResolvedDatabase {
    /// Current database record from the store
    pub record: Database,
    /// Client authenticated against the record's control plane
    pub api: Arc<dyn ControlPlaneApi>,
}

impl ResolvedDatabase {
    /// Fetch the control plane's view, as a clone or an instance
    pub async fn status(&self) -> Result<DatabaseResponse> {
        let name = self.record.name_any();
        let id = self.record.control_plane_id();
        if id.is_empty() {
            return Err(Error::not_found("control plane id for Database", name));
        }

        if self.record.spec.is_clone() {
            debug!(database = %name, id, "Fetching clone from control plane");
            self.api.get_clone_by_id(id).await
        } else {
            debug!(database = %name, id, "Fetching database from control plane");
            self.api.get_database_by_id(id).await
        }
    }
}

/// Decoded key/value pairs of a secret; `stringData` wins over `data`
pub fn secret_values(secret: &Secret) -> BTreeMap<String, String> {
    let mut values: BTreeMap<String, String> = secret
        .data
        .iter()
        .flatten()
        .map(|(key, value)| (key.clone(), String::from_utf8_lossy(&value.0).into_owned()))
        .collect();
    if let Some(string_data) = &secret.string_data {
        values.extend(string_data.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    values
}

/// Fetch current records and build a control plane client for them
pub async fn resolve(
    bundle: &ResourceBundle,
    store: &dyn ResourceStore,
    connector: &dyn ControlPlaneConnector,
) -> Result<ResolvedDatabase> {
    resolve_inner(bundle, store, connector)
        .await
        .map_err(|e| log_failure("resolve", e))
}

async fn resolve_inner(
    bundle: &ResourceBundle,
    store: &dyn ResourceStore,
    connector: &dyn ControlPlaneConnector,
) -> Result<ResolvedDatabase> {
    let (server, database) = match (&bundle.server, &bundle.database) {
        (Some(server), Some(database)) => (server, database),
        _ => {
            return Err(Error::configuration(
                "resolving a database needs both a server and a database template",
            ))
        }
    };
    let namespace = bundle.namespace();
    let server_namespace = namespace_or(server, &namespace);

    let server: ControlPlaneServer = store
        .get_server(&server_namespace, &server.name_any())
        .await?;
    let record = store.get_database(&namespace, &database.name_any()).await?;

    // The credential record sits next to the server registration
    let secret_name = server.spec.credential_secret.clone();
    let secret = store
        .get_secret(&server_namespace, &secret_name)
        .await
        .map_err(|e| Error::invalid_credential(&secret_name, e.to_string()))?;

    let credentials = ControlPlaneCredentials::from_secret_data(
        &secret_name,
        &secret_values(&secret),
        server.spec.server.clone(),
    )?
    .with_tenant(server.spec.tenant.clone())
    .with_insecure(server.spec.skip_certificate_verification);

    info!(
        database = %record.name_any(),
        endpoint = %credentials.endpoint,
        clone = record.spec.is_clone(),
        "Resolved control plane for database"
    );
    let api = connector.connect(credentials)?;
    Ok(ResolvedDatabase { record, api })
}

/// Current control plane state of the bundle's database
pub async fn resolve_status(
    bundle: &ResourceBundle,
    store: &dyn ResourceStore,
    connector: &dyn ControlPlaneConnector,
) -> Result<DatabaseResponse> {
    let resolved = resolve(bundle, store, connector).await?;
    resolved
        .status()
        .await
        .map_err(|e| log_failure("resolve_status", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MockResourceStore;
    use crate::testing::{
        clone_database, control_plane_secret, database_response, instance_database, server,
        with_status, MockControlPlane, StaticConnector, NAMESPACE,
    };
    use k8s_openapi::ByteString;
    use mockall::predicate::eq;

    fn bundle(database: Database) -> ResourceBundle {
        ResourceBundle {
            server: Some(server()),
            database: Some(database),
            ..Default::default()
        }
    }

    fn store_with(database: Database, secret: Option<Secret>) -> MockResourceStore {
        let mut store = MockResourceStore::new();
        store.expect_get_server().returning(|_, _| Ok(server()));
        store
            .expect_get_database()
            .returning(move |_, _| Ok(database.clone()));
        store.expect_get_secret().returning(move |_, name| {
            secret
                .clone()
                .ok_or_else(|| Error::not_found("Secret", name))
        });
        store
    }

    #[test]
    fn test_secret_values_prefers_string_data() {
        let mut secret = control_plane_secret("admin", "old");
        secret.data = Some(BTreeMap::from([
            ("username".to_string(), ByteString(b"admin".to_vec())),
            ("password".to_string(), ByteString(b"old".to_vec())),
        ]));
        secret.string_data = Some(BTreeMap::from([(
            "password".to_string(),
            "new".to_string(),
        )]));

        let values = secret_values(&secret);
        assert_eq!(values.get("username").map(String::as_str), Some("admin"));
        assert_eq!(values.get("password").map(String::as_str), Some("new"));
    }

    #[tokio::test]
    async fn test_instance_dispatches_to_database_lookup() {
        let database = with_status(instance_database(), "db-1", "READY");
        let store = store_with(database, Some(control_plane_secret("admin", "pw")));

        let mut api = MockControlPlane::new();
        api.expect_get_database_by_id()
            .with(eq("db-1"))
            .returning(|id| Ok(database_response(id, "READY", false)));
        api.expect_get_clone_by_id().never();
        let connector = StaticConnector::new(api);

        let response = resolve_status(&bundle(instance_database()), &store, &connector)
            .await
            .expect("status");
        assert_eq!(response.id, "db-1");

        let credentials = connector.last_credentials().expect("connected");
        assert_eq!(credentials.username, "admin");
        assert_eq!(credentials.endpoint, "https://cp.local/api");
    }

    #[tokio::test]
    async fn test_clone_dispatches_to_clone_lookup() {
        let database = with_status(clone_database(), "clone-1", "READY");
        let store = store_with(database, Some(control_plane_secret("admin", "pw")));

        let mut api = MockControlPlane::new();
        api.expect_get_clone_by_id()
            .with(eq("clone-1"))
            .returning(|id| Ok(database_response(id, "READY", true)));
        api.expect_get_database_by_id().never();

        let response = resolve_status(
            &bundle(clone_database()),
            &store,
            &StaticConnector::new(api),
        )
        .await
        .expect("status");
        assert!(response.clone);
    }

    #[tokio::test]
    async fn test_empty_password_is_invalid_credential() {
        let database = with_status(instance_database(), "db-1", "READY");
        let store = store_with(database, Some(control_plane_secret("admin", "")));

        let err = resolve_status(
            &bundle(instance_database()),
            &store,
            &StaticConnector::new(MockControlPlane::new()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::InvalidCredential { .. }));
    }

    #[tokio::test]
    async fn test_missing_secret_is_invalid_credential() {
        let database = with_status(instance_database(), "db-1", "READY");
        let store = store_with(database, None);

        let err = resolve_status(
            &bundle(instance_database()),
            &store,
            &StaticConnector::new(MockControlPlane::new()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::InvalidCredential { .. }));
    }

    #[tokio::test]
    async fn test_unassigned_id_is_not_found() {
        let store = store_with(instance_database(), Some(control_plane_secret("admin", "pw")));

        let err = resolve_status(
            &bundle(instance_database()),
            &store,
            &StaticConnector::new(MockControlPlane::new()),
        )
        .await
        .unwrap_err();
        assert!(err.is_not_found());
    }

    /// Story: the server registration lives in a shared `cp-system`
    /// namespace while the database sits in `shop`. The server and its
    /// credential record must be read from `cp-system`.
    #[tokio::test]
    async fn story_server_in_its_own_namespace() {
        let mut registered = server();
        registered.metadata.namespace = Some("cp-system".to_string());

        let mut store = MockResourceStore::new();
        let found = registered.clone();
        store
            .expect_get_server()
            .with(eq("cp-system"), eq("cp"))
            .returning(move |_, _| Ok(found.clone()));
        store
            .expect_get_database()
            .with(eq(NAMESPACE), eq("orders"))
            .returning(|_, _| Ok(with_status(instance_database(), "db-1", "READY")));
        store
            .expect_get_secret()
            .with(eq("cp-system"), eq("cp-creds"))
            .returning(|_, _| Ok(control_plane_secret("admin", "pw")));

        let mut api = MockControlPlane::new();
        api.expect_get_database_by_id()
            .returning(|id| Ok(database_response(id, "READY", false)));

        let bundle = ResourceBundle {
            server: Some(registered),
            database: Some(instance_database()),
            ..Default::default()
        };
        let response = resolve_status(&bundle, &store, &StaticConnector::new(api))
            .await
            .expect("status");
        assert_eq!(response.id, "db-1");
    }

    #[tokio::test]
    async fn test_bundle_without_server_is_configuration_error() {
        let store = MockResourceStore::new();
        let bundle = ResourceBundle {
            database: Some(instance_database()),
            ..Default::default()
        };

        let err = resolve_status(
            &bundle,
            &store,
            &StaticConnector::new(MockControlPlane::new()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }
}
