//! Resource store seam
//!
//! Every interaction with the cluster's desired-state store goes through
//! [`ResourceStore`], so workflows can be driven against a mock or an
//! in-memory fake in tests and against the Kubernetes API in production.

use std::fmt::Debug;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Pod, Secret, Service};
use k8s_openapi::NamespaceResourceScope;
use kube::api::{DeleteParams, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use dbflow_common::crd::{ControlPlaneServer, Database};
use dbflow_common::{Error, Result, DEFAULT_NAMESPACE};

/// Connection timeout for the Kubernetes API
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Read timeout for the Kubernetes API
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Create/get/delete on the record kinds a workflow touches
///
/// `get_*` fails with a not-found error when the record does not exist.
/// `delete_*` succeeds when the record is already gone.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Submit a credential record
    async fn create_secret(&self, secret: &Secret) -> Result<Secret>;
    /// Fetch a credential record
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret>;
    /// Delete a credential record
    async fn delete_secret(&self, namespace: &str, name: &str) -> Result<()>;

    /// Submit a server registration
    async fn create_server(&self, server: &ControlPlaneServer) -> Result<ControlPlaneServer>;
    /// Fetch a server registration
    async fn get_server(&self, namespace: &str, name: &str) -> Result<ControlPlaneServer>;
    /// Delete a server registration
    async fn delete_server(&self, namespace: &str, name: &str) -> Result<()>;

    /// Submit a database record
    async fn create_database(&self, database: &Database) -> Result<Database>;
    /// Fetch a database record
    async fn get_database(&self, namespace: &str, name: &str) -> Result<Database>;
    /// Delete a database record
    async fn delete_database(&self, namespace: &str, name: &str) -> Result<()>;

    /// Submit a workload
    async fn create_pod(&self, pod: &Pod) -> Result<Pod>;
    /// Fetch a workload
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod>;
    /// Delete a workload
    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<()>;

    /// Delete a network-exposure record
    async fn delete_service(&self, namespace: &str, name: &str) -> Result<()>;
}

/// [`ResourceStore`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    /// Wrap an existing client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using a kubeconfig file, or the inferred config when `None`
    pub async fn connect(kubeconfig: Option<&Path>) -> Result<Self> {
        let mut config = match kubeconfig {
            Some(path) => {
                let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                    Error::internal_with_context(
                        "connect",
                        format!("failed to read kubeconfig: {}", e),
                    )
                })?;
                Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await
                    .map_err(|e| {
                        Error::internal_with_context(
                            "connect",
                            format!("failed to load kubeconfig: {}", e),
                        )
                    })?
            }
            None => Config::infer().await.map_err(|e| {
                Error::internal_with_context("connect", format!("failed to infer config: {}", e))
            })?,
        };
        config.connect_timeout = Some(DEFAULT_CONNECT_TIMEOUT);
        config.read_timeout = Some(DEFAULT_READ_TIMEOUT);

        let client = Client::try_from(config).map_err(|e| {
            Error::internal_with_context("connect", format!("failed to create client: {}", e))
        })?;
        Ok(Self::new(client))
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        K::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    async fn create<K>(&self, resource: &K) -> Result<K>
    where
        K: Resource<Scope = NamespaceResourceScope>
            + Clone
            + Debug
            + DeserializeOwned
            + Serialize
            + Send
            + Sync,
        K::DynamicType: Default,
    {
        let namespace = resource
            .namespace()
            .filter(|ns| !ns.is_empty())
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
        debug!(
            kind = %K::kind(&K::DynamicType::default()),
            name = %resource.name_any(),
            namespace = %namespace,
            "Creating resource"
        );
        Ok(self
            .api::<K>(&namespace)
            .create(&PostParams::default(), resource)
            .await?)
    }

    async fn get<K>(&self, namespace: &str, name: &str) -> Result<K>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + Debug + DeserializeOwned,
        K::DynamicType: Default,
    {
        match self.api::<K>(namespace).get(name).await {
            Ok(resource) => Ok(resource),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Err(Error::not_found(
                K::kind(&K::DynamicType::default()),
                format!("{}/{}", namespace, name),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete<K>(&self, namespace: &str, name: &str) -> Result<()>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + Debug + DeserializeOwned,
        K::DynamicType: Default,
    {
        match self
            .api::<K>(namespace)
            .delete(name, &DeleteParams::default())
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                debug!(
                    kind = %K::kind(&K::DynamicType::default()),
                    name,
                    namespace,
                    "Resource already deleted"
                );
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ResourceStore for KubeStore {
    async fn create_secret(&self, secret: &Secret) -> Result<Secret> {
        self.create(secret).await
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret> {
        self.get(namespace, name).await
    }

    async fn delete_secret(&self, namespace: &str, name: &str) -> Result<()> {
        self.delete::<Secret>(namespace, name).await
    }

    async fn create_server(&self, server: &ControlPlaneServer) -> Result<ControlPlaneServer> {
        self.create(server).await
    }

    async fn get_server(&self, namespace: &str, name: &str) -> Result<ControlPlaneServer> {
        self.get(namespace, name).await
    }

    async fn delete_server(&self, namespace: &str, name: &str) -> Result<()> {
        self.delete::<ControlPlaneServer>(namespace, name).await
    }

    async fn create_database(&self, database: &Database) -> Result<Database> {
        self.create(database).await
    }

    async fn get_database(&self, namespace: &str, name: &str) -> Result<Database> {
        self.get(namespace, name).await
    }

    async fn delete_database(&self, namespace: &str, name: &str) -> Result<()> {
        self.delete::<Database>(namespace, name).await
    }

    async fn create_pod(&self, pod: &Pod) -> Result<Pod> {
        self.create(pod).await
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod> {
        self.get(namespace, name).await
    }

    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<()> {
        self.delete::<Pod>(namespace, name).await
    }

    async fn delete_service(&self, namespace: &str, name: &str) -> Result<()> {
        self.delete::<Service>(namespace, name).await
    }
}
