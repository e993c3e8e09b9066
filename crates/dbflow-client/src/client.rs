//! HTTP implementation of the control plane API

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use dbflow_common::{Error, Result};

use crate::api::ControlPlaneApi;
use crate::credentials::ControlPlaneCredentials;
use crate::types::{DatabaseResponse, SnapshotCollection, TimeMachineResponse};

/// Request timeout for control plane calls
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Header carrying the tenant for multi-tenant control planes
const TENANT_HEADER: &str = "X-Tenant-Id";

/// Control plane REST client using basic auth
#[derive(Debug)]
pub struct ControlPlaneClient {
    http: reqwest::Client,
    credentials: ControlPlaneCredentials,
}

impl ControlPlaneClient {
    /// Create a client for the endpoint named in `credentials`
    pub fn new(credentials: ControlPlaneCredentials) -> Result<Self> {
        if credentials.endpoint.trim().is_empty() {
            return Err(Error::configuration("control plane endpoint is empty"));
        }

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(credentials.insecure)
            .build()
            .map_err(|e| {
                Error::control_plane("new", format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self { http, credentials })
    }

    /// Endpoint this client talks to
    pub fn endpoint(&self) -> &str {
        &self.credentials.endpoint
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.credentials.endpoint, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = self.url(path);
        debug!(operation, url = %url, "Calling control plane");

        let mut request = self
            .http
            .get(&url)
            .query(query)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password));
        if let Some(tenant) = &self.credentials.tenant {
            request = request.header(TENANT_HEADER, tenant);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::control_plane(operation, format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::control_plane_status(
                operation,
                status.as_u16(),
                format!("HTTP {}: {}", status, body.trim()),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| Error::control_plane(operation, format!("invalid JSON: {}", e)))
    }
}

#[async_trait]
impl ControlPlaneApi for ControlPlaneClient {
    async fn get_database_by_id(&self, id: &str) -> Result<DatabaseResponse> {
        self.get_json(
            "get_database_by_id",
            &format!("databases/{}", id),
            &[("detailed", "true")],
        )
        .await
    }

    async fn get_database_by_name(&self, name: &str) -> Result<DatabaseResponse> {
        self.get_json(
            "get_database_by_name",
            &format!("databases/{}", name),
            &[("value-type", "name"), ("detailed", "true")],
        )
        .await
    }

    async fn get_clone_by_id(&self, id: &str) -> Result<DatabaseResponse> {
        self.get_json(
            "get_clone_by_id",
            &format!("clones/{}", id),
            &[("detailed", "true")],
        )
        .await
    }

    async fn get_time_machine_by_id(&self, id: &str) -> Result<TimeMachineResponse> {
        self.get_json(
            "get_time_machine_by_id",
            &format!("tms/{}", id),
            &[("load-sla", "true"), ("load-schedule", "true")],
        )
        .await
    }

    async fn get_snapshots_for_time_machine(
        &self,
        time_machine_id: &str,
    ) -> Result<SnapshotCollection> {
        self.get_json(
            "get_snapshots_for_time_machine",
            &format!("tms/{}/snapshots", time_machine_id),
            &[("all", "false"), ("time-zone", "UTC")],
        )
        .await
    }
}

/// Join a base URL and a relative path with exactly one slash
fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
