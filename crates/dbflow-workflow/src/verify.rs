//! Post-provisioning checks against what actually came up

use std::time::Duration;

use k8s_openapi::api::core::v1::Pod;
use tracing::info;

use dbflow_client::ControlPlaneConnector;
use dbflow_common::{log_failure, Error, Result};

use crate::bundle::ResourceBundle;
use crate::resolver::resolve;
use crate::schedule::validate_schedule;
use crate::store::ResourceStore;

/// Timeout for a single workload probe
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Check the reported time machine schedule against the requested one
///
/// Skipped when the bundle's database requests no backup policy (clones,
/// no time machine, or an SLA name of `""`/`"NONE"`).
pub async fn verify_time_machine(
    bundle: &ResourceBundle,
    store: &dyn ResourceStore,
    connector: &dyn ControlPlaneConnector,
) -> Result<()> {
    let requested = match bundle
        .database
        .as_ref()
        .and_then(|db| db.spec.time_machine())
        .filter(|tm| tm.requests_backup_policy())
    {
        Some(requested) => requested,
        None => {
            info!("No backup policy requested, skipping time machine verification");
            return Ok(());
        }
    };

    let resolved = resolve(bundle, store, connector).await?;
    let status = resolved
        .status()
        .await
        .map_err(|e| log_failure("verify_time_machine", e))?;
    if status.time_machine_id.is_empty() {
        return Err(log_failure(
            "verify_time_machine",
            Error::not_found("time machine of database", status.name),
        ));
    }

    let time_machine = resolved
        .api
        .get_time_machine_by_id(&status.time_machine_id)
        .await
        .map_err(|e| log_failure("verify_time_machine", e))?;

    validate_schedule(requested, &time_machine.schedule_report())
        .map_err(|e| log_failure("verify_time_machine", e))?;
    info!(time_machine = %time_machine.name, "Time machine schedule matches request");
    Ok(())
}

/// URL of the workload's first declared container port on `host`
pub fn workload_url(pod: &Pod, host: &str) -> Option<String> {
    let port = pod
        .spec
        .as_ref()?
        .containers
        .iter()
        .flat_map(|c| c.ports.iter().flatten())
        .map(|p| p.container_port)
        .next()?;
    Some(format!("http://{}:{}/", host, port))
}

/// GET `url` and succeed on any 2xx response
pub async fn probe_workload(url: &str) -> Result<()> {
    let http = reqwest::Client::builder()
        .timeout(PROBE_TIMEOUT)
        .build()
        .map_err(|e| {
            Error::internal_with_context("probe_workload", format!("failed to create HTTP client: {}", e))
        })?;

    let response = http.get(url).send().await.map_err(|e| {
        log_failure(
            "probe_workload",
            Error::internal_with_context("probe_workload", format!("request to {} failed: {}", url, e)),
        )
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(log_failure(
            "probe_workload",
            Error::internal_with_context(
                "probe_workload",
                format!("{} answered HTTP {}", url, status),
            ),
        ));
    }
    info!(url, status = status.as_u16(), "Workload answered");
    Ok(())
}
