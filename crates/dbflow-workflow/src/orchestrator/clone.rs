use kube::ResourceExt;
use tracing::{info, Instrument};

use dbflow_client::ControlPlaneApi;
use dbflow_common::crd::{CloneSpec, DatabaseMode};
use dbflow_common::{log_failure, Error, Result};

use super::Orchestrator;
use crate::bundle::ResourceBundle;
use crate::snapshot::select_snapshot_id;

/// Point `clone` at a snapshot of `source_name`
///
/// Looks the source up by name, lists its time machine's snapshots, and picks
/// one for the clone's cluster. The cluster id must already be set.
pub async fn prepare_clone_source(
    clone: &mut CloneSpec,
    api: &dyn ControlPlaneApi,
    source_name: &str,
) -> Result<()> {
    if clone.cluster_id.trim().is_empty() {
        return Err(Error::validation_for(
            clone.name.clone(),
            "clone requires non-empty clusterId to select a snapshot",
        ));
    }

    let source = api.get_database_by_name(source_name).await?;
    if source.time_machine_id.is_empty() {
        return Err(Error::not_found("time machine of database", source_name));
    }

    let snapshots = api
        .get_snapshots_for_time_machine(&source.time_machine_id)
        .await?;
    let snapshot_id = select_snapshot_id(&snapshots, &clone.cluster_id)?;

    info!(
        source = %source_name,
        source_id = %source.id,
        snapshot_id = %snapshot_id,
        cluster_id = %clone.cluster_id,
        "Selected clone source"
    );
    clone.source_database_id = source.id;
    clone.snapshot_id = snapshot_id;
    Ok(())
}

impl Orchestrator {
    /// Fill the bundle's clone record from `source_name` before provisioning
    ///
    /// The clone cluster id from the environment wins over the template's.
    pub async fn prepare_clone(
        &self,
        bundle: &mut ResourceBundle,
        api: &dyn ControlPlaneApi,
        source_name: &str,
    ) -> Result<()> {
        let cluster_id = self.env.clone_cluster_id.clone();

        async move {
            let Some(database) = bundle.database.as_mut() else {
                return Err(Error::configuration(
                    "clone preparation needs a database template",
                ));
            };
            let resource = database.name_any();

            match &mut database.spec.mode {
                DatabaseMode::Clone(clone) => {
                    if let Some(cluster_id) = cluster_id {
                        clone.cluster_id = cluster_id;
                    }
                    prepare_clone_source(clone, api, source_name).await
                }
                DatabaseMode::Instance(_) => Err(Error::validation_for(
                    resource,
                    "database template is not a clone",
                )),
            }
        }
        .instrument(self.span.clone())
        .await
        .map_err(|e| log_failure("prepare_clone", e))
    }
}
