use std::sync::Arc;

use kube::ResourceExt;
use tracing::{info, Instrument};

use dbflow_common::crd::Database;
use dbflow_common::retry::poll_transition;
use dbflow_common::{log_failure, service_name_for, Error, Result};

use super::{record, Orchestrator};
use crate::bundle::{namespace_or, ResourceBundle};
use crate::report::{Step, WorkflowReport};

impl Orchestrator {
    /// Delete everything in the bundle, roughly in reverse dependency order
    ///
    /// Order: the database's Service, the database (then wait for it to go
    /// away), the server registration, both credential records, the workload.
    /// Every delete is attempted regardless of earlier failures; only an
    /// exhausted deletion wait is recorded as the run's error.
    pub async fn deprovision(&self, bundle: &ResourceBundle) -> Result<WorkflowReport> {
        self.deprovision_bundle(bundle)
            .instrument(self.span.clone())
            .await
    }

    async fn deprovision_bundle(&self, bundle: &ResourceBundle) -> Result<WorkflowReport> {
        if bundle.is_empty() {
            return Err(log_failure(
                "deprovision",
                Error::configuration("resource bundle has no resources"),
            ));
        }

        let namespace = bundle.namespace();
        info!(namespace = %namespace, "Deprovisioning resource bundle");
        let mut report = WorkflowReport::default();

        match &bundle.database {
            Some(database) => {
                let db_namespace = namespace_or(database, &namespace);
                let name = database.name_any();

                record(
                    &mut report,
                    Step::Service,
                    "delete_service",
                    self.store
                        .delete_service(&db_namespace, &service_name_for(&name))
                        .await,
                );
                record(
                    &mut report,
                    Step::Database,
                    "delete_database",
                    self.store.delete_database(&db_namespace, &name).await,
                );
                match self.wait_for_database_deleted(&db_namespace, &name).await {
                    Ok(()) => report.completed(Step::WaitDatabaseDeleted),
                    Err(e) => report.failed_hard(
                        Step::WaitDatabaseDeleted,
                        log_failure("wait_for_database_deleted", e),
                    ),
                }
            }
            None => {
                report.skipped(Step::Service);
                report.skipped(Step::Database);
                report.skipped(Step::WaitDatabaseDeleted);
            }
        }

        match target(bundle.server.as_ref(), &namespace) {
            Some((ns, name)) => record(
                &mut report,
                Step::Server,
                "delete_server",
                self.store.delete_server(&ns, &name).await,
            ),
            None => report.skipped(Step::Server),
        }

        for (step, secret) in [
            (Step::ServerSecret, bundle.server_secret.as_ref()),
            (Step::DatabaseSecret, bundle.database_secret.as_ref()),
        ] {
            match target(secret, &namespace) {
                Some((ns, name)) => record(
                    &mut report,
                    step,
                    "delete_secret",
                    self.store.delete_secret(&ns, &name).await,
                ),
                None => report.skipped(step),
            }
        }

        match target(bundle.app_pod.as_ref(), &namespace) {
            Some((ns, name)) => record(
                &mut report,
                Step::AppPod,
                "delete_pod",
                self.store.delete_pod(&ns, &name).await,
            ),
            None => report.skipped(Step::AppPod),
        }

        info!(
            failures = report.failures().count(),
            "Deprovisioning finished"
        );
        Ok(report)
    }

    /// Re-fetch the database until the store no longer returns it
    ///
    /// Gone means the fetch errors or returns a record without a name.
    async fn wait_for_database_deleted(&self, namespace: &str, name: &str) -> Result<()> {
        let (_, outcome) = poll_transition(
            &self.timings.database_deleted,
            "wait_for_database_deleted",
            None::<Database>,
            |last| {
                let store = Arc::clone(&self.store);
                let (namespace, name) = (namespace.to_string(), name.to_string());
                async move {
                    match store.get_database(&namespace, &name).await {
                        Err(_) => (last, Ok(())),
                        Ok(fetched) if fetched.metadata.name.as_deref().unwrap_or_default().is_empty() => {
                            (last, Ok(()))
                        }
                        Ok(fetched) => {
                            let status = fetched.current_status().to_string();
                            info!(database = %name, status = %status, "Database still present");
                            (
                                Some(fetched),
                                Err(Error::internal_with_context(
                                    "wait_for_database_deleted",
                                    format!(
                                        "Database '{}' still present, status '{}'",
                                        name, status
                                    ),
                                )),
                            )
                        }
                    }
                }
            },
        )
        .await;
        if outcome.is_ok() {
            info!(database = %name, "Database deleted");
        }
        outcome
    }
}

/// Namespace and name of an optional resource
fn target<K: ResourceExt>(resource: Option<&K>, fallback: &str) -> Option<(String, String)> {
    resource.map(|r| (namespace_or(r, fallback), r.name_any()))
}
