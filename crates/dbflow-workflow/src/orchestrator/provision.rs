use std::collections::BTreeMap;
use std::sync::Arc;

use k8s_openapi::api::core::v1::{Pod, Secret};
use kube::{Resource, ResourceExt};
use tracing::{info, Instrument};

use dbflow_common::crd::{Database, DatabaseMode};
use dbflow_common::retry::poll_transition_if;
use dbflow_common::{
    log_failure, Error, Result, POD_PHASE_RUNNING, SECRET_KEY_PASSWORD, SECRET_KEY_USERNAME,
};

use super::{record, Orchestrator};
use crate::bundle::{namespace_or, ResourceBundle};
use crate::env::{
    WorkflowEnv, ENV_CONTROL_PLANE_PASSWORD, ENV_CONTROL_PLANE_SERVER,
    ENV_CONTROL_PLANE_USERNAME, ENV_DB_PASSWORD,
};
use crate::report::{Step, WorkflowReport};

impl Orchestrator {
    /// Submit every present resource, then wait for the database and workload
    ///
    /// Fails before touching the store when the bundle is empty or when a
    /// clone is missing its source, cluster, or snapshot. Credentials are not
    /// best-effort: an unset `DB_SECRET_PASSWORD` (database secret present),
    /// `CONTROL_PLANE_USERNAME` or `CONTROL_PLANE_PASSWORD` (server secret
    /// present), or `CONTROL_PLANE_SERVER` (server present) aborts the run
    /// with [`Error::Configuration`] before any create is submitted.
    ///
    /// After that point failures land in the report. Submissions are
    /// best-effort. A wait that exhausts its budget, or sees an error
    /// [`Error::is_retryable`] rejects, is recorded as the run's error (see
    /// [`WorkflowReport::into_result`]).
    ///
    /// The bundle's database and workload are replaced with the last fetched
    /// versions, so assigned ids and statuses are visible to the caller.
    pub async fn provision(&self, bundle: &mut ResourceBundle) -> Result<WorkflowReport> {
        self.provision_bundle(bundle)
            .instrument(self.span.clone())
            .await
    }

    async fn provision_bundle(&self, bundle: &mut ResourceBundle) -> Result<WorkflowReport> {
        if bundle.is_empty() {
            return Err(log_failure(
                "provision",
                Error::configuration("resource bundle has no resources"),
            ));
        }

        let namespace = bundle.namespace();
        self.prepare(bundle, &namespace)
            .map_err(|e| log_failure("provision", e))?;
        info!(namespace = %namespace, "Provisioning resource bundle");

        let mut report = WorkflowReport::default();

        for (step, secret) in [
            (Step::DatabaseSecret, &bundle.database_secret),
            (Step::ServerSecret, &bundle.server_secret),
        ] {
            match secret {
                Some(secret) => record(
                    &mut report,
                    step,
                    "create_secret",
                    self.store.create_secret(secret).await,
                ),
                None => report.skipped(step),
            }
        }

        match &bundle.server {
            Some(server) => record(
                &mut report,
                Step::Server,
                "create_server",
                self.store.create_server(server).await,
            ),
            None => report.skipped(Step::Server),
        }

        match &bundle.database {
            Some(database) => {
                info!(
                    database = %database.name_any(),
                    clone = database.spec.is_clone(),
                    cluster_id = %database.spec.cluster_id(),
                    "Submitting database"
                );
                record(
                    &mut report,
                    Step::Database,
                    "create_database",
                    self.store.create_database(database).await,
                )
            }
            None => report.skipped(Step::Database),
        }

        match &bundle.app_pod {
            Some(pod) => record(
                &mut report,
                Step::AppPod,
                "create_pod",
                self.store.create_pod(pod).await,
            ),
            None => report.skipped(Step::AppPod),
        }

        // A failed create still gets waited on: the record may already exist,
        // and if it does not the wait surfaces that as the run's error.
        match bundle.database.take() {
            Some(database) => {
                let (database, outcome) = self.wait_for_database_ready(database).await;
                bundle.database = Some(database);
                match outcome {
                    Ok(()) => report.completed(Step::WaitDatabaseReady),
                    Err(e) => report.failed_hard(
                        Step::WaitDatabaseReady,
                        log_failure("wait_for_database_ready", e),
                    ),
                }
            }
            None => report.skipped(Step::WaitDatabaseReady),
        }

        match bundle.app_pod.take() {
            Some(pod) => {
                let (pod, outcome) = self.wait_for_workload_running(pod).await;
                bundle.app_pod = Some(pod);
                match outcome {
                    Ok(()) => report.completed(Step::WaitAppPodRunning),
                    Err(e) => report.failed_hard(
                        Step::WaitAppPodRunning,
                        log_failure("wait_for_workload_running", e),
                    ),
                }
            }
            None => report.skipped(Step::WaitAppPodRunning),
        }

        info!(
            failures = report.failures().count(),
            "Provisioning finished"
        );
        Ok(report)
    }

    /// Inject environment values, pin namespaces, and validate clones
    fn prepare(&self, bundle: &mut ResourceBundle, namespace: &str) -> Result<()> {
        if let Some(secret) = bundle.database_secret.as_mut() {
            let password = WorkflowEnv::require(&self.env.db_password, ENV_DB_PASSWORD)?;
            set_namespace(secret, namespace);
            inject(secret, &[(SECRET_KEY_PASSWORD, password)]);
        }

        if let Some(secret) = bundle.server_secret.as_mut() {
            let username = WorkflowEnv::require(
                &self.env.control_plane_username,
                ENV_CONTROL_PLANE_USERNAME,
            )?;
            let password = WorkflowEnv::require(
                &self.env.control_plane_password,
                ENV_CONTROL_PLANE_PASSWORD,
            )?;
            set_namespace(secret, namespace);
            inject(
                secret,
                &[(SECRET_KEY_USERNAME, username), (SECRET_KEY_PASSWORD, password)],
            );
        }

        if let Some(server) = bundle.server.as_mut() {
            let endpoint = WorkflowEnv::require(
                &self.env.control_plane_endpoint,
                ENV_CONTROL_PLANE_SERVER,
            )?;
            set_namespace(server, namespace);
            server.spec.server = endpoint.to_string();
        }

        if let Some(database) = bundle.database.as_mut() {
            set_namespace(database, namespace);
            if let Some(cluster_id) = self.env.cluster_id_for(database.spec.is_clone()) {
                database.spec.set_cluster_id(cluster_id);
            }
            if let DatabaseMode::Clone(clone) = &database.spec.mode {
                clone.validate(&database.name_any())?;
            }
        }

        if let Some(pod) = bundle.app_pod.as_mut() {
            set_namespace(pod, namespace);
        }

        Ok(())
    }

    /// Re-fetch the database until it reports READY
    async fn wait_for_database_ready(&self, database: Database) -> (Database, Result<()>) {
        let namespace = database.namespace_or_default();
        let name = database.name_any();

        poll_transition_if(
            &self.timings.database_ready,
            "wait_for_database_ready",
            database,
            Error::is_retryable,
            |current| {
                let store = Arc::clone(&self.store);
                let (namespace, name) = (namespace.clone(), name.clone());
                async move {
                    match store.get_database(&namespace, &name).await {
                        Ok(fetched) if fetched.is_ready() => {
                            info!(database = %name, "Database is READY");
                            (fetched, Ok(()))
                        }
                        Ok(fetched) => {
                            let status = fetched.current_status().to_string();
                            info!(database = %name, status = %status, "Database not ready yet");
                            (fetched, Err(Error::not_ready("Database", name, status)))
                        }
                        Err(e) => (current, Err(e)),
                    }
                }
            },
        )
        .await
    }

    /// Re-fetch the workload until its phase is Running
    async fn wait_for_workload_running(&self, pod: Pod) -> (Pod, Result<()>) {
        let namespace = namespace_or(&pod, dbflow_common::DEFAULT_NAMESPACE);
        let name = pod.name_any();

        poll_transition_if(
            &self.timings.workload_running,
            "wait_for_workload_running",
            pod,
            Error::is_retryable,
            |current| {
                let store = Arc::clone(&self.store);
                let (namespace, name) = (namespace.clone(), name.clone());
                async move {
                    match store.get_pod(&namespace, &name).await {
                        Ok(fetched) => {
                            let phase = pod_phase(&fetched).to_string();
                            if phase == POD_PHASE_RUNNING {
                                info!(pod = %name, "Workload is Running");
                                (fetched, Ok(()))
                            } else {
                                (fetched, Err(Error::not_ready("Pod", name, phase)))
                            }
                        }
                        Err(e) => (current, Err(e)),
                    }
                }
            },
        )
        .await
    }
}

fn pod_phase(pod: &Pod) -> &str {
    pod.status
        .as_ref()
        .and_then(|status| status.phase.as_deref())
        .unwrap_or_default()
}

fn set_namespace<K: Resource>(resource: &mut K, namespace: &str) {
    let meta = resource.meta_mut();
    if meta.namespace.as_deref().map_or(true, str::is_empty) {
        meta.namespace = Some(namespace.to_string());
    }
}

fn inject(secret: &mut Secret, values: &[(&str, &str)]) {
    let data = secret.string_data.get_or_insert_with(BTreeMap::new);
    for (key, value) in values {
        data.insert(key.to_string(), value.to_string());
    }
}
