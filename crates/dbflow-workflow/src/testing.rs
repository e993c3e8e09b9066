//! Shared fixtures and mocks for unit tests

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use k8s_openapi::api::core::v1::{Container, ContainerPort, Pod, PodSpec, PodStatus, Secret};
use kube::api::ObjectMeta;
use mockall::mock;

use dbflow_client::{
    ContinuousSchedule, ControlPlaneApi, ControlPlaneConnector, ControlPlaneCredentials,
    DatabaseResponse, MonthlySchedule, ScheduleResponse, SlaResponse, SnapshotCollection,
    SnapshotTimeOfDay, TimeMachineResponse, WeeklySchedule,
};
use dbflow_common::crd::{
    CloneSpec, ControlPlaneServer, ControlPlaneServerSpec, Database, DatabaseMode, DatabaseSpec,
    DatabaseStatus, InstanceSpec, TimeMachineInfo,
};
use dbflow_common::Result;

use crate::bundle::ResourceBundle;
use crate::env::WorkflowEnv;

mock! {
    pub ControlPlane {}

    #[async_trait::async_trait]
    impl ControlPlaneApi for ControlPlane {
        async fn get_database_by_id(&self, id: &str) -> Result<DatabaseResponse>;
        async fn get_database_by_name(&self, name: &str) -> Result<DatabaseResponse>;
        async fn get_clone_by_id(&self, id: &str) -> Result<DatabaseResponse>;
        async fn get_time_machine_by_id(&self, id: &str) -> Result<TimeMachineResponse>;
        async fn get_snapshots_for_time_machine(&self, time_machine_id: &str) -> Result<SnapshotCollection>;
    }
}

/// Connector handing out one fixed API and remembering the credentials it saw
pub struct StaticConnector {
    api: Arc<dyn ControlPlaneApi>,
    last: Mutex<Option<ControlPlaneCredentials>>,
}

impl StaticConnector {
    pub fn new(api: MockControlPlane) -> Self {
        Self {
            api: Arc::new(api),
            last: Mutex::new(None),
        }
    }

    pub fn last_credentials(&self) -> Option<ControlPlaneCredentials> {
        self.last.lock().expect("lock").clone()
    }
}

impl ControlPlaneConnector for StaticConnector {
    fn connect(&self, credentials: ControlPlaneCredentials) -> Result<Arc<dyn ControlPlaneApi>> {
        *self.last.lock().expect("lock") = Some(credentials);
        Ok(self.api.clone())
    }
}

pub const NAMESPACE: &str = "shop";

fn meta(name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        ..Default::default()
    }
}

pub fn requested_time_machine() -> TimeMachineInfo {
    TimeMachineInfo {
        name: "orders_TM".to_string(),
        description: "orders backups".to_string(),
        sla_name: "DEFAULT_OOB_GOLD_SLA".to_string(),
        daily_snapshot_time: "12:12:12".to_string(),
        snapshots_per_day: 4,
        log_catch_up_frequency: 90,
        weekly_snapshot_day: "WEDNESDAY".to_string(),
        monthly_snapshot_day: 24,
    }
}

pub fn instance_database() -> Database {
    let mut database = Database::new(
        "orders",
        DatabaseSpec {
            server_ref: "cp".to_string(),
            mode: DatabaseMode::Instance(InstanceSpec {
                name: "orders".to_string(),
                database_names: vec!["orders".to_string()],
                credential_secret: "orders-db".to_string(),
                size: 10,
                db_type: "postgres".to_string(),
                time_machine: Some(requested_time_machine()),
                ..Default::default()
            }),
        },
    );
    database.metadata.namespace = Some(NAMESPACE.to_string());
    database
}

pub fn clone_database() -> Database {
    let mut database = Database::new(
        "orders-clone",
        DatabaseSpec {
            server_ref: "cp".to_string(),
            mode: DatabaseMode::Clone(CloneSpec {
                name: "orders-clone".to_string(),
                cluster_id: "cluster-b".to_string(),
                source_database_id: "db-1".to_string(),
                snapshot_id: "snap-1".to_string(),
                credential_secret: "orders-db".to_string(),
                db_type: "postgres".to_string(),
                ..Default::default()
            }),
        },
    );
    database.metadata.namespace = Some(NAMESPACE.to_string());
    database
}

pub fn with_status(mut database: Database, id: &str, status: &str) -> Database {
    database.status = Some(DatabaseStatus {
        id: id.to_string(),
        status: status.to_string(),
        ..Default::default()
    });
    database
}

pub fn server() -> ControlPlaneServer {
    ControlPlaneServer::new(
        "cp",
        ControlPlaneServerSpec {
            server: "https://cp.local/api".to_string(),
            credential_secret: "cp-creds".to_string(),
            skip_certificate_verification: true,
            tenant: None,
        },
    )
}

pub fn control_plane_secret(username: &str, password: &str) -> Secret {
    Secret {
        metadata: meta("cp-creds"),
        string_data: Some(BTreeMap::from([
            ("username".to_string(), username.to_string()),
            ("password".to_string(), password.to_string()),
        ])),
        ..Default::default()
    }
}

pub fn database_secret() -> Secret {
    Secret {
        metadata: meta("orders-db"),
        ..Default::default()
    }
}

pub fn app_pod() -> Pod {
    Pod {
        metadata: meta("orders-app"),
        spec: Some(PodSpec {
            containers: vec![Container {
                name: "app".to_string(),
                image: Some("ghcr.io/dbflow/probe:latest".to_string()),
                ports: Some(vec![ContainerPort {
                    container_port: 8080,
                    ..Default::default()
                }]),
                ..Default::default()
            }],
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn pod_in_phase(phase: &str) -> Pod {
    let mut pod = app_pod();
    pod.status = Some(PodStatus {
        phase: Some(phase.to_string()),
        ..Default::default()
    });
    pod
}

pub fn full_bundle() -> ResourceBundle {
    ResourceBundle {
        database_secret: Some(database_secret()),
        server_secret: Some(control_plane_secret("", "")),
        server: Some(server()),
        database: Some(instance_database()),
        app_pod: Some(app_pod()),
    }
}

pub fn full_env() -> WorkflowEnv {
    WorkflowEnv {
        db_password: Some("db-pw".to_string()),
        control_plane_username: Some("admin".to_string()),
        control_plane_password: Some("cp-pw".to_string()),
        control_plane_endpoint: Some("https://cp.local/api".to_string()),
        instance_cluster_id: Some("cluster-a".to_string()),
        clone_cluster_id: Some("cluster-b".to_string()),
    }
}

pub fn database_response(id: &str, status: &str, clone: bool) -> DatabaseResponse {
    DatabaseResponse {
        id: id.to_string(),
        name: "orders".to_string(),
        status: status.to_string(),
        clone,
        ..Default::default()
    }
}

pub fn time_machine_response(hours: u32) -> TimeMachineResponse {
    TimeMachineResponse {
        id: "tm-1".to_string(),
        name: "orders_TM".to_string(),
        description: "orders backups".to_string(),
        sla: Some(SlaResponse {
            id: "sla-1".to_string(),
            name: "DEFAULT_OOB_GOLD_SLA".to_string(),
        }),
        schedule: Some(ScheduleResponse {
            snapshot_time_of_day: SnapshotTimeOfDay {
                hours,
                minutes: 12,
                seconds: 12,
            },
            continuous_schedule: ContinuousSchedule {
                enabled: true,
                log_backup_interval: 90,
                snapshots_per_day: 4,
            },
            weekly_schedule: WeeklySchedule {
                enabled: true,
                day_of_week: "WEDNESDAY".to_string(),
            },
            monthly_schedule: MonthlySchedule {
                enabled: true,
                day_of_month: 24,
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Answer a single HTTP request on a local port with `status`; returns the base URL
pub async fn serve_status(status: &'static str) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }
        let response = format!(
            "HTTP/1.1 {}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
            status
        );
        let _ = stream.write_all(response.as_bytes()).await;
        let _ = stream.shutdown().await;
    });

    format!("http://{}/", addr)
}
