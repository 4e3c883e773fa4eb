/*!
Test Harness pour le kernel Machine Health

Démarre un kernel complet (RecordStore + API HTTP) sur 127.0.0.1 avec un port
éphémère et un fichier de données dans un dossier temporaire. Le serveur est
arrêté proprement quand le harness est droppé.
*/

use anyhow::{Context, Result};
use health_kernel::health::HealthTracker;
use health_kernel::http::{build_router, AppState};
use health_kernel::ports::JsonFilePort;
use health_kernel::scoring::ThresholdScorer;
use health_kernel::store::{RecordStore, SharedStore, DEFAULT_CAPACITY};
use serde_json::Value;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub struct TestHarness {
    pub addr: SocketAddr,
    pub store: SharedStore,
    data_file: PathBuf,
    shutdown: Option<oneshot::Sender<()>>,
    server: Option<JoinHandle<()>>,
    _data_dir: TempDir,
}

impl TestHarness {
    /// Kernel avec la capacité par défaut
    pub async fn start() -> Result<Self> {
        Self::start_with_capacity(DEFAULT_CAPACITY).await
    }

    pub async fn start_with_capacity(capacity: usize) -> Result<Self> {
        env_logger::try_init().ok(); // Init logging pour tests

        let data_dir = TempDir::new().context("failed to create temp dir")?;
        let data_file = data_dir.path().join("data").join("userData.json");
        let port = JsonFilePort::new(&data_file)?;
        let store = Arc::new(RecordStore::open(
            Box::new(port),
            Box::new(ThresholdScorer::default()),
            capacity,
        )?);

        let app = build_router(AppState {
            store: store.clone(),
            health_tracker: HealthTracker::new(),
        });

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (tx, rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    rx.await.ok();
                })
                .await;
            if let Err(e) = served {
                log::error!("test kernel stopped: {e}");
            }
        });

        log::info!("test kernel listening on {addr}");
        Ok(Self {
            addr,
            store,
            data_file,
            shutdown: Some(tx),
            server: Some(server),
            _data_dir: data_dir,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn data_file(&self) -> &Path {
        &self.data_file
    }

    /// Document tel que persisté sur disque
    pub fn persisted_document(&self) -> Result<Value> {
        let content = std::fs::read_to_string(&self.data_file)
            .with_context(|| format!("failed to read {:?}", self.data_file))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Arrête le serveur et attend la fin de la tâche
    pub async fn stop(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            tx.send(()).ok();
        }
        if let Some(server) = self.server.take() {
            server.await.context("server task panicked")?;
        }
        Ok(())
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            tx.send(()).ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::SubmissionBuilder;
    use health_kernel::Submission;

    #[tokio::test]
    async fn test_harness_persists_to_temp_dir() {
        let harness = TestHarness::start().await.unwrap();
        assert_eq!(harness.persisted_document().unwrap(), serde_json::json!({}));

        let submission = SubmissionBuilder::new()
            .reading("weldingRobot", "electrodeWear", "1")
            .build();
        harness
            .store
            .submit("test", Submission::from_value(submission.clone()).unwrap())
            .unwrap();

        let document = harness.persisted_document().unwrap();
        assert_eq!(document["test"][0]["machines"], submission["machines"]);
        assert!(harness.base_url().starts_with("http://127.0.0.1:"));

        harness.stop().await.unwrap();
    }
}
