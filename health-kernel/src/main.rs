/**
 * MACHINE HEALTH KERNEL - Point d'entrée du serveur
 *
 * RÔLE : Charge la config, ouvre le RecordStore sur son fichier, démarre l'API.
 * Le store est construit une seule fois et partagé avec Axum via AppState.
 */

use anyhow::Context;
use health_kernel::config::load_config;
use health_kernel::health::HealthTracker;
use health_kernel::http::{build_router, AppState};
use health_kernel::ports::JsonFilePort;
use health_kernel::scoring::ThresholdScorer;
use health_kernel::store::RecordStore;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Charger les variables d'environnement depuis .env (si présent)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = load_config().await;

    let port = JsonFilePort::new(&cfg.storage.data_file)
        .with_context(|| format!("failed to prepare {:?}", cfg.storage.data_file))?;
    let scorer = ThresholdScorer::new(cfg.threshold_table());
    let store = RecordStore::open(Box::new(port), Box::new(scorer), cfg.history.capacity)
        .context("failed to load record store")?;

    let app_state = AppState {
        store: Arc::new(store),
        health_tracker: HealthTracker::new(),
    };
    let app = build_router(app_state);

    let addr = cfg.listen_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("listening on http://{addr}");
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
