use crate::scoring::{ThresholdScorer, ThresholdTable};
use crate::store::DEFAULT_CAPACITY;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

pub const CONFIG_ENV: &str = "MACHINE_HEALTH_CONFIG";
pub const PORT_ENV: &str = "MACHINE_HEALTH_PORT";

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct KernelConfig {
    pub server: ServerConf,
    pub storage: StorageConf,
    pub history: HistoryConf,
    pub scoring: ScoringConf,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConf {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConf {
    pub data_file: PathBuf, // ex: "./data/userData.json"
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct HistoryConf {
    /// Nombre maximal d'enregistrements conservés par utilisateur
    pub capacity: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ScoringConf {
    /// Seuils par machine et par métrique, fusionnés métrique par métrique
    /// par-dessus les seuils par défaut
    pub thresholds: ThresholdTable,
}

impl Default for ServerConf {
    fn default() -> Self {
        Self { host: "0.0.0.0".into(), port: 3001 }
    }
}

impl Default for StorageConf {
    fn default() -> Self {
        Self { data_file: PathBuf::from("./data/userData.json") }
    }
}

impl Default for HistoryConf {
    fn default() -> Self {
        Self { capacity: DEFAULT_CAPACITY }
    }
}

impl KernelConfig {
    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse()
            .map_err(|e| anyhow::anyhow!("invalid listen address {addr}: {e}"))
    }

    /// Seuils par défaut, métriques surchargées une à une par la configuration
    pub fn threshold_table(&self) -> ThresholdTable {
        let mut table = ThresholdScorer::default_table();
        for (machine, metrics) in &self.scoring.thresholds {
            table
                .entry(machine.clone())
                .or_default()
                .extend(metrics.iter().map(|(metric, t)| (metric.clone(), *t)));
        }
        table
    }
}

/// Parse un YAML de config ; vide ou invalide => config par défaut
pub fn parse_config(txt: &str) -> KernelConfig {
    if txt.trim().is_empty() {
        return KernelConfig::default();
    }
    serde_yaml::from_str(txt).unwrap_or_else(|e| {
        warn!("invalid config: {e}, using defaults");
        KernelConfig::default()
    })
}

pub async fn load_config() -> KernelConfig {
    let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| "kernel.yaml".into());
    let mut cfg = if Path::new(&path).exists() {
        let txt = fs::read_to_string(&path).await.unwrap_or_default();
        info!("config loaded from {path}");
        parse_config(&txt)
    } else {
        info!("no {path}, using default config");
        KernelConfig::default()
    };

    if let Ok(port) = std::env::var(PORT_ENV) {
        match port.parse::<u16>() {
            Ok(port) => cfg.server.port = port,
            Err(e) => warn!("ignoring {PORT_ENV}={port}: {e}"),
        }
    }
    cfg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::Threshold;

    #[test]
    fn test_default_config() {
        let cfg = parse_config("");
        assert_eq!(cfg.server.port, 3001);
        assert_eq!(cfg.history.capacity, 11);
        assert_eq!(cfg.storage.data_file, PathBuf::from("./data/userData.json"));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let cfg = parse_config(
            "history:\n  capacity: 5\nscoring:\n  thresholds:\n    weldingRobot:\n      electrodeWear: { good: 0, bad: 4 }\n",
        );
        assert_eq!(cfg.history.capacity, 5);
        assert_eq!(cfg.server.port, 3001);

        let table = cfg.threshold_table();
        let defaults = ThresholdScorer::default_table();
        assert_eq!(table["weldingRobot"]["electrodeWear"], Threshold::new(0.0, 4.0));
        // Les autres métriques de la machine gardent leurs seuils par défaut
        assert_eq!(table["weldingRobot"].len(), defaults["weldingRobot"].len());
        assert_eq!(
            table["weldingRobot"]["vibrationLevel"],
            defaults["weldingRobot"]["vibrationLevel"]
        );
        assert_eq!(table["paintingStation"], defaults["paintingStation"]);
    }

    #[test]
    fn test_override_can_add_machine() {
        let cfg = parse_config(
            "scoring:\n  thresholds:\n    packagingUnit:\n      jamRate: { good: 0, bad: 10 }\n",
        );
        let table = cfg.threshold_table();
        assert_eq!(table["packagingUnit"]["jamRate"], Threshold::new(0.0, 10.0));
        assert!(table.contains_key("weldingRobot"));
    }

    #[test]
    fn test_invalid_yaml_falls_back() {
        let cfg = parse_config("server: [not, a, map]");
        assert_eq!(cfg.server.port, 3001);
    }

    #[test]
    fn test_listen_addr() {
        let cfg = KernelConfig::default();
        assert_eq!(cfg.listen_addr().unwrap().port(), 3001);
    }
}
