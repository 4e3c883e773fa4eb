/**
 * RECORD STORE - Historique borné des soumissions par utilisateur
 *
 * RÔLE :
 * Propriétaire exclusif du mapping utilisateur -> historique (UserHistory).
 * Décide si une soumission met à jour un enregistrement existant ou en ajoute
 * un nouveau, applique la capacité, et persiste le document complet.
 *
 * FONCTIONNEMENT :
 * - Chargé une seule fois au démarrage via le DocumentPort injecté
 * - submit : score -> copie de travail -> upsert-or-append -> save -> bascule
 * - La copie de travail n'est publiée en mémoire qu'après une écriture réussie :
 *   une panne disque laisse l'état mémoire et le fichier inchangés
 * - Un seul écrivain à la fois (writer lock) ; les lectures voient toujours un
 *   document complet, avant ou après une soumission concurrente
 *
 * CAPACITÉ :
 * Avant un ajout, les plus anciens sont évincés tant que l'historique contient
 * `capacity` entrées ou plus. Avec la capacité par défaut (11) on retrouve la
 * règle historique "éviction si longueur > 10, puis ajout".
 */

use crate::models::{Record, ScoreResult, Submission};
use crate::ports::{DocumentPort, PortError, PortInfo};
use crate::scoring::{Scorer, ScoringError};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Capacité par défaut d'un historique utilisateur
pub const DEFAULT_CAPACITY: usize = 11;

/// Document persistant complet : utilisateur -> historique (plus ancien en tête)
pub type StoreDocument = BTreeMap<String, UserHistory>;

pub type SharedStore = Arc<RecordStore>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error("failed to persist store: {0}")]
    Persistence(#[from] PortError),
}

/// Où la soumission a atterri dans l'historique
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Updated { index: usize },
    Appended { evicted: usize },
}

/// Séquence ordonnée d'enregistrements d'un utilisateur, sans doublon de clé
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserHistory(Vec<Record>);

impl UserHistory {
    pub fn records(&self) -> &[Record] {
        &self.0
    }

    /// Upsert-or-append : même `machines` (égalité structurelle) => fusion en
    /// place, sinon éviction des plus anciens puis ajout en fin
    pub fn upsert(
        &mut self,
        submission: Submission,
        machine_health: ScoreResult,
        capacity: usize,
    ) -> Placement {
        let existing = self
            .0
            .iter()
            .position(|record| record.machines() == submission.machines());

        if let Some(index) = existing {
            self.0[index].merge(submission, machine_health);
            return Placement::Updated { index };
        }

        let mut evicted = 0;
        while self.0.len() >= capacity.max(1) {
            self.0.remove(0);
            evicted += 1;
        }
        self.0.push(Record::new(submission, machine_health));
        Placement::Appended { evicted }
    }
}

impl From<Vec<Record>> for UserHistory {
    fn from(records: Vec<Record>) -> Self {
        Self(records)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub users: usize,
    pub records: usize,
}

pub struct RecordStore {
    port: Box<dyn DocumentPort>,
    scorer: Box<dyn Scorer>,
    capacity: usize,
    /// Document publié (dernier état persisté avec succès)
    document: RwLock<StoreDocument>,
    /// Sérialise les soumissions de bout en bout
    writer: Mutex<()>,
}

impl RecordStore {
    /// Charge l'état persistant (ou démarre vide) et construit le store
    pub fn open(
        port: Box<dyn DocumentPort>,
        scorer: Box<dyn Scorer>,
        capacity: usize,
    ) -> Result<Self, PortError> {
        let document = port.load()?.unwrap_or_default();
        if capacity == 0 {
            warn!("history capacity 0 is not usable, keeping 1 record per user");
        }
        let store = Self {
            port,
            scorer,
            capacity: capacity.max(1),
            document: RwLock::new(document),
            writer: Mutex::new(()),
        };
        let stats = store.stats();
        info!(
            "record store loaded {} users / {} records (capacity {})",
            stats.users, stats.records, store.capacity
        );
        Ok(store)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn port_info(&self) -> PortInfo {
        self.port.info()
    }

    /// Score puis upsert-or-append dans l'historique de `username`.
    ///
    /// Un échec de scoring ne touche à rien. Un échec de persistance laisse
    /// l'état mémoire tel qu'il était avant l'appel.
    pub fn submit(&self, username: &str, submission: Submission) -> Result<ScoreResult, StoreError> {
        let machine_health = self.scorer.score(&submission)?;

        let _writer = self.writer.lock();
        let mut working = self.document.read().clone();
        let placement = working
            .entry(username.to_string())
            .or_default()
            .upsert(submission, machine_health.clone(), self.capacity);

        self.port.save(&working)?;
        *self.document.write() = working;

        match placement {
            Placement::Updated { index } => {
                debug!("updated record {} for user {}", index, username)
            }
            Placement::Appended { evicted } => {
                debug!("appended record for user {} (evicted {})", username, evicted)
            }
        }
        Ok(machine_health)
    }

    /// Lecture pure : historique vide pour un utilisateur inconnu
    pub fn list(&self, username: &str) -> Vec<Record> {
        self.document
            .read()
            .get(username)
            .map(|history| history.records().to_vec())
            .unwrap_or_default()
    }

    pub fn stats(&self) -> StoreStats {
        let document = self.document.read();
        StoreStats {
            users: document.len(),
            records: document.values().map(|history| history.records().len()).sum(),
        }
    }
}
