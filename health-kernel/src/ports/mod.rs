/**
 * PORTS DE PERSISTANCE - Lecture/écriture du document complet du RecordStore
 *
 * RÔLE :
 * Le RecordStore ne touche jamais le disque directement : il reçoit un
 * `DocumentPort` à la construction et lui délègue le chargement et la
 * sauvegarde du document entier (tous les utilisateurs, tous les historiques).
 *
 * FONCTIONNEMENT :
 * - `load`  = lecture du document au démarrage (None si aucun état persistant)
 * - `save`  = écriture tout-ou-rien du document complet après chaque mutation
 * - `info`  = description du port pour /system/health
 *
 * IMPLÉMENTATIONS :
 * - `JsonFilePort`  : fichier JSON, écriture temp + rename
 * - `MemoryPort`    : en mémoire, avec injection de pannes pour les tests
 */

pub mod file;
pub mod memory;

pub use file::JsonFilePort;
pub use memory::MemoryPort;

use crate::store::StoreDocument;
use serde::Serialize;

/// Erreurs possibles lors des opérations sur un port
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Port unavailable: {0}")]
    Unavailable(String),
}

/// Interface commune des ports de persistance du document
pub trait DocumentPort: Send + Sync {
    /// Charge le document persistant ; `Ok(None)` quand rien n'existe encore
    fn load(&self) -> Result<Option<StoreDocument>, PortError>;

    /// Remplace atomiquement le document persistant
    fn save(&self, document: &StoreDocument) -> Result<(), PortError>;

    fn info(&self) -> PortInfo;
}

/// Informations descriptives d'un port (exposées par /system/health)
#[derive(Debug, Clone, Serialize)]
pub struct PortInfo {
    pub kind: String,
    pub location: String,
}
