/**
 * PORT FICHIER JSON - Persistance du RecordStore dans un seul document
 *
 * FONCTIONNEMENT :
 * - Un objet JSON indenté, indexé par nom d'utilisateur (ex: ./data/userData.json)
 * - Fichier absent au démarrage : création de `{}`
 * - Fichier illisible/corrompu : mis de côté en `.corrupt`, démarrage à vide
 * - Écriture : NamedTempFile dans le même dossier puis persist (rename),
 *   un lecteur ne voit jamais un document à moitié écrit
 */

use super::{DocumentPort, PortError, PortInfo};
use crate::store::StoreDocument;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{error, info, warn};

pub struct JsonFilePort {
    /// Chemin du document JSON
    storage_path: PathBuf,
}

impl JsonFilePort {
    /// Crée le port et le dossier parent si nécessaire
    pub fn new<P: Into<PathBuf>>(storage_path: P) -> Result<Self, PortError> {
        let storage_path = storage_path.into();
        if let Some(parent) = storage_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        info!("document port initialized at {:?}", storage_path);
        Ok(Self { storage_path })
    }

    fn corrupt_path(&self) -> PathBuf {
        let mut name = self.storage_path.as_os_str().to_owned();
        name.push(".corrupt");
        PathBuf::from(name)
    }

    fn write_atomic(&self, bytes: &[u8]) -> Result<(), PortError> {
        let parent = match self.storage_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        // Le temporaire est supprimé au drop si une étape échoue
        let mut temp = NamedTempFile::new_in(parent)?;
        temp.write_all(bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(&self.storage_path)
            .map_err(|e| PortError::Io(e.error))?;
        Ok(())
    }
}

impl DocumentPort for JsonFilePort {
    fn load(&self) -> Result<Option<StoreDocument>, PortError> {
        if !self.storage_path.exists() {
            self.write_atomic(b"{}")?;
            info!("created empty document at {:?}", self.storage_path);
            return Ok(None);
        }

        let content = fs::read(&self.storage_path)?;
        match serde_json::from_slice::<StoreDocument>(&content) {
            Ok(document) => Ok(Some(document)),
            Err(e) => {
                let aside = self.corrupt_path();
                error!("unreadable document {:?}: {}", self.storage_path, e);
                fs::rename(&self.storage_path, &aside)?;
                warn!("moved corrupt document to {:?}, starting empty", aside);
                Ok(None)
            }
        }
    }

    fn save(&self, document: &StoreDocument) -> Result<(), PortError> {
        let json = serde_json::to_vec_pretty(document)?;
        self.write_atomic(&json)
    }

    fn info(&self) -> PortInfo {
        PortInfo {
            kind: "json-file".to_string(),
            location: self.storage_path.display().to_string(),
        }
    }
}
