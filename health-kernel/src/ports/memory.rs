use super::{DocumentPort, PortError, PortInfo};
use crate::store::StoreDocument;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Port en mémoire : utile pour les tests et pour un kernel sans disque.
/// `fail_saves(true)` simule une panne d'écriture.
#[derive(Clone, Default)]
pub struct MemoryPort {
    document: Arc<Mutex<Option<StoreDocument>>>,
    failing: Arc<AtomicBool>,
    saves: Arc<AtomicUsize>,
}

impl MemoryPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: StoreDocument) -> Self {
        let port = Self::default();
        *port.document.lock() = Some(document);
        port
    }

    pub fn fail_saves(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Dernier document sauvegardé (ou fourni à la construction)
    pub fn snapshot(&self) -> Option<StoreDocument> {
        self.document.lock().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl DocumentPort for MemoryPort {
    fn load(&self) -> Result<Option<StoreDocument>, PortError> {
        Ok(self.document.lock().clone())
    }

    fn save(&self, document: &StoreDocument) -> Result<(), PortError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PortError::Unavailable("simulated write failure".into()));
        }
        *self.document.lock() = Some(document.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn info(&self) -> PortInfo {
        PortInfo {
            kind: "memory".to_string(),
            location: "in-process".to_string(),
        }
    }
}
