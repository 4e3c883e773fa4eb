//! Client-side mirror of one user's machine-data view.
//!
//! Every operation takes the instance lock, computes the next state with
//! [`CacheState::apply`], performs the matching persistence side effect, and
//! only then commits the new state. A failed write leaves the in-memory view
//! as it was. Holding the lock across the sequence serialises writers, so a
//! `set_scores` always merges against the latest committed view.

use crate::kv::{KeyValueStore, KvError};
use crate::view::{CacheAction, CacheState, CacheView};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};

/// Key of the persisted view in the local store
pub const CACHE_KEY: &str = "machineData";

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache store error: {0}")]
    Store(#[from] KvError),
    #[error("failed to encode cache view: {0}")]
    Encode(#[from] serde_json::Error),
}

pub struct ClientCache<S: KeyValueStore> {
    store: S,
    state: Mutex<CacheState>,
}

impl<S: KeyValueStore> ClientCache<S> {
    /// Builds the cache and adopts whatever was persisted before
    pub fn open(store: S) -> Self {
        let cache = Self {
            store,
            state: Mutex::new(CacheState::Empty),
        };
        cache.load();
        cache
    }

    /// Re-reads persisted state. Missing, unreadable or corrupt data yields
    /// an empty view rather than an error.
    pub fn load(&self) -> CacheState {
        let mut state = self.state.lock();
        let persisted = self.read_persisted();
        *state = state.clone().apply(CacheAction::Load(persisted));
        state.clone()
    }

    pub fn state(&self) -> CacheState {
        self.state.lock().clone()
    }

    pub fn view(&self) -> Option<CacheView> {
        self.state.lock().view().cloned()
    }

    /// Wholesale substitution, persisted before it becomes visible
    pub fn replace(&self, view: CacheView) -> Result<(), CacheError> {
        let mut state = self.state.lock();
        self.store.set(CACHE_KEY, &serde_json::to_vec(&view)?)?;
        *state = state.clone().apply(CacheAction::Replace(view));
        debug!("cache view replaced");
        Ok(())
    }

    pub fn reset(&self) -> Result<(), CacheError> {
        let mut state = self.state.lock();
        self.store.remove(CACHE_KEY)?;
        *state = state.clone().apply(CacheAction::Reset);
        debug!("cache view reset");
        Ok(())
    }

    /// Replaces the `scores` part of the current view, keeping `machines`
    pub fn set_scores(&self, scores: Value) -> Result<CacheView, CacheError> {
        let mut state = self.state.lock();
        let next = state.clone().apply(CacheAction::SetScores(scores));
        let view = next.view().cloned().unwrap_or_default();
        self.store.set(CACHE_KEY, &serde_json::to_vec(&view)?)?;
        *state = next;
        Ok(view)
    }

    fn read_persisted(&self) -> Option<CacheView> {
        let bytes = match self.store.get(CACHE_KEY) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!("cache read failed, starting empty: {e}");
                return None;
            }
        };
        match serde_json::from_slice::<CacheView>(&bytes) {
            Ok(view) => Some(view),
            Err(e) => {
                warn!("corrupt cache blob ignored: {e}");
                None
            }
        }
    }
}
