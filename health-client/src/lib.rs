//! Machine health client
//!
//! Keeps a local, offline-capable mirror of one user's machine-data view and
//! synchronises it with the kernel over HTTP.

pub mod cache;
pub mod config;
pub mod kv;
pub mod sync;
pub mod view;

pub use cache::{CacheError, ClientCache};
pub use kv::{FileKvStore, KeyValueStore, MemoryKvStore};
pub use sync::{ClientError, SyncClient};
pub use view::{CacheAction, CacheState, CacheView};
