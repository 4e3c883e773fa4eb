//! Machine Health kernel : historique borné des soumissions par utilisateur,
//! scoring et API REST Fetch / Submit.

pub mod config;
pub mod health;
pub mod http;
pub mod models;
pub mod ports;
pub mod scoring;
pub mod store;
pub mod sync;

pub use models::{Record, ScoreResult, Submission};
pub use store::{RecordStore, SharedStore, StoreError, UserHistory};
