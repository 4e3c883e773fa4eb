/**
 * SYNC PROTOCOL - Contrat Fetch / Submit entre client et RecordStore
 *
 * RÔLE :
 * Traduit les deux opérations réseau en appels au store et traduit leur
 * issue en statut de réponse, indépendamment du transport.
 *
 * CONTRAT :
 * - Fetch(username)              -> historique complet, `[]` si inconnu
 * - Submit(username, soumission) -> 200 ScoreResult | 400 {error} | 500 {error}
 *
 * Aucun autre canal : une mutation n'est visible que dans la réponse du
 * Submit ou dans le Fetch suivant.
 */

use crate::models::{ErrorBody, Record, ScoreResult, Submission};
use crate::store::{RecordStore, StoreError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use tracing::{error, info};

/// Issue d'un Submit telle que vue par le client
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Score calculé, historique mis à jour et persisté
    Scored(ScoreResult),
    /// Soumission invalide : rien n'a été modifié
    Rejected(ErrorBody),
    /// Échec côté serveur (persistance)
    Failed(ErrorBody),
}

impl SubmitOutcome {
    pub fn status(&self) -> StatusCode {
        match self {
            SubmitOutcome::Scored(_) => StatusCode::OK,
            SubmitOutcome::Rejected(_) => StatusCode::BAD_REQUEST,
            SubmitOutcome::Failed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Result<ScoreResult, StoreError>> for SubmitOutcome {
    fn from(result: Result<ScoreResult, StoreError>) -> Self {
        match result {
            Ok(score) => SubmitOutcome::Scored(score),
            Err(StoreError::Scoring(e)) => SubmitOutcome::Rejected(ErrorBody::new(e.to_string())),
            Err(StoreError::Persistence(e)) => SubmitOutcome::Failed(ErrorBody::new(e.to_string())),
        }
    }
}

impl IntoResponse for SubmitOutcome {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            SubmitOutcome::Scored(score) => (status, Json(score)).into_response(),
            SubmitOutcome::Rejected(body) | SubmitOutcome::Failed(body) => {
                (status, Json(body)).into_response()
            }
        }
    }
}

/// Fetch : historique verbatim, plus ancien en tête
pub fn fetch(store: &RecordStore, username: &str) -> Vec<Record> {
    store.list(username)
}

/// Submit : le corps doit être un objet JSON, sinon rejet sans effet de bord
pub fn submit(store: &RecordStore, username: &str, body: Value) -> SubmitOutcome {
    let Some(submission) = Submission::from_value(body) else {
        return SubmitOutcome::Rejected(ErrorBody::new(
            "Invalid input format: submission must be a JSON object",
        ));
    };

    let outcome = SubmitOutcome::from(store.submit(username, submission));
    match &outcome {
        SubmitOutcome::Scored(score) => {
            info!("scored submission for {} (factory {})", username, score.factory)
        }
        SubmitOutcome::Rejected(body) => info!("rejected submission for {}: {}", username, body.error),
        SubmitOutcome::Failed(body) => error!("submission for {} not persisted: {}", username, body.error),
    }
    outcome
}
