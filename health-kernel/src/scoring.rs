/**
 * SCORING - Calcul du score de santé d'une soumission
 *
 * RÔLE :
 * Collaborateur du RecordStore : `score(submission) -> ScoreResult | ScoringError`.
 * Le store ne regarde que le discriminant succès/erreur.
 *
 * FONCTIONNEMENT (ThresholdScorer) :
 * - Chaque métrique connue a un couple de seuils { good, bad }
 * - Lecture à `good` => 100, à `bad` => 0, linéaire entre les deux, bornée
 * - Métrique inconnue d'une machine connue => 0
 * - Score machine = moyenne de ses métriques, score usine = moyenne des machines
 * - Rendu en chaîne à 2 décimales ("81.25")
 */

use crate::models::{ScoreResult, Submission};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Soumission invalide ou incomplète ; renvoyée au client, jamais persistée
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error("Invalid input format: {0}")]
    InvalidFormat(String),
    #[error("Unknown machine: {0}")]
    UnknownMachine(String),
    #[error("Invalid reading for {machine}.{metric}: {value}")]
    InvalidReading {
        machine: String,
        metric: String,
        value: String,
    },
}

/// Fonction de score injectée dans le RecordStore
pub trait Scorer: Send + Sync {
    fn score(&self, submission: &Submission) -> Result<ScoreResult, ScoringError>;
}

/// Couple de seuils d'une métrique (good peut être > ou < bad)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub good: f64,
    pub bad: f64,
}

impl Threshold {
    pub const fn new(good: f64, bad: f64) -> Self {
        Self { good, bad }
    }

    /// Score 0..=100 d'une lecture
    pub fn score(&self, reading: f64) -> f64 {
        if self.good == self.bad {
            return if reading == self.good { 100.0 } else { 0.0 };
        }
        let ratio = (self.bad - reading) / (self.bad - self.good);
        (ratio * 100.0).clamp(0.0, 100.0)
    }
}

/// machine -> métrique -> seuils
pub type ThresholdTable = BTreeMap<String, BTreeMap<String, Threshold>>;

pub struct ThresholdScorer {
    table: ThresholdTable,
}

impl ThresholdScorer {
    pub fn new(table: ThresholdTable) -> Self {
        Self { table }
    }

    /// Seuils par défaut des quatre postes de l'usine
    pub fn default_table() -> ThresholdTable {
        let machine = |metrics: &[(&str, Threshold)]| -> BTreeMap<String, Threshold> {
            metrics.iter().map(|(name, t)| (name.to_string(), *t)).collect()
        };

        BTreeMap::from([
            (
                "weldingRobot".to_string(),
                machine(&[
                    ("electrodeWear", Threshold::new(0.0, 8.0)),
                    ("vibrationLevel", Threshold::new(0.0, 8.0)),
                    ("shieldingPressure", Threshold::new(20.0, 5.0)),
                    ("wireFeedRate", Threshold::new(10.0, 2.0)),
                ]),
            ),
            (
                "assemblyLine".to_string(),
                machine(&[
                    ("alignmentAccuracy", Threshold::new(0.0, 2.0)),
                    ("beltSpeed", Threshold::new(1.5, 0.5)),
                    ("vibrationLevel", Threshold::new(0.0, 8.0)),
                ]),
            ),
            (
                "paintingStation".to_string(),
                machine(&[
                    ("flowRate", Threshold::new(10.0, 2.0)),
                    ("pressure", Threshold::new(60.0, 20.0)),
                    ("colorConsistency", Threshold::new(100.0, 80.0)),
                    ("nozzleCondition", Threshold::new(100.0, 0.0)),
                ]),
            ),
            (
                "qualityControlStation".to_string(),
                machine(&[
                    ("cameraCalibration", Threshold::new(100.0, 50.0)),
                    ("lightIntensity", Threshold::new(100.0, 40.0)),
                    ("defectRate", Threshold::new(0.0, 10.0)),
                ]),
            ),
        ])
    }

    fn score_machine(&self, name: &str, readings: &Value) -> Result<f64, ScoringError> {
        let thresholds = self
            .table
            .get(name)
            .ok_or_else(|| ScoringError::UnknownMachine(name.to_string()))?;
        let readings = readings.as_object().ok_or_else(|| {
            ScoringError::InvalidFormat(format!("readings for {name} must be an object"))
        })?;
        if readings.is_empty() {
            return Ok(0.0);
        }

        let mut total = 0.0;
        for (metric, value) in readings {
            let reading = parse_reading(value).ok_or_else(|| ScoringError::InvalidReading {
                machine: name.to_string(),
                metric: metric.clone(),
                value: value.to_string(),
            })?;
            total += match thresholds.get(metric) {
                Some(threshold) => threshold.score(reading),
                None => {
                    debug!("unknown metric {}.{} scored as 0", name, metric);
                    0.0
                }
            };
        }
        Ok(total / readings.len() as f64)
    }
}

impl Default for ThresholdScorer {
    fn default() -> Self {
        Self::new(Self::default_table())
    }
}

impl Scorer for ThresholdScorer {
    fn score(&self, submission: &Submission) -> Result<ScoreResult, ScoringError> {
        let machines = submission
            .machines()
            .as_object()
            .ok_or_else(|| ScoringError::InvalidFormat("machines object required".into()))?;
        if machines.is_empty() {
            return Err(ScoringError::InvalidFormat("no machine readings".into()));
        }

        let mut machine_scores = BTreeMap::new();
        let mut total = 0.0;
        for (name, readings) in machines {
            let score = self.score_machine(name, readings)?;
            total += score;
            machine_scores.insert(name.clone(), format_score(score));
        }

        Ok(ScoreResult {
            factory: format_score(total / machines.len() as f64),
            machine_scores,
        })
    }
}

/// Lecture numérique : nombre JSON ou chaîne numérique
fn parse_reading(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Arrondi au centième, moitié vers le haut (40.625 => "40.63")
fn format_score(score: f64) -> String {
    format!("{:.2}", (score * 100.0).round() / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn submission(value: Value) -> Submission {
        Submission::from_value(value).unwrap()
    }

    #[test]
    fn test_reference_factory_score() {
        let scorer = ThresholdScorer::default();
        let result = scorer
            .score(&submission(json!({
                "machines": {
                    "paintingStation": {"seamWidth": "1"},
                    "weldingRobot": {"electrodeWear": "1", "vibrationLevel": "2"}
                }
            })))
            .unwrap();

        assert_eq!(result.factory, "40.63");
        assert_eq!(result.machine_scores["weldingRobot"], "81.25");
        assert_eq!(result.machine_scores["paintingStation"], "0.00");
    }

    #[test]
    fn test_threshold_is_clamped_both_ways() {
        let t = Threshold::new(0.0, 8.0);
        assert_eq!(t.score(-3.0), 100.0);
        assert_eq!(t.score(4.0), 50.0);
        assert_eq!(t.score(12.0), 0.0);

        let inverted = Threshold::new(100.0, 0.0);
        assert_eq!(inverted.score(75.0), 75.0);
    }

    #[test]
    fn test_numeric_readings_accepted() {
        let scorer = ThresholdScorer::default();
        let result = scorer
            .score(&submission(json!({"machines": {"weldingRobot": {"electrodeWear": 0}}})))
            .unwrap();
        assert_eq!(result.factory, "100.00");
    }

    #[test]
    fn test_missing_machines_rejected() {
        let scorer = ThresholdScorer::default();
        assert!(matches!(
            scorer.score(&submission(json!({"site": "north"}))),
            Err(ScoringError::InvalidFormat(_))
        ));
        assert!(matches!(
            scorer.score(&submission(json!({"machines": {}}))),
            Err(ScoringError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_unknown_machine_rejected() {
        let scorer = ThresholdScorer::default();
        assert_eq!(
            scorer.score(&submission(json!({"machines": {"toaster": {"heat": "3"}}}))),
            Err(ScoringError::UnknownMachine("toaster".into()))
        );
    }

    #[test]
    fn test_unknown_metric_on_known_machine_scores_zero() {
        let scorer = ThresholdScorer::default();
        let result = scorer
            .score(&submission(json!({
                "machines": {"weldingRobot": {"electrodeWear": "0", "sparkCount": "3"}}
            })))
            .unwrap();
        assert_eq!(result.machine_scores["weldingRobot"], "50.00");
        assert_eq!(result.factory, "50.00");
    }

    #[test]
    fn test_non_numeric_reading_rejected() {
        let scorer = ThresholdScorer::default();
        let err = scorer
            .score(&submission(json!({"machines": {"weldingRobot": {"electrodeWear": "high"}}})))
            .unwrap_err();
        assert!(matches!(err, ScoringError::InvalidReading { ref metric, .. } if metric == "electrodeWear"));
    }
}
