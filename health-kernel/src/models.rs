use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Champs libres d'une soumission (tout sauf `machineHealth`)
pub type Fields = Map<String, Value>;

/// Clé réservée où le score est attaché dans un enregistrement
pub const MACHINE_HEALTH_KEY: &str = "machineHealth";
/// Clé d'identité d'une soumission
pub const MACHINES_KEY: &str = "machines";

static NO_MACHINES: Value = Value::Null;

/// Soumission client : objet JSON opaque, seul `machines` est interprété
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Submission(Fields);

impl Submission {
    /// Construit une soumission depuis un corps JSON ; `None` si ce n'est pas un objet
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(mut fields) => {
                fields.remove(MACHINE_HEALTH_KEY);
                Some(Self(fields))
            }
            _ => None,
        }
    }

    /// Clé d'identité : la valeur de `machines`, `null` si absente
    pub fn machines(&self) -> &Value {
        self.0.get(MACHINES_KEY).unwrap_or(&NO_MACHINES)
    }

    pub fn fields(&self) -> &Fields {
        &self.0
    }

    pub fn into_fields(self) -> Fields {
        self.0
    }
}

impl From<Fields> for Submission {
    fn from(mut fields: Fields) -> Self {
        fields.remove(MACHINE_HEALTH_KEY);
        Self(fields)
    }
}

/// Résultat de scoring : score usine + score par machine (chaînes à 2 décimales)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    pub factory: String,
    pub machine_scores: BTreeMap<String, String>,
}

/// Unité stockée : champs de la soumission + score attaché
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(flatten)]
    pub fields: Fields,
    #[serde(rename = "machineHealth")]
    pub machine_health: ScoreResult,
}

impl Record {
    pub fn new(submission: Submission, machine_health: ScoreResult) -> Self {
        Self {
            fields: submission.into_fields(),
            machine_health,
        }
    }

    pub fn machines(&self) -> &Value {
        self.fields.get(MACHINES_KEY).unwrap_or(&NO_MACHINES)
    }

    /// Fusion superficielle : les champs de la soumission écrasent les anciens,
    /// les champs absents de la soumission sont conservés
    pub fn merge(&mut self, submission: Submission, machine_health: ScoreResult) {
        self.fields.extend(submission.into_fields());
        self.machine_health = machine_health;
    }
}

/// Corps d'erreur renvoyé au client (`{ "error": "..." }`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn submission(value: Value) -> Submission {
        Submission::from_value(value).unwrap()
    }

    #[test]
    fn test_submission_rejects_non_objects() {
        assert!(Submission::from_value(json!([1, 2])).is_none());
        assert!(Submission::from_value(json!("machines")).is_none());
        assert!(Submission::from_value(Value::Null).is_none());
    }

    #[test]
    fn test_submission_drops_reserved_key() {
        let s = submission(json!({"machines": {}, "machineHealth": {"factory": "1"}}));
        assert!(!s.fields().contains_key(MACHINE_HEALTH_KEY));
    }

    #[test]
    fn test_missing_machines_is_null_key() {
        let s = submission(json!({"note": "x"}));
        assert_eq!(s.machines(), &Value::Null);
    }

    #[test]
    fn test_record_wire_shape() {
        let record = Record::new(
            submission(json!({"machines": {"weldingRobot": {"electrodeWear": "1"}}})),
            ScoreResult {
                factory: "87.50".into(),
                machine_scores: BTreeMap::from([("weldingRobot".into(), "87.50".into())]),
            },
        );
        let wire = serde_json::to_value(&record).unwrap();
        assert_eq!(
            wire,
            json!({
                "machines": {"weldingRobot": {"electrodeWear": "1"}},
                "machineHealth": {"factory": "87.50", "machineScores": {"weldingRobot": "87.50"}}
            })
        );
        let back: Record = serde_json::from_value(wire).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_merge_is_shallow() {
        let score = ScoreResult { factory: "0.00".into(), machine_scores: BTreeMap::new() };
        let mut record = Record::new(
            submission(json!({"machines": {"a": {"x": "1"}}, "site": "north", "shift": "day"})),
            score.clone(),
        );
        let newer = ScoreResult { factory: "50.00".into(), ..score };
        record.merge(submission(json!({"machines": {"a": {"x": "1"}}, "shift": "night"})), newer.clone());

        assert_eq!(record.fields["site"], "north");
        assert_eq!(record.fields["shift"], "night");
        assert_eq!(record.machine_health, newer);
    }
}
