/*!
Builders de soumissions pour les tests

```ignore
let submission = SubmissionBuilder::new()
    .reading("weldingRobot", "electrodeWear", "1")
    .reading("weldingRobot", "vibrationLevel", "2")
    .field("site", "north")
    .build();
```
*/

use serde_json::{Map, Value};

/// Builder fluide d'une soumission `{ machines: {...}, ...champs }`
#[derive(Debug, Clone, Default)]
pub struct SubmissionBuilder {
    machines: Map<String, Value>,
    fields: Map<String, Value>,
}

impl SubmissionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ajoute un relevé (chaîne, comme l'envoie l'app mobile)
    pub fn reading(mut self, machine: &str, metric: &str, value: &str) -> Self {
        let readings = self
            .machines
            .entry(machine.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(readings) = readings {
            readings.insert(metric.to_string(), Value::String(value.to_string()));
        }
        self
    }

    /// Ajoute un champ libre hors `machines`
    pub fn field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn build(self) -> Value {
        let mut payload = self.fields;
        payload.insert("machines".to_string(), Value::Object(self.machines));
        Value::Object(payload)
    }
}

/// `count` soumissions valides dont les clés `machines` sont toutes distinctes
pub fn distinct_submissions(count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| {
            SubmissionBuilder::new()
                .reading("weldingRobot", "electrodeWear", &(i % 9).to_string())
                .reading("weldingRobot", "vibrationLevel", &(i / 9).to_string())
                .build()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_shape() {
        let submission = SubmissionBuilder::new()
            .reading("weldingRobot", "electrodeWear", "1")
            .reading("weldingRobot", "vibrationLevel", "2")
            .reading("paintingStation", "flowRate", "9")
            .field("site", "north")
            .build();

        assert_eq!(
            submission,
            json!({
                "site": "north",
                "machines": {
                    "weldingRobot": {"electrodeWear": "1", "vibrationLevel": "2"},
                    "paintingStation": {"flowRate": "9"}
                }
            })
        );
    }

    #[test]
    fn test_distinct_submissions_are_distinct() {
        let all = distinct_submissions(20);
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a["machines"], b["machines"]);
            }
        }
    }
}
