//! Client cache view and its state machine.
//!
//! `CacheState::apply` is a pure transition function: no I/O, no clock.
//! The paired persistence side effects live in [`crate::cache::ClientCache`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One user's working view: `{ machines?: {...}, scores?: {...} }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheView {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machines: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scores: Option<Value>,
}

impl CacheView {
    pub fn new(machines: Value, scores: Value) -> Self {
        Self {
            machines: Some(machines),
            scores: Some(scores),
        }
    }

    /// View of a stored record: its `machines` plus `machineHealth` as scores
    pub fn from_record(record: &Map<String, Value>) -> Self {
        Self {
            machines: record.get("machines").cloned(),
            scores: record.get("machineHealth").cloned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CacheAction {
    /// Adopt persisted state; `None` when nothing was stored
    Load(Option<CacheView>),
    Replace(CacheView),
    Reset,
    SetScores(Value),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum CacheState {
    #[default]
    Empty,
    Loaded(CacheView),
}

impl CacheState {
    pub fn apply(self, action: CacheAction) -> CacheState {
        match action {
            CacheAction::Load(Some(view)) | CacheAction::Replace(view) => CacheState::Loaded(view),
            CacheAction::Load(None) | CacheAction::Reset => CacheState::Empty,
            CacheAction::SetScores(scores) => {
                // From Empty this yields a partial view holding only scores
                let base = self.into_view().unwrap_or_default();
                CacheState::Loaded(CacheView {
                    scores: Some(scores),
                    ..base
                })
            }
        }
    }

    pub fn view(&self) -> Option<&CacheView> {
        match self {
            CacheState::Empty => None,
            CacheState::Loaded(view) => Some(view),
        }
    }

    pub fn into_view(self) -> Option<CacheView> {
        match self {
            CacheState::Empty => None,
            CacheState::Loaded(view) => Some(view),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CacheState::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn loaded() -> CacheState {
        CacheState::Loaded(CacheView::new(
            json!({"weldingRobot": {"electrodeWear": "1"}}),
            json!({"factory": "87.50"}),
        ))
    }

    #[test]
    fn test_load_and_replace() {
        assert_eq!(CacheState::Empty.apply(CacheAction::Load(None)), CacheState::Empty);

        let view = CacheView::new(json!({"a": {}}), json!({}));
        assert_eq!(
            CacheState::Empty.apply(CacheAction::Replace(view.clone())),
            CacheState::Loaded(view.clone())
        );
        assert_eq!(loaded().apply(CacheAction::Load(Some(view.clone()))), CacheState::Loaded(view));
    }

    #[test]
    fn test_reset_always_empties() {
        assert!(loaded().apply(CacheAction::Reset).is_empty());
        assert!(CacheState::Empty.apply(CacheAction::Reset).is_empty());
    }

    #[test]
    fn test_set_scores_keeps_machines() {
        let next = loaded().apply(CacheAction::SetScores(json!({"factory": "10.00"})));
        let view = next.view().unwrap();
        assert_eq!(view.machines, Some(json!({"weldingRobot": {"electrodeWear": "1"}})));
        assert_eq!(view.scores, Some(json!({"factory": "10.00"})));
    }

    #[test]
    fn test_set_scores_on_empty_is_partial_view() {
        let next = CacheState::Empty.apply(CacheAction::SetScores(json!({"factory": "1.00"})));
        assert_eq!(
            next,
            CacheState::Loaded(CacheView { machines: None, scores: Some(json!({"factory": "1.00"})) })
        );
    }

    #[test]
    fn test_view_wire_shape_omits_absent_parts() {
        let view = CacheView { machines: None, scores: Some(json!({})) };
        assert_eq!(serde_json::to_value(&view).unwrap(), json!({"scores": {}}));
        let parsed: CacheView = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, CacheView::default());
    }

    #[test]
    fn test_view_from_record() {
        let record = json!({
            "machines": {"paintingStation": {"flowRate": "9"}},
            "machineHealth": {"factory": "87.50"},
            "site": "north"
        });
        let view = CacheView::from_record(record.as_object().unwrap());
        assert_eq!(view.machines, Some(json!({"paintingStation": {"flowRate": "9"}})));
        assert_eq!(view.scores, Some(json!({"factory": "87.50"})));
    }
}
