//! Behavioral telemetry event: the immutable per-turn record the auditor
//! judges.
//!
//! The host assembles exactly one event per assistant turn, after the
//! behavior for that turn is complete. Every field is already-computed
//! fact; the auditor never infers or corrects, only judges.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{AbstractionLevel, SimState, Tier};

/// What the system actually did on one turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TelemetryEvent {
    /// Session identifier.
    pub session_id: String,

    /// The user's service tier.
    pub tier: Tier,

    /// Model that produced the turn.
    pub model_used: String,

    /// Severity state during the turn.
    pub sim_state: SimState,

    /// Abstraction level the response used.
    pub abstraction_level: AbstractionLevel,

    /// Reflection layers the response ran.
    pub reflection_layers: u8,

    /// Tags describing the response.
    #[serde(default)]
    pub response_tags: BTreeSet<String>,

    /// An upgrade/tier invitation was shown this turn.
    #[serde(default)]
    pub invitation_shown: bool,

    /// Severity state at the moment the invitation was shown.
    #[serde(default)]
    pub sim_state_at_invite: Option<SimState>,

    /// Named sub-records (`iba_style`, `challenge`, `third_message`,
    /// `fourth_message`) whose presence triggers additional rule groups.
    /// Kept loose: the auditor re-parses each sub-record itself and a
    /// malformed one disables only that rule group.
    #[serde(default)]
    pub state_snapshot: serde_json::Map<String, Value>,
}

impl TelemetryEvent {
    /// Creates an event with neutral behavioral descriptors; callers fill
    /// in the rest before handing it to the auditor.
    #[must_use]
    pub fn new(session_id: impl Into<String>, tier: Tier, model_used: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            tier,
            model_used: model_used.into(),
            sim_state: SimState::Stable,
            abstraction_level: AbstractionLevel::Situational,
            reflection_layers: 0,
            response_tags: BTreeSet::new(),
            invitation_shown: false,
            sim_state_at_invite: None,
            state_snapshot: serde_json::Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serde_roundtrip() {
        let mut event = TelemetryEvent::new("session-1", Tier::Standard, "model-a");
        event.sim_state = SimState::Strained;
        event.response_tags.insert("reflect".to_string());
        event.state_snapshot.insert(
            "challenge".to_string(),
            serde_json::json!({ "iba_active": false }),
        );

        let json = serde_json::to_string(&event).unwrap();
        let back: TelemetryEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_minimal_event_decodes() {
        let event: TelemetryEvent = serde_json::from_str(
            r#"{
                "session_id": "s",
                "tier": "free",
                "model_used": "m",
                "sim_state": "stable",
                "abstraction_level": "situational",
                "reflection_layers": 0
            }"#,
        )
        .unwrap();
        assert!(event.state_snapshot.is_empty());
        assert!(!event.invitation_shown);
    }
}
