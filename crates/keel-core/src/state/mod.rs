//! Client-held consent state and its transition functions.
//!
//! The state lives entirely in the caller-supplied token; it has no
//! server-side residency. It is created empty at session start, mutated only
//! through the transition functions here (each returns a new value), and
//! re-serialized by the [`crate::token`] codec every time it changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ConsentScope, UserChoice};

/// A recorded consent decision, valid for a single turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConsentRecord {
    /// Identifier of the policy version the user consented under.
    pub policy_id: String,

    /// What the user chose.
    pub user_choice: UserChoice,

    /// Scope of the consent. Always `SingleTurn` for an acceptance; there
    /// is no way to record a session-wide grant.
    pub scope: ConsentScope,

    /// When the consent was recorded.
    pub consent_ts: DateTime<Utc>,
}

/// The token payload: escalation-offer bookkeeping for one session.
///
/// All fields default so that payloads from older token versions decode
/// without error. A token that fails decoding entirely is replaced by
/// [`ConsentState::default`] — never a partially-trusted value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConsentState {
    /// Escalation offers shown this session.
    #[serde(default)]
    pub prompt_count: u32,

    /// Turn on which the most recent offer was shown (0 when none).
    #[serde(default)]
    pub last_prompt_turn: u32,

    /// Timestamp of the most recent offer.
    #[serde(default)]
    pub last_prompt_ts: Option<DateTime<Utc>>,

    /// Re-offering is blocked until the turn counter reaches this value.
    #[serde(default)]
    pub suppress_until_turn: u32,

    /// The consent currently in effect, if any.
    #[serde(default)]
    pub consent: Option<ConsentRecord>,

    /// One-way digest binding this token to its session; used to detect
    /// cross-session replay.
    #[serde(default)]
    pub session_binding: Option<String>,
}

impl ConsentState {
    /// Whether any escalation offer has ever been shown this session.
    #[must_use]
    pub const fn has_prompted(&self) -> bool {
        self.prompt_count > 0
    }

    /// Transition: an escalation offer was shown this turn.
    ///
    /// Increments the prompt count and records the turn and timestamp.
    /// Does not touch `consent`.
    #[must_use]
    pub fn on_prompt_shown(&self, turn_id: u32, ts: DateTime<Utc>) -> Self {
        Self {
            prompt_count: self.prompt_count.saturating_add(1),
            last_prompt_turn: turn_id,
            last_prompt_ts: Some(ts),
            ..self.clone()
        }
    }

    /// Transition: the user declined an escalation offer.
    ///
    /// Blocks re-offering until `turn_id + suppress_for_turns`.
    #[must_use]
    pub fn on_decline(&self, turn_id: u32, suppress_for_turns: u32) -> Self {
        Self {
            suppress_until_turn: turn_id.saturating_add(suppress_for_turns),
            ..self.clone()
        }
    }

    /// Records an accepted consent. The scope is forced to `SingleTurn`:
    /// every turn that wants the escalated mode must re-prove consent for
    /// that turn, and the auditor enforces it.
    #[must_use]
    pub fn record_consent(
        &self,
        policy_id: impl Into<String>,
        user_choice: UserChoice,
        consent_ts: DateTime<Utc>,
    ) -> Self {
        Self {
            consent: Some(ConsentRecord {
                policy_id: policy_id.into(),
                user_choice,
                scope: ConsentScope::SingleTurn,
                consent_ts,
            }),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_state() {
        let state = ConsentState::default();
        assert_eq!(state.prompt_count, 0);
        assert_eq!(state.suppress_until_turn, 0);
        assert!(state.consent.is_none());
        assert!(!state.has_prompted());
    }

    #[test]
    fn test_on_prompt_shown() {
        let state = ConsentState::default().on_prompt_shown(3, ts());
        assert_eq!(state.prompt_count, 1);
        assert_eq!(state.last_prompt_turn, 3);
        assert_eq!(state.last_prompt_ts, Some(ts()));
        assert!(state.has_prompted());
        assert!(state.consent.is_none());

        let state = state.on_prompt_shown(9, ts());
        assert_eq!(state.prompt_count, 2);
        assert_eq!(state.last_prompt_turn, 9);
    }

    #[test]
    fn test_on_decline_sets_suppression_window() {
        let state = ConsentState::default().on_decline(10, 12);
        assert_eq!(state.suppress_until_turn, 22);
        // Other bookkeeping untouched.
        assert_eq!(state.prompt_count, 0);
    }

    #[test]
    fn test_record_consent_forces_single_turn() {
        let state =
            ConsentState::default().record_consent("policy-7", UserChoice::ChallengeOn, ts());
        let record = state.consent.unwrap();
        assert_eq!(record.scope, ConsentScope::SingleTurn);
        assert_eq!(record.user_choice, UserChoice::ChallengeOn);
        assert_eq!(record.policy_id, "policy-7");
    }

    #[test]
    fn test_transitions_do_not_mutate_input() {
        let original = ConsentState::default();
        let _ = original.on_prompt_shown(5, ts());
        let _ = original.on_decline(5, 3);
        assert_eq!(original, ConsentState::default());
    }

    #[test]
    fn test_payload_with_missing_fields_decodes() {
        // Older token payloads carry fewer fields; all must default.
        let state: ConsentState = serde_json::from_str("{\"prompt_count\":2}").unwrap();
        assert_eq!(state.prompt_count, 2);
        assert_eq!(state.suppress_until_turn, 0);
        assert!(state.session_binding.is_none());
    }
}
