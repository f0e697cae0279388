//! Escalation-offer eligibility: a pure, fail-closed decision function.
//!
//! Called before any user-visible behavior decision is made. Every condition
//! must hold for an offer to be permitted; the first failing condition
//! blocks it.

use crate::state::ConsentState;
use crate::types::SimState;

/// Per-turn signals the evaluator judges, all computed upstream.
#[derive(Debug, Clone)]
pub struct TurnSignals {
    /// Current severity state.
    pub sim_state: SimState,

    /// Crisis indicators were detected this turn.
    pub crisis_markers: bool,

    /// Dependency indicators were detected this turn.
    pub dependency_markers: bool,

    /// The user is under upgrade/tier pressure this turn.
    pub upgrade_pressure: bool,

    /// A repetitive pattern that challenge mode could help with is present.
    pub loop_detected: bool,

    /// Current turn counter.
    pub turn_id: u32,

    /// An offer was already made earlier in this same turn.
    pub already_offered_this_turn: bool,
}

/// Tunable offer thresholds, sourced from [`crate::config::EngineConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfferThresholds {
    /// Minimum turns between two offers.
    pub min_turns_before_repeat: u32,

    /// Hard ceiling on offers per session.
    pub max_prompts_per_session: u32,
}

/// Decides whether an escalation-consent offer may be shown this turn.
///
/// The decision is an AND-chain over the signals, the decoded consent
/// state, and the thresholds; any failing condition blocks the offer.
/// Escalation is opt-in surfaced only when a detected loop motivates it,
/// never proactively.
#[must_use]
pub fn can_offer_escalation(
    signals: &TurnSignals,
    state: &ConsentState,
    thresholds: &OfferThresholds,
) -> bool {
    // Never outside the calmest severity level.
    if signals.sim_state != SimState::Stable {
        return false;
    }
    // Never while any safety signal is set.
    if signals.crisis_markers || signals.dependency_markers || signals.upgrade_pressure {
        return false;
    }
    // Only when a repetitive pattern actually motivates the offer.
    if !signals.loop_detected {
        return false;
    }
    // At most once per turn.
    if signals.already_offered_this_turn {
        return false;
    }
    // Respect a prior decline's suppression window.
    if signals.turn_id < state.suppress_until_turn {
        return false;
    }
    // Respect the repeat spacing once an offer has been shown.
    if state.has_prompted()
        && signals.turn_id.saturating_sub(state.last_prompt_turn) < thresholds.min_turns_before_repeat
    {
        return false;
    }
    // Respect the per-session ceiling.
    if state.prompt_count >= thresholds.max_prompts_per_session {
        return false;
    }
    true
}
