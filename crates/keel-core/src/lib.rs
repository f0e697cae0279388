//! Consent-gated escalation policy engine.
//!
//! This crate is the control layer that decides when a conversational host
//! may enter its more direct "challenge" response mode, proves that the user
//! consented to that mode for the current turn only, and independently
//! re-verifies after the fact that every behavioral decision the host made
//! was legal under a fixed set of invariants.
//!
//! # Components
//!
//! - [`token`]: signed codec for the small piece of consent state that
//!   survives an untrusted client-held round trip.
//! - [`eligibility`]: pure decision function answering "may an escalation
//!   offer be shown this turn?".
//! - [`state`]: the consent state itself and its two transition functions.
//! - [`audit`]: an independent rule engine that inspects a completed
//!   behavioral telemetry event and flags violations of the safety contract,
//!   regardless of what the rest of the system decided.
//!
//! # Control Flow
//!
//! On each turn the host decodes the stored token, asks [`eligibility`]
//! whether an offer is permitted, and re-encodes the next state produced by
//! the transition functions. Independently, after the assistant produces its
//! behavior for the turn, the host assembles a [`event::TelemetryEvent`] and
//! passes it to the [`audit::Auditor`]; the result feeds monitoring and CI
//! gating and never blocks the user-facing response.
//!
//! # Failure Philosophy
//!
//! Token decoding fails *closed*: any malformed, tampered, wrong-version, or
//! session-mismatched token decodes to the fresh empty state. The auditor
//! never fails at all: it always returns a structured report, and a rule
//! group whose inputs are missing or malformed simply does not apply.
//!
//! # Example
//!
//! ```
//! use keel_core::{
//!     can_offer_escalation, ConsentState, OfferThresholds, SimState, TokenCodec, TurnSignals,
//! };
//! use secrecy::SecretString;
//!
//! let codec = TokenCodec::new(SecretString::from("a-server-held-secret".to_string()));
//! let state = codec.decode("not a token", Some("session-1"));
//! assert_eq!(state, ConsentState::default());
//!
//! let signals = TurnSignals {
//!     sim_state: SimState::Stable,
//!     crisis_markers: false,
//!     dependency_markers: false,
//!     upgrade_pressure: false,
//!     loop_detected: true,
//!     turn_id: 4,
//!     already_offered_this_turn: false,
//! };
//! let thresholds = OfferThresholds {
//!     min_turns_before_repeat: 5,
//!     max_prompts_per_session: 2,
//! };
//! assert!(can_offer_escalation(&signals, &state, &thresholds));
//! ```

pub mod audit;
pub mod config;
pub mod eligibility;
pub mod event;
pub mod state;
pub mod token;
pub mod types;

pub use audit::{AuditConfig, AuditReport, Auditor, Violation};
pub use config::{ConfigError, EngineConfig, PromptBudget, SECRET_ENV};
pub use eligibility::{can_offer_escalation, OfferThresholds, TurnSignals};
pub use event::TelemetryEvent;
pub use state::{ConsentRecord, ConsentState};
pub use token::{TokenCodec, TokenError};
pub use types::{
    AbstractionLevel, ConsentScope, SimState, Tier, UserChoice, CHALLENGE_RESPONSE_TAG,
};
