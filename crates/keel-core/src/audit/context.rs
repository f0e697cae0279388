//! Pre-extracted view of a telemetry event for the rule table.
//!
//! Each named `state_snapshot` sub-record is parsed once, up front. Parsing
//! is deliberately tolerant of extra fields but strict on shape: a section
//! that is not an object of the expected form yields `None`, which disables
//! that rule group only. Recorded enum-like values stay raw strings here —
//! the auditor is independent of the primary decision logic and judges the
//! recorded facts, not upstream types.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::AuditConfig;
use crate::event::TelemetryEvent;

/// Name of the escalation-style sub-record.
pub(crate) const SECTION_STYLE: &str = "iba_style";
/// Name of the consent/challenge sub-record.
pub(crate) const SECTION_CHALLENGE: &str = "challenge";
/// Name of the third-assistant-message sub-record.
pub(crate) const SECTION_THIRD_MESSAGE: &str = "third_message";
/// Name of the fourth-assistant-message sub-record.
pub(crate) const SECTION_FOURTH_MESSAGE: &str = "fourth_message";

/// Snapshot of the escalated response style for one turn.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct StyleSnapshot {
    /// Whether the escalated style was active in the response.
    #[serde(default)]
    pub active: bool,

    /// Pressure level the response used; must be 1..=3 when active.
    #[serde(default)]
    pub pressure: Option<i64>,

    /// Whether the user was told they can exit the mode.
    #[serde(default)]
    pub exit_available: bool,

    /// The rendered response text the style rules scan.
    #[serde(default)]
    pub text: Option<String>,
}

/// Snapshot of the consent/challenge bookkeeping for one turn.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ChallengeSnapshot {
    /// Whether the escalated mode was actually applied this turn.
    #[serde(default)]
    pub iba_active: bool,

    /// Recorded user choice; must be exactly `challenge_on` when applied.
    #[serde(default)]
    pub user_choice: Option<String>,

    /// Recorded consent scope; must be exactly `single_turn` when applied.
    #[serde(default)]
    pub scope: Option<String>,

    /// Recorded severity at apply time; must be exactly `stable`.
    #[serde(default)]
    pub sim_state_at_apply: Option<String>,

    /// When consent was recorded (RFC 3339).
    #[serde(default)]
    pub consent_ts: Option<String>,

    /// When the escalated mode was applied (RFC 3339).
    #[serde(default)]
    pub applied_ts: Option<String>,

    /// Whether an escalation offer was shown this turn.
    #[serde(default)]
    pub prompt_shown: bool,

    /// Running offer count for the session.
    #[serde(default)]
    pub prompt_count_in_session: u32,
}

/// Snapshot of the third assistant message of a session.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ThirdMessageSnapshot {
    /// The message text the staged-message rules scan.
    #[serde(default)]
    pub text: Option<String>,
}

/// Snapshot of the fourth assistant message of a session.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct FourthMessageSnapshot {
    /// Reflection layers the message ran.
    #[serde(default)]
    pub reflection_layers_used: Option<u32>,

    /// Abstraction level the message used.
    #[serde(default)]
    pub abstraction_level_used: Option<String>,

    /// Whether an analysis pass ran for the message.
    #[serde(default)]
    pub analysis_ran: bool,
}

/// Everything a rule check may consult, extracted once per validation.
pub(crate) struct AuditContext<'a> {
    pub event: &'a TelemetryEvent,
    pub config: &'a AuditConfig,
    pub style: Option<StyleSnapshot>,
    pub challenge: Option<ChallengeSnapshot>,
    pub third_message: Option<ThirdMessageSnapshot>,
    pub fourth_message: Option<FourthMessageSnapshot>,
}

impl<'a> AuditContext<'a> {
    pub(crate) fn extract(event: &'a TelemetryEvent, config: &'a AuditConfig) -> Self {
        Self {
            event,
            config,
            style: section(event, SECTION_STYLE),
            challenge: section(event, SECTION_CHALLENGE),
            third_message: section(event, SECTION_THIRD_MESSAGE),
            fourth_message: section(event, SECTION_FOURTH_MESSAGE),
        }
    }
}

/// Parses one named sub-record; absent or malformed yields `None`.
fn section<T: DeserializeOwned>(event: &TelemetryEvent, key: &str) -> Option<T> {
    let value = event.state_snapshot.get(key)?;
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            debug!(section = key, error = %err, "snapshot section malformed; rule group skipped");
            None
        },
    }
}
