//! Engine configuration: the signing secret and the prompt-policy knobs.
//!
//! The secret is mandatory. A deployment without `KEEL_TOKEN_SECRET` fails
//! at construction instead of silently falling back to a guessable default.

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::warn;

use crate::audit::AuditConfig;
use crate::eligibility::OfferThresholds;
use crate::token::TokenCodec;

/// Environment variable holding the token signing secret.
pub const SECRET_ENV: &str = "KEEL_TOKEN_SECRET";

/// Secrets shorter than this load but emit a startup warning.
const MIN_SECRET_BYTES: usize = 32;

/// Default minimum turns between two escalation offers.
pub const DEFAULT_MIN_TURNS_BEFORE_REPEAT: u32 = 5;

/// Default hard ceiling on offers per session.
pub const DEFAULT_MAX_PROMPTS_PER_SESSION: u32 = 2;

/// Default suppression window after a decline, in turns.
pub const DEFAULT_SUPPRESS_TURNS_ON_DECLINE: u32 = 10;

/// Errors that can occur while building an [`EngineConfig`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The signing secret is not configured. There is deliberately no
    /// fallback default.
    #[error("signing secret missing: set KEEL_TOKEN_SECRET")]
    MissingSecret,

    /// The soft warning ceiling exceeds the hard prompt ceiling.
    #[error(
        "prompt budget invalid: warn_after {warn_after} exceeds max_prompts_per_session {max}"
    )]
    InvalidPromptBudget {
        /// The rejected soft ceiling.
        warn_after: u32,
        /// The hard ceiling it exceeded.
        max: u32,
    },
}

/// Session prompt ceilings.
///
/// The hard eligibility gate and the soft audit warning live in one object
/// so the two numbers cannot drift apart: `warn_after` is validated to be
/// at most `max_prompts_per_session`, so the soft signal always fires at or
/// before the hard gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptBudget {
    max_prompts_per_session: u32,
    warn_after: u32,
}

impl PromptBudget {
    /// Creates a budget with a hard ceiling and a soft warning threshold.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidPromptBudget` if `warn_after` exceeds
    /// `max_prompts_per_session`.
    pub fn new(max_prompts_per_session: u32, warn_after: u32) -> Result<Self, ConfigError> {
        if warn_after > max_prompts_per_session {
            return Err(ConfigError::InvalidPromptBudget {
                warn_after,
                max: max_prompts_per_session,
            });
        }
        Ok(Self {
            max_prompts_per_session,
            warn_after,
        })
    }

    /// The hard per-session offer ceiling consumed by the evaluator.
    #[must_use]
    pub const fn max_prompts_per_session(&self) -> u32 {
        self.max_prompts_per_session
    }

    /// The soft ceiling above which the auditor emits a warning.
    #[must_use]
    pub const fn warn_after(&self) -> u32 {
        self.warn_after
    }
}

impl Default for PromptBudget {
    fn default() -> Self {
        Self {
            max_prompts_per_session: DEFAULT_MAX_PROMPTS_PER_SESSION,
            warn_after: DEFAULT_MAX_PROMPTS_PER_SESSION,
        }
    }
}

/// Configuration for the whole engine, injected at construction time.
///
/// No ambient global state: tests supply distinct secrets without
/// process-wide side effects.
#[derive(Debug)]
pub struct EngineConfig {
    secret: SecretString,
    min_turns_before_repeat: u32,
    suppress_turns_on_decline: u32,
    prompt_budget: PromptBudget,
}

impl EngineConfig {
    /// Creates a config with the given secret and default policy knobs.
    #[must_use]
    pub fn new(secret: SecretString) -> Self {
        if secret.expose_secret().len() < MIN_SECRET_BYTES {
            warn!(
                min_bytes = MIN_SECRET_BYTES,
                "token signing secret is short; prefer random bytes at or above the minimum"
            );
        }
        Self {
            secret,
            min_turns_before_repeat: DEFAULT_MIN_TURNS_BEFORE_REPEAT,
            suppress_turns_on_decline: DEFAULT_SUPPRESS_TURNS_ON_DECLINE,
            prompt_budget: PromptBudget::default(),
        }
    }

    /// Reads the secret from [`SECRET_ENV`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingSecret` when the variable is unset or
    /// empty. This is a hard failure by design; the consent feature must
    /// never run on a guessable default secret.
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret = std::env::var(SECRET_ENV).map_err(|_| ConfigError::MissingSecret)?;
        if secret.is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        Ok(Self::new(SecretString::from(secret)))
    }

    /// Replaces the prompt budget.
    #[must_use]
    pub fn with_prompt_budget(mut self, budget: PromptBudget) -> Self {
        self.prompt_budget = budget;
        self
    }

    /// Replaces the repeat-spacing threshold.
    #[must_use]
    pub fn with_min_turns_before_repeat(mut self, turns: u32) -> Self {
        self.min_turns_before_repeat = turns;
        self
    }

    /// Replaces the post-decline suppression window.
    #[must_use]
    pub fn with_suppress_turns_on_decline(mut self, turns: u32) -> Self {
        self.suppress_turns_on_decline = turns;
        self
    }

    /// Builds a token codec signing with this config's secret.
    #[must_use]
    pub fn codec(&self) -> TokenCodec {
        TokenCodec::new(self.secret.clone())
    }

    /// The thresholds the eligibility evaluator consumes.
    #[must_use]
    pub const fn offer_thresholds(&self) -> OfferThresholds {
        OfferThresholds {
            min_turns_before_repeat: self.min_turns_before_repeat,
            max_prompts_per_session: self.prompt_budget.max_prompts_per_session(),
        }
    }

    /// The configuration the auditor consumes.
    #[must_use]
    pub const fn audit_config(&self) -> AuditConfig {
        AuditConfig {
            prompt_warning_ceiling: self.prompt_budget.warn_after(),
        }
    }

    /// Turns to suppress re-offering after a decline.
    #[must_use]
    pub const fn suppress_turns_on_decline(&self) -> u32 {
        self.suppress_turns_on_decline
    }
}
