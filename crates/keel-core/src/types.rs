//! Shared behavioral vocabulary: severity, abstraction, tier, and consent
//! enums used by the codec, the evaluator, and the auditor.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Marker tag an escalated response must carry in its `response_tags` set.
pub const CHALLENGE_RESPONSE_TAG: &str = "challenge_mode";

/// Errors from parsing the shared vocabulary enums.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TypeParseError {
    /// Unrecognized severity state.
    #[error("invalid severity state: {value}")]
    InvalidSimState {
        /// The invalid value.
        value: String,
    },

    /// Unrecognized abstraction level.
    #[error("invalid abstraction level: {value}")]
    InvalidAbstractionLevel {
        /// The invalid value.
        value: String,
    },

    /// Unrecognized service tier.
    #[error("invalid tier: {value}")]
    InvalidTier {
        /// The invalid value.
        value: String,
    },

    /// Unrecognized user choice.
    #[error("invalid user choice: {value}")]
    InvalidUserChoice {
        /// The invalid value.
        value: String,
    },

    /// Unrecognized consent scope.
    #[error("invalid consent scope: {value}")]
    InvalidConsentScope {
        /// The invalid value.
        value: String,
    },
}

/// Severity state: how much behavioral latitude the system currently has.
///
/// Ordered from calmest to most restricted. Escalation features are
/// permitted only at `Stable`; capabilities are progressively revoked at
/// higher levels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SimState {
    /// Full latitude; the only level at which escalation may be offered or
    /// applied.
    Stable,
    /// Reduced latitude.
    Strained,
    /// Analysis and invitations are locked out.
    Overloaded,
    /// Maximum restriction.
    Protected,
}

impl SimState {
    /// Parses a severity state from a string.
    ///
    /// # Errors
    ///
    /// Returns `TypeParseError::InvalidSimState` if the string is not a
    /// recognized level.
    pub fn parse(s: &str) -> Result<Self, TypeParseError> {
        match s {
            "stable" => Ok(Self::Stable),
            "strained" => Ok(Self::Strained),
            "overloaded" => Ok(Self::Overloaded),
            "protected" => Ok(Self::Protected),
            _ => Err(TypeParseError::InvalidSimState {
                value: s.to_string(),
            }),
        }
    }

    /// Returns the string representation of this severity state.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::Strained => "strained",
            Self::Overloaded => "overloaded",
            Self::Protected => "protected",
        }
    }

    /// The highest abstraction level a response may use at this severity.
    #[must_use]
    pub const fn max_abstraction(&self) -> AbstractionLevel {
        match self {
            Self::Stable => AbstractionLevel::Structural,
            Self::Strained => AbstractionLevel::Thematic,
            Self::Overloaded | Self::Protected => AbstractionLevel::Situational,
        }
    }

    /// The most reflection layers a response may run at this severity.
    #[must_use]
    pub const fn max_reflection_layers(&self) -> u8 {
        match self {
            Self::Stable => 3,
            Self::Strained => 2,
            Self::Overloaded => 1,
            Self::Protected => 0,
        }
    }

    /// Whether analysis passes are permitted at all at this severity.
    #[must_use]
    pub const fn analysis_permitted(&self) -> bool {
        !matches!(self, Self::Overloaded | Self::Protected)
    }
}

impl std::fmt::Display for SimState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Abstraction level: how conceptual a response may get.
///
/// Ordered from most concrete to most general; capped per service tier and
/// per severity state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AbstractionLevel {
    /// Grounded in the user's concrete situation.
    Situational,
    /// Generalizes across situations into themes.
    Thematic,
    /// Names underlying structure across themes.
    Structural,
}

impl AbstractionLevel {
    /// Parses an abstraction level from a string.
    ///
    /// # Errors
    ///
    /// Returns `TypeParseError::InvalidAbstractionLevel` if the string is
    /// not a recognized level.
    pub fn parse(s: &str) -> Result<Self, TypeParseError> {
        match s {
            "situational" => Ok(Self::Situational),
            "thematic" => Ok(Self::Thematic),
            "structural" => Ok(Self::Structural),
            _ => Err(TypeParseError::InvalidAbstractionLevel {
                value: s.to_string(),
            }),
        }
    }

    /// Returns the string representation of this abstraction level.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Situational => "situational",
            Self::Thematic => "thematic",
            Self::Structural => "structural",
        }
    }
}

impl std::fmt::Display for AbstractionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Service tier, ordered from lowest to highest.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// The lowest tier.
    Free,
    /// The default paid tier.
    Standard,
    /// The highest tier.
    Premium,
}

impl Tier {
    /// Parses a tier from a string.
    ///
    /// # Errors
    ///
    /// Returns `TypeParseError::InvalidTier` if the string is not a
    /// recognized tier.
    pub fn parse(s: &str) -> Result<Self, TypeParseError> {
        match s {
            "free" => Ok(Self::Free),
            "standard" => Ok(Self::Standard),
            "premium" => Ok(Self::Premium),
            _ => Err(TypeParseError::InvalidTier {
                value: s.to_string(),
            }),
        }
    }

    /// Returns the string representation of this tier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Standard => "standard",
            Self::Premium => "premium",
        }
    }

    /// The highest abstraction level this tier may ever reach. The lowest
    /// tier never reaches `Structural`.
    #[must_use]
    pub const fn max_abstraction(&self) -> AbstractionLevel {
        match self {
            Self::Free => AbstractionLevel::Thematic,
            Self::Standard | Self::Premium => AbstractionLevel::Structural,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The user's recorded choice when answering an escalation offer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UserChoice {
    /// The user opted into challenge mode.
    ChallengeOn,
    /// The user opted out.
    ChallengeOff,
}

impl UserChoice {
    /// Parses a user choice from a string.
    ///
    /// # Errors
    ///
    /// Returns `TypeParseError::InvalidUserChoice` if the string is not a
    /// recognized choice.
    pub fn parse(s: &str) -> Result<Self, TypeParseError> {
        match s {
            "challenge_on" => Ok(Self::ChallengeOn),
            "challenge_off" => Ok(Self::ChallengeOff),
            _ => Err(TypeParseError::InvalidUserChoice {
                value: s.to_string(),
            }),
        }
    }

    /// Returns the string representation of this choice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ChallengeOn => "challenge_on",
            Self::ChallengeOff => "challenge_off",
        }
    }
}

impl std::fmt::Display for UserChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How long a recorded consent is valid. There is deliberately no
/// session-wide scope: every turn that wants the escalated mode must
/// re-prove consent for that turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConsentScope {
    /// Valid for exactly one turn.
    SingleTurn,
    /// No consent in effect.
    #[default]
    None,
}

impl ConsentScope {
    /// Parses a consent scope from a string.
    ///
    /// # Errors
    ///
    /// Returns `TypeParseError::InvalidConsentScope` if the string is not a
    /// recognized scope.
    pub fn parse(s: &str) -> Result<Self, TypeParseError> {
        match s {
            "single_turn" => Ok(Self::SingleTurn),
            "none" => Ok(Self::None),
            _ => Err(TypeParseError::InvalidConsentScope {
                value: s.to_string(),
            }),
        }
    }

    /// Returns the string representation of this scope.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SingleTurn => "single_turn",
            Self::None => "none",
        }
    }
}

impl std::fmt::Display for ConsentScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
