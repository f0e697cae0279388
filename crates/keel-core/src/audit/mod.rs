//! Post-hoc invariant auditor.
//!
//! A second, independent rule engine that inspects a completed
//! [`TelemetryEvent`] and flags any violation of the safety contract,
//! regardless of what the rest of the system decided. Defense in depth: the
//! auditor shares no code path with the eligibility evaluator and judges
//! only recorded facts.
//!
//! # Rule Model
//!
//! Rules live in one declarative table of `{id, applies, check}` entries
//! evaluated uniformly (see [`rules`]); adding a safety rule is one table
//! entry, reviewable in isolation. Rule groups are triggered by the named
//! sub-records of the event's `state_snapshot`; a missing or malformed
//! sub-record disables that group only.
//!
//! # Contract
//!
//! [`Auditor::validate`] is stateless, single-pass, and never panics.
//! Violations are data to be acted on by the caller — a CI pipeline failing
//! a build or a monitoring pipeline raising an alert — not exceptions, and
//! this path never blocks the user-facing response.

mod context;
mod report;
mod rules;
mod textscan;

#[cfg(test)]
mod tests;

pub use report::{AuditReport, Violation};

use context::AuditContext;
use report::Findings;
use tracing::trace;

use crate::config::DEFAULT_MAX_PROMPTS_PER_SESSION;
use crate::event::TelemetryEvent;

/// Auditor configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditConfig {
    /// Running prompt count above which the soft budget warning fires.
    pub prompt_warning_ceiling: u32,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            prompt_warning_ceiling: DEFAULT_MAX_PROMPTS_PER_SESSION,
        }
    }
}

/// The invariant auditor.
#[derive(Debug, Clone, Default)]
pub struct Auditor {
    config: AuditConfig,
}

impl Auditor {
    /// Creates an auditor with the given configuration.
    #[must_use]
    pub const fn new(config: AuditConfig) -> Self {
        Self { config }
    }

    /// Validates one completed telemetry event against every applicable
    /// rule and returns the aggregated result.
    ///
    /// `ok` is true iff no violation was found; warnings never affect `ok`.
    #[must_use]
    pub fn validate(&self, event: &TelemetryEvent) -> AuditReport {
        let ctx = AuditContext::extract(event, &self.config);
        let mut findings = Findings::default();
        for rule in rules::RULES {
            if (rule.applies)(&ctx) {
                trace!(rule = rule.id, "rule applies");
                (rule.check)(&ctx, &mut findings);
            }
        }
        findings.into_report()
    }
}
