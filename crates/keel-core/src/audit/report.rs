//! Audit result types.

use serde::{Deserialize, Serialize};

/// One rule failure: which rule, and what it saw.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Violation {
    /// Identifier of the failed rule.
    pub rule_id: String,

    /// What the rule observed.
    pub message: String,
}

/// Aggregated result of validating one telemetry event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditReport {
    /// True iff `violations` is empty. Warnings never affect this.
    pub ok: bool,

    /// Hard failures of the safety contract.
    pub violations: Vec<Violation>,

    /// Soft signals for tuning, not policy breaches.
    pub warnings: Vec<Violation>,
}

/// Mutable accumulator the rule checks write into.
#[derive(Debug, Default)]
pub(crate) struct Findings {
    violations: Vec<Violation>,
    warnings: Vec<Violation>,
}

impl Findings {
    pub(crate) fn violation(&mut self, rule_id: &str, message: impl Into<String>) {
        self.violations.push(Violation {
            rule_id: rule_id.to_string(),
            message: message.into(),
        });
    }

    pub(crate) fn warning(&mut self, rule_id: &str, message: impl Into<String>) {
        self.warnings.push(Violation {
            rule_id: rule_id.to_string(),
            message: message.into(),
        });
    }

    pub(crate) fn into_report(self) -> AuditReport {
        AuditReport {
            ok: self.violations.is_empty(),
            violations: self.violations,
            warnings: self.warnings,
        }
    }
}
