//! The declarative rule table.
//!
//! One entry per invariant: `{id, applies, check}`. Entries are evaluated
//! uniformly and independently; a check appends findings and never
//! short-circuits its peers. Adding a rule means adding one entry here.

use chrono::{DateTime, Utc};

use super::context::AuditContext;
use super::report::Findings;
use super::textscan;
use crate::types::{AbstractionLevel, ConsentScope, SimState, UserChoice, CHALLENGE_RESPONSE_TAG};

// Escalation style rules.
pub(crate) const STYLE_STABLE_REQUIRED: &str = "style.stable_required";
pub(crate) const STYLE_MARKER_TAG: &str = "style.marker_tag";
pub(crate) const STYLE_PRESSURE_RANGE: &str = "style.pressure_range";
pub(crate) const STYLE_EXIT_FLAG: &str = "style.exit_flag";
pub(crate) const STYLE_PARAGRAPH_DENSITY: &str = "style.paragraph_density";
pub(crate) const STYLE_QUESTION_BUDGET: &str = "style.question_budget";
pub(crate) const STYLE_RHETORICAL_QUESTION: &str = "style.rhetorical_question";
pub(crate) const STYLE_FORBIDDEN_PHRASE: &str = "style.forbidden_phrase";
pub(crate) const STYLE_EMOJI: &str = "style.emoji";
pub(crate) const STYLE_EXIT_LINE: &str = "style.exit_line";

// Consent-ordering rules.
pub(crate) const CONSENT_SEVERITY: &str = "consent.severity";
pub(crate) const CONSENT_CHOICE: &str = "consent.choice";
pub(crate) const CONSENT_SCOPE: &str = "consent.scope";
pub(crate) const CONSENT_APPLY_STATE: &str = "consent.apply_state";
pub(crate) const CONSENT_ORDERING: &str = "consent.ordering";
pub(crate) const CONSENT_PROMPT_BUDGET: &str = "consent.prompt_budget";

// Staged-message rules.
pub(crate) const THIRD_QUESTION_BUDGET: &str = "third_message.question_budget";
pub(crate) const THIRD_SOLUTION_LANGUAGE: &str = "third_message.solution_language";
pub(crate) const THIRD_FRAMEWORK_REFERENCE: &str = "third_message.framework_reference";
pub(crate) const THIRD_TIER_REFERENCE: &str = "third_message.tier_reference";
pub(crate) const THIRD_UPGRADE_LANGUAGE: &str = "third_message.upgrade_language";
pub(crate) const FOURTH_REFLECTION_CEILING: &str = "fourth_message.reflection_ceiling";
pub(crate) const FOURTH_ABSTRACTION_CEILING: &str = "fourth_message.abstraction_ceiling";
pub(crate) const FOURTH_ANALYSIS_LOCKOUT: &str = "fourth_message.analysis_lockout";

// Global rules.
pub(crate) const INVITE_SEVERITY_LOCKOUT: &str = "invite.severity_lockout";
pub(crate) const TIER_ABSTRACTION_CAP: &str = "tier.abstraction_cap";

/// One invariant: when it applies and what it checks.
pub(crate) struct Rule {
    pub id: &'static str,
    pub applies: fn(&AuditContext<'_>) -> bool,
    pub check: fn(&AuditContext<'_>, &mut Findings),
}

/// Every invariant the auditor enforces, in evaluation order.
pub(crate) const RULES: &[Rule] = &[
    Rule {
        id: STYLE_STABLE_REQUIRED,
        applies: style_active,
        check: check_style_stable,
    },
    Rule {
        id: STYLE_MARKER_TAG,
        applies: style_active,
        check: check_style_marker_tag,
    },
    Rule {
        id: STYLE_PRESSURE_RANGE,
        applies: style_active,
        check: check_style_pressure,
    },
    Rule {
        id: STYLE_EXIT_FLAG,
        applies: style_active,
        check: check_style_exit_flag,
    },
    Rule {
        id: STYLE_PARAGRAPH_DENSITY,
        applies: style_active,
        check: check_style_paragraph_density,
    },
    Rule {
        id: STYLE_QUESTION_BUDGET,
        applies: style_active,
        check: check_style_question_budget,
    },
    Rule {
        id: STYLE_RHETORICAL_QUESTION,
        applies: style_active,
        check: check_style_rhetorical,
    },
    Rule {
        id: STYLE_FORBIDDEN_PHRASE,
        applies: style_active,
        check: check_style_forbidden_phrase,
    },
    Rule {
        id: STYLE_EMOJI,
        applies: style_active,
        check: check_style_emoji,
    },
    Rule {
        id: STYLE_EXIT_LINE,
        applies: style_active,
        check: check_style_exit_line,
    },
    Rule {
        id: CONSENT_SEVERITY,
        applies: challenge_applied,
        check: check_consent_severity,
    },
    Rule {
        id: CONSENT_CHOICE,
        applies: challenge_applied,
        check: check_consent_choice,
    },
    Rule {
        id: CONSENT_SCOPE,
        applies: challenge_applied,
        check: check_consent_scope,
    },
    Rule {
        id: CONSENT_APPLY_STATE,
        applies: challenge_applied,
        check: check_consent_apply_state,
    },
    Rule {
        id: CONSENT_ORDERING,
        applies: challenge_applied,
        check: check_consent_ordering,
    },
    Rule {
        id: CONSENT_PROMPT_BUDGET,
        applies: challenge_present,
        check: check_prompt_budget,
    },
    Rule {
        id: THIRD_QUESTION_BUDGET,
        applies: third_present,
        check: check_third_question_budget,
    },
    Rule {
        id: THIRD_SOLUTION_LANGUAGE,
        applies: third_present,
        check: check_third_solution_language,
    },
    Rule {
        id: THIRD_FRAMEWORK_REFERENCE,
        applies: third_present,
        check: check_third_framework,
    },
    Rule {
        id: THIRD_TIER_REFERENCE,
        applies: third_present,
        check: check_third_tier_reference,
    },
    Rule {
        id: THIRD_UPGRADE_LANGUAGE,
        applies: third_present,
        check: check_third_upgrade_language,
    },
    Rule {
        id: FOURTH_REFLECTION_CEILING,
        applies: fourth_present,
        check: check_fourth_reflection,
    },
    Rule {
        id: FOURTH_ABSTRACTION_CEILING,
        applies: fourth_present,
        check: check_fourth_abstraction,
    },
    Rule {
        id: FOURTH_ANALYSIS_LOCKOUT,
        applies: fourth_present,
        check: check_fourth_analysis,
    },
    Rule {
        id: INVITE_SEVERITY_LOCKOUT,
        applies: invitation_shown,
        check: check_invite_severity,
    },
    Rule {
        id: TIER_ABSTRACTION_CAP,
        applies: always,
        check: check_tier_abstraction,
    },
];

// Applicability predicates.

fn always(_ctx: &AuditContext<'_>) -> bool {
    true
}

fn style_active(ctx: &AuditContext<'_>) -> bool {
    ctx.style.as_ref().is_some_and(|s| s.active)
}

fn challenge_present(ctx: &AuditContext<'_>) -> bool {
    ctx.challenge.is_some()
}

fn challenge_applied(ctx: &AuditContext<'_>) -> bool {
    ctx.challenge.as_ref().is_some_and(|c| c.iba_active)
}

fn third_present(ctx: &AuditContext<'_>) -> bool {
    ctx.third_message.is_some()
}

fn fourth_present(ctx: &AuditContext<'_>) -> bool {
    ctx.fourth_message.is_some()
}

fn invitation_shown(ctx: &AuditContext<'_>) -> bool {
    ctx.event.invitation_shown
}

// Escalation style checks.

fn check_style_stable(ctx: &AuditContext<'_>, findings: &mut Findings) {
    if ctx.event.sim_state != SimState::Stable {
        findings.violation(
            STYLE_STABLE_REQUIRED,
            format!(
                "escalated style active at severity {}",
                ctx.event.sim_state
            ),
        );
    }
}

fn check_style_marker_tag(ctx: &AuditContext<'_>, findings: &mut Findings) {
    if !ctx.event.response_tags.contains(CHALLENGE_RESPONSE_TAG) {
        findings.violation(
            STYLE_MARKER_TAG,
            format!("response_tags missing marker tag {CHALLENGE_RESPONSE_TAG:?}"),
        );
    }
}

fn check_style_pressure(ctx: &AuditContext<'_>, findings: &mut Findings) {
    let Some(style) = &ctx.style else { return };
    match style.pressure {
        Some(level) if (1..=3).contains(&level) => {},
        Some(level) => findings.violation(
            STYLE_PRESSURE_RANGE,
            format!("pressure level {level} outside 1..=3"),
        ),
        None => findings.violation(STYLE_PRESSURE_RANGE, "pressure level missing"),
    }
}

fn check_style_exit_flag(ctx: &AuditContext<'_>, findings: &mut Findings) {
    let Some(style) = &ctx.style else { return };
    if !style.exit_available {
        findings.violation(STYLE_EXIT_FLAG, "user-can-exit flag not set");
    }
}

fn check_style_paragraph_density(ctx: &AuditContext<'_>, findings: &mut Findings) {
    let Some(text) = style_text(ctx) else { return };
    for paragraph in textscan::paragraphs(text) {
        let sentences = textscan::sentence_count(paragraph);
        if sentences > textscan::MAX_SENTENCES_PER_PARAGRAPH {
            findings.violation(
                STYLE_PARAGRAPH_DENSITY,
                format!(
                    "paragraph has {sentences} sentences, cap is {}",
                    textscan::MAX_SENTENCES_PER_PARAGRAPH
                ),
            );
            return;
        }
    }
}

fn check_style_question_budget(ctx: &AuditContext<'_>, findings: &mut Findings) {
    let Some(text) = style_text(ctx) else { return };
    let questions = textscan::question_count(text);
    if questions > textscan::MAX_QUESTIONS {
        findings.violation(
            STYLE_QUESTION_BUDGET,
            format!(
                "{questions} questions, cap is {}",
                textscan::MAX_QUESTIONS
            ),
        );
    }
}

fn check_style_rhetorical(ctx: &AuditContext<'_>, findings: &mut Findings) {
    let Some(text) = style_text(ctx) else { return };
    if let Some(marker) = textscan::find_marker(text, textscan::RHETORICAL_OPENERS) {
        findings.violation(
            STYLE_RHETORICAL_QUESTION,
            format!("rhetorical question opener {marker:?}"),
        );
    }
}

fn check_style_forbidden_phrase(ctx: &AuditContext<'_>, findings: &mut Findings) {
    let Some(text) = style_text(ctx) else { return };
    if let Some(marker) = textscan::find_marker(text, textscan::FORBIDDEN_PHRASES) {
        findings.violation(
            STYLE_FORBIDDEN_PHRASE,
            format!("forbidden phrase {marker:?}"),
        );
    }
}

fn check_style_emoji(ctx: &AuditContext<'_>, findings: &mut Findings) {
    let Some(text) = style_text(ctx) else { return };
    if textscan::contains_emoji(text) {
        findings.violation(STYLE_EMOJI, "emoji in escalated response");
    }
}

fn check_style_exit_line(ctx: &AuditContext<'_>, findings: &mut Findings) {
    let Some(text) = style_text(ctx) else { return };
    if !textscan::has_exit_line(text) {
        findings.violation(STYLE_EXIT_LINE, "closing exit line missing");
    }
}

fn style_text<'a>(ctx: &'a AuditContext<'_>) -> Option<&'a str> {
    ctx.style.as_ref().and_then(|s| s.text.as_deref())
}

// Consent-ordering checks.

fn check_consent_severity(ctx: &AuditContext<'_>, findings: &mut Findings) {
    if ctx.event.sim_state != SimState::Stable {
        findings.violation(
            CONSENT_SEVERITY,
            format!(
                "escalated mode applied at severity {}",
                ctx.event.sim_state
            ),
        );
    }
}

fn check_consent_choice(ctx: &AuditContext<'_>, findings: &mut Findings) {
    let Some(challenge) = &ctx.challenge else { return };
    if challenge.user_choice.as_deref() != Some(UserChoice::ChallengeOn.as_str()) {
        findings.violation(
            CONSENT_CHOICE,
            format!(
                "recorded user choice {:?}, expected {:?}",
                challenge.user_choice,
                UserChoice::ChallengeOn.as_str()
            ),
        );
    }
}

fn check_consent_scope(ctx: &AuditContext<'_>, findings: &mut Findings) {
    let Some(challenge) = &ctx.challenge else { return };
    if challenge.scope.as_deref() != Some(ConsentScope::SingleTurn.as_str()) {
        findings.violation(
            CONSENT_SCOPE,
            format!(
                "recorded scope {:?}, expected {:?}",
                challenge.scope,
                ConsentScope::SingleTurn.as_str()
            ),
        );
    }
}

fn check_consent_apply_state(ctx: &AuditContext<'_>, findings: &mut Findings) {
    let Some(challenge) = &ctx.challenge else { return };
    if challenge.sim_state_at_apply.as_deref() != Some(SimState::Stable.as_str()) {
        findings.violation(
            CONSENT_APPLY_STATE,
            format!(
                "recorded severity at apply {:?}, expected {:?}",
                challenge.sim_state_at_apply,
                SimState::Stable.as_str()
            ),
        );
    }
}

fn check_consent_ordering(ctx: &AuditContext<'_>, findings: &mut Findings) {
    let Some(challenge) = &ctx.challenge else { return };
    let Some(consent_ts) = challenge.consent_ts.as_deref().and_then(parse_ts) else {
        findings.violation(CONSENT_ORDERING, "consent timestamp missing or unparseable");
        return;
    };
    // Fail closed: without a usable applied timestamp, temporal precedence
    // of consent cannot be proven.
    let Some(applied_ts) = challenge.applied_ts.as_deref().and_then(parse_ts) else {
        findings.violation(CONSENT_ORDERING, "applied timestamp missing or unparseable");
        return;
    };
    if consent_ts > applied_ts {
        findings.violation(
            CONSENT_ORDERING,
            format!("consent at {consent_ts} postdates apply at {applied_ts}"),
        );
    }
}

fn check_prompt_budget(ctx: &AuditContext<'_>, findings: &mut Findings) {
    let Some(challenge) = &ctx.challenge else { return };
    if challenge.prompt_shown
        && challenge.prompt_count_in_session > ctx.config.prompt_warning_ceiling
    {
        findings.warning(
            CONSENT_PROMPT_BUDGET,
            format!(
                "{} offers this session, soft ceiling is {}",
                challenge.prompt_count_in_session, ctx.config.prompt_warning_ceiling
            ),
        );
    }
}

// Staged-message checks.

fn check_third_question_budget(ctx: &AuditContext<'_>, findings: &mut Findings) {
    let Some(text) = third_text(ctx) else { return };
    let questions = textscan::question_count(text);
    if questions > textscan::MAX_QUESTIONS {
        findings.violation(
            THIRD_QUESTION_BUDGET,
            format!(
                "{questions} questions, cap is {}",
                textscan::MAX_QUESTIONS
            ),
        );
    }
}

fn check_third_solution_language(ctx: &AuditContext<'_>, findings: &mut Findings) {
    let Some(text) = third_text(ctx) else { return };
    if let Some(marker) = textscan::find_marker(text, textscan::SOLUTION_MARKERS) {
        findings.violation(
            THIRD_SOLUTION_LANGUAGE,
            format!("solution language {marker:?}"),
        );
    }
}

fn check_third_framework(ctx: &AuditContext<'_>, findings: &mut Findings) {
    let Some(text) = third_text(ctx) else { return };
    if let Some(marker) = textscan::find_marker(text, textscan::FRAMEWORK_MARKERS) {
        findings.violation(
            THIRD_FRAMEWORK_REFERENCE,
            format!("framework reference {marker:?}"),
        );
    }
}

fn check_third_tier_reference(ctx: &AuditContext<'_>, findings: &mut Findings) {
    let Some(text) = third_text(ctx) else { return };
    if let Some(marker) = textscan::find_marker(text, textscan::TIER_MARKERS) {
        findings.violation(THIRD_TIER_REFERENCE, format!("tier reference {marker:?}"));
    }
}

fn check_third_upgrade_language(ctx: &AuditContext<'_>, findings: &mut Findings) {
    let Some(text) = third_text(ctx) else { return };
    if let Some(marker) = textscan::find_marker(text, textscan::UPGRADE_MARKERS) {
        findings.violation(
            THIRD_UPGRADE_LANGUAGE,
            format!("upgrade language {marker:?}"),
        );
    }
}

fn third_text<'a>(ctx: &'a AuditContext<'_>) -> Option<&'a str> {
    ctx.third_message.as_ref().and_then(|m| m.text.as_deref())
}

fn check_fourth_reflection(ctx: &AuditContext<'_>, findings: &mut Findings) {
    let Some(fourth) = &ctx.fourth_message else { return };
    let Some(used) = fourth.reflection_layers_used else { return };
    let ceiling = u32::from(ctx.event.sim_state.max_reflection_layers());
    if used > ceiling {
        findings.violation(
            FOURTH_REFLECTION_CEILING,
            format!(
                "{used} reflection layers, ceiling at severity {} is {ceiling}",
                ctx.event.sim_state
            ),
        );
    }
}

fn check_fourth_abstraction(ctx: &AuditContext<'_>, findings: &mut Findings) {
    let Some(fourth) = &ctx.fourth_message else { return };
    let Some(raw) = fourth.abstraction_level_used.as_deref() else { return };
    let Ok(used) = AbstractionLevel::parse(raw) else { return };
    let ceiling = ctx.event.sim_state.max_abstraction();
    if used > ceiling {
        findings.violation(
            FOURTH_ABSTRACTION_CEILING,
            format!(
                "abstraction {used}, ceiling at severity {} is {ceiling}",
                ctx.event.sim_state
            ),
        );
    }
}

fn check_fourth_analysis(ctx: &AuditContext<'_>, findings: &mut Findings) {
    let Some(fourth) = &ctx.fourth_message else { return };
    if fourth.analysis_ran && !ctx.event.sim_state.analysis_permitted() {
        findings.violation(
            FOURTH_ANALYSIS_LOCKOUT,
            format!("analysis ran at severity {}", ctx.event.sim_state),
        );
    }
}

// Global checks.

fn check_invite_severity(ctx: &AuditContext<'_>, findings: &mut Findings) {
    let at_invite = ctx
        .event
        .sim_state_at_invite
        .unwrap_or(ctx.event.sim_state);
    if matches!(at_invite, SimState::Overloaded | SimState::Protected) {
        findings.violation(
            INVITE_SEVERITY_LOCKOUT,
            format!("invitation shown at severity {at_invite}"),
        );
    }
}

fn check_tier_abstraction(ctx: &AuditContext<'_>, findings: &mut Findings) {
    if ctx.event.abstraction_level > ctx.event.tier.max_abstraction() {
        findings.violation(
            TIER_ABSTRACTION_CAP,
            format!(
                "tier {} reached abstraction {}, cap is {}",
                ctx.event.tier,
                ctx.event.abstraction_level,
                ctx.event.tier.max_abstraction()
            ),
        );
    }
}

fn parse_ts(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
