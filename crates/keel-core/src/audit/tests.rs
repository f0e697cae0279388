//! Rule-engine tests: one module per rule group, plus aggregation checks.

use serde_json::{json, Value};

use super::rules;
use super::{AuditConfig, Auditor};
use crate::event::TelemetryEvent;
use crate::types::{AbstractionLevel, SimState, Tier, CHALLENGE_RESPONSE_TAG};

/// Escalated-style text that satisfies every style rule.
const CLEAN_STYLE_TEXT: &str = "You said you wanted momentum. This week shows none of it.\n\n\
                                Say the word and we can drop this.";

fn auditor() -> Auditor {
    Auditor::new(AuditConfig {
        prompt_warning_ceiling: 2,
    })
}

fn base_event() -> TelemetryEvent {
    TelemetryEvent::new("session-1", Tier::Standard, "model-a")
}

fn with_section(mut event: TelemetryEvent, key: &str, section: Value) -> TelemetryEvent {
    event.state_snapshot.insert(key.to_string(), section);
    event
}

fn clean_style_section() -> Value {
    json!({
        "active": true,
        "pressure": 2,
        "exit_available": true,
        "text": CLEAN_STYLE_TEXT,
    })
}

fn clean_challenge_section() -> Value {
    json!({
        "iba_active": true,
        "user_choice": "challenge_on",
        "scope": "single_turn",
        "sim_state_at_apply": "stable",
        "consent_ts": "2025-06-01T12:00:00Z",
        "applied_ts": "2025-06-01T12:00:01Z",
        "prompt_shown": false,
        "prompt_count_in_session": 1,
    })
}

fn rule_ids(violations: &[crate::audit::Violation]) -> Vec<&str> {
    violations.iter().map(|v| v.rule_id.as_str()).collect()
}

#[test]
fn test_rule_ids_are_unique() {
    let mut ids: Vec<&str> = rules::RULES.iter().map(|r| r.id).collect();
    let total = ids.len();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), total, "duplicate rule id in RULES");
}

#[test]
fn test_empty_event_is_ok() {
    let report = auditor().validate(&base_event());
    assert!(report.ok);
    assert!(report.violations.is_empty());
    assert!(report.warnings.is_empty());
}

mod style {
    use super::*;

    fn style_event(section: Value) -> TelemetryEvent {
        let mut event = base_event();
        event.response_tags.insert(CHALLENGE_RESPONSE_TAG.to_string());
        with_section(event, "iba_style", section)
    }

    #[test]
    fn test_compliant_style_passes() {
        let report = auditor().validate(&style_event(clean_style_section()));
        assert!(report.ok, "violations: {:?}", report.violations);
    }

    #[test]
    fn test_inactive_style_skips_group() {
        let mut section = clean_style_section();
        section["active"] = json!(false);
        section["pressure"] = json!(99);
        let report = auditor().validate(&style_event(section));
        assert!(report.ok);
    }

    #[test]
    fn test_style_outside_stable_violates() {
        let mut event = style_event(clean_style_section());
        event.sim_state = SimState::Strained;
        let report = auditor().validate(&event);
        assert!(!report.ok);
        assert!(rule_ids(&report.violations).contains(&rules::STYLE_STABLE_REQUIRED));
    }

    #[test]
    fn test_missing_marker_tag_violates() {
        let mut event = style_event(clean_style_section());
        event.response_tags.clear();
        let report = auditor().validate(&event);
        assert!(rule_ids(&report.violations).contains(&rules::STYLE_MARKER_TAG));
    }

    #[test]
    fn test_pressure_out_of_range_violates() {
        for pressure in [json!(0), json!(4), json!(-1), Value::Null] {
            let mut section = clean_style_section();
            section["pressure"] = pressure.clone();
            let report = auditor().validate(&style_event(section));
            assert!(
                rule_ids(&report.violations).contains(&rules::STYLE_PRESSURE_RANGE),
                "pressure {pressure:?} must violate"
            );
        }
    }

    #[test]
    fn test_missing_exit_flag_violates() {
        let mut section = clean_style_section();
        section["exit_available"] = json!(false);
        let report = auditor().validate(&style_event(section));
        assert!(rule_ids(&report.violations).contains(&rules::STYLE_EXIT_FLAG));
    }

    #[test]
    fn test_dense_paragraph_violates() {
        let mut section = clean_style_section();
        section["text"] = json!(
            "One. Two. Three. Four.\n\nSay the word and we can drop this."
        );
        let report = auditor().validate(&style_event(section));
        assert!(rule_ids(&report.violations).contains(&rules::STYLE_PARAGRAPH_DENSITY));
    }

    #[test]
    fn test_question_budget_violates() {
        let mut section = clean_style_section();
        section["text"] = json!(
            "What stopped you? What will stop you next week?\n\nSay the word and we can drop this."
        );
        let report = auditor().validate(&style_event(section));
        assert!(rule_ids(&report.violations).contains(&rules::STYLE_QUESTION_BUDGET));
    }

    #[test]
    fn test_rhetorical_opener_violates() {
        let mut section = clean_style_section();
        section["text"] = json!(
            "Don't you think this pattern is familiar?\n\nSay the word and we can drop this."
        );
        let report = auditor().validate(&style_event(section));
        assert!(rule_ids(&report.violations).contains(&rules::STYLE_RHETORICAL_QUESTION));
    }

    #[test]
    fn test_forbidden_phrase_violates() {
        let mut section = clean_style_section();
        section["text"] = json!(
            "You always find a reason to wait.\n\nSay the word and we can drop this."
        );
        let report = auditor().validate(&style_event(section));
        assert!(rule_ids(&report.violations).contains(&rules::STYLE_FORBIDDEN_PHRASE));
    }

    #[test]
    fn test_emoji_violates() {
        let mut section = clean_style_section();
        section["text"] = json!(
            "This week shows none of it \u{1F600}.\n\nSay the word and we can drop this."
        );
        let report = auditor().validate(&style_event(section));
        assert!(rule_ids(&report.violations).contains(&rules::STYLE_EMOJI));
    }

    #[test]
    fn test_missing_exit_line_violates() {
        let mut section = clean_style_section();
        section["text"] = json!("You said you wanted momentum. This week shows none of it.");
        let report = auditor().validate(&style_event(section));
        assert!(rule_ids(&report.violations).contains(&rules::STYLE_EXIT_LINE));
    }
}

mod consent {
    use super::*;

    fn challenge_event(section: Value) -> TelemetryEvent {
        with_section(base_event(), "challenge", section)
    }

    #[test]
    fn test_valid_consent_passes() {
        let report = auditor().validate(&challenge_event(clean_challenge_section()));
        assert!(report.ok, "violations: {:?}", report.violations);
    }

    #[test]
    fn test_applied_outside_stable_violates_regardless_of_consent() {
        let mut event = challenge_event(clean_challenge_section());
        event.sim_state = SimState::Overloaded;
        let report = auditor().validate(&event);
        assert!(!report.ok);
        assert!(rule_ids(&report.violations).contains(&rules::CONSENT_SEVERITY));
    }

    #[test]
    fn test_wrong_choice_violates() {
        let mut section = clean_challenge_section();
        section["user_choice"] = json!("challenge_off");
        let report = auditor().validate(&challenge_event(section));
        assert!(rule_ids(&report.violations).contains(&rules::CONSENT_CHOICE));
    }

    #[test]
    fn test_wrong_scope_violates() {
        let mut section = clean_challenge_section();
        section["scope"] = json!("session");
        let report = auditor().validate(&challenge_event(section));
        assert!(rule_ids(&report.violations).contains(&rules::CONSENT_SCOPE));
    }

    #[test]
    fn test_wrong_apply_state_violates() {
        let mut section = clean_challenge_section();
        section["sim_state_at_apply"] = json!("strained");
        let report = auditor().validate(&challenge_event(section));
        assert!(rule_ids(&report.violations).contains(&rules::CONSENT_APPLY_STATE));
    }

    #[test]
    fn test_consent_after_apply_violates() {
        let mut section = clean_challenge_section();
        section["consent_ts"] = json!("2025-06-01T12:00:05Z");
        section["applied_ts"] = json!("2025-06-01T12:00:01Z");
        let report = auditor().validate(&challenge_event(section));
        assert!(rule_ids(&report.violations).contains(&rules::CONSENT_ORDERING));
    }

    #[test]
    fn test_unparseable_timestamps_violate() {
        for field in ["consent_ts", "applied_ts"] {
            let mut section = clean_challenge_section();
            section[field] = json!("yesterday-ish");
            let report = auditor().validate(&challenge_event(section));
            assert!(
                rule_ids(&report.violations).contains(&rules::CONSENT_ORDERING),
                "{field} must fail closed"
            );
        }
    }

    #[test]
    fn test_inactive_challenge_skips_consent_rules() {
        let section = json!({
            "iba_active": false,
            "user_choice": "challenge_off",
            "scope": "none",
        });
        let report = auditor().validate(&challenge_event(section));
        assert!(report.ok);
    }

    #[test]
    fn test_prompt_budget_overrun_is_warning_not_violation() {
        let section = json!({
            "iba_active": false,
            "prompt_shown": true,
            "prompt_count_in_session": 3,
        });
        let report = auditor().validate(&challenge_event(section));
        assert!(report.ok);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].rule_id, rules::CONSENT_PROMPT_BUDGET);
    }

    #[test]
    fn test_prompt_budget_within_ceiling_is_silent() {
        let section = json!({
            "iba_active": false,
            "prompt_shown": true,
            "prompt_count_in_session": 2,
        });
        let report = auditor().validate(&challenge_event(section));
        assert!(report.ok);
        assert!(report.warnings.is_empty());
    }
}

mod staged_messages {
    use super::*;

    #[test]
    fn test_clean_third_message_passes() {
        let event = with_section(
            base_event(),
            "third_message",
            json!({ "text": "It sounds like the same wall as last week. What makes this time feel different?" }),
        );
        let report = auditor().validate(&event);
        assert!(report.ok, "violations: {:?}", report.violations);
    }

    #[test]
    fn test_third_message_text_rules() {
        let cases = [
            ("First question? Second question?", rules::THIRD_QUESTION_BUDGET),
            ("You should set a timer for this.", rules::THIRD_SOLUTION_LANGUAGE),
            ("This is classic CBT territory.", rules::THIRD_FRAMEWORK_REFERENCE),
            ("Your plan does not include this.", rules::THIRD_TIER_REFERENCE),
            ("Upgrade to get deeper sessions.", rules::THIRD_UPGRADE_LANGUAGE),
        ];
        for (text, expected_rule) in cases {
            let event = with_section(base_event(), "third_message", json!({ "text": text }));
            let report = auditor().validate(&event);
            assert!(
                rule_ids(&report.violations).contains(&expected_rule),
                "text {text:?} must violate {expected_rule}"
            );
        }
    }

    #[test]
    fn test_fourth_message_reflection_ceiling() {
        let mut event = with_section(
            base_event(),
            "fourth_message",
            json!({ "reflection_layers_used": 3, "analysis_ran": true }),
        );
        event.sim_state = SimState::Strained;
        let report = auditor().validate(&event);
        assert!(rule_ids(&report.violations).contains(&rules::FOURTH_REFLECTION_CEILING));
    }

    #[test]
    fn test_fourth_message_abstraction_ceiling() {
        let mut event = with_section(
            base_event(),
            "fourth_message",
            json!({ "abstraction_level_used": "structural" }),
        );
        event.sim_state = SimState::Strained;
        let report = auditor().validate(&event);
        assert!(rule_ids(&report.violations).contains(&rules::FOURTH_ABSTRACTION_CEILING));
    }

    #[test]
    fn test_fourth_message_analysis_lockout() {
        for sim_state in [SimState::Overloaded, SimState::Protected] {
            let mut event = with_section(
                base_event(),
                "fourth_message",
                json!({ "reflection_layers_used": 0, "analysis_ran": true }),
            );
            event.sim_state = sim_state;
            let report = auditor().validate(&event);
            assert!(
                rule_ids(&report.violations).contains(&rules::FOURTH_ANALYSIS_LOCKOUT),
                "analysis at {sim_state} must violate"
            );
        }
    }

    #[test]
    fn test_fourth_message_within_ceilings_passes() {
        let event = with_section(
            base_event(),
            "fourth_message",
            json!({
                "reflection_layers_used": 3,
                "abstraction_level_used": "structural",
                "analysis_ran": true,
            }),
        );
        let report = auditor().validate(&event);
        assert!(report.ok, "violations: {:?}", report.violations);
    }
}

mod global_rules {
    use super::*;

    #[test]
    fn test_invitation_at_restricted_severity_violates() {
        for at_invite in [SimState::Overloaded, SimState::Protected] {
            let mut event = base_event();
            event.invitation_shown = true;
            event.sim_state_at_invite = Some(at_invite);
            let report = auditor().validate(&event);
            assert!(
                rule_ids(&report.violations).contains(&rules::INVITE_SEVERITY_LOCKOUT),
                "invite at {at_invite} must violate"
            );
        }
    }

    #[test]
    fn test_invitation_at_stable_passes() {
        let mut event = base_event();
        event.invitation_shown = true;
        event.sim_state_at_invite = Some(SimState::Stable);
        assert!(auditor().validate(&event).ok);
    }

    #[test]
    fn test_invitation_falls_back_to_event_severity() {
        let mut event = base_event();
        event.invitation_shown = true;
        event.sim_state = SimState::Protected;
        let report = auditor().validate(&event);
        assert!(rule_ids(&report.violations).contains(&rules::INVITE_SEVERITY_LOCKOUT));
    }

    #[test]
    fn test_lowest_tier_never_reaches_highest_abstraction() {
        let mut event = base_event();
        event.tier = Tier::Free;
        event.abstraction_level = AbstractionLevel::Structural;
        let report = auditor().validate(&event);
        assert!(!report.ok);
        assert!(rule_ids(&report.violations).contains(&rules::TIER_ABSTRACTION_CAP));
    }

    #[test]
    fn test_tier_cap_allows_permitted_levels() {
        let mut event = base_event();
        event.tier = Tier::Free;
        event.abstraction_level = AbstractionLevel::Thematic;
        assert!(auditor().validate(&event).ok);

        let mut event = base_event();
        event.tier = Tier::Premium;
        event.abstraction_level = AbstractionLevel::Structural;
        assert!(auditor().validate(&event).ok);
    }
}

mod robustness {
    use super::*;

    #[test]
    fn test_malformed_sections_skip_their_group() {
        let mut event = base_event();
        for (key, bad) in [
            ("iba_style", json!("not an object")),
            ("challenge", json!(42)),
            ("third_message", json!(["list"])),
            ("fourth_message", json!({ "reflection_layers_used": "three" })),
        ] {
            event.state_snapshot.insert(key.to_string(), bad);
        }
        let report = auditor().validate(&event);
        assert!(report.ok, "violations: {:?}", report.violations);
    }

    #[test]
    fn test_unknown_sections_are_ignored() {
        let event = with_section(base_event(), "future_section", json!({ "anything": true }));
        assert!(auditor().validate(&event).ok);
    }

    #[test]
    fn test_multiple_groups_aggregate() {
        let mut event = with_section(base_event(), "challenge", clean_challenge_section());
        event.sim_state = SimState::Protected;
        event.invitation_shown = true;
        event.tier = Tier::Free;
        event.abstraction_level = AbstractionLevel::Structural;

        let report = auditor().validate(&event);
        let ids = rule_ids(&report.violations);
        assert!(ids.contains(&rules::CONSENT_SEVERITY));
        assert!(ids.contains(&rules::INVITE_SEVERITY_LOCKOUT));
        assert!(ids.contains(&rules::TIER_ABSTRACTION_CAP));
        assert!(!report.ok);
    }
}
