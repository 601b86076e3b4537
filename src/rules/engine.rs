//! Stateless first-match rule evaluation.

use crate::github::Notification;
use crate::matcher::wildcard_match;

use super::{
    ConditionField, ConditionOperator, LogicOperator, NotificationRule, RuleAction,
    RuleCondition, RuleResult,
};

/// Filters to enabled rules and stable-sorts ascending by priority.
pub fn prepare(rules: &[NotificationRule]) -> Vec<&NotificationRule> {
    let mut prepared: Vec<&NotificationRule> = rules.iter().filter(|r| r.is_enabled).collect();
    prepared.sort_by_key(|r| r.priority);
    prepared
}

/// Evaluates `notification` against `rules`, preparing them first.
pub fn evaluate(notification: &Notification, rules: &[NotificationRule]) -> RuleResult {
    evaluate_prepared(notification, &prepare(rules))
}

/// Like [`evaluate`] for an already-prepared list (callers that evaluate a
/// whole batch prepare once).
///
/// The first matching rule decides the result alone; every action on that
/// rule applies. Evaluation is total: no input can make it fail.
pub fn evaluate_prepared(
    notification: &Notification,
    prepared: &[&NotificationRule],
) -> RuleResult {
    for rule in prepared {
        if rule_matches(notification, rule) {
            return RuleResult {
                matched_rule: Some(rule.id),
                mark_as_read: rule.actions.contains(&RuleAction::MarkAsRead),
                suppress_alert: rule.actions.contains(&RuleAction::SuppressAlert),
            };
        }
    }
    RuleResult::no_match()
}

fn rule_matches(notification: &Notification, rule: &NotificationRule) -> bool {
    // The empty-condition cases fall out of the Boolean identities: all() of
    // an empty iterator is true, any() is false.
    match rule.logic {
        LogicOperator::And => rule
            .conditions
            .iter()
            .all(|c| condition_matches(notification, c)),
        LogicOperator::Any => rule
            .conditions
            .iter()
            .any(|c| condition_matches(notification, c)),
    }
}

fn condition_matches(notification: &Notification, condition: &RuleCondition) -> bool {
    let field_value = match condition.field {
        ConditionField::Repository => notification.repository.full_name.as_str(),
        ConditionField::Organization => notification.repository.owner.login.as_str(),
        // Raw subject type, not the parsed enum: wildcard rules must be able
        // to target type strings this crate does not recognize.
        ConditionField::NotificationType => notification.subject.kind.as_str(),
        ConditionField::Reason => notification.reason.as_str(),
    };
    match condition.operator {
        ConditionOperator::Equals => field_value.to_lowercase() == condition.value.to_lowercase(),
        ConditionOperator::NotEquals => {
            field_value.to_lowercase() != condition.value.to_lowercase()
        }
        ConditionOperator::Matches => wildcard_match(&condition.value, field_value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::Reason;
    use crate::tests::notification;

    fn condition(field: ConditionField, operator: ConditionOperator, value: &str) -> RuleCondition {
        RuleCondition {
            field,
            operator,
            value: value.to_string(),
        }
    }

    fn rule(name: &str, priority: i64) -> NotificationRule {
        NotificationRule::new(name, priority)
    }

    #[test]
    fn repository_wildcard_rule_marks_as_read() {
        let mut r = rule("mute kubernetes", 0);
        r.conditions = vec![condition(
            ConditionField::Repository,
            ConditionOperator::Matches,
            "kubernetes/*",
        )];
        r.actions = vec![RuleAction::MarkAsRead];

        let n = notification().repo("kubernetes/kubernetes").build();
        let result = evaluate(&n, &[r]);
        assert!(result.matched_rule.is_some());
        assert!(result.mark_as_read);
        assert!(!result.suppress_alert);
    }

    #[test]
    fn lowest_priority_rule_wins_exclusively() {
        let mut suppress = rule("suppress", 10);
        suppress.conditions = vec![condition(
            ConditionField::Organization,
            ConditionOperator::Equals,
            "rust-lang",
        )];
        suppress.actions = vec![RuleAction::SuppressAlert];

        let mut mark = rule("mark", 0);
        mark.conditions = vec![condition(
            ConditionField::Organization,
            ConditionOperator::Equals,
            "rust-lang",
        )];
        mark.actions = vec![RuleAction::MarkAsRead];

        let n = notification().repo("rust-lang/rust").build();
        // Both match; only the priority-0 rule's actions apply.
        let result = evaluate(&n, &[suppress, mark]);
        assert!(result.mark_as_read);
        assert!(!result.suppress_alert);
    }

    #[test]
    fn disabled_rules_are_inert() {
        let mut r = rule("disabled", 0);
        r.is_enabled = false;
        r.conditions = vec![condition(
            ConditionField::Repository,
            ConditionOperator::Matches,
            "*",
        )];
        r.actions = vec![RuleAction::MarkAsRead];

        let n = notification().build();
        assert_eq!(evaluate(&n, &[r]), RuleResult::no_match());
    }

    #[test]
    fn empty_conditions_follow_boolean_identity() {
        let n = notification().build();

        let mut vacuous_and = rule("empty and", 0);
        vacuous_and.logic = LogicOperator::And;
        vacuous_and.actions = vec![RuleAction::SuppressAlert];
        // Empty AND is vacuously true: the rule matches everything.
        assert!(evaluate(&n, &[vacuous_and]).suppress_alert);

        let mut vacuous_any = rule("empty any", 0);
        vacuous_any.logic = LogicOperator::Any;
        vacuous_any.actions = vec![RuleAction::SuppressAlert];
        // Empty ANY is vacuously false: the rule matches nothing.
        assert_eq!(evaluate(&n, &[vacuous_any]), RuleResult::no_match());
    }

    #[test]
    fn and_requires_every_condition() {
        let mut r = rule("and", 0);
        r.logic = LogicOperator::And;
        r.conditions = vec![
            condition(ConditionField::Organization, ConditionOperator::Equals, "rust-lang"),
            condition(ConditionField::Reason, ConditionOperator::Equals, "mention"),
        ];
        r.actions = vec![RuleAction::SuppressAlert];

        let mentioned = notification()
            .repo("rust-lang/rust")
            .reason(Reason::Mention)
            .build();
        assert!(evaluate(&mentioned, std::slice::from_ref(&r)).suppress_alert);

        let subscribed = notification()
            .repo("rust-lang/rust")
            .reason(Reason::Subscribed)
            .build();
        assert_eq!(evaluate(&subscribed, &[r]), RuleResult::no_match());
    }

    #[test]
    fn any_requires_one_condition() {
        let mut r = rule("any", 0);
        r.logic = LogicOperator::Any;
        r.conditions = vec![
            condition(ConditionField::Organization, ConditionOperator::Equals, "tokio-rs"),
            condition(ConditionField::Reason, ConditionOperator::Equals, "mention"),
        ];
        r.actions = vec![RuleAction::MarkAsRead];

        let n = notification()
            .repo("rust-lang/rust")
            .reason(Reason::Mention)
            .build();
        assert!(evaluate(&n, &[r]).mark_as_read);
    }

    #[test]
    fn equality_is_case_insensitive() {
        let mut r = rule("case", 0);
        r.conditions = vec![condition(
            ConditionField::Repository,
            ConditionOperator::Equals,
            "Rust-Lang/Rust",
        )];
        r.actions = vec![RuleAction::MarkAsRead];

        let n = notification().repo("rust-lang/rust").build();
        assert!(evaluate(&n, &[r]).mark_as_read);
    }

    #[test]
    fn not_equals_inverts() {
        let mut r = rule("not", 0);
        r.conditions = vec![condition(
            ConditionField::Reason,
            ConditionOperator::NotEquals,
            "ci_activity",
        )];
        r.actions = vec![RuleAction::SuppressAlert];

        let mention = notification().reason(Reason::Mention).build();
        assert!(evaluate(&mention, std::slice::from_ref(&r)).suppress_alert);

        let ci = notification().reason(Reason::CiActivity).build();
        assert_eq!(evaluate(&ci, &[r]), RuleResult::no_match());
    }

    #[test]
    fn rules_can_target_unrecognized_subject_types() {
        let mut r = rule("future type", 0);
        r.conditions = vec![condition(
            ConditionField::NotificationType,
            ConditionOperator::Matches,
            "Workflow*",
        )];
        r.actions = vec![RuleAction::SuppressAlert];

        // "WorkflowRun" parses to NotificationType::Unknown, but the raw
        // string is still what conditions see.
        let n = notification().kind("WorkflowRun").build();
        assert!(evaluate(&n, &[r]).suppress_alert);
    }

    #[test]
    fn prepared_variant_matches_unprepared() {
        let mut a = rule("a", 5);
        a.conditions = vec![condition(
            ConditionField::Organization,
            ConditionOperator::Matches,
            "rust-*",
        )];
        a.actions = vec![RuleAction::SuppressAlert];
        let mut b = rule("b", 1);
        b.is_enabled = false;
        b.actions = vec![RuleAction::MarkAsRead];

        let rules = vec![a, b];
        let n = notification().repo("rust-lang/rust").build();
        let prepared = prepare(&rules);
        assert_eq!(evaluate_prepared(&n, &prepared), evaluate(&n, &rules));
    }
}
