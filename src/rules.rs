//! User-defined triage rules.
//!
//! A rule pairs a condition list with actions to apply to newly-arrived
//! notifications: mark the thread as read without showing it, and/or keep it
//! visible but skip the native alert. Evaluation lives in [`engine`],
//! persistence in [`store`].

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub mod engine;
pub mod store;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NotificationRule {
    pub id: Uuid,
    pub name: String,
    pub is_enabled: bool,
    /// Lower priorities are evaluated first. Reassigned to list position
    /// whenever the user reorders the list.
    pub priority: i64,
    pub conditions: Vec<RuleCondition>,
    pub logic: LogicOperator,
    pub actions: Vec<RuleAction>,
    pub created_at: DateTime<Utc>,
}

impl NotificationRule {
    /// A fresh enabled rule with no conditions.
    ///
    /// Note that an empty condition list under [`LogicOperator::And`] matches
    /// every notification; callers building rules interactively should add
    /// conditions before enabling the rule.
    pub fn new(name: impl Into<String>, priority: i64) -> NotificationRule {
        NotificationRule {
            id: Uuid::new_v4(),
            name: name.into(),
            is_enabled: true,
            priority,
            conditions: Vec::new(),
            logic: LogicOperator::And,
            actions: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RuleCondition {
    pub field: ConditionField,
    pub operator: ConditionOperator,
    pub value: String,
}

/// Which notification attribute a condition reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionField {
    Repository,
    Organization,
    NotificationType,
    Reason,
}

impl ConditionField {
    /// Fields that carry `*`-bearing user input in practice. [`Matches`]
    /// semantics are applied uniformly regardless; this only informs UIs
    /// which fields to offer wildcard help for.
    ///
    /// [`Matches`]: ConditionOperator::Matches
    pub fn supports_wildcard(&self) -> bool {
        matches!(self, ConditionField::Repository | ConditionField::Organization)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Matches,
}

/// How a rule's conditions combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicOperator {
    /// All conditions must hold. Vacuously true for an empty list.
    And,
    /// At least one condition must hold. Vacuously false for an empty list.
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    MarkAsRead,
    SuppressAlert,
}

/// Outcome of evaluating one notification against the rule set.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleResult {
    pub matched_rule: Option<Uuid>,
    pub mark_as_read: bool,
    pub suppress_alert: bool,
}

impl RuleResult {
    /// Canonical "no rule fired" value.
    pub fn no_match() -> RuleResult {
        RuleResult {
            matched_rule: None,
            mark_as_read: false,
            suppress_alert: false,
        }
    }
}
