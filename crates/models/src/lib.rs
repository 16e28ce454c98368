use chrono::{DateTime, Utc};
use labels::LabelSet;
use std::collections::BTreeMap;

/// Reasons attached to a state by the evaluation engine, for states that
/// were not produced by an ordinary evaluation outcome.
pub mod reason {
    /// The series disappeared from evaluation results and was swept to
    /// Normal by stale-series cleanup.
    pub const MISSING_SERIES: &str = "MissingSeries";
    pub const PAUSED: &str = "Paused";
    pub const UPDATED: &str = "Updated";
    pub const RULE_DELETED: &str = "RuleDeleted";
}

/// The evaluation state of one alert rule instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum EvalState {
    Normal,
    Pending,
    Alerting,
    NoData,
    Error,
}

impl EvalState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvalState::Normal => "Normal",
            EvalState::Pending => "Pending",
            EvalState::Alerting => "Alerting",
            EvalState::NoData => "NoData",
            EvalState::Error => "Error",
        }
    }
}

impl std::fmt::Display for EvalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Render a state and its optional reason the way history entries record
/// them: `Alerting`, or `Normal (MissingSeries)`.
pub fn format_state_and_reason(state: EvalState, reason: Option<&str>) -> String {
    match reason {
        Some(reason) if !reason.is_empty() => format!("{state} ({reason})"),
        _ => state.to_string(),
    }
}

/// One transition of a rule instance's evaluation state. Produced by the
/// evaluation engine; consumers read it and never mutate it.
#[derive(Debug, Clone, PartialEq)]
pub struct StateTransition {
    pub state: EvalState,
    pub state_reason: Option<String>,
    pub previous_state: EvalState,
    pub previous_state_reason: Option<String>,
    /// The instance's full label set, user-defined and internal labels mixed.
    pub labels: LabelSet,
    /// Values sampled from the evaluation, keyed by ref ID.
    pub values: BTreeMap<String, f64>,
    /// The error message of a failed evaluation, when one was attached.
    pub error: Option<String>,
    pub last_evaluation_time: DateTime<Utc>,
}

impl StateTransition {
    /// Whether this transition represents an actual change of state or
    /// reason, as opposed to a re-evaluation landing in the same place.
    pub fn changed(&self) -> bool {
        self.previous_state != self.state || self.previous_state_reason != self.state_reason
    }

    pub fn formatted(&self) -> String {
        format_state_and_reason(self.state, self.state_reason.as_deref())
    }

    pub fn previous_formatted(&self) -> String {
        format_state_and_reason(self.previous_state, self.previous_state_reason.as_deref())
    }
}

/// Identity of the rule that produced a batch of transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMeta {
    pub org_id: i64,
    pub uid: String,
    pub group: String,
    pub namespace_uid: String,
}

/// A query over recorded state history.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct HistoryQuery {
    pub org_id: i64,
    pub rule_uid: String,
    /// Restrict results to streams carrying these labels.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

/// A columnar table of history results. Rows are parallel across the three
/// column vectors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryFrame {
    pub name: String,
    pub times: Vec<DateTime<Utc>>,
    pub labels: Vec<LabelSet>,
    pub lines: Vec<String>,
}

impl HistoryFrame {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}
