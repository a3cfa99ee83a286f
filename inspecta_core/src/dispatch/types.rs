use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::DispatchError;
use crate::rule::Category;

/// A value bound to one positional template placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BoundValue {
    Text(String),
    Number(f64),
    Null,
}

impl std::fmt::Display for BoundValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Null => f.write_str("NULL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundParameter {
    pub name: String,
    pub value: BoundValue,
}

/// Rows whose `field` contains `substring` must not be returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowExclusion {
    pub field: String,
    pub substring: String,
}

impl RowExclusion {
    #[must_use]
    pub fn excludes(&self, row: &Map<String, Value>) -> bool {
        field_text(row, &self.field).is_some_and(|text| text.contains(&self.substring))
    }
}

/// Render a row field as text for comparisons and display.
#[must_use]
pub fn field_text(row: &Map<String, Value>, field: &str) -> Option<String> {
    match row.get(field)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Rows returned by a succeeded template execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub fields: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
    pub row_count: usize,
}

impl QueryResult {
    #[must_use]
    pub fn new(fields: Vec<String>, rows: Vec<Map<String, Value>>) -> Self {
        let row_count = rows.len();
        Self {
            fields,
            rows,
            row_count,
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Drop rows matched by any exclusion, keeping order.
    #[must_use]
    pub fn without(mut self, exclusions: &[RowExclusion]) -> Self {
        if exclusions.is_empty() {
            return self;
        }
        self.rows
            .retain(|row| !exclusions.iter().any(|ex| ex.excludes(row)));
        self.row_count = self.rows.len();
        self
    }

    /// Keep at most `cap` rows.
    #[must_use]
    pub fn capped(mut self, cap: usize) -> Self {
        self.rows.truncate(cap);
        self.row_count = self.rows.len();
        self
    }
}

/// Tabular view: field list plus rows truncated to the display cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TablePayload {
    pub fields: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
    pub total_rows: usize,
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardEntry {
    pub label: String,
    pub count: usize,
}

/// Aggregate count card, e.g. rows per supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryCard {
    pub title: String,
    pub entries: Vec<CardEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    RuleEngine,
    Escalated,
}

/// A query answered by an intent rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleAnswer {
    pub rule_id: i32,
    pub rule_name: String,
    pub category: Category,
    pub score: u32,
    pub matched_keywords: Vec<String>,
    pub parameters: Vec<BoundParameter>,
    pub table: TablePayload,
    pub cards: Vec<SummaryCard>,
    pub narrative: String,
}

/// A free-text answer from the escalation collaborator, passed through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalatedAnswer {
    pub answer: String,
    pub source: Provenance,
}

impl EscalatedAnswer {
    #[must_use]
    pub const fn new(answer: String) -> Self {
        Self {
            answer,
            source: Provenance::Escalated,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchResult {
    Answered(RuleAnswer),
    Escalated(EscalatedAnswer),
    Failed(DispatchError),
}

impl DispatchResult {
    #[must_use]
    pub const fn source(&self) -> Option<Provenance> {
        match self {
            Self::Answered(_) => Some(Provenance::RuleEngine),
            Self::Escalated(answer) => Some(answer.source),
            Self::Failed(_) => None,
        }
    }

    #[must_use]
    pub const fn is_escalated(&self) -> bool {
        matches!(self, Self::Escalated(_))
    }

    #[must_use]
    pub const fn answer(&self) -> Option<&RuleAnswer> {
        match self {
            Self::Answered(answer) => Some(answer),
            Self::Escalated(_) | Self::Failed(_) => None,
        }
    }

    #[must_use]
    pub const fn error(&self) -> Option<&DispatchError> {
        match self {
            Self::Failed(err) => Some(err),
            Self::Answered(_) | Self::Escalated(_) => None,
        }
    }

    /// JSON form for machine consumers.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Answered(answer) => serde_json::json!({
                "type": "answered",
                "source": Provenance::RuleEngine,
                "answer": answer,
            }),
            Self::Escalated(answer) => serde_json::json!({
                "type": "escalated",
                "source": answer.source,
                "answer": answer.answer,
            }),
            Self::Failed(err) => serde_json::json!({
                "type": "error",
                "rule_id": err.rule_id(),
                "message": err.to_string(),
            }),
        }
    }
}
