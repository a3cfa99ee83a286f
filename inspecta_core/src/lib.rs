#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod dispatch;
pub mod rule;
pub mod store;

pub use dispatch::{
    BoundParameter, BoundValue, DispatchConfig, DispatchError, DispatchResult, EscalatedAnswer,
    Provenance, QueryResult, RowExclusion, RuleAnswer, SummaryCard, TablePayload,
};
pub use rule::{
    Category, Exclusion, IntentRule, ParameterKind, ParameterSpec, RuleRepo, RuleStatus,
    ValueType,
};
pub use store::{BoundQuery, PlaceholderStyle, RecordStore};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct LLMResponse {
    pub content: String,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn chat(&self, messages: &[ChatMessage], model: &str) -> anyhow::Result<LLMResponse>;
    fn get_default_model(&self) -> &str;
}

/// Generative collaborator consulted when no intent rule answers a query.
///
/// Implementations must surface network and auth failures as errors; the
/// dispatcher maps them to [`DispatchError::EscalationUnavailable`].
#[async_trait]
pub trait EscalationProvider: Send + Sync {
    async fn generate(&self, prompt: &str, context: &serde_json::Value) -> anyhow::Result<String>;
}

/// Aggregate context handed to the escalation collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextSnapshot {
    /// Row count per record family.
    pub family_counts: BTreeMap<String, i64>,
    /// Most recent queries of the calling session, oldest first.
    pub recent_queries: Vec<String>,
}
