//! Backing relational store seen through compiled templates only.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::dispatch::{BoundValue, QueryResult};

/// Positional placeholder dialect of the backing database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceholderStyle {
    /// `?` (SQLite, MySQL)
    #[default]
    Question,
    /// `$1`, `$2`, ... (PostgreSQL)
    Numbered,
}

/// A compiled template with its positional values, ready to execute.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundQuery {
    pub rule_id: i32,
    pub sql: String,
    pub values: Vec<BoundValue>,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    fn placeholder_style(&self) -> PlaceholderStyle;

    /// Execute a bound query. Values are passed as data, never spliced into SQL.
    async fn fetch(&self, query: &BoundQuery) -> anyhow::Result<QueryResult>;

    /// Row count per record family, for escalation context.
    async fn family_counts(&self) -> anyhow::Result<BTreeMap<String, i64>>;
}
