#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use inspecta_core::{
    BoundQuery, DispatchConfig, EscalationProvider, PlaceholderStyle, QueryResult, RecordStore,
};
use inspecta_engine::{DatabaseRuleRepository, Dispatcher, RuleStore, SqlRecordStore, seed};
use sea_orm::DatabaseConnection;

pub struct TestEnv {
    pub db: DatabaseConnection,
    pub rules: Arc<RuleStore>,
    pub records: Arc<SqlRecordStore>,
}

impl TestEnv {
    /// Fresh in-memory database with schema and sample records, no rules.
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    pub async fn empty() -> Self {
        let db = inspecta_engine::connect("sqlite::memory:")
            .await
            .expect("in-memory database should open");
        seed::seed_records(&db)
            .await
            .expect("sample records should insert");
        let repo = Arc::new(DatabaseRuleRepository::new(db.clone()));
        let rules = Arc::new(RuleStore::load(repo).await.expect("rule store should load"));
        let records = Arc::new(SqlRecordStore::new(db.clone()));
        Self { db, rules, records }
    }

    /// Fresh database with the demo rule library.
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    pub async fn with_demo_rules() -> Self {
        let env = Self::empty().await;
        seed::seed_rules(&env.rules)
            .await
            .expect("demo rules should save");
        env
    }

    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher_with(DispatchConfig::default())
    }

    pub fn dispatcher_with(&self, config: DispatchConfig) -> Dispatcher {
        Dispatcher::new(
            Arc::clone(&self.rules),
            Arc::clone(&self.records) as Arc<dyn RecordStore>,
            config,
        )
    }
}

/// Escalation double that counts calls and remembers the last context.
#[derive(Default)]
pub struct RecordingEscalation {
    pub calls: AtomicUsize,
    pub last_context: Mutex<Option<serde_json::Value>>,
    pub fail: bool,
}

impl RecordingEscalation {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_context(&self) -> Option<serde_json::Value> {
        self.last_context.lock().ok().and_then(|c| c.clone())
    }
}

#[async_trait]
impl EscalationProvider for RecordingEscalation {
    async fn generate(&self, prompt: &str, context: &serde_json::Value) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_context.lock() {
            *last = Some(context.clone());
        }
        if self.fail {
            anyhow::bail!("401 Unauthorized");
        }
        Ok(format!("escalated: {prompt}"))
    }
}

/// Escalation double that counts calls and never answers in time.
#[derive(Default)]
pub struct SlowEscalation {
    pub calls: AtomicUsize,
}

impl SlowEscalation {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EscalationProvider for SlowEscalation {
    async fn generate(&self, prompt: &str, _context: &serde_json::Value) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(format!("late: {prompt}"))
    }
}

/// Record store that never answers in time.
pub struct SlowStore;

#[async_trait]
impl RecordStore for SlowStore {
    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Question
    }

    async fn fetch(&self, _query: &BoundQuery) -> anyhow::Result<QueryResult> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(QueryResult::default())
    }

    async fn family_counts(&self) -> anyhow::Result<BTreeMap<String, i64>> {
        Ok(BTreeMap::new())
    }
}
