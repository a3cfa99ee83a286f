use std::sync::Arc;
use std::time::Duration;

use inspecta_core::{
    BoundQuery, DispatchConfig, DispatchError, IntentRule, QueryResult, RecordStore, RowExclusion,
};
use tracing::{debug, warn};

use super::compiler::{TemplateCompiler, TemplateError};
use crate::extraction::Extraction;

/// Lifecycle of one template execution. Terminal states are never retried.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionState {
    Idle,
    Bound(BoundQuery),
    Executing,
    Succeeded(QueryResult),
    Failed(DispatchError),
}

impl ExecutionState {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Bound(_) => "bound",
            Self::Executing => "executing",
            Self::Succeeded(_) => "succeeded",
            Self::Failed(_) => "failed",
        }
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded(_) | Self::Failed(_))
    }
}

#[derive(Debug, Clone)]
pub struct Execution {
    rule_id: i32,
    exclusions: Vec<RowExclusion>,
    state: ExecutionState,
}

impl Execution {
    #[must_use]
    pub const fn new(rule_id: i32) -> Self {
        Self {
            rule_id,
            exclusions: Vec::new(),
            state: ExecutionState::Idle,
        }
    }

    #[must_use]
    pub const fn rule_id(&self) -> i32 {
        self.rule_id
    }

    #[must_use]
    pub const fn state(&self) -> &ExecutionState {
        &self.state
    }

    fn transition(&mut self, next: ExecutionState) {
        debug!(
            "Rule {} execution: {} -> {}",
            self.rule_id,
            self.state.name(),
            next.name()
        );
        self.state = next;
    }

    fn fail(&mut self, reason: impl Into<String>) {
        self.transition(ExecutionState::Failed(DispatchError::TemplateExecutionError {
            rule_id: self.rule_id,
            reason: reason.into(),
        }));
    }

    /// Rows of a succeeded execution, or the failure that ended it.
    pub fn into_result(self) -> Result<QueryResult, DispatchError> {
        match self.state {
            ExecutionState::Succeeded(result) => Ok(result),
            ExecutionState::Failed(err) => Err(err),
            other => Err(DispatchError::TemplateExecutionError {
                rule_id: self.rule_id,
                reason: format!("execution stopped in state {}", other.name()),
            }),
        }
    }
}

/// Compiles rule templates and runs them against the record store.
pub struct TemplateExecutor {
    store: Arc<dyn RecordStore>,
    compiler: TemplateCompiler,
    row_cap: usize,
    timeout: Duration,
}

impl TemplateExecutor {
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, config: &DispatchConfig) -> Self {
        let row_cap = config.effective_row_cap();
        let compiler = TemplateCompiler::new(store.placeholder_style(), row_cap);
        Self {
            store,
            compiler,
            row_cap,
            timeout: Duration::from_millis(config.execution_timeout_ms),
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Bind extracted values to the rule template: `Idle -> Bound`.
    ///
    /// A placeholder count that differs from the bound value count is a
    /// `MissingParameter` and the template is never executed. With row
    /// exclusions the SQL carries no row cap; the cap is applied after the
    /// excluded rows are dropped.
    pub fn bind(
        &self,
        rule: &IntentRule,
        extraction: Extraction,
    ) -> Result<Execution, DispatchError> {
        let mut execution = Execution::new(rule.id);
        let values = extraction.values.into_iter().map(|p| p.value).collect();
        let compiler = if extraction.exclusions.is_empty() {
            self.compiler
        } else {
            self.compiler.uncapped()
        };

        match compiler.compile(rule.id, &rule.template, values) {
            Ok(query) => {
                execution.exclusions = extraction.exclusions;
                execution.transition(ExecutionState::Bound(query));
                Ok(execution)
            }
            Err(TemplateError::PlaceholderMismatch { expected, bound }) => {
                Err(DispatchError::MissingParameter {
                    rule_id: rule.id,
                    parameter: format!("template expects {expected} values, {bound} bound"),
                })
            }
            Err(e) => Err(DispatchError::TemplateExecutionError {
                rule_id: rule.id,
                reason: e.to_string(),
            }),
        }
    }

    /// Run a bound execution to a terminal state: `Bound -> Executing ->
    /// Succeeded | Failed`. Row exclusions and the row cap are applied before
    /// success.
    pub async fn execute(&self, mut execution: Execution) -> Execution {
        let query = match std::mem::replace(&mut execution.state, ExecutionState::Idle) {
            ExecutionState::Bound(query) => query,
            other => {
                let name = other.name();
                execution.state = other;
                if !execution.state.is_terminal() {
                    execution.fail(format!("cannot execute from state {name}"));
                }
                return execution;
            }
        };

        execution.transition(ExecutionState::Executing);
        debug!("Rule {} SQL: {} {:?}", query.rule_id, query.sql, query.values);

        match tokio::time::timeout(self.timeout, self.store.fetch(&query)).await {
            Ok(Ok(result)) => {
                let fetched = result.row_count;
                let result = result.without(&execution.exclusions);
                if result.row_count < fetched {
                    debug!(
                        "Rule {} exclusions removed {} rows",
                        execution.rule_id,
                        fetched - result.row_count
                    );
                }
                let result = result.capped(self.row_cap);
                execution.transition(ExecutionState::Succeeded(result));
            }
            Ok(Err(e)) => {
                warn!("Rule {} template failed: {e:#}", execution.rule_id);
                execution.fail(format!("{e:#}"));
            }
            Err(_) => {
                warn!(
                    "Rule {} template timed out after {:?}",
                    execution.rule_id, self.timeout
                );
                execution.fail(format!("timed out after {} ms", self.timeout.as_millis()));
            }
        }

        execution
    }

    /// `bind` then `execute`.
    pub async fn run(
        &self,
        rule: &IntentRule,
        extraction: Extraction,
    ) -> Result<QueryResult, DispatchError> {
        let execution = self.bind(rule, extraction)?;
        self.execute(execution).await.into_result()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use async_trait::async_trait;
    use inspecta_core::{BoundParameter, BoundValue, Category, PlaceholderStyle};
    use serde_json::{Map, Value, json};

    use super::*;

    struct FixedStore {
        rows: Vec<Map<String, Value>>,
        delay: Duration,
    }

    #[async_trait]
    impl RecordStore for FixedStore {
        fn placeholder_style(&self) -> PlaceholderStyle {
            PlaceholderStyle::Question
        }

        async fn fetch(&self, _query: &BoundQuery) -> anyhow::Result<QueryResult> {
            tokio::time::sleep(self.delay).await;
            Ok(QueryResult::new(
                vec!["material_name".to_string()],
                self.rows.clone(),
            ))
        }

        async fn family_counts(&self) -> anyhow::Result<BTreeMap<String, i64>> {
            Ok(BTreeMap::new())
        }
    }

    fn row(material: &str) -> Map<String, Value> {
        let mut row = Map::new();
        row.insert("material_name".to_string(), json!(material));
        row
    }

    fn executor(delay: Duration) -> TemplateExecutor {
        let store = FixedStore {
            rows: vec![row("电池"), row("电池盖"), row("电池")],
            delay,
        };
        TemplateExecutor::new(Arc::new(store), &DispatchConfig::default())
    }

    fn rule() -> IntentRule {
        IntentRule::new(
            7,
            "物料库存",
            Category::Inventory,
            "SELECT material_name FROM inventory_records WHERE material_name LIKE ?",
        )
    }

    fn extraction(exclusions: Vec<RowExclusion>) -> Extraction {
        Extraction {
            values: vec![BoundParameter {
                name: "material".to_string(),
                value: BoundValue::Text("电池".to_string()),
            }],
            exclusions,
        }
    }

    fn exclusion_for(substring: &str) -> RowExclusion {
        RowExclusion {
            field: "material_name".to_string(),
            substring: substring.to_string(),
        }
    }

    #[tokio::test]
    async fn exclusions_filter_rows_before_success() {
        let result = executor(Duration::ZERO)
            .run(&rule(), extraction(vec![exclusion_for("电池盖")]))
            .await;
        assert_eq!(result.map(|r| r.row_count), Ok(2));
    }

    #[tokio::test]
    async fn row_cap_applies_after_exclusions() {
        let mut rows = vec![row("电池盖"); 60];
        rows.extend([row("电池"), row("电池")]);
        let store = FixedStore {
            rows,
            delay: Duration::ZERO,
        };
        let executor = TemplateExecutor::new(Arc::new(store), &DispatchConfig::default());

        let bound = executor.bind(&rule(), extraction(vec![exclusion_for("电池盖")]));
        assert!(bound.as_ref().is_ok_and(|e| match e.state() {
            ExecutionState::Bound(query) => !query.sql.contains("LIMIT"),
            _ => false,
        }));

        let result = executor.run(&rule(), extraction(vec![exclusion_for("电池盖")])).await;
        assert_eq!(result.map(|r| r.row_count), Ok(2));
    }

    #[tokio::test]
    async fn row_cap_bounds_rows_without_exclusions() {
        let store = FixedStore {
            rows: vec![row("电池"); 80],
            delay: Duration::ZERO,
        };
        let executor = TemplateExecutor::new(Arc::new(store), &DispatchConfig::default());
        let result = executor.run(&rule(), extraction(Vec::new())).await;
        assert_eq!(
            result.map(|r| r.row_count),
            Ok(DispatchConfig::default().effective_row_cap())
        );
    }

    #[test]
    fn placeholder_mismatch_never_executes() {
        let result = executor(Duration::ZERO)
            .bind(&rule(), Extraction::default())
            .map(|e| e.rule_id());
        assert!(matches!(
            result,
            Err(DispatchError::MissingParameter { rule_id: 7, .. })
        ));
    }

    #[tokio::test]
    async fn timeout_fails_with_rule_id() {
        let executor = executor(Duration::from_secs(5)).with_timeout(Duration::from_millis(20));
        let execution = match executor.bind(&rule(), extraction(Vec::new())) {
            Ok(bound) => executor.execute(bound).await,
            Err(e) => panic!("bind failed: {e}"),
        };
        assert_eq!(execution.state().name(), "failed");
        assert!(matches!(
            execution.into_result(),
            Err(DispatchError::TemplateExecutionError { rule_id: 7, .. })
        ));
    }

    #[tokio::test]
    async fn terminal_state_is_not_rerun() {
        let executor = executor(Duration::ZERO);
        let done = match executor.bind(&rule(), extraction(Vec::new())) {
            Ok(bound) => executor.execute(bound).await,
            Err(e) => panic!("bind failed: {e}"),
        };
        assert_eq!(done.state().name(), "succeeded");

        let again = executor.execute(done).await;
        assert_eq!(again.state().name(), "succeeded");
    }
}
