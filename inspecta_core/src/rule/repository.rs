use async_trait::async_trait;

use super::types::IntentRule;

/// Persistent catalog of intent rules.
///
/// Only the administrative path writes; the dispatcher reads through an
/// in-memory snapshot built from `list_all`.
#[async_trait]
pub trait RuleRepo: Send + Sync {
    async fn list_all(&self) -> anyhow::Result<Vec<IntentRule>>;

    async fn find_by_id(&self, id: i32) -> anyhow::Result<Option<IntentRule>>;

    /// Insert (`id == 0`) or update a rule in a single transaction.
    /// Returns the stored rule id.
    async fn save(&self, rule: &IntentRule) -> anyhow::Result<i32>;

    async fn delete(&self, id: i32) -> anyhow::Result<()>;
}
