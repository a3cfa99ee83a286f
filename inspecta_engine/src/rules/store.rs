use std::sync::Arc;

use inspecta_core::{IntentRule, RuleRepo};
use tokio::sync::Mutex;
use tracing::info;

use super::snapshot::{RuleCache, RuleSnapshot, validate_rule};

/// Rule catalog plus the snapshot the dispatcher reads.
///
/// Administrative writes are serialized: each commits through the
/// repository, then rebuilds and swaps the whole snapshot.
pub struct RuleStore {
    repo: Arc<dyn RuleRepo>,
    cache: RuleCache,
    admin: Mutex<()>,
}

impl RuleStore {
    /// Load the catalog and build the first snapshot.
    pub async fn load(repo: Arc<dyn RuleRepo>) -> anyhow::Result<Self> {
        let rules = repo.list_all().await?;
        Ok(Self {
            repo,
            cache: RuleCache::new(rules),
            admin: Mutex::new(()),
        })
    }

    #[must_use]
    pub fn snapshot(&self) -> Arc<RuleSnapshot> {
        self.cache.snapshot()
    }

    /// Every stored rule, inactive and invalid ones included.
    pub async fn list_rules(&self) -> anyhow::Result<Vec<IntentRule>> {
        self.repo.list_all().await
    }

    /// Rebuild the snapshot from storage. Returns the new version.
    pub async fn reload(&self) -> anyhow::Result<u64> {
        let _guard = self.admin.lock().await;
        self.rebuild().await
    }

    /// Insert or update a rule, then swap in a fresh snapshot.
    /// Returns the stored rule id and the new snapshot version.
    pub async fn save_rule(&self, rule: &IntentRule) -> anyhow::Result<(i32, u64)> {
        validate_rule(rule).map_err(|reason| anyhow::anyhow!("Rule {}: {reason}", rule.name))?;

        let _guard = self.admin.lock().await;
        let id = self.repo.save(rule).await?;
        let version = self.rebuild().await?;
        info!("Saved rule {id}, snapshot now v{version}");
        Ok((id, version))
    }

    pub async fn delete_rule(&self, id: i32) -> anyhow::Result<u64> {
        let _guard = self.admin.lock().await;
        self.repo.delete(id).await?;
        let version = self.rebuild().await?;
        info!("Deleted rule {id}, snapshot now v{version}");
        Ok(version)
    }

    async fn rebuild(&self) -> anyhow::Result<u64> {
        let rules = self.repo.list_all().await?;
        Ok(self.cache.replace(rules))
    }
}
