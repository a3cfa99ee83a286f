//! Static strategy pattern for CLI commands.
//!
//! Each command is a separate strategy type with its own input, dispatched
//! statically from `main`.

use std::sync::Arc;

use inspecta_config::Config;
use inspecta_core::{EscalationProvider, RecordStore};
use inspecta_engine::{DatabaseRuleRepository, Dispatcher, LlmEscalation, RuleStore, SqlRecordStore};
use inspecta_providers::ZhipuProvider;
use sea_orm::DatabaseConnection;
use tracing::info;

mod info;
mod init;
mod query;
mod rules;
mod seed;
mod version;

pub use info::InfoStrategy;
pub use init::InitStrategy;
pub use query::{QueryInput, QueryStrategy};
pub use rules::{RulesInput, RulesStrategy};
pub use seed::SeedStrategy;
pub use version::VersionStrategy;

/// Contract for all command strategies.
pub trait CommandStrategy: Send + Sync + 'static {
    /// The input type this strategy accepts.
    type Input;

    /// Execute the command with the given input.
    ///
    /// # Errors
    /// Returns an error if command execution fails.
    async fn execute(&self, input: Self::Input) -> anyhow::Result<()>;
}

/// Components shared by commands that touch the database.
struct Runtime {
    config: Config,
    db: DatabaseConnection,
    rules: Arc<RuleStore>,
}

impl Runtime {
    /// Load config (defaults when absent), connect, and build the rule snapshot.
    async fn open() -> anyhow::Result<Self> {
        let config = Config::load_or_default()?;
        let db = inspecta_engine::connect(&config.database.url).await?;
        let repo = Arc::new(DatabaseRuleRepository::new(db.clone()));
        let rules = Arc::new(RuleStore::load(repo).await?);
        info!(
            "Loaded {} active rules (snapshot v{})",
            rules.snapshot().len(),
            rules.snapshot().version
        );
        Ok(Self { config, db, rules })
    }

    fn escalation(&self) -> Option<Arc<dyn EscalationProvider>> {
        let zhipu = &self.config.providers.zhipu;
        if !zhipu.is_configured() {
            info!("No Zhipu API key configured, escalation disabled");
            return None;
        }
        let provider = ZhipuProvider::new(zhipu.api_key.clone())
            .with_temperature(self.config.escalation.temperature);
        let escalation = LlmEscalation::new(provider, self.config.escalation.model.clone());
        info!("Escalation enabled with model {}", escalation.model());
        Some(Arc::new(escalation))
    }

    fn dispatcher(&self) -> Dispatcher {
        let store: Arc<dyn RecordStore> = Arc::new(SqlRecordStore::new(self.db.clone()));
        let dispatcher = Dispatcher::new(
            Arc::clone(&self.rules),
            store,
            self.config.dispatch_config(),
        );
        match self.escalation() {
            Some(escalation) => dispatcher.with_escalation(escalation),
            None => dispatcher,
        }
    }
}
