use async_trait::async_trait;
use inspecta_core::{IntentRule, RuleRepo};
use inspecta_entities::intent_rules;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};
use tracing::{info, warn};

use super::convert::{active_model_from_rule, rule_from_model};

/// `intent_rules` table access.
#[derive(Clone)]
pub struct DatabaseRuleRepository {
    db: DatabaseConnection,
}

impl DatabaseRuleRepository {
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_name(&self, name: &str) -> anyhow::Result<Option<IntentRule>> {
        intent_rules::Entity::find()
            .filter(intent_rules::Column::IntentName.eq(name))
            .one(&self.db)
            .await?
            .map(rule_from_model)
            .transpose()
    }
}

#[async_trait]
impl RuleRepo for DatabaseRuleRepository {
    /// Every stored rule. Rows that fail to decode are skipped with a warning.
    async fn list_all(&self) -> anyhow::Result<Vec<IntentRule>> {
        let models = intent_rules::Entity::find()
            .order_by_asc(intent_rules::Column::Id)
            .all(&self.db)
            .await?;

        Ok(models
            .into_iter()
            .filter_map(|m| {
                let id = m.id;
                rule_from_model(m)
                    .map_err(|e| warn!("Skipping undecodable rule {id}: {e}"))
                    .ok()
            })
            .collect())
    }

    async fn find_by_id(&self, id: i32) -> anyhow::Result<Option<IntentRule>> {
        intent_rules::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(rule_from_model)
            .transpose()
    }

    async fn save(&self, rule: &IntentRule) -> anyhow::Result<i32> {
        let model = active_model_from_rule(rule)?;
        let txn = self.db.begin().await?;

        let id = if rule.id == 0 {
            let inserted = intent_rules::Entity::insert(model).exec(&txn).await?;
            info!("Created rule {} ({})", inserted.last_insert_id, rule.name);
            inserted.last_insert_id
        } else {
            intent_rules::Entity::find_by_id(rule.id)
                .one(&txn)
                .await?
                .ok_or_else(|| anyhow::anyhow!("Rule not found: {}", rule.id))?;
            let updated = model.update(&txn).await?;
            info!("Updated rule {} ({})", updated.id, updated.intent_name);
            updated.id
        };

        txn.commit().await?;
        Ok(id)
    }

    async fn delete(&self, id: i32) -> anyhow::Result<()> {
        let result = intent_rules::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            anyhow::bail!("Rule not found: {id}");
        }
        info!("Deleted rule {id}");
        Ok(())
    }
}
