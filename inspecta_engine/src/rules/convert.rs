use chrono::Utc;
use inspecta_core::{Category, IntentRule, RuleStatus};
use inspecta_entities::intent_rules;
use sea_orm::{JsonValue, Set};
use tracing::warn;

/// Build a rule from its stored row.
pub fn rule_from_model(m: intent_rules::Model) -> anyhow::Result<IntentRule> {
    let category: Category = m.category.parse()?;
    let status = m.status.parse::<RuleStatus>().unwrap_or_else(|_| {
        warn!("Rule {} has unknown status {:?}, treating as inactive", m.id, m.status);
        RuleStatus::Inactive
    });

    Ok(IntentRule {
        id: m.id,
        name: m.intent_name,
        description: m.description,
        category,
        trigger_words: serde_json::from_value(m.trigger_words)?,
        synonyms: serde_json::from_value(m.synonyms)?,
        parameters: serde_json::from_value(m.parameters)?,
        template: m.action_target,
        priority: m.priority,
        sort_order: m.sort_order,
        status,
        example_query: m.example_query,
    })
}

/// Active model for an insert (`rule.id == 0`) or an update.
pub fn active_model_from_rule(rule: &IntentRule) -> anyhow::Result<intent_rules::ActiveModel> {
    let now = Utc::now();
    let mut model = intent_rules::ActiveModel {
        intent_name: Set(rule.name.clone()),
        description: Set(rule.description.clone()),
        category: Set(rule.category.to_string()),
        trigger_words: Set(to_json(&rule.trigger_words)?),
        synonyms: Set(to_json(&rule.synonyms)?),
        parameters: Set(to_json(&rule.parameters)?),
        action_target: Set(rule.template.clone()),
        example_query: Set(rule.example_query.clone()),
        priority: Set(rule.priority),
        sort_order: Set(rule.sort_order),
        status: Set(rule.status.to_string()),
        updated_at: Set(now),
        ..Default::default()
    };
    if rule.id == 0 {
        model.created_at = Set(now);
    } else {
        model.id = Set(rule.id);
    }
    Ok(model)
}

fn to_json<T: serde::Serialize>(value: &T) -> anyhow::Result<JsonValue> {
    Ok(serde_json::to_value(value)?)
}
