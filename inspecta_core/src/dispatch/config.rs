use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::rule::Category;

/// Tuning knobs of the dispatch pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Minimum score the top candidate needs to be used.
    #[serde(default = "DispatchConfig::default_min_confidence")]
    pub min_confidence: u32,
    /// Number of ranked candidates kept per query.
    #[serde(default = "DispatchConfig::default_top_k")]
    pub top_k: usize,
    /// Row cap appended to templates without a LIMIT (clamped to 10..=50).
    #[serde(default = "DispatchConfig::default_row_cap")]
    pub row_cap: usize,
    /// Rows shown in the tabular view.
    #[serde(default = "DispatchConfig::default_display_cap")]
    pub display_cap: usize,
    #[serde(default = "DispatchConfig::default_execution_timeout_ms")]
    pub execution_timeout_ms: u64,
    #[serde(default = "DispatchConfig::default_escalation_timeout_ms")]
    pub escalation_timeout_ms: u64,
    /// Recent queries kept per session and sent with escalations.
    #[serde(default = "DispatchConfig::default_context_history")]
    pub context_history: usize,
    /// Overrides of the built-in category-defining keywords.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub category_keywords: BTreeMap<Category, Vec<String>>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            min_confidence: Self::default_min_confidence(),
            top_k: Self::default_top_k(),
            row_cap: Self::default_row_cap(),
            display_cap: Self::default_display_cap(),
            execution_timeout_ms: Self::default_execution_timeout_ms(),
            escalation_timeout_ms: Self::default_escalation_timeout_ms(),
            context_history: Self::default_context_history(),
            category_keywords: BTreeMap::new(),
        }
    }
}

impl DispatchConfig {
    pub const MIN_ROW_CAP: usize = 10;
    pub const MAX_ROW_CAP: usize = 50;

    const fn default_min_confidence() -> u32 {
        50
    }

    const fn default_top_k() -> usize {
        5
    }

    const fn default_row_cap() -> usize {
        Self::MAX_ROW_CAP
    }

    const fn default_display_cap() -> usize {
        20
    }

    const fn default_execution_timeout_ms() -> u64 {
        5_000
    }

    const fn default_escalation_timeout_ms() -> u64 {
        30_000
    }

    const fn default_context_history() -> usize {
        5
    }

    #[must_use]
    pub fn effective_row_cap(&self) -> usize {
        self.row_cap.clamp(Self::MIN_ROW_CAP, Self::MAX_ROW_CAP)
    }

    /// Category-defining keywords, lowercase, with configured overrides applied.
    #[must_use]
    pub fn keywords_for(&self, category: Category) -> Vec<String> {
        self.category_keywords.get(&category).map_or_else(
            || {
                category
                    .default_keywords()
                    .iter()
                    .map(|k| (*k).to_string())
                    .collect()
            },
            |words| words.iter().map(|w| w.to_lowercase()).collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_cap_is_clamped() {
        let mut config = DispatchConfig::default();
        assert_eq!(config.effective_row_cap(), 50);
        config.row_cap = 500;
        assert_eq!(config.effective_row_cap(), 50);
        config.row_cap = 3;
        assert_eq!(config.effective_row_cap(), 10);
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn partial_json_uses_defaults() {
        let json = r#"{"min_confidence": 80, "category_keywords": {"testing": ["IQC"]}}"#;
        let config: DispatchConfig =
            serde_json::from_str(json).expect("valid JSON should deserialize");
        assert_eq!(config.min_confidence, 80);
        assert_eq!(config.top_k, 5);
        assert_eq!(config.keywords_for(Category::Testing), vec!["iqc"]);
        assert!(config.keywords_for(Category::Inventory).contains(&"库存".to_string()));
    }
}
