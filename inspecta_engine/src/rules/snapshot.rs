use std::sync::{Arc, PoisonError, RwLock};

use inspecta_core::IntentRule;
use tracing::{info, warn};

use crate::extraction::compiled_pattern;
use crate::template::count_placeholders;

/// Immutable view of the active rule catalog.
#[derive(Debug, Default)]
pub struct RuleSnapshot {
    pub version: u64,
    pub rules: Vec<Arc<IntentRule>>,
}

impl RuleSnapshot {
    /// Keep active rules that pass validation, ordered by id.
    #[must_use]
    pub fn build(version: u64, rules: Vec<IntentRule>) -> Self {
        let mut rules: Vec<Arc<IntentRule>> = rules
            .into_iter()
            .filter(IntentRule::is_active)
            .filter(|rule| match validate_rule(rule) {
                Ok(()) => true,
                Err(reason) => {
                    warn!("Skipping rule {} ({}): {reason}", rule.id, rule.name);
                    false
                }
            })
            .map(Arc::new)
            .collect();
        rules.sort_by_key(|r| r.id);
        Self { version, rules }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: i32) -> Option<&Arc<IntentRule>> {
        self.rules
            .binary_search_by_key(&id, |r| r.id)
            .ok()
            .and_then(|i| self.rules.get(i))
    }
}

/// A rule is servable when its patterns compile and its template has one
/// placeholder per parameter.
pub fn validate_rule(rule: &IntentRule) -> Result<(), String> {
    for spec in &rule.parameters {
        if let Some(pattern) = spec.kind.pattern() {
            compiled_pattern(pattern)
                .map_err(|e| format!("parameter `{}` has an invalid pattern: {e}", spec.name))?;
        }
    }

    let placeholders = count_placeholders(&rule.template);
    if placeholders != rule.parameters.len() {
        return Err(format!(
            "template has {placeholders} placeholders for {} parameters",
            rule.parameters.len()
        ));
    }
    Ok(())
}

/// Current snapshot behind a read-write lock. Readers clone the `Arc` and
/// never observe a partially rebuilt catalog.
#[derive(Debug, Default)]
pub struct RuleCache {
    current: RwLock<Arc<RuleSnapshot>>,
}

impl RuleCache {
    #[must_use]
    pub fn new(rules: Vec<IntentRule>) -> Self {
        let cache = Self::default();
        cache.replace(rules);
        cache
    }

    #[must_use]
    pub fn snapshot(&self) -> Arc<RuleSnapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Swap in a snapshot built from `rules`. Returns the new version.
    pub fn replace(&self, rules: Vec<IntentRule>) -> u64 {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let next = RuleSnapshot::build(current.version + 1, rules);
        let version = next.version;
        info!("Rule snapshot v{version}: {} active rules", next.len());
        *current = Arc::new(next);
        version
    }
}
