//! Intent rule scoring and ranking.
//!
//! Score per rule:
//! - rule name contained in the query: +100
//! - any trigger word or synonym contained in the query: +50
//! - query contained in the rule's example query: +30
//! - each distinct token equal to a trigger word or synonym: +5
//!
//! Ranking is total: score desc, priority desc, sort order asc, id asc.

mod category;

use std::cmp::{Ordering, Reverse};
use std::collections::HashSet;
use std::sync::Arc;

use inspecta_core::{Category, DispatchConfig, DispatchError, IntentRule};
use rayon::prelude::*;
use tracing::{debug, warn};

pub use category::CategoryDetector;

use crate::tokenizer::{self, Token};

pub const NAME_WEIGHT: u32 = 100;
pub const KEYWORD_WEIGHT: u32 = 50;
pub const EXAMPLE_WEIGHT: u32 = 30;
pub const TOKEN_BONUS: u32 = 5;

/// A rule that scored above zero for the current query.
#[derive(Debug, Clone)]
pub struct MatchCandidate {
    pub rule: Arc<IntentRule>,
    pub score: u32,
    pub matched_keywords: Vec<String>,
}

impl MatchCandidate {
    #[must_use]
    pub fn rule_id(&self) -> i32 {
        self.rule.id
    }

    /// Sort key: score desc, priority desc, sort order asc, id asc.
    #[must_use]
    pub fn tie_break_key(&self) -> (Reverse<u32>, Reverse<i32>, i32, i32) {
        (
            Reverse(self.score),
            Reverse(self.rule.priority),
            self.rule.sort_order,
            self.rule.id,
        )
    }

    fn ties_with(&self, other: &Self) -> bool {
        self.score == other.score
            && self.rule.priority == other.rule.priority
            && self.rule.sort_order == other.rule.sort_order
    }
}

/// Ranked candidates for one query.
#[derive(Debug, Clone, Default)]
pub struct Ranking {
    pub candidates: Vec<MatchCandidate>,
    /// Category the candidates were restricted to, if any.
    pub category: Option<Category>,
    /// Set when the two best candidates tie on every key but id.
    pub ambiguity: Option<DispatchError>,
}

impl Ranking {
    #[must_use]
    pub fn best(&self) -> Option<&MatchCandidate> {
        self.candidates.first()
    }
}

pub struct Matcher {
    categories: CategoryDetector,
    top_k: usize,
}

impl Matcher {
    #[must_use]
    pub fn new(config: &DispatchConfig) -> Self {
        Self {
            categories: CategoryDetector::new(config),
            top_k: config.top_k.max(1),
        }
    }

    /// Score a single rule. `query` must already be case-folded.
    #[must_use]
    pub fn score(rule: &Arc<IntentRule>, query: &str, tokens: &[Token]) -> Option<MatchCandidate> {
        if query.is_empty() {
            return None;
        }

        let mut score = 0;

        let name = tokenizer::normalize(&rule.name);
        if !name.is_empty() && query.contains(&name) {
            score += NAME_WEIGHT;
        }

        let keywords: Vec<(&str, String)> = rule
            .keywords()
            .into_iter()
            .map(|k| (k, k.to_lowercase()))
            .collect();

        let matched_keywords: Vec<String> = keywords
            .iter()
            .filter(|(_, folded)| query.contains(folded.as_str()))
            .map(|(original, _)| (*original).to_string())
            .collect();
        if !matched_keywords.is_empty() {
            score += KEYWORD_WEIGHT;
        }

        let example = tokenizer::normalize(&rule.example_query);
        if !example.is_empty() && example.contains(query) {
            score += EXAMPLE_WEIGHT;
        }

        let mut seen = HashSet::new();
        for token in tokens {
            if seen.insert(token.text.as_str())
                && keywords.iter().any(|(_, folded)| *folded == token.text)
            {
                score += TOKEN_BONUS;
            }
        }

        (score > 0).then(|| MatchCandidate {
            rule: Arc::clone(rule),
            score,
            matched_keywords,
        })
    }

    /// Rank active rules against a raw query and keep the top K.
    #[must_use]
    pub fn rank(&self, raw_query: &str, rules: &[Arc<IntentRule>]) -> Ranking {
        let tokens = tokenizer::tokenize(raw_query);
        if tokens.is_empty() {
            debug!("Query has no tokens, no candidates");
            return Ranking::default();
        }

        let query = tokenizer::normalize(raw_query);

        let category = self
            .categories
            .detect(&query)
            .filter(|c| rules.iter().any(|r| r.is_active() && r.category == *c));
        if let Some(category) = category {
            debug!("Restricting candidates to category {category}");
        }

        let mut candidates: Vec<MatchCandidate> = rules
            .par_iter()
            .filter(|rule| rule.is_active())
            .filter(|rule| category.is_none_or(|c| rule.category == c))
            .filter_map(|rule| Self::score(rule, &query, &tokens))
            .collect();

        candidates.sort_by(compare);

        let ambiguity = match candidates.as_slice() {
            [first, second, ..] if first.ties_with(second) => {
                warn!(
                    "Ambiguous match: rules {} and {} tie at score {}, choosing {}",
                    first.rule_id(),
                    second.rule_id(),
                    first.score,
                    first.rule_id()
                );
                Some(DispatchError::AmbiguousMatch {
                    first: first.rule_id(),
                    second: second.rule_id(),
                })
            }
            _ => None,
        };

        candidates.truncate(self.top_k);

        debug!(
            "Ranked {} candidates: {:?}",
            candidates.len(),
            candidates
                .iter()
                .map(|c| (c.rule_id(), c.score))
                .collect::<Vec<_>>()
        );

        Ranking {
            candidates,
            category,
            ambiguity,
        }
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(&DispatchConfig::default())
    }
}

fn compare(a: &MatchCandidate, b: &MatchCandidate) -> Ordering {
    a.tie_break_key().cmp(&b.tie_break_key())
}
