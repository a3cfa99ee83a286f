//! Category detection from category-defining keywords.
//!
//! A query that names keywords of exactly one category is pinned to that
//! category before scoring, which separates rules sharing trigger words
//! across categories (e.g. "不良" under both testing and production).
//!
//! Word-script keywords match anywhere in the query. Keywords without
//! word-script characters must match whole Latin/numeric tokens, so `test`
//! does not fire on "latest".

use inspecta_core::{Category, DispatchConfig};

use crate::tokenizer::{Token, TokenKind, tokenize};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Keyword {
    Substring(String),
    Tokens(Vec<String>),
}

impl Keyword {
    fn parse(word: &str) -> Option<Self> {
        let tokens = tokenize(word);
        if tokens.is_empty() {
            None
        } else if tokens.iter().any(|t| t.kind == TokenKind::Word) {
            Some(Self::Substring(word.to_lowercase()))
        } else {
            Some(Self::Tokens(tokens.into_iter().map(|t| t.text).collect()))
        }
    }

    fn occurs_in(&self, query: &str, tokens: &[Token]) -> bool {
        match self {
            Self::Substring(word) => query.contains(word.as_str()),
            Self::Tokens(words) => tokens.windows(words.len()).any(|window| {
                window
                    .iter()
                    .zip(words)
                    .all(|(token, word)| token.kind != TokenKind::Word && token.text == *word)
            }),
        }
    }
}

pub struct CategoryDetector {
    keywords: Vec<(Category, Vec<Keyword>)>,
}

impl CategoryDetector {
    #[must_use]
    pub fn new(config: &DispatchConfig) -> Self {
        Self {
            keywords: Category::ALL
                .iter()
                .map(|c| {
                    let words = config.keywords_for(*c);
                    (*c, words.iter().filter_map(|w| Keyword::parse(w)).collect())
                })
                .collect(),
        }
    }

    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(&DispatchConfig::default())
    }

    /// Categories whose keywords occur in the case-folded query.
    #[must_use]
    pub fn categories_in(&self, query: &str) -> Vec<Category> {
        let query = query.to_lowercase();
        let tokens = tokenize(&query);
        self.keywords
            .iter()
            .filter(|(_, words)| words.iter().any(|w| w.occurs_in(&query, &tokens)))
            .map(|(category, _)| *category)
            .collect()
    }

    /// The single category named by the query, if unambiguous.
    #[must_use]
    pub fn detect(&self, query: &str) -> Option<Category> {
        match self.categories_in(query).as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }
}

impl Default for CategoryDetector {
    fn default() -> Self {
        Self::with_defaults()
    }
}
