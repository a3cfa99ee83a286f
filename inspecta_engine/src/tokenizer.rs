//! Mixed-script query tokenizer.
//!
//! Splits a query into runs of word-script characters (Han and other
//! non-Latin letters), Latin letters and digits. Everything else separates
//! tokens and is dropped.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Non-Latin letters, e.g. `库存`. Kept as written.
    Word,
    /// Latin letters, lowercased.
    Latin,
    /// Digits, including full-width forms.
    Numeric,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

/// Last code point of the Latin Extended-B block.
const LATIN_END: char = '\u{024F}';

fn classify(c: char) -> Option<TokenKind> {
    if c.is_numeric() {
        Some(TokenKind::Numeric)
    } else if c.is_alphabetic() && c <= LATIN_END {
        Some(TokenKind::Latin)
    } else if c.is_alphabetic() {
        Some(TokenKind::Word)
    } else {
        None
    }
}

/// Tokenize a raw query. Pure: equal input gives equal output.
#[must_use]
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current: Option<Token> = None;

    for c in input.chars() {
        let Some(kind) = classify(c) else {
            if let Some(done) = current.take() {
                tokens.push(done);
            }
            continue;
        };

        if current.as_ref().is_some_and(|t| t.kind == kind) {
            if let Some(token) = current.as_mut() {
                push_char(token, c);
            }
        } else if let Some(done) = current.replace(Token::start(kind, c)) {
            tokens.push(done);
        }
    }

    if let Some(done) = current {
        tokens.push(done);
    }
    tokens
}

impl Token {
    fn start(kind: TokenKind, c: char) -> Self {
        let mut token = Self {
            kind,
            text: String::new(),
        };
        push_char(&mut token, c);
        token
    }
}

fn push_char(token: &mut Token, c: char) {
    if token.kind == TokenKind::Latin {
        token.text.extend(c.to_lowercase());
    } else {
        token.text.push(c);
    }
}

/// Case-fold a query for substring comparisons. Non-Latin text is unaffected.
#[must_use]
pub fn normalize(input: &str) -> String {
    input.trim().to_lowercase()
}
