use std::fmt::Write as _;

use inspecta_core::{BoundQuery, BoundValue, PlaceholderStyle};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template has {expected} placeholders but {bound} values were bound")]
    PlaceholderMismatch { expected: usize, bound: usize },

    #[error("template is empty")]
    Empty,
}

#[expect(clippy::unwrap_used, reason = "Static regex is verified by tests")]
static LIMIT_CLAUSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\blimit\s+(\d+|\?)").unwrap());

/// Characters of `template`, each flagged when it sits inside a quoted literal.
fn scan(template: &str) -> impl Iterator<Item = (char, bool)> + '_ {
    template.chars().scan(None, |quote: &mut Option<char>, c| {
        let quoted = match *quote {
            Some(q) => {
                if c == q {
                    *quote = None;
                }
                true
            }
            None if c == '\'' || c == '"' => {
                *quote = Some(c);
                true
            }
            None => false,
        };
        Some((c, quoted))
    })
}

/// Number of positional `?` placeholders outside quoted literals.
#[must_use]
pub fn count_placeholders(template: &str) -> usize {
    scan(template)
        .filter(|&(c, quoted)| c == '?' && !quoted)
        .count()
}

/// Template text with quoted literals blanked, for clause detection.
fn unquoted(template: &str) -> String {
    scan(template)
        .map(|(c, quoted)| if quoted { ' ' } else { c })
        .collect()
}

#[must_use]
pub fn has_limit(template: &str) -> bool {
    LIMIT_CLAUSE.is_match(&unquoted(template))
}

/// Turns a rule template and its positional values into an executable query.
#[derive(Debug, Clone, Copy)]
pub struct TemplateCompiler {
    style: PlaceholderStyle,
    row_cap: Option<usize>,
}

impl TemplateCompiler {
    #[must_use]
    pub const fn new(style: PlaceholderStyle, row_cap: usize) -> Self {
        Self {
            style,
            row_cap: Some(row_cap),
        }
    }

    /// Same dialect, no LIMIT appended. The caller caps the rows itself.
    #[must_use]
    pub const fn uncapped(self) -> Self {
        Self {
            style: self.style,
            row_cap: None,
        }
    }

    /// Check the placeholder count, strip a trailing `;`, append the row cap
    /// (if any) when no LIMIT is present, and renumber placeholders for the
    /// dialect.
    pub fn compile(
        &self,
        rule_id: i32,
        template: &str,
        values: Vec<BoundValue>,
    ) -> Result<BoundQuery, TemplateError> {
        let trimmed = template.trim().trim_end_matches(';').trim_end();
        if trimmed.is_empty() {
            return Err(TemplateError::Empty);
        }

        let expected = count_placeholders(trimmed);
        if expected != values.len() {
            return Err(TemplateError::PlaceholderMismatch {
                expected,
                bound: values.len(),
            });
        }

        let mut sql = match self.style {
            PlaceholderStyle::Question => trimmed.to_string(),
            PlaceholderStyle::Numbered => number_placeholders(trimmed),
        };
        if let Some(cap) = self.row_cap.filter(|_| !has_limit(trimmed)) {
            let _ = write!(sql, " LIMIT {cap}");
        }

        Ok(BoundQuery {
            rule_id,
            sql,
            values,
        })
    }
}

fn number_placeholders(template: &str) -> String {
    let mut out = String::with_capacity(template.len() + 8);
    let mut n = 0;
    for (c, quoted) in scan(template) {
        if c == '?' && !quoted {
            n += 1;
            let _ = write!(out, "${n}");
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> BoundValue {
        BoundValue::Text(s.to_string())
    }

    #[test]
    fn placeholders_inside_quotes_are_ignored() {
        assert_eq!(count_placeholders("SELECT * FROM t WHERE a = ? AND b = ?"), 2);
        assert_eq!(
            count_placeholders("SELECT * FROM t WHERE a = ? AND note = 'why?' AND c = \"?\""),
            1
        );
        assert_eq!(count_placeholders("SELECT 1"), 0);
    }

    #[test]
    fn mismatch_is_rejected_before_execution() {
        let compiler = TemplateCompiler::new(PlaceholderStyle::Question, 50);
        let err = compiler.compile(1, "SELECT * FROM t WHERE a = ? AND b = ?", vec![text("x")]);
        assert_eq!(
            err,
            Err(TemplateError::PlaceholderMismatch {
                expected: 2,
                bound: 1
            })
        );
    }

    #[test]
    fn appends_row_cap_and_strips_semicolon() {
        let compiler = TemplateCompiler::new(PlaceholderStyle::Question, 50);
        let query = compiler.compile(1, "SELECT * FROM t WHERE a = ?;", vec![text("x")]);
        assert_eq!(
            query.map(|q| q.sql),
            Ok("SELECT * FROM t WHERE a = ? LIMIT 50".to_string())
        );
    }

    #[test]
    fn existing_limit_is_kept() {
        let compiler = TemplateCompiler::new(PlaceholderStyle::Question, 50);
        let query = compiler.compile(1, "SELECT * FROM t LIMIT 5", Vec::new());
        assert_eq!(query.map(|q| q.sql), Ok("SELECT * FROM t LIMIT 5".to_string()));

        let query = compiler.compile(1, "SELECT * FROM t WHERE note = 'limit 5'", Vec::new());
        assert_eq!(
            query.map(|q| q.sql),
            Ok("SELECT * FROM t WHERE note = 'limit 5' LIMIT 50".to_string())
        );
    }

    #[test]
    fn uncapped_compiler_leaves_limit_to_the_caller() {
        let compiler = TemplateCompiler::new(PlaceholderStyle::Question, 50).uncapped();
        let query = compiler.compile(1, "SELECT * FROM t WHERE a = ?;", vec![text("x")]);
        assert_eq!(
            query.map(|q| q.sql),
            Ok("SELECT * FROM t WHERE a = ?".to_string())
        );
    }

    #[test]
    fn postgres_placeholders_are_numbered() {
        let compiler = TemplateCompiler::new(PlaceholderStyle::Numbered, 20);
        let query = compiler.compile(
            1,
            "SELECT * FROM t WHERE a = ? AND note <> '?' AND b = ?",
            vec![text("x"), BoundValue::Number(3.0)],
        );
        assert_eq!(
            query.map(|q| q.sql),
            Ok("SELECT * FROM t WHERE a = $1 AND note <> '?' AND b = $2 LIMIT 20".to_string())
        );
    }

    #[test]
    fn values_stay_out_of_sql() {
        let compiler = TemplateCompiler::new(PlaceholderStyle::Question, 50);
        let hostile = text("x'; DROP TABLE inventory_records; --");
        let query = compiler.compile(1, "SELECT * FROM t WHERE a = ?", vec![hostile.clone()]);
        let query = query.ok();
        assert!(query.as_ref().is_some_and(|q| !q.sql.contains("DROP")));
        assert_eq!(query.map(|q| q.values), Some(vec![hostile]));
    }
}
