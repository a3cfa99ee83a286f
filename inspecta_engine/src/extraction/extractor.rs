use std::collections::HashMap;

use inspecta_core::{
    BoundParameter, BoundValue, DispatchError, IntentRule, ParameterSpec, RowExclusion,
};
use tracing::debug;

use super::pattern::compiled_pattern;
use super::validate::validate;
use crate::tokenizer;

/// Values bound for one rule, in template positional order, plus the row
/// filters that travel with them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub values: Vec<BoundParameter>,
    pub exclusions: Vec<RowExclusion>,
}

impl Extraction {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BoundValue> {
        self.values.iter().find(|p| p.name == name).map(|p| &p.value)
    }

    /// Number of parameters resolved from the query rather than a default or NULL.
    #[must_use]
    pub fn bound_count(&self) -> usize {
        self.values
            .iter()
            .filter(|p| p.value != BoundValue::Null)
            .count()
    }
}

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Literal,
    Pattern,
    Default,
}

struct Resolved {
    value: BoundValue,
    source: Source,
    exclusions: Vec<RowExclusion>,
}

/// Pulls typed parameter values out of a query for a matched rule.
#[derive(Debug, Default)]
pub struct ParameterExtractor;

impl ParameterExtractor {
    /// Extract every parameter of `rule` from `query`.
    pub fn extract(rule: &IntentRule, query: &str) -> Result<Extraction, DispatchError> {
        let folded = tokenizer::normalize(query);
        let mut extraction = Extraction::default();

        for spec in &rule.parameters {
            match resolve(spec, query, &folded) {
                Some(resolved) => {
                    debug!(
                        "Rule {} bound `{}` = {} ({:?})",
                        rule.id, spec.name, resolved.value, resolved.source
                    );
                    extraction.values.push(BoundParameter {
                        name: spec.name.clone(),
                        value: resolved.value,
                    });
                    extraction.exclusions.extend(resolved.exclusions);
                }
                None if spec.required => {
                    return Err(DispatchError::MissingParameter {
                        rule_id: rule.id,
                        parameter: spec.name.clone(),
                    });
                }
                None => extraction.values.push(BoundParameter {
                    name: spec.name.clone(),
                    value: BoundValue::Null,
                }),
            }
        }

        Ok(extraction)
    }

    /// Re-extract `rule` for a follow-up query such as "那BOE呢".
    ///
    /// Only literal and pattern matches from `query` count as new values;
    /// everything else is carried over from `previous`. Returns `None` when
    /// the query names no parameter of the rule.
    #[must_use]
    pub fn extract_follow_up(
        rule: &IntentRule,
        query: &str,
        previous: &[BoundParameter],
    ) -> Option<Extraction> {
        let folded = tokenizer::normalize(query);
        let previous: HashMap<&str, &BoundValue> =
            previous.iter().map(|p| (p.name.as_str(), &p.value)).collect();

        let mut extraction = Extraction::default();
        let mut fresh = 0usize;

        for spec in &rule.parameters {
            let resolved = resolve(spec, query, &folded)
                .filter(|r| r.source != Source::Default);
            let value = match resolved {
                Some(resolved) => {
                    fresh += 1;
                    extraction.exclusions.extend(resolved.exclusions);
                    resolved.value
                }
                None => match previous.get(spec.name.as_str()) {
                    Some(value) => (*value).clone(),
                    None if spec.required => return None,
                    None => BoundValue::Null,
                },
            };
            extraction.values.push(BoundParameter {
                name: spec.name.clone(),
                value,
            });
        }

        (fresh > 0).then_some(extraction)
    }
}

fn resolve(spec: &ParameterSpec, query: &str, folded: &str) -> Option<Resolved> {
    if let Some(resolved) = resolve_literal(spec, folded) {
        return Some(resolved);
    }

    if let Some(raw) = spec.kind.pattern().and_then(|p| capture(p, query)) {
        let canonical = spec.kind.canonical(&raw).to_string();
        match validate(spec, &canonical) {
            Ok(value) => {
                return Some(Resolved {
                    value,
                    source: Source::Pattern,
                    exclusions: Vec::new(),
                });
            }
            Err(e) => debug!("Parameter `{}` rejected pattern value: {e}", spec.name),
        }
    }

    let default = spec.default.as_deref()?;
    match validate(spec, default) {
        Ok(value) => Some(Resolved {
            value,
            source: Source::Default,
            exclusions: Vec::new(),
        }),
        Err(e) => {
            debug!("Parameter `{}` rejected default: {e}", spec.name);
            None
        }
    }
}

/// Longest literal occurring in the query wins; equal lengths keep
/// declaration order. A literal whose every occurrence sits inside an
/// excluded substring named by the query is skipped.
fn resolve_literal(spec: &ParameterSpec, folded: &str) -> Option<Resolved> {
    let mut literals: Vec<(usize, &str)> = spec
        .kind
        .literals()
        .into_iter()
        .filter(|l| !l.is_empty())
        .enumerate()
        .collect();
    literals.sort_by_key(|(index, literal)| (std::cmp::Reverse(literal.chars().count()), *index));

    for (_, literal) in literals {
        let needle = literal.to_lowercase();
        let occurrences = spans(folded, &needle);
        if occurrences.is_empty() {
            continue;
        }

        let canonical = spec.kind.canonical(literal);
        let excluded: Vec<&str> = spec
            .exclusions_for(canonical)
            .chain(spec.exclusions_for(literal))
            .collect();

        let shadowed = excluded.iter().any(|substring| {
            let blocked = spans(folded, &substring.to_lowercase());
            occurrences
                .iter()
                .all(|occ| blocked.iter().any(|b| overlaps(*occ, *b)))
        });
        if shadowed {
            debug!(
                "Parameter `{}` skipped `{literal}`: query names an excluded form",
                spec.name
            );
            continue;
        }

        let Ok(value) = validate(spec, canonical) else {
            continue;
        };

        let mut exclusions: Vec<RowExclusion> = Vec::new();
        for substring in excluded {
            let exclusion = RowExclusion {
                field: spec.comparable_field().to_string(),
                substring: substring.to_string(),
            };
            if !exclusions.contains(&exclusion) {
                exclusions.push(exclusion);
            }
        }

        return Some(Resolved {
            value,
            source: Source::Literal,
            exclusions,
        });
    }

    None
}

fn spans(haystack: &str, needle: &str) -> Vec<(usize, usize)> {
    if needle.is_empty() {
        return Vec::new();
    }
    haystack
        .match_indices(needle)
        .map(|(start, m)| (start, start + m.len()))
        .collect()
}

const fn overlaps(a: (usize, usize), b: (usize, usize)) -> bool {
    a.0 < b.1 && b.0 < a.1
}

/// First capture group of `pattern` in `query`, or the whole match when the
/// pattern has no group. Invalid patterns never match.
fn capture(pattern: &str, query: &str) -> Option<String> {
    let re = match compiled_pattern(pattern) {
        Ok(re) => re,
        Err(e) => {
            debug!("Skipping invalid parameter pattern {pattern:?}: {e}");
            return None;
        }
    };
    let caps = re.captures(query)?;
    caps.get(1)
        .or_else(|| caps.get(0))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use inspecta_core::{Category, ValueType};

    fn text(s: &str) -> BoundValue {
        BoundValue::Text(s.to_string())
    }

    fn supplier_rule() -> IntentRule {
        IntentRule::new(
            1,
            "供应商库存",
            Category::Inventory,
            "SELECT * FROM inventory_records WHERE supplier = ?",
        )
        .with_parameter(ParameterSpec::literal("supplier", ["聚龙", "BOE"]))
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn binds_literal_from_query() {
        let extraction = ParameterExtractor::extract(&supplier_rule(), "查询聚龙供应商的库存")
            .expect("supplier literal should bind");
        assert_eq!(extraction.get("supplier"), Some(&text("聚龙")));
        assert!(extraction.exclusions.is_empty());
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn literal_match_ignores_latin_case_and_binds_declared_spelling() {
        let extraction = ParameterExtractor::extract(&supplier_rule(), "boe的库存")
            .expect("case-insensitive literal should bind");
        assert_eq!(extraction.get("supplier"), Some(&text("BOE")));
    }

    #[test]
    fn missing_required_parameter_names_rule_and_parameter() {
        let err = ParameterExtractor::extract(&supplier_rule(), "供应商库存");
        assert_eq!(
            err,
            Err(DispatchError::MissingParameter {
                rule_id: 1,
                parameter: "supplier".to_string()
            })
        );
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn longest_literal_wins_then_declaration_order() {
        let rule = IntentRule::new(2, "物料库存", Category::Inventory, "SELECT 1 WHERE m = ?")
            .with_parameter(ParameterSpec::literal("material", ["电池", "电池盖", "屏幕", "外壳"]));

        let extraction =
            ParameterExtractor::extract(&rule, "电池盖库存").expect("longest literal binds");
        assert_eq!(extraction.get("material"), Some(&text("电池盖")));

        let extraction =
            ParameterExtractor::extract(&rule, "外壳和屏幕").expect("first declared binds");
        assert_eq!(extraction.get("material"), Some(&text("屏幕")));
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn alias_resolves_to_canonical_value() {
        let rule = IntentRule::new(3, "检验结果", Category::Testing, "SELECT 1 WHERE r = ?")
            .with_parameter(
                ParameterSpec::enumeration("result", ["合格", "不合格"])
                    .with_alias("OK", "合格")
                    .with_alias("NG", "不合格"),
            );
        let extraction =
            ParameterExtractor::extract(&rule, "列出NG的批次").expect("alias should bind");
        assert_eq!(extraction.get("result"), Some(&text("不合格")));
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn exclusion_travels_with_bound_value() {
        let rule = IntentRule::new(4, "物料库存", Category::Inventory, "SELECT 1 WHERE m = ?")
            .with_parameter(
                ParameterSpec::literal("material", ["电池"])
                    .with_field("material_name")
                    .with_exclusion("电池", "电池盖"),
            );
        let extraction =
            ParameterExtractor::extract(&rule, "查询电池的库存").expect("material binds");
        assert_eq!(extraction.get("material"), Some(&text("电池")));
        assert_eq!(
            extraction.exclusions,
            vec![RowExclusion {
                field: "material_name".to_string(),
                substring: "电池盖".to_string()
            }]
        );
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn excluded_form_in_query_falls_through_to_next_candidate() {
        let rule = IntentRule::new(5, "物料库存", Category::Inventory, "SELECT 1 WHERE m = ?")
            .with_parameter(
                ParameterSpec::literal("material", ["电池", "盖板"])
                    .with_exclusion("电池", "电池盖"),
            );

        let err = ParameterExtractor::extract(&rule, "电池盖库存");
        assert!(matches!(err, Err(DispatchError::MissingParameter { .. })));

        let rule = rule.with_parameter(
            ParameterSpec::literal("note", ["x"]).optional(),
        );
        let extraction =
            ParameterExtractor::extract(&rule, "电池盖板").expect("next literal binds");
        assert_eq!(extraction.get("material"), Some(&text("盖板")));
        assert_eq!(extraction.get("note"), Some(&BoundValue::Null));
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn fallback_pattern_takes_first_group() {
        let rule = IntentRule::new(6, "批次检验", Category::Testing, "SELECT 1 WHERE b = ?")
            .with_parameter(ParameterSpec::regex("batch", r"(?i)批次\s*([A-Z]\d+)"));
        let extraction =
            ParameterExtractor::extract(&rule, "批次 B2024 的检验").expect("regex binds");
        assert_eq!(extraction.get("batch"), Some(&text("B2024")));
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn invalid_typed_value_uses_default() {
        let rule = IntentRule::new(7, "日期库存", Category::Inventory, "SELECT 1 WHERE d >= ?")
            .with_parameter(
                ParameterSpec::regex("since", r"(\d{4}[-/]\d{1,2}(?:[-/]\d{1,2})?)")
                    .with_type(ValueType::Date)
                    .with_default("2024-01-01"),
            );

        let extraction =
            ParameterExtractor::extract(&rule, "2024/3/9以来").expect("date binds");
        assert_eq!(extraction.get("since"), Some(&text("2024-03-09")));

        let extraction =
            ParameterExtractor::extract(&rule, "2024-02-31以来").expect("default binds");
        assert_eq!(extraction.get("since"), Some(&text("2024-01-01")));
    }

    #[test]
    fn follow_up_overrides_previous_bindings() {
        let previous = vec![BoundParameter {
            name: "supplier".to_string(),
            value: text("聚龙"),
        }];
        let rule = supplier_rule();

        let follow_up = ParameterExtractor::extract_follow_up(&rule, "那BOE呢", &previous);
        assert_eq!(
            follow_up.and_then(|e| e.get("supplier").cloned()),
            Some(text("BOE"))
        );

        assert!(ParameterExtractor::extract_follow_up(&rule, "然后呢", &previous).is_none());
    }
}
