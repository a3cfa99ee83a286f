//! Views over a succeeded query result: table, summary cards and narrative.

use std::collections::HashMap;

use inspecta_core::dispatch::{CardEntry, field_text};
use inspecta_core::{Category, DispatchConfig, QueryResult, SummaryCard, TablePayload};
use serde_json::{Map, Value};

/// Marker present in every narrative over zero rows.
pub const NO_MATCHING_RECORDS: &str = "no matching records";

const NARRATIVE_EXAMPLES: usize = 3;
const EXAMPLE_FIELDS: usize = 4;
const CARD_ENTRIES: usize = 10;

/// Card title and source field per category.
const fn card_fields(category: Category) -> &'static [(&'static str, &'static str)] {
    match category {
        Category::Inventory => &[
            ("按物料", "material_name"),
            ("按供应商", "supplier"),
            ("按状态", "status"),
        ],
        Category::Testing => &[("检验结果", "result"), ("按不良类型", "defect_type")],
        Category::Production => &[("按产线", "line"), ("按状态", "status")],
        Category::Comparison => &[("按供应商", "supplier")],
        Category::Exploration => &[],
    }
}

/// Formatted views of one result. All three read the same rows.
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedResult {
    pub table: TablePayload,
    pub cards: Vec<SummaryCard>,
    pub narrative: String,
}

#[derive(Debug, Clone, Copy)]
pub struct ResultFormatter {
    display_cap: usize,
}

impl ResultFormatter {
    #[must_use]
    pub const fn new(display_cap: usize) -> Self {
        Self { display_cap }
    }

    #[must_use]
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self::new(config.display_cap.max(1))
    }

    #[must_use]
    pub fn format(
        &self,
        rule_name: &str,
        category: Category,
        result: &QueryResult,
    ) -> FormattedResult {
        FormattedResult {
            table: self.table(result),
            cards: cards(category, result),
            narrative: narrative(rule_name, result),
        }
    }

    #[must_use]
    pub fn table(&self, result: &QueryResult) -> TablePayload {
        TablePayload {
            fields: result.fields.clone(),
            rows: result.rows.iter().take(self.display_cap).cloned().collect(),
            total_rows: result.row_count,
            truncated: result.row_count > self.display_cap,
        }
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::from_config(&DispatchConfig::default())
    }
}

#[must_use]
pub fn cards(category: Category, result: &QueryResult) -> Vec<SummaryCard> {
    if category == Category::Exploration {
        return vec![SummaryCard {
            title: "概览".to_string(),
            entries: vec![
                CardEntry {
                    label: "rows".to_string(),
                    count: result.row_count,
                },
                CardEntry {
                    label: "fields".to_string(),
                    count: result.fields.len(),
                },
            ],
        }];
    }

    card_fields(category)
        .iter()
        .filter(|(_, field)| result.fields.iter().any(|f| f == field))
        .map(|(title, field)| SummaryCard {
            title: (*title).to_string(),
            entries: count_by(&result.rows, field),
        })
        .filter(|card| !card.entries.is_empty())
        .collect()
}

/// Rows per distinct value of `field`, most frequent first.
fn count_by(rows: &[Map<String, Value>], field: &str) -> Vec<CardEntry> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for label in rows.iter().filter_map(|row| field_text(row, field)) {
        *counts.entry(label).or_default() += 1;
    }

    let mut entries: Vec<CardEntry> = counts
        .into_iter()
        .map(|(label, count)| CardEntry { label, count })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    entries.truncate(CARD_ENTRIES);
    entries
}

#[must_use]
pub fn narrative(rule_name: &str, result: &QueryResult) -> String {
    if result.is_empty() {
        return format!("「{rule_name}」未找到匹配记录（{NO_MATCHING_RECORDS}）");
    }

    let examples: Vec<String> = result
        .rows
        .iter()
        .take(NARRATIVE_EXAMPLES)
        .map(|row| {
            result
                .fields
                .iter()
                .take(EXAMPLE_FIELDS)
                .filter_map(|f| field_text(row, f))
                .collect::<Vec<_>>()
                .join(" / ")
        })
        .collect();

    format!(
        "「{rule_name}」共找到 {} 条记录。示例：{}",
        result.row_count,
        examples.join("；")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(rows: &[(&str, &str, &str)]) -> QueryResult {
        let rows = rows
            .iter()
            .map(|(material, supplier, status)| {
                let mut row = Map::new();
                row.insert("material_name".to_string(), json!(material));
                row.insert("supplier".to_string(), json!(supplier));
                row.insert("status".to_string(), json!(status));
                row.insert("quantity".to_string(), json!(10));
                row
            })
            .collect();
        QueryResult::new(
            vec![
                "material_name".to_string(),
                "supplier".to_string(),
                "status".to_string(),
                "quantity".to_string(),
            ],
            rows,
        )
    }

    #[test]
    fn empty_result_says_no_matching_records() {
        let formatted = ResultFormatter::default().format(
            "供应商库存",
            Category::Inventory,
            &QueryResult::default(),
        );
        assert!(formatted.narrative.contains(NO_MATCHING_RECORDS));
        assert!(formatted.table.rows.is_empty());
        assert!(formatted.cards.is_empty());
    }

    #[test]
    fn table_is_truncated_to_display_cap() {
        let rows: Vec<_> = (0..25).map(|_| ("电池", "聚龙", "在库")).collect();
        let table = ResultFormatter::new(20).table(&result(&rows));
        assert_eq!(table.rows.len(), 20);
        assert_eq!(table.total_rows, 25);
        assert!(table.truncated);
    }

    #[test]
    fn inventory_cards_count_every_row() {
        let data = result(&[
            ("电池", "聚龙", "在库"),
            ("屏幕", "BOE", "在库"),
            ("电池", "BOE", "冻结"),
        ]);
        let cards = cards(Category::Inventory, &data);

        assert_eq!(
            cards.iter().map(|c| c.title.as_str()).collect::<Vec<_>>(),
            vec!["按物料", "按供应商", "按状态"]
        );
        assert_eq!(
            cards[1].entries,
            vec![
                CardEntry {
                    label: "BOE".to_string(),
                    count: 2
                },
                CardEntry {
                    label: "聚龙".to_string(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn exploration_card_reports_shape() {
        let data = result(&[("电池", "聚龙", "在库")]);
        let cards = cards(Category::Exploration, &data);
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].entries[0].count, 1);
        assert_eq!(cards[0].entries[1].count, 4);
    }

    #[test]
    fn narrative_lists_up_to_three_examples() {
        let data = result(&[
            ("电池", "聚龙", "在库"),
            ("屏幕", "BOE", "在库"),
            ("外壳", "BOE", "在库"),
            ("电池盖", "BOE", "在库"),
        ]);
        let text = narrative("物料库存", &data);
        assert!(text.contains("共找到 4 条记录"));
        assert!(text.contains("电池 / 聚龙 / 在库 / 10"));
        assert!(text.contains("外壳"));
        assert!(!text.contains("电池盖"));
    }
}
