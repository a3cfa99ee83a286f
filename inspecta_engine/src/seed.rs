//! Demo rule library and sample inspection data.

use inspecta_core::{Category, IntentRule, ParameterSpec, ValueType};
use inspecta_entities::{inspection_records, inventory_records, production_records};
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, Set};
use tracing::info;

use crate::rules::RuleStore;

const INVENTORY_COLUMNS: &str =
    "material_code, material_name, supplier, batch_no, quantity, status, warehouse";
const INSPECTION_COLUMNS: &str =
    "batch_no, material_name, supplier, result, defect_type, defect_count, inspected_on";

pub const SUPPLIERS: [&str; 3] = ["聚龙", "BOE", "天马"];
pub const MATERIALS: [&str; 5] = ["电池", "电池盖", "屏幕", "外壳", "摄像头"];

/// Rules covering the inventory, testing, production and comparison scenarios.
#[must_use]
pub fn demo_rules() -> Vec<IntentRule> {
    vec![
        IntentRule::new(
            0,
            "供应商库存",
            Category::Inventory,
            format!(
                "SELECT {INVENTORY_COLUMNS} FROM inventory_records WHERE supplier = ? ORDER BY id"
            ),
        )
        .with_description("某供应商的全部在库批次")
        .with_trigger_words(["供应商", "库存"])
        .with_synonyms("库存", ["存货", "在库"])
        .with_parameter(
            ParameterSpec::literal("supplier", SUPPLIERS)
                .with_fallback_pattern(r"(?i)([A-Z]{2,})供应商"),
        )
        .with_priority(1)
        .with_example("查询聚龙供应商的库存"),
        IntentRule::new(
            0,
            "物料库存",
            Category::Inventory,
            format!(
                "SELECT {INVENTORY_COLUMNS} FROM inventory_records \
                 WHERE material_name LIKE '%' || ? || '%' ORDER BY id"
            ),
        )
        .with_description("按物料名称查询库存，电池不含电池盖")
        .with_trigger_words(["物料", "库存"])
        .with_parameter(
            ParameterSpec::literal("material", MATERIALS)
                .with_field("material_name")
                .with_exclusion("电池", "电池盖"),
        )
        .with_example("查询电池的库存"),
        IntentRule::new(
            0,
            "检验结果查询",
            Category::Testing,
            format!(
                "SELECT {INSPECTION_COLUMNS} FROM inspection_records WHERE result = ? ORDER BY id"
            ),
        )
        .with_description("按合格/不合格筛选检验记录")
        .with_trigger_words(["检验结果", "检验"])
        .with_parameter(
            ParameterSpec::enumeration("result", ["合格", "不合格"])
                .with_alias("OK", "合格")
                .with_alias("pass", "合格")
                .with_alias("NG", "不合格")
                .with_alias("fail", "不合格"),
        )
        .with_priority(1)
        .with_example("检验结果为NG的批次"),
        IntentRule::new(
            0,
            "供应商不良",
            Category::Testing,
            format!(
                "SELECT {INSPECTION_COLUMNS} FROM inspection_records \
                 WHERE supplier = ? AND result = '不合格' ORDER BY id"
            ),
        )
        .with_description("某供应商的不合格检验记录")
        .with_trigger_words(["不良", "缺陷"])
        .with_parameter(ParameterSpec::literal("supplier", SUPPLIERS))
        .with_example("BOE的不良批次"),
        IntentRule::new(
            0,
            "近期检验",
            Category::Testing,
            format!(
                "SELECT {INSPECTION_COLUMNS} FROM inspection_records \
                 WHERE inspected_on >= ? ORDER BY inspected_on"
            ),
        )
        .with_description("某日期以来的检验记录")
        .with_trigger_words(["以来", "之后"])
        .with_parameter(
            ParameterSpec::regex("since", r"(\d{4}[-/]\d{1,2}(?:[-/]\d{1,2})?)")
                .with_type(ValueType::Date)
                .with_field("inspected_on"),
        )
        .with_example("2024-03-05以来的检验"),
        IntentRule::new(
            0,
            "产线状态",
            Category::Production,
            "SELECT line, product_model, material_name, supplier, status, quantity, online_on \
             FROM production_records WHERE line = ? ORDER BY id",
        )
        .with_description("某条产线上的物料与状态")
        .with_trigger_words(["产线", "线体"])
        .with_parameter(
            ParameterSpec::literal("line", ["L1", "L2", "L3"])
                .with_fallback_pattern(r"(?i)(L\d+)"),
        )
        .with_example("L1产线状态"),
        IntentRule::new(
            0,
            "供应商对比",
            Category::Comparison,
            "SELECT supplier, COUNT(*) AS batches, SUM(quantity) AS total_quantity \
             FROM inventory_records GROUP BY supplier ORDER BY supplier",
        )
        .with_description("各供应商库存批次与数量对比")
        .with_trigger_words(["供应商", "对比"])
        .with_example("对比各供应商库存"),
        IntentRule::new(
            0,
            "不良类型分布",
            Category::Exploration,
            "SELECT defect_type, COUNT(*) AS batches, SUM(defect_count) AS defects \
             FROM inspection_records WHERE result = '不合格' \
             GROUP BY defect_type ORDER BY batches DESC",
        )
        .with_description("不合格批次的缺陷类型分布")
        .with_trigger_words(["不良类型", "分布"])
        .with_example("不良类型分布"),
    ]
}

/// Save demo rules whose names are not stored yet. Returns how many were added.
pub async fn seed_rules(store: &RuleStore) -> anyhow::Result<usize> {
    let existing = store.list_rules().await?;
    let mut added = 0;
    for rule in demo_rules() {
        if existing.iter().any(|r| r.name == rule.name) {
            continue;
        }
        store.save_rule(&rule).await?;
        added += 1;
    }
    info!("Seeded {added} demo rules");
    Ok(added)
}

fn inventory(
    code: &str,
    material: &str,
    supplier: &str,
    batch: &str,
    quantity: i32,
    status: &str,
    warehouse: &str,
) -> inventory_records::ActiveModel {
    inventory_records::ActiveModel {
        material_code: Set(code.to_string()),
        material_name: Set(material.to_string()),
        supplier: Set(supplier.to_string()),
        batch_no: Set(batch.to_string()),
        quantity: Set(quantity),
        status: Set(status.to_string()),
        warehouse: Set(warehouse.to_string()),
        updated_on: Set("2024-03-10".to_string()),
        ..Default::default()
    }
}

#[allow(clippy::too_many_arguments)]
fn inspection(
    batch: &str,
    material: &str,
    supplier: &str,
    inspector: &str,
    result: &str,
    defect: Option<&str>,
    defects: i32,
    on: &str,
) -> inspection_records::ActiveModel {
    inspection_records::ActiveModel {
        material_name: Set(material.to_string()),
        supplier: Set(supplier.to_string()),
        batch_no: Set(batch.to_string()),
        inspector: Set(inspector.to_string()),
        result: Set(result.to_string()),
        defect_type: Set(defect.map(str::to_string)),
        defect_count: Set(defects),
        inspected_on: Set(on.to_string()),
        ..Default::default()
    }
}

fn production(
    line: &str,
    model: &str,
    material: &str,
    supplier: &str,
    status: &str,
    quantity: i32,
    on: &str,
) -> production_records::ActiveModel {
    production_records::ActiveModel {
        line: Set(line.to_string()),
        product_model: Set(model.to_string()),
        material_name: Set(material.to_string()),
        supplier: Set(supplier.to_string()),
        status: Set(status.to_string()),
        quantity: Set(quantity),
        online_on: Set(on.to_string()),
        ..Default::default()
    }
}

/// Insert sample records into empty record tables. Returns rows inserted.
pub async fn seed_records(db: &DatabaseConnection) -> anyhow::Result<usize> {
    let mut inserted = 0;

    if inventory_records::Entity::find().count(db).await? == 0 {
        let rows = vec![
            inventory("M-001", "电池", "聚龙", "B001", 120, "在库", "A区"),
            inventory("M-002", "电池盖", "聚龙", "B002", 80, "在库", "A区"),
            inventory("M-003", "屏幕", "BOE", "B003", 60, "在库", "B区"),
            inventory("M-001", "电池", "BOE", "B004", 40, "冻结", "B区"),
            inventory("M-005", "外壳", "天马", "B005", 200, "在库", "C区"),
            inventory("M-002", "电池盖", "BOE", "B006", 30, "在库", "A区"),
        ];
        inserted += rows.len();
        inventory_records::Entity::insert_many(rows).exec(db).await?;
    }

    if inspection_records::Entity::find().count(db).await? == 0 {
        let rows = vec![
            inspection("B003", "屏幕", "BOE", "张三", "合格", None, 0, "2024-03-01"),
            inspection("B001", "电池", "聚龙", "李四", "不合格", Some("划伤"), 3, "2024-03-02"),
            inspection("B006", "电池盖", "BOE", "张三", "不合格", Some("尺寸偏差"), 5, "2024-03-05"),
            inspection("B005", "外壳", "天马", "王五", "合格", None, 0, "2024-03-08"),
            inspection("B004", "电池", "BOE", "李四", "不合格", Some("划伤"), 2, "2024-03-10"),
        ];
        inserted += rows.len();
        inspection_records::Entity::insert_many(rows).exec(db).await?;
    }

    if production_records::Entity::find().count(db).await? == 0 {
        let rows = vec![
            production("L1", "P10", "屏幕", "BOE", "在线", 50, "2024-03-03"),
            production("L1", "P10", "电池", "聚龙", "在线", 40, "2024-03-04"),
            production("L2", "P20", "外壳", "天马", "停线", 0, "2024-03-09"),
        ];
        inserted += rows.len();
        production_records::Entity::insert_many(rows).exec(db).await?;
    }

    info!("Seeded {inserted} sample records");
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::validate_rule;

    #[test]
    fn demo_rules_are_valid_and_uniquely_named() {
        let rules = demo_rules();
        for rule in &rules {
            assert_eq!(validate_rule(rule), Ok(()), "rule {}", rule.name);
        }
        let mut names: Vec<&str> = rules.iter().map(|r| r.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), rules.len());
    }
}
