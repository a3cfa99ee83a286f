//! sea-orm entities: the rule catalog and the three record families.

pub mod inspection_records;
pub mod intent_rules;
pub mod inventory_records;
pub mod production_records;

/// Record family tables reachable through retrieval templates.
pub const RECORD_TABLES: [&str; 3] = [
    "inventory_records",
    "inspection_records",
    "production_records",
];
