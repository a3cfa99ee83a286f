//! Database setup and the record store behind compiled templates.

use std::collections::BTreeMap;

use async_trait::async_trait;
use inspecta_core::{BoundQuery, BoundValue, PlaceholderStyle, QueryResult, RecordStore};
use inspecta_entities::{
    RECORD_TABLES, inspection_records, intent_rules, inventory_records, production_records,
};
use sea_orm::{
    ConnectionTrait, Database, DatabaseConnection, DbBackend, DbErr, EntityName, EntityTrait,
    FromQueryResult, JsonValue, Schema, Statement, Value,
};
use tracing::{debug, info};

fn is_table_already_exists_error(err: &DbErr) -> bool {
    err.to_string().contains("table") && err.to_string().contains("already exists")
}

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) -> anyhow::Result<()> {
    let name = entity.table_name().to_string();
    let backend = db.get_database_backend();
    let stmt = Schema::new(backend).create_table_from_entity(entity);
    match db.execute_unprepared(&backend.build(&stmt).to_string()).await {
        Ok(_) => {
            debug!("Created table {name}");
            Ok(())
        }
        Err(e) if is_table_already_exists_error(&e) => {
            debug!("Table {name} already exists, skipping creation");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Create the rule catalog and record family tables when missing.
pub async fn ensure_schema(db: &DatabaseConnection) -> anyhow::Result<()> {
    create_table(db, intent_rules::Entity).await?;
    create_table(db, inventory_records::Entity).await?;
    create_table(db, inspection_records::Entity).await?;
    create_table(db, production_records::Entity).await?;
    info!("Database schema ready");
    Ok(())
}

pub async fn connect(database_url: &str) -> anyhow::Result<DatabaseConnection> {
    info!("Connecting to database");
    let db = Database::connect(database_url).await?;
    ensure_schema(&db).await?;
    Ok(db)
}

/// Executes bound templates with positional data parameters.
#[derive(Clone)]
pub struct SqlRecordStore {
    db: DatabaseConnection,
}

impl SqlRecordStore {
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    #[must_use]
    pub const fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

fn to_db_value(value: &BoundValue) -> Value {
    match value {
        BoundValue::Text(s) => Value::from(s.clone()),
        BoundValue::Number(n) => Value::from(*n),
        BoundValue::Null => Value::String(None),
    }
}

#[async_trait]
impl RecordStore for SqlRecordStore {
    fn placeholder_style(&self) -> PlaceholderStyle {
        match self.db.get_database_backend() {
            DbBackend::Postgres => PlaceholderStyle::Numbered,
            _ => PlaceholderStyle::Question,
        }
    }

    async fn fetch(&self, query: &BoundQuery) -> anyhow::Result<QueryResult> {
        let stmt = Statement::from_sql_and_values(
            self.db.get_database_backend(),
            query.sql.as_str(),
            query.values.iter().map(to_db_value),
        );
        let rows = self.db.query_all(stmt).await?;

        let fields = rows.first().map(|r| r.column_names()).unwrap_or_default();
        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let JsonValue::Object(mut decoded) = JsonValue::from_query_result(row, "")? else {
                anyhow::bail!("rule {}: row did not decode to an object", query.rule_id);
            };
            for field in &fields {
                decoded.entry(field.clone()).or_insert(JsonValue::Null);
            }
            out.push(decoded);
        }

        Ok(QueryResult::new(fields, out))
    }

    async fn family_counts(&self) -> anyhow::Result<BTreeMap<String, i64>> {
        let backend = self.db.get_database_backend();
        let mut counts = BTreeMap::new();
        for table in RECORD_TABLES {
            let stmt =
                Statement::from_string(backend, format!("SELECT COUNT(*) AS n FROM {table}"));
            let n = match self.db.query_one(stmt).await? {
                Some(row) => row.try_get::<i64>("", "n")?,
                None => 0,
            };
            counts.insert(table.to_string(), n);
        }
        Ok(counts)
    }
}
