use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::PgPool;
use std::str::FromStr;

use crate::error::{AppError, AppResult};

/// Catalog tables reachable through the generic store. A closed enum, so
/// table names can never come from request input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogTable {
    Properties,
    PropertyCards,
    PointsOfInterest,
}

impl CatalogTable {
    pub fn as_sql(&self) -> &'static str {
        match self {
            CatalogTable::Properties => "properties",
            CatalogTable::PropertyCards => "property_cards",
            CatalogTable::PointsOfInterest => "points_of_interest",
        }
    }
}

impl FromStr for CatalogTable {
    type Err = ();

    /// URL segment → table.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "properties" => Ok(CatalogTable::Properties),
            "property-cards" => Ok(CatalogTable::PropertyCards),
            "points-of-interest" => Ok(CatalogTable::PointsOfInterest),
            _ => Err(()),
        }
    }
}

/// A catalog record as it crosses the boundary: a string id (regardless of
/// the numeric id inside the store) with the payload fields flattened in.
#[derive(Debug, Serialize)]
pub struct Record {
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    pub(crate) fn from_row(id: i64, data: Value) -> Self {
        let fields = match data {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            id: id.to_string(),
            fields,
        }
    }
}

/// Generic CRUD over one catalog entity. The account core never depends on
/// concrete catalog types, only on this contract.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn list(&self, filter: Option<Value>) -> AppResult<Vec<Record>>;
    async fn get(&self, id: &str) -> AppResult<Record>;
    async fn create(&self, payload: Value) -> AppResult<Record>;
    async fn update(&self, id: &str, patch: Value) -> AppResult<Record>;
    async fn delete(&self, id: &str) -> AppResult<()>;
}

/// Postgres-backed store over one `(id BIGSERIAL, data JSONB)` table.
pub struct PgResourceStore {
    db: PgPool,
    table: CatalogTable,
}

impl PgResourceStore {
    pub fn new(db: PgPool, table: CatalogTable) -> Self {
        Self { db, table }
    }

    fn parse_id(id: &str) -> AppResult<i64> {
        id.parse::<i64>()
            .map_err(|_| AppError::validation("Invalid resource id."))
    }

    fn require_object(payload: &Value) -> AppResult<()> {
        if !payload.is_object() {
            return Err(AppError::validation("Payload must be a JSON object."));
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceStore for PgResourceStore {
    async fn list(&self, filter: Option<Value>) -> AppResult<Vec<Record>> {
        let table = self.table.as_sql();
        let rows: Vec<(i64, Value)> = match filter {
            Some(filter) => {
                Self::require_object(&filter)?;
                sqlx::query_as(&format!(
                    "SELECT id, data FROM {table} WHERE data @> $1 ORDER BY id DESC"
                ))
                .bind(filter)
                .fetch_all(&self.db)
                .await?
            }
            None => {
                sqlx::query_as(&format!("SELECT id, data FROM {table} ORDER BY id DESC"))
                    .fetch_all(&self.db)
                    .await?
            }
        };
        Ok(rows
            .into_iter()
            .map(|(id, data)| Record::from_row(id, data))
            .collect())
    }

    async fn get(&self, id: &str) -> AppResult<Record> {
        let id = Self::parse_id(id)?;
        let row: Option<(i64, Value)> = sqlx::query_as(&format!(
            "SELECT id, data FROM {} WHERE id = $1",
            self.table.as_sql()
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        let (id, data) = row.ok_or(AppError::NotFound)?;
        Ok(Record::from_row(id, data))
    }

    async fn create(&self, payload: Value) -> AppResult<Record> {
        Self::require_object(&payload)?;
        let (id, data): (i64, Value) = sqlx::query_as(&format!(
            "INSERT INTO {} (data) VALUES ($1) RETURNING id, data",
            self.table.as_sql()
        ))
        .bind(payload)
        .fetch_one(&self.db)
        .await?;
        Ok(Record::from_row(id, data))
    }

    /// Apply only the fields present in `patch`; absent fields keep their
    /// stored values.
    async fn update(&self, id: &str, patch: Value) -> AppResult<Record> {
        let id = Self::parse_id(id)?;
        Self::require_object(&patch)?;
        let row: Option<(i64, Value)> = sqlx::query_as(&format!(
            "UPDATE {} SET data = data || $1 WHERE id = $2 RETURNING id, data",
            self.table.as_sql()
        ))
        .bind(patch)
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        let (id, data) = row.ok_or(AppError::NotFound)?;
        Ok(Record::from_row(id, data))
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let id = Self::parse_id(id)?;
        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE id = $1",
            self.table.as_sql()
        ))
        .bind(id)
        .execute(&self.db)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn url_segments_map_to_tables() {
        assert_eq!("properties".parse(), Ok(CatalogTable::Properties));
        assert_eq!("property-cards".parse(), Ok(CatalogTable::PropertyCards));
        assert_eq!(
            "points-of-interest".parse(),
            Ok(CatalogTable::PointsOfInterest)
        );
        assert!("accounts".parse::<CatalogTable>().is_err());
        assert!("users; DROP TABLE users".parse::<CatalogTable>().is_err());
    }

    #[test]
    fn record_serializes_with_string_id_and_flattened_fields() {
        let record = Record::from_row(42, json!({ "name": "Sea View Loft", "beds": 3 }));
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["id"], json!("42"));
        assert_eq!(value["name"], json!("Sea View Loft"));
        assert_eq!(value["beds"], json!(3));
    }

    #[test]
    fn non_object_payload_is_tolerated_on_read() {
        let record = Record::from_row(1, json!("scalar"));
        assert!(record.fields.is_empty());
    }

    #[test]
    fn invalid_ids_are_rejected_before_the_store() {
        assert!(PgResourceStore::parse_id("17").is_ok());
        assert!(PgResourceStore::parse_id("abc").is_err());
        assert!(PgResourceStore::parse_id("").is_err());
    }
}
