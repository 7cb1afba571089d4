use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{
    postgres::{PgArguments, PgPoolOptions, PgRow},
    query::Query,
    types::Json,
    PgPool, Postgres, Row,
};
use tracing::debug;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::store::{
    Collection, DeleteResult, Document, DocumentStore, InsertOneResult, UpdateResult,
};
use crate::filter::{Filter, FilterError, SqlParam, Update, ID_FIELD};

/// Document store on Postgres: one `(seq, id, doc JSONB)` table per collection.
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub async fn connect(connection_string: &str, config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(connection_string)
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        let store = Self::from_pool(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create collection tables if missing
    pub async fn ensure_schema(&self) -> Result<(), DatabaseError> {
        for collection in Collection::ALL {
            let sql = format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    \"seq\" BIGSERIAL,
                    \"id\" UUID PRIMARY KEY,
                    \"doc\" JSONB NOT NULL DEFAULT '{{}}'::jsonb,
                    \"created_at\" TIMESTAMPTZ NOT NULL DEFAULT now()
                )",
                table(collection)
            );
            sqlx::query(&sql).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn select(
        &self,
        collection: Collection,
        filter: &Filter,
        limit: Option<u32>,
    ) -> Result<Vec<Document>, DatabaseError> {
        let where_sql = filter.to_where_sql();
        let mut sql = format!(
            "SELECT \"id\", \"doc\" FROM {} WHERE {} ORDER BY \"seq\"",
            table(collection),
            where_sql.query
        );
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        debug!("find {}: {}", collection.name(), sql);

        let mut q = sqlx::query(&sql);
        for p in where_sql.params.iter() {
            q = bind_param(q, p);
        }
        let rows = q.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_document).collect()
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Document>, DatabaseError> {
        self.select(collection, filter, None).await
    }

    async fn find_one(&self, collection: Collection, filter: &Filter) -> Result<Option<Document>, DatabaseError> {
        Ok(self.select(collection, filter, Some(1)).await?.into_iter().next())
    }

    async fn insert_one(&self, collection: Collection, mut doc: Document) -> Result<InsertOneResult, DatabaseError> {
        doc.remove(ID_FIELD);
        let id = Uuid::new_v4();
        let body = Value::Object(doc);

        let sql = format!("INSERT INTO {} (\"id\", \"doc\") VALUES ($1, $2)", table(collection));
        sqlx::query(&sql)
            .bind(id)
            .bind(Json(&body))
            .execute(&self.pool)
            .await?;

        Ok(InsertOneResult {
            acknowledged: true,
            inserted_id: id.to_string(),
        })
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &Update,
    ) -> Result<UpdateResult, DatabaseError> {
        if update.is_empty() {
            return Err(FilterError::InvalidUpdate("update document is empty".to_string()).into());
        }

        let where_sql = filter.to_where_sql();
        let set_sql = update.to_sql_expr(where_sql.params.len());
        let table = table(collection);

        // Matched and modified are counted separately so a no-op write is visible.
        let sql = format!(
            "WITH target AS (SELECT \"id\" FROM {table} WHERE {cond} ORDER BY \"seq\" LIMIT 1), \
             updated AS (UPDATE {table} SET \"doc\" = {expr} \
                 WHERE \"id\" IN (SELECT \"id\" FROM target) AND \"doc\" IS DISTINCT FROM {expr} \
                 RETURNING \"id\") \
             SELECT (SELECT COUNT(*) FROM target) AS matched, (SELECT COUNT(*) FROM updated) AS modified",
            table = table,
            cond = where_sql.query,
            expr = set_sql.query,
        );
        debug!("update {}: {}", collection.name(), sql);

        let mut q = sqlx::query(&sql);
        for p in where_sql.params.iter().chain(set_sql.params.iter()) {
            q = bind_param(q, p);
        }
        let row = q.fetch_one(&self.pool).await?;
        let matched: i64 = row.try_get("matched")?;
        let modified: i64 = row.try_get("modified")?;

        Ok(UpdateResult::new(matched.max(0) as u64, modified.max(0) as u64))
    }

    async fn delete_one(&self, collection: Collection, filter: &Filter) -> Result<DeleteResult, DatabaseError> {
        let where_sql = filter.to_where_sql();
        let table = table(collection);
        let sql = format!(
            "DELETE FROM {table} WHERE \"id\" IN (SELECT \"id\" FROM {table} WHERE {cond} ORDER BY \"seq\" LIMIT 1)",
            table = table,
            cond = where_sql.query,
        );

        let mut q = sqlx::query(&sql);
        for p in where_sql.params.iter() {
            q = bind_param(q, p);
        }
        let result = q.execute(&self.pool).await?;

        Ok(DeleteResult {
            acknowledged: true,
            deleted_count: result.rows_affected(),
        })
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

fn table(collection: Collection) -> String {
    DatabaseManager::quote_identifier(collection.name())
}

fn row_to_document(row: &PgRow) -> Result<Document, DatabaseError> {
    let id: Uuid = row.try_get("id")?;
    let doc: Value = row.try_get("doc")?;

    let mut document = match doc {
        Value::Object(map) => map,
        _ => Document::new(),
    };
    document.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
    Ok(document)
}

fn bind_param<'q>(
    q: Query<'q, Postgres, PgArguments>,
    p: &'q SqlParam,
) -> Query<'q, Postgres, PgArguments> {
    match p {
        SqlParam::Uuid(id) => q.bind(*id),
        SqlParam::Text(s) => q.bind(s.as_str()),
        SqlParam::Json(v) => q.bind(Json(v)),
        SqlParam::Int(i) => q.bind(*i),
    }
}
