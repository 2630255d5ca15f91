use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::{postgres::PgArguments, query::Query, PgPool, Postgres, Row};
use tracing::{debug, info};
use uuid::Uuid;

use super::aggregates::Aggregate;
use super::manager::{DatabaseError, DatabaseManager};
use super::schema::{format_timestamp, Collection, Document, FieldDef, Scalar, ScalarKind};
use super::store::{FindQuery, Store};
use crate::config::DatabaseConfig;
use crate::filter::{Filter, FilterError, FilterSpec, SqlParam, SqlResult};

/// Postgres-backed store. One table per collection, rows surfaced as JSON documents.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let pool = DatabaseManager::connect(config).await?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Creates the tables if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), DatabaseError> {
        for collection in Collection::ALL {
            for statement in Self::table_ddl(collection) {
                sqlx::query(&statement).execute(&self.pool).await?;
            }
        }
        info!("Database schema ready");
        Ok(())
    }

    fn table_ddl(collection: Collection) -> Vec<String> {
        let mut columns: Vec<String> = collection
            .fields()
            .iter()
            .map(|field| match field.name {
                "id" => "\"id\" UUID PRIMARY KEY".to_string(),
                "createdAt" => "\"createdAt\" TIMESTAMPTZ NOT NULL DEFAULT now()".to_string(),
                name => format!("\"{}\" {}", name, field.sql_type()),
            })
            .collect();
        for key in collection.unique_keys() {
            let cols: Vec<String> = key.iter().map(|c| format!("\"{}\"", c)).collect();
            columns.push(format!("UNIQUE ({})", cols.join(", ")));
        }

        let mut statements = vec![format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" ({})",
            collection.name(),
            columns.join(", ")
        )];
        if collection.column("bootcamp").is_some() {
            statements.push(format!(
                "CREATE INDEX IF NOT EXISTS \"{0}_bootcamp_idx\" ON \"{0}\" (\"bootcamp\")",
                collection.name()
            ));
        }
        statements
    }

    fn param_for(field: &FieldDef, value: &Value) -> Result<SqlParam, FilterError> {
        let invalid = || FilterError::InvalidValue {
            column: field.name.to_string(),
            reason: format!("expected {:?}", field.kind),
        };

        if field.list {
            return match value {
                Value::Null => Ok(SqlParam::List(field.kind, vec![])),
                Value::Array(items) => items
                    .iter()
                    .map(|v| field.kind.from_json(v).ok_or_else(invalid))
                    .collect::<Result<Vec<_>, _>>()
                    .map(|items| SqlParam::List(field.kind, items)),
                _ => Err(invalid()),
            };
        }
        if value.is_null() {
            return Ok(SqlParam::Null(field.kind));
        }
        field.kind.from_json(value).map(SqlParam::Value).ok_or_else(invalid)
    }

    /// Splits a document into quoted column names and their parameters.
    fn columns_and_params(
        collection: Collection,
        doc: &Document,
    ) -> Result<(Vec<String>, Vec<SqlParam>), DatabaseError> {
        let mut columns = Vec::with_capacity(doc.len());
        let mut params = Vec::with_capacity(doc.len());
        for (key, value) in doc {
            let field = collection
                .column(key)
                .ok_or_else(|| FilterError::InvalidColumn(format!("{}.{}", collection, key)))?;
            columns.push(format!("\"{}\"", field.name));
            params.push(Self::param_for(field, value)?);
        }
        Ok((columns, params))
    }

    /// Single statement that recomputes and stores a bootcamp average. `$1` is the bootcamp id.
    fn average_sql(aggregate: Aggregate) -> String {
        let (source, field) = aggregate.source();
        let target = aggregate.target_field();
        format!(
            "UPDATE \"{bootcamps}\" SET \"{target}\" = \
             (SELECT AVG(\"{field}\") FROM \"{source}\" WHERE \"bootcamp\" = $1) \
             WHERE \"id\" = $1 RETURNING \"{target}\" AS average",
            bootcamps = Collection::Bootcamps.name(),
            target = target,
            field = field,
            source = source.name(),
        )
    }

    async fn fetch_documents(&self, sql: &SqlResult) -> Result<Vec<Document>, DatabaseError> {
        debug!("SQL: {}", sql.query);
        let mut q = sqlx::query(&sql.query);
        for p in &sql.params {
            q = bind_param(q, p);
        }
        let rows = q.fetch_all(&self.pool).await.map_err(DatabaseError::from_sqlx)?;
        rows.into_iter()
            .map(|row| {
                let value: Value = row.try_get("row")?;
                match value {
                    Value::Object(map) => Ok(map),
                    _ => Err(DatabaseError::QueryError("unexpected row format".into())),
                }
            })
            .collect()
    }

    async fn fetch_one_document(&self, sql: &SqlResult) -> Result<Option<Document>, DatabaseError> {
        Ok(self.fetch_documents(sql).await?.into_iter().next())
    }
}

/// Wraps a data-modifying statement so the affected row comes back as a document.
fn returning_document(statement: String) -> String {
    format!(
        "WITH affected AS ({} RETURNING *) SELECT json_strip_nulls(row_to_json(affected)) AS row FROM affected",
        statement
    )
}

fn bind_param<'q>(q: Query<'q, Postgres, PgArguments>, param: &SqlParam) -> Query<'q, Postgres, PgArguments> {
    match param {
        SqlParam::Value(Scalar::Id(v)) => q.bind(*v),
        SqlParam::Value(Scalar::Text(v)) => q.bind(v.clone()),
        SqlParam::Value(Scalar::Number(v)) => q.bind(*v),
        SqlParam::Value(Scalar::Bool(v)) => q.bind(*v),
        SqlParam::Value(Scalar::Timestamp(v)) => q.bind(*v),
        SqlParam::Null(kind) => match kind {
            ScalarKind::Id => q.bind(None::<Uuid>),
            ScalarKind::Text => q.bind(None::<String>),
            ScalarKind::Number => q.bind(None::<f64>),
            ScalarKind::Boolean => q.bind(None::<bool>),
            ScalarKind::Timestamp => q.bind(None::<chrono::DateTime<Utc>>),
        },
        SqlParam::List(kind, items) => match kind {
            ScalarKind::Id => q.bind(
                items.iter().filter_map(|s| match s { Scalar::Id(v) => Some(*v), _ => None }).collect::<Vec<_>>(),
            ),
            ScalarKind::Text => q.bind(
                items.iter().filter_map(|s| match s { Scalar::Text(v) => Some(v.clone()), _ => None }).collect::<Vec<_>>(),
            ),
            ScalarKind::Number => q.bind(
                items.iter().filter_map(|s| match s { Scalar::Number(v) => Some(*v), _ => None }).collect::<Vec<_>>(),
            ),
            ScalarKind::Boolean => q.bind(
                items.iter().filter_map(|s| match s { Scalar::Bool(v) => Some(*v), _ => None }).collect::<Vec<_>>(),
            ),
            ScalarKind::Timestamp => q.bind(
                items.iter().filter_map(|s| match s { Scalar::Timestamp(v) => Some(*v), _ => None }).collect::<Vec<_>>(),
            ),
        },
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find(&self, collection: Collection, query: &FindQuery) -> Result<Vec<Document>, DatabaseError> {
        let mut filter = Filter::new(collection);
        filter
            .select(&query.select)
            .where_clause(&query.filter)
            .order(&query.sort)
            .limit(query.limit, query.skip);
        self.fetch_documents(&filter.to_sql()).await
    }

    async fn count(&self, collection: Collection, filter_spec: &FilterSpec) -> Result<u64, DatabaseError> {
        let mut filter = Filter::new(collection);
        filter.where_clause(filter_spec);
        let sql = filter.to_count_sql();

        let mut q = sqlx::query(&sql.query);
        for p in &sql.params {
            q = bind_param(q, p);
        }
        let row = q.fetch_one(&self.pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count.max(0) as u64)
    }

    async fn find_by_id(&self, collection: Collection, id: Uuid) -> Result<Option<Document>, DatabaseError> {
        let sql = SqlResult {
            query: format!(
                "SELECT json_strip_nulls(row_to_json(t)) AS row FROM \"{}\" t WHERE t.\"id\" = $1",
                collection.name()
            ),
            params: vec![SqlParam::Value(Scalar::Id(id))],
        };
        self.fetch_one_document(&sql).await
    }

    async fn create(&self, collection: Collection, mut doc: Document) -> Result<Document, DatabaseError> {
        if doc.get("id").map_or(true, Value::is_null) {
            doc.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
        }
        if !doc.contains_key("createdAt") {
            doc.insert("createdAt".into(), Value::String(format_timestamp(&Utc::now())));
        }

        let (columns, params) = Self::columns_and_params(collection, &doc)?;
        let placeholders: Vec<String> = (1..=params.len()).map(|i| format!("${}", i)).collect();
        let sql = SqlResult {
            query: returning_document(format!(
                "INSERT INTO \"{}\" ({}) VALUES ({})",
                collection.name(),
                columns.join(", "),
                placeholders.join(", ")
            )),
            params,
        };

        self.fetch_one_document(&sql)
            .await?
            .ok_or_else(|| DatabaseError::QueryError("insert returned no row".into()))
    }

    async fn update_by_id(
        &self,
        collection: Collection,
        id: Uuid,
        mut changes: Document,
    ) -> Result<Option<Document>, DatabaseError> {
        changes.remove("id");
        if changes.is_empty() {
            return self.find_by_id(collection, id).await;
        }

        let (columns, mut params) = Self::columns_and_params(collection, &changes)?;
        let assignments: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{} = ${}", column, i + 2))
            .collect();
        params.insert(0, SqlParam::Value(Scalar::Id(id)));

        let sql = SqlResult {
            query: returning_document(format!(
                "UPDATE \"{}\" SET {} WHERE \"id\" = $1",
                collection.name(),
                assignments.join(", ")
            )),
            params,
        };
        self.fetch_one_document(&sql).await
    }

    async fn delete_by_id(&self, collection: Collection, id: Uuid) -> Result<Option<Document>, DatabaseError> {
        let sql = SqlResult {
            query: returning_document(format!("DELETE FROM \"{}\" WHERE \"id\" = $1", collection.name())),
            params: vec![SqlParam::Value(Scalar::Id(id))],
        };
        self.fetch_one_document(&sql).await
    }

    async fn delete_many(&self, collection: Collection, filter_spec: &FilterSpec) -> Result<u64, DatabaseError> {
        let mut filter = Filter::new(collection);
        filter.where_clause(filter_spec);
        let sql = filter.to_delete_sql();

        let mut q = sqlx::query(&sql.query);
        for p in &sql.params {
            q = bind_param(q, p);
        }
        let result = q.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn refresh_average(&self, aggregate: Aggregate, bootcamp: Uuid) -> Result<Option<f64>, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        // Row lock first: the average below is then read after every earlier refresh committed
        sqlx::query(&format!(
            "SELECT 1 FROM \"{}\" WHERE \"id\" = $1 FOR UPDATE",
            Collection::Bootcamps.name()
        ))
        .bind(bootcamp)
        .execute(&mut *tx)
        .await?;
        let row = sqlx::query(&Self::average_sql(aggregate))
            .bind(bootcamp)
            .fetch_optional(&mut *tx)
            .await?;
        tx.commit().await?;

        match row {
            Some(row) => Ok(row.try_get::<Option<f64>, _>("average")?),
            None => Ok(None),
        }
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
