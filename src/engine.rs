//! Execution engine.
//!
//! Runs any compiled statement against PostgreSQL through a sqlx pool, binding the
//! argument list positionally.

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Postgres, Row as _, TypeInfo};

use crate::config::Config;
use crate::error::{QxError, QxResult};
use crate::transpiler::ToSql;
use crate::value::Value;

/// A result row: column names with JSON values, in select-list order.
pub type Row = Vec<(String, serde_json::Value)>;

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// A PostgreSQL connection pool.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect with the default pool size.
    ///
    /// ```rust,ignore
    /// let db = Database::connect("postgres://localhost/app").await?;
    /// ```
    pub async fn connect(url: &str) -> QxResult<Self> {
        Self::open(url, Config::default().database.max_connections).await
    }

    /// Connect using `database.url` and `database.max_connections`.
    pub async fn connect_with(config: &Config) -> QxResult<Self> {
        let url = config.database.url.as_deref().ok_or_else(|| {
            QxError::Config("database.url is not set (use --database-url or QX_DATABASE_URL)".into())
        })?;
        Self::open(url, config.database.max_connections).await
    }

    async fn open(url: &str, max_connections: u32) -> QxResult<Self> {
        tracing::debug!(max_connections, "connecting to database");
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| QxError::Connection(e.to_string()))?;
        tracing::info!("connected to database");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run `query` and return every row.
    pub async fn fetch_all(&self, query: &impl ToSql) -> QxResult<Vec<Row>> {
        let (sql, args) = query.to_sql();
        let prepared = bind_all(sqlx::query(&sql), &args)?;
        let rows = prepared
            .fetch_all(&self.pool)
            .await
            .map_err(|e| QxError::Execution(e.to_string()))?;
        tracing::debug!(rows = rows.len(), "query executed");
        Ok(rows.iter().map(row_to_columns).collect())
    }

    /// Run `query` and return the first row, if any.
    pub async fn fetch_optional(&self, query: &impl ToSql) -> QxResult<Option<Row>> {
        let (sql, args) = query.to_sql();
        let prepared = bind_all(sqlx::query(&sql), &args)?;
        let row = prepared
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| QxError::Execution(e.to_string()))?;
        Ok(row.as_ref().map(row_to_columns))
    }
}

fn bind_all<'q>(mut query: PgQuery<'q>, args: &'q [Value]) -> QxResult<PgQuery<'q>> {
    for arg in args {
        query = bind_value(query, arg)?;
    }
    Ok(query)
}

/// Bind one argument. PostgreSQL has no unsigned integers, so `UInt` is sent as
/// BIGINT and must fit in it.
fn bind_value<'q>(query: PgQuery<'q>, value: &'q Value) -> QxResult<PgQuery<'q>> {
    Ok(match value {
        // Sent as a TEXT-typed NULL. Compare against non-text columns with an
        // explicit cast in the statement (`int_col = ?::INT`), or use IS NULL.
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Int(n) => query.bind(*n),
        Value::UInt(n) => {
            let n = i64::try_from(*n)
                .map_err(|_| QxError::InvalidValue(format!("{} is out of range for BIGINT", n)))?;
            query.bind(n)
        }
        Value::Float(f) => query.bind(*f),
        Value::String(s) => query.bind(s.as_str()),
        Value::Timestamp(ts) => query.bind(*ts),
        Value::Bytes(bytes) => query.bind(bytes.as_slice()),
    })
}

/// Convert a row by column type name; unknown types are read as text.
fn row_to_columns(row: &PgRow) -> Row {
    use serde_json::Value as Json;

    row.columns()
        .iter()
        .enumerate()
        .map(|(i, column)| {
            let value = match column.type_info().name() {
                "BOOL" => row.try_get::<Option<bool>, _>(i).ok().flatten().map(Json::Bool),
                "INT2" => row.try_get::<Option<i16>, _>(i).ok().flatten().map(Json::from),
                "INT4" => row.try_get::<Option<i32>, _>(i).ok().flatten().map(Json::from),
                "INT8" => row.try_get::<Option<i64>, _>(i).ok().flatten().map(Json::from),
                "FLOAT4" => row
                    .try_get::<Option<f32>, _>(i)
                    .ok()
                    .flatten()
                    .map(|v| Json::from(f64::from(v))),
                "FLOAT8" => row.try_get::<Option<f64>, _>(i).ok().flatten().map(Json::from),
                "TIMESTAMPTZ" => row
                    .try_get::<Option<DateTime<Utc>>, _>(i)
                    .ok()
                    .flatten()
                    .map(|ts| Json::String(ts.to_rfc3339())),
                _ => row.try_get::<Option<String>, _>(i).ok().flatten().map(Json::String),
            };
            (column.name().to_string(), value.unwrap_or(Json::Null))
        })
        .collect()
}
