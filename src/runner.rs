//! Execution of rendered SQL.
//!
//! Rendered templates are complete statements with every value inlined, so
//! they run without bind parameters.

use sqlx::any::{AnyPoolOptions, AnyRow};
use serde_json::{Map, Number, Value};
use sqlx::{AnyPool, Column, Row, TypeInfo};
use tracing::debug;

use crate::error::{TemplateError, TemplateResult};

/// A fetched row keyed by column name, in column-name order.
pub type RowMap = Map<String, Value>;

/// A database connection for running rendered templates.
#[derive(Clone)]
pub struct SqlRunner {
    pool: AnyPool,
}

impl SqlRunner {
    /// Connect to a database using a connection URL.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let runner = SqlRunner::connect("postgres://localhost/mydb").await?;
    /// let rows = runner.fetch_all(&sql).await?;
    /// ```
    pub async fn connect(url: &str) -> TemplateResult<Self> {
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await
            .map_err(|e| TemplateError::Connection(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Run a query and return its rows as JSON objects.
    pub async fn fetch_all(&self, sql: &str) -> TemplateResult<Vec<RowMap>> {
        debug!(sql, "fetching rows");
        let rows: Vec<AnyRow> = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| TemplateError::Execution(e.to_string()))?;

        Ok(rows.iter().map(row_to_json).collect())
    }

    /// Run a statement and return the number of affected rows.
    pub async fn execute(&self, sql: &str) -> TemplateResult<u64> {
        debug!(sql, "executing statement");
        let result = sqlx::query(sql)
            .execute(&self.pool)
            .await
            .map_err(|e| TemplateError::Execution(e.to_string()))?;

        Ok(result.rows_affected())
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }
}

fn row_to_json(row: &AnyRow) -> RowMap {
    row.columns()
        .iter()
        .map(|column| {
            let value = column_value(row, column.ordinal(), column.type_info().name());
            (column.name().to_string(), value)
        })
        .collect()
}

/// Decode one column; SQL `NULL` and undecodable values become JSON `null`.
fn column_value(row: &AnyRow, index: usize, type_name: &str) -> Value {
    let decoded = match type_name.to_ascii_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => row.try_get::<Option<bool>, _>(index).map(|v| v.map(Value::Bool)),
        name if name.starts_with("INT") || name.ends_with("INT") => {
            row.try_get::<Option<i64>, _>(index).map(|v| v.map(Value::from))
        }
        "FLOAT4" | "FLOAT8" | "REAL" | "DOUBLE" => row
            .try_get::<Option<f64>, _>(index)
            .map(|v| v.and_then(Number::from_f64).map(Value::Number)),
        _ => row.try_get::<Option<String>, _>(index).map(|v| v.map(Value::String)),
    };

    match decoded {
        Ok(value) => value.unwrap_or(Value::Null),
        Err(e) => {
            debug!(index, type_name, "column not decodable: {}", e);
            Value::Null
        }
    }
}
