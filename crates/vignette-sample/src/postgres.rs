use std::path::Path;

use async_trait::async_trait;
use sqlx::{PgPool, Row as _};
use tracing::trace;

use crate::errors::{Result, SampleError};
use crate::query::{SampleQuery, quote_ident, quote_literal, render_sql};
use crate::transport::{DataTransport, Row};

const INSERT_BATCH: usize = 500;

/// Transport backed by sqlx Postgres pools.
#[derive(Debug, Clone)]
pub struct PgTransport {
    pool: PgPool,
}

impl PgTransport {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_batch(
        &self,
        table: &str,
        columns: &[String],
        records: &[csv::StringRecord],
    ) -> Result<u64> {
        let column_list: Vec<String> = columns.iter().map(|name| quote_ident(name)).collect();
        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ",
            quote_ident(table),
            column_list.join(", ")
        );

        // Values travel as string literals; Postgres coerces them against
        // the destination column types. Empty CSV fields load as NULL.
        let mut tuples = Vec::with_capacity(records.len());
        for record in records {
            let values: Vec<String> = record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        "NULL".to_string()
                    } else {
                        quote_literal(field)
                    }
                })
                .collect();
            tuples.push(format!("({})", values.join(", ")));
        }
        sql.push_str(&tuples.join(", "));

        let result = sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|err| SampleError::Load {
                table: table.to_string(),
                message: err.to_string(),
            })?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl DataTransport for PgTransport {
    async fn stream_query(&self, query: &SampleQuery) -> Result<Vec<Row>> {
        let sql = render_sql(query);
        trace!(table = %query.table, %sql, "executing extraction query");

        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|err| SampleError::Query {
                table: query.table.clone(),
                message: err.to_string(),
            })?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let mut record: Row = Vec::with_capacity(query.columns.len());
            for index in 0..query.columns.len() {
                let value: Option<String> =
                    row.try_get(index).map_err(|err| SampleError::Query {
                        table: query.table.clone(),
                        message: err.to_string(),
                    })?;
                record.push(value);
            }
            out.push(record);
        }
        Ok(out)
    }

    async fn bulk_load(&self, table: &str, artifact: &Path) -> Result<u64> {
        let mut reader = csv::Reader::from_path(artifact)?;
        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut loaded = 0;
        let mut batch: Vec<csv::StringRecord> = Vec::new();
        for record in reader.records() {
            batch.push(record?);
            if batch.len() == INSERT_BATCH {
                loaded += self.insert_batch(table, &columns, &batch).await?;
                batch.clear();
            }
        }
        if !batch.is_empty() {
            loaded += self.insert_batch(table, &columns, &batch).await?;
        }
        Ok(loaded)
    }
}
