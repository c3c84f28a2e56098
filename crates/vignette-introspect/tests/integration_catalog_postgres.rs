use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::env;

use vignette_introspect::{CatalogOptions, postgres};

const FIXTURE: &str = r#"
drop table if exists order_line;
drop table if exists "order";
drop table if exists account;

create table account (
  id bigserial primary key,
  email text not null
);

create table "order" (
  id bigserial primary key,
  account_id bigint references account (id),
  total numeric
);

create table order_line (
  id bigserial primary key,
  order_id bigint not null references "order" (id),
  sku text not null
);
"#;

fn database_url() -> Result<String> {
    env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .context("set TEST_DATABASE_URL or DATABASE_URL for integration tests")
}

async fn connect() -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(std::time::Duration::from_secs(10))
        .connect(&database_url()?)
        .await
        .context("connecting to Postgres")?;

    for statement in FIXTURE.split(';') {
        let sql = statement.trim();
        if sql.is_empty() {
            continue;
        }
        sqlx::query(sql)
            .execute(&pool)
            .await
            .with_context(|| format!("executing fixture statement: {sql}"))?;
    }

    Ok(pool)
}

#[tokio::test]
#[ignore = "requires a live Postgres; set TEST_DATABASE_URL"]
async fn snapshots_tables_keys_and_foreign_keys() -> Result<()> {
    let pool = connect().await?;

    let snapshot = postgres::snapshot(&pool, &CatalogOptions::default()).await?;

    let account = snapshot.table("account").context("account missing")?;
    assert_eq!(account.primary_key, vec!["id"]);
    assert!(account.foreign_keys.is_empty());
    assert_eq!(account.columns[0].name, "id");
    assert!(account.columns[0].is_primary_key);

    let order = snapshot.table("order").context("order missing")?;
    assert_eq!(order.foreign_keys.len(), 1);
    assert_eq!(order.foreign_keys[0].column, "account_id");
    assert_eq!(order.foreign_keys[0].referenced_table, "account");
    assert_eq!(order.foreign_keys[0].referenced_column, "id");

    let line = snapshot.table("order_line").context("order_line missing")?;
    assert_eq!(line.foreign_keys[0].referenced_table, "order");

    Ok(())
}
