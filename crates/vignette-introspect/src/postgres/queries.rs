use sqlx::PgPool;

use vignette_core::Result;

fn db_err(err: sqlx::Error) -> vignette_core::Error {
    vignette_core::Error::Db(err.to_string())
}

pub async fn fetch_database_name(pool: &PgPool) -> Result<String> {
    sqlx::query_scalar::<_, String>("select current_database()")
        .fetch_one(pool)
        .await
        .map_err(db_err)
}

#[derive(Debug, sqlx::FromRow)]
pub struct RawTable {
    pub name: String,
    pub relkind: i8,
}

pub async fn list_tables(pool: &PgPool, schema: &str) -> Result<Vec<RawTable>> {
    sqlx::query_as::<_, RawTable>(
        r#"
        select c.relname::text as name,
               c.relkind as relkind
        from pg_class c
        join pg_namespace n on n.oid = c.relnamespace
        where n.nspname = $1
          and c.relkind in ('r', 'p')
        order by c.relname
        "#,
    )
    .bind(schema)
    .fetch_all(pool)
    .await
    .map_err(db_err)
}

#[derive(Debug, sqlx::FromRow)]
pub struct RawColumn {
    pub ordinal_position: i16,
    pub name: String,
    pub data_type: String,
    pub is_nullable: bool,
}

pub async fn list_columns(pool: &PgPool, schema: &str, table: &str) -> Result<Vec<RawColumn>> {
    sqlx::query_as::<_, RawColumn>(
        r#"
        select a.attnum as ordinal_position,
               a.attname::text as name,
               t.typname::text as data_type,
               (not a.attnotnull) as is_nullable
        from pg_attribute a
        join pg_class c on c.oid = a.attrelid
        join pg_namespace n on n.oid = c.relnamespace
        join pg_type t on t.oid = a.atttypid
        where n.nspname = $1
          and c.relname = $2
          and a.attnum > 0
          and not a.attisdropped
        order by a.attnum
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(db_err)
}

pub async fn primary_key_columns(
    pool: &PgPool,
    schema: &str,
    table: &str,
) -> Result<Vec<String>> {
    sqlx::query_scalar::<_, String>(
        r#"
        select a.attname::text
        from pg_constraint con
        join pg_class c on c.oid = con.conrelid
        join pg_namespace n on n.oid = c.relnamespace
        cross join lateral unnest(con.conkey) with ordinality as k(attnum, ord)
        join pg_attribute a on a.attrelid = c.oid and a.attnum = k.attnum
        where n.nspname = $1
          and c.relname = $2
          and con.contype = 'p'
        order by k.ord
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(db_err)
}

#[derive(Debug, sqlx::FromRow)]
pub struct RawForeignKey {
    pub constraint_name: String,
    pub column_name: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

/// One row per referencing-column pair; composite constraints come back as
/// several rows in key order.
pub async fn list_foreign_keys(
    pool: &PgPool,
    schema: &str,
    table: &str,
) -> Result<Vec<RawForeignKey>> {
    sqlx::query_as::<_, RawForeignKey>(
        r#"
        select con.conname::text as constraint_name,
               a.attname::text as column_name,
               rc.relname::text as referenced_table,
               ra.attname::text as referenced_column
        from pg_constraint con
        join pg_class c on c.oid = con.conrelid
        join pg_namespace n on n.oid = c.relnamespace
        join pg_class rc on rc.oid = con.confrelid
        cross join lateral unnest(con.conkey, con.confkey)
          with ordinality as k(attnum, fattnum, ord)
        join pg_attribute a on a.attrelid = c.oid and a.attnum = k.attnum
        join pg_attribute ra on ra.attrelid = rc.oid and ra.attnum = k.fattnum
        where n.nspname = $1
          and c.relname = $2
          and con.contype = 'f'
        order by con.conname, k.ord
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(db_err)
}
