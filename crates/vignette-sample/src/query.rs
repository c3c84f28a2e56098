use vignette_core::KeyKind;

/// Declarative extraction query for one table.
///
/// Built by the sampler, rendered and executed by the transport, so tests
/// can evaluate restrictions structurally without parsing SQL.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleQuery {
    pub table: String,
    /// Every column of the table, declared order.
    pub columns: Vec<String>,
    /// Raw configured predicates, ANDed verbatim.
    pub conditions: Vec<String>,
    /// One restriction per foreign-key column, ANDed.
    pub restrictions: Vec<KeyRestriction>,
    /// Upper bound on result size, applied after all restrictions.
    pub limit: u64,
}

/// Restriction of a foreign-key column to already-sampled parent keys.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyRestriction {
    pub column: String,
    pub kind: KeyKind,
    /// Sampled parent keys. Empty means no parent row was sampled, so only
    /// a null reference can be valid.
    pub keys: Vec<String>,
}

/// Render a query to Postgres SQL.
///
/// Every selected column is cast to text so the transport decodes rows
/// uniformly. Keyed restrictions also order their column nulls-last, which
/// stabilizes output but is not needed for correctness.
pub fn render_sql(query: &SampleQuery) -> String {
    let select_list: Vec<String> = query
        .columns
        .iter()
        .map(|column| format!("{}::text", quote_ident(column)))
        .collect();

    let mut sql = format!(
        "SELECT {} FROM {}",
        select_list.join(", "),
        quote_ident(&query.table)
    );

    let mut clauses: Vec<String> = query
        .conditions
        .iter()
        .map(|condition| format!("({condition})"))
        .collect();
    let mut order_by: Vec<String> = Vec::new();

    for restriction in &query.restrictions {
        let column = quote_ident(&restriction.column);
        if restriction.keys.is_empty() {
            clauses.push(format!("{column} IS NULL"));
        } else {
            let literals: Vec<String> = restriction
                .keys
                .iter()
                .map(|key| render_literal(key, &restriction.kind))
                .collect();
            clauses.push(format!(
                "({column} IN ({}) OR {column} IS NULL)",
                literals.join(", ")
            ));
            order_by.push(format!("{column} NULLS LAST"));
        }
    }

    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    if !order_by.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&order_by.join(", "));
    }
    sql.push_str(&format!(" LIMIT {}", query.limit));

    sql
}

/// Double-quote an identifier, escaping embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Render a key value as a SQL literal according to its kind.
///
/// Integer keys render bare when they parse; everything else travels as an
/// escaped string literal, which Postgres coerces against the column type.
pub fn render_literal(value: &str, kind: &KeyKind) -> String {
    match kind {
        KeyKind::Integer if value.parse::<i64>().is_ok() => value.to_string(),
        _ => quote_literal(value),
    }
}

/// Single-quote a string literal, escaping embedded quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
