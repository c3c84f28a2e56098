use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::keys::KeySchema;
use crate::schema::{ColumnRef, SchemaSnapshot, Table};

/// A directed foreign-key edge: `fk` references `pk`.
///
/// Equality is structural over both qualified column references, so
/// configured relations compare equal to constraint-derived ones.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Relation {
    /// Referenced (parent) column.
    pub pk: ColumnRef,
    /// Referencing (child) column.
    pub fk: ColumnRef,
}

impl Relation {
    pub fn new(pk: ColumnRef, fk: ColumnRef) -> Self {
        Self { pk, fk }
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.pk, self.fk)
    }
}

/// Validated DAG of tables and foreign-key relations.
///
/// Nodes are tables, edges point from the table owning the referenced
/// column to the table owning the referencing column. Construction fails
/// if the result contains a cycle; everything derived from the graph is
/// computed against the edges and nodes that survive the ignore lists.
#[derive(Debug, Clone)]
pub struct RelationGraph {
    tables: BTreeMap<String, Table>,
    relations: BTreeSet<Relation>,
    order: Vec<String>,
}

impl RelationGraph {
    /// Build the graph from a schema snapshot plus configured relations.
    ///
    /// `extend` merges in relations not backed by a real constraint;
    /// `ignore_relations` removes edges; `ignore_tables` removes nodes and
    /// their incident edges. Unknown ignore entries are dropped with a
    /// warning. Fails with [`Error::CyclicGraph`] before any derivation
    /// when the surviving graph is not acyclic.
    pub fn build(
        snapshot: &SchemaSnapshot,
        extend: &[Relation],
        ignore_relations: &[Relation],
        ignore_tables: &[String],
    ) -> Result<Self> {
        let mut tables: BTreeMap<String, Table> = snapshot
            .tables
            .iter()
            .map(|table| (table.name.clone(), table.clone()))
            .collect();

        for name in ignore_tables {
            if tables.remove(name).is_none() {
                warn!(table = %name, "can't find table to ignore; skipping");
            }
        }

        let mut relations: BTreeSet<Relation> = BTreeSet::new();
        for table in tables.values() {
            for fk in &table.foreign_keys {
                relations.insert(Relation::new(
                    ColumnRef::new(fk.referenced_table.clone(), fk.referenced_column.clone()),
                    ColumnRef::new(table.name.clone(), fk.column.clone()),
                ));
            }
        }

        for relation in extend {
            if tables.contains_key(&relation.pk.table) && tables.contains_key(&relation.fk.table) {
                relations.insert(relation.clone());
            } else {
                warn!(relation = %relation, "extended relation touches an ignored table; skipping");
            }
        }

        // Incident edges of removed nodes vanish with the node.
        relations.retain(|relation| {
            tables.contains_key(&relation.pk.table) && tables.contains_key(&relation.fk.table)
        });

        for relation in ignore_relations {
            if relations.remove(relation) {
                debug!(relation = %relation, "ignoring relation");
            } else {
                warn!(relation = %relation, "ignored relation not present in graph");
            }
        }

        let order = toposort(&tables, &relations)?;
        debug!(
            nodes = tables.len(),
            edges = relations.len(),
            "relation graph validated"
        );

        Ok(Self {
            tables,
            relations,
            order,
        })
    }

    /// Tables in the graph, by name.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    /// Look up a table surviving the ignore lists.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// All surviving relations.
    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.relations.iter()
    }

    /// Relations where `table` is the referencing (child) side.
    pub fn referencing(&self, table: &str) -> Vec<&Relation> {
        let mut edges: Vec<&Relation> = self
            .relations
            .iter()
            .filter(|relation| relation.fk.table == table)
            .collect();
        edges.sort_by(|left, right| left.fk.column.cmp(&right.fk.column));
        edges
    }

    /// Tables with no foreign keys in scope; the roots of the sampling walk.
    pub fn entrypoints(&self) -> BTreeSet<String> {
        let referencing: BTreeSet<&str> = self
            .relations
            .iter()
            .map(|relation| relation.fk.table.as_str())
            .collect();
        self.tables
            .keys()
            .filter(|name| !referencing.contains(name.as_str()))
            .cloned()
            .collect()
    }

    /// Linear extension placing every parent strictly before its children,
    /// with ties broken by table name.
    pub fn topo_order(&self) -> &[String] {
        &self.order
    }

    /// Precompute every derived value the sampler needs.
    ///
    /// Done once, immediately after validation, so the walk never re-derives
    /// state mid-run.
    pub fn artifacts(&self) -> GraphArtifacts {
        GraphArtifacts {
            topo_order: self.order.clone(),
            entrypoints: self.entrypoints(),
            key_schema: KeySchema::derive(self),
        }
    }

    /// DOT rendering of the graph, for debugging with graphviz.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph relations {\n");
        for name in self.tables.keys() {
            out.push_str(&format!("  \"{name}\";\n"));
        }
        for relation in &self.relations {
            out.push_str(&format!(
                "  \"{}\" -> \"{}\" [label=\"{}\"];\n",
                relation.pk.table, relation.fk.table, relation.fk
            ));
        }
        out.push_str("}\n");
        out
    }
}

/// Derived graph state handed to the sampler as one immutable value.
#[derive(Debug, Clone)]
pub struct GraphArtifacts {
    pub topo_order: Vec<String>,
    pub entrypoints: BTreeSet<String>,
    pub key_schema: KeySchema,
}

fn toposort(
    tables: &BTreeMap<String, Table>,
    relations: &BTreeSet<Relation>,
) -> Result<Vec<String>> {
    let mut children: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    let mut indegree: BTreeMap<&str, usize> = BTreeMap::new();

    for name in tables.keys() {
        children.entry(name.as_str()).or_default();
        indegree.entry(name.as_str()).or_insert(0);
    }

    for relation in relations {
        // Parallel edges between the same pair count once for ordering.
        if children
            .entry(relation.pk.table.as_str())
            .or_default()
            .insert(relation.fk.table.as_str())
        {
            *indegree.entry(relation.fk.table.as_str()).or_insert(0) += 1;
        }
    }

    let mut ready: BTreeSet<&str> = indegree
        .iter()
        .filter_map(|(node, count)| (*count == 0).then_some(*node))
        .collect();

    let mut order = Vec::with_capacity(tables.len());

    while let Some(node) = ready.iter().next().copied() {
        ready.remove(node);
        order.push(node.to_string());

        if let Some(targets) = children.get(node) {
            for target in targets {
                if let Some(count) = indegree.get_mut(target) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        ready.insert(target);
                    }
                }
            }
        }
    }

    if order.len() == tables.len() {
        Ok(order)
    } else {
        let nodes: Vec<String> = indegree
            .into_iter()
            .filter_map(|(node, count)| (count > 0).then(|| node.to_string()))
            .collect();
        Err(Error::CyclicGraph { nodes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, ForeignKeyRef, SchemaSnapshot};

    fn column(name: &str, is_primary_key: bool) -> Column {
        Column {
            name: name.to_string(),
            data_type: "int8".to_string(),
            ordinal_position: 1,
            is_nullable: !is_primary_key,
            is_primary_key,
        }
    }

    fn table(name: &str, fks: &[(&str, &str, &str)]) -> Table {
        let mut columns = vec![column("id", true)];
        for (col, _, _) in fks.iter().copied() {
            columns.push(column(col, false));
        }
        Table {
            name: name.to_string(),
            columns,
            primary_key: vec!["id".to_string()],
            foreign_keys: fks
                .iter()
                .map(|(col, ref_table, ref_col)| ForeignKeyRef {
                    column: col.to_string(),
                    referenced_table: ref_table.to_string(),
                    referenced_column: ref_col.to_string(),
                })
                .collect(),
        }
    }

    fn snapshot(tables: Vec<Table>) -> SchemaSnapshot {
        SchemaSnapshot {
            engine: "postgres".to_string(),
            database: None,
            tables,
        }
    }

    fn position(order: &[String], name: &str) -> usize {
        order.iter().position(|item| item == name).unwrap()
    }

    #[test]
    fn topo_order_places_parents_before_children() {
        let snapshot = snapshot(vec![
            table("order_line", &[("order_id", "order", "id")]),
            table("order", &[("account_id", "account", "id")]),
            table("account", &[]),
        ]);

        let graph = RelationGraph::build(&snapshot, &[], &[], &[]).unwrap();
        let order = graph.topo_order();

        assert!(position(order, "account") < position(order, "order"));
        assert!(position(order, "order") < position(order, "order_line"));
    }

    #[test]
    fn topo_order_breaks_ties_by_table_name() {
        let snapshot = snapshot(vec![
            table("zebra", &[]),
            table("apple", &[]),
            table("mango", &[]),
        ]);

        let graph = RelationGraph::build(&snapshot, &[], &[], &[]).unwrap();
        assert_eq!(graph.topo_order(), ["apple", "mango", "zebra"]);
    }

    #[test]
    fn cyclic_graph_fails_construction() {
        let snapshot = snapshot(vec![
            table("a", &[("b_id", "b", "id")]),
            table("b", &[("a_id", "a", "id")]),
        ]);

        let err = RelationGraph::build(&snapshot, &[], &[], &[]).unwrap_err();
        match err {
            Error::CyclicGraph { nodes } => {
                assert!(nodes.contains(&"a".to_string()));
                assert!(nodes.contains(&"b".to_string()));
            }
            other => panic!("expected cycle error, got {other}"),
        }
    }

    #[test]
    fn ignore_relations_breaks_cycles() {
        let snapshot = snapshot(vec![
            table("a", &[("b_id", "b", "id")]),
            table("b", &[("a_id", "a", "id")]),
        ]);

        let ignore = [Relation::new(
            ColumnRef::new("a", "id"),
            ColumnRef::new("b", "a_id"),
        )];
        let graph = RelationGraph::build(&snapshot, &[], &ignore, &[]).unwrap();

        assert_eq!(graph.relations().count(), 1);
        assert_eq!(graph.topo_order(), ["b", "a"]);
    }

    #[test]
    fn ignored_tables_drop_incident_edges() {
        let snapshot = snapshot(vec![
            table("order", &[("account_id", "account", "id")]),
            table("account", &[]),
        ]);

        let graph =
            RelationGraph::build(&snapshot, &[], &[], &["account".to_string()]).unwrap();

        assert!(graph.table("account").is_none());
        assert_eq!(graph.relations().count(), 0);
        assert_eq!(graph.entrypoints(), BTreeSet::from(["order".to_string()]));
    }

    #[test]
    fn extended_relations_become_edges() {
        let snapshot = snapshot(vec![
            table("product", &[]),
            table("ownership", &[]),
        ]);

        let extend = [Relation::new(
            ColumnRef::new("product", "id"),
            ColumnRef::new("ownership", "product_id"),
        )];
        let graph = RelationGraph::build(&snapshot, &extend, &[], &[]).unwrap();

        assert_eq!(graph.referencing("ownership").len(), 1);
        let order = graph.topo_order();
        assert!(position(order, "product") < position(order, "ownership"));
    }

    #[test]
    fn entrypoints_have_no_foreign_keys_in_scope() {
        let snapshot = snapshot(vec![
            table("order", &[("account_id", "account", "id")]),
            table("account", &[]),
            table("audit_log", &[]),
        ]);

        let graph = RelationGraph::build(&snapshot, &[], &[], &[]).unwrap();
        assert_eq!(
            graph.entrypoints(),
            BTreeSet::from(["account".to_string(), "audit_log".to_string()])
        );
    }

    #[test]
    fn dot_rendering_lists_nodes_and_edges() {
        let snapshot = snapshot(vec![
            table("order", &[("account_id", "account", "id")]),
            table("account", &[]),
        ]);

        let graph = RelationGraph::build(&snapshot, &[], &[], &[]).unwrap();
        let dot = graph.to_dot();

        assert!(dot.contains("\"account\";"));
        assert!(dot.contains("\"account\" -> \"order\""));
    }
}
