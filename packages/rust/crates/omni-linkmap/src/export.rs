//! Graphviz DOT export of the outbound link graph.

use std::fmt::Write as _;

use crate::store::GraphStore;

fn quote(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('"');
    for ch in raw.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// Render the store as a `digraph`.
///
/// One declaration per node (`"id" [label="..."];`) followed by one edge per
/// outbound link. Backlinks are not exported since they mirror outbound edges.
#[must_use]
pub fn to_dot(store: &GraphStore) -> String {
    let mut dot = String::from("digraph g {\n");
    for node in store.nodes() {
        let _ = writeln!(dot, "  {} [label={}];", quote(&node.id), quote(&node.label));
    }
    for node in store.nodes() {
        for target in &node.links {
            let _ = writeln!(dot, "  {} -> {}", quote(&node.id), quote(target));
        }
    }
    dot.push_str("}\n");
    dot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParsedDocument;

    #[test]
    fn renders_nodes_then_edges() {
        let mut store = GraphStore::new();
        store.upsert(ParsedDocument {
            id: "/v/A".to_string(),
            path: "/v/A.md".to_string(),
            title: "Say \"hi\"".to_string(),
            links: ["/v/B".to_string()].into_iter().collect(),
        });
        store.upsert(ParsedDocument {
            id: "/v/B".to_string(),
            path: "/v/B.md".to_string(),
            title: "Beta".to_string(),
            links: std::collections::BTreeSet::new(),
        });
        store.refresh_integrity();

        let expected = "digraph g {\n  \"/v/A\" [label=\"Say \\\"hi\\\"\"];\n  \"/v/B\" [label=\"Beta\"];\n  \"/v/A\" -> \"/v/B\"\n}\n";
        assert_eq!(to_dot(&store), expected);
    }
}
