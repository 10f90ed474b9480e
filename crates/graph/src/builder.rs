use crate::call_graph::CallGraph;
use crate::types::{GraphEdge, GraphNode, RelationshipType, SymbolGraph};
use context_symbol_index::SymbolIndex;
use std::collections::HashMap;

/// Build the navigable symbol graph from an enriched index
pub struct SymbolGraphBuilder<'a> {
    index: &'a SymbolIndex,
    calls: Option<&'a CallGraph>,
}

impl<'a> SymbolGraphBuilder<'a> {
    pub const fn new(index: &'a SymbolIndex) -> Self {
        Self { index, calls: None }
    }

    #[must_use]
    pub const fn with_call_graph(mut self, calls: &'a CallGraph) -> Self {
        self.calls = Some(calls);
        self
    }

    pub fn build(&self) -> SymbolGraph {
        let mut graph = SymbolGraph::new();

        // Phase 1: one node per symbol, in id order
        for symbol in self.index.symbols() {
            graph.add_node(GraphNode::from_symbol(symbol));
        }

        // Phase 2: edges; endpoints missing from the index are skipped
        let mut skipped = 0usize;
        let mut link = |graph: &mut SymbolGraph, from: &str, to: &str, rel: RelationshipType| {
            match (graph.find_node(from), graph.find_node(to)) {
                (Some(a), Some(b)) if a != b => {
                    graph.add_edge(a, b, GraphEdge::new(rel));
                }
                (Some(_), Some(_)) => {}
                _ => {
                    log::debug!("Skipping {rel:?} edge {from} -> {to}: endpoint not in the symbol table");
                    skipped += 1;
                }
            }
        };

        let namespaces = self.index.qualified_namespaces();
        for symbol in self.index.symbols() {
            if let Some(parent) = &symbol.parent_id {
                link(&mut graph, parent, &symbol.id, RelationshipType::Contains);
            }
            if let Some(namespace_id) = namespaces.get(&symbol.scope) {
                link(&mut graph, namespace_id, &symbol.id, RelationshipType::ScopeContains);
            }
            if let Some(aliased) = &symbol.aliased_type_id {
                link(&mut graph, &symbol.id, aliased, RelationshipType::AliasOf);
            }
        }

        for (base, derived) in &self.index.inheritance_relations {
            link(&mut graph, derived, base, RelationshipType::Inherits);
        }
        for (base, overriding) in &self.index.override_relations {
            link(&mut graph, base, overriding, RelationshipType::Overrides);
        }

        if let Some(calls) = self.calls {
            for edge in calls.edges() {
                link(&mut graph, &edge.caller_id, &edge.callee_id, RelationshipType::Calls);
            }
        }

        if skipped > 0 {
            log::debug!("{skipped} graph edges skipped for unknown endpoints");
        }
        log::info!(
            "Built symbol graph: {} nodes, {} edges",
            graph.node_count(),
            graph.edge_count()
        );

        graph
    }
}

/// Edge counts per relationship type
pub fn relationship_histogram(graph: &SymbolGraph) -> HashMap<RelationshipType, usize> {
    let mut counts = HashMap::new();
    for edge in graph.graph.edge_weights() {
        *counts.entry(edge.relationship).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call_graph::CallGraphExtractor;
    use context_symbol_index::{Location, Reference, RelativeLocation, Symbol, SymbolKind};
    use pretty_assertions::assert_eq;

    const FILE: &str = "file:///p/shape.cpp";

    fn index() -> SymbolIndex {
        let mut area = Symbol::new("AREA", "area", SymbolKind::InstanceMethod)
            .with_scope("geo::Shape::")
            .with_definition(Location::new(FILE, 4, 8, 4, 12))
            .with_body(RelativeLocation::lines(4, 8));
        area.parent_id = Some("SHAPE".to_string());
        let mut alias = Symbol::new("ALIAS", "ShapePtr", SymbolKind::TypeAlias).with_scope("geo::");
        alias.aliased_type_id = Some("SHAPE".to_string());
        let helper = Symbol::new("HELPER", "helper", SymbolKind::Function)
            .with_scope("geo::")
            .with_reference(Reference::new(20, Location::new(FILE, 6, 4, 6, 10)).with_container("AREA"));

        SymbolIndex::from_symbols([
            Symbol::new("NS", "geo", SymbolKind::Namespace),
            Symbol::new("SHAPE", "Shape", SymbolKind::Class).with_scope("geo::"),
            Symbol::new("SQUARE", "Square", SymbolKind::Class).with_scope("geo::"),
            area,
            alias,
            helper,
        ])
        .with_inheritance("SHAPE", "SQUARE")
        .with_inheritance("GONE", "SQUARE")
        .with_format(true, true)
    }

    #[test]
    fn test_every_relationship_becomes_an_edge() {
        let index = index();
        let calls = CallGraphExtractor::new(&index).extract();
        let graph = SymbolGraphBuilder::new(&index).with_call_graph(&calls).build();

        let histogram = relationship_histogram(&graph);
        assert_eq!(histogram.get(&RelationshipType::Calls), Some(&1));
        assert_eq!(histogram.get(&RelationshipType::Contains), Some(&1));
        assert_eq!(histogram.get(&RelationshipType::ScopeContains), Some(&4));
        assert_eq!(histogram.get(&RelationshipType::Inherits), Some(&1));
        assert_eq!(histogram.get(&RelationshipType::AliasOf), Some(&1));

        let square = graph.find_node("SQUARE").map(|n| graph.get_bases(n));
        let shape = graph.find_node("SHAPE");
        assert_eq!(square, shape.map(|s| vec![s]));
    }
}
