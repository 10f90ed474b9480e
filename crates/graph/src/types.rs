use context_symbol_index::{NodeLabel, RelativeLocation, Symbol, SymbolKind};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Type of relationship between symbols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RelationshipType {
    /// A calls B
    Calls,

    /// A lexically encloses B (class holds method, function holds local)
    Contains,

    /// Namespace A declares member B
    ScopeContains,

    /// A derives from B
    Inherits,

    /// Method A is overridden by B
    Overrides,

    /// Type alias A names type B
    AliasOf,
}

impl RelationshipType {
    /// Weight used when ranking related symbols
    #[must_use]
    pub const fn weight(self) -> f32 {
        match self {
            Self::Calls => 1.0,
            Self::Contains => 0.7,
            Self::Inherits => 0.6,
            Self::Overrides => 0.6,
            Self::AliasOf => 0.5,
            Self::ScopeContains => 0.3,
        }
    }
}

/// Node in the symbol graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub name: String,
    pub kind: SymbolKind,
    pub label: Option<NodeLabel>,

    /// File of the definition, else of the declaration
    pub file_uri: Option<String>,

    pub body_location: Option<RelativeLocation>,
}

impl GraphNode {
    pub fn from_symbol(symbol: &Symbol) -> Self {
        Self {
            id: symbol.id.clone(),
            name: symbol.name.clone(),
            kind: symbol.kind.clone(),
            label: symbol.node_label(),
            file_uri: symbol.file_uri().map(str::to_string),
            body_location: symbol.body_location,
        }
    }

    /// Lines covered by the body, zero for bodiless symbols
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.body_location
            .map_or(0, |body| body.end_line.saturating_sub(body.start_line) as usize + 1)
    }
}

/// Edge in the symbol graph
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub relationship: RelationshipType,
    pub weight: f32,
}

impl GraphEdge {
    #[must_use]
    pub const fn new(relationship: RelationshipType) -> Self {
        Self {
            relationship,
            weight: relationship.weight(),
        }
    }
}

/// Symbol graph with relationships
#[derive(Debug, Clone, Default)]
pub struct SymbolGraph {
    /// Directed graph (symbol -> symbol with relationships)
    pub graph: DiGraph<GraphNode, GraphEdge>,

    /// Symbol id -> NodeIndex mapping
    id_index: HashMap<String, NodeIndex>,

    /// File URI -> nodes located in that file
    file_index: HashMap<String, Vec<NodeIndex>>,
}

impl SymbolGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add node to graph; a repeated id returns the existing node
    pub fn add_node(&mut self, node: GraphNode) -> NodeIndex {
        if let Some(&idx) = self.id_index.get(&node.id) {
            return idx;
        }
        let id = node.id.clone();
        let file = node.file_uri.clone();

        let idx = self.graph.add_node(node);

        self.id_index.insert(id, idx);
        if let Some(file) = file {
            self.file_index.entry(file).or_default().push(idx);
        }
        idx
    }

    /// Add edge between nodes, once per relationship
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, edge: GraphEdge) -> bool {
        let exists = self
            .graph
            .edges_connecting(from, to)
            .any(|e| e.weight().relationship == edge.relationship);
        if exists {
            return false;
        }
        self.graph.add_edge(from, to, edge);
        true
    }

    /// Find node by symbol id
    pub fn find_node(&self, id: &str) -> Option<NodeIndex> {
        self.id_index.get(id).copied()
    }

    /// Nodes located in `file_uri`, in insertion order
    pub fn find_nodes_by_file(&self, file_uri: &str) -> Vec<NodeIndex> {
        self.file_index.get(file_uri).cloned().unwrap_or_default()
    }

    pub fn get_node(&self, idx: NodeIndex) -> Option<&GraphNode> {
        self.graph.node_weight(idx)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &GraphNode)> {
        self.graph
            .node_indices()
            .filter_map(move |idx| self.graph.node_weight(idx).map(|node| (idx, node)))
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
