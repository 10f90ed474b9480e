use crate::error::{GraphError, Result};
use crate::types::{GraphNode, RelationshipType, SymbolGraph};
use serde::{Deserialize, Serialize};

/// Gathers the symbols related to one symbol, ranked by relevance
pub struct ContextAssembler {
    graph: SymbolGraph,
}

/// Context assembly strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssemblyStrategy {
    /// Direct neighbours only (depth=1)
    Direct,

    /// Neighbours and their neighbours (depth=2)
    Extended,

    /// Three hops out (depth=3)
    Deep,

    /// Custom depth
    Custom(usize),
}

impl AssemblyStrategy {
    #[must_use]
    pub const fn max_depth(self) -> usize {
        match self {
            Self::Direct => 1,
            Self::Extended => 2,
            Self::Deep => 3,
            Self::Custom(depth) => depth,
        }
    }
}

/// Assembled context for one symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssembledContext {
    /// The symbol that was requested
    pub primary: GraphNode,

    /// Related symbols, best first
    pub related: Vec<RelatedSymbol>,

    /// Body lines of the primary and related symbols together
    pub total_lines: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedSymbol {
    pub node: GraphNode,
    pub relationship: Vec<RelationshipType>,
    pub distance: usize,
    pub relevance_score: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextStats {
    pub total_nodes: usize,
    pub total_edges: usize,
}

impl ContextAssembler {
    pub const fn new(graph: SymbolGraph) -> Self {
        Self { graph }
    }

    pub const fn graph(&self) -> &SymbolGraph {
        &self.graph
    }

    /// Assemble context for a symbol id
    pub fn assemble_for_symbol(&self, id: &str, strategy: AssemblyStrategy) -> Result<AssembledContext> {
        let node = self
            .graph
            .find_node(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;
        let primary = self
            .graph
            .get_node(node)
            .cloned()
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;

        let mut related: Vec<RelatedSymbol> = self
            .graph
            .get_related_nodes(node, strategy.max_depth())
            .into_iter()
            .filter_map(|(rel_node, distance, path)| {
                let node = self.graph.get_node(rel_node)?.clone();
                Some(RelatedSymbol {
                    node,
                    relevance_score: calculate_relevance(distance, &path),
                    relationship: path,
                    distance,
                })
            })
            .collect();

        related.sort_by(|a, b| {
            b.relevance_score
                .total_cmp(&a.relevance_score)
                .then_with(|| a.node.id.cmp(&b.node.id))
        });

        let total_lines = primary.line_count() + related.iter().map(|r| r.node.line_count()).sum::<usize>();

        Ok(AssembledContext {
            primary,
            related,
            total_lines,
        })
    }

    /// Assemble context for every symbol located in a file
    pub fn assemble_for_file(&self, file_uri: &str, strategy: AssemblyStrategy) -> Result<Vec<AssembledContext>> {
        let nodes = self.graph.find_nodes_by_file(file_uri);
        if nodes.is_empty() {
            return Err(GraphError::NodeNotFound(file_uri.to_string()));
        }
        nodes
            .into_iter()
            .filter_map(|idx| self.graph.get_node(idx))
            .map(|node| self.assemble_for_symbol(&node.id, strategy))
            .collect()
    }

    pub fn get_stats(&self) -> ContextStats {
        ContextStats {
            total_nodes: self.graph.node_count(),
            total_edges: self.graph.edge_count(),
        }
    }

    /// Batch assemble contexts for multiple symbols
    pub fn assemble_batch(&self, ids: &[&str], strategy: AssemblyStrategy) -> Vec<Result<AssembledContext>> {
        ids.iter()
            .map(|id| self.assemble_for_symbol(id, strategy))
            .collect()
    }
}

/// Distance decay times the mean weight of the relationships on the path
fn calculate_relevance(distance: usize, path: &[RelationshipType]) -> f32 {
    let distance_score = 1.0 / (distance as f32 + 1.0);
    let relationship_score = path.iter().map(|rel| rel.weight()).sum::<f32>() / path.len().max(1) as f32;
    distance_score * relationship_score
}
