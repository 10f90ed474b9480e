use crate::error::{GraphError, Result};
use crate::types::{RelationshipType, SymbolGraph};
use petgraph::algo::astar;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{HashSet, VecDeque};

/// A node reached from a start node: (node, distance, relationship path)
pub type RelatedNode = (NodeIndex, usize, Vec<RelationshipType>);

impl SymbolGraph {
    fn neighbors_by(&self, node: NodeIndex, rel: RelationshipType, dir: Direction) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = self
            .graph
            .edges_directed(node, dir)
            .filter(|e| e.weight().relationship == rel)
            .map(|e| match dir {
                Direction::Outgoing => e.target(),
                Direction::Incoming => e.source(),
            })
            .collect();
        out.sort_by(|a, b| self.graph[*a].id.cmp(&self.graph[*b].id));
        out.dedup();
        out
    }

    /// Find all nodes that current node calls (outgoing Calls edges)
    pub fn get_callees(&self, node: NodeIndex) -> Vec<NodeIndex> {
        self.neighbors_by(node, RelationshipType::Calls, Direction::Outgoing)
    }

    /// Find all nodes that call current node (incoming Calls edges)
    pub fn get_callers(&self, node: NodeIndex) -> Vec<NodeIndex> {
        self.neighbors_by(node, RelationshipType::Calls, Direction::Incoming)
    }

    /// Lexical children of a node
    pub fn get_children(&self, node: NodeIndex) -> Vec<NodeIndex> {
        self.neighbors_by(node, RelationshipType::Contains, Direction::Outgoing)
    }

    /// Lexical parent of a node
    pub fn get_parent(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.neighbors_by(node, RelationshipType::Contains, Direction::Incoming)
            .into_iter()
            .next()
    }

    /// Base classes of a derived class
    pub fn get_bases(&self, node: NodeIndex) -> Vec<NodeIndex> {
        self.neighbors_by(node, RelationshipType::Inherits, Direction::Outgoing)
    }

    /// Outgoing neighbours over one relationship type
    pub fn get_nodes_by_relationship(&self, node: NodeIndex, rel_type: RelationshipType) -> Vec<NodeIndex> {
        self.neighbors_by(node, rel_type, Direction::Outgoing)
    }

    /// Breadth-first walk over edges in both directions, up to `max_depth`
    /// hops. Each node is reported once, at its shortest distance.
    pub fn get_related_nodes(&self, node: NodeIndex, max_depth: usize) -> Vec<RelatedNode> {
        let mut visited = HashSet::from([node]);
        let mut result = Vec::new();
        let mut queue = VecDeque::from([(node, 0usize, Vec::<RelationshipType>::new())]);

        while let Some((current, depth, path)) = queue.pop_front() {
            if current != node {
                result.push((current, depth, path.clone()));
            }
            if depth >= max_depth {
                continue;
            }

            let mut steps: Vec<(NodeIndex, RelationshipType)> = self
                .graph
                .edges_directed(current, Direction::Outgoing)
                .map(|e| (e.target(), e.weight().relationship))
                .chain(
                    self.graph
                        .edges_directed(current, Direction::Incoming)
                        .map(|e| (e.source(), e.weight().relationship)),
                )
                .collect();
            steps.sort_by(|a, b| self.graph[a.0].id.cmp(&self.graph[b.0].id).then(a.1.cmp(&b.1)));

            for (next, rel) in steps {
                if visited.insert(next) {
                    let mut next_path = path.clone();
                    next_path.push(rel);
                    queue.push_back((next, depth + 1, next_path));
                }
            }
        }

        result
    }

    /// Shortest directed path between two nodes, endpoints included
    pub fn find_path(&self, from: NodeIndex, to: NodeIndex) -> Option<Vec<NodeIndex>> {
        astar(&self.graph, from, |n| n == to, |_| 1usize, |_| 0).map(|(_, path)| path)
    }

    /// Ids of a symbol and everything within `max_depth` of it
    pub fn get_context_for_symbol(&self, id: &str, max_depth: usize) -> Result<Vec<String>> {
        let node = self
            .find_node(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;

        let mut ids = vec![self.graph[node].id.clone()];
        ids.extend(
            self.get_related_nodes(node, max_depth)
                .into_iter()
                .map(|(related, _, _)| self.graph[related].id.clone()),
        );
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use crate::types::{GraphEdge, GraphNode, RelationshipType, SymbolGraph};
    use context_symbol_index::{Symbol, SymbolKind};
    use petgraph::graph::NodeIndex;
    use pretty_assertions::assert_eq;

    fn add(graph: &mut SymbolGraph, id: &str, kind: SymbolKind) -> NodeIndex {
        graph.add_node(GraphNode::from_symbol(&Symbol::new(id, id.to_lowercase(), kind)))
    }

    fn ids(graph: &SymbolGraph, nodes: &[NodeIndex]) -> Vec<String> {
        nodes.iter().map(|n| graph.graph[*n].id.clone()).collect()
    }

    /// C contains M; M calls F; F calls G
    fn chain() -> (SymbolGraph, [NodeIndex; 4]) {
        let mut graph = SymbolGraph::new();
        let c = add(&mut graph, "C", SymbolKind::Class);
        let m = add(&mut graph, "M", SymbolKind::InstanceMethod);
        let f = add(&mut graph, "F", SymbolKind::Function);
        let g = add(&mut graph, "G", SymbolKind::Function);
        graph.add_edge(c, m, GraphEdge::new(RelationshipType::Contains));
        graph.add_edge(m, f, GraphEdge::new(RelationshipType::Calls));
        graph.add_edge(f, g, GraphEdge::new(RelationshipType::Calls));
        (graph, [c, m, f, g])
    }

    #[test]
    fn test_callers_and_callees() {
        let (graph, [c, m, f, _]) = chain();
        assert_eq!(ids(&graph, &graph.get_callers(f)), vec!["M"]);
        assert_eq!(ids(&graph, &graph.get_callees(m)), vec!["F"]);
        assert_eq!(ids(&graph, &graph.get_children(c)), vec!["M"]);
        assert_eq!(graph.get_parent(m), Some(c));
        assert_eq!(graph.get_parent(c), None);
    }

    #[test]
    fn test_related_nodes_respect_depth() {
        let (graph, [_, m, _, _]) = chain();
        let one: Vec<String> = graph
            .get_related_nodes(m, 1)
            .iter()
            .map(|(n, _, _)| graph.graph[*n].id.clone())
            .collect();
        assert_eq!(one, vec!["C", "F"]);

        let two = graph.get_related_nodes(m, 2);
        let g = two.iter().find(|(n, _, _)| graph.graph[*n].id == "G");
        assert_eq!(
            g.map(|(_, d, p)| (*d, p.clone())),
            Some((2, vec![RelationshipType::Calls, RelationshipType::Calls]))
        );
    }

    #[test]
    fn test_find_path_follows_edge_direction() {
        let (graph, [c, m, f, g]) = chain();
        assert_eq!(graph.find_path(c, g), Some(vec![c, m, f, g]));
        assert_eq!(graph.find_path(g, c), None);
    }

    #[test]
    fn test_unknown_symbol_is_an_error() {
        let (graph, _) = chain();
        assert!(graph.get_context_for_symbol("NOPE", 1).is_err());
        assert_eq!(graph.get_context_for_symbol("G", 1).ok(), Some(vec!["G".to_string(), "F".to_string()]));
    }
}
