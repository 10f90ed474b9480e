//! # Context Symbol Graph
//!
//! Structural enrichment of a cross-translation-unit symbol index with
//! lexical body spans from a per-file parse.
//!
//! ## Features
//!
//! - **Span forest** - per-file containment trees of declaration bodies
//! - **Reconciliation** - body locations and lexical parents for indexed
//!   symbols, synthetic symbols for spans the index never saw
//! - **Call graph extraction** - caller → callee edges from call references
//! - **Incremental scope** - the one-hop neighbourhood of changed symbols
//! - **Symbol graph** - navigable petgraph view with ranked related symbols
//!
//! ## Architecture
//!
//! ```text
//! SymbolIndex + source spans
//!     │
//!     ├──> Span Forest (sort + stack sweep per file)
//!     │
//!     ├──> Reconciler
//!     │      ├─ Phase 1: match spans to symbols, build the remap table
//!     │      ├─ Phase 2: resolve parents through PARENT_RESOLVERS
//!     │      └─ Break any parent cycle
//!     │
//!     ├──> Call Graph Extractor (container or spatial strategy)
//!     │
//!     ├──> Symbol Graph (petgraph)
//!     │      ├─ Nodes: symbols
//!     │      └─ Edges: calls, contains, inherits, overrides, aliases
//!     │
//!     └──> Scope Builder (seeds + one hop across six relations)
//! ```

mod assembler;
mod builder;
mod call_graph;
mod config;
mod engine;
mod error;
mod forest;
mod graph;
mod reconciler;
mod resolvers;
mod scope;
mod types;

pub use assembler::{AssembledContext, AssemblyStrategy, ContextAssembler, ContextStats, RelatedSymbol};
pub use builder::{relationship_histogram, SymbolGraphBuilder};
pub use call_graph::{
    CallGraph, CallGraphExtractor, CallGraphStats, CallKindEncoding, CallRelation, CallStrategy,
};
pub use config::{EngineConfig, ScopeRelations};
pub use engine::{Engine, EngineBuilder, EngineOutput};
pub use error::{GraphError, Result};
pub use forest::{
    build_file_forest, build_span_forest, find_innermost_container, forest_spans, location_within,
    within, SpanForest, SpanTreeIter, SpanTreeNode,
};
pub use graph::RelatedNode;
pub use reconciler::{index_kind_for_parser_kind, ReconcileReport, Reconciler, Reconciliation};
pub use resolvers::{ParentResolver, RemapTable, ResolveContext, SpanKey, PARENT_RESOLVERS};
pub use scope::{RelationTables, ScopeBuilder, SufficientSubset};
pub use types::{GraphEdge, GraphNode, RelationshipType, SymbolGraph};
