//! Caller → callee extraction from index references.
//!
//! Two strategies, picked once per index from its format flags:
//!
//! - **Container**: newer indexes record the enclosing symbol of every
//!   reference, so a call reference maps straight to an edge.
//! - **Spatial**: older indexes do not, so each call reference is placed
//!   inside the function body that contains it.

use crate::forest::location_within;
use context_symbol_index::{RefKind, RelativeLocation, Symbol, SymbolIndex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Reference kinds that denote a spelled, non-macro call.
///
/// Indexes without the dedicated call bit encode calls as plain
/// references; newer ones add the call bit on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallKindEncoding {
    /// reference (4), reference + spelled (12)
    Legacy,
    /// reference + call (20), reference + spelled + call (28)
    Modern,
}

impl CallKindEncoding {
    #[must_use]
    pub const fn detect(has_call_kind: bool) -> Self {
        if has_call_kind {
            Self::Modern
        } else {
            Self::Legacy
        }
    }

    #[must_use]
    pub const fn call_kinds(self) -> [u32; 2] {
        match self {
            Self::Legacy => [4, 12],
            Self::Modern => [20, 28],
        }
    }

    #[must_use]
    pub fn is_call(self, kind: RefKind) -> bool {
        self.call_kinds().contains(&kind.bits())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallStrategy {
    Container,
    Spatial,
}

impl CallStrategy {
    #[must_use]
    pub const fn detect(index: &SymbolIndex) -> Self {
        if index.has_container_field {
            Self::Container
        } else {
            Self::Spatial
        }
    }
}

/// One caller → callee edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CallRelation {
    pub caller_id: String,
    pub callee_id: String,
}

/// Extracted call edges, keyed for reproducible iteration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallGraph {
    pub caller_to_callees: BTreeMap<String, BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callee_to_callers: Option<BTreeMap<String, BTreeSet<String>>>,
}

impl CallGraph {
    fn new(with_reverse: bool) -> Self {
        Self {
            caller_to_callees: BTreeMap::new(),
            callee_to_callers: with_reverse.then(BTreeMap::new),
        }
    }

    fn add(&mut self, caller_id: &str, callee_id: &str) {
        self.caller_to_callees
            .entry(caller_id.to_string())
            .or_default()
            .insert(callee_id.to_string());
        if let Some(reverse) = self.callee_to_callers.as_mut() {
            reverse
                .entry(callee_id.to_string())
                .or_default()
                .insert(caller_id.to_string());
        }
    }

    /// All edges, ordered by caller then callee
    pub fn edges(&self) -> impl Iterator<Item = CallRelation> + '_ {
        self.caller_to_callees.iter().flat_map(|(caller, callees)| {
            callees.iter().map(move |callee| CallRelation {
                caller_id: caller.clone(),
                callee_id: callee.clone(),
            })
        })
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.caller_to_callees.values().map(BTreeSet::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.caller_to_callees.is_empty()
    }

    pub fn callees_of(&self, caller_id: &str) -> impl Iterator<Item = &str> {
        self.caller_to_callees
            .get(caller_id)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Callers of `callee_id`; uses the reverse index when present
    #[must_use]
    pub fn callers_of(&self, callee_id: &str) -> BTreeSet<String> {
        if let Some(reverse) = &self.callee_to_callers {
            return reverse.get(callee_id).cloned().unwrap_or_default();
        }
        self.caller_to_callees
            .iter()
            .filter(|(_, callees)| callees.contains(callee_id))
            .map(|(caller, _)| caller.clone())
            .collect()
    }
}

pub struct CallGraphExtractor<'a> {
    index: &'a SymbolIndex,
    encoding: CallKindEncoding,
    with_reverse: bool,
}

impl<'a> CallGraphExtractor<'a> {
    pub const fn new(index: &'a SymbolIndex) -> Self {
        Self {
            index,
            encoding: CallKindEncoding::detect(index.has_call_kind),
            with_reverse: false,
        }
    }

    /// Also build the callee → caller index
    #[must_use]
    pub const fn with_reverse_index(mut self, enabled: bool) -> Self {
        self.with_reverse = enabled;
        self
    }

    #[must_use]
    pub const fn encoding(&self) -> CallKindEncoding {
        self.encoding
    }

    #[must_use]
    pub const fn strategy(&self) -> CallStrategy {
        CallStrategy::detect(self.index)
    }

    /// Extract with the strategy the index format calls for
    #[must_use]
    pub fn extract(&self) -> CallGraph {
        self.extract_with(self.strategy())
    }

    #[must_use]
    pub fn extract_with(&self, strategy: CallStrategy) -> CallGraph {
        log::info!(
            "Extracting call relationships ({strategy:?} strategy, call kinds {:?})",
            self.encoding.call_kinds()
        );
        let graph = match strategy {
            CallStrategy::Container => self.extract_by_container(),
            CallStrategy::Spatial => self.extract_by_location(),
        };
        log::info!("Extracted {} call relationships", graph.edge_count());
        graph
    }

    fn extract_by_container(&self) -> CallGraph {
        let mut graph = CallGraph::new(self.with_reverse);
        // The container format always carries the call bit
        let encoding = CallKindEncoding::Modern;

        for callee in self.index.callables() {
            for reference in &callee.references {
                if !encoding.is_call(reference.kind) {
                    continue;
                }
                let Some(caller_id) = reference.container() else {
                    continue;
                };
                if self.index.is_callable(caller_id) {
                    graph.add(caller_id, &callee.id);
                }
            }
        }
        graph
    }

    fn extract_by_location(&self) -> CallGraph {
        let mut graph = CallGraph::new(self.with_reverse);
        let bodies = self.bodies_by_file();
        if bodies.is_empty() {
            log::warn!("No functions have body locations. Were spans reconciled?");
            return graph;
        }
        log::info!("Built spatial index for {} files.", bodies.len());

        for callee in self.index.callables() {
            for reference in &callee.references {
                if !self.encoding.is_call(reference.kind) {
                    continue;
                }
                let Some(candidates) = bodies.get(reference.location.file_uri.as_str()) else {
                    continue;
                };
                let at = reference.location.relative();
                // Function bodies never overlap, so the first hit is the caller
                if let Some((_, caller)) = candidates
                    .iter()
                    .find(|(body, _)| location_within(&at, body, true))
                {
                    graph.add(&caller.id, &callee.id);
                }
            }
        }
        graph
    }

    /// file URI → (body, function) for every callable with a body and a
    /// definition, ordered by body start line
    fn bodies_by_file(&self) -> BTreeMap<&'a str, Vec<(RelativeLocation, &'a Symbol)>> {
        let mut bodies: BTreeMap<&str, Vec<(RelativeLocation, &Symbol)>> = BTreeMap::new();
        for function in self.index.callables() {
            let (Some(body), Some(definition)) = (function.body_location, &function.definition) else {
                continue;
            };
            bodies
                .entry(definition.file_uri.as_str())
                .or_default()
                .push((body, function));
        }
        for candidates in bodies.values_mut() {
            candidates.sort_by_key(|(body, _)| body.start_line);
        }
        bodies
    }
}

/// Summary numbers for an extracted call graph
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallGraphStats {
    pub functions_in_index: usize,
    pub functions_with_bodies: usize,
    pub functions_in_graph: usize,
    pub callers: usize,
    pub callees: usize,
    pub total_calls: usize,
    pub recursive_calls: usize,
    /// Call others but are never called
    pub entry_points: usize,
    /// Are called but call nothing
    pub leaf_functions: usize,
}

impl CallGraphStats {
    #[must_use]
    pub fn compute(index: &SymbolIndex, graph: &CallGraph) -> Self {
        let callers: BTreeSet<&str> = graph.caller_to_callees.keys().map(String::as_str).collect();
        let callees: BTreeSet<&str> = graph
            .caller_to_callees
            .values()
            .flatten()
            .map(String::as_str)
            .collect();
        let recursive_calls = graph
            .caller_to_callees
            .iter()
            .filter(|(caller, set)| set.contains(*caller))
            .count();

        Self {
            functions_in_index: index.callable_count(),
            functions_with_bodies: index.callables().filter(|f| f.body_location.is_some()).count(),
            functions_in_graph: callers.union(&callees).count(),
            callers: callers.len(),
            callees: callees.len(),
            total_calls: graph.edge_count(),
            recursive_calls,
            entry_points: callers.difference(&callees).count(),
            leaf_functions: callees.difference(&callers).count(),
        }
    }
}

impl fmt::Display for CallGraphStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Call Graph Statistics:")?;
        writeln!(f, "=====================")?;
        writeln!(f, "Total functions in index: {}", self.functions_in_index)?;
        writeln!(f, "Functions with body spans: {}", self.functions_with_bodies)?;
        writeln!(f, "Total unique functions in call graph: {}", self.functions_in_graph)?;
        writeln!(f, "Functions that call others: {}", self.callers)?;
        writeln!(f, "Functions that are called: {}", self.callees)?;
        writeln!(f, "Total call relationships: {}", self.total_calls)?;
        writeln!(f, "Recursive calls: {}", self.recursive_calls)?;
        writeln!(f, "Functions that only call (entry points): {}", self.entry_points)?;
        write!(f, "Functions that are only called (leaf functions): {}", self.leaf_functions)
    }
}
