//! Incremental update scope.
//!
//! Given the symbols of changed files, find the smallest set that must be
//! rebuilt with them: the seeds plus every symbol one hop away across the
//! enabled relations. Expansion is deliberately single-level, so the cost
//! depends on fan-out only and never on call-graph depth.

use crate::call_graph::{CallGraph, CallGraphExtractor};
use crate::config::ScopeRelations;
use context_symbol_index::SymbolIndex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

type Adjacency = BTreeMap<String, BTreeSet<String>>;

fn link(table: &mut Adjacency, from: &str, to: &str) {
    table.entry(from.to_string()).or_default().insert(to.to_string());
}

fn extend_from<'t>(out: &mut BTreeSet<&'t str>, table: &'t Adjacency, id: &str) {
    if let Some(set) = table.get(id) {
        out.extend(set.iter().map(String::as_str));
    }
}

/// The six one-hop relation tables, computed once over the full index
#[derive(Debug, Clone, Default)]
pub struct RelationTables {
    callees: Adjacency,
    callers: Adjacency,
    lexical_parent: BTreeMap<String, String>,
    namespace_parent: BTreeMap<String, String>,
    bases: Adjacency,
    derived: Adjacency,
    overridden: Adjacency,
    overriding: Adjacency,
    children: Adjacency,
}

impl RelationTables {
    pub fn build(index: &SymbolIndex, calls: &CallGraph) -> Self {
        let mut tables = Self::default();

        for edge in calls.edges() {
            link(&mut tables.callees, &edge.caller_id, &edge.callee_id);
            link(&mut tables.callers, &edge.callee_id, &edge.caller_id);
        }

        let namespaces = index.qualified_namespaces();
        for symbol in index.symbols() {
            if let Some(parent) = &symbol.parent_id {
                tables.lexical_parent.insert(symbol.id.clone(), parent.clone());
                link(&mut tables.children, parent, &symbol.id);
            }
            if symbol.scope.is_empty() {
                continue;
            }
            if let Some(namespace_id) = namespaces.get(&symbol.scope) {
                if *namespace_id != symbol.id {
                    tables
                        .namespace_parent
                        .insert(symbol.id.clone(), namespace_id.clone());
                }
            }
        }

        for (base, derived) in &index.inheritance_relations {
            link(&mut tables.derived, base, derived);
            link(&mut tables.bases, derived, base);
        }
        for (base, overriding) in &index.override_relations {
            link(&mut tables.overriding, base, overriding);
            link(&mut tables.overridden, overriding, base);
        }

        log::debug!(
            "Relation tables: {} callers, {} parents, {} namespace members, {} inheritance pairs, {} override pairs",
            tables.callees.len(),
            tables.lexical_parent.len(),
            tables.namespace_parent.len(),
            index.inheritance_relations.len(),
            index.override_relations.len()
        );
        tables
    }

    /// Every id one hop from `id` across the enabled relations
    #[must_use]
    pub fn neighbors(&self, id: &str, relations: &ScopeRelations) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        if relations.calls {
            extend_from(&mut out, &self.callees, id);
            extend_from(&mut out, &self.callers, id);
        }
        if relations.inheritance {
            extend_from(&mut out, &self.bases, id);
            extend_from(&mut out, &self.derived, id);
        }
        if relations.overrides {
            extend_from(&mut out, &self.overridden, id);
            extend_from(&mut out, &self.overriding, id);
        }
        if relations.children {
            extend_from(&mut out, &self.children, id);
        }
        if relations.lexical_parent {
            if let Some(parent) = self.lexical_parent.get(id) {
                out.insert(parent.as_str());
            }
        }
        if relations.namespace_parent {
            if let Some(namespace) = self.namespace_parent.get(id) {
                out.insert(namespace.as_str());
            }
        }
        out
    }
}

/// Symbols to rebuild for a set of seeds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SufficientSubset {
    /// Seeds present in the index
    pub seeds: BTreeSet<String>,
    /// Known symbols one hop from a seed that are not seeds themselves
    pub direct_dependencies: BTreeSet<String>,
    /// The index restricted to seeds and dependencies
    pub index: SymbolIndex,
}

impl SufficientSubset {
    /// Seeds and direct dependencies together
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.index.ids()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

pub struct ScopeBuilder<'a> {
    index: &'a SymbolIndex,
    tables: RelationTables,
    relations: ScopeRelations,
}

impl<'a> ScopeBuilder<'a> {
    /// Build relation tables, extracting the call graph from `index`
    pub fn new(index: &'a SymbolIndex, relations: ScopeRelations) -> Self {
        let calls = if relations.calls {
            CallGraphExtractor::new(index).extract()
        } else {
            CallGraph::default()
        };
        Self::with_call_graph(index, &calls, relations)
    }

    /// Build relation tables around an already extracted call graph
    pub fn with_call_graph(index: &'a SymbolIndex, calls: &CallGraph, relations: ScopeRelations) -> Self {
        Self {
            index,
            tables: RelationTables::build(index, calls),
            relations,
        }
    }

    #[must_use]
    pub const fn tables(&self) -> &RelationTables {
        &self.tables
    }

    /// Symbols one hop from any seed, excluding the seeds
    #[must_use]
    pub fn direct_dependencies(&self, seeds: &BTreeSet<String>) -> BTreeSet<String> {
        let mut deps: BTreeSet<String> = BTreeSet::new();
        for seed in seeds {
            for neighbor in self.tables.neighbors(seed, &self.relations) {
                if seeds.contains(neighbor) || deps.contains(neighbor) {
                    continue;
                }
                if !self.index.contains(neighbor) {
                    log::debug!("Skipping {neighbor} (related to {seed}): not in the symbol table");
                    continue;
                }
                deps.insert(neighbor.to_string());
            }
        }
        deps
    }

    /// Seeds plus their direct dependencies, as a restricted index
    #[must_use]
    pub fn build(&self, seeds: &BTreeSet<String>) -> SufficientSubset {
        let (present, missing): (BTreeSet<String>, BTreeSet<String>) =
            seeds.iter().cloned().partition(|id| self.index.contains(id));
        if !missing.is_empty() {
            log::debug!("{} seeds are not in the symbol table", missing.len());
        }

        let direct_dependencies = self.direct_dependencies(&present);
        let keep: BTreeSet<String> = present.union(&direct_dependencies).cloned().collect();
        let index = self.index.restrict_to(&keep);

        log::info!(
            "Sufficient subset: {} seeds + {} direct dependencies = {} symbols ({} functions)",
            present.len(),
            direct_dependencies.len(),
            index.len(),
            index.callable_count()
        );
        SufficientSubset {
            seeds: present,
            direct_dependencies,
            index,
        }
    }

    /// Seeds for every symbol defined or declared in `file_uris`
    #[must_use]
    pub fn build_for_files<S: AsRef<str>>(&self, file_uris: &[S]) -> SufficientSubset {
        self.build(&self.index.seeds_for_files(file_uris))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use context_symbol_index::{Symbol, SymbolKind};
    use pretty_assertions::assert_eq;

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(ToString::to_string).collect()
    }

    fn child(id: &str, kind: SymbolKind, parent: &str) -> Symbol {
        let mut s = Symbol::new(id, id.to_lowercase(), kind);
        s.parent_id = Some(parent.to_string());
        s
    }

    #[test]
    fn test_namespace_parent_via_scope() {
        let index = SymbolIndex::from_symbols([
            Symbol::new("NS", "geo", SymbolKind::Namespace),
            Symbol::new("F", "f", SymbolKind::Function).with_scope("geo::"),
            Symbol::new("M", "m", SymbolKind::InstanceMethod).with_scope("geo::Shape::"),
        ]);
        let tables = RelationTables::build(&index, &CallGraph::default());
        let all = ScopeRelations::all();
        assert_eq!(tables.neighbors("F", &all).into_iter().collect::<Vec<_>>(), vec!["NS"]);
        assert!(tables.neighbors("M", &all).is_empty());
    }

    #[test]
    fn test_disabled_relations_are_not_followed() {
        let index = SymbolIndex::from_symbols([
            Symbol::new("C", "c", SymbolKind::Class),
            child("M", SymbolKind::InstanceMethod, "C"),
        ]);
        let only_calls = ScopeRelations {
            lexical_parent: false,
            children: false,
            ..ScopeRelations::all()
        };
        let builder = ScopeBuilder::new(&index, only_calls);
        assert!(builder.direct_dependencies(&set(&["C"])).is_empty());

        let builder = ScopeBuilder::new(&index, ScopeRelations::all());
        assert_eq!(builder.direct_dependencies(&set(&["C"])), set(&["M"]));
        assert_eq!(builder.direct_dependencies(&set(&["M"])), set(&["C"]));
    }

    #[test]
    fn test_missing_ids_are_skipped() {
        let index = SymbolIndex::from_symbols([Symbol::new("D", "d", SymbolKind::Class)])
            .with_inheritance("GONE", "D");
        let builder = ScopeBuilder::new(&index, ScopeRelations::all());
        let subset = builder.build(&set(&["D", "ALSO_GONE"]));
        assert_eq!(subset.seeds, set(&["D"]));
        assert!(subset.direct_dependencies.is_empty());
        assert_eq!(subset.len(), 1);
    }

    #[test]
    fn test_override_relations_both_directions() {
        let index = SymbolIndex::from_symbols([
            Symbol::new("BASE_M", "m", SymbolKind::InstanceMethod),
            Symbol::new("MID_M", "m", SymbolKind::InstanceMethod),
            Symbol::new("LEAF_M", "m", SymbolKind::InstanceMethod),
        ])
        .with_override("BASE_M", "MID_M")
        .with_override("MID_M", "LEAF_M");
        let builder = ScopeBuilder::new(&index, ScopeRelations::all());

        assert_eq!(builder.direct_dependencies(&set(&["MID_M"])), set(&["BASE_M", "LEAF_M"]));
        assert_eq!(builder.direct_dependencies(&set(&["LEAF_M"])), set(&["MID_M"]));
    }
}
