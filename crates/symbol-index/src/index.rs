use crate::symbol::{Symbol, SymbolKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// (base_id, derived_id) pair from the index relation stream
pub type Relation = (String, String);

/// In-memory table of symbols keyed by id, plus the format flags and
/// relation lists the index carries alongside them.
///
/// The callable sub-index is kept in sync by every mutating method; callers
/// that edit symbols through [`SymbolIndex::get_mut`] must not change kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolIndex {
    symbols: BTreeMap<String, Symbol>,
    callables: BTreeSet<String>,
    /// References carry the id of their enclosing symbol
    pub has_container_field: bool,
    /// Reference kinds carry the dedicated call bit
    pub has_call_kind: bool,
    pub inheritance_relations: Vec<Relation>,
    pub override_relations: Vec<Relation>,
}

impl SymbolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_symbols(symbols: impl IntoIterator<Item = Symbol>) -> Self {
        let mut index = Self::new();
        for symbol in symbols {
            index.insert(symbol);
        }
        index
    }

    /// Builder: set the format flags
    #[must_use]
    pub const fn with_format(mut self, has_container_field: bool, has_call_kind: bool) -> Self {
        self.has_container_field = has_container_field;
        self.has_call_kind = has_call_kind;
        self
    }

    /// Builder: add a base→derived inheritance pair
    #[must_use]
    pub fn with_inheritance(mut self, base_id: impl Into<String>, derived_id: impl Into<String>) -> Self {
        self.inheritance_relations.push((base_id.into(), derived_id.into()));
        self
    }

    /// Builder: add an overridden→overriding pair
    #[must_use]
    pub fn with_override(mut self, base_id: impl Into<String>, derived_id: impl Into<String>) -> Self {
        self.override_relations.push((base_id.into(), derived_id.into()));
        self
    }

    /// Insert or replace a symbol
    pub fn insert(&mut self, symbol: Symbol) -> Option<Symbol> {
        if symbol.is_callable() {
            self.callables.insert(symbol.id.clone());
        } else {
            self.callables.remove(&symbol.id);
        }
        self.symbols.insert(symbol.id.clone(), symbol)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Symbol> {
        self.symbols.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Symbol> {
        self.symbols.get_mut(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.symbols.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Symbols in id order
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    pub fn symbols_mut(&mut self) -> impl Iterator<Item = &mut Symbol> {
        self.symbols.values_mut()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.symbols.keys().map(String::as_str)
    }

    /// Callable symbols (functions and methods) in id order
    pub fn callables(&self) -> impl Iterator<Item = &Symbol> {
        self.callables.iter().filter_map(|id| self.symbols.get(id))
    }

    #[must_use]
    pub fn callable_count(&self) -> usize {
        self.callables.len()
    }

    #[must_use]
    pub fn is_callable(&self, id: &str) -> bool {
        self.callables.contains(id)
    }

    /// Keep only symbols matching `keep`; returns how many were dropped
    pub fn retain(&mut self, mut keep: impl FnMut(&Symbol) -> bool) -> usize {
        let before = self.symbols.len();
        self.symbols.retain(|_, symbol| keep(symbol));
        let symbols = &self.symbols;
        self.callables.retain(|id| symbols.contains_key(id));
        before - self.symbols.len()
    }

    /// Consume the table into its symbols
    pub fn into_symbols(self) -> BTreeMap<String, Symbol> {
        self.symbols
    }

    /// Qualified namespace name (`a::b::`) → namespace symbol id
    #[must_use]
    pub fn qualified_namespaces(&self) -> HashMap<String, String> {
        self.symbols
            .values()
            .filter(|symbol| matches!(symbol.kind, SymbolKind::Namespace))
            .filter_map(|symbol| {
                symbol
                    .qualified_namespace()
                    .map(|qualified| (qualified, symbol.id.clone()))
            })
            .collect()
    }

    /// Ids of every symbol defined or declared in one of `file_uris`
    #[must_use]
    pub fn seeds_for_files<S: AsRef<str>>(&self, file_uris: &[S]) -> BTreeSet<String> {
        let wanted: HashSet<&str> = file_uris.iter().map(AsRef::as_ref).collect();
        self.symbols
            .values()
            .filter(|symbol| {
                symbol
                    .definition
                    .as_ref()
                    .is_some_and(|loc| wanted.contains(loc.file_uri.as_str()))
                    || symbol
                        .declaration
                        .as_ref()
                        .is_some_and(|loc| wanted.contains(loc.file_uri.as_str()))
            })
            .map(|symbol| symbol.id.clone())
            .collect()
    }

    /// New table holding only `ids`, with relations filtered to pairs whose
    /// both endpoints survive and the callable sub-index rebuilt
    #[must_use]
    pub fn restrict_to(&self, ids: &BTreeSet<String>) -> Self {
        let mut subset = Self::from_symbols(
            ids.iter()
                .filter_map(|id| self.symbols.get(id))
                .cloned(),
        )
        .with_format(self.has_container_field, self.has_call_kind);

        let keep = |(base, derived): &&Relation| ids.contains(base) && ids.contains(derived);
        subset.inheritance_relations = self.inheritance_relations.iter().filter(keep).cloned().collect();
        subset.override_relations = self.override_relations.iter().filter(keep).cloned().collect();
        subset
    }

    /// Union with a partial table produced by another worker.
    ///
    /// Commutative and idempotent: a symbol seen twice fills the fields it
    /// lacked, and where both tables carry a location, parent or alias
    /// target the smaller value is kept. References are unioned and
    /// relation pairs are de-duplicated.
    pub fn merge(&mut self, other: Self) {
        for (id, incoming) in other.symbols {
            match self.symbols.get_mut(&id) {
                Some(existing) => merge_symbol(existing, incoming),
                None => {
                    self.insert(incoming);
                }
            }
        }
        self.has_container_field |= other.has_container_field;
        self.has_call_kind |= other.has_call_kind;
        merge_relations(&mut self.inheritance_relations, other.inheritance_relations);
        merge_relations(&mut self.override_relations, other.override_relations);
    }
}

/// Fill an empty slot; when both sides carry a value the smaller one wins
fn keep_min<T: Ord>(slot: &mut Option<T>, incoming: Option<T>) {
    match (slot.as_ref(), incoming) {
        (_, None) => {}
        (Some(current), Some(value)) if *current <= value => {}
        (_, Some(value)) => *slot = Some(value),
    }
}

fn merge_symbol(existing: &mut Symbol, incoming: Symbol) {
    keep_min(&mut existing.definition, incoming.definition);
    keep_min(&mut existing.declaration, incoming.declaration);
    keep_min(&mut existing.body_location, incoming.body_location);
    keep_min(&mut existing.parent_id, incoming.parent_id);
    keep_min(&mut existing.aliased_type_id, incoming.aliased_type_id);
    for reference in incoming.references {
        if !existing.references.contains(&reference) {
            existing.references.push(reference);
        }
    }
    existing.references.sort_by(|a, b| {
        (&a.location, a.kind, &a.container_id).cmp(&(&b.location, b.kind, &b.container_id))
    });
}

fn merge_relations(into: &mut Vec<Relation>, incoming: Vec<Relation>) {
    into.extend(incoming);
    into.sort();
    into.dedup();
}
