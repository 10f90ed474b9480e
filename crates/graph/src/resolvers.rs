//! Parent resolvers.
//!
//! Each resolver is a pure function from a symbol and the read-only
//! reconciliation context to a candidate parent id. The reconciler tries
//! them in [`PARENT_RESOLVERS`] order and keeps the first candidate that
//! names a known symbol.

use crate::forest::{innermost_container_where, SpanForest};
use context_symbol_index::{Position, SourceSpan, Symbol, SymbolKind};
use std::collections::{BTreeSet, HashMap};

/// Forest lookup key: a span's name, its file and the start of its name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpanKey {
    pub name: String,
    pub file_uri: String,
    pub name_start: Position,
}

impl SpanKey {
    pub fn for_span(file_uri: &str, span: &SourceSpan) -> Self {
        Self {
            name: span.name.clone(),
            file_uri: file_uri.to_string(),
            name_start: span.name_location.start(),
        }
    }

    /// Key of a symbol's primary location, if it has one
    pub fn for_symbol(symbol: &Symbol) -> Option<Self> {
        symbol.primary_location().map(|loc| Self {
            name: symbol.name.clone(),
            file_uri: loc.file_uri.clone(),
            name_start: loc.start(),
        })
    }
}

/// Synthetic span id ↔ index symbol id
#[derive(Debug, Clone, Default)]
pub struct RemapTable {
    forward: HashMap<String, String>,
    reverse: HashMap<String, BTreeSet<String>>,
}

impl RemapTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, synthetic_id: impl Into<String>, real_id: impl Into<String>) {
        let (synthetic_id, real_id) = (synthetic_id.into(), real_id.into());
        self.reverse
            .entry(real_id.clone())
            .or_default()
            .insert(synthetic_id.clone());
        self.forward.insert(synthetic_id, real_id);
    }

    /// Real id for a synthetic one; any other id maps to itself
    #[must_use]
    pub fn resolve<'a>(&'a self, id: &'a str) -> &'a str {
        self.forward.get(id).map_or(id, String::as_str)
    }

    /// Whether `span_id` is one of the spans `symbol_id` was matched to
    #[must_use]
    pub fn is_own_span(&self, symbol_id: &str, span_id: &str) -> bool {
        symbol_id == span_id
            || self
                .reverse
                .get(symbol_id)
                .is_some_and(|spans| spans.contains(span_id))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

/// Read-only state shared by every resolver
pub struct ResolveContext<'a> {
    pub forest: &'a SpanForest,
    /// Language variants of one lexical entity, ordered by id
    pub spans_by_key: &'a HashMap<SpanKey, Vec<&'a SourceSpan>>,
    pub spans_by_id: &'a HashMap<&'a str, &'a SourceSpan>,
    pub remap: &'a RemapTable,
}

pub type ParentResolver = fn(&Symbol, &ResolveContext<'_>) -> Option<String>;

/// Resolvers in the order they are tried
pub const PARENT_RESOLVERS: &[(&str, ParentResolver)] = &[
    ("reference_container", reference_container),
    ("body_span", body_span_parent),
    ("bare_name", bare_name_container),
];

/// The index records the enclosing symbol on the reference that declares
/// or defines the symbol itself.
pub fn reference_container(symbol: &Symbol, ctx: &ResolveContext<'_>) -> Option<String> {
    symbol
        .references
        .iter()
        .filter(|r| r.kind.is_declaration_or_definition())
        .filter(|r| {
            Some(&r.location) == symbol.declaration.as_ref()
                || Some(&r.location) == symbol.definition.as_ref()
        })
        .find_map(|r| r.container())
        .map(|container| ctx.remap.resolve(container).to_string())
}

/// Parent of the span the symbol was matched to (or, for a synthetic
/// symbol, of the span it was made from).
pub fn body_span_parent(symbol: &Symbol, ctx: &ResolveContext<'_>) -> Option<String> {
    let parent = match ctx.spans_by_id.get(symbol.id.as_str()) {
        Some(own) => own.parent_id.as_deref()?,
        None => {
            let key = SpanKey::for_symbol(symbol)?;
            ctx.spans_by_key
                .get(&key)?
                .iter()
                .find_map(|span| span.parent_id.as_deref())?
        }
    };
    Some(ctx.remap.resolve(parent).to_string())
}

/// Innermost span enclosing the name of a symbol that has no body of its
/// own: fields, variables, enum constants, type aliases and bodiless
/// declarations.
pub fn bare_name_container(symbol: &Symbol, ctx: &ResolveContext<'_>) -> Option<String> {
    if symbol.body_location.is_some() || matches!(symbol.kind, SymbolKind::Namespace) {
        return None;
    }
    let loc = symbol.primary_location()?;
    let roots = ctx.forest.get(&loc.file_uri)?;
    let target = SourceSpan::bare_name(&loc.file_uri, symbol.name.as_str(), symbol.language.as_str(), loc.relative());

    let container = innermost_container_where(roots, &target, |candidate| {
        !ctx.remap.is_own_span(&symbol.id, &candidate.id)
    });
    match container {
        Some(span) => Some(ctx.remap.resolve(&span.id).to_string()),
        None => {
            log::debug!(
                "No container for {} {}{} at {}:{}:{}",
                symbol.kind,
                symbol.scope,
                symbol.name,
                loc.file_uri,
                loc.start_line,
                loc.start_column
            );
            None
        }
    }
}
