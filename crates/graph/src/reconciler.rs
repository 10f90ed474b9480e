//! Span/symbol reconciliation.
//!
//! Merges the cross-TU symbol index with the per-file span forests in two
//! phases:
//!
//! 1. **Match.** Every indexed symbol is looked up in the forest by
//!    `(name, file, name start)`. A hit copies the span's body onto the
//!    symbol and records `span id → symbol id` in the remap table. Spans no
//!    symbol claimed become synthetic symbols keyed by the span id.
//! 2. **Resolve.** With the remap table complete, every symbol runs the
//!    [`PARENT_RESOLVERS`] chain. Type-alias targets are rewritten through
//!    the same table.
//!
//! Phase 2 only reads the table phase 1 wrote, so the result does not
//! depend on the order symbols are visited in.

use crate::config::EngineConfig;
use crate::forest::{build_span_forest, forest_spans, SpanForest};
use crate::resolvers::{RemapTable, ResolveContext, SpanKey, PARENT_RESOLVERS};
use context_symbol_index::{PathManager, SourceSpan, Symbol, SymbolIndex, SymbolKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

/// Counters collected while reconciling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Dropped because they lie outside the project root
    pub outside_project: usize,
    /// Dropped because they have neither a definition nor a declaration
    pub unlocated: usize,
    pub matched: usize,
    pub synthesized: usize,
    /// Lookup keys observed under more than one language mode
    pub shared_span_variants: usize,
    pub parents_assigned: usize,
    pub self_parent_rejections: usize,
    /// Candidate parents that named no known symbol
    pub dangling_parents: usize,
    pub aliases_remapped: usize,
    pub cycles_broken: usize,
}

impl fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Reconciliation:")?;
        writeln!(f, "  filtered (outside project): {}", self.outside_project)?;
        writeln!(f, "  filtered (no location):     {}", self.unlocated)?;
        writeln!(f, "  matched to spans:           {}", self.matched)?;
        writeln!(f, "  synthetic symbols:          {}", self.synthesized)?;
        writeln!(f, "  shared span variants:       {}", self.shared_span_variants)?;
        writeln!(f, "  parents assigned:           {}", self.parents_assigned)?;
        writeln!(f, "  self-parent rejections:     {}", self.self_parent_rejections)?;
        writeln!(f, "  dangling parents:           {}", self.dangling_parents)?;
        writeln!(f, "  aliases remapped:           {}", self.aliases_remapped)?;
        write!(f, "  cycles broken:              {}", self.cycles_broken)
    }
}

/// Enriched symbol table plus the forest it was matched against
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub index: SymbolIndex,
    pub forest: SpanForest,
    pub report: ReconcileReport,
}

/// Index kind for a parser-level span kind
#[must_use]
pub fn index_kind_for_parser_kind(kind: &str) -> SymbolKind {
    match kind {
        "FUNCTION_DECL" | "FUNCTION_TEMPLATE" | "Function" => SymbolKind::Function,
        "CXX_METHOD" => SymbolKind::InstanceMethod,
        "CONSTRUCTOR" => SymbolKind::Constructor,
        "DESTRUCTOR" => SymbolKind::Destructor,
        "CONVERSION_FUNCTION" => SymbolKind::ConversionFunction,
        "STRUCT_DECL" => SymbolKind::Struct,
        "UNION_DECL" => SymbolKind::Union,
        "ENUM_DECL" => SymbolKind::Enum,
        "CLASS_DECL" | "CLASS_TEMPLATE" | "CLASS_TEMPLATE_PARTIAL_SPECIALIZATION" => {
            SymbolKind::Class
        }
        other => SymbolKind::Other(other.to_string()),
    }
}

pub struct Reconciler {
    config: EngineConfig,
}

impl Reconciler {
    pub const fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Drop symbols the engine never persists: unlocated ones and, with a
    /// project root configured, those located outside it. Namespaces are
    /// kept wherever they are declared.
    pub fn prefilter(&self, index: &mut SymbolIndex, report: &mut ReconcileReport) {
        let paths = self.config.project_root.as_deref().map(PathManager::new);
        let before = index.len();
        let drop_unlocated = self.config.drop_unlocated_symbols;
        let (mut unlocated, mut outside) = (0usize, 0usize);

        index.retain(|symbol| {
            let Some(loc) = symbol.primary_location() else {
                if drop_unlocated {
                    unlocated += 1;
                    return false;
                }
                return true;
            };
            let inside = paths
                .as_ref()
                .map_or(true, |paths| paths.is_uri_within_project(&loc.file_uri));
            if !inside && !matches!(symbol.kind, SymbolKind::Namespace) {
                outside += 1;
                return false;
            }
            true
        });

        report.unlocated += unlocated;
        report.outside_project += outside;
        log::info!("Filtered {before} symbols to {} symbols.", index.len());
    }

    /// Build the span forest and reconcile it with `index`
    pub fn reconcile(
        &self,
        mut index: SymbolIndex,
        source_spans: &BTreeMap<String, BTreeSet<SourceSpan>>,
    ) -> Reconciliation {
        let mut report = ReconcileReport::default();
        self.prefilter(&mut index, &mut report);

        let forest = build_span_forest(source_spans);
        self.reconcile_forest(&mut index, &forest, &mut report);

        Reconciliation {
            index,
            forest,
            report,
        }
    }

    /// Reconcile against an already built forest
    pub fn reconcile_forest(
        &self,
        index: &mut SymbolIndex,
        forest: &SpanForest,
        report: &mut ReconcileReport,
    ) {
        let mut spans_by_key: HashMap<SpanKey, Vec<&SourceSpan>> = HashMap::new();
        let mut spans_by_id: HashMap<&str, &SourceSpan> = HashMap::new();
        let mut key_order: Vec<SpanKey> = Vec::new();
        for (file, roots) in forest {
            for span in forest_spans(roots) {
                let key = SpanKey::for_span(file, span);
                let variants = spans_by_key.entry(key.clone()).or_default();
                if variants.is_empty() {
                    key_order.push(key);
                }
                variants.push(span);
                spans_by_id.insert(span.id.as_str(), span);
            }
        }
        for variants in spans_by_key.values_mut() {
            variants.sort_by(|a, b| a.id.cmp(&b.id));
            if variants.len() > 1 {
                report.shared_span_variants += 1;
            }
        }
        key_order.sort();

        // Phase 1: match
        let mut remap = RemapTable::new();
        let mut claimed: HashSet<SpanKey> = HashSet::new();
        for symbol in index.symbols_mut() {
            let Some(key) = SpanKey::for_symbol(symbol) else {
                continue;
            };
            if claimed.contains(&key) {
                continue;
            }
            let Some(variants) = spans_by_key.get(&key) else {
                continue;
            };
            symbol.body_location = Some(variants[0].body_location);
            for span in variants {
                remap.insert(span.id.as_str(), symbol.id.as_str());
            }
            claimed.insert(key);
            report.matched += 1;
        }

        if self.config.synthesize_unmatched_spans {
            for key in key_order.iter().filter(|key| !claimed.contains(*key)) {
                for span in &spans_by_key[key] {
                    if index.contains(&span.id) {
                        log::debug!("Span {} already has a symbol", span.id);
                        continue;
                    }
                    index.insert(synthesize(span, &key.file_uri));
                    report.synthesized += 1;
                }
            }
        }
        log::info!(
            "Matched and enriched {} existing symbols; added {} synthetic symbols for anonymous structures.",
            report.matched,
            report.synthesized
        );

        // Phase 2: resolve
        let ctx = ResolveContext {
            forest,
            spans_by_key: &spans_by_key,
            spans_by_id: &spans_by_id,
            remap: &remap,
        };
        let mut parents: Vec<(String, String)> = Vec::new();
        let mut aliases: Vec<(String, String)> = Vec::new();
        for symbol in index.symbols() {
            if let Some(target) = symbol.aliased_type_id.as_deref() {
                let resolved = remap.resolve(target);
                if resolved != target {
                    aliases.push((symbol.id.clone(), resolved.to_string()));
                }
            }
            if let Some(parent) = resolve_parent(symbol, &ctx, index, report) {
                parents.push((symbol.id.clone(), parent));
            }
        }

        report.parents_assigned += parents.len();
        report.aliases_remapped += aliases.len();
        for (id, parent) in parents {
            if let Some(symbol) = index.get_mut(&id) {
                symbol.parent_id = Some(parent);
            }
        }
        for (id, target) in aliases {
            if let Some(symbol) = index.get_mut(&id) {
                symbol.aliased_type_id = Some(target);
            }
        }

        report.cycles_broken += break_parent_cycles(index);
        log::info!(
            "Assigned parent_id to {} symbols based on lexical nesting.",
            report.parents_assigned
        );
    }
}

fn resolve_parent(
    symbol: &Symbol,
    ctx: &ResolveContext<'_>,
    index: &SymbolIndex,
    report: &mut ReconcileReport,
) -> Option<String> {
    for (name, resolver) in PARENT_RESOLVERS {
        let Some(candidate) = resolver(symbol, ctx) else {
            continue;
        };
        if candidate == symbol.id {
            log::warn!(
                "Found same parent id {candidate} for {} {}{} (via {name})",
                symbol.kind,
                symbol.scope,
                symbol.name
            );
            report.self_parent_rejections += 1;
            return None;
        }
        if !index.contains(&candidate) {
            log::debug!("Parent {candidate} of {} (via {name}) is not a known symbol", symbol.id);
            report.dangling_parents += 1;
            continue;
        }
        return Some(candidate);
    }
    None
}

fn synthesize(span: &SourceSpan, file_uri: &str) -> Symbol {
    let loc = span.name_location.in_file(file_uri);
    Symbol::new(
        span.id.as_str(),
        span.name.as_str(),
        index_kind_for_parser_kind(&span.kind),
    )
    .with_declaration(loc.clone())
    .with_definition(loc)
    .with_language(span.language.as_str())
    .with_body(span.body_location)
}

/// Cut every `parent_id` chain that loops back on itself. The link that
/// closes the loop (seen from the smallest id on it) is removed.
fn break_parent_cycles(index: &mut SymbolIndex) -> usize {
    let mut settled: HashSet<String> = HashSet::new();
    let mut to_cut: Vec<String> = Vec::new();

    for start in index.ids() {
        if settled.contains(start) {
            continue;
        }
        let mut path: Vec<&str> = Vec::new();
        let mut on_path: HashSet<&str> = HashSet::new();
        let mut current = Some(start);
        while let Some(id) = current {
            if settled.contains(id) {
                break;
            }
            if !on_path.insert(id) {
                if let Some(last) = path.last() {
                    to_cut.push((*last).to_string());
                }
                break;
            }
            path.push(id);
            current = index.get(id).and_then(|s| s.parent_id.as_deref());
        }
        settled.extend(path.into_iter().map(str::to_string));
    }

    for id in &to_cut {
        if let Some(symbol) = index.get_mut(id) {
            log::warn!("Breaking parent cycle at {id}");
            symbol.parent_id = None;
        }
    }
    to_cut.len()
}
