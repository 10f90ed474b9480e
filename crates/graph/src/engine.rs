//! End-to-end pipeline: reconcile spans with the index, extract calls,
//! assemble the navigable graph, then answer incremental scope requests.

use crate::builder::SymbolGraphBuilder;
use crate::call_graph::{CallGraph, CallGraphExtractor, CallGraphStats};
use crate::config::EngineConfig;
use crate::error::{GraphError, Result};
use crate::forest::SpanForest;
use crate::reconciler::{ReconcileReport, Reconciler};
use crate::scope::{ScopeBuilder, SufficientSubset};
use crate::types::SymbolGraph;
use context_symbol_index::{IndexLinker, SourceSpan, SpanParseOutput, SymbolIndex};
use std::collections::{BTreeMap, BTreeSet};

type SpanTable = BTreeMap<String, BTreeSet<SourceSpan>>;

/// Collects the engine inputs; both tables are required
#[derive(Debug, Default)]
pub struct EngineBuilder {
    config: EngineConfig,
    index: Option<SymbolIndex>,
    source_spans: Option<SpanTable>,
}

impl EngineBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn symbol_index(mut self, index: SymbolIndex) -> Self {
        self.index = Some(index);
        self
    }

    /// Link raw index documents, one JSON batch per entry, into the index
    pub fn index_documents<S: AsRef<str>>(self, batches: &[S]) -> Result<Self> {
        let mut linker = IndexLinker::new();
        for batch in batches {
            linker.add_json(batch.as_ref())?;
        }
        Ok(self.symbol_index(linker.link()))
    }

    #[must_use]
    pub fn source_spans(mut self, spans: SpanTable) -> Self {
        self.source_spans = Some(spans);
        self
    }

    /// Span table of a merged parse; include relations are not consumed
    #[must_use]
    pub fn parse_output(self, output: SpanParseOutput) -> Self {
        self.source_spans(output.source_spans)
    }

    pub fn build(self) -> Result<Engine> {
        self.config.validate()?;
        let index = self.index.ok_or_else(|| GraphError::missing_input("symbol index"))?;
        let source_spans = self
            .source_spans
            .ok_or_else(|| GraphError::missing_input("source span table"))?;
        Ok(Engine {
            config: self.config,
            index,
            source_spans,
        })
    }
}

pub struct Engine {
    config: EngineConfig,
    index: SymbolIndex,
    source_spans: SpanTable,
}

impl Engine {
    pub fn builder(config: EngineConfig) -> EngineBuilder {
        EngineBuilder::new(config)
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn run(self) -> EngineOutput {
        let reconciler = Reconciler::new(self.config.clone());
        let reconciled = reconciler.reconcile(self.index, &self.source_spans);
        log::info!("{}", reconciled.report);

        let call_graph = CallGraphExtractor::new(&reconciled.index)
            .with_reverse_index(self.config.emit_reverse_call_index)
            .extract();
        let call_stats = CallGraphStats::compute(&reconciled.index, &call_graph);
        log::info!("{call_stats}");

        let graph = SymbolGraphBuilder::new(&reconciled.index)
            .with_call_graph(&call_graph)
            .build();

        EngineOutput {
            config: self.config,
            index: reconciled.index,
            forest: reconciled.forest,
            report: reconciled.report,
            call_graph,
            call_stats,
            graph,
        }
    }
}

/// Everything one engine run produces
#[derive(Debug, Clone)]
pub struct EngineOutput {
    config: EngineConfig,
    pub index: SymbolIndex,
    pub forest: SpanForest,
    pub report: ReconcileReport,
    pub call_graph: CallGraph,
    pub call_stats: CallGraphStats,
    pub graph: SymbolGraph,
}

impl EngineOutput {
    fn scope_builder(&self) -> ScopeBuilder<'_> {
        ScopeBuilder::with_call_graph(&self.index, &self.call_graph, self.config.relations)
    }

    /// Seeds plus their one-hop neighbourhood
    pub fn scope_for_seeds(&self, seeds: &BTreeSet<String>) -> Result<SufficientSubset> {
        let subset = self.scope_builder().build(seeds);
        if self.config.require_seeds_present && subset.seeds.is_empty() {
            return Err(GraphError::missing_input(format!(
                "none of the {} requested seeds is in the symbol table",
                seeds.len()
            )));
        }
        Ok(subset)
    }

    /// Scope for every symbol defined or declared in `file_uris`
    pub fn scope_for_files<S: AsRef<str>>(&self, file_uris: &[S]) -> Result<SufficientSubset> {
        self.scope_for_seeds(&self.index.seeds_for_files(file_uris))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use context_symbol_index::{Location, RelativeLocation, Symbol, SymbolKind};

    const FILE: &str = "file:///p/src/a.cpp";

    fn spans() -> SpanTable {
        let span = SourceSpan::new(
            FILE,
            "f",
            "FUNCTION_DECL",
            "Cpp",
            RelativeLocation::new(1, 5, 1, 6),
            RelativeLocation::lines(1, 3),
        );
        BTreeMap::from([(FILE.to_string(), BTreeSet::from([span]))])
    }

    #[test]
    fn test_missing_tables_are_reported() {
        let err = Engine::builder(EngineConfig::default()).source_spans(spans()).build().err();
        assert!(matches!(err, Some(GraphError::MissingInput(_))));
        let err = Engine::builder(EngineConfig::default())
            .symbol_index(SymbolIndex::new())
            .build()
            .err();
        assert!(matches!(err, Some(GraphError::MissingInput(_))));
    }

    #[test]
    fn test_raw_documents_feed_the_index() -> anyhow::Result<()> {
        let batch = r#"[{ "ID": "F", "Name": "f", "SymInfo": { "Kind": "Function", "Lang": "Cpp" },
            "Definition": { "FileURI": "file:///p/src/a.cpp",
                            "Start": { "Line": 1, "Column": 5 }, "End": { "Line": 1, "Column": 6 } } }]"#;
        let output = Engine::builder(EngineConfig::default())
            .index_documents(&[batch])?
            .source_spans(spans())
            .build()?
            .run();
        assert_eq!(output.report.matched, 1);

        let err = Engine::builder(EngineConfig::default()).index_documents(&["not json"]).err();
        assert!(matches!(err, Some(GraphError::Index(_))));
        Ok(())
    }

    #[test]
    fn test_invalid_config_is_rejected_before_inputs() {
        let config = EngineConfig {
            project_root: Some("relative/root".to_string()),
            ..EngineConfig::default()
        };
        let err = Engine::builder(config).build().err();
        assert!(matches!(err, Some(GraphError::InvalidConfig(_))));
    }

    #[test]
    fn test_run_matches_body_and_scopes() -> anyhow::Result<()> {
        let index = SymbolIndex::from_symbols([
            Symbol::new("F", "f", SymbolKind::Function).with_definition(Location::new(FILE, 1, 5, 1, 6)),
            Symbol::new("OUT", "g", SymbolKind::Function)
                .with_definition(Location::new("file:///usr/include/x.h", 1, 0, 1, 1)),
        ]);
        let output = Engine::builder(EngineConfig::incremental("/p"))
            .symbol_index(index)
            .source_spans(spans())
            .build()?
            .run();

        assert_eq!(output.report.outside_project, 1);
        assert_eq!(output.index.get("F").and_then(|f| f.body_location), Some(RelativeLocation::lines(1, 3)));
        assert_eq!(output.graph.node_count(), 1);

        let subset = output.scope_for_files(&[FILE])?;
        assert_eq!(subset.len(), 1);

        let missing = output.scope_for_seeds(&BTreeSet::from(["NOPE".to_string()]));
        assert!(matches!(missing, Err(GraphError::MissingInput(_))));
        Ok(())
    }
}
