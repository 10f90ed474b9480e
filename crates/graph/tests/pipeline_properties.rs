mod common;

use common::{init_logging, shapes_index, shapes_spans, shapes_symbols, span, span_table, SHAPES};
use context_symbol_graph::{
    build_span_forest, forest_spans, within, AssemblyStrategy, CallGraphExtractor, CallStrategy,
    ContextAssembler, Engine, EngineConfig, EngineOutput, GraphError, RelationshipType,
    SpanTreeNode,
};
use context_symbol_index::{RelativeLocation, SymbolIndex};
use pretty_assertions::assert_eq;
use std::collections::{BTreeSet, HashSet};

fn run(index: SymbolIndex, spans: common::SpanTable) -> anyhow::Result<EngineOutput> {
    init_logging();
    Ok(Engine::builder(EngineConfig::full_build())
        .symbol_index(index)
        .source_spans(spans)
        .build()?
        .run())
}

fn shapes() -> anyhow::Result<EngineOutput> {
    run(shapes_index(shapes_symbols()), span_table(shapes_spans()))
}

fn parent_of(output: &EngineOutput, id: &str) -> Option<String> {
    output.index.get(id).and_then(|s| s.parent_id.clone())
}

fn assert_contained(node: &SpanTreeNode) {
    for child in &node.children {
        assert!(
            within(&child.span, &node.span),
            "{} is not within {}",
            child.span.name,
            node.span.name
        );
        assert_eq!(child.span.parent_id.as_deref(), Some(node.span.id.as_str()));
        assert_contained(child);
    }
}

#[test]
fn every_child_lies_within_its_parent() -> anyhow::Result<()> {
    let output = shapes()?;
    let roots = &output.forest[SHAPES];
    for root in roots {
        assert_contained(root);
    }
    for pair in roots.windows(2) {
        assert!(pair[0].span.body_location.end() <= pair[1].span.body_location.start());
    }
    assert_eq!(forest_spans(roots).count(), 5);
    Ok(())
}

#[test]
fn symbols_receive_bodies_and_parents() -> anyhow::Result<()> {
    let output = shapes()?;

    assert_eq!(output.report.matched, 4);
    assert_eq!(output.report.synthesized, 1);
    assert_eq!(
        output.index.get("AREA").and_then(|s| s.body_location),
        Some(RelativeLocation::new(3, 2, 5, 3))
    );

    assert_eq!(parent_of(&output, "SHAPE").as_deref(), Some("NS"));
    assert_eq!(parent_of(&output, "AREA").as_deref(), Some("SHAPE"));
    assert_eq!(parent_of(&output, "SIDES").as_deref(), Some("SHAPE"));
    assert_eq!(parent_of(&output, "HELPER").as_deref(), Some("NS"));
    assert_eq!(parent_of(&output, "NS"), None);

    let detail = output
        .index
        .symbols()
        .find(|s| s.name == "Detail")
        .expect("unmatched span is synthesized");
    assert_eq!(detail.parent_id, None);
    assert_eq!(detail.body_location, Some(RelativeLocation::new(11, 0, 13, 2)));
    Ok(())
}

#[test]
fn no_symbol_is_its_own_ancestor() -> anyhow::Result<()> {
    let output = shapes()?;
    for symbol in output.index.symbols() {
        assert_ne!(symbol.parent_id.as_deref(), Some(symbol.id.as_str()));

        let mut seen = HashSet::from([symbol.id.as_str()]);
        let mut current = symbol.parent_id.as_deref();
        while let Some(id) = current {
            assert!(seen.insert(id), "parent chain of {} loops at {id}", symbol.id);
            current = output.index.get(id).and_then(|s| s.parent_id.as_deref());
        }
    }
    assert_eq!(output.report.cycles_broken, 0);
    Ok(())
}

#[test]
fn input_order_does_not_change_the_result() -> anyhow::Result<()> {
    let forward = shapes()?;

    let mut symbols = shapes_symbols();
    symbols.reverse();
    let mut spans = shapes_spans();
    spans.reverse();
    let backward = run(shapes_index(symbols), span_table(spans))?;

    assert_eq!(forward.index, backward.index);
    assert_eq!(forward.forest, backward.forest);
    assert_eq!(forward.call_graph, backward.call_graph);
    assert_eq!(forward.report, backward.report);
    Ok(())
}

#[test]
fn both_call_strategies_agree_when_both_are_possible() -> anyhow::Result<()> {
    let output = shapes()?;
    let extractor = CallGraphExtractor::new(&output.index);
    assert_eq!(extractor.strategy(), CallStrategy::Container);

    let by_container = extractor.extract_with(CallStrategy::Container);
    let by_location = extractor.extract_with(CallStrategy::Spatial);
    assert!(!by_container.is_empty());
    assert_eq!(by_container.caller_to_callees, by_location.caller_to_callees);
    assert_eq!(
        output.call_graph.callers_of("HELPER"),
        BTreeSet::from(["AREA".to_string()])
    );
    Ok(())
}

#[test]
fn same_name_at_different_positions_stays_distinct() -> anyhow::Result<()> {
    let mut spans = shapes_spans();
    spans.push(span(
        "Shape",
        "STRUCT_DECL",
        RelativeLocation::new(20, 7, 20, 12),
        RelativeLocation::new(20, 0, 22, 2),
    ));
    let output = run(shapes_index(shapes_symbols()), span_table(spans))?;
    assert_eq!(output.report.matched, 4);
    assert_eq!(output.report.synthesized, 2);
    assert_eq!(
        output.index.get("SHAPE").and_then(|s| s.body_location),
        Some(RelativeLocation::new(1, 0, 6, 2))
    );
    Ok(())
}

#[test]
fn scope_for_a_changed_file_covers_its_neighbourhood() -> anyhow::Result<()> {
    let output = shapes()?;
    let seeds = BTreeSet::from(["SIDES".to_string()]);
    let subset = output.scope_for_seeds(&seeds)?;
    assert_eq!(subset.direct_dependencies, BTreeSet::from(["SHAPE".to_string()]));
    // NS is two hops away through SHAPE
    assert!(!subset.ids().any(|id| id == "NS"));

    let whole_file = output.scope_for_files(&[SHAPES])?;
    assert_eq!(whole_file.len(), output.index.len());
    Ok(())
}

#[test]
fn graph_links_the_enriched_symbols() -> anyhow::Result<()> {
    let output = shapes()?;
    let assembler = ContextAssembler::new(output.graph);
    let ctx = assembler.assemble_for_symbol("AREA", AssemblyStrategy::Direct)?;
    let related: Vec<(&str, &[RelationshipType])> = ctx
        .related
        .iter()
        .map(|r| (r.node.id.as_str(), r.relationship.as_slice()))
        .collect();
    assert_eq!(
        related,
        vec![
            ("HELPER", &[RelationshipType::Calls][..]),
            ("SHAPE", &[RelationshipType::Contains][..]),
        ]
    );
    assert!(matches!(
        assembler.assemble_for_symbol("MISSING", AssemblyStrategy::Direct),
        Err(GraphError::NodeNotFound(_))
    ));
    Ok(())
}

#[test]
fn empty_span_table_still_builds() -> anyhow::Result<()> {
    let output = run(shapes_index(shapes_symbols()), common::SpanTable::new())?;
    assert!(build_span_forest(&common::SpanTable::new()).is_empty());
    assert_eq!(output.report.matched, 0);
    assert!(output.index.symbols().all(|s| s.body_location.is_none()));
    assert_eq!(parent_of(&output, "AREA"), None);
    Ok(())
}
