#![allow(dead_code)]

use context_symbol_index::{Location, Reference, RelativeLocation, SourceSpan, Symbol, SymbolIndex, SymbolKind};
use std::collections::{BTreeMap, BTreeSet};

pub const SHAPES: &str = "file:///p/src/shapes.cpp";

pub type SpanTable = BTreeMap<String, BTreeSet<SourceSpan>>;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn loc(line: u32, col: u32, len: u32) -> Location {
    Location::new(SHAPES, line, col, line, col + len)
}

pub fn span(name: &str, kind: &str, name_loc: RelativeLocation, body: RelativeLocation) -> SourceSpan {
    SourceSpan::new(SHAPES, name, kind, "Cpp", name_loc, body)
}

/// ```text
///  0 namespace geo {
///  1 struct Shape {
///  2   int sides;
///  3   double area() const {
///  4     return helper(sides);
///  5   }
///  6 };
///  7 double helper(int n) {
///  8   return n * 1.5;
///  9 }
/// 10 }
/// 11 struct Detail {
/// 12   int x;
/// 13 };
/// ```
pub fn shapes_spans() -> Vec<SourceSpan> {
    vec![
        span("geo", "NAMESPACE", RelativeLocation::new(0, 10, 0, 13), RelativeLocation::new(0, 0, 10, 1)),
        span("Shape", "STRUCT_DECL", RelativeLocation::new(1, 7, 1, 12), RelativeLocation::new(1, 0, 6, 2)),
        span("area", "CXX_METHOD", RelativeLocation::new(3, 9, 3, 13), RelativeLocation::new(3, 2, 5, 3)),
        span("helper", "FUNCTION_DECL", RelativeLocation::new(7, 7, 7, 13), RelativeLocation::new(7, 0, 9, 1)),
        span("Detail", "STRUCT_DECL", RelativeLocation::new(11, 7, 11, 13), RelativeLocation::new(11, 0, 13, 2)),
    ]
}

pub fn span_table(spans: impl IntoIterator<Item = SourceSpan>) -> SpanTable {
    BTreeMap::from([(SHAPES.to_string(), spans.into_iter().collect())])
}

pub fn shapes_symbols() -> Vec<Symbol> {
    vec![
        Symbol::new("NS", "geo", SymbolKind::Namespace)
            .with_declaration(loc(0, 10, 3))
            .with_language("Cpp"),
        Symbol::new("SHAPE", "Shape", SymbolKind::Struct)
            .with_scope("geo::")
            .with_definition(loc(1, 7, 5))
            .with_language("Cpp"),
        Symbol::new("SIDES", "sides", SymbolKind::Field)
            .with_scope("geo::Shape::")
            .with_declaration(loc(2, 6, 5))
            .with_language("Cpp"),
        Symbol::new("AREA", "area", SymbolKind::InstanceMethod)
            .with_scope("geo::Shape::")
            .with_definition(loc(3, 9, 4))
            .with_language("Cpp"),
        Symbol::new("HELPER", "helper", SymbolKind::Function)
            .with_scope("geo::")
            .with_definition(loc(7, 7, 6))
            .with_reference(Reference::new(20, loc(4, 11, 6)).with_container("AREA"))
            .with_language("Cpp"),
    ]
}

pub fn shapes_index(symbols: impl IntoIterator<Item = Symbol>) -> SymbolIndex {
    SymbolIndex::from_symbols(symbols).with_format(true, true)
}
