//! # Context Symbol Index
//!
//! Data model for compiler-level descriptions of a C/C++ codebase: the
//! cross-translation-unit symbol index and the per-file span lists produced
//! by AST parsers.
//!
//! ## Architecture
//!
//! ```text
//! Index documents (symbols, references, relations)
//!     │
//!     └──> IndexLinker
//!            ├─ Attach references to their symbols
//!            ├─ Detect format flags (container field, call kind)
//!            ├─ Decode relation predicates (base-of, overridden-by)
//!            └─ SymbolIndex (id → Symbol, callable sub-index)
//!
//! Span parse workers (one WorkerContext each)
//!     │
//!     └──> SpanParseOutput (file → SourceSpan set, include relations)
//!            └─ merge() across workers, order-independent
//! ```
//!
//! Every identifier is a content-addressed string, so tables produced by
//! separate processes can be unioned without coordination.
//!
//! ## Example
//!
//! ```rust
//! use context_symbol_index::IndexLinker;
//!
//! let mut linker = IndexLinker::new();
//! linker.add_json(r#"{
//!     "ID": "A1", "Name": "main",
//!     "SymInfo": { "Kind": "Function", "Lang": "C" },
//!     "Definition": {
//!         "FileURI": "file:///src/main.c",
//!         "Start": { "Line": 2, "Column": 4 },
//!         "End": { "Line": 2, "Column": 8 }
//!     }
//! }"#).unwrap();
//!
//! let index = linker.link();
//! assert_eq!(index.callable_count(), 1);
//! ```

mod document;
mod error;
mod index;
mod location;
mod paths;
mod span;
mod symbol;
mod worker;

pub use document::{
    IndexLinker, RawDocument, RawIdRef, RawLocation, RawPosition, RawReference, RawRefsDoc,
    RawRelationDoc, RawSymInfo, RawSymbolDoc, PREDICATE_BASE_OF, PREDICATE_OVERRIDDEN_BY,
};
pub use error::{IndexError, Result};
pub use index::{Relation, SymbolIndex};
pub use location::{Location, Position, RelativeLocation};
pub use paths::{file_uri_for_path, path_for_file_uri, PathManager, SourceFileKind};
pub use span::{span_id, SourceSpan};
pub use symbol::{NodeLabel, RefKind, Reference, Symbol, SymbolKind, NULL_CONTAINER_ID};
pub use worker::{HeaderKey, MacroContext, SpanParseOutput, WorkerContext};
