//! Boundary contract for parallel span-parse workers.
//!
//! Each worker owns one [`WorkerContext`] for its whole lifetime and returns
//! a [`SpanParseOutput`] per translation unit. Outputs are unioned with
//! [`SpanParseOutput::merge`] before reconciliation; since every span id is
//! content-addressed, the union does not depend on worker order.

use crate::paths::{PathManager, SourceFileKind};
use crate::span::{hex_encode_lower, SourceSpan};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

/// Preprocessor state a translation unit is compiled under.
///
/// Only `-D` and `-U` flags are significant; their order on the command
/// line is not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MacroContext {
    flags: BTreeSet<String>,
}

impl MacroContext {
    /// Collect macro flags from compile arguments. Accepts both the joined
    /// (`-DFOO=1`) and split (`-D FOO=1`) spellings.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Self {
        let mut flags = BTreeSet::new();
        let mut pending: Option<&str> = None;

        for arg in args.iter().map(AsRef::as_ref) {
            if let Some(prefix) = pending.take() {
                flags.insert(format!("{prefix}{arg}"));
                continue;
            }
            match arg {
                "-D" | "-U" => pending = Some(arg),
                _ if arg.starts_with("-D") || arg.starts_with("-U") => {
                    flags.insert(arg.to_string());
                }
                _ => {}
            }
        }
        Self { flags }
    }

    pub fn flags(&self) -> impl Iterator<Item = &str> {
        self.flags.iter().map(String::as_str)
    }

    /// Stable hash of the flag set
    #[must_use]
    pub fn hash_hex(&self) -> String {
        let mut hasher = Sha256::new();
        for flag in &self.flags {
            hasher.update(flag.as_bytes());
            hasher.update([0u8]);
        }
        hex_encode_lower(&hasher.finalize()[..8])
    }
}

/// Cache key for "this header was already processed"
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeaderKey {
    pub file: String,
    pub macro_context_hash: String,
}

/// A declaration site inside a header, scoped to a macro context
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DeclarationKey {
    header: HeaderKey,
    name: String,
    line: u32,
    column: u32,
}

/// Per-worker state, built once and passed to every parse task the worker
/// runs.
#[derive(Debug)]
pub struct WorkerContext {
    paths: PathManager,
    macro_context_hash: String,
    processed_headers: HashSet<HeaderKey>,
    processed_declarations: HashSet<DeclarationKey>,
}

impl WorkerContext {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            paths: PathManager::new(project_root),
            macro_context_hash: MacroContext::default().hash_hex(),
            processed_headers: HashSet::new(),
            processed_declarations: HashSet::new(),
        }
    }

    #[must_use]
    pub const fn paths(&self) -> &PathManager {
        &self.paths
    }

    /// Switch to the macro context of the next translation unit
    pub fn begin_translation_unit(&mut self, macros: &MacroContext) {
        self.macro_context_hash = macros.hash_hex();
    }

    #[must_use]
    pub fn macro_context_hash(&self) -> &str {
        &self.macro_context_hash
    }

    /// Mark a header as processed under the current macro context.
    /// Returns `true` the first time, `false` for every repeat.
    pub fn claim_header(&mut self, file: &str) -> bool {
        self.processed_headers.insert(HeaderKey {
            file: file.to_string(),
            macro_context_hash: self.macro_context_hash.clone(),
        })
    }

    #[must_use]
    pub fn is_header_processed(&self, file: &str) -> bool {
        self.processed_headers.contains(&HeaderKey {
            file: file.to_string(),
            macro_context_hash: self.macro_context_hash.clone(),
        })
    }

    /// Whether a declaration should produce a span. Declarations in source
    /// files always do; a header declaration only the first time it is seen
    /// under the current macro context.
    pub fn should_process_declaration(&mut self, file: &str, name: &str, line: u32, column: u32) -> bool {
        if !SourceFileKind::from_path(Path::new(file)).is_header() {
            return true;
        }
        self.processed_declarations.insert(DeclarationKey {
            header: HeaderKey {
                file: file.to_string(),
                macro_context_hash: self.macro_context_hash.clone(),
            },
            name: name.to_string(),
            line,
            column,
        })
    }

    /// Files outside the project root produce no spans
    #[must_use]
    pub fn accepts_file(&self, path: &Path) -> bool {
        self.paths.is_within_project(path)
    }
}

/// What one worker hands back for a batch of translation units.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanParseOutput {
    /// file URI → spans observed in that file
    pub source_spans: BTreeMap<String, BTreeSet<SourceSpan>>,
    /// (including file, included file); carried through unchanged
    pub include_relations: BTreeSet<(String, String)>,
}

impl SpanParseOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_span(&mut self, file_uri: impl Into<String>, span: SourceSpan) {
        self.source_spans.entry(file_uri.into()).or_default().insert(span);
    }

    pub fn add_include(&mut self, including: impl Into<String>, included: impl Into<String>) {
        self.include_relations.insert((including.into(), included.into()));
    }

    #[must_use]
    pub fn span_count(&self) -> usize {
        self.source_spans.values().map(BTreeSet::len).sum()
    }

    /// Union with another worker's output
    pub fn merge(&mut self, other: Self) {
        for (file, spans) in other.source_spans {
            self.source_spans.entry(file).or_default().extend(spans);
        }
        self.include_relations.extend(other.include_relations);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::RelativeLocation;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_macro_hash_ignores_flag_order_and_spelling() {
        let a = MacroContext::from_args(&["clang", "-DFOO=1", "-UBAR", "-c", "a.c"]);
        let b = MacroContext::from_args(&["clang", "-U", "BAR", "-D", "FOO=1", "a.c"]);
        assert_eq!(a, b);
        assert_eq!(a.hash_hex(), b.hash_hex());
        assert_eq!(a.flags().collect::<Vec<_>>(), vec!["-DFOO=1", "-UBAR"]);
    }

    #[test]
    fn test_macro_hash_distinguishes_definitions() {
        let a = MacroContext::from_args(&["-DFOO=1"]);
        let b = MacroContext::from_args(&["-DFOO=2"]);
        assert_ne!(a.hash_hex(), b.hash_hex());
    }

    #[test]
    fn test_header_cache_is_keyed_by_macro_context() {
        let mut ctx = WorkerContext::new("/proj");
        ctx.begin_translation_unit(&MacroContext::from_args(&["-DMODE=1"]));
        assert!(ctx.claim_header("/proj/inc/a.h"));
        assert!(!ctx.claim_header("/proj/inc/a.h"));
        assert!(ctx.is_header_processed("/proj/inc/a.h"));

        ctx.begin_translation_unit(&MacroContext::from_args(&["-DMODE=2"]));
        assert!(!ctx.is_header_processed("/proj/inc/a.h"));
        assert!(ctx.claim_header("/proj/inc/a.h"));
    }

    #[test]
    fn test_declarations_dedup_only_in_headers() {
        let mut ctx = WorkerContext::new("/proj");
        assert!(ctx.should_process_declaration("/proj/a.h", "f", 3, 5));
        assert!(!ctx.should_process_declaration("/proj/a.h", "f", 3, 5));
        assert!(ctx.should_process_declaration("/proj/a.c", "g", 3, 5));
        assert!(ctx.should_process_declaration("/proj/a.c", "g", 3, 5));
        assert!(ctx.accepts_file(Path::new("/proj/a.c")));
        assert!(!ctx.accepts_file(Path::new("/usr/include/a.h")));
    }

    #[test]
    fn test_output_merge_is_commutative_and_idempotent() {
        let file = "file:///proj/a.h";
        let span = |name: &str, line: u32| {
            SourceSpan::new(
                file,
                name,
                "STRUCT_DECL",
                "C",
                RelativeLocation::new(line, 7, line, 8),
                RelativeLocation::new(line, 0, line + 2, 1),
            )
        };

        let mut left = SpanParseOutput::new();
        left.add_span(file, span("A", 1));
        left.add_include("/proj/a.c", "/proj/a.h");
        let mut right = SpanParseOutput::new();
        right.add_span(file, span("A", 1));
        right.add_span(file, span("B", 10));

        let mut lr = left.clone();
        lr.merge(right.clone());
        let mut rl = right.clone();
        rl.merge(left);
        assert_eq!(lr, rl);
        assert_eq!(lr.span_count(), 2);

        let mut again = lr.clone();
        again.merge(right);
        assert_eq!(again, lr);
    }
}
