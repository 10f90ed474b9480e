//! Raw cross-TU index documents and the linker that turns them into a
//! [`SymbolIndex`].
//!
//! The index is a stream of independent documents: symbol records,
//! reference lists keyed by symbol id, and binary relations. Documents can
//! arrive in any order and from any number of parse batches; linking only
//! happens once every batch has been added.

use crate::error::{IndexError, Result};
use crate::index::SymbolIndex;
use crate::location::Location;
use crate::symbol::{RefKind, Reference, Symbol, SymbolKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Relation predicate: subject is a base class of object
pub const PREDICATE_BASE_OF: u32 = 0;
/// Relation predicate: subject method is overridden by object method
pub const PREDICATE_OVERRIDDEN_BY: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawPosition {
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawLocation {
    #[serde(rename = "FileURI")]
    pub file_uri: String,
    pub start: RawPosition,
    pub end: RawPosition,
}

impl From<RawLocation> for Location {
    fn from(raw: RawLocation) -> Self {
        Self::new(
            raw.file_uri,
            raw.start.line,
            raw.start.column,
            raw.end.line,
            raw.end.column,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawSymInfo {
    pub kind: String,
    #[serde(default)]
    pub lang: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawIdRef {
    #[serde(rename = "ID")]
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawSymbolDoc {
    #[serde(rename = "ID")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub scope: String,
    pub sym_info: RawSymInfo,
    #[serde(default)]
    pub canonical_declaration: Option<RawLocation>,
    #[serde(default)]
    pub definition: Option<RawLocation>,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub return_type: String,
    #[serde(default, rename = "Type")]
    pub type_name: String,
}

impl From<RawSymbolDoc> for Symbol {
    fn from(doc: RawSymbolDoc) -> Self {
        let mut symbol = Self::new(doc.id, doc.name, SymbolKind::from(doc.sym_info.kind))
            .with_scope(doc.scope)
            .with_language(doc.sym_info.lang);
        symbol.declaration = doc.canonical_declaration.map(Location::from);
        symbol.definition = doc.definition.map(Location::from);
        symbol.signature = doc.signature;
        symbol.return_type = doc.return_type;
        symbol.type_name = doc.type_name;
        symbol
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawReference {
    pub kind: u32,
    pub location: RawLocation,
    #[serde(default)]
    pub container: Option<RawIdRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawRefsDoc {
    #[serde(rename = "ID")]
    pub id: String,
    pub references: Vec<RawReference>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawRelationDoc {
    pub subject: RawIdRef,
    pub predicate: u32,
    pub object: RawIdRef,
}

/// One document of the index stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawDocument {
    Symbol(RawSymbolDoc),
    Refs(RawRefsDoc),
    Relation(RawRelationDoc),
}

impl RawDocument {
    /// Decode one document from a JSON value. `null` documents (empty
    /// separators in the stream) decode to `None`.
    pub fn from_json_value(value: serde_json::Value) -> Result<Option<Self>> {
        if value.is_null() {
            return Ok(None);
        }
        let Some(object) = value.as_object() else {
            return Err(IndexError::malformed("document is not an object"));
        };
        if !object.contains_key("ID") && !object.contains_key("Subject") {
            return Err(IndexError::malformed("document has neither ID nor Subject"));
        }
        Ok(Some(serde_json::from_value(value)?))
    }
}

/// Accumulates raw documents and links them into a [`SymbolIndex`].
#[derive(Debug, Default)]
pub struct IndexLinker {
    symbols: BTreeMap<String, Symbol>,
    unlinked_refs: Vec<RawRefsDoc>,
    unlinked_relations: Vec<RawRelationDoc>,
}

impl IndexLinker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_document(&mut self, doc: RawDocument) {
        match doc {
            RawDocument::Symbol(doc) => {
                self.symbols.insert(doc.id.clone(), Symbol::from(doc));
            }
            RawDocument::Refs(doc) => self.unlinked_refs.push(doc),
            RawDocument::Relation(doc) => self.unlinked_relations.push(doc),
        }
    }

    /// Add every document of a JSON text holding either one document or an
    /// array of documents. Returns the number of documents added.
    pub fn add_json(&mut self, text: &str) -> Result<usize> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let values = match value {
            serde_json::Value::Array(items) => items,
            other => vec![other],
        };

        let mut added = 0;
        for value in values {
            if let Some(doc) = RawDocument::from_json_value(value)? {
                self.add_document(doc);
                added += 1;
            }
        }
        Ok(added)
    }

    /// Fold in a batch parsed elsewhere (e.g. by another worker)
    pub fn extend(&mut self, other: Self) {
        self.symbols.extend(other.symbols);
        self.unlinked_refs.extend(other.unlinked_refs);
        self.unlinked_relations.extend(other.unlinked_relations);
    }

    /// Attach references, detect the index format and decode relations
    #[must_use]
    pub fn link(self) -> SymbolIndex {
        let Self {
            mut symbols,
            unlinked_refs,
            unlinked_relations,
        } = self;

        let mut has_container_field = false;
        let mut has_call_kind = false;
        let mut dangling_refs = 0usize;

        for doc in unlinked_refs {
            let Some(symbol) = symbols.get_mut(&doc.id) else {
                dangling_refs += 1;
                continue;
            };
            for raw in doc.references {
                let reference = Reference {
                    kind: RefKind(raw.kind),
                    location: Location::from(raw.location),
                    container_id: raw.container.map(|c| c.id),
                };

                if !has_container_field && reference.container_id.is_some() {
                    has_container_field = true;
                    has_call_kind = true;
                } else if !has_call_kind && reference.kind.has_call_bit() {
                    has_call_kind = true;
                }
                symbol.references.push(reference);
            }
        }
        if dangling_refs > 0 {
            log::debug!("Skipped {dangling_refs} reference documents for unknown symbols");
        }

        let mut inheritance_relations = Vec::new();
        let mut override_relations = Vec::new();
        for rel in unlinked_relations {
            match rel.predicate {
                PREDICATE_BASE_OF => inheritance_relations.push((rel.subject.id, rel.object.id)),
                PREDICATE_OVERRIDDEN_BY => override_relations.push((rel.subject.id, rel.object.id)),
                other => log::debug!("Ignoring relation with unknown predicate {other}"),
            }
        }

        let mut index = SymbolIndex::from_symbols(symbols.into_values());
        index.has_container_field = has_container_field;
        index.has_call_kind = has_call_kind;
        index.inheritance_relations = inheritance_relations;
        index.override_relations = override_relations;

        log::info!(
            "Cross-referencing complete. Found {} symbols and {} functions.",
            index.len(),
            index.callable_count()
        );
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn symbol_doc(id: &str, name: &str, kind: &str) -> serde_json::Value {
        json!({
            "ID": id,
            "Name": name,
            "Scope": "",
            "SymInfo": { "Kind": kind, "Lang": "Cpp" },
            "CanonicalDeclaration": {
                "FileURI": "file:///p/a.cpp",
                "Start": { "Line": 1, "Column": 5 },
                "End": { "Line": 1, "Column": 8 }
            },
            "References": 2
        })
    }

    #[test]
    fn test_symbol_document_decodes() {
        let doc = RawDocument::from_json_value(symbol_doc("AA", "foo", "Function"))
            .unwrap()
            .unwrap();
        let RawDocument::Symbol(doc) = doc else {
            panic!("expected a symbol document");
        };
        let symbol = Symbol::from(doc);
        assert_eq!(symbol.kind, SymbolKind::Function);
        assert_eq!(symbol.language, "Cpp");
        assert_eq!(symbol.declaration.unwrap().start_column, 5);
    }

    #[test]
    fn test_null_document_is_skipped() {
        assert!(RawDocument::from_json_value(serde_json::Value::Null)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_document_without_id_is_rejected() {
        let err = RawDocument::from_json_value(json!({ "Name": "x" })).unwrap_err();
        assert!(matches!(err, IndexError::MalformedDocument(_)));
    }

    #[test]
    fn test_legacy_format_detection() {
        let mut linker = IndexLinker::new();
        linker
            .add_json(
                &json!([
                    symbol_doc("AA", "foo", "Function"),
                    { "ID": "AA", "References": [
                        { "Kind": 12, "Location": {
                            "FileURI": "file:///p/a.cpp",
                            "Start": { "Line": 9, "Column": 2 },
                            "End": { "Line": 9, "Column": 5 } } }
                    ] }
                ])
                .to_string(),
            )
            .unwrap();
        let index = linker.link();
        assert!(!index.has_container_field);
        assert!(!index.has_call_kind);
        assert_eq!(index.get("AA").unwrap().references.len(), 1);
    }

    #[test]
    fn test_relations_are_decoded_by_predicate() {
        let mut linker = IndexLinker::new();
        linker
            .add_json(
                &json!([
                    { "Subject": { "ID": "B" }, "Predicate": 0, "Object": { "ID": "D" } },
                    { "Subject": { "ID": "Bm" }, "Predicate": 1, "Object": { "ID": "Dm" } },
                    { "Subject": { "ID": "X" }, "Predicate": 7, "Object": { "ID": "Y" } }
                ])
                .to_string(),
            )
            .unwrap();
        let index = linker.link();
        assert_eq!(index.inheritance_relations, vec![("B".to_string(), "D".to_string())]);
        assert_eq!(index.override_relations, vec![("Bm".to_string(), "Dm".to_string())]);
    }
}
