use crate::location::RelativeLocation;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// Parser-level kinds that denote a bare name with no lexical body
const BARE_NAME_KINDS: &[&str] = &["Field", "Variable", "EnumConstant", "FIELD_DECL", "VAR_DECL"];

/// A lexical region reported by the AST/span parser.
///
/// Identity is the content-addressed `id`; two spans with the same name,
/// file, kind, language and coordinates are the same span regardless of
/// which worker or translation unit produced them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSpan {
    pub name: String,
    /// Parser-level kind string (e.g. `CXX_METHOD`, `STRUCT_DECL`)
    pub kind: String,
    pub language: String,
    pub name_location: RelativeLocation,
    pub body_location: RelativeLocation,
    pub id: String,
    /// Lexically enclosing span, assigned by the forest builder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl SourceSpan {
    /// Build a span and derive its content-addressed id
    #[must_use]
    pub fn new(
        file_uri: &str,
        name: impl Into<String>,
        kind: impl Into<String>,
        language: impl Into<String>,
        name_location: RelativeLocation,
        body_location: RelativeLocation,
    ) -> Self {
        let name = name.into();
        let kind = kind.into();
        let language = language.into();
        let id = span_id(
            file_uri,
            &name,
            &kind,
            &language,
            &name_location,
            &body_location,
        );
        Self {
            name,
            kind,
            language,
            name_location,
            body_location,
            id,
            parent_id: None,
        }
    }

    /// Degenerate span at a name position, used for containment queries on
    /// entities that have no body of their own
    #[must_use]
    pub fn bare_name(
        file_uri: &str,
        name: impl Into<String>,
        language: impl Into<String>,
        name_location: RelativeLocation,
    ) -> Self {
        let point = RelativeLocation::point(name_location.start_line, name_location.start_column);
        Self::new(file_uri, name, "Field", language, name_location, point)
    }

    /// Bare names and variables may sit inside single-line bodies
    #[must_use]
    pub fn is_bare_name(&self) -> bool {
        self.body_location.is_zero_width() || BARE_NAME_KINDS.contains(&self.kind.as_str())
    }
}

impl PartialEq for SourceSpan {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SourceSpan {}

impl Hash for SourceSpan {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for SourceSpan {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SourceSpan {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

/// Deterministic id for a span: identical content yields identical ids in
/// every process, which makes union of worker outputs idempotent.
#[must_use]
pub fn span_id(
    file_uri: &str,
    name: &str,
    kind: &str,
    language: &str,
    name_location: &RelativeLocation,
    body_location: &RelativeLocation,
) -> String {
    let key = format!(
        "{file_uri}#{name}#{kind}#{language}#{}_{}#{}_{}_{}_{}",
        name_location.start_line,
        name_location.start_column,
        body_location.start_line,
        body_location.start_column,
        body_location.end_line,
        body_location.end_column,
    );
    let digest = Sha256::digest(key.as_bytes());
    hex_encode_lower(&digest[..16])
}

pub(crate) fn hex_encode_lower(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(bytes.len().saturating_mul(2));
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}
