use crate::location::{Location, RelativeLocation};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Container id the index emits when a reference has no enclosing symbol
pub const NULL_CONTAINER_ID: &str = "0000000000000000";

/// Reference kind bitmask as emitted by the cross-TU index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefKind(pub u32);

impl RefKind {
    pub const DECLARATION: u32 = 1;
    pub const DEFINITION: u32 = 2;
    pub const REFERENCE: u32 = 4;
    pub const SPELLED: u32 = 8;
    pub const CALL: u32 = 16;

    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn contains(self, flag: u32) -> bool {
        self.0 & flag == flag
    }

    /// Declaration and/or definition, and nothing that marks a use site
    #[must_use]
    pub const fn is_declaration_or_definition(self) -> bool {
        let declares = self.0 & (Self::DECLARATION | Self::DEFINITION) != 0;
        let uses = self.0 & (Self::REFERENCE | Self::CALL) != 0;
        declares && !uses
    }

    /// Whether the kind carries the dedicated call bit (newer index formats)
    #[must_use]
    pub const fn has_call_bit(self) -> bool {
        self.0 >= Self::CALL
    }
}

/// One occurrence of a symbol in the source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    pub kind: RefKind,
    pub location: Location,
    /// Enclosing symbol at the reference point, when the index records it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
}

impl Reference {
    #[must_use]
    pub fn new(kind: u32, location: Location) -> Self {
        Self {
            kind: RefKind(kind),
            location,
            container_id: None,
        }
    }

    #[must_use]
    pub fn with_container(mut self, container_id: impl Into<String>) -> Self {
        self.container_id = Some(container_id.into());
        self
    }

    /// Container id with the null sentinel filtered out
    #[must_use]
    pub fn container(&self) -> Option<&str> {
        self.container_id
            .as_deref()
            .filter(|id| !id.is_empty() && *id != NULL_CONTAINER_ID)
    }
}

/// Kind of an indexed program entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SymbolKind {
    Function,
    InstanceMethod,
    StaticMethod,
    Constructor,
    Destructor,
    ConversionFunction,
    Class,
    Struct,
    Union,
    Enum,
    EnumConstant,
    Field,
    StaticProperty,
    Variable,
    Namespace,
    TypeAlias,
    Other(String),
}

impl SymbolKind {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Function => "Function",
            Self::InstanceMethod => "InstanceMethod",
            Self::StaticMethod => "StaticMethod",
            Self::Constructor => "Constructor",
            Self::Destructor => "Destructor",
            Self::ConversionFunction => "ConversionFunction",
            Self::Class => "Class",
            Self::Struct => "Struct",
            Self::Union => "Union",
            Self::Enum => "Enum",
            Self::EnumConstant => "EnumConstant",
            Self::Field => "Field",
            Self::StaticProperty => "StaticProperty",
            Self::Variable => "Variable",
            Self::Namespace => "Namespace",
            Self::TypeAlias => "TypeAlias",
            Self::Other(raw) => raw,
        }
    }

    /// Functions and every method flavour
    #[must_use]
    pub const fn is_callable(&self) -> bool {
        matches!(
            self,
            Self::Function
                | Self::InstanceMethod
                | Self::StaticMethod
                | Self::Constructor
                | Self::Destructor
                | Self::ConversionFunction
        )
    }

    #[must_use]
    pub const fn is_method(&self) -> bool {
        self.is_callable() && !matches!(self, Self::Function)
    }

    /// Entities that never own a lexical body
    #[must_use]
    pub const fn is_member_like(&self) -> bool {
        matches!(
            self,
            Self::Field | Self::StaticProperty | Self::Variable | Self::EnumConstant
        )
    }
}

impl From<&str> for SymbolKind {
    fn from(raw: &str) -> Self {
        match raw {
            "Function" => Self::Function,
            "InstanceMethod" => Self::InstanceMethod,
            "StaticMethod" => Self::StaticMethod,
            "Constructor" => Self::Constructor,
            "Destructor" => Self::Destructor,
            "ConversionFunction" => Self::ConversionFunction,
            "Class" => Self::Class,
            "Struct" => Self::Struct,
            "Union" => Self::Union,
            "Enum" => Self::Enum,
            "EnumConstant" => Self::EnumConstant,
            "Field" => Self::Field,
            "StaticProperty" => Self::StaticProperty,
            "Variable" => Self::Variable,
            "Namespace" => Self::Namespace,
            "TypeAlias" => Self::TypeAlias,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for SymbolKind {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<SymbolKind> for String {
    fn from(kind: SymbolKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Node label a symbol is persisted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeLabel {
    Namespace,
    Function,
    Method,
    ClassStructure,
    DataStructure,
    Field,
    Variable,
    TypeAlias,
}

impl NodeLabel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Namespace => "NAMESPACE",
            Self::Function => "FUNCTION",
            Self::Method => "METHOD",
            Self::ClassStructure => "CLASS_STRUCTURE",
            Self::DataStructure => "DATA_STRUCTURE",
            Self::Field => "FIELD",
            Self::Variable => "VARIABLE",
            Self::TypeAlias => "TYPE_ALIAS",
        }
    }
}

/// A semantically indexed program entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    /// Compiler-assigned or content-hashed identifier
    pub id: String,
    pub name: String,
    pub kind: SymbolKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declaration: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<Location>,
    #[serde(default)]
    pub references: Vec<Reference>,
    /// Enclosing qualified scope, e.g. `ns::inner::`
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub return_type: String,
    #[serde(default)]
    pub type_name: String,
    /// Full lexical extent, assigned during reconciliation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_location: Option<RelativeLocation>,
    /// Lexically enclosing symbol, assigned during reconciliation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aliased_type_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aliased_type_kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aliased_canonical_spelling: Option<String>,
}

impl Symbol {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: SymbolKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            declaration: None,
            definition: None,
            references: Vec::new(),
            scope: String::new(),
            language: String::new(),
            signature: String::new(),
            return_type: String::new(),
            type_name: String::new(),
            body_location: None,
            parent_id: None,
            aliased_type_id: None,
            aliased_type_kind: None,
            aliased_canonical_spelling: None,
        }
    }

    /// Builder: set definition location
    #[must_use]
    pub fn with_definition(mut self, location: Location) -> Self {
        self.definition = Some(location);
        self
    }

    /// Builder: set canonical declaration location
    #[must_use]
    pub fn with_declaration(mut self, location: Location) -> Self {
        self.declaration = Some(location);
        self
    }

    /// Builder: add a reference
    #[must_use]
    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.references.push(reference);
        self
    }

    /// Builder: set scope
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Builder: set language
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Builder: set body location
    #[must_use]
    pub const fn with_body(mut self, body: RelativeLocation) -> Self {
        self.body_location = Some(body);
        self
    }

    /// Definition if present, otherwise the canonical declaration
    #[must_use]
    pub fn primary_location(&self) -> Option<&Location> {
        self.definition.as_ref().or(self.declaration.as_ref())
    }

    #[must_use]
    pub fn file_uri(&self) -> Option<&str> {
        self.primary_location().map(|loc| loc.file_uri.as_str())
    }

    /// True when either the definition or the declaration lives in `file_uri`
    #[must_use]
    pub fn is_located_in(&self, file_uri: &str) -> bool {
        self.definition
            .as_ref()
            .is_some_and(|loc| loc.file_uri == file_uri)
            || self
                .declaration
                .as_ref()
                .is_some_and(|loc| loc.file_uri == file_uri)
    }

    #[must_use]
    pub const fn is_callable(&self) -> bool {
        self.kind.is_callable()
    }

    /// A callable with a body denotes exactly one function body
    #[must_use]
    pub const fn is_function_body(&self) -> bool {
        self.kind.is_callable() && self.body_location.is_some()
    }

    /// Fully qualified name of a namespace as it appears in member scopes
    #[must_use]
    pub fn qualified_namespace(&self) -> Option<String> {
        matches!(self.kind, SymbolKind::Namespace).then(|| format!("{}{}::", self.scope, self.name))
    }

    /// Node label for persistence, `None` for kinds that are not persisted
    #[must_use]
    pub fn node_label(&self) -> Option<NodeLabel> {
        let label = match self.kind {
            SymbolKind::Namespace => NodeLabel::Namespace,
            SymbolKind::Function => NodeLabel::Function,
            SymbolKind::InstanceMethod
            | SymbolKind::StaticMethod
            | SymbolKind::Constructor
            | SymbolKind::Destructor
            | SymbolKind::ConversionFunction => NodeLabel::Method,
            SymbolKind::Class => NodeLabel::ClassStructure,
            SymbolKind::Struct if self.language.eq_ignore_ascii_case("cpp") => {
                NodeLabel::ClassStructure
            }
            SymbolKind::Struct | SymbolKind::Union | SymbolKind::Enum => NodeLabel::DataStructure,
            SymbolKind::Field | SymbolKind::StaticProperty | SymbolKind::EnumConstant => {
                NodeLabel::Field
            }
            SymbolKind::Variable => NodeLabel::Variable,
            SymbolKind::TypeAlias => NodeLabel::TypeAlias,
            SymbolKind::Other(_) => return None,
        };
        Some(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(line: u32) -> Location {
        Location::new("file:///p/a.cpp", line, 4, line, 8)
    }

    #[test]
    fn test_ref_kind_declaration_or_definition() {
        assert!(RefKind(1).is_declaration_or_definition());
        assert!(RefKind(2).is_declaration_or_definition());
        assert!(RefKind(9).is_declaration_or_definition());
        assert!(RefKind(11).is_declaration_or_definition());
        assert!(!RefKind(4).is_declaration_or_definition());
        assert!(!RefKind(12).is_declaration_or_definition());
        assert!(!RefKind(28).is_declaration_or_definition());
        assert!(!RefKind(0).is_declaration_or_definition());
    }

    #[test]
    fn test_ref_kind_call_bit() {
        assert!(RefKind(20).has_call_bit());
        assert!(RefKind(28).has_call_bit());
        assert!(!RefKind(12).has_call_bit());
        assert!(RefKind(12).contains(RefKind::SPELLED));
    }

    #[test]
    fn test_container_sentinel_is_none() {
        let r = Reference::new(20, loc(3)).with_container(NULL_CONTAINER_ID);
        assert_eq!(r.container(), None);
        let r = Reference::new(20, loc(3)).with_container("ABCD");
        assert_eq!(r.container(), Some("ABCD"));
        let r = Reference::new(20, loc(3));
        assert_eq!(r.container(), None);
    }

    #[test]
    fn test_kind_round_trips_through_strings() {
        for raw in ["Function", "InstanceMethod", "Namespace", "TypeAlias", "Macro"] {
            let kind = SymbolKind::from(raw);
            assert_eq!(kind.as_str(), raw);
        }
        assert_eq!(SymbolKind::from("Macro"), SymbolKind::Other("Macro".to_string()));
    }

    #[test]
    fn test_callable_kinds() {
        assert!(SymbolKind::Function.is_callable());
        assert!(SymbolKind::Destructor.is_callable());
        assert!(SymbolKind::Constructor.is_method());
        assert!(!SymbolKind::Function.is_method());
        assert!(!SymbolKind::Class.is_callable());
        assert!(!SymbolKind::Other("Lambda".into()).is_callable());
    }

    #[test]
    fn test_primary_location_prefers_definition() {
        let sym = Symbol::new("S", "f", SymbolKind::Function)
            .with_declaration(loc(1))
            .with_definition(loc(10));
        assert_eq!(sym.primary_location().map(|l| l.start_line), Some(10));
        assert!(sym.is_located_in("file:///p/a.cpp"));
        assert!(!sym.is_located_in("file:///p/b.cpp"));
    }

    #[test]
    fn test_node_labels() {
        let c_struct = Symbol::new("1", "s", SymbolKind::Struct).with_language("C");
        let cpp_struct = Symbol::new("2", "s", SymbolKind::Struct).with_language("Cpp");
        assert_eq!(c_struct.node_label(), Some(NodeLabel::DataStructure));
        assert_eq!(cpp_struct.node_label(), Some(NodeLabel::ClassStructure));
        assert_eq!(
            Symbol::new("3", "m", SymbolKind::StaticMethod).node_label(),
            Some(NodeLabel::Method)
        );
        assert_eq!(Symbol::new("4", "x", SymbolKind::from("Macro")).node_label(), None);
    }

    #[test]
    fn test_qualified_namespace() {
        let ns = Symbol::new("N", "inner", SymbolKind::Namespace).with_scope("outer::");
        assert_eq!(ns.qualified_namespace().as_deref(), Some("outer::inner::"));
        assert_eq!(Symbol::new("F", "f", SymbolKind::Function).qualified_namespace(), None);
    }
}
