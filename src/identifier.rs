//! Identifier trees: the matcher's view of a selection.
//!
//! A selection such as
//!
//! ```yaml
//! selection:
//!     EventID: 4688
//!     CommandLine|contains|all:
//!         - '-enc'
//!         - 'powershell'
//!     Process:
//!         Name: cmd.exe
//! ```
//!
//! becomes a [`Identifier::Node`] named `selection` with three children: two
//! [`Identifier::Leaf`] entries (`EventID`, `CommandLine` with the `Contains`
//! and `All` modifiers) and a nested `Process` node holding a `Name` leaf.
//!
//! Trees are built on demand from a [`Definition`] and are never cached.

use crate::detection::Definition;
use crate::error::{Result, SigmaError};
use serde::Serialize;
use serde_json::{Number, Value};
use std::fmt;

/// A scalar value from a rule definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Primitive {
    String(String),
    Number(Number),
    Bool(bool),
    Null,
}

impl Primitive {
    /// Convert a YAML scalar. Returns `None` for mappings, sequences and
    /// numbers JSON cannot represent (NaN, infinities).
    pub fn from_yaml(value: &serde_yaml::Value) -> Option<Self> {
        match value {
            serde_yaml::Value::Null => Some(Primitive::Null),
            serde_yaml::Value::Bool(b) => Some(Primitive::Bool(*b)),
            serde_yaml::Value::String(s) => Some(Primitive::String(s.clone())),
            serde_yaml::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Primitive::Number(Number::from(i)))
                } else if let Some(u) = n.as_u64() {
                    Some(Primitive::Number(Number::from(u)))
                } else {
                    n.as_f64()
                        .and_then(Number::from_f64)
                        .map(Primitive::Number)
                }
            }
            serde_yaml::Value::Tagged(tagged) => Primitive::from_yaml(&tagged.value),
            serde_yaml::Value::Sequence(_) | serde_yaml::Value::Mapping(_) => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Primitive::Null)
    }

    /// Strict equality against an event value: same type, same value.
    ///
    /// Numbers compare by value, so `4624` equals `4624.0`.
    pub fn strict_eq(&self, target: &Value) -> bool {
        match (self, target) {
            (Primitive::String(s), Value::String(t)) => s == t,
            (Primitive::Number(a), Value::Number(b)) => numbers_equal(a, b),
            (Primitive::Bool(a), Value::Bool(b)) => a == b,
            (Primitive::Null, Value::Null) => true,
            _ => false,
        }
    }
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::String(s) => write!(f, "{s}"),
            Primitive::Number(n) => write!(f, "{n}"),
            Primitive::Bool(b) => write!(f, "{b}"),
            Primitive::Null => write!(f, "null"),
        }
    }
}

impl From<&str> for Primitive {
    fn from(value: &str) -> Self {
        Primitive::String(value.to_string())
    }
}

impl From<i64> for Primitive {
    fn from(value: i64) -> Self {
        Primitive::Number(Number::from(value))
    }
}

impl From<bool> for Primitive {
    fn from(value: bool) -> Self {
        Primitive::Bool(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ModifierKind {
    Equals,
    Contains,
    StartsWith,
    EndsWith,
    All,
}

/// A matching-mode annotation parsed from a field key (`Field|contains`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Modifier {
    pub kind: ModifierKind,
    pub negate: bool,
}

impl Modifier {
    pub fn new(kind: ModifierKind) -> Self {
        Self {
            kind,
            negate: false,
        }
    }

    pub fn negated(kind: ModifierKind) -> Self {
        Self { kind, negate: true }
    }
}

/// Parse a field key with SIGMA-style modifiers.
///
/// Examples:
/// - "Image" -> ("Image", [])
/// - "CommandLine|contains" -> ("CommandLine", [Contains])
/// - "User|not" -> ("User", [Equals (negated)])
/// - "Tags|contains|all" -> ("Tags", [Contains, All])
pub fn parse_field_key(key: &str) -> Result<(String, Vec<Modifier>)> {
    let mut parts = key.split('|');
    let field = parts.next().unwrap_or_default().trim();

    if field.is_empty() {
        return Err(SigmaError::InvalidIdentifier(format!(
            "Field key '{key}' has no field name"
        )));
    }

    let mut modifiers: Vec<Modifier> = Vec::new();

    for token in parts {
        let modifier = match token.trim() {
            "contains" => Modifier::new(ModifierKind::Contains),
            "startswith" => Modifier::new(ModifierKind::StartsWith),
            "endswith" => Modifier::new(ModifierKind::EndsWith),
            "all" => Modifier::new(ModifierKind::All),
            "not" => Modifier::negated(ModifierKind::Equals),
            other => {
                return Err(SigmaError::InvalidIdentifier(format!(
                    "Unsupported modifier '{other}' on field '{field}'"
                )));
            }
        };
        modifiers.push(modifier);
    }

    let string_matchers = modifiers
        .iter()
        .filter(|m| {
            matches!(
                m.kind,
                ModifierKind::Contains | ModifierKind::StartsWith | ModifierKind::EndsWith
            )
        })
        .count();
    if string_matchers > 1 {
        return Err(SigmaError::InvalidIdentifier(format!(
            "Field '{field}' combines more than one of contains/startswith/endswith"
        )));
    }

    if modifiers.iter().filter(|m| m.negate).count() > 1 {
        return Err(SigmaError::InvalidIdentifier(format!(
            "Field '{field}' is negated more than once"
        )));
    }

    Ok((field.to_string(), modifiers))
}

/// Recursive match criteria for one selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum Identifier {
    /// A field compared against one or more alternative values.
    Leaf {
        name: String,
        values: Vec<Primitive>,
        modifiers: Vec<Modifier>,
    },
    /// A named group whose children must all match. Never empty.
    Node {
        name: String,
        children: Vec<Identifier>,
    },
}

impl Identifier {
    /// Build the tree for a whole selection.
    ///
    /// The root is always a [`Identifier::Node`] named after the condition
    /// (`selection`, `selection.sub`). Keyword selections (a bare list of
    /// values with no field) and the list-of-maps form are rejected.
    pub fn from_definition(name: &str, definition: &Definition) -> Result<Self> {
        match definition {
            Definition::Map(entries) => Ok(Identifier::Node {
                name: name.to_string(),
                children: Self::children_of(name, entries)?,
            }),
            Definition::List(_) => Err(SigmaError::InvalidIdentifier(format!(
                "Selection '{name}' is a list; keyword and list-of-map selections are not supported"
            ))),
            Definition::Scalar(value) => Err(SigmaError::InvalidIdentifier(format!(
                "Selection '{name}' is a bare value '{value}' without a field"
            ))),
        }
    }

    fn children_of(name: &str, entries: &[(String, Definition)]) -> Result<Vec<Identifier>> {
        if entries.is_empty() {
            return Err(SigmaError::InvalidIdentifier(format!(
                "'{name}' has no fields"
            )));
        }

        entries
            .iter()
            .map(|(key, value)| Self::from_entry(key, value))
            .collect()
    }

    fn from_entry(key: &str, definition: &Definition) -> Result<Self> {
        match definition {
            Definition::Map(entries) => {
                if key.contains('|') {
                    return Err(SigmaError::InvalidIdentifier(format!(
                        "Nested group '{key}' cannot carry modifiers"
                    )));
                }
                Ok(Identifier::Node {
                    name: key.to_string(),
                    children: Self::children_of(key, entries)?,
                })
            }
            Definition::Scalar(value) => {
                let (name, modifiers) = parse_field_key(key)?;
                Ok(Identifier::Leaf {
                    name,
                    values: vec![value.clone()],
                    modifiers,
                })
            }
            Definition::List(items) => {
                let (name, modifiers) = parse_field_key(key)?;
                let values = items
                    .iter()
                    .map(|item| match item {
                        Definition::Scalar(value) => Ok(value.clone()),
                        _ => Err(SigmaError::InvalidIdentifier(format!(
                            "Field '{name}' mixes nested groups into its value list"
                        ))),
                    })
                    .collect::<Result<Vec<_>>>()?;

                if values.is_empty() {
                    return Err(SigmaError::InvalidIdentifier(format!(
                        "Field '{name}' has an empty value list"
                    )));
                }

                Ok(Identifier::Leaf {
                    name,
                    values,
                    modifiers,
                })
            }
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Identifier::Leaf { name, .. } | Identifier::Node { name, .. } => name,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Identifier::Leaf { .. })
    }

    /// Children of a node; empty for a leaf.
    pub fn children(&self) -> &[Identifier] {
        match self {
            Identifier::Node { children, .. } => children,
            Identifier::Leaf { .. } => &[],
        }
    }

    /// Modifiers of a leaf; empty for a node.
    pub fn modifiers(&self) -> &[Modifier] {
        match self {
            Identifier::Leaf { modifiers, .. } => modifiers,
            Identifier::Node { .. } => &[],
        }
    }

    pub fn has_modifier(&self, kind: ModifierKind) -> bool {
        self.modifiers().iter().any(|m| m.kind == kind)
    }
}
