//! Value-level comparison between a rule primitive and an event field.

use crate::identifier::{Modifier, ModifierKind, Primitive};
use serde_json::Value;

/// Compare one rule value against one event value, honouring modifiers.
///
/// Dispatches on the event value's type: strings go through
/// [`match_string`], arrays match if any element matches, and everything else
/// uses strict equality. A negate modifier inverts the final result.
pub fn match_primitive(source: &Primitive, target: &Value, modifiers: &[Modifier]) -> bool {
    let matched = match_value(source, target, modifiers);

    if modifiers.iter().any(|m| m.negate) {
        !matched
    } else {
        matched
    }
}

fn match_value(source: &Primitive, target: &Value, modifiers: &[Modifier]) -> bool {
    match target {
        Value::String(text) => match_string(source, text, modifiers),
        Value::Array(items) => items
            .iter()
            .any(|item| match_value(source, item, modifiers)),
        other => source.strict_eq(other),
    }
}

/// Case-insensitive string comparison.
///
/// At most one of contains/startswith/endswith applies, checked in that
/// order; without any of them the strings must be equal. A rule value that is
/// not a string never matches a string field. `?` and `*` are matched
/// literally.
pub fn match_string(source: &Primitive, target: &str, modifiers: &[Modifier]) -> bool {
    let Primitive::String(source) = source else {
        return false;
    };

    let source = source.to_lowercase();
    let target = target.to_lowercase();

    if source == target {
        return true;
    }

    // An empty needle only ever matches an empty field.
    if source.is_empty() || target.is_empty() {
        return false;
    }

    if has(modifiers, ModifierKind::Contains) {
        target.contains(&source)
    } else if has(modifiers, ModifierKind::StartsWith) {
        target.starts_with(&source)
    } else if has(modifiers, ModifierKind::EndsWith) {
        target.ends_with(&source)
    } else {
        false
    }
}

fn has(modifiers: &[Modifier], kind: ModifierKind) -> bool {
    modifiers.iter().any(|m| m.kind == kind)
}
