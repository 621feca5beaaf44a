//! Structural matching of identifier trees against events.

use super::primitive::match_primitive;
use crate::identifier::{Identifier, ModifierKind};
use serde_json::Value;

/// Default bound on nested group depth while walking an event.
pub const DEFAULT_MAX_MATCH_DEPTH: usize = 32;

/// Recursive, side-effect-free matcher.
///
/// Every level has AND semantics: the first child that fails aborts the
/// subtree. Missing fields, unexpected shapes and over-deep nesting all
/// resolve to "no match"; the matcher has no error path.
#[derive(Debug, Clone, Copy)]
pub struct Matcher {
    max_depth: usize,
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Matcher {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_MATCH_DEPTH,
        }
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Match a whole selection tree.
    ///
    /// With more than one direct child a successful match returns the whole
    /// event; with one child it returns what that child matched.
    pub fn match_condition<'e>(&self, event: &'e Value, tree: &Identifier) -> Option<&'e Value> {
        let children = match tree {
            Identifier::Node { children, .. } => children,
            leaf @ Identifier::Leaf { .. } => return self.filter_by_identifier(event, leaf),
        };

        let mut matched = None;
        for child in children {
            matched = Some(self.filter_by_identifier(event, child)?);
        }

        if children.len() > 1 {
            Some(event)
        } else {
            matched
        }
    }

    /// Match one identifier against an event node.
    ///
    /// A leaf is checked against the node's field. A nested group descends
    /// into the field of the same name: an object must satisfy every child,
    /// an array matches when any element does.
    pub fn filter_by_identifier<'e>(
        &self,
        event: &'e Value,
        identifier: &Identifier,
    ) -> Option<&'e Value> {
        self.filter_at_depth(event, identifier, 0)
    }

    fn filter_at_depth<'e>(
        &self,
        event: &'e Value,
        identifier: &Identifier,
        depth: usize,
    ) -> Option<&'e Value> {
        if depth > self.max_depth {
            return None;
        }

        let fields = event.as_object()?;

        match identifier {
            Identifier::Leaf { .. } => self.filter_by_primitive(event, identifier).then_some(event),
            Identifier::Node { name, children } => match fields.get(name)? {
                Value::Array(items) => items
                    .iter()
                    .find_map(|item| self.filter_children(item, children, depth + 1)),
                target @ Value::Object(_) => self.filter_children(target, children, depth + 1),
                _ => None,
            },
        }
    }

    fn filter_children<'e>(
        &self,
        event: &'e Value,
        children: &[Identifier],
        depth: usize,
    ) -> Option<&'e Value> {
        for child in children {
            self.filter_at_depth(event, child, depth)?;
        }
        Some(event)
    }

    /// Check a leaf's values against the event field of the same name.
    ///
    /// Values are alternatives (any one may match) unless the leaf carries
    /// the `all` modifier, in which case every value must match.
    pub fn filter_by_primitive(&self, event: &Value, identifier: &Identifier) -> bool {
        let Identifier::Leaf {
            name,
            values,
            modifiers,
        } = identifier
        else {
            return false;
        };

        let Some(target) = event.get(name) else {
            return false;
        };

        if identifier.has_modifier(ModifierKind::All) {
            values
                .iter()
                .all(|value| match_primitive(value, target, modifiers))
        } else {
            values
                .iter()
                .any(|value| match_primitive(value, target, modifiers))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::{Modifier, Primitive};
    use serde_json::json;

    fn leaf(name: &str, values: Vec<Primitive>, modifiers: Vec<Modifier>) -> Identifier {
        Identifier::Leaf {
            name: name.to_string(),
            values,
            modifiers,
        }
    }

    fn node(name: &str, children: Vec<Identifier>) -> Identifier {
        Identifier::Node {
            name: name.to_string(),
            children,
        }
    }

    #[test]
    fn test_single_child_returns_its_match() {
        let tree = node("selection", vec![leaf("EventID", vec![4624i64.into()], vec![])]);
        let event = json!({"EventID": 4624});

        let matched = Matcher::new().match_condition(&event, &tree);
        assert_eq!(matched, Some(&event));
    }

    #[test]
    fn test_multiple_children_return_whole_event() {
        let tree = node(
            "selection",
            vec![
                leaf("EventID", vec![1i64.into()], vec![]),
                node("Process", vec![leaf("Name", vec!["cmd.exe".into()], vec![])]),
            ],
        );
        let event = json!({"EventID": 1, "Process": {"Name": "CMD.EXE"}});

        assert_eq!(Matcher::new().match_condition(&event, &tree), Some(&event));
    }

    #[test]
    fn test_nested_group_returns_sub_node() {
        let tree = node(
            "selection",
            vec![node("Process", vec![leaf("Name", vec!["cmd.exe".into()], vec![])])],
        );
        let event = json!({"Process": {"Name": "cmd.exe"}});

        assert_eq!(
            Matcher::new().match_condition(&event, &tree),
            Some(&event["Process"])
        );
    }

    #[test]
    fn test_first_failing_child_aborts() {
        let tree = node(
            "selection",
            vec![
                leaf("EventID", vec![1i64.into()], vec![]),
                leaf("User", vec!["admin".into()], vec![]),
            ],
        );
        let event = json!({"EventID": 1, "User": "guest"});

        assert!(Matcher::new().match_condition(&event, &tree).is_none());
    }

    #[test]
    fn test_missing_field_is_no_match() {
        let matcher = Matcher::new();
        let id = leaf("User", vec!["admin".into()], vec![]);
        assert!(!matcher.filter_by_primitive(&json!({"EventID": 1}), &id));
        assert!(matcher.filter_by_identifier(&Value::Null, &id).is_none());
        assert!(matcher.filter_by_identifier(&json!("text"), &id).is_none());
    }

    #[test]
    fn test_all_requires_every_value() {
        let matcher = Matcher::new();
        let id = leaf(
            "CommandLine",
            vec!["powershell".into(), "-enc".into()],
            vec![
                Modifier::new(ModifierKind::Contains),
                Modifier::new(ModifierKind::All),
            ],
        );

        assert!(matcher.filter_by_primitive(&json!({"CommandLine": "powershell.exe -enc AAAA"}), &id));
        assert!(!matcher.filter_by_primitive(&json!({"CommandLine": "powershell.exe -nop"}), &id));
    }

    #[test]
    fn test_values_are_alternatives_without_all() {
        let matcher = Matcher::new();
        let id = leaf("EventID", vec![4624i64.into(), 4625i64.into()], vec![]);

        assert!(matcher.filter_by_primitive(&json!({"EventID": 4625}), &id));
        assert!(!matcher.filter_by_primitive(&json!({"EventID": 4634}), &id));
    }

    #[test]
    fn test_array_of_objects_any_element() {
        let tree = node(
            "selection",
            vec![node("Users", vec![leaf("Name", vec!["bob".into()], vec![])])],
        );
        let matcher = Matcher::new();

        let hit = json!({"Users": [{"Name": "alice"}, {"Name": "Bob"}]});
        assert_eq!(matcher.match_condition(&hit, &tree), Some(&hit["Users"][1]));

        let miss = json!({"Users": [{"Name": "alice"}, {"Name": "carol"}]});
        assert!(matcher.match_condition(&miss, &tree).is_none());
    }

    #[test]
    fn test_group_against_scalar_field_is_no_match() {
        let tree = node(
            "selection",
            vec![node("Process", vec![leaf("Name", vec!["cmd.exe".into()], vec![])])],
        );
        let event = json!({"Process": "cmd.exe"});
        assert!(Matcher::new().match_condition(&event, &tree).is_none());
    }

    #[test]
    fn test_depth_limit_fails_closed() {
        let tree = node(
            "selection",
            vec![node(
                "a",
                vec![node("b", vec![leaf("c", vec![1i64.into()], vec![])])],
            )],
        );
        let event = json!({"a": {"b": {"c": 1}}});

        assert!(Matcher::new().match_condition(&event, &tree).is_some());
        assert!(Matcher::with_max_depth(1).match_condition(&event, &tree).is_none());
    }
}
