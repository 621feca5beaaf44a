//! Properties of the structural matcher and the value comparisons it uses.

use serde_json::{json, Value};
use sigma_scanner::identifier::parse_field_key;
use sigma_scanner::matcher::{match_primitive, match_string};
use sigma_scanner::{Definition, Identifier, Matcher, Modifier, ModifierKind, Primitive};

fn identifier(yaml: &str) -> Identifier {
    let value: serde_yaml::Value = serde_yaml::from_str(yaml).unwrap();
    let definition = Definition::from_yaml(&value).unwrap();
    Identifier::from_definition("selection", &definition).unwrap()
}

fn matches(yaml: &str, event: &Value) -> bool {
    Matcher::new()
        .match_condition(event, &identifier(yaml))
        .is_some()
}

#[test]
fn test_match_string_is_reflexive_and_case_insensitive() {
    for text in ["cmd.exe", "C:\\Windows", "ÄBC", "with space", "*?"] {
        let source = Primitive::from(text);
        assert!(match_string(&source, text, &[]));
        assert!(match_string(&source, &text.to_uppercase(), &[]));
        assert!(match_string(&source, &text.to_lowercase(), &[]));
    }
}

#[test]
fn test_wildcards_are_literal() {
    let source = Primitive::from("cmd*");
    assert!(!match_string(&source, "cmd.exe", &[]));
    assert!(match_string(&source, "CMD*", &[]));
}

#[test]
fn test_negation_inverts_exactly() {
    let targets = [
        json!("powershell.exe"),
        json!("POWERSHELL"),
        json!(""),
        json!(4624),
        json!(true),
        json!(null),
        json!(["a", "powershell"]),
        json!({"k": "v"}),
    ];
    let sources = [
        Primitive::from("powershell"),
        Primitive::from(""),
        Primitive::from(4624i64),
        Primitive::from(true),
        Primitive::Null,
    ];

    for kind in [
        ModifierKind::Equals,
        ModifierKind::Contains,
        ModifierKind::StartsWith,
        ModifierKind::EndsWith,
    ] {
        let plain = [Modifier::new(kind)];
        let negated = [Modifier::new(kind), Modifier::negated(ModifierKind::Equals)];
        for source in &sources {
            for target in &targets {
                assert_eq!(
                    match_primitive(source, target, &negated),
                    !match_primitive(source, target, &plain),
                    "{kind:?} {source} {target}"
                );
            }
        }
    }
}

#[test]
fn test_all_requires_every_value() {
    let any = identifier("CommandLine|contains:\n    - whoami\n    - /priv\n");
    let all = identifier("CommandLine|contains|all:\n    - whoami\n    - /priv\n");
    let matcher = Matcher::new();

    let both = json!({"CommandLine": "whoami /priv"});
    let one = json!({"CommandLine": "whoami /groups"});
    let none = json!({"CommandLine": "ipconfig"});

    for (event, expect_any, expect_all) in [(&both, true, true), (&one, true, false), (&none, false, false)] {
        assert_eq!(matcher.match_condition(event, &any).is_some(), expect_any);
        assert_eq!(matcher.match_condition(event, &all).is_some(), expect_all);
    }
}

#[test]
fn test_array_of_objects_any_element() {
    let yaml = "Connections:\n    Port: 445\n    Direction: outbound\n";

    assert!(matches(
        yaml,
        &json!({"Connections": [
            {"Port": 80, "Direction": "outbound"},
            {"Port": 445, "Direction": "Outbound"}
        ]})
    ));
    // Both criteria must hold on the same element.
    assert!(!matches(
        yaml,
        &json!({"Connections": [
            {"Port": 445, "Direction": "inbound"},
            {"Port": 80, "Direction": "outbound"}
        ]})
    ));
    assert!(!matches(yaml, &json!({"Connections": []})));
}

#[test]
fn test_leaf_array_any_element() {
    assert!(matches("Tags: admin\n", &json!({"Tags": ["login", "ADMIN"]})));
    assert!(!matches("Tags: admin\n", &json!({"Tags": ["login"]})));
    assert!(matches("Ports:\n    - 22\n    - 3389\n", &json!({"Ports": [80, 3389]})));
}

#[test]
fn test_multiple_children_return_whole_event() {
    let tree = identifier("EventID: 1\nImage|endswith: .exe\n");
    let event = json!({"EventID": 1, "Image": "a.exe"});
    assert_eq!(Matcher::new().match_condition(&event, &tree), Some(&event));
}

#[test]
fn test_single_group_child_returns_sub_record() {
    let tree = identifier("Process:\n    Name: cmd.exe\n");
    let event = json!({"Process": {"Name": "cmd.exe"}, "Other": 1});
    assert_eq!(
        Matcher::new().match_condition(&event, &tree),
        Some(&json!({"Name": "cmd.exe"}))
    );
}

#[test]
fn test_type_mismatch_and_missing_fields() {
    assert!(!matches("EventID: 4624\n", &json!({"EventID": "4625"})));
    assert!(!matches("EventID: 4624\n", &json!({"EventID": "4624"})));
    assert!(matches("EventID: '4624'\n", &json!({"EventID": "4624"})));
    assert!(!matches("EventID: '4624'\n", &json!({"EventID": 4624})));
    assert!(!matches("EventID: 4624\n", &json!({})));
    assert!(!matches("Process:\n    Name: x\n", &json!({"Process": "x"})));
}

#[test]
fn test_empty_source_only_matches_empty_field() {
    assert!(matches("User: ''\n", &json!({"User": ""})));
    assert!(!matches("User: ''\n", &json!({"User": "alice"})));
    assert!(!matches("User|contains: ''\n", &json!({"User": "alice"})));
}

#[test]
fn test_match_depth_bound() {
    let tree = identifier("A:\n    B:\n        C:\n            D: 1\n");
    let event = json!({"A": {"B": {"C": {"D": 1}}}});

    assert!(Matcher::new().match_condition(&event, &tree).is_some());
    assert!(Matcher::with_max_depth(3).match_condition(&event, &tree).is_some());
    assert!(Matcher::with_max_depth(2).match_condition(&event, &tree).is_none());
}

#[test]
fn test_parse_field_key_variants() {
    let (field, modifiers) = parse_field_key("Image|endswith|not").unwrap();
    assert_eq!(field, "Image");
    assert_eq!(modifiers.len(), 2);
    assert!(modifiers.iter().any(|m| m.negate));

    assert!(parse_field_key("Image|re").is_err());
    assert!(parse_field_key("Image|not|not").is_err());
    assert!(parse_field_key("Image|contains|startswith").is_err());
    assert!(parse_field_key("|contains").is_err());
}
