//! Loading rules from YAML strings and files.

use serde_json::json;
use sigma_scanner::{Definition, NoopLogger, Primitive, Scanner, SigmaError, SigmaRule};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

const RULES: &str = r#"
title: Whoami execution
id: 8ea5f4f5-0000-4000-8000-000000000001
status: experimental
author: someone
logsource:
    category: process_creation
    product: windows
detection:
    selection:
        Image|endswith: '\whoami.exe'
    condition: selection
falsepositives:
    - Admin activity
level: medium
---
title: Net user add
tags:
    - attack.persistence
detection:
    selection:
        Image|endswith:
            - '\net.exe'
            - '\net1.exe'
        CommandLine|contains|all:
            - ' user '
            - ' /add'
    condition: selection
"#;

#[test]
fn test_load_rules_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(RULES.as_bytes()).unwrap();

    let rules = SigmaRule::from_file(file.path()).unwrap();
    assert_eq!(rules.len(), 2);
    assert_eq!(rules[0].title, "Whoami execution");
    assert_eq!(rules[0].level.as_deref(), Some("medium"));
    assert_eq!(rules[1].tags, vec!["attack.persistence"]);

    let scanner = Scanner::with_logger(Arc::new(NoopLogger));
    let event = json!({
        "Image": "C:\\Windows\\System32\\net.exe",
        "CommandLine": "net user backdoor P@ss /add"
    });
    assert_eq!(scanner.matching_rules(&rules, &event), vec![1]);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = SigmaRule::from_file(dir.path().join("missing.yml")).unwrap_err();
    assert!(matches!(err, SigmaError::IoError(_)));
}

#[test]
fn test_selection_order_and_values_preserved() {
    let rules = SigmaRule::from_yaml_multi(RULES).unwrap();
    let detection = &rules[1].detection;

    let Some(Definition::Map(fields)) = detection.definition("selection") else {
        panic!("selection should be a mapping");
    };
    let keys: Vec<&str> = fields.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, vec!["Image|endswith", "CommandLine|contains|all"]);

    let Some(Definition::List(images)) = detection
        .definition("selection")
        .and_then(|d| d.get("Image|endswith"))
    else {
        panic!("image values should be a list");
    };
    assert_eq!(
        images,
        &vec![
            Definition::Scalar(Primitive::from("\\net.exe")),
            Definition::Scalar(Primitive::from("\\net1.exe")),
        ]
    );
}

#[test]
fn test_bad_document_in_stream_fails_load() {
    let stream = format!("{RULES}---\ntitle: No detection\n");
    assert!(matches!(
        SigmaRule::from_yaml_multi(&stream),
        Err(SigmaError::InvalidRule(_))
    ));
}

#[test]
fn test_empty_stream() {
    assert!(SigmaRule::from_yaml_multi("").unwrap().is_empty());
}
