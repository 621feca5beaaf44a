//! SIGMA rule documents.
//!
//! Only the parts of a rule the scanner needs are kept: identity fields used
//! in log lines and the [`Detection`] section. Everything else in the
//! document (`logsource`, `author`, `falsepositives`, ...) is ignored.
//!
//! # Examples
//!
//! ```rust
//! use sigma_scanner::SigmaRule;
//!
//! let rule = SigmaRule::from_yaml(r#"
//! title: Windows Login Event
//! description: Successful interactive logon
//! logsource:
//!     product: windows
//! detection:
//!     selection:
//!         EventID: 4624
//!     condition: selection
//! "#)?;
//!
//! assert_eq!(rule.title, "Windows Login Event");
//! assert_eq!(rule.display_name(), "Successful interactive logon");
//! assert_eq!(rule.detection.condition(), "selection");
//! # Ok::<(), sigma_scanner::SigmaError>(())
//! ```

use crate::detection::Detection;
use crate::error::{Result, SigmaError};
use serde::Deserialize;
use serde_yaml::Value;
use std::path::Path;

const UNTITLED_RULE: &str = "Untitled Rule";

#[derive(Debug, Clone, PartialEq)]
pub struct SigmaRule {
    pub title: String,
    pub id: Option<String>,
    pub description: Option<String>,
    pub level: Option<String>,
    pub tags: Vec<String>,
    pub detection: Detection,
}

impl SigmaRule {
    pub fn new(title: impl Into<String>, detection: Detection) -> Self {
        Self {
            title: title.into(),
            id: None,
            description: None,
            level: None,
            tags: Vec::new(),
            detection,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Parse a single YAML rule document.
    pub fn from_yaml(rule_yaml: &str) -> Result<Self> {
        let document: Value = serde_yaml::from_str(rule_yaml)?;
        Self::from_value(&document)
    }

    /// Build a rule from an already parsed YAML document.
    pub fn from_value(document: &Value) -> Result<Self> {
        if !document.is_mapping() {
            return Err(SigmaError::InvalidRule(
                "Rule document must be a mapping".to_string(),
            ));
        }

        let detection = document
            .get("detection")
            .ok_or_else(|| SigmaError::InvalidRule("Missing detection section".to_string()))?;

        let tags = match document.get("tags") {
            Some(Value::Sequence(items)) => items
                .iter()
                .filter_map(|tag| tag.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        };

        Ok(Self {
            title: string_field(document, "title").unwrap_or_else(|| UNTITLED_RULE.to_string()),
            id: string_field(document, "id"),
            description: string_field(document, "description"),
            level: string_field(document, "level"),
            tags,
            detection: Detection::from_yaml(detection)?,
        })
    }

    /// Parse every rule of a multi-document YAML stream (`---` separated).
    /// Empty documents are skipped.
    pub fn from_yaml_multi(rules_yaml: &str) -> Result<Vec<Self>> {
        let mut rules = Vec::new();
        for document in serde_yaml::Deserializer::from_str(rules_yaml) {
            let value = Value::deserialize(document)?;
            if value.is_null() {
                continue;
            }
            rules.push(Self::from_value(&value)?);
        }
        Ok(rules)
    }

    /// Load all rules from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Vec<Self>> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_multi(&contents)
    }

    /// Name used in diagnostics: the description, else the title.
    pub fn display_name(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.title)
    }
}

fn string_field(document: &Value, key: &str) -> Option<String> {
    document.get(key).and_then(Value::as_str).map(str::to_string)
}
