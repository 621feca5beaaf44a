//! The detection section of a SIGMA rule.
//!
//! A [`Detection`] holds the raw condition text and the named selections as an
//! ordered list of `(name, Definition)` pairs. Selections are resolved by name
//! lookup; the condition is validated and normalised by
//! [`Detection::expand_condition`] before it is lowered.

use crate::error::{Result, SigmaError};
use crate::identifier::Primitive;
use serde_yaml::Value;

/// Expression keywords that are never condition names.
const KEYWORDS: &[&str] = &["and", "or", "not"];

/// Detection keys that are not selections.
const RESERVED_KEYS: &[&str] = &["condition", "timeframe"];

/// A raw selection definition as written in the rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    /// Ordered key/value pairs; keys may carry modifiers (`Field|contains`).
    Map(Vec<(String, Definition)>),
    List(Vec<Definition>),
    Scalar(Primitive),
}

impl Definition {
    pub fn from_yaml(value: &Value) -> Result<Self> {
        match value {
            Value::Mapping(mapping) => {
                let mut entries = Vec::with_capacity(mapping.len());
                for (key, value) in mapping {
                    let key = yaml_key(key)?;
                    entries.push((key, Definition::from_yaml(value)?));
                }
                Ok(Definition::Map(entries))
            }
            Value::Sequence(items) => items
                .iter()
                .map(Definition::from_yaml)
                .collect::<Result<Vec<_>>>()
                .map(Definition::List),
            Value::Tagged(tagged) => Definition::from_yaml(&tagged.value),
            scalar => Primitive::from_yaml(scalar)
                .map(Definition::Scalar)
                .ok_or_else(|| {
                    SigmaError::InvalidRule(format!("Unsupported value in selection: {scalar:?}"))
                }),
        }
    }

    /// Child definition by key. Only mappings have children.
    pub fn get(&self, key: &str) -> Option<&Definition> {
        match self {
            Definition::Map(entries) => entries
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, definition)| definition),
            _ => None,
        }
    }
}

fn yaml_key(key: &Value) -> Result<String> {
    match key {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(SigmaError::InvalidRule(format!(
            "Unsupported selection key: {other:?}"
        ))),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    condition: String,
    selections: Vec<(String, Definition)>,
}

impl Detection {
    pub fn new(condition: impl Into<String>, selections: Vec<(String, Definition)>) -> Self {
        Self {
            condition: condition.into(),
            selections,
        }
    }

    /// Parse the `detection:` mapping of a rule.
    ///
    /// A list of conditions is accepted and joined with `or`, each wrapped in
    /// parentheses.
    pub fn from_yaml(value: &Value) -> Result<Self> {
        let mapping = value.as_mapping().ok_or_else(|| {
            SigmaError::InvalidRule("Detection section must be a mapping".to_string())
        })?;

        let condition = match mapping.get("condition") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Sequence(items)) => {
                let parts = items
                    .iter()
                    .map(|item| {
                        item.as_str().map(|s| format!("({s})")).ok_or_else(|| {
                            SigmaError::InvalidRule("Condition list must hold strings".to_string())
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                parts.join(" or ")
            }
            Some(_) => {
                return Err(SigmaError::InvalidRule(
                    "Condition must be a string or a list of strings".to_string(),
                ))
            }
            None => return Err(SigmaError::InvalidRule("Missing condition".to_string())),
        };

        let mut selections = Vec::new();
        for (key, value) in mapping {
            let name = yaml_key(key)?;
            if RESERVED_KEYS.contains(&name.as_str()) {
                continue;
            }
            selections.push((name, Definition::from_yaml(value)?));
        }

        Ok(Self {
            condition,
            selections,
        })
    }

    /// The raw condition text as written in the rule.
    pub fn condition(&self) -> &str {
        &self.condition
    }

    pub fn selections(&self) -> &[(String, Definition)] {
        &self.selections
    }

    pub fn definition(&self, name: &str) -> Option<&Definition> {
        self.selections
            .iter()
            .find(|(selection, _)| selection == name)
            .map(|(_, definition)| definition)
    }

    /// Resolve a condition reference to its raw definition.
    ///
    /// `selection` names a whole selection; `selection.sub` names the `sub`
    /// entry inside it. Only the first dot splits.
    pub fn resolve(&self, condition_name: &str) -> Result<&Definition> {
        let unresolved = || SigmaError::UnresolvedCondition(condition_name.to_string());

        let (group, child) = match condition_name.split_once('.') {
            Some((group, child)) => (group, Some(child)),
            None => (condition_name, None),
        };

        let definition = self.definition(group).ok_or_else(unresolved)?;
        match child {
            Some(child) => definition.get(child).ok_or_else(unresolved),
            None => Ok(definition),
        }
    }

    /// Spell the condition out as a plain boolean-operator expression.
    ///
    /// Whitespace is normalised. Quantifiers (`1 of them`, `all of sel*`) and
    /// pipe aggregations (`| count() > 5`) are not evaluated by this engine
    /// and are rejected rather than guessed at. So is anything that is not a
    /// selection reference, `and`/`or`/`not`, or a parenthesis.
    pub fn expand_condition(&self) -> Result<String> {
        if self.condition.contains('|') {
            return Err(SigmaError::UnsupportedCondition(format!(
                "aggregation expressions are not supported: {}",
                self.condition
            )));
        }

        for word in condition_words(&self.condition) {
            if word == "of" || word == "them" || word.contains('*') {
                return Err(SigmaError::UnsupportedCondition(format!(
                    "quantifier '{}' in condition: {}",
                    word, self.condition
                )));
            }
            if !word.starts_with(|c: char| c.is_alphabetic() || c == '_') {
                return Err(SigmaError::UnsupportedCondition(format!(
                    "'{}' is not a condition name: {}",
                    word, self.condition
                )));
            }
        }

        if let Some(ch) = self
            .condition
            .chars()
            .find(|&c| !is_word_char(c) && !c.is_whitespace() && c != '(' && c != ')')
        {
            return Err(SigmaError::UnsupportedCondition(format!(
                "unexpected '{}' in condition: {}",
                ch, self.condition
            )));
        }

        Ok(self.condition.split_whitespace().collect::<Vec<_>>().join(" "))
    }

    /// Ordered, deduplicated names referenced by the expanded condition.
    ///
    /// For a dotted reference (`selection.sub`) only the group part is
    /// listed. Names are collected whether or not the detection defines them;
    /// unresolved names are reported when they are evaluated.
    pub fn condition_names(&self) -> Result<Vec<String>> {
        let expanded = self.expand_condition()?;
        let mut names: Vec<String> = Vec::new();

        for word in condition_words(&expanded) {
            if KEYWORDS.contains(&word) {
                continue;
            }
            let group = word.split('.').next().unwrap_or(word);
            if !group.is_empty() && !names.iter().any(|n| n == group) {
                names.push(group.to_string());
            }
        }

        Ok(names)
    }
}

/// Characters that make up a condition word: selection names (which may
/// contain `-`), dotted references and `*` globs.
fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | '.' | '*' | '-')
}

fn condition_words(condition: &str) -> Vec<&str> {
    condition
        .split(|c: char| !is_word_char(c))
        .filter(|word| !word.is_empty())
        .collect()
}
