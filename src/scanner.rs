//! Rule evaluation boundary.
//!
//! [`Scanner::scan`] ties the pieces together for one `(rule, event)` pair:
//! the condition is lowered, compiled with an `evaluateCondition` callback
//! bound to the rule and event, and evaluated. Selections are matched only
//! when the boolean expression asks for them.
//!
//! Every failure is caught here, logged, and reported as "no match". Nothing
//! is cached between calls, so a `Scanner` can be shared freely across
//! threads.
//!
//! # Examples
//!
//! ```rust
//! use sigma_scanner::{Scanner, SigmaRule};
//! use serde_json::json;
//!
//! let rule = SigmaRule::from_yaml(r#"
//! title: Admin logon
//! detection:
//!     selection:
//!         EventID: 4624
//!     filter:
//!         User|startswith: svc_
//!     condition: selection and not filter
//! "#)?;
//!
//! let scanner = Scanner::new();
//! assert!(scanner.scan(&rule, &json!({"EventID": 4624, "User": "alice"})));
//! assert!(!scanner.scan(&rule, &json!({"EventID": 4624, "User": "svc_backup"})));
//! # Ok::<(), sigma_scanner::SigmaError>(())
//! ```

use crate::compiler::{
    compile_with_depth, rewrite_condition, ExprValue, Functions, EVALUATE_CONDITION,
};
use crate::config::ScannerConfig;
use crate::error::{Result, SigmaError};
use crate::identifier::Identifier;
use crate::logging::{ScanLogger, TracingLogger};
use crate::matcher::Matcher;
use crate::rule::SigmaRule;
use rayon::prelude::*;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Scanner {
    config: ScannerConfig,
    matcher: Matcher,
    logger: Arc<dyn ScanLogger>,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner {
    /// Scanner with the default configuration, logging through `tracing`.
    pub fn new() -> Self {
        Self::with_logger(Arc::new(TracingLogger))
    }

    pub fn with_logger(logger: Arc<dyn ScanLogger>) -> Self {
        let config = ScannerConfig::default();
        Self {
            matcher: Matcher::with_max_depth(config.max_match_depth),
            config,
            logger,
        }
    }

    /// Scanner with a custom configuration. Fails if the configuration does
    /// not validate.
    pub fn with_config(config: ScannerConfig, logger: Arc<dyn ScanLogger>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            matcher: Matcher::with_max_depth(config.max_match_depth),
            config,
            logger,
        })
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Decide whether `rule` matches `event`.
    ///
    /// Never fails: any error while lowering, compiling or evaluating the
    /// condition is logged and yields `false`.
    pub fn scan(&self, rule: &SigmaRule, event: &Value) -> bool {
        match self.try_scan(rule, event) {
            Ok(result) => {
                self.logger.debug(&format!(
                    "Rule '{}' detection result: {}",
                    rule.display_name(),
                    result
                ));
                result
            }
            Err(e) => {
                self.logger.error(&format!(
                    "Exception compiling condition {}: {} (rule {})",
                    rule.detection.condition(),
                    e,
                    rule.display_name()
                ));
                false
            }
        }
    }

    /// Like [`Scanner::scan`], but hands the failure back to the caller
    /// instead of logging it.
    pub fn try_scan(&self, rule: &SigmaRule, event: &Value) -> Result<bool> {
        let condition = rule.detection.condition();
        if condition.len() > self.config.max_condition_length {
            return Err(SigmaError::CompilationError(format!(
                "Condition is {} bytes long, limit is {}",
                condition.len(),
                self.config.max_condition_length
            )));
        }

        let expanded = rule.detection.expand_condition()?;
        let names = rule.detection.condition_names()?;
        self.logger.debug(&format!(
            "Expression: {}, Expanded: {}, Conditions: {}",
            condition,
            expanded,
            names.join(", ")
        ));

        let lowered = rewrite_condition(&expanded, &names)?;
        self.logger
            .debug(&format!("Re-written rule for lazy evaluation: {lowered}"));

        let functions =
            Functions::new().register(EVALUATE_CONDITION, |args: &[ExprValue]| match args {
                [ExprValue::Str(name)] => {
                    Ok(ExprValue::from(self.evaluate_condition(rule, name, event)))
                }
                _ => Err(SigmaError::EvaluationError(format!(
                    "{EVALUATE_CONDITION} expects a single condition name"
                ))),
            });

        let predicate = compile_with_depth(&lowered, functions, self.config.max_expression_depth)?;
        Ok(predicate.evaluate(event)?.is_truthy())
    }

    /// Resolve a (possibly dotted) condition name and match it against the
    /// event. Unknown names and selections that cannot be turned into an
    /// identifier tree are logged and never match.
    pub fn evaluate_condition(&self, rule: &SigmaRule, condition_name: &str, event: &Value) -> bool {
        self.logger.debug(&format!("Running condition: {condition_name}"));

        let definition = match rule.detection.resolve(condition_name) {
            Ok(definition) => definition,
            Err(_) => {
                self.logger.error(&format!(
                    "Rule {} doesn't have a condition named {}",
                    rule.display_name(),
                    condition_name
                ));
                return false;
            }
        };

        let tree = match Identifier::from_definition(condition_name, definition) {
            Ok(tree) => tree,
            Err(e) => {
                self.logger.error(&format!(
                    "Rule {} has an invalid condition named {}: {}",
                    rule.display_name(),
                    condition_name,
                    e
                ));
                return false;
            }
        };

        if let Ok(json) = serde_json::to_string(&tree) {
            self.logger.debug(&format!("Identifiers: {json}"));
        }

        self.matcher.match_condition(event, &tree).is_some()
    }

    /// Indices of the rules that match `event`, in rule order.
    pub fn matching_rules(&self, rules: &[SigmaRule], event: &Value) -> Vec<usize> {
        rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| self.scan(rule, event))
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Scan every event against every rule.
    ///
    /// Returns one entry per event, in event order, holding the indices of
    /// the matching rules. Large batches run on the rayon pool when the
    /// configuration allows it; the result is identical either way.
    pub fn scan_batch(&self, rules: &[SigmaRule], events: &[Value]) -> Vec<Vec<usize>> {
        if events.is_empty() {
            return Vec::new();
        }

        if !self.config.parallel || events.len() < self.config.min_batch_size_for_parallelism {
            return events
                .iter()
                .map(|event| self.matching_rules(rules, event))
                .collect();
        }

        events
            .par_iter()
            .map(|event| self.matching_rules(rules, event))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoopLogger;
    use serde_json::json;

    fn rule(yaml: &str) -> SigmaRule {
        SigmaRule::from_yaml(yaml).unwrap()
    }

    fn scanner() -> Scanner {
        Scanner::with_logger(Arc::new(NoopLogger))
    }

    #[test]
    fn test_single_selection() {
        let r = rule(
            r#"
title: t
detection:
    selection:
        EventID: 4624
    condition: selection
"#,
        );
        assert!(scanner().scan(&r, &json!({"EventID": 4624})));
        assert!(!scanner().scan(&r, &json!({"EventID": 4625})));
        assert!(!scanner().scan(&r, &json!({})));
    }

    #[test]
    fn test_dotted_reference() {
        let r = rule(
            r#"
title: t
detection:
    selection:
        sub:
            Image|endswith: '\cmd.exe'
    condition: selection.sub
"#,
        );
        assert!(scanner().scan(&r, &json!({"Image": "C:\\Windows\\System32\\CMD.EXE"})));
        assert!(!scanner().scan(&r, &json!({"Image": "C:\\Windows\\explorer.exe"})));
    }

    #[test]
    fn test_try_scan_surfaces_errors() {
        let r = rule("title: t\ndetection:\n    sel:\n        X: 1\n    condition: sel and\n");
        assert!(matches!(
            scanner().try_scan(&r, &json!({"X": 1})),
            Err(SigmaError::CompilationError(_))
        ));
        assert!(!scanner().scan(&r, &json!({"X": 1})));
    }

    #[test]
    fn test_condition_length_bound() {
        let config = ScannerConfig {
            max_condition_length: 8,
            ..ScannerConfig::default()
        };
        let s = Scanner::with_config(config, Arc::new(NoopLogger)).unwrap();
        let r = rule(
            "title: t\ndetection:\n    selection:\n        X: 1\n    condition: selection or selection\n",
        );
        assert!(s.try_scan(&r, &json!({"X": 1})).is_err());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ScannerConfig {
            max_expression_depth: 0,
            ..ScannerConfig::default()
        };
        assert!(Scanner::with_config(config, Arc::new(NoopLogger)).is_err());
    }

    #[test]
    fn test_matching_rules_in_order() {
        let rules = SigmaRule::from_yaml_multi(
            r#"
title: a
detection:
    s:
        X: 1
    condition: s
---
title: b
detection:
    s:
        X: 2
    condition: s
---
title: c
detection:
    s:
        Y|contains: o
    condition: s
"#,
        )
        .unwrap();

        let event = json!({"X": 1, "Y": "foo"});
        assert_eq!(scanner().matching_rules(&rules, &event), vec![0, 2]);
    }
}
