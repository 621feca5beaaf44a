//! Lowering of a detection condition into a lazily evaluated expression.
//!
//! Every reference to a selection is rewritten into a call of
//! [`EVALUATE_CONDITION`], so `sel1 and not sel2.sub` becomes
//! `evaluateCondition("sel1") and not evaluateCondition("sel2.sub")`. The
//! expression engine then decides which selections actually need matching.

use crate::detection::Detection;
use crate::error::{Result, SigmaError};
use regex::{Captures, Regex};

/// Name of the deferred selection callback inside lowered expressions.
pub const EVALUATE_CONDITION: &str = "evaluateCondition";

/// Expand the detection's condition and rewrite its selection references.
pub fn lower(detection: &Detection) -> Result<String> {
    let expanded = detection.expand_condition()?;
    let names = detection.condition_names()?;
    rewrite_condition(&expanded, &names)
}

/// Rewrite each reference to one of `names` into an `evaluateCondition` call.
///
/// A reference is a whole token: either the bare name or the name followed
/// by one dot accessor (`selection.sub`). Names may contain `-`. Tokens that
/// merely start with a name (`sel` inside `sel1` or `sel-1`) or follow a dot
/// (`x.sel`) are left alone. All names are rewritten in one pass, so
/// rewritten text is never rescanned.
pub fn rewrite_condition(expanded: &str, names: &[String]) -> Result<String> {
    if names.is_empty() {
        return Ok(expanded.to_string());
    }

    let mut alternatives: Vec<String> = names.iter().map(|n| regex::escape(n)).collect();
    alternatives.sort_by(|a, b| b.len().cmp(&a.len()));

    let pattern = format!(
        r"(^|[^\w.\-])((?:{})(?:\.[\w\-]+)?)\b",
        alternatives.join("|")
    );
    let reference = Regex::new(&pattern).map_err(|e| {
        SigmaError::CompilationError(format!("Cannot build condition rewriter: {e}"))
    })?;

    let rewritten = reference.replace_all(expanded, |caps: &Captures| {
        let end = caps.get(0).map_or(expanded.len(), |m| m.end());
        if expanded[end..].starts_with('-') {
            return caps[0].to_string();
        }
        format!("{}{}(\"{}\")", &caps[1], EVALUATE_CONDITION, &caps[2])
    });

    Ok(rewritten.into_owned())
}
