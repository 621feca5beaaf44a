//! Compilation and evaluation of lowered condition expressions.
//!
//! The engine knows two value types, numbers and strings. Booleans are the
//! numbers `0` and `1`. Its only extension point is a registry of named
//! functions; the scanner registers `evaluateCondition` there so selections
//! are matched only when the boolean algebra actually needs them.

use super::parser::{parse_expression, BinaryOp, Expr, DEFAULT_MAX_EXPRESSION_DEPTH};
use crate::error::{Result, SigmaError};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// A runtime value inside the expression algebra.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprValue {
    Number(f64),
    Str(String),
}

impl ExprValue {
    pub const TRUE: ExprValue = ExprValue::Number(1.0);
    pub const FALSE: ExprValue = ExprValue::Number(0.0);

    /// Non-zero numbers and non-empty strings are true.
    pub fn is_truthy(&self) -> bool {
        match self {
            ExprValue::Number(n) => *n != 0.0 && !n.is_nan(),
            ExprValue::Str(s) => !s.is_empty(),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            ExprValue::Number(_) => "number",
            ExprValue::Str(_) => "string",
        }
    }
}

impl From<bool> for ExprValue {
    fn from(value: bool) -> Self {
        if value {
            ExprValue::TRUE
        } else {
            ExprValue::FALSE
        }
    }
}

impl fmt::Display for ExprValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprValue::Number(n) => write!(f, "{n}"),
            ExprValue::Str(s) => write!(f, "\"{s}\""),
        }
    }
}

/// A callable registered with the expression engine.
pub type ExprFn<'a> = Box<dyn Fn(&[ExprValue]) -> Result<ExprValue> + 'a>;

/// Named functions available to a compiled expression.
#[derive(Default)]
pub struct Functions<'a> {
    functions: HashMap<String, ExprFn<'a>>,
}

impl<'a> Functions<'a> {
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// Register a function, replacing any previous one with the same name.
    pub fn register<F>(mut self, name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&[ExprValue]) -> Result<ExprValue> + 'a,
    {
        self.functions.insert(name.into(), Box::new(function));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    fn call(&self, name: &str, args: &[ExprValue]) -> Result<ExprValue> {
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| SigmaError::EvaluationError(format!("Unknown function: {name}")))?;
        function(args)
    }
}

impl fmt::Debug for Functions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.functions.keys().collect();
        names.sort();
        f.debug_struct("Functions").field("names", &names).finish()
    }
}

/// A compiled expression bound to its functions.
#[derive(Debug)]
pub struct Predicate<'a> {
    ast: Expr,
    functions: Functions<'a>,
}

/// Compile an expression with the default nesting bound.
pub fn compile<'a>(text: &str, functions: Functions<'a>) -> Result<Predicate<'a>> {
    compile_with_depth(text, functions, DEFAULT_MAX_EXPRESSION_DEPTH)
}

/// Compile an expression, rejecting nesting deeper than `max_depth`.
///
/// Calls to functions that are not registered are compile errors.
pub fn compile_with_depth<'a>(
    text: &str,
    functions: Functions<'a>,
    max_depth: usize,
) -> Result<Predicate<'a>> {
    let ast = parse_expression(text, max_depth)?;

    if let Some(unknown) = ast
        .called_functions()
        .into_iter()
        .find(|name| !functions.contains(name))
    {
        return Err(SigmaError::CompilationError(format!(
            "Unknown function: {unknown}"
        )));
    }

    Ok(Predicate { ast, functions })
}

impl<'a> Predicate<'a> {
    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    /// Evaluate against an event. `and`/`or` short-circuit, so functions on
    /// the skipped side are never called.
    pub fn evaluate(&self, event: &Value) -> Result<ExprValue> {
        self.eval(&self.ast, event)
    }

    fn eval(&self, expr: &Expr, event: &Value) -> Result<ExprValue> {
        match expr {
            Expr::Number(n) => Ok(ExprValue::Number(*n)),
            Expr::Str(s) => Ok(ExprValue::Str(s.clone())),
            Expr::Property(path) => resolve_property(event, path),
            Expr::Call { name, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg, event))
                    .collect::<Result<Vec<_>>>()?;
                self.functions.call(name, &args)
            }
            Expr::Not(inner) => Ok(ExprValue::from(!self.eval(inner, event)?.is_truthy())),
            Expr::Neg(inner) => match self.eval(inner, event)? {
                ExprValue::Number(n) => Ok(ExprValue::Number(-n)),
                other => Err(SigmaError::EvaluationError(format!(
                    "Cannot negate a {}",
                    other.type_name()
                ))),
            },
            Expr::And(left, right) => {
                if !self.eval(left, event)?.is_truthy() {
                    return Ok(ExprValue::FALSE);
                }
                Ok(ExprValue::from(self.eval(right, event)?.is_truthy()))
            }
            Expr::Or(left, right) => {
                if self.eval(left, event)?.is_truthy() {
                    return Ok(ExprValue::TRUE);
                }
                Ok(ExprValue::from(self.eval(right, event)?.is_truthy()))
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left, event)?;
                let right = self.eval(right, event)?;
                apply_binary(*op, left, right)
            }
        }
    }
}

fn apply_binary(op: BinaryOp, left: ExprValue, right: ExprValue) -> Result<ExprValue> {
    use ExprValue::{Number, Str};

    match (op, &left, &right) {
        (BinaryOp::Eq, _, _) => Ok(ExprValue::from(left == right)),
        (BinaryOp::NotEq, _, _) => Ok(ExprValue::from(left != right)),
        (BinaryOp::Add, Number(a), Number(b)) => Ok(Number(a + b)),
        (BinaryOp::Sub, Number(a), Number(b)) => Ok(Number(a - b)),
        (BinaryOp::Mul, Number(a), Number(b)) => Ok(Number(a * b)),
        (BinaryOp::Div, Number(a), Number(b)) => Ok(Number(a / b)),
        (BinaryOp::Mod, Number(a), Number(b)) => Ok(Number(a % b)),
        (BinaryOp::Lt, Number(a), Number(b)) => Ok(ExprValue::from(a < b)),
        (BinaryOp::LtEq, Number(a), Number(b)) => Ok(ExprValue::from(a <= b)),
        (BinaryOp::Gt, Number(a), Number(b)) => Ok(ExprValue::from(a > b)),
        (BinaryOp::GtEq, Number(a), Number(b)) => Ok(ExprValue::from(a >= b)),
        (BinaryOp::Lt, Str(a), Str(b)) => Ok(ExprValue::from(a < b)),
        (BinaryOp::LtEq, Str(a), Str(b)) => Ok(ExprValue::from(a <= b)),
        (BinaryOp::Gt, Str(a), Str(b)) => Ok(ExprValue::from(a > b)),
        (BinaryOp::GtEq, Str(a), Str(b)) => Ok(ExprValue::from(a >= b)),
        _ => Err(SigmaError::EvaluationError(format!(
            "Operator {op:?} cannot be applied to {} and {}",
            left.type_name(),
            right.type_name()
        ))),
    }
}

/// Resolve a dotted path against the event. Only scalar leaves have a value
/// inside the algebra.
fn resolve_property(event: &Value, path: &str) -> Result<ExprValue> {
    let value = path
        .split('.')
        .try_fold(event, |node, segment| node.get(segment))
        .ok_or_else(|| SigmaError::EvaluationError(format!("Unknown property: {path}")))?;

    match value {
        Value::Number(n) => n
            .as_f64()
            .map(ExprValue::Number)
            .ok_or_else(|| SigmaError::EvaluationError(format!("Property {path} is not finite"))),
        Value::String(s) => Ok(ExprValue::Str(s.clone())),
        Value::Bool(b) => Ok(ExprValue::from(*b)),
        Value::Null | Value::Array(_) | Value::Object(_) => Err(SigmaError::EvaluationError(
            format!("Property {path} has no scalar value"),
        )),
    }
}
