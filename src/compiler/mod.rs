//! Condition compilation.
//!
//! This module turns a detection's condition text into an executable
//! predicate. It is organized into several sub-modules:
//! - [`lowering`] - Expansion of the raw condition and rewriting of selection
//!   references into deferred `evaluateCondition(...)` calls
//! - [`parser`] - Tokenization and parsing of expressions into an [`Expr`] AST
//! - [`expression`] - Compilation against a function registry and
//!   short-circuiting evaluation
//!
//! # Examples
//!
//! ```rust
//! use sigma_scanner::compiler::{compile, lower, ExprValue, Functions, EVALUATE_CONDITION};
//! use sigma_scanner::Detection;
//!
//! let detection = Detection::new("sel1 and not sel2", Vec::new());
//! let lowered = lower(&detection)?;
//! assert_eq!(lowered, r#"evaluateCondition("sel1") and not evaluateCondition("sel2")"#);
//!
//! let functions = Functions::new().register(EVALUATE_CONDITION, |args: &[ExprValue]| {
//!     Ok(ExprValue::from(args == [ExprValue::Str("sel1".to_string())]))
//! });
//! let predicate = compile(&lowered, functions)?;
//! assert!(predicate.evaluate(&serde_json::json!({}))?.is_truthy());
//! # Ok::<(), sigma_scanner::SigmaError>(())
//! ```

pub mod expression;
pub mod lowering;
pub mod parser;

pub use expression::{compile, compile_with_depth, ExprFn, ExprValue, Functions, Predicate};
pub use lowering::{lower, rewrite_condition, EVALUATE_CONDITION};
pub use parser::{parse_expression, BinaryOp, Expr, DEFAULT_MAX_EXPRESSION_DEPTH};
