//! Structural matching of selections against events.
//!
//! ## Architecture
//!
//! - [`Matcher`] walks an [`Identifier`](crate::Identifier) tree against a
//!   `serde_json::Value` event, AND-ing children at every level and applying
//!   any-element semantics to array fields.
//! - [`match_primitive`] and [`match_string`] compare a single rule value
//!   with a single event value under the leaf's modifiers.
//!
//! Matching is fail-closed: nothing in this module returns an error, and every
//! undecidable case is treated as "no match".
//!
//! ## Example Usage
//!
//! ```rust
//! use sigma_scanner::matcher::Matcher;
//! use sigma_scanner::{Definition, Identifier};
//! use serde_json::json;
//!
//! let yaml: serde_yaml::Value = serde_yaml::from_str("CommandLine|contains: powershell").unwrap();
//! let tree = Identifier::from_definition("selection", &Definition::from_yaml(&yaml)?)?;
//!
//! let event = json!({"CommandLine": "C:\\Windows\\System32\\powershell.exe"});
//! assert!(Matcher::new().match_condition(&event, &tree).is_some());
//! # Ok::<(), sigma_scanner::SigmaError>(())
//! ```

pub mod primitive;
pub mod tree;

pub use primitive::{match_primitive, match_string};
pub use tree::{Matcher, DEFAULT_MAX_MATCH_DEPTH};
