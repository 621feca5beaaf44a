//! # SIGMA Rule Scanner
//!
//! A Rust library for evaluating [SIGMA detection rules](https://github.com/SigmaHQ/sigma)
//! against structured JSON events, yielding a boolean match decision per
//! `(rule, event)` pair.
//!
//! A rule's condition (`sel1 and not sel2`, `selection.sub`) is lowered into
//! an expression whose leaves are deferred selection calls, so selections are
//! only matched when the boolean algebra needs them. Each selection is turned
//! into an [`Identifier`] tree and walked against the event by the
//! [`Matcher`], honoring the `contains`, `startswith`, `endswith`, `all` and
//! `not` field modifiers and any-element semantics for arrays.
//!
//! ## Quick Start
//!
//! ```rust
//! use sigma_scanner::{Scanner, SigmaRule};
//!
//! let rule = SigmaRule::from_yaml(r#"
//! title: Windows Login Event
//! logsource:
//!     category: authentication
//! detection:
//!     selection:
//!         EventID: 4624
//!         LogonType: 2
//!     condition: selection
//! "#)?;
//!
//! let scanner = Scanner::new();
//!
//! let event = serde_json::json!({
//!     "EventID": 4624,
//!     "LogonType": 2
//! });
//!
//! assert!(scanner.scan(&rule, &event));
//! # Ok::<(), sigma_scanner::SigmaError>(())
//! ```
//!
//! ### Batch Processing
//!
//! ```rust
//! use sigma_scanner::{Scanner, SigmaRule};
//!
//! let rules = SigmaRule::from_yaml_multi(r#"
//! title: Logon
//! detection:
//!     selection:
//!         EventID: 4624
//!     condition: selection
//! ---
//! title: Failed logon
//! detection:
//!     selection:
//!         EventID: 4625
//!     condition: selection
//! "#)?;
//!
//! let events = vec![
//!     serde_json::json!({"EventID": 4624}),
//!     serde_json::json!({"EventID": 4625}),
//!     serde_json::json!({"EventID": 1}),
//! ];
//!
//! let results = Scanner::new().scan_batch(&rules, &events);
//! assert_eq!(results, vec![vec![0], vec![1], vec![]]);
//! # Ok::<(), sigma_scanner::SigmaError>(())
//! ```
//!
//! ### Logging
//!
//! Diagnostics go through a [`ScanLogger`] handed to the scanner. The default
//! [`TracingLogger`] emits `tracing` events with target `sigma_scanner`;
//! failures never escape [`Scanner::scan`] and are only visible there.
//!
//! ```rust
//! use std::sync::Arc;
//! use sigma_scanner::{NoopLogger, Scanner, ScannerConfig};
//!
//! let scanner = Scanner::with_config(ScannerConfig::strict(), Arc::new(NoopLogger))?;
//! assert!(!scanner.config().parallel);
//! # Ok::<(), sigma_scanner::SigmaError>(())
//! ```

pub mod compiler;
pub mod config;
pub mod detection;
pub mod error;
pub mod identifier;
pub mod logging;
pub mod matcher;
pub mod rule;
pub mod scanner;

pub use config::ScannerConfig;
pub use detection::{Definition, Detection};
pub use error::{Result, SigmaError};
pub use identifier::{Identifier, Modifier, ModifierKind, Primitive};
pub use logging::{NoopLogger, ScanLogger, TracingLogger};
pub use matcher::Matcher;
pub use rule::SigmaRule;
pub use scanner::Scanner;
