//! Scanner configuration.
//!
//! This module provides the bounds and batch-processing knobs of the
//! [`Scanner`](crate::Scanner). Every bound is fail-closed: exceeding it makes
//! the affected rule report "no match" instead of erroring out of a batch.
//!
//! Configurations can be built in code, taken from a preset, or deserialized
//! from any serde format (missing keys fall back to the defaults).
//!
//! # Examples
//!
//! ```rust
//! use sigma_scanner::ScannerConfig;
//!
//! let config: ScannerConfig = serde_yaml::from_str("max_match_depth: 8\nparallel: false\n").unwrap();
//! assert_eq!(config.max_match_depth, 8);
//! assert_eq!(config.max_condition_length, ScannerConfig::default().max_condition_length);
//! assert!(config.validate().is_ok());
//! ```

use crate::compiler::DEFAULT_MAX_EXPRESSION_DEPTH;
use crate::error::{Result, SigmaError};
use crate::matcher::DEFAULT_MAX_MATCH_DEPTH;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Longest raw condition, in bytes, that will be lowered.
    pub max_condition_length: usize,

    /// Maximum nesting of parentheses and prefix operators in a condition.
    pub max_expression_depth: usize,

    /// Maximum nesting of field groups the matcher will descend into.
    pub max_match_depth: usize,

    /// Use the rayon thread pool for [`Scanner::scan_batch`](crate::Scanner::scan_batch).
    pub parallel: bool,

    /// Smallest event batch that is scanned in parallel.
    pub min_batch_size_for_parallelism: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_condition_length: 4096,
            max_expression_depth: DEFAULT_MAX_EXPRESSION_DEPTH,
            max_match_depth: DEFAULT_MAX_MATCH_DEPTH,
            parallel: true,
            min_batch_size_for_parallelism: 64,
        }
    }
}

impl ScannerConfig {
    /// Tight bounds for untrusted rule sets; batches always run sequentially.
    pub fn strict() -> Self {
        Self {
            max_condition_length: 1024,
            max_expression_depth: 16,
            max_match_depth: 8,
            parallel: false,
            ..Self::default()
        }
    }

    /// Parallelise even small batches.
    pub fn high_throughput() -> Self {
        Self {
            parallel: true,
            min_batch_size_for_parallelism: 8,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        let bounds = [
            ("max_condition_length", self.max_condition_length),
            ("max_expression_depth", self.max_expression_depth),
            ("max_match_depth", self.max_match_depth),
        ];

        for (name, value) in bounds {
            if value == 0 {
                return Err(SigmaError::InvalidRule(format!(
                    "Scanner configuration '{name}' must be greater than zero"
                )));
            }
        }

        Ok(())
    }
}
