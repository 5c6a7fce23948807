//! Shared test utilities for the rodeo test suite.
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let private = rule("private", Condition {
//!     includes_any: kw(&["private"]),
//!     ..Condition::default()
//! });
//! ```

use crate::rules::{Action, Condition, Rule};

/// Owned keyword list from string literals.
pub fn kw(keywords: &[&str]) -> Vec<String> {
    keywords.iter().map(|k| k.to_string()).collect()
}

/// A rule with the given condition and an action that does nothing.
pub fn rule(name: &str, condition: Condition) -> Rule {
    Rule {
        name: name.to_string(),
        condition,
        action: Action::default(),
    }
}
