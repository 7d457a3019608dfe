//! Deal filters loaded from a line-oriented rules file.
//!
//! Each line reads like `[Graphics Cards] <499.99 #and({rgb}[>8gb])`: a
//! bracketed category, a price ceiling and, after `#`, a rule expression.
//! Lines without a category are ignored.

mod rules;

pub use rules::{Filter, FilterSet};
