//! Evaluator for the filter rule AST.

use super::ast::{Comparison, FilterAst, UnitPattern};

/// Evaluate a filter AST against normalized listing text.
pub fn evaluate_filter(ast: &FilterAst, text: &str) -> bool {
    match ast {
        // Empty groups: `and()` is vacuously true, `or()` vacuously false
        FilterAst::And(exprs) => exprs.iter().all(|e| evaluate_filter(e, text)),

        FilterAst::Or(exprs) => exprs.iter().any(|e| evaluate_filter(e, text)),

        FilterAst::Match(needle) => text.contains(needle.as_str()),

        FilterAst::Compare(cmp) => evaluate_comparison(cmp, text),
    }
}

/// True if any `<number><unit>` occurrence in the text satisfies the comparison.
fn evaluate_comparison(cmp: &Comparison, text: &str) -> bool {
    let threshold = cmp.threshold.as_f64();
    cmp.unit
        .occurrences(text)
        .any(|value| cmp.op.apply(value, threshold))
}

impl UnitPattern {
    /// Every number immediately followed by this unit, left to right.
    pub fn occurrences<'t>(&'t self, text: &'t str) -> impl Iterator<Item = f64> + 't {
        self.regex
            .captures_iter(text)
            .filter_map(|caps| caps.get(1)?.as_str().parse::<f64>().ok())
    }
}
