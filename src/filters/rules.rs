//! Filter definitions, loading and matching.

use crate::dsl::{ExprError, FilterAst, evaluate_filter, parse_filter};
use crate::listing::Listing;
use anyhow::{Context, Result};
use regex::Regex;
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

static CATEGORY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(.+?)\]").expect("valid category regex"));
static CEILING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([0-9.]+)").expect("valid ceiling regex"));

/// Why a single rules line was rejected.
#[derive(Debug, Error, PartialEq)]
pub enum RuleError {
    #[error(transparent)]
    Expr(#[from] ExprError),
    #[error("missing price ceiling (expected '<NUMBER')")]
    MissingCeiling,
    #[error("invalid price ceiling '{0}'")]
    InvalidCeiling(String),
    #[error("missing rule expression (expected '#...')")]
    MissingLogic,
}

#[derive(Debug, Error, PartialEq)]
#[error("line {line}: {source}")]
pub struct LoadError {
    pub line: usize,
    #[source]
    pub source: RuleError,
}

/// A compiled filter rule.
#[derive(Debug, Clone)]
pub struct Filter {
    category: String,
    price_ceiling: f64,
    logic: FilterAst,
}

/// Strip whitespace and case-fold, so `Graphics Cards` and `graphicscards` agree.
fn normalize_category(category: &str) -> String {
    category
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

impl Filter {
    /// Compile a filter from its category, ceiling and rule expression.
    pub fn new(category: &str, price_ceiling: f64, logic: &str) -> Result<Self, RuleError> {
        Ok(Filter {
            category: normalize_category(category),
            price_ceiling,
            logic: parse_filter(logic)?,
        })
    }

    /// Parse one rules line. `Ok(None)` means the line carries no filter.
    pub fn parse_line(line: &str) -> Result<Option<Self>, RuleError> {
        // The expression runs to end of line, so only the part before `#`
        // can hold the category and ceiling.
        let (header, logic) = match line.split_once('#') {
            Some((header, logic)) => (header, Some(logic)),
            None => (line, None),
        };

        let Some(category) = CATEGORY_RE.captures(header).and_then(|caps| caps.get(1)) else {
            return Ok(None);
        };

        let ceiling = CEILING_RE
            .captures(header)
            .and_then(|caps| caps.get(1))
            .ok_or(RuleError::MissingCeiling)?
            .as_str();
        let ceiling: f64 = ceiling
            .parse()
            .map_err(|_| RuleError::InvalidCeiling(ceiling.to_string()))?;

        let logic = logic.ok_or(RuleError::MissingLogic)?;

        Filter::new(category.as_str(), ceiling, logic).map(Some)
    }

    /// A listing matches when it is priced, in the filter's category, at or
    /// under the ceiling, and its content satisfies the rule expression.
    pub fn matches(&self, listing: &Listing) -> bool {
        let Some(price) = listing.price.filter(|p| *p != 0.0) else {
            return false;
        };

        normalize_category(&listing.category).contains(&self.category)
            && price <= self.price_ceiling
            && evaluate_filter(&self.logic, &listing.content)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Filter(category='{}', ceiling={}, logic={})",
            self.category, self.price_ceiling, self.logic
        )
    }
}

/// All configured filters, in file order.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    filters: Vec<Filter>,
}

impl FilterSet {
    /// Load filters from rules text. Any bad line fails the whole load.
    pub fn load(source: &str) -> Result<Self, LoadError> {
        let mut filters = Vec::new();

        for (i, line) in source.lines().enumerate() {
            let parsed =
                Filter::parse_line(line).map_err(|source| LoadError { line: i + 1, source })?;
            if let Some(filter) = parsed {
                tracing::debug!("Loaded {}", filter);
                filters.push(filter);
            }
        }

        Ok(FilterSet { filters })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Filters: Failed to read {:?}", path))?;
        FilterSet::load(&source).with_context(|| format!("Filters: Invalid rule in {:?}", path))
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Filter> {
        self.filters.iter()
    }

    /// First filter matching the listing, if any.
    pub fn matching(&self, listing: &Listing) -> Option<&Filter> {
        self.filters.iter().find(|f| f.matches(listing))
    }

    pub fn matches(&self, listing: &Listing) -> bool {
        self.matching(listing).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::ParseError;

    fn listing(category: &str, price: Option<f64>, content: &str) -> Listing {
        Listing {
            category: category.into(),
            price,
            content: content.into(),
        }
    }

    fn gpu_filters() -> FilterSet {
        FilterSet::load("[Graphics Cards] <499.99 #and({rgb}[>8gb])").unwrap()
    }

    #[test]
    fn test_end_to_end_match() {
        let filters = gpu_filters();
        assert_eq!(filters.len(), 1);
        assert!(filters.matches(&listing("Graphics Cards", Some(450.0), "rgb12gbcard")));
    }

    #[test]
    fn test_over_ceiling() {
        let filters = gpu_filters();
        assert!(!filters.matches(&listing("Graphics Cards", Some(550.0), "rgb12gbcard")));
        assert!(filters.matches(&listing("Graphics Cards", Some(499.99), "rgb12gbcard")));
    }

    #[test]
    fn test_logic_must_hold() {
        let filters = gpu_filters();
        assert!(!filters.matches(&listing("Graphics Cards", Some(450.0), "12gbcard")));
        assert!(!filters.matches(&listing("Graphics Cards", Some(450.0), "rgb8gbcard")));
    }

    #[test]
    fn test_missing_or_zero_price() {
        let filters = gpu_filters();
        assert!(!filters.matches(&listing("Graphics Cards", None, "rgb12gbcard")));
        assert!(!filters.matches(&listing("Graphics Cards", Some(0.0), "rgb12gbcard")));
    }

    #[test]
    fn test_category_containment() {
        let filters = FilterSet::load("[GPU] <500 #").unwrap();
        assert!(filters.matches(&listing("gpu", Some(100.0), "x")));
        assert!(filters.matches(&listing("GPU / Laptop", Some(100.0), "x")));
        assert!(!filters.matches(&listing("cpu", Some(100.0), "x")));
        assert!(!filters.matches(&listing("", Some(100.0), "x")));
    }

    #[test]
    fn test_first_matching_filter() {
        let filters = FilterSet::load(
            "[SSD] <80 #[>=1tb]\n\
             [SSD] <200 #[>=2tb]\n",
        )
        .unwrap();
        let hit = filters
            .matching(&listing("ssd", Some(150.0), "nvme2tb"))
            .unwrap();
        assert_eq!(hit.price_ceiling, 200.0);
        assert!(filters.matching(&listing("ssd", Some(150.0), "nvme1tb")).is_none());
    }

    #[test]
    fn test_lines_without_category_are_skipped() {
        let source = "\n\
            # comments start with a hash [not a category]\n\
            just some notes <100\n\
            [Monitor] <300 # [>=27in] or({ips}{oled})\n";
        let filters = FilterSet::load(source).unwrap();
        assert_eq!(filters.len(), 1);
        assert!(filters.matches(&listing("monitor", Some(250.0), "27\"ips")));
    }

    #[test]
    fn test_fields_before_hash_in_any_order() {
        let filters = FilterSet::load("<120.5 [PSU] #{modular}").unwrap();
        assert!(filters.matches(&listing("psu", Some(120.5), "fullymodular")));
    }

    #[test]
    fn test_empty_set_never_matches() {
        let filters = FilterSet::load("").unwrap();
        assert!(filters.is_empty());
        assert!(!filters.matches(&listing("gpu", Some(1.0), "anything")));
    }

    #[test]
    fn test_malformed_comparison_aborts_load() {
        let err = FilterSet::load(
            "[GPU] <500 #{rgb}\n\
             [GPU] <500 #[>abc]\n",
        )
        .unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(
            err.source,
            RuleError::Expr(ExprError::Parse(ParseError::InvalidComparison(
                ">abc".into()
            )))
        );
    }

    #[test]
    fn test_missing_ceiling_and_logic() {
        assert_eq!(
            Filter::parse_line("[GPU] #{rgb}").unwrap_err(),
            RuleError::MissingCeiling
        );
        assert_eq!(
            Filter::parse_line("[GPU] <1.2.3 #{rgb}").unwrap_err(),
            RuleError::InvalidCeiling("1.2.3".into())
        );
        assert_eq!(
            Filter::parse_line("[GPU] <300").unwrap_err(),
            RuleError::MissingLogic
        );
    }

    #[test]
    fn test_display() {
        let filter = Filter::new("Graphics Cards", 499.99, "and({rgb}[>8gb])").unwrap();
        assert_eq!(
            filter.to_string(),
            "Filter(category='graphicscards', ceiling=499.99, logic=and(and(matches('rgb'), gt(8gb))))"
        );
    }
}
