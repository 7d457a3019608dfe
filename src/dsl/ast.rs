//! AST types for the filter rule language.

use std::fmt;

use regex::Regex;

/// Root filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterAst {
    /// Boolean AND: `and(...)` or a bare `(...)` group
    And(Vec<FilterAst>),

    /// Boolean OR: `or(...)`
    Or(Vec<FilterAst>),

    /// Substring match: `{rgb}`
    Match(String),

    /// Numeric comparison against every `<number><unit>` in the text: `[>600w]`
    Compare(Comparison),
}

/// Numeric comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt, // <
    Le, // <=
    Gt, // >
    Ge, // >=
    Eq, // ==
}

/// Comparison threshold. Literals without a decimal point stay integral.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Threshold {
    Integer(i64),
    Float(f64),
}

/// A parsed `[OP NUMBER UNIT]` literal.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub op: CompareOp,
    pub threshold: Threshold,
    pub unit: UnitPattern,
}

/// Unit suffix of a comparison, compiled to a number-then-unit scanner.
#[derive(Clone)]
pub struct UnitPattern {
    /// Lowercased, whitespace-free unit text (may be empty).
    unit: String,
    pub(super) regex: Regex,
}

impl UnitPattern {
    pub fn new(raw: &str) -> Result<Self, regex::Error> {
        let unit: String = raw
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        // Inches are usually written with quote marks in listing titles
        let suffix = if unit == "in" {
            r#"(?:in|''|")"#.to_string()
        } else {
            regex::escape(&unit)
        };
        let regex = Regex::new(&format!(r"(?i)([0-9]+(?:\.[0-9]+)?){suffix}"))?;
        Ok(Self { unit, regex })
    }

    pub fn as_str(&self) -> &str {
        &self.unit
    }
}

impl PartialEq for UnitPattern {
    fn eq(&self, other: &Self) -> bool {
        self.unit == other.unit
    }
}

impl fmt::Debug for UnitPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UnitPattern").field(&self.unit).finish()
    }
}

impl CompareOp {
    pub fn apply(self, left: f64, right: f64) -> bool {
        match self {
            CompareOp::Lt => left < right,
            CompareOp::Le => left <= right,
            CompareOp::Gt => left > right,
            CompareOp::Ge => left >= right,
            CompareOp::Eq => left == right,
        }
    }

    fn name(self) -> &'static str {
        match self {
            CompareOp::Lt => "lt",
            CompareOp::Le => "le",
            CompareOp::Gt => "gt",
            CompareOp::Ge => "ge",
            CompareOp::Eq => "eq",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::Lt => write!(f, "<"),
            CompareOp::Le => write!(f, "<="),
            CompareOp::Gt => write!(f, ">"),
            CompareOp::Ge => write!(f, ">="),
            CompareOp::Eq => write!(f, "=="),
        }
    }
}

impl Threshold {
    pub fn as_f64(self) -> f64 {
        match self {
            Threshold::Integer(n) => n as f64,
            Threshold::Float(n) => n,
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Threshold::Integer(n) => write!(f, "{n}"),
            Threshold::Float(n) => write!(f, "{n}"),
        }
    }
}

impl FilterAst {
    /// Build a substring predicate, dropping any whitespace in the needle.
    pub fn matching(text: &str) -> Self {
        FilterAst::Match(text.chars().filter(|c| !c.is_whitespace()).collect())
    }
}

fn write_children(f: &mut fmt::Formatter<'_>, children: &[FilterAst]) -> fmt::Result {
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{child}")?;
    }
    Ok(())
}

impl fmt::Display for FilterAst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterAst::And(children) => {
                write!(f, "and(")?;
                write_children(f, children)?;
                write!(f, ")")
            }
            FilterAst::Or(children) => {
                write!(f, "or(")?;
                write_children(f, children)?;
                write!(f, ")")
            }
            FilterAst::Match(needle) => write!(f, "matches('{needle}')"),
            FilterAst::Compare(cmp) => {
                write!(f, "{}({}{})", cmp.op.name(), cmp.threshold, cmp.unit.as_str())
            }
        }
    }
}
