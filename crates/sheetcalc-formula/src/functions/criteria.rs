//! Criteria matching for SUMIF and COUNTIF
//!
//! A criterion can be:
//! - A comparison expression: `">10"`, `">=10"`, `"<100"`, `"<=50"`, `"<>0"`, `"=5"`
//! - A quoted string: case-insensitive exact match (`"apple"`)
//! - A cell label: the cell's value is the criterion
//! - A number: numerically equal values match
//! - Anything else: case-insensitive exact match on the text

use crate::error::FormulaResult;
use crate::evaluator::EvaluationContext;
use crate::tokenizer::{is_quoted, unquote};
use sheetcalc_core::{parse_number, CellAddress, ResolvedValue};

/// Matcher built from a raw criterion token
#[derive(Debug, Clone, PartialEq)]
pub struct CriteriaMatcher {
    criteria_type: CriteriaType,
}

#[derive(Debug, Clone, PartialEq)]
enum CriteriaType {
    /// Numerically equal values
    Number(f64),
    /// Comparison against a number; `None` when the right side is not numeric
    Comparison(ComparisonOp, Option<f64>),
    /// Lowercased text, compared case-insensitively
    Text(String),
    /// Blank cells
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ComparisonOp {
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
}

impl ComparisonOp {
    fn apply(self, left: f64, right: f64) -> bool {
        match self {
            ComparisonOp::Equal => left == right,
            ComparisonOp::NotEqual => left != right,
            ComparisonOp::LessThan => left < right,
            ComparisonOp::LessEqual => left <= right,
            ComparisonOp::GreaterThan => left > right,
            ComparisonOp::GreaterEqual => left >= right,
        }
    }
}

impl CriteriaMatcher {
    /// Build a matcher from a raw argument token
    pub fn new(token: &str, ctx: &mut EvaluationContext<'_>) -> FormulaResult<Self> {
        let token = token.trim();
        let quoted = is_quoted(token);
        let text = if quoted { unquote(token) } else { token.to_string() };

        let criteria_type = if let Some(ct) = Self::try_parse_comparison(text.trim()) {
            ct
        } else if quoted {
            CriteriaType::Text(text.to_lowercase())
        } else if let Some(addr) = CellAddress::parse_label(&text) {
            match ctx.resolve_cell(addr)? {
                ResolvedValue::Number(n) => CriteriaType::Number(n),
                ResolvedValue::Text(s) => {
                    Self::try_parse_comparison(s.trim()).unwrap_or(CriteriaType::Text(s.to_lowercase()))
                }
                ResolvedValue::Empty => CriteriaType::Empty,
            }
        } else if let Some(n) = parse_number(&text) {
            CriteriaType::Number(n)
        } else {
            CriteriaType::Text(text.to_lowercase())
        };

        Ok(Self { criteria_type })
    }

    fn try_parse_comparison(s: &str) -> Option<CriteriaType> {
        // Longer operators first
        let (op, rest) = if let Some(rest) = s.strip_prefix(">=") {
            (ComparisonOp::GreaterEqual, rest)
        } else if let Some(rest) = s.strip_prefix("<=") {
            (ComparisonOp::LessEqual, rest)
        } else if let Some(rest) = s.strip_prefix("<>") {
            (ComparisonOp::NotEqual, rest)
        } else if let Some(rest) = s.strip_prefix('>') {
            (ComparisonOp::GreaterThan, rest)
        } else if let Some(rest) = s.strip_prefix('<') {
            (ComparisonOp::LessThan, rest)
        } else if let Some(rest) = s.strip_prefix('=') {
            (ComparisonOp::Equal, rest)
        } else {
            return None;
        };

        Some(CriteriaType::Comparison(op, parse_number(rest)))
    }

    /// Check if a value matches the criterion
    pub fn matches(&self, value: &ResolvedValue) -> bool {
        match &self.criteria_type {
            CriteriaType::Number(n) => value.as_number() == Some(*n),
            CriteriaType::Comparison(op, Some(threshold)) => value
                .as_number()
                .map_or(false, |v| op.apply(v, *threshold)),
            CriteriaType::Comparison(_, None) => false,
            CriteriaType::Text(text) => value.as_text().to_lowercase() == *text,
            CriteriaType::Empty => value.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetcalc_core::Grid;

    fn matcher(grid: &Grid, token: &str) -> CriteriaMatcher {
        let mut ctx = EvaluationContext::new(grid);
        CriteriaMatcher::new(token, &mut ctx).unwrap()
    }

    fn num(n: f64) -> ResolvedValue {
        ResolvedValue::Number(n)
    }

    fn text(s: &str) -> ResolvedValue {
        ResolvedValue::Text(s.to_string())
    }

    #[test]
    fn test_comparisons() {
        let grid = Grid::new();
        let gt = matcher(&grid, r#"">10""#);
        assert!(gt.matches(&num(15.0)));
        assert!(!gt.matches(&num(10.0)));
        assert!(!gt.matches(&text("abc")));
        assert!(!gt.matches(&ResolvedValue::Empty));

        assert!(matcher(&grid, r#"">=10""#).matches(&num(10.0)));
        assert!(matcher(&grid, r#""<5""#).matches(&num(-1.0)));
        assert!(matcher(&grid, r#""<=5""#).matches(&num(5.0)));
        assert!(matcher(&grid, r#""<>0""#).matches(&num(3.0)));
        assert!(matcher(&grid, r#""=5""#).matches(&num(5.0)));
        assert!(matcher(&grid, ">10").matches(&num(11.0)));
    }

    #[test]
    fn test_comparison_with_non_numeric_threshold() {
        let grid = Grid::new();
        let m = matcher(&grid, r#"">abc""#);
        assert!(!m.matches(&num(1.0)));
        assert!(!m.matches(&text("zzz")));
    }

    #[test]
    fn test_quoted_text_is_case_insensitive() {
        let grid = Grid::new();
        let m = matcher(&grid, r#""Apple""#);
        assert!(m.matches(&text("apple")));
        assert!(m.matches(&text("APPLE")));
        assert!(!m.matches(&text("apples")));

        let m = matcher(&grid, r#""5""#);
        assert!(m.matches(&num(5.0)));
    }

    #[test]
    fn test_bare_number_and_text() {
        let grid = Grid::new();
        let m = matcher(&grid, "5");
        assert!(m.matches(&num(5.0)));
        assert!(!m.matches(&num(6.0)));
        assert!(!m.matches(&text("five")));

        assert!(matcher(&grid, "pear").matches(&text("Pear")));
    }

    #[test]
    fn test_cell_label_criterion() {
        let grid = Grid::from_rows([vec!["7", "Bob", ">3"]]);
        assert!(matcher(&grid, "A1").matches(&num(7.0)));
        assert!(matcher(&grid, "B1").matches(&text("bob")));
        assert!(matcher(&grid, "C1").matches(&num(4.0)));
        assert!(matcher(&grid, "D1").matches(&ResolvedValue::Empty));
        assert!(!matcher(&grid, "D1").matches(&num(0.0)));
    }
}
