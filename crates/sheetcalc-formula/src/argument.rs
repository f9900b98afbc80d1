//! Argument resolution
//!
//! A raw argument token is classified in this order:
//! 1. a nested function call such as `SUM(A1:A3)`
//! 2. a range, when it contains `:` outside string literals
//! 3. a cell label such as `B7`
//! 4. a `"quoted"` string literal
//! 5. a number
//! 6. otherwise the token text itself

use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::EvaluationContext;
use crate::range::values_in_range;
use crate::tokenizer::{contains_unquoted, is_quoted, split_function_call, unquote};
use sheetcalc_core::{parse_number, CellAddress, CellRange, ResolvedValue};

/// A resolved function argument
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Scalar(ResolvedValue),
    /// Row-major range values, blanks included
    Range(Vec<ResolvedValue>),
}

impl Argument {
    /// All values of the argument, in order
    pub fn into_values(self) -> Vec<ResolvedValue> {
        match self {
            Argument::Scalar(v) => vec![v],
            Argument::Range(values) => values,
        }
    }
}

/// The range a token refers to, if it is a range or a single cell label
///
/// A token containing `:` that does not parse as a range is an error.
pub fn range_token(token: &str) -> FormulaResult<Option<CellRange>> {
    let token = token.trim();
    if split_function_call(token).is_some() {
        return Ok(None);
    }
    if contains_unquoted(token, ':') {
        return CellRange::parse(token)
            .map(Some)
            .map_err(|e| FormulaError::InvalidReference(e.to_string()));
    }
    Ok(CellAddress::parse_label(token).map(CellRange::single))
}

/// Resolve a raw argument token
pub fn resolve_argument(token: &str, ctx: &mut EvaluationContext<'_>) -> FormulaResult<Argument> {
    let token = token.trim();

    if split_function_call(token).is_some() {
        return ctx.resolve_expression(token).map(Argument::Scalar);
    }

    if contains_unquoted(token, ':') {
        let range = CellRange::parse(token)
            .map_err(|e| FormulaError::InvalidReference(e.to_string()))?;
        return values_in_range(ctx, &range, false).map(Argument::Range);
    }

    if let Some(addr) = CellAddress::parse_label(token) {
        return ctx.resolve_cell(addr).map(Argument::Scalar);
    }

    Ok(Argument::Scalar(literal(token)))
}

/// Resolve a token that must be a single value
pub fn resolve_scalar(token: &str, ctx: &mut EvaluationContext<'_>) -> FormulaResult<ResolvedValue> {
    match resolve_argument(token, ctx)? {
        Argument::Scalar(value) => Ok(value),
        Argument::Range(_) => Err(FormulaError::InvalidArgument(format!(
            "range '{}' where a single value is expected",
            token.trim()
        ))),
    }
}

fn literal(token: &str) -> ResolvedValue {
    if is_quoted(token) {
        let text = unquote(token);
        if text.is_empty() {
            return ResolvedValue::Empty;
        }
        return ResolvedValue::Text(text);
    }
    match parse_number(token) {
        Some(n) => ResolvedValue::Number(n),
        None if token.is_empty() => ResolvedValue::Empty,
        None => ResolvedValue::Text(token.to_string()),
    }
}

/// Numeric reading of a scalar: numbers, numeric text, and blank as zero
pub fn to_number(value: &ResolvedValue) -> Option<f64> {
    match value {
        ResolvedValue::Number(n) => Some(*n),
        ResolvedValue::Text(s) => parse_number(s),
        ResolvedValue::Empty => Some(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sheetcalc_core::Grid;

    fn resolve(grid: &Grid, token: &str) -> Argument {
        let mut ctx = EvaluationContext::new(grid);
        resolve_argument(token, &mut ctx).unwrap()
    }

    #[test]
    fn test_literals() {
        let grid = Grid::new();
        assert_eq!(resolve(&grid, "42"), Argument::Scalar(ResolvedValue::Number(42.0)));
        assert_eq!(
            resolve(&grid, r#""hi there""#),
            Argument::Scalar(ResolvedValue::Text("hi there".into()))
        );
        assert_eq!(
            resolve(&grid, r#""42""#),
            Argument::Scalar(ResolvedValue::Text("42".into()))
        );
        assert_eq!(
            resolve(&grid, "TRUE"),
            Argument::Scalar(ResolvedValue::Text("TRUE".into()))
        );
        assert_eq!(resolve(&grid, r#""""#), Argument::Scalar(ResolvedValue::Empty));
        assert_eq!(resolve(&grid, ""), Argument::Scalar(ResolvedValue::Empty));
    }

    #[test]
    fn test_cell_and_range() {
        let grid = Grid::from_rows([vec!["7", "", "=A1+1"]]);
        assert_eq!(resolve(&grid, "A1"), Argument::Scalar(ResolvedValue::Number(7.0)));
        assert_eq!(resolve(&grid, "B1"), Argument::Scalar(ResolvedValue::Empty));
        assert_eq!(
            resolve(&grid, "A1:C1"),
            Argument::Range(vec![
                ResolvedValue::Number(7.0),
                ResolvedValue::Empty,
                ResolvedValue::Number(8.0),
            ])
        );
    }

    #[test]
    fn test_nested_call() {
        let grid = Grid::from_rows([vec!["2", "3"]]);
        assert_eq!(
            resolve(&grid, "SUM(A1:B1)"),
            Argument::Scalar(ResolvedValue::Number(5.0))
        );
        assert_eq!(
            resolve(&grid, "FOO(A1)"),
            Argument::Scalar(ResolvedValue::Text("#NAME?".into()))
        );
    }

    #[test]
    fn test_colon_inside_string_is_not_a_range() {
        let grid = Grid::new();
        assert_eq!(
            resolve(&grid, r#""10:30""#),
            Argument::Scalar(ResolvedValue::Text("10:30".into()))
        );
    }

    #[test]
    fn test_bad_range() {
        let grid = Grid::new();
        let mut ctx = EvaluationContext::new(&grid);
        assert!(matches!(
            resolve_argument("A1:", &mut ctx),
            Err(FormulaError::InvalidReference(_))
        ));
        assert!(matches!(
            resolve_scalar("A1:B2", &mut ctx),
            Err(FormulaError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_range_token() {
        assert_eq!(range_token("A1:B2").unwrap(), CellRange::parse_range("A1:B2"));
        assert_eq!(range_token("C3").unwrap(), CellRange::parse_range("C3"));
        assert_eq!(range_token("42").unwrap(), None);
        assert_eq!(range_token("SUM(A1:A2)").unwrap(), None);
        assert!(range_token("A1:B2:C3").is_err());
    }

    #[test]
    fn test_to_number() {
        assert_eq!(to_number(&ResolvedValue::Number(2.5)), Some(2.5));
        assert_eq!(to_number(&ResolvedValue::Text("3".into())), Some(3.0));
        assert_eq!(to_number(&ResolvedValue::Text("x".into())), None);
        assert_eq!(to_number(&ResolvedValue::Empty), Some(0.0));
    }
}
