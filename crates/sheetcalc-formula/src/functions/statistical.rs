//! Counting functions

use super::criteria::CriteriaMatcher;
use super::{collect_values, range_argument};
use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};
use crate::range::values_in_range;

/// COUNT(value1, [value2], ...)
pub fn fn_count(args: &[&str], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let values = collect_values(args, ctx, true)?;
    Ok(FormulaValue::Number(values.len() as f64))
}

/// COUNTA(value1, [value2], ...)
pub fn fn_counta(args: &[&str], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let count = collect_values(args, ctx, false)?
        .iter()
        .filter(|v| !v.is_empty())
        .count();
    Ok(FormulaValue::Number(count as f64))
}

/// COUNTIF(range, criteria)
pub fn fn_countif(args: &[&str], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let range = range_argument(args[0])?;
    let matcher = CriteriaMatcher::new(args[1], ctx)?;

    let count = values_in_range(ctx, &range, false)?
        .iter()
        .filter(|v| matcher.matches(v))
        .count();
    Ok(FormulaValue::Number(count as f64))
}

#[cfg(test)]
mod tests {
    use crate::evaluator::evaluate_formula;
    use pretty_assertions::assert_eq;
    use sheetcalc_core::Grid;

    fn eval(grid: &Grid, formula: &str) -> String {
        evaluate_formula(formula, grid).display_value
    }

    fn sample() -> Grid {
        Grid::from_rows([
            vec!["1", "apple"],
            vec!["", "Apple"],
            vec!["three", ""],
            vec!["4.5", "pear"],
            vec!["=A1*10", "=B1"],
        ])
    }

    #[test]
    fn test_count() {
        let grid = sample();
        assert_eq!(eval(&grid, "=COUNT(A1:A5)"), "3");
        assert_eq!(eval(&grid, "=COUNT(B1:B5)"), "0");
        assert_eq!(eval(&grid, "=COUNT(A1:A5, 7, \"x\")"), "4");
    }

    #[test]
    fn test_counta() {
        let grid = sample();
        assert_eq!(eval(&grid, "=COUNTA(A1:A5)"), "4");
        assert_eq!(eval(&grid, "=COUNTA(A1:B5)"), "8");
        assert_eq!(eval(&grid, "=COUNTA(A2)"), "0");
    }

    #[test]
    fn test_countif() {
        let grid = sample();
        assert_eq!(eval(&grid, "=COUNTIF(B1:B5, \"apple\")"), "3");
        assert_eq!(eval(&grid, "=COUNTIF(A1:A5, \">2\")"), "2");
        assert_eq!(eval(&grid, "=COUNTIF(A1:A5, \"<=1\")"), "1");
        assert_eq!(eval(&grid, "=COUNTIF(A1:A5, 10)"), "1");
        assert_eq!(eval(&grid, "=COUNTIF(A1:B5, A2)"), "2");
    }
}
