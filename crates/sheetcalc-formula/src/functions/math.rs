//! Math functions

use super::criteria::CriteriaMatcher;
use super::{collect_numbers, range_argument};
use crate::argument::{resolve_scalar, to_number};
use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};
use crate::range::values_2d;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use sheetcalc_core::{format_number, ErrorCode, ResolvedValue};
use std::str::FromStr;

/// SUM(value1, [value2], ...)
pub fn fn_sum(args: &[&str], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let numbers = collect_numbers(args, ctx)?;
    Ok(FormulaValue::Number(numbers.iter().sum()))
}

/// AVERAGE(value1, [value2], ...)
pub fn fn_average(args: &[&str], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let numbers = collect_numbers(args, ctx)?;
    if numbers.is_empty() {
        return Ok(FormulaValue::Error(ErrorCode::DivZero));
    }
    Ok(FormulaValue::Number(
        numbers.iter().sum::<f64>() / numbers.len() as f64,
    ))
}

/// MAX(value1, [value2], ...)
pub fn fn_max(args: &[&str], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let numbers = collect_numbers(args, ctx)?;
    let max = numbers.into_iter().reduce(f64::max).unwrap_or(0.0);
    Ok(FormulaValue::Number(max))
}

/// MIN(value1, [value2], ...)
pub fn fn_min(args: &[&str], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let numbers = collect_numbers(args, ctx)?;
    let min = numbers.into_iter().reduce(f64::min).unwrap_or(0.0);
    Ok(FormulaValue::Number(min))
}

/// ROUND(number, [num_digits])
pub fn fn_round(args: &[&str], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let number = match to_number(&resolve_scalar(args[0], ctx)?) {
        Some(n) => n,
        None => return Ok(FormulaValue::Error(ErrorCode::Value)),
    };

    let num_digits = match args.get(1) {
        Some(token) => match to_number(&resolve_scalar(token, ctx)?) {
            Some(n) => n.trunc() as i32,
            None => return Ok(FormulaValue::Error(ErrorCode::Value)),
        },
        None => 0,
    };

    Ok(FormulaValue::Number(round_half_away(number, num_digits)))
}

/// Round half away from zero, deciding ties on the number's shortest
/// decimal form so that 2.005 rounds to 2.01
fn round_half_away(number: f64, num_digits: i32) -> f64 {
    decimal_round(number, num_digits).unwrap_or_else(|| {
        // Outside Decimal's range: scale in binary floating point
        let multiplier = 10_f64.powi(num_digits);
        if number >= 0.0 {
            (number * multiplier + 0.5).floor() / multiplier
        } else {
            (number * multiplier - 0.5).ceil() / multiplier
        }
    })
}

fn decimal_round(number: f64, num_digits: i32) -> Option<f64> {
    let value = Decimal::from_str(&format_number(number)).ok()?;
    let strategy = RoundingStrategy::MidpointAwayFromZero;

    if num_digits >= 0 {
        return value
            .round_dp_with_strategy(num_digits.unsigned_abs(), strategy)
            .to_f64();
    }

    // Decimal holds at most 28 significant digits
    if num_digits < -28 {
        return Some(0.0);
    }
    let factor = Decimal::from_i128_with_scale(10_i128.pow(num_digits.unsigned_abs()), 0);
    value
        .checked_div(factor)?
        .round_dp_with_strategy(0, strategy)
        .checked_mul(factor)?
        .to_f64()
}

/// SUMIF(range, criteria, [sum_range])
///
/// Cells of `range` and `sum_range` are paired by (row, column) offset;
/// only numbers in `sum_range` are added.
pub fn fn_sumif(args: &[&str], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let criteria_range = range_argument(args[0])?;
    let matcher = CriteriaMatcher::new(args[1], ctx)?;

    let criteria_values = values_2d(ctx, &criteria_range)?;
    let sum_values = match args.get(2) {
        Some(token) => {
            let sum_range = range_argument(token)?;
            values_2d(ctx, &sum_range)?
        }
        None => criteria_values.clone(),
    };

    let mut sum = 0.0;
    for (r, row) in criteria_values.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            if !matcher.matches(value) {
                continue;
            }
            if let Some(ResolvedValue::Number(n)) = sum_values.get(r).and_then(|row| row.get(c)) {
                sum += n;
            }
        }
    }

    Ok(FormulaValue::Number(sum))
}

#[cfg(test)]
mod tests {
    use crate::evaluator::evaluate_formula;
    use pretty_assertions::assert_eq;
    use sheetcalc_core::Grid;

    fn eval(grid: &Grid, formula: &str) -> String {
        evaluate_formula(formula, grid).display_value
    }

    fn column(values: &[&str]) -> Grid {
        Grid::from_rows(values.iter().map(|v| vec![*v]))
    }

    #[test]
    fn test_sum_skips_text() {
        let grid = column(&["10", "x", "5"]);
        assert_eq!(eval(&grid, "=SUM(A1:A3)"), "15");
    }

    #[test]
    fn test_sum_variadic() {
        let grid = column(&["10", "x", "5"]);
        assert_eq!(eval(&grid, "=SUM(A1, A3, 2)"), "17");
        assert_eq!(eval(&grid, "=SUM(A1:A3, \"x\", 1)"), "16");
        assert_eq!(eval(&grid, "=SUM(A1:A1)"), "10");
        assert_eq!(eval(&grid, "=SUM(A2)"), "0");
    }

    #[test]
    fn test_sum_bad_range() {
        let grid = Grid::new();
        assert_eq!(eval(&grid, "=SUM(A1:)"), "#ERROR!");
        assert_eq!(eval(&grid, "=SUM()"), "#ERROR!");
    }

    #[test]
    fn test_average() {
        let grid = column(&["2", "", "4", "text"]);
        assert_eq!(eval(&grid, "=AVERAGE(A1:A4)"), "3");
        assert_eq!(eval(&grid, "=AVERAGE(B1:B4)"), "#DIV/0!");
        assert_eq!(eval(&grid, "=AVERAGE(A4)"), "#DIV/0!");
    }

    #[test]
    fn test_max_min() {
        let grid = column(&["3", "-7", "x", "12"]);
        assert_eq!(eval(&grid, "=MAX(A1:A4)"), "12");
        assert_eq!(eval(&grid, "=MIN(A1:A4)"), "-7");
        assert_eq!(eval(&grid, "=MAX(B1:B4)"), "0");
        assert_eq!(eval(&grid, "=MIN(A3)"), "0");
    }

    #[test]
    fn test_round() {
        let grid = Grid::new();
        assert_eq!(eval(&grid, "=ROUND(2.345, 2)"), "2.35");
        assert_eq!(eval(&grid, "=ROUND(2.005, 2)"), "2.01");
        assert_eq!(eval(&grid, "=ROUND(1.005, 2)"), "1.01");
        assert_eq!(eval(&grid, "=ROUND(2.5)"), "3");
        assert_eq!(eval(&grid, "=ROUND(-2.5, 0)"), "-3");
        assert_eq!(eval(&grid, "=ROUND(1234.5, -2)"), "1200");
        assert_eq!(eval(&grid, "=ROUND(15, -1)"), "20");
        assert_eq!(eval(&grid, "=ROUND(3.14159, 2.9)"), "3.14");
        assert_eq!(eval(&grid, "=ROUND(0.1, 3)"), "0.1");
    }

    #[test]
    fn test_round_coercion() {
        let grid = column(&["2.345", "", "abc"]);
        assert_eq!(eval(&grid, "=ROUND(A1, 1)"), "2.3");
        assert_eq!(eval(&grid, "=ROUND(A2, 1)"), "0");
        assert_eq!(eval(&grid, "=ROUND(\"7.77\", 1)"), "7.8");
        assert_eq!(eval(&grid, "=ROUND(A3, 1)"), "#VALUE!");
        assert_eq!(eval(&grid, "=ROUND(1, A3)"), "#VALUE!");
        assert_eq!(eval(&grid, "=ROUND(A1:A2, 1)"), "#VALUE!");
    }

    #[test]
    fn test_round_huge_values() {
        let grid = column(&["1e30"]);
        assert_eq!(eval(&grid, "=ROUND(A1, -40)"), "0");
    }

    #[test]
    fn test_sumif() {
        let grid = Grid::from_rows([vec!["5", "1"], vec!["15", "2"], vec!["20", "3"]]);
        assert_eq!(eval(&grid, "=SUMIF(A1:A3, \">10\", B1:B3)"), "5");
        assert_eq!(eval(&grid, "=SUMIF(A1:A3, \">10\")"), "35");
        assert_eq!(eval(&grid, "=SUMIF(A1:A3, 5, B1:B3)"), "1");
        assert_eq!(eval(&grid, "=SUMIF(A1:A3, \"<>15\", B1:B3)"), "4");
    }

    #[test]
    fn test_sumif_text_criteria() {
        let grid = Grid::from_rows([
            vec!["apple", "10"],
            vec!["Pear", "20"],
            vec!["APPLE", "x"],
            vec!["apple", "5"],
        ]);
        assert_eq!(eval(&grid, "=SUMIF(A1:A4, \"Apple\", B1:B4)"), "15");
        assert_eq!(eval(&grid, "=SUMIF(A1:A4, pear, B1:B4)"), "20");
        assert_eq!(eval(&grid, "=SUMIF(A1:A4, A2, B1:B4)"), "20");
    }

    #[test]
    fn test_sumif_requires_range() {
        let grid = Grid::new();
        assert_eq!(eval(&grid, "=SUMIF(5, \">1\")"), "#VALUE!");
    }
}
