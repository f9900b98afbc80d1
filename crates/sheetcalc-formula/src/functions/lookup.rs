//! Lookup functions

use super::range_argument;
use crate::argument::{resolve_scalar, to_number};
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{EvaluationContext, FormulaValue};
use crate::range::values_2d;
use sheetcalc_core::{ErrorCode, ResolvedValue};

/// VLOOKUP(lookup_value, table_array, col_index_num, [range_lookup])
///
/// Only exact matching is supported: the first row whose first column
/// equals `lookup_value` (case-insensitively, as strings) wins.
/// `range_lookup` may be omitted, `FALSE` or `0`; requesting approximate
/// matching is `#VALUE!`.
pub fn fn_vlookup(args: &[&str], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let lookup_value = resolve_scalar(args[0], ctx)?.as_text().to_lowercase();
    let table = range_argument(args[1])?;

    let col_index = match to_number(&resolve_scalar(args[2], ctx)?) {
        Some(n) if n >= 1.0 => n.trunc() as usize,
        _ => return Ok(FormulaValue::Error(ErrorCode::Value)),
    };
    if col_index > table.col_count() as usize {
        return Ok(FormulaValue::Error(ErrorCode::Ref));
    }

    if let Some(token) = args.get(3) {
        if !is_exact_match_mode(&resolve_scalar(token, ctx)?) {
            log::debug!("VLOOKUP approximate match requested with '{}'", token);
            return Err(FormulaError::UnsupportedMode(
                "VLOOKUP approximate match".to_string(),
            ));
        }
    }

    for row in values_2d(ctx, &table)? {
        let key = row.first().map(ResolvedValue::as_text).unwrap_or_default();
        if key.to_lowercase() == lookup_value {
            let value = row.into_iter().nth(col_index - 1).unwrap_or(ResolvedValue::Empty);
            return Ok(value.into());
        }
    }

    Ok(FormulaValue::Error(ErrorCode::NotAvailable))
}

fn is_exact_match_mode(value: &ResolvedValue) -> bool {
    match value {
        ResolvedValue::Empty => true,
        ResolvedValue::Number(n) => *n == 0.0,
        ResolvedValue::Text(s) => s.eq_ignore_ascii_case("FALSE"),
    }
}
