//! Text functions

use crate::argument::{resolve_argument, resolve_scalar};
use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};

/// CONCAT(text1, [text2], ...) / CONCATENATE(...)
///
/// Ranges are flattened row-major; blanks contribute nothing.
pub fn fn_concat(args: &[&str], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let mut result = String::new();
    for token in args {
        for value in resolve_argument(token, ctx)?.into_values() {
            result.push_str(&value.as_text());
        }
    }
    Ok(FormulaValue::Text(result))
}

/// LEN(text)
pub fn fn_len(args: &[&str], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let text = resolve_scalar(args[0], ctx)?.as_text();
    Ok(FormulaValue::Number(text.chars().count() as f64))
}

/// TRIM(text)
pub fn fn_trim(args: &[&str], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let text = resolve_scalar(args[0], ctx)?.as_text();
    Ok(FormulaValue::Text(text.trim().to_string()))
}

/// LOWER(text)
pub fn fn_lower(args: &[&str], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let text = resolve_scalar(args[0], ctx)?.as_text();
    Ok(FormulaValue::Text(text.to_lowercase()))
}

/// UPPER(text)
pub fn fn_upper(args: &[&str], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let text = resolve_scalar(args[0], ctx)?.as_text();
    Ok(FormulaValue::Text(text.to_uppercase()))
}

/// PROPER(text) - capitalizes the first letter after any non-alphanumeric character
pub fn fn_proper(args: &[&str], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let text = resolve_scalar(args[0], ctx)?.as_text();

    let mut result = String::with_capacity(text.len());
    let mut capitalize_next = true;

    for ch in text.chars() {
        if !ch.is_alphanumeric() {
            result.push(ch);
            capitalize_next = true;
        } else if capitalize_next {
            result.extend(ch.to_uppercase());
            capitalize_next = false;
        } else {
            result.extend(ch.to_lowercase());
        }
    }

    Ok(FormulaValue::Text(result))
}
