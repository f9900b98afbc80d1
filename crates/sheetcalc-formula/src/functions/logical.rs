//! Logical functions

use crate::argument::resolve_scalar;
use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};
use crate::expression::evaluate_condition;

/// IF(condition, value_if_true, [value_if_false])
///
/// Only the chosen branch is resolved. A false condition with no third
/// argument yields `FALSE`.
pub fn fn_if(args: &[&str], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let condition = evaluate_condition(args[0], ctx)?;

    let branch = if condition { args.get(1) } else { args.get(2) };
    match branch {
        Some(token) => Ok(resolve_scalar(token, ctx)?.into()),
        None => Ok(FormulaValue::Text("FALSE".to_string())),
    }
}
