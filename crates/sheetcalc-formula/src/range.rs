//! Range materialization
//!
//! Every cell in a range is resolved through
//! [`EvaluationContext::resolve_cell`], so formulas inside a range are
//! evaluated (and cycles through them detected) like any other reference.

use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::EvaluationContext;
use sheetcalc_core::{CellRange, ResolvedValue};

fn check_size(range: &CellRange, ctx: &EvaluationContext<'_>) -> FormulaResult<()> {
    let limit = ctx.options().max_range_cells;
    if range.cell_count() > limit {
        return Err(FormulaError::InvalidReference(format!(
            "range {} has more than {} cells",
            range, limit
        )));
    }
    Ok(())
}

/// Values of a range in row-major order
///
/// With `numeric_only`, only numbers are kept. Otherwise every cell yields
/// an entry, with [`ResolvedValue::Empty`] holding the place of blanks.
pub fn values_in_range(
    ctx: &mut EvaluationContext<'_>,
    range: &CellRange,
    numeric_only: bool,
) -> FormulaResult<Vec<ResolvedValue>> {
    check_size(range, ctx)?;
    let mut values = Vec::new();
    for addr in range.cells() {
        let value = ctx.resolve_cell(addr)?;
        if !numeric_only || value.is_number() {
            values.push(value);
        }
    }
    Ok(values)
}

/// Values of a range as rows, preserving shape
pub fn values_2d(
    ctx: &mut EvaluationContext<'_>,
    range: &CellRange,
) -> FormulaResult<Vec<Vec<ResolvedValue>>> {
    check_size(range, ctx)?;
    let mut rows = Vec::with_capacity(range.row_count() as usize);
    for row in range.rows() {
        let values = row
            .map(|addr| ctx.resolve_cell(addr))
            .collect::<FormulaResult<Vec<_>>>()?;
        rows.push(values);
    }
    Ok(rows)
}
