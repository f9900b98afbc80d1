//! Formula evaluation engine
//!
//! A formula is dispatched on its shape: a single `NAME(...)` call goes to
//! the function registry, anything else is a restricted arithmetic
//! expression. Cell references are resolved on demand against a read-only
//! [`GridSnapshot`], recursing into referenced formulas. A set of cells
//! currently being evaluated detects cycles and a depth counter bounds
//! the recursion.

use crate::error::{FormulaError, FormulaResult};
use crate::expression;
use crate::functions::get_function;
use crate::tokenizer::{count_calls, split_arguments, split_function_call};
use ahash::{AHashMap, AHashSet};
use sheetcalc_core::{format_number, CellAddress, ErrorCode, GridSnapshot, ResolvedValue};
use std::fmt;

/// Result of evaluating a formula
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaValue {
    /// Numeric result
    Number(f64),
    /// String result, shown verbatim
    Text(String),
    /// Blank result
    Empty,
    /// Typed error value (`#N/A`, `#DIV/0!`, ...)
    Error(ErrorCode),
}

impl FormulaValue {
    /// String shown in the cell
    pub fn to_display(&self) -> String {
        match self {
            FormulaValue::Number(n) if !n.is_finite() => ErrorCode::Error.as_str().to_string(),
            FormulaValue::Number(n) => format_number(*n),
            FormulaValue::Text(s) => s.clone(),
            FormulaValue::Empty => String::new(),
            FormulaValue::Error(e) => e.as_str().to_string(),
        }
    }

    /// Check if this is an error value
    pub fn is_error(&self) -> bool {
        matches!(self, FormulaValue::Error(_))
    }
}

impl From<ResolvedValue> for FormulaValue {
    fn from(value: ResolvedValue) -> Self {
        match value {
            ResolvedValue::Number(n) => FormulaValue::Number(n),
            ResolvedValue::Text(s) => FormulaValue::Text(s),
            ResolvedValue::Empty => FormulaValue::Empty,
        }
    }
}

impl fmt::Display for FormulaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display())
    }
}

/// Engine limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Maximum nesting of formula evaluations (referenced cells and nested calls)
    pub max_depth: usize,
    /// Maximum number of cells a single range may materialize
    pub max_range_cells: u64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_depth: 256,
            max_range_cells: 1_000_000,
        }
    }
}

impl EngineOptions {
    /// Options sized to a grid
    ///
    /// Each formula can add one nesting level per function call it contains
    /// (one if it has none), so the depth limit is one more than the sum of
    /// those levels, clamped to `16..=512`.
    pub fn for_grid(grid: &dyn GridSnapshot) -> Self {
        let levels: usize = grid
            .formula_addresses()
            .into_iter()
            .filter_map(|addr| grid.raw_value(addr))
            .map(|formula| count_calls(formula).max(1))
            .sum();
        Self {
            max_depth: (levels + 1).clamp(16, 512),
            ..Self::default()
        }
    }
}

/// Output of evaluating one cell's text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellOutput {
    /// The raw text, unchanged
    pub value: String,
    /// Computed display string
    pub display_value: String,
}

/// State of one top-level evaluation
///
/// Holds the cells currently being evaluated (for cycle detection), the
/// current nesting depth, and the values of referenced cells already
/// resolved. A fresh context per top-level cell keeps evaluations
/// independent of each other.
pub struct EvaluationContext<'a> {
    grid: &'a dyn GridSnapshot,
    options: EngineOptions,
    in_progress: AHashSet<CellAddress>,
    resolved: AHashMap<CellAddress, ResolvedValue>,
    depth: usize,
}

impl<'a> EvaluationContext<'a> {
    /// Create a context with default options
    pub fn new(grid: &'a dyn GridSnapshot) -> Self {
        Self::with_options(grid, EngineOptions::default())
    }

    /// Create a context with explicit options
    pub fn with_options(grid: &'a dyn GridSnapshot, options: EngineOptions) -> Self {
        Self {
            grid,
            options,
            in_progress: AHashSet::new(),
            resolved: AHashMap::new(),
            depth: 0,
        }
    }

    /// The grid being read
    pub fn grid(&self) -> &'a dyn GridSnapshot {
        self.grid
    }

    /// Engine limits in effect
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Evaluate raw cell text; literals evaluate to themselves
    pub fn evaluate(&mut self, text: &str) -> FormulaResult<FormulaValue> {
        match text.strip_prefix('=') {
            Some(expr) => self.evaluate_expression(expr),
            None if text.is_empty() => Ok(FormulaValue::Empty),
            None => Ok(FormulaValue::Text(text.to_string())),
        }
    }

    /// Evaluate a formula body (the text after `=`)
    pub fn evaluate_expression(&mut self, expr: &str) -> FormulaResult<FormulaValue> {
        if self.depth >= self.options.max_depth {
            log::warn!(
                "formula nesting exceeded {} levels, aborting",
                self.options.max_depth
            );
            return Err(FormulaError::RecursionLimit(self.options.max_depth));
        }

        self.depth += 1;
        let result = self.dispatch(expr.trim());
        self.depth -= 1;
        result
    }

    fn dispatch(&mut self, expr: &str) -> FormulaResult<FormulaValue> {
        if let Some((name, args)) = split_function_call(expr) {
            let func = get_function(name).ok_or_else(|| {
                log::debug!("unknown function {}", name);
                FormulaError::UnknownFunction(name.to_uppercase())
            })?;
            let args = split_arguments(args)?;
            func.check_arg_count(args.len())?;
            return (func.implementation)(&args, self);
        }

        match expression::evaluate_arithmetic(expr, self) {
            Ok(n) => Ok(FormulaValue::Number(n)),
            Err(FormulaError::DivisionByZero) => Ok(FormulaValue::Error(ErrorCode::DivZero)),
            Err(e) => Err(e),
        }
    }

    /// Resolve the value of a referenced cell
    ///
    /// Literals are coerced; formulas are evaluated recursively and their
    /// display string coerced, so a referenced error shows up as text.
    /// Fatal errors (cycles, depth) propagate. A formula cell is evaluated
    /// at most once per context; later references reuse its value.
    pub fn resolve_cell(&mut self, addr: CellAddress) -> FormulaResult<ResolvedValue> {
        let grid = self.grid;
        let raw = grid.raw_value(addr).unwrap_or("");
        let Some(expr) = raw.strip_prefix('=') else {
            return Ok(ResolvedValue::coerce(raw));
        };
        if let Some(value) = self.resolved.get(&addr) {
            return Ok(value.clone());
        }

        if !self.in_progress.insert(addr) {
            log::warn!("circular reference through {}", addr);
            return Err(FormulaError::CircularReference(addr));
        }
        let result = self.evaluate_expression(expr);
        self.in_progress.remove(&addr);

        let value = ResolvedValue::coerce(&settle(result)?);
        self.resolved.insert(addr, value.clone());
        Ok(value)
    }

    /// Evaluate a nested formula body and coerce its display string
    pub fn resolve_expression(&mut self, expr: &str) -> FormulaResult<ResolvedValue> {
        let result = self.evaluate_expression(expr);
        Ok(ResolvedValue::coerce(&settle(result)?))
    }

    /// Evaluate the cell at `addr` as a top-level cell
    ///
    /// The cell is marked in progress for the duration, so a formula that
    /// reaches back to its own cell is reported as circular.
    pub fn evaluate_cell(&mut self, addr: CellAddress) -> CellOutput {
        let grid = self.grid;
        let raw = grid.raw_value(addr).unwrap_or("");
        self.in_progress.insert(addr);
        let result = self.evaluate(raw);
        self.in_progress.remove(&addr);
        output(raw, result)
    }
}

/// Display string of a finished evaluation, keeping fatal errors as errors
fn settle(result: FormulaResult<FormulaValue>) -> FormulaResult<String> {
    match result {
        Ok(value) => Ok(value.to_display()),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => Ok(e.code().as_str().to_string()),
    }
}

fn output(raw: &str, result: FormulaResult<FormulaValue>) -> CellOutput {
    let display_value = match result {
        Ok(value) => value.to_display(),
        Err(e) => {
            log::debug!("'{}' evaluated to {}: {}", raw, e.code(), e);
            e.code().as_str().to_string()
        }
    };
    CellOutput {
        value: raw.to_string(),
        display_value,
    }
}

/// Evaluate one cell's text against a grid with default options
///
/// Literals display as themselves. The text is not attributed to any cell,
/// so use [`evaluate_cell`] when evaluating a stored cell.
pub fn evaluate_formula(text: &str, grid: &dyn GridSnapshot) -> CellOutput {
    evaluate_formula_with_options(text, grid, EngineOptions::default())
}

/// Evaluate one cell's text against a grid
pub fn evaluate_formula_with_options(
    text: &str,
    grid: &dyn GridSnapshot,
    options: EngineOptions,
) -> CellOutput {
    let mut ctx = EvaluationContext::with_options(grid, options);
    let result = ctx.evaluate(text);
    output(text, result)
}

/// Evaluate the stored cell at `addr`
pub fn evaluate_cell(addr: CellAddress, grid: &dyn GridSnapshot, options: EngineOptions) -> CellOutput {
    EvaluationContext::with_options(grid, options).evaluate_cell(addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sheetcalc_core::Grid;

    fn eval(grid: &Grid, formula: &str) -> String {
        evaluate_formula(formula, grid).display_value
    }

    fn eval_cell(grid: &Grid, label: &str) -> String {
        let addr = CellAddress::parse_label(label).unwrap();
        evaluate_cell(addr, grid, EngineOptions::default()).display_value
    }

    #[test]
    fn test_literals_display_verbatim() {
        let grid = Grid::new();
        assert_eq!(eval(&grid, "hello"), "hello");
        assert_eq!(eval(&grid, "007"), "007");
        assert_eq!(eval(&grid, ""), "");
        let out = evaluate_formula("=1+1", &grid);
        assert_eq!(out.value, "=1+1");
        assert_eq!(out.display_value, "2");
    }

    #[test]
    fn test_arithmetic() {
        let grid = Grid::from_rows([vec!["10", "4"]]);
        assert_eq!(eval(&grid, "=A1+B1*2"), "18");
        assert_eq!(eval(&grid, "=A1/B1"), "2.5");
        assert_eq!(eval(&grid, "=A1-A1"), "0");
        assert_eq!(eval(&grid, "=C1+1"), "1");
        assert_eq!(eval(&grid, "=0.1+0.2"), "0.30000000000000004");
    }

    #[test]
    fn test_arithmetic_errors() {
        let grid = Grid::from_rows([vec!["10", "word"]]);
        assert_eq!(eval(&grid, "=A1/0"), "#DIV/0!");
        assert_eq!(eval(&grid, "=B1+1"), "#NAME?");
        assert_eq!(eval(&grid, "=hello"), "#NAME?");
        assert_eq!(eval(&grid, "=1+"), "#ERROR!");
        assert_eq!(eval(&grid, "=A1)"), "#ERROR!");
    }

    #[test]
    fn test_unknown_function() {
        let grid = Grid::new();
        assert_eq!(eval(&grid, "=FOO(1)"), "#NAME?");
        assert_eq!(eval(&grid, "=SUM(1"), "#NAME?");
    }

    #[test]
    fn test_function_names_case_insensitive() {
        let grid = Grid::from_rows([vec!["1", "2"]]);
        assert_eq!(eval(&grid, "=sum(A1:B1)"), "3");
        assert_eq!(eval(&grid, "=Sum(a1:b1)"), "3");
    }

    #[test]
    fn test_reference_chain() {
        let grid = Grid::from_rows([vec!["2", "=A1*3", "=B1+1"]]);
        assert_eq!(eval_cell(&grid, "C1"), "7");
    }

    #[test]
    fn test_referenced_error_is_text() {
        let grid = Grid::from_rows([vec!["=1/0", "=LEN(A1)", "=A1+1"]]);
        assert_eq!(eval_cell(&grid, "A1"), "#DIV/0!");
        assert_eq!(eval_cell(&grid, "B1"), "7");
        assert_eq!(eval_cell(&grid, "C1"), "#NAME?");
    }

    #[test]
    fn test_circular_pair() {
        let grid = Grid::from_rows([vec!["=B1", "=A1"]]);
        assert_eq!(eval_cell(&grid, "A1"), "#CIRC!");
        assert_eq!(eval_cell(&grid, "B1"), "#CIRC!");
    }

    #[test]
    fn test_self_reference() {
        let grid = Grid::from_rows([vec!["=A1+1"]]);
        assert_eq!(eval_cell(&grid, "A1"), "#CIRC!");
        let grid = Grid::from_rows([vec!["=SUM(A1:B1)", "3"]]);
        assert_eq!(eval_cell(&grid, "A1"), "#CIRC!");
    }

    #[test]
    fn test_cycle_through_function_arguments() {
        let grid = Grid::from_rows([vec!["=LEN(B1)", "=CONCAT(C1, \"x\")", "=A1"]]);
        assert_eq!(eval_cell(&grid, "A1"), "#CIRC!");
        assert_eq!(eval_cell(&grid, "C1"), "#CIRC!");
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let grid = Grid::from_rows([vec!["1", "=A1+1", "=A1+2", "=B1+C1"]]);
        assert_eq!(eval_cell(&grid, "D1"), "5");
    }

    #[test]
    fn test_depth_limit() {
        let mut grid = Grid::new();
        grid.set(CellAddress::new(0, 0), "1");
        for row in 1..40 {
            grid.set(CellAddress::new(row, 0), format!("=A{}+1", row));
        }
        let addr = CellAddress::parse_label("A40").unwrap();

        let deep = EngineOptions {
            max_depth: 64,
            ..EngineOptions::default()
        };
        assert_eq!(evaluate_cell(addr, &grid, deep).display_value, "40");

        let shallow = EngineOptions {
            max_depth: 10,
            ..EngineOptions::default()
        };
        assert_eq!(evaluate_cell(addr, &grid, shallow).display_value, "#ERROR!");
    }

    #[test]
    fn test_options_for_grid() {
        let grid = Grid::from_rows([vec!["=1", "=2"]]);
        assert_eq!(EngineOptions::for_grid(&grid).max_depth, 16);

        let mut big = Grid::new();
        for row in 0..1000 {
            big.set(CellAddress::new(row, 0), "=1");
        }
        assert_eq!(EngineOptions::for_grid(&big).max_depth, 512);
    }

    #[test]
    fn test_non_finite_result() {
        let grid = Grid::from_rows([vec!["1e308", "1e308"]]);
        assert_eq!(eval(&grid, "=SUM(A1:B1)"), "#ERROR!");
    }

    #[test]
    fn test_depth_covers_nested_calls() {
        let mut grid = Grid::new();
        grid.set(CellAddress::new(0, 0), "1");
        for row in 1..20 {
            grid.set(CellAddress::new(row, 0), format!("=ROUND(ROUND(A{}, 0), 0)", row));
        }
        let options = EngineOptions::for_grid(&grid);
        assert_eq!(options.max_depth, 39);

        let addr = CellAddress::parse_label("A20").unwrap();
        assert_eq!(evaluate_cell(addr, &grid, options).display_value, "1");
    }

    #[test]
    fn test_shared_precedents_evaluated_once() {
        let mut grid = Grid::new();
        grid.set(CellAddress::new(0, 0), "1");
        for row in 1..40 {
            grid.set(CellAddress::new(row, 0), format!("=A{}+A{}", row, row));
        }
        assert_eq!(eval_cell(&grid, "A40"), "549755813888");
    }

    #[test]
    fn test_deep_parentheses() {
        let grid = Grid::new();
        let formula = format!("={}1{}", "(".repeat(200_000), ")".repeat(200_000));
        assert_eq!(eval(&grid, &formula), "#ERROR!");
    }
}
