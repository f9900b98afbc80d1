//! # sheetcalc
//!
//! A spreadsheet formula engine.
//!
//! Cells hold raw text; formulas start with `=`. The engine turns each
//! formula into a display string by resolving A1 references and ranges on
//! demand, calling a fixed catalog of functions, and evaluating restricted
//! arithmetic. Errors are values (`#DIV/0!`, `#N/A`, `#CIRC!`, ...), never
//! panics.
//!
//! ## Features
//!
//! - A1 references and normalized ranges
//! - SUM, AVERAGE, COUNT, COUNTA, MAX, MIN, ROUND, SUMIF, COUNTIF, IF,
//!   VLOOKUP and text functions
//! - Cycle detection and a bounded recursion depth
//! - Full and dependency-driven partial recalculation
//!
//! ## Example
//!
//! ```rust
//! use sheetcalc::prelude::*;
//!
//! let mut grid = Grid::from_rows([
//!     vec!["Alice", "30"],
//!     vec!["Bob", "42"],
//! ]);
//! grid.set_label("C1", "=VLOOKUP(\"bob\", A1:B2, 2)").unwrap();
//! grid.set_label("C2", "=AVERAGE(B1:B2)").unwrap();
//! grid.recalculate();
//!
//! assert_eq!(grid.display_value(CellAddress::new(0, 2)), Some("42"));
//! assert_eq!(grid.display_value(CellAddress::new(1, 2)), Some("36"));
//! ```

pub mod calculation;
pub mod prelude;

// Re-export calculation types
pub use calculation::{recalculate_snapshot, CalculationStats, GridCalculationExt};

// Re-export core types
pub use sheetcalc_core::{
    cell::{format_number, parse_number},
    Cell, CellAddress, CellRange, Error, ErrorCode, Grid, GridSnapshot, ResolvedValue, Result,
    MAX_COLS, MAX_ROWS,
};

// Re-export formula types
pub use sheetcalc_formula::{
    evaluate_cell, evaluate_formula, evaluate_formula_with_options, extract_references,
    function_names, CellOutput, DependencyGraph, EngineOptions, FormulaError, FormulaResult,
    FormulaValue,
};
pub use sheetcalc_formula::functions::{registry, FunctionDef};
