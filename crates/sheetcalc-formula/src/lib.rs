//! # sheetcalc-formula
//!
//! Formula evaluator for sheetcalc.
//!
//! This crate provides:
//! - Formula evaluation against a read-only [`GridSnapshot`](sheetcalc_core::GridSnapshot)
//! - A restricted arithmetic / condition expression parser
//! - The built-in function catalog (SUM, VLOOKUP, SUMIF, ...)
//! - Dependency extraction for partial recalculation
//!
//! ## Example
//!
//! ```rust
//! use sheetcalc_core::Grid;
//! use sheetcalc_formula::evaluate_formula;
//!
//! let grid = Grid::from_rows([vec!["10"], vec!["x"], vec!["5"]]);
//! let out = evaluate_formula("=SUM(A1:A3)", &grid);
//! assert_eq!(out.value, "=SUM(A1:A3)");
//! assert_eq!(out.display_value, "15");
//! ```

pub mod argument;
pub mod dependency;
pub mod error;
pub mod evaluator;
pub mod expression;
pub mod functions;
pub mod range;
pub mod tokenizer;

pub use argument::{resolve_argument, Argument};
pub use dependency::{extract_references, DependencyGraph, Reference};
pub use error::{FormulaError, FormulaResult};
pub use evaluator::{
    evaluate_cell, evaluate_formula, evaluate_formula_with_options, CellOutput, EngineOptions,
    EvaluationContext, FormulaValue,
};
pub use functions::{function_names, get_function, FunctionDef, FunctionRegistry};
pub use range::{values_2d, values_in_range};
