//! # sheetcalc-core
//!
//! Core data structures for the sheetcalc formula engine.
//!
//! This crate provides the fundamental types used throughout sheetcalc:
//! - [`CellAddress`] and [`CellRange`] - A1 references and normalized ranges
//! - [`Cell`] - Raw cell text plus its derived display value
//! - [`Grid`] and [`GridSnapshot`] - Sparse cell storage and the read-only view the engine consumes
//! - [`ResolvedValue`] - Coerced cell content (number, text, empty)
//! - [`ErrorCode`] - The `#`-prefixed error values shown in cells
//!
//! ## Example
//!
//! ```rust
//! use sheetcalc_core::{CellAddress, Grid, GridSnapshot};
//!
//! let mut grid = Grid::new();
//! grid.set_label("A1", "42").unwrap();
//! grid.set_label("B1", "=A1*2").unwrap();
//!
//! let addr = CellAddress::parse_label("b1").unwrap();
//! assert_eq!(addr.row, 0);
//! assert_eq!(addr.col, 1);
//! assert_eq!(grid.raw_value(addr), Some("=A1*2"));
//! ```
//!
//! Number coercion and display formatting are available at the crate root:
//!
//! ```rust
//! use sheetcalc_core::{format_number, parse_number};
//!
//! assert_eq!(parse_number(" 2.50 "), Some(2.5));
//! assert_eq!(format_number(-0.0), "0");
//! ```

pub mod cell;
pub mod error;
pub mod grid;

// Re-exports for convenience
pub use cell::{
    format_number, parse_number, Cell, CellAddress, CellRange, ErrorCode, ResolvedValue,
};
pub use error::{Error, Result};
pub use grid::{Grid, GridSnapshot};

/// Maximum number of rows addressable by a label
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns addressable by a label
pub const MAX_COLS: u16 = 16_384;
