//! Cell-related types and utilities
//!
//! This module contains:
//! - [`CellAddress`] - A cell's location (e.g., "A1")
//! - [`CellRange`] - A rectangle of cells (e.g., "A1:B10")
//! - [`Cell`] - Raw text plus cached display value
//! - [`ResolvedValue`] - A coerced value used by functions
//! - [`ErrorCode`] - Display error values

mod address;
mod value;

pub use address::{CellAddress, CellRange};
pub use value::{format_number, parse_number, Cell, ErrorCode, ResolvedValue};
