//! Prelude module - common imports for sheetcalc users
//!
//! ```rust
//! use sheetcalc::prelude::*;
//! ```

pub use crate::{
    // Calculation types
    CalculationStats,
    // Cell types
    Cell,
    CellAddress,
    CellOutput,
    CellRange,
    EngineOptions,
    // Error types
    Error,
    ErrorCode,
    // Main types
    Grid,
    // Extension traits
    GridCalculationExt,
    GridSnapshot,
    Result,
};
