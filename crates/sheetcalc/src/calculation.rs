//! Grid recalculation
//!
//! A pass evaluates formulas against the grid as it stands, collects every
//! result, and only then writes display values back. No evaluation ever
//! reads a display value, so the order cells are visited in cannot change
//! the outcome and a second pass over an unchanged grid is a no-op.
//!
//! # Example
//!
//! ```rust
//! use sheetcalc::prelude::*;
//!
//! let mut grid = Grid::new();
//! grid.set_label("A1", "10").unwrap();
//! grid.set_label("A2", "20").unwrap();
//! grid.set_label("A3", "=A1+A2").unwrap();
//!
//! let stats = grid.recalculate();
//! assert_eq!(stats.cells_calculated, 1);
//! assert_eq!(grid.display_value(CellAddress::new(2, 0)), Some("30"));
//! ```

use crate::{CellAddress, CellOutput, DependencyGraph, EngineOptions, ErrorCode, Grid, GridSnapshot};
use sheetcalc_formula::evaluate_cell;

/// Statistics from a recalculation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalculationStats {
    /// Total number of formula cells in the grid
    pub formula_count: usize,
    /// Number of formula cells evaluated in this pass
    pub cells_calculated: usize,
    /// Number of evaluated cells that display an error value
    pub errors: usize,
    /// Number of evaluated cells that display `#CIRC!`
    pub circular_references: usize,
}

impl CalculationStats {
    fn record(&mut self, output: &CellOutput) {
        self.cells_calculated += 1;
        if let Some(code) = ErrorCode::from_display(&output.display_value) {
            self.errors += 1;
            if code == ErrorCode::Circular {
                self.circular_references += 1;
            }
        }
    }
}

/// Evaluate every formula cell of a snapshot, row-major
///
/// For hosts that keep their own storage: the snapshot is only read, and
/// each formula cell's `(value, display_value)` pair is returned.
pub fn recalculate_snapshot(
    grid: &dyn GridSnapshot,
    options: &EngineOptions,
) -> Vec<(CellAddress, CellOutput)> {
    grid.formula_addresses()
        .into_iter()
        .map(|addr| (addr, evaluate_cell(addr, grid, *options)))
        .collect()
}

/// Extension trait for Grid to add recalculation methods
pub trait GridCalculationExt {
    /// Recalculate every formula cell, with a depth limit sized to the grid
    fn recalculate(&mut self) -> CalculationStats;

    /// Recalculate every formula cell with explicit options
    fn recalculate_with_options(&mut self, options: &EngineOptions) -> CalculationStats;

    /// Recalculate only the changed cells and their transitive dependents
    ///
    /// Produces the same display values for those cells as a full pass.
    fn recalculate_from(&mut self, changed: &[CellAddress]) -> CalculationStats;

    /// Set a cell's raw value and update everything that depends on it
    fn set_and_recalculate(&mut self, addr: CellAddress, value: &str) -> CalculationStats;
}

impl GridCalculationExt for Grid {
    fn recalculate(&mut self) -> CalculationStats {
        let options = EngineOptions::for_grid(self);
        self.recalculate_with_options(&options)
    }

    fn recalculate_with_options(&mut self, options: &EngineOptions) -> CalculationStats {
        let outputs = recalculate_snapshot(self, options);
        let literals: Vec<(CellAddress, String)> = self
            .cells()
            .filter(|(_, cell)| !cell.is_formula())
            .map(|(addr, cell)| (addr, cell.value.clone()))
            .collect();

        let mut stats = CalculationStats {
            formula_count: outputs.len(),
            ..CalculationStats::default()
        };
        for (addr, output) in outputs {
            stats.record(&output);
            self.set_display_value(addr, Some(output.display_value));
        }
        for (addr, value) in literals {
            self.set_display_value(addr, Some(value));
        }

        log::debug!(
            "recalculated {} formula cells ({} errors, {} circular)",
            stats.cells_calculated,
            stats.errors,
            stats.circular_references
        );
        stats
    }

    fn recalculate_from(&mut self, changed: &[CellAddress]) -> CalculationStats {
        let graph = DependencyGraph::from_snapshot(self);
        for &addr in changed {
            if graph.has_circular_reference(addr) {
                log::warn!("{} is part of a reference cycle", addr);
            }
        }

        let options = EngineOptions::for_grid(self);
        let mut stats = CalculationStats {
            formula_count: self.formula_cells().count(),
            ..CalculationStats::default()
        };

        let mut updates = Vec::new();
        for addr in graph.get_recalc_order(changed) {
            let Some(cell) = self.get(addr) else {
                continue;
            };
            if cell.is_formula() {
                let output = evaluate_cell(addr, self, options);
                stats.record(&output);
                updates.push((addr, output.display_value));
            } else {
                updates.push((addr, cell.value.clone()));
            }
        }
        for (addr, display) in updates {
            self.set_display_value(addr, Some(display));
        }

        log::debug!(
            "recalculated {} of {} formula cells from {} changed",
            stats.cells_calculated,
            stats.formula_count,
            changed.len()
        );
        stats
    }

    fn set_and_recalculate(&mut self, addr: CellAddress, value: &str) -> CalculationStats {
        self.set(addr, value);
        self.recalculate_from(&[addr])
    }
}
