//! Sparse grid storage and the read-only snapshot view
//!
//! Only non-empty cells are stored, using a row-based BTreeMap structure so
//! iteration is row-major.

use crate::cell::{Cell, CellAddress, CellRange};
use crate::error::Result;
use ahash::AHashSet;
use std::collections::{BTreeMap, VecDeque};

/// Read-only view of a grid, as consumed by the formula engine
///
/// Hosts with their own storage implement this; the engine never mutates
/// what it reads through it.
pub trait GridSnapshot {
    /// Raw text of the cell at `addr`, or `None` if the cell is absent
    fn raw_value(&self, addr: CellAddress) -> Option<&str>;

    /// Addresses of every cell whose raw text starts with `=`, row-major
    fn formula_addresses(&self) -> Vec<CellAddress>;
}

/// Sparse row-based storage for cells
///
/// Structure: `BTreeMap<row_index, BTreeMap<col_index, Cell>>`
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Grid {
    rows: BTreeMap<u32, BTreeMap<u16, Cell>>,
}

impl Grid {
    /// Create an empty grid
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a grid from row-major raw values anchored at A1
    ///
    /// Empty strings leave the cell absent.
    pub fn from_rows<R, S>(rows: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut grid = Self::new();
        for (r, row) in rows.into_iter().enumerate() {
            for (c, value) in row.into_iter().enumerate() {
                grid.set(CellAddress::new(r as u32, c as u16), value);
            }
        }
        grid
    }

    /// Set the raw value of a cell, clearing its display value
    ///
    /// Setting an empty string removes the cell.
    pub fn set<S: Into<String>>(&mut self, addr: CellAddress, value: S) {
        let value = value.into();
        if value.is_empty() {
            self.remove(addr);
            return;
        }
        self.rows
            .entry(addr.row)
            .or_default()
            .insert(addr.col, Cell::new(value));
    }

    /// Set the raw value of a cell by A1 label
    pub fn set_label<S: Into<String>>(&mut self, label: &str, value: S) -> Result<()> {
        let addr = CellAddress::parse(label)?;
        self.set(addr, value);
        Ok(())
    }

    /// Get a cell
    pub fn get(&self, addr: CellAddress) -> Option<&Cell> {
        self.rows.get(&addr.row)?.get(&addr.col)
    }

    /// Get a cell mutably
    pub fn get_mut(&mut self, addr: CellAddress) -> Option<&mut Cell> {
        self.rows.get_mut(&addr.row)?.get_mut(&addr.col)
    }

    /// Remove a cell, returning it if it existed
    pub fn remove(&mut self, addr: CellAddress) -> Option<Cell> {
        let row = self.rows.get_mut(&addr.row)?;
        let cell = row.remove(&addr.col);
        if row.is_empty() {
            self.rows.remove(&addr.row);
        }
        cell
    }

    /// Store a computed display value; ignored for absent cells
    pub fn set_display_value(&mut self, addr: CellAddress, display: Option<String>) {
        if let Some(cell) = self.get_mut(addr) {
            cell.display_value = display;
        }
    }

    /// Display value of a cell (cached value, else raw value)
    pub fn display_value(&self, addr: CellAddress) -> Option<&str> {
        self.get(addr).map(Cell::display)
    }

    /// Iterate over all stored cells, row-major
    pub fn cells(&self) -> impl Iterator<Item = (CellAddress, &Cell)> + '_ {
        self.rows.iter().flat_map(|(&row, cols)| {
            cols.iter()
                .map(move |(&col, cell)| (CellAddress::new(row, col), cell))
        })
    }

    /// Iterate over formula cells, row-major
    pub fn formula_cells(&self) -> impl Iterator<Item = (CellAddress, &Cell)> + '_ {
        self.cells().filter(|(_, cell)| cell.is_formula())
    }

    /// Number of stored cells
    pub fn len(&self) -> usize {
        self.rows.values().map(BTreeMap::len).sum()
    }

    /// Check if no cells are stored
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Smallest range covering every stored cell
    pub fn used_range(&self) -> Option<CellRange> {
        self.cells()
            .map(|(addr, _)| CellRange::single(addr))
            .reduce(|acc, r| acc.union(&r))
    }

    /// Bounding range of the 4-connected block of non-empty cells containing `addr`
    ///
    /// Returns `None` if `addr` itself is empty.
    pub fn contiguous_range(&self, addr: CellAddress) -> Option<CellRange> {
        self.get(addr).filter(|c| !c.is_empty())?;

        let mut bounds = CellRange::single(addr);
        let mut visited = AHashSet::new();
        let mut queue = VecDeque::new();
        visited.insert(addr);
        queue.push_back(addr);

        while let Some(current) = queue.pop_front() {
            bounds = bounds.union(&CellRange::single(current));

            for next in neighbors(current) {
                let occupied = self.get(next).map_or(false, |c| !c.is_empty());
                if occupied && visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        Some(bounds)
    }
}

fn neighbors(addr: CellAddress) -> impl Iterator<Item = CellAddress> {
    let up = addr.row.checked_sub(1).map(|r| CellAddress::new(r, addr.col));
    let down = addr.row.checked_add(1).map(|r| CellAddress::new(r, addr.col));
    let left = addr.col.checked_sub(1).map(|c| CellAddress::new(addr.row, c));
    let right = addr.col.checked_add(1).map(|c| CellAddress::new(addr.row, c));
    [up, down, left, right].into_iter().flatten()
}

impl GridSnapshot for Grid {
    fn raw_value(&self, addr: CellAddress) -> Option<&str> {
        self.get(addr).map(|c| c.value.as_str())
    }

    fn formula_addresses(&self) -> Vec<CellAddress> {
        self.formula_cells().map(|(addr, _)| addr).collect()
    }
}
