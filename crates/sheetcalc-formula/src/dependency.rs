//! Dependency tracking for partial recalculation
//!
//! Evaluation itself never consults this graph; it only narrows which
//! cells a host needs to re-evaluate after an edit.

use crate::tokenizer::unquoted_segments;
use ahash::{AHashMap, AHashSet};
use lazy_regex::{lazy_regex, Lazy};
use regex::Regex;
use sheetcalc_core::{CellAddress, CellRange, GridSnapshot};

/// A label, or two labels joined by `:` with optional spaces around it,
/// matching what `CellRange::parse` accepts
static REFERENCE: Lazy<Regex> =
    lazy_regex!(r"\b([A-Za-z]+[0-9]+)(?:\s*:\s*([A-Za-z]+[0-9]+))?\b");

/// A reference named in formula text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    Cell(CellAddress),
    Range(CellRange),
}

/// Every cell and range a formula names, in order of appearance
///
/// Labels inside string literals are ignored. Literals (text without a
/// leading `=`) name nothing.
pub fn extract_references(formula: &str) -> Vec<Reference> {
    let Some(body) = formula.strip_prefix('=') else {
        return Vec::new();
    };

    let mut refs = Vec::new();
    for (_, segment) in unquoted_segments(body) {
        for caps in REFERENCE.captures_iter(segment) {
            let Ok(start) = CellAddress::parse(&caps[1]) else {
                continue;
            };
            match caps.get(2).map(|m| CellAddress::parse(m.as_str())) {
                Some(Ok(end)) => refs.push(Reference::Range(start.to(end))),
                Some(Err(_)) => {}
                None => refs.push(Reference::Cell(start)),
            }
        }
    }
    refs
}

/// Dependency graph for formula cells
///
/// Single-cell references are stored as edges in both directions. Range
/// references are kept as ranges and matched by containment, so a formula
/// over `A1:A100000` costs one entry.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Cell → Cells that depend on it (dependents)
    dependents: AHashMap<CellAddress, AHashSet<CellAddress>>,
    /// Cell → Cells it depends on (precedents)
    precedents: AHashMap<CellAddress, AHashSet<CellAddress>>,
    /// Cell → Ranges it depends on
    range_precedents: AHashMap<CellAddress, Vec<CellRange>>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph for every formula cell of a grid
    pub fn from_snapshot(grid: &dyn GridSnapshot) -> Self {
        let mut graph = Self::new();
        for addr in grid.formula_addresses() {
            if let Some(formula) = grid.raw_value(addr) {
                graph.set_formula(addr, formula);
            }
        }
        graph
    }

    /// Replace the dependencies of `cell` with those named by `formula`
    pub fn set_formula(&mut self, cell: CellAddress, formula: &str) {
        self.clear_dependencies(cell);
        for reference in extract_references(formula) {
            match reference {
                Reference::Cell(precedent) => self.add_dependency(precedent, cell),
                Reference::Range(range) => self.add_range_dependency(range, cell),
            }
        }
    }

    /// Add a dependency: dependent depends on precedent
    pub fn add_dependency(&mut self, precedent: CellAddress, dependent: CellAddress) {
        self.dependents
            .entry(precedent)
            .or_default()
            .insert(dependent);
        self.precedents
            .entry(dependent)
            .or_default()
            .insert(precedent);
    }

    /// Add a dependency on every cell of a range
    pub fn add_range_dependency(&mut self, range: CellRange, dependent: CellAddress) {
        let ranges = self.range_precedents.entry(dependent).or_default();
        if !ranges.contains(&range) {
            ranges.push(range);
        }
    }

    /// Remove all dependencies of a cell
    pub fn clear_dependencies(&mut self, cell: CellAddress) {
        if let Some(precedents) = self.precedents.remove(&cell) {
            for precedent in precedents {
                if let Some(deps) = self.dependents.get_mut(&precedent) {
                    deps.remove(&cell);
                    if deps.is_empty() {
                        self.dependents.remove(&precedent);
                    }
                }
            }
        }
        self.range_precedents.remove(&cell);
    }

    /// Cells that directly depend on the given cell, sorted
    pub fn get_dependents(&self, cell: CellAddress) -> Vec<CellAddress> {
        let mut result: AHashSet<CellAddress> = self
            .dependents
            .get(&cell)
            .into_iter()
            .flat_map(|set| set.iter().copied())
            .collect();
        result.extend(
            self.range_precedents
                .iter()
                .filter(|(_, ranges)| ranges.iter().any(|r| r.contains(&cell)))
                .map(|(&dependent, _)| dependent),
        );

        let mut result: Vec<_> = result.into_iter().collect();
        result.sort();
        result
    }

    /// Single cells the given cell directly depends on, sorted
    pub fn get_precedents(&self, cell: CellAddress) -> Vec<CellAddress> {
        let mut result: Vec<_> = self
            .precedents
            .get(&cell)
            .into_iter()
            .flat_map(|set| set.iter().copied())
            .collect();
        result.sort();
        result
    }

    /// Ranges the given cell depends on
    pub fn get_range_precedents(&self, cell: CellAddress) -> &[CellRange] {
        self.range_precedents
            .get(&cell)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The changed cells and everything that transitively depends on them,
    /// precedents before dependents
    ///
    /// Cells on a cycle appear once, in no particular order relative to
    /// the rest of the cycle.
    pub fn get_recalc_order(&self, changed: &[CellAddress]) -> Vec<CellAddress> {
        let mut result = Vec::new();
        let mut visited = AHashSet::new();
        let mut in_stack = AHashSet::new();

        for &cell in changed {
            self.topological_sort(cell, &mut result, &mut visited, &mut in_stack);
        }

        result.reverse();
        result
    }

    /// Topological sort helper (DFS)
    fn topological_sort(
        &self,
        cell: CellAddress,
        result: &mut Vec<CellAddress>,
        visited: &mut AHashSet<CellAddress>,
        in_stack: &mut AHashSet<CellAddress>,
    ) {
        if visited.contains(&cell) || in_stack.contains(&cell) {
            return;
        }

        in_stack.insert(cell);
        for dependent in self.get_dependents(cell) {
            self.topological_sort(dependent, result, visited, in_stack);
        }
        in_stack.remove(&cell);

        visited.insert(cell);
        result.push(cell);
    }

    /// Check whether a cell depends, directly or transitively, on itself
    pub fn has_circular_reference(&self, cell: CellAddress) -> bool {
        let mut visited = AHashSet::new();
        let mut stack = self.get_dependents(cell);
        while let Some(current) = stack.pop() {
            if current == cell {
                return true;
            }
            if visited.insert(current) {
                stack.extend(self.get_dependents(current));
            }
        }
        false
    }

    /// Clear the entire graph
    pub fn clear(&mut self) {
        self.dependents.clear();
        self.precedents.clear();
        self.range_precedents.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sheetcalc_core::Grid;

    fn addr(label: &str) -> CellAddress {
        CellAddress::parse_label(label).unwrap()
    }

    fn range(text: &str) -> CellRange {
        CellRange::parse_range(text).unwrap()
    }

    #[test]
    fn test_extract_references() {
        assert_eq!(
            extract_references("=SUM(A1:B2) + C3*2"),
            vec![Reference::Range(range("A1:B2")), Reference::Cell(addr("C3"))]
        );
        assert_eq!(
            extract_references(r#"=IF(a1>0, "B2", d4)"#),
            vec![Reference::Cell(addr("A1")), Reference::Cell(addr("D4"))]
        );
        assert_eq!(extract_references("A1+B1"), vec![]);
        assert_eq!(extract_references("=1e5+2"), vec![]);
        assert_eq!(
            extract_references("=SUM(A1 : A3) + COUNT(b1:b4)"),
            vec![Reference::Range(range("A1:A3")), Reference::Range(range("B1:B4"))]
        );
    }

    #[test]
    fn test_add_dependency() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency(addr("A1"), addr("B1"));

        assert_eq!(graph.get_dependents(addr("A1")), vec![addr("B1")]);
        assert_eq!(graph.get_precedents(addr("B1")), vec![addr("A1")]);
    }

    #[test]
    fn test_range_dependents() {
        let mut graph = DependencyGraph::new();
        graph.set_formula(addr("C1"), "=SUM(A1:A100)");
        graph.set_formula(addr("C2"), "=A50*2");

        assert_eq!(graph.get_dependents(addr("A50")), vec![addr("C1"), addr("C2")]);
        assert_eq!(graph.get_dependents(addr("A101")), vec![]);
        assert_eq!(graph.get_range_precedents(addr("C1")), &[range("A1:A100")]);
    }

    #[test]
    fn test_set_formula_replaces_dependencies() {
        let mut graph = DependencyGraph::new();
        graph.set_formula(addr("B1"), "=A1+A2");
        graph.set_formula(addr("B1"), "=A3");

        assert_eq!(graph.get_dependents(addr("A1")), vec![]);
        assert_eq!(graph.get_precedents(addr("B1")), vec![addr("A3")]);
    }

    #[test]
    fn test_recalc_order() {
        let grid = Grid::from_rows([vec!["1", "=A1+1", "=B1*2", "=A1+C1"], vec!["=Z9"]]);
        let graph = DependencyGraph::from_snapshot(&grid);
        let order = graph.get_recalc_order(&[addr("A1")]);

        assert_eq!(order.len(), 4);
        assert_eq!(order[0], addr("A1"));
        let pos = |label: &str| order.iter().position(|&a| a == addr(label)).unwrap();
        assert!(pos("B1") < pos("C1"));
        assert!(pos("C1") < pos("D1"));
    }

    #[test]
    fn test_circular_reference() {
        let mut graph = DependencyGraph::new();
        graph.set_formula(addr("A1"), "=B1");
        graph.set_formula(addr("B1"), "=A1");
        graph.set_formula(addr("C1"), "=A1");

        assert!(graph.has_circular_reference(addr("A1")));
        assert!(graph.has_circular_reference(addr("B1")));
        assert!(!graph.has_circular_reference(addr("C1")));

        let order = graph.get_recalc_order(&[addr("A1")]);
        assert_eq!(order.len(), 3);
    }

    #[test]
    fn test_self_range_is_circular() {
        let mut graph = DependencyGraph::new();
        graph.set_formula(addr("A3"), "=SUM(A1:A3)");
        assert!(graph.has_circular_reference(addr("A3")));
    }
}
