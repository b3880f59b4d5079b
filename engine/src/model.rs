//! Translates the visible board into a constraint problem.

use std::collections::HashMap;

use crate::board::{Cell, Minefield, Point};
use crate::csp::{Csp, SumConstraint, VarId};
use crate::error::CspError;

/// A revealed number and the covered cells it counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellConstraint {
    /// The revealed cell the constraint comes from.
    pub origin: Point,
    pub cells: Vec<Point>,
    /// Revealed number minus flagged neighbours.
    pub target: i32,
}

impl CellConstraint {
    /// One mine short of covering every cell in scope. These carry the most
    /// information per probe.
    pub fn is_high_information(&self) -> bool {
        self.target == self.cells.len() as i32 - 1
    }
}

/// The CSP for one turn plus the mapping back to board cells.
#[derive(Debug)]
pub struct BoardModel {
    pub csp: Csp,
    /// Board cell of each variable, indexed by [`VarId`].
    pub cells: Vec<Point>,
    pub variable_of: HashMap<Point, VarId>,
    pub constraints: Vec<CellConstraint>,
}

impl BoardModel {
    /// Builds one `{0,1}` variable per covered, unflagged cell next to a
    /// revealed number, and one sum constraint per such number.
    pub fn build(board: &impl Minefield) -> Result<Self, CspError> {
        let mut constraints = Vec::new();
        for origin in board.points() {
            let Cell::Revealed(number) = board.cell(origin) else {
                continue;
            };
            let mut flagged = 0;
            let mut cells = Vec::new();
            for neighbor in board.neighbors(origin) {
                if board.is_flagged(neighbor) {
                    flagged += 1;
                } else if !board.is_revealed(neighbor) {
                    cells.push(neighbor);
                }
            }
            if !cells.is_empty() {
                constraints.push(CellConstraint {
                    origin,
                    cells,
                    target: i32::from(number) - flagged,
                });
            }
        }

        let mut csp = Csp::new("minesweeper");
        let mut cells = Vec::new();
        let mut variable_of = HashMap::new();
        for constraint in &constraints {
            for &cell in &constraint.cells {
                if !variable_of.contains_key(&cell) {
                    let var = csp.add_variable(cell.index(board.cols()).to_string(), [0, 1])?;
                    variable_of.insert(cell, var);
                    cells.push(cell);
                }
            }
        }
        for constraint in &constraints {
            let scope = constraint.cells.iter().map(|c| variable_of[c]).collect();
            let name = format!("cell_{}_{}", constraint.origin.row, constraint.origin.col);
            csp.add_constraint(Box::new(SumConstraint::new(name, scope, constraint.target)))?;
        }

        Ok(BoardModel {
            csp,
            cells,
            variable_of,
            constraints,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
