//! Per-cell mine probabilities for one turn.
//!
//! Every connected component of the board model is searched on its own with a
//! counting sink, so the work is the sum of the component searches rather than
//! their product.

use std::collections::HashMap;

use rand::RngCore;
use tracing::debug;

use crate::board::Point;
use crate::csp::{SearchOptions, SolutionSink, connected_components, search};
use crate::error::SolveError;
use crate::model::BoardModel;

/// What the solutions of a cell's component say about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeducedState {
    ForcedMine,
    ForcedSafe,
    Undetermined,
}

/// Deduction for one constrained cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellOdds {
    pub cell: Point,
    /// Fraction of its component's solutions with a mine here.
    pub mine_probability: f64,
    pub state: DeducedState,
}

#[derive(Debug, Clone, Default)]
pub struct BoardAnalysis {
    /// One entry per model variable, in model order.
    pub cells: Vec<CellOdds>,
    index: HashMap<Point, usize>,
    pub components: usize,
    /// Search nodes summed over components.
    pub nodes: u64,
}

impl BoardAnalysis {
    pub fn odds(&self, cell: Point) -> Option<&CellOdds> {
        self.index.get(&cell).map(|&i| &self.cells[i])
    }

    pub fn forced_safe(&self) -> impl Iterator<Item = Point> + '_ {
        self.with_state(DeducedState::ForcedSafe)
    }

    pub fn forced_mine(&self) -> impl Iterator<Item = Point> + '_ {
        self.with_state(DeducedState::ForcedMine)
    }

    pub fn has_forced(&self) -> bool {
        self.cells
            .iter()
            .any(|o| o.state != DeducedState::Undetermined)
    }

    /// Expected number of mines among the constrained cells.
    pub fn expected_mines(&self) -> f64 {
        self.cells.iter().map(|o| o.mine_probability).sum()
    }

    fn with_state(&self, state: DeducedState) -> impl Iterator<Item = Point> + '_ {
        self.cells
            .iter()
            .filter(move |o| o.state == state)
            .map(|o| o.cell)
    }
}

/// Counts the solutions of each component of `model` and derives each cell's
/// mine probability. A component without solutions means the visible board
/// is contradictory.
pub fn analyze(
    model: &BoardModel,
    options: &SearchOptions,
    rng: &mut dyn RngCore,
) -> Result<BoardAnalysis, SolveError> {
    let components = connected_components(&model.csp);
    let mut odds: Vec<Option<CellOdds>> = vec![None; model.cells.len()];
    let mut nodes = 0;

    for component in &components {
        let mut sub = model.csp.subproblem(component)?;
        let sink = SolutionSink::count(&sub);
        let report = search(&mut sub, options, sink, rng);
        nodes += report.nodes;

        let counts = report.sink.into_counts(component.variables.len());
        if counts.total == 0 {
            return Err(SolveError::Unsolvable {
                variables: component.variables.len(),
                constraints: component.constraints.len(),
            });
        }

        for (local, &var) in component.variables.iter().enumerate() {
            let mines = counts.value_sums[local];
            let state = if mines == 0 {
                DeducedState::ForcedSafe
            } else if mines == counts.total {
                DeducedState::ForcedMine
            } else {
                DeducedState::Undetermined
            };
            odds[var] = Some(CellOdds {
                cell: model.cells[var],
                mine_probability: mines as f64 / counts.total as f64,
                state,
            });
        }
    }

    let cells: Vec<CellOdds> = odds.into_iter().flatten().collect();
    let index = cells.iter().enumerate().map(|(i, o)| (o.cell, i)).collect();
    let analysis = BoardAnalysis {
        cells,
        index,
        components: components.len(),
        nodes,
    };
    debug!(
        components = analysis.components,
        cells = analysis.cells.len(),
        forced_safe = analysis.forced_safe().count(),
        forced_mine = analysis.forced_mine().count(),
        nodes,
        "analysed board"
    );
    Ok(analysis)
}
