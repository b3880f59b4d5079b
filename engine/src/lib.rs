//! A Minesweeper solver built on a small constraint engine.
//!
//! Each turn the visible board becomes a CSP over the covered cells next to
//! revealed numbers. The CSP is split into connected components, every
//! component's solutions are counted, and the counts give each cell's mine
//! probability. Forced cells are flagged or probed; otherwise a guess policy
//! picks the next probe.

pub mod analysis;
pub mod board;
pub mod config;
pub mod csp;
pub mod driver;
pub mod error;
pub mod guess;
pub mod model;
pub mod record;

pub use analysis::{BoardAnalysis, CellOdds, DeducedState, analyze};
pub use board::{Board, Cell, Difficulty, GameState, Minefield, Point, render};
pub use config::{GuessPolicy, SolverConfig};
pub use driver::{GameStats, Solver, Turn, solve};
pub use error::{ConfigError, CspError, SolveError};
pub use guess::{Guess, choose_guess};
pub use model::{BoardModel, CellConstraint};
pub use record::{GameLog, GameRecord, Outcome, Summary};
