//! The solve loop: deduce, act on forced cells, otherwise guess.

use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};

use crate::analysis::analyze;
use crate::board::{Minefield, Point, render};
use crate::config::SolverConfig;
use crate::error::ConfigError;
use crate::guess::{Guess, choose_guess};
use crate::model::BoardModel;
use crate::record::{GameLog, GameRecord, Outcome};

/// What one turn did to the board.
#[derive(Debug, Clone, PartialEq)]
pub enum Turn {
    /// Every forced cell was acted on: mines flagged, safe cells probed.
    Forced { safe: Vec<Point>, mines: Vec<Point> },
    Guessed(Guess),
    /// Nothing left to probe.
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameStats {
    pub won: bool,
    pub guesses: u32,
    pub turns: u32,
    pub elapsed: Duration,
}

impl GameStats {
    pub fn record(&self) -> GameRecord {
        GameRecord {
            outcome: Outcome::from_won(self.won),
            seconds: self.elapsed.as_secs_f64(),
            guesses: self.guesses,
        }
    }
}

/// Plays boards with a fixed configuration. Owns the RNG behind random
/// variable ordering and guess tie-breaks.
pub struct Solver {
    config: SolverConfig,
    rng: StdRng,
}

impl Solver {
    /// Rejects an invalid configuration before any board is touched.
    pub fn new(config: SolverConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Solver { config, rng })
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Plays `board` to the end starting with a probe at `first_probe`.
    pub fn play<M: Minefield>(
        &mut self,
        board: &mut M,
        first_probe: Point,
        mut log: Option<&mut GameLog>,
    ) -> anyhow::Result<GameStats> {
        anyhow::ensure!(
            board.contains(first_probe),
            "first probe {first_probe:?} is off the board"
        );
        let start = Instant::now();
        board.probe(first_probe);

        // Every turn flags or reveals at least one cell.
        let max_turns = board.rows() * board.cols();
        let mut guesses = 0;
        let mut turns = 0;
        let mut turn_start = Instant::now();
        let won = loop {
            if let Some(log) = log.as_deref_mut() {
                log.record_turn(&render(&*board), turn_start.elapsed());
            }
            turn_start = Instant::now();

            if board.is_game_over() {
                break false;
            }
            if board.check_win() {
                break true;
            }
            anyhow::ensure!(turns < max_turns, "no progress after {turns} turns");

            match self.turn(board)? {
                Turn::Forced { safe, mines } => {
                    debug!(
                        turn = turns,
                        safe = safe.len(),
                        mines = mines.len(),
                        "forced moves"
                    );
                }
                Turn::Guessed(guess) => {
                    guesses += 1;
                    debug!(
                        turn = turns,
                        row = guess.cell.row,
                        col = guess.cell.col,
                        "guessed"
                    );
                }
                Turn::Exhausted => break board.check_win(),
            }
            turns += 1;
        };

        let stats = GameStats {
            won,
            guesses,
            turns: u32::try_from(turns)?,
            elapsed: start.elapsed(),
        };
        info!(
            won,
            guesses,
            turns,
            seconds = stats.elapsed.as_secs_f64(),
            "game finished"
        );
        if let Some(log) = log {
            log.finish(&stats.record())?;
        }
        Ok(stats)
    }

    /// Runs one turn against a board still in play.
    pub fn turn<M: Minefield>(&mut self, board: &mut M) -> anyhow::Result<Turn> {
        let model = BoardModel::build(&*board)?;
        let analysis = analyze(&model, &self.config.search_options(), &mut self.rng)?;

        if analysis.has_forced() {
            let mines: Vec<Point> = analysis.forced_mine().collect();
            let safe: Vec<Point> = analysis.forced_safe().collect();
            for &cell in &mines {
                if !board.is_flagged(cell) {
                    board.toggle_flag(cell);
                }
            }
            for &cell in &safe {
                board.probe(cell);
            }
            return Ok(Turn::Forced { safe, mines });
        }

        match choose_guess(&*board, &model, &analysis, &self.config, &mut self.rng) {
            Some(guess) => {
                board.probe(guess.cell);
                Ok(Turn::Guessed(guess))
            }
            None => Ok(Turn::Exhausted),
        }
    }
}

/// Plays `board` to the end and reports whether it was won.
pub fn solve<M: Minefield>(
    board: &mut M,
    config: &SolverConfig,
    first_probe: Point,
) -> anyhow::Result<bool> {
    let mut solver = Solver::new(*config)?;
    Ok(solver.play(board, first_probe, None)?.won)
}
