//! Picking a cell to probe when nothing is forced.

use rand::RngCore;
use rand::seq::IndexedRandom;
use tracing::debug;

use crate::analysis::BoardAnalysis;
use crate::board::{Minefield, Point};
use crate::config::{GuessPolicy, SolverConfig};
use crate::model::BoardModel;

/// A chosen probe and the mine probability it was chosen at, when known.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Guess {
    pub cell: Point,
    pub mine_probability: Option<f64>,
}

/// Chooses a covered, unflagged cell according to `config.guess`. Returns
/// `None` only when no such cell is left.
pub fn choose_guess(
    board: &impl Minefield,
    model: &BoardModel,
    analysis: &BoardAnalysis,
    config: &SolverConfig,
    rng: &mut dyn RngCore,
) -> Option<Guess> {
    let covered = board.covered_cells();
    if covered.is_empty() {
        return None;
    }

    if config.guess == GuessPolicy::Random {
        let &cell = covered.choose(rng)?;
        return Some(Guess {
            cell,
            mine_probability: None,
        });
    }

    let unconstrained: Vec<Point> = covered
        .iter()
        .copied()
        .filter(|p| analysis.odds(*p).is_none())
        .collect();
    let estimate = unconstrained_estimate(board, analysis, unconstrained.len());

    let candidates: Vec<Point> = match config.guess {
        GuessPolicy::Useful => {
            let useful = useful_cells(model);
            if useful.is_empty() {
                model.cells.clone()
            } else {
                useful
            }
        }
        _ => model.cells.clone(),
    };
    // First minimum wins, so ties resolve in model order.
    let best = candidates
        .iter()
        .filter_map(|&p| analysis.odds(p))
        .min_by(|a, b| a.mine_probability.total_cmp(&b.mine_probability));

    let take_best = match (best, estimate) {
        (Some(_), None) => true,
        (None, _) => false,
        (Some(best), Some(estimate)) => {
            let margin = match config.guess {
                GuessPolicy::Balanced | GuessPolicy::Useful => config.balance,
                _ => 0.0,
            };
            best.mine_probability <= estimate + margin
        }
    };

    let guess = match best {
        Some(best) if take_best => Guess {
            cell: best.cell,
            mine_probability: Some(best.mine_probability),
        },
        _ => Guess {
            cell: pick_unconstrained(board, &unconstrained, rng)?,
            mine_probability: estimate,
        },
    };
    debug!(
        policy = %config.guess,
        row = guess.cell.row,
        col = guess.cell.col,
        p = ?guess.mine_probability,
        "guessing"
    );
    Some(guess)
}

/// Mine probability of a cell no revealed number touches: the mines not
/// expected on the frontier spread evenly over the remaining covered cells.
pub fn unconstrained_estimate(
    board: &impl Minefield,
    analysis: &BoardAnalysis,
    unconstrained: usize,
) -> Option<f64> {
    if unconstrained == 0 {
        return None;
    }
    let remaining = board.total_mines() as f64 - board.flag_count() as f64;
    let left = remaining - analysis.expected_mines();
    Some((left / unconstrained as f64).clamp(0.0, 1.0))
}

/// Cells of constraints that are one mine short of their scope size.
fn useful_cells(model: &BoardModel) -> Vec<Point> {
    let mut cells: Vec<Point> = Vec::new();
    for constraint in model.constraints.iter().filter(|c| c.is_high_information()) {
        for &cell in &constraint.cells {
            if !cells.contains(&cell) {
                cells.push(cell);
            }
        }
    }
    cells
}

/// Corners open the most cells on average, then edges.
fn pick_unconstrained(
    board: &impl Minefield,
    cells: &[Point],
    rng: &mut dyn RngCore,
) -> Option<Point> {
    let (rows, cols) = (board.rows(), board.cols());
    let sides = |p: &Point| {
        let top_or_bottom = p.row == 0 || p.row + 1 == rows;
        let left_or_right = p.col == 0 || p.col + 1 == cols;
        top_or_bottom as u8 + left_or_right as u8
    };
    let corners: Vec<Point> = cells.iter().copied().filter(|p| sides(p) == 2).collect();
    let edges: Vec<Point> = cells.iter().copied().filter(|p| sides(p) == 1).collect();
    [corners.as_slice(), edges.as_slice(), cells]
        .into_iter()
        .find(|tier| !tier.is_empty())?
        .choose(rng)
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use crate::board::Board;
    use crate::csp::SearchOptions;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn config(guess: GuessPolicy, balance: f64) -> SolverConfig {
        SolverConfig {
            guess,
            balance,
            ..SolverConfig::default()
        }
    }

    fn guess_on(board: &Board, config: &SolverConfig, seed: u64) -> Option<Guess> {
        let model = BoardModel::build(board).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);
        let analysis = analyze(&model, &SearchOptions::default(), &mut rng).unwrap();
        choose_guess(board, &model, &analysis, config, &mut rng)
    }

    /// 5x5 with mines at (0, 0) and (0, 1). Probing (1, 0) reveals a 2 over
    /// five covered cells and leaves the rest of the board untouched, so
    /// every unconstrained cell is known to be safe.
    fn two_over_five() -> Board {
        let mines = [Point::new(0, 0), Point::new(0, 1)];
        let mut board = Board::from_mines(5, 5, &mines).unwrap();
        board.probe(Point::new(1, 0));
        board
    }

    #[test]
    fn test_guess_is_always_covered() {
        let policies = [
            GuessPolicy::Random,
            GuessPolicy::Safest,
            GuessPolicy::Balanced,
            GuessPolicy::Useful,
        ];
        for policy in policies {
            for seed in 0..10 {
                let mut board = Board::with_seed(6, 6, 8, seed).unwrap();
                board.probe(Point::new(0, 0));
                if board.is_game_over() || board.check_win() {
                    continue;
                }
                let first = board.covered_cells()[0];
                board.toggle_flag(first);
                let model = BoardModel::build(&board).unwrap();
                let mut rng = StdRng::seed_from_u64(seed);
                let Ok(analysis) = analyze(&model, &SearchOptions::default(), &mut rng) else {
                    // The flag may have been placed on a safe cell.
                    continue;
                };
                let cfg = config(policy, 0.1);
                let guess = choose_guess(&board, &model, &analysis, &cfg, &mut rng).unwrap();
                assert!(board.is_covered(guess.cell), "{policy} picked {guess:?}");
            }
        }
    }

    #[test]
    fn test_no_covered_cells_means_no_guess() {
        let mut board = Board::from_mines(2, 2, &[Point::new(0, 0)]).unwrap();
        for p in [Point::new(0, 1), Point::new(1, 0), Point::new(1, 1)] {
            board.probe(p);
        }
        board.toggle_flag(Point::new(0, 0));
        assert!(board.covered_cells().is_empty());
        assert_eq!(guess_on(&board, &config(GuessPolicy::Safest, 0.0), 1), None);
    }

    #[test]
    fn test_unopened_board_prefers_corners() {
        let board = Board::with_seed(9, 9, 10, 5).unwrap();
        let corners = [
            Point::new(0, 0),
            Point::new(0, 8),
            Point::new(8, 0),
            Point::new(8, 8),
        ];
        for seed in 0..8 {
            let guess = guess_on(&board, &config(GuessPolicy::Safest, 0.0), seed).unwrap();
            assert!(corners.contains(&guess.cell));
            assert_eq!(guess.mine_probability, Some(10.0 / 81.0));
        }
    }

    #[test]
    fn test_safest_leaves_risky_frontier() {
        let board = two_over_five();
        let model = BoardModel::build(&board).unwrap();
        let guess = guess_on(&board, &config(GuessPolicy::Safest, 0.0), 3).unwrap();
        assert!(!model.variable_of.contains_key(&guess.cell));
        assert!(guess.mine_probability.unwrap() < 0.01);
        assert!(!board.is_mine(guess.cell));
    }

    #[test]
    fn test_balance_margin_keeps_frontier() {
        let board = two_over_five();
        let guess = guess_on(&board, &config(GuessPolicy::Balanced, 0.5), 3).unwrap();
        assert_eq!(guess.cell, Point::new(0, 0));
        assert_eq!(guess.mine_probability, Some(0.4));

        let guess = guess_on(&board, &config(GuessPolicy::Balanced, 0.3), 3).unwrap();
        assert_ne!(guess.cell, Point::new(0, 0));
        assert!(guess.mine_probability.unwrap() < 0.01);
    }

    #[test]
    fn test_full_balance_keeps_frontier() {
        // A margin of 1 never gives up a frontier cell.
        let mut board = Board::with_seed(9, 9, 10, 21).unwrap();
        board.probe(Point::new(4, 4));
        if board.is_game_over() || board.check_win() {
            return;
        }
        let model = BoardModel::build(&board).unwrap();
        if model.is_empty() {
            return;
        }
        let guess = guess_on(&board, &config(GuessPolicy::Balanced, 1.0), 2).unwrap();
        assert!(model.variable_of.contains_key(&guess.cell));
    }

    #[test]
    fn test_useful_restricts_to_high_information_cells() {
        // 1x4 strip: the revealed 1 at (0, 1) sees two covered cells, one
        // short of its scope, so both are useful.
        let mut board = Board::from_mines(1, 4, &[Point::new(0, 0)]).unwrap();
        board.probe(Point::new(0, 1));
        let model = BoardModel::build(&board).unwrap();
        assert!(model.constraints[0].is_high_information());

        let guess = guess_on(&board, &config(GuessPolicy::Useful, 1.0), 0).unwrap();
        assert!([Point::new(0, 0), Point::new(0, 2)].contains(&guess.cell));
        assert_eq!(guess.mine_probability, Some(0.5));
    }
}
