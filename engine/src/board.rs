use std::collections::{HashSet, VecDeque};

use itertools::Itertools;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;

/// A cell coordinate on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub row: usize,
    pub col: usize,
}

impl Point {
    pub fn new(row: usize, col: usize) -> Self {
        Point { row, col }
    }

    /// Row-major index, used as the CSP variable name.
    pub fn index(&self, cols: usize) -> usize {
        self.row * cols + self.col
    }
}

/// What a player can see of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Cell {
    Hidden,
    /// A revealed mine. Only seen once the game is lost.
    Mine,
    Revealed(u8), // The u8 is the number of adjacent mines.
}

/// Represents the current state of the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum GameState {
    Playing,
    Won,
    Lost,
}

/// Standard board presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Expert,
}

impl Difficulty {
    /// `(rows, cols, mines)`.
    pub fn dimensions(self) -> (usize, usize, usize) {
        match self {
            Difficulty::Beginner => (9, 9, 10),
            Difficulty::Intermediate => (16, 16, 40),
            Difficulty::Expert => (16, 30, 99),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Difficulty::Beginner => "easy",
            Difficulty::Intermediate => "interm",
            Difficulty::Expert => "expert",
        }
    }
}

/// The board operations the solver relies on.
pub trait Minefield {
    fn rows(&self) -> usize;
    fn cols(&self) -> usize;
    fn total_mines(&self) -> usize;

    fn contains(&self, at: Point) -> bool {
        at.row < self.rows() && at.col < self.cols()
    }

    /// Reveals `at` and returns every newly revealed cell. Does nothing for
    /// off-board, flagged or already revealed cells, or once the game is over.
    fn probe(&mut self, at: Point) -> HashSet<Point>;

    fn toggle_flag(&mut self, at: Point);

    fn cell(&self, at: Point) -> Cell;

    fn is_revealed(&self, at: Point) -> bool;

    fn is_flagged(&self, at: Point) -> bool;

    fn is_game_over(&self) -> bool;

    /// True iff every non-mine cell is revealed.
    fn check_win(&self) -> bool;

    fn neighbors(&self, at: Point) -> impl Iterator<Item = Point> {
        neighbors(self.rows(), self.cols(), at)
    }

    fn points(&self) -> impl Iterator<Item = Point> {
        let cols = self.cols();
        (0..self.rows())
            .cartesian_product(0..cols)
            .map(|(row, col)| Point { row, col })
    }

    /// Neither revealed nor flagged.
    fn is_covered(&self, at: Point) -> bool {
        !self.is_revealed(at) && !self.is_flagged(at)
    }

    fn covered_cells(&self) -> Vec<Point> {
        self.points().filter(|&p| self.is_covered(p)).collect()
    }

    fn flag_count(&self) -> usize {
        self.points().filter(|&p| self.is_flagged(p)).count()
    }
}

/// All in-bounds neighbours of `point`, handling edges and corners.
pub fn neighbors(rows: usize, cols: usize, point: Point) -> impl Iterator<Item = Point> {
    (-1isize..=1).flat_map(move |dr| {
        (-1isize..=1).filter_map(move |dc| {
            if dr == 0 && dc == 0 {
                return None;
            }
            let r = point.row.checked_add_signed(dr)?;
            let c = point.col.checked_add_signed(dc)?;
            (r < rows && c < cols).then_some(Point { row: r, col: c })
        })
    })
}

/// Text view of a board: remaining mine count, column header, one line per row.
pub fn render(board: &impl Minefield) -> String {
    let remaining = board.total_mines() as isize - board.flag_count() as isize;
    let mut lines = vec![format!("Mines remaining: {remaining}")];
    let header = (0..board.cols()).map(|c| format!("{c:>3}")).join("");
    lines.push(format!("    {header}"));
    lines.push(format!("    {}", "—".repeat(3 * (board.cols() + 1))));

    for row in 0..board.rows() {
        let cells = (0..board.cols())
            .map(|col| {
                let at = Point { row, col };
                match board.cell(at) {
                    Cell::Mine => "  X".to_string(),
                    Cell::Revealed(n) => format!("  {n}"),
                    Cell::Hidden if board.is_flagged(at) => "  ⚑".to_string(),
                    Cell::Hidden => "  ■".to_string(),
                }
            })
            .join("");
        lines.push(format!("{row:>2} |{cells}"));
    }
    lines.join("\n")
}

/// The simulated game. Mines are placed on the first probe, never under it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Board {
    rows: usize,
    cols: usize,
    total_mines: usize,
    /// Seeds mine placement.
    seed: u64,
    /// `None` until the first probe.
    mines: Option<Vec<Vec<bool>>>,
    /// The cell mines were placed around, kept so a replay opens the same way.
    first_probe: Option<Point>,
    numbers: Vec<Vec<u8>>,
    revealed: Vec<Vec<bool>>,
    flagged: Vec<Vec<bool>>,
    game_over: bool,
}

impl Board {
    pub fn new(rows: usize, cols: usize, total_mines: usize) -> anyhow::Result<Self> {
        Self::with_seed(rows, cols, total_mines, rand::random())
    }

    pub fn with_seed(
        rows: usize,
        cols: usize,
        total_mines: usize,
        seed: u64,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(rows > 0 && cols > 0, "board must have at least one cell");
        anyhow::ensure!(
            total_mines < rows * cols,
            "total mines must be less than the number of cells on the board"
        );
        Ok(Board {
            rows,
            cols,
            total_mines,
            seed,
            mines: None,
            first_probe: None,
            numbers: vec![vec![0; cols]; rows],
            revealed: vec![vec![false; cols]; rows],
            flagged: vec![vec![false; cols]; rows],
            game_over: false,
        })
    }

    pub fn for_difficulty(difficulty: Difficulty, seed: u64) -> anyhow::Result<Self> {
        let (rows, cols, mines) = difficulty.dimensions();
        Self::with_seed(rows, cols, mines, seed)
    }

    /// A board with a fixed mine layout.
    pub fn from_mines(rows: usize, cols: usize, mines: &[Point]) -> anyhow::Result<Self> {
        let unique: HashSet<Point> = mines.iter().copied().collect();
        let mut board = Self::with_seed(rows, cols, unique.len(), 0)?;
        let mut layout = vec![vec![false; cols]; rows];
        for p in unique {
            anyhow::ensure!(p.row < rows && p.col < cols, "mine {p:?} is off the board");
            layout[p.row][p.col] = true;
        }
        board.set_layout(layout);
        Ok(board)
    }

    /// Deserializes a board snapshot.
    pub fn deserialize(bts: &[u8]) -> anyhow::Result<Self> {
        Ok(bcs::from_bytes(bts)?)
    }

    /// Serializes the full board, mine layout included.
    pub fn serialize(&self) -> anyhow::Result<Vec<u8>> {
        Ok(bcs::to_bytes(self)?)
    }

    /// Clears revealed cells, flags and the game-over mark, keeping the layout.
    pub fn restart(&mut self) {
        self.revealed.iter_mut().flatten().for_each(|r| *r = false);
        self.flagged.iter_mut().flatten().for_each(|f| *f = false);
        self.game_over = false;
    }

    pub fn state(&self) -> GameState {
        if self.game_over {
            GameState::Lost
        } else if self.check_win() {
            GameState::Won
        } else {
            GameState::Playing
        }
    }

    pub fn is_mine(&self, at: Point) -> bool {
        self.contains(at) && self.mines.as_ref().is_some_and(|m| m[at.row][at.col])
    }

    /// The first probe of the game that placed the mines, if any.
    pub fn first_probe(&self) -> Option<Point> {
        self.first_probe
    }

    fn place_mines(&mut self, excluded: Point) {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let candidates: Vec<Point> = self.points().filter(|&p| p != excluded).collect();
        let mut layout = vec![vec![false; self.cols]; self.rows];
        for p in candidates.choose_multiple(&mut rng, self.total_mines) {
            layout[p.row][p.col] = true;
        }
        self.set_layout(layout);
        self.first_probe = Some(excluded);
    }

    fn set_layout(&mut self, layout: Vec<Vec<bool>>) {
        for row in 0..self.rows {
            for col in 0..self.cols {
                let at = Point { row, col };
                self.numbers[row][col] = neighbors(self.rows, self.cols, at)
                    .filter(|n| layout[n.row][n.col])
                    .count() as u8;
            }
        }
        self.mines = Some(layout);
    }

    /// Reveals the zero region around `start` and its numbered border.
    fn flood_fill_reveal(&mut self, start: Point) -> HashSet<Point> {
        let mut revealed = HashSet::new();
        let mut queue = VecDeque::from([start]);
        let mut visited = HashSet::from([start]);

        while let Some(point) = queue.pop_front() {
            if self.revealed[point.row][point.col] || self.flagged[point.row][point.col] {
                continue;
            }
            self.revealed[point.row][point.col] = true;
            revealed.insert(point);

            if self.numbers[point.row][point.col] == 0 {
                for neighbor in neighbors(self.rows, self.cols, point) {
                    if !self.revealed[neighbor.row][neighbor.col] && visited.insert(neighbor) {
                        queue.push_back(neighbor);
                    }
                }
            }
        }

        revealed
    }
}

impl Minefield for Board {
    fn rows(&self) -> usize {
        self.rows
    }

    fn cols(&self) -> usize {
        self.cols
    }

    fn total_mines(&self) -> usize {
        self.total_mines
    }

    fn probe(&mut self, at: Point) -> HashSet<Point> {
        if self.game_over || !self.contains(at) || self.is_flagged(at) || self.is_revealed(at) {
            return HashSet::new();
        }
        if self.mines.is_none() {
            self.place_mines(at);
        }

        if self.is_mine(at) {
            self.game_over = true;
            let mines: Vec<Point> = self.points().filter(|&p| self.is_mine(p)).collect();
            let mut newly = HashSet::new();
            for p in mines {
                if !self.revealed[p.row][p.col] {
                    self.revealed[p.row][p.col] = true;
                    newly.insert(p);
                }
            }
            newly
        } else if self.numbers[at.row][at.col] == 0 {
            self.flood_fill_reveal(at)
        } else {
            self.revealed[at.row][at.col] = true;
            HashSet::from([at])
        }
    }

    fn toggle_flag(&mut self, at: Point) {
        if self.contains(at) && !self.revealed[at.row][at.col] {
            self.flagged[at.row][at.col] = !self.flagged[at.row][at.col];
        }
    }

    fn cell(&self, at: Point) -> Cell {
        if !self.is_revealed(at) {
            Cell::Hidden
        } else if self.is_mine(at) {
            Cell::Mine
        } else {
            Cell::Revealed(self.numbers[at.row][at.col])
        }
    }

    fn is_revealed(&self, at: Point) -> bool {
        self.contains(at) && self.revealed[at.row][at.col]
    }

    fn is_flagged(&self, at: Point) -> bool {
        self.contains(at) && self.flagged[at.row][at.col]
    }

    fn is_game_over(&self) -> bool {
        self.game_over
    }

    fn check_win(&self) -> bool {
        let Some(mines) = &self.mines else {
            return false;
        };
        self.points()
            .all(|p| mines[p.row][p.col] || self.revealed[p.row][p.col])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_initialization() {
        let board = Board::new(5, 4, 3).unwrap();
        assert_eq!(board.rows(), 5);
        assert_eq!(board.cols(), 4);
        assert_eq!(board.total_mines(), 3);
        assert_eq!(board.state(), GameState::Playing);
        assert!(!board.check_win());

        // Verify all cells start as hidden
        for p in board.points() {
            assert_eq!(board.cell(p), Cell::Hidden);
        }
    }

    #[test]
    fn test_board_initialization_too_many_mines() {
        assert!(Board::new(3, 3, 9).is_err());
        assert!(Board::new(0, 3, 0).is_err());
    }

    #[test]
    fn test_first_probe_always_safe() {
        for seed in 0..20 {
            let mut board = Board::with_seed(4, 4, 15, seed).unwrap();
            let newly = board.probe(Point::new(2, 1));
            assert_eq!(newly, HashSet::from([Point::new(2, 1)]));
            assert_eq!(board.cell(Point::new(2, 1)), Cell::Revealed(8));
            // Every other cell is a mine, so the game is already won.
            assert_eq!(board.state(), GameState::Won);
        }
    }

    #[test]
    fn test_seed_fixes_layout() {
        let mut a = Board::with_seed(9, 9, 10, 42).unwrap();
        let mut b = Board::with_seed(9, 9, 10, 42).unwrap();
        a.probe(Point::new(0, 0));
        b.probe(Point::new(0, 0));
        assert_eq!(a, b);
    }

    #[test]
    fn test_get_neighbors() {
        let board = Board::new(3, 3, 1).unwrap();
        assert_eq!(board.neighbors(Point::new(0, 0)).count(), 3);
        assert_eq!(board.neighbors(Point::new(1, 1)).count(), 8);
        assert_eq!(board.neighbors(Point::new(0, 1)).count(), 5);
    }

    #[test]
    fn test_flood_fill_reveals_region() {
        // Single mine in the corner of a 4x4 board.
        let mut board = Board::from_mines(4, 4, &[Point::new(0, 0)]).unwrap();
        let newly = board.probe(Point::new(3, 3));
        assert_eq!(newly.len(), 15);
        assert_eq!(board.cell(Point::new(1, 1)), Cell::Revealed(1));
        assert_eq!(board.cell(Point::new(2, 2)), Cell::Revealed(0));
        assert_eq!(board.cell(Point::new(0, 0)), Cell::Hidden);
        assert!(board.check_win());
    }

    #[test]
    fn test_probe_is_noop_when_revealed_or_flagged() {
        let mut board = Board::from_mines(3, 3, &[Point::new(0, 0)]).unwrap();
        board.toggle_flag(Point::new(2, 2));
        assert!(board.probe(Point::new(2, 2)).is_empty());
        assert!(!board.is_revealed(Point::new(2, 2)));

        board.toggle_flag(Point::new(2, 2));
        assert!(!board.probe(Point::new(2, 2)).is_empty());
        assert!(board.probe(Point::new(2, 2)).is_empty());

        // Revealed cells cannot be flagged.
        board.toggle_flag(Point::new(2, 2));
        assert!(!board.is_flagged(Point::new(2, 2)));
    }

    #[test]
    fn test_off_board_points_are_ignored() {
        let mut board = Board::from_mines(3, 3, &[Point::new(0, 0)]).unwrap();
        for at in [Point::new(3, 0), Point::new(0, 3), Point::new(7, 7)] {
            assert!(!board.contains(at));
            assert!(board.probe(at).is_empty());
            board.toggle_flag(at);
            assert!(!board.is_flagged(at));
            assert!(!board.is_revealed(at));
            assert!(!board.is_mine(at));
            assert_eq!(board.cell(at), Cell::Hidden);
        }
        assert!(!board.is_game_over());
        assert_eq!(board.flag_count(), 0);
        assert!(board.points().all(|p| !board.is_revealed(p)));
    }

    #[test]
    fn test_hitting_mine() {
        let mines = [Point::new(0, 0), Point::new(2, 2)];
        let mut board = Board::from_mines(3, 3, &mines).unwrap();
        let newly = board.probe(Point::new(0, 0));
        assert_eq!(newly, HashSet::from(mines));
        assert!(board.is_game_over());
        assert_eq!(board.state(), GameState::Lost);
        assert_eq!(board.cell(Point::new(2, 2)), Cell::Mine);
        assert!(board.probe(Point::new(1, 1)).is_empty());
    }

    #[test]
    fn test_serialize_and_restart() {
        let mut board = Board::with_seed(6, 6, 5, 9).unwrap();
        board.probe(Point::new(3, 3));
        let restored = Board::deserialize(&board.serialize().unwrap()).unwrap();
        assert_eq!(restored, board);

        let mut replay = restored;
        replay.restart();
        assert!(replay.points().all(|p| !replay.is_revealed(p)));
        assert_eq!(replay.points().filter(|&p| replay.is_mine(p)).count(), 5);

        // The stored first probe is still safe after a restart.
        assert_eq!(replay.first_probe(), Some(Point::new(3, 3)));
        assert!(!replay.is_mine(Point::new(3, 3)));
        replay.probe(Point::new(3, 3));
        assert!(!replay.is_game_over());
    }

    #[test]
    fn test_render() {
        let mut board = Board::from_mines(2, 3, &[Point::new(0, 2)]).unwrap();
        board.probe(Point::new(1, 0));
        board.toggle_flag(Point::new(0, 2));
        let text = render(&board);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Mines remaining: 0");
        assert_eq!(lines[1], "      0  1  2");
        assert_eq!(lines[3], " 0 |  0  1  ⚑");
        assert_eq!(lines[4], " 1 |  0  1  ■");
    }
}
