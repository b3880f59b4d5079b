use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use minesweeper_csp::*;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Verbosity level
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, PartialOrd, Ord)]
enum Verbosity {
    /// Errors only
    Quiet,
    /// Per-game results
    Normal,
    /// Per-turn deductions and guesses
    Debug,
    /// Per-component search statistics
    Trace,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum DifficultyArg {
    Easy,
    Interm,
    Expert,
}

impl From<DifficultyArg> for Difficulty {
    fn from(level: DifficultyArg) -> Self {
        match level {
            DifficultyArg::Easy => Difficulty::Beginner,
            DifficultyArg::Interm => Difficulty::Intermediate,
            DifficultyArg::Expert => Difficulty::Expert,
        }
    }
}

/// Minesweeper solver driven by constraint propagation and solution counting
#[derive(Parser, Debug)]
#[command(name = "minesweeper-csp")]
#[command(version)]
struct Cli {
    /// Verbosity level
    #[arg(short, long, value_enum, default_value = "normal", global = true)]
    verbosity: Verbosity,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play a batch of games and report win rates
    Run(RunArgs),
    /// Re-solve a saved board snapshot
    Replay {
        /// Snapshot written by `run --save-lost`
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[command(flatten)]
        solver: SolverArgs,
    },
    /// Summarize a game record file
    Stats {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
struct SolverArgs {
    /// Search strategy: BT, FC or GAC
    #[arg(long, default_value = "GAC")]
    strategy: String,

    /// Variable order: random, fixed or mrv
    #[arg(long, default_value = "mrv")]
    order: String,

    /// Guess policy
    #[arg(long, default_value = "safest")]
    guess: String,

    /// Margin for the balanced guess policies, in [0, 1]
    #[arg(long, default_value = "0")]
    balance: f64,

    /// Seed for mine placement and solver randomness
    #[arg(long)]
    seed: Option<u64>,

    /// Row of the first probe. Replays reuse the probe stored in the snapshot
    #[arg(long, default_value = "0")]
    first_row: usize,

    /// Column of the first probe
    #[arg(long, default_value = "0")]
    first_col: usize,
}

impl SolverArgs {
    fn config(&self) -> anyhow::Result<SolverConfig> {
        let config = SolverConfig::parse(&self.strategy, &self.order, &self.guess, self.balance)?;
        Ok(SolverConfig {
            seed: self.seed,
            ..config
        })
    }

    fn first_probe(&self) -> Point {
        Point::new(self.first_row, self.first_col)
    }
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    solver: SolverArgs,

    /// Games per difficulty
    #[arg(short = 'n', long, default_value = "10")]
    games: usize,

    /// Difficulties to play
    #[arg(short, long, value_enum, num_args = 1.., default_value = "easy")]
    difficulty: Vec<DifficultyArg>,

    /// Custom board as ROWS COLS MINES, replacing the difficulty presets
    #[arg(long, num_args = 3, value_names = ["ROWS", "COLS", "MINES"])]
    custom: Option<Vec<usize>>,

    /// Directory for per-game records and transcripts
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Directory for snapshots of lost boards
    #[arg(long, value_name = "DIR")]
    save_lost: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Replays always show the per-turn reasoning.
    let verbosity = match cli.command {
        Command::Replay { .. } => cli.verbosity.max(Verbosity::Debug),
        _ => cli.verbosity,
    };
    let level = match verbosity {
        Verbosity::Quiet => Level::ERROR,
        Verbosity::Normal => Level::WARN,
        Verbosity::Debug => Level::DEBUG,
        Verbosity::Trace => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    match cli.command {
        Command::Run(args) => run(&args),
        Command::Replay { file, solver } => replay(&file, &solver),
        Command::Stats { file } => {
            let records = GameRecord::read_all(&file)?;
            let summary = Summary::from_records(&records)
                .with_context(|| format!("{} has no records", file.display()))?;
            println!("{summary}");
            Ok(())
        }
    }
}

fn run(args: &RunArgs) -> anyhow::Result<()> {
    let config = args.solver.config()?;
    let mut solver = Solver::new(config)?;
    let run_name = format!("{}_{}_{}", config.strategy, config.order, config.guess);

    let boards: Vec<(String, usize, usize, usize)> = match args.custom.as_deref() {
        Some(&[rows, cols, mines]) => {
            let name = format!("custom_{rows}x{cols}_{mines}");
            vec![(name, rows, cols, mines)]
        }
        Some(_) => anyhow::bail!("--custom takes ROWS COLS MINES"),
        None => args
            .difficulty
            .iter()
            .map(|&level| {
                let difficulty = Difficulty::from(level);
                let (rows, cols, mines) = difficulty.dimensions();
                (difficulty.name().to_string(), rows, cols, mines)
            })
            .collect(),
    };

    println!("--- {run_name} ---");
    for (name, rows, cols, mines) in boards {
        let mut wins = 0;
        for i in 0..args.games {
            let mut board = match config.seed {
                Some(seed) => Board::with_seed(rows, cols, mines, seed.wrapping_add(i as u64))?,
                None => Board::new(rows, cols, mines)?,
            };
            let mut log = args.log_dir.as_ref().map(|dir| {
                let dir = dir.join(&run_name).join(&name);
                let transcript = dir.join(format!("{name}_{i}.txt"));
                GameLog::new(dir.join(format!("{name}.csv"))).with_transcript(transcript)
            });

            let stats = solver.play(&mut board, args.solver.first_probe(), log.as_mut())?;
            if stats.won {
                wins += 1;
            } else if let Some(dir) = &args.save_lost {
                save_snapshot(&board, &dir.join(format!("{name}_{i}.bcs")))?;
            }
        }
        let rate = if args.games == 0 {
            0.0
        } else {
            wins as f64 / args.games as f64
        };
        println!(
            "{name} ({rows}x{cols}, {mines} mines) - Win Rate: {rate:.4} ({wins}/{})",
            args.games
        );
    }
    Ok(())
}

fn save_snapshot(board: &Board, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, board.serialize()?).with_context(|| format!("writing {}", path.display()))
}

fn replay(file: &Path, args: &SolverArgs) -> anyhow::Result<()> {
    let bytes = fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let mut board = Board::deserialize(&bytes)?;
    board.restart();

    // Mines were placed around the original first probe, so open there again.
    let first_probe = board.first_probe().unwrap_or_else(|| args.first_probe());
    let mut solver = Solver::new(args.config()?)?;
    let stats = solver.play(&mut board, first_probe, None)?;
    print_board(&board);
    println!(
        "Result: {} after {} turns and {} guesses",
        Outcome::from_won(stats.won),
        stats.turns,
        stats.guesses
    );
    Ok(())
}

fn print_board(board: &Board) {
    println!("{}", render(board));
    println!();
}
