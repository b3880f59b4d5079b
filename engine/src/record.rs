//! Per-game summary lines and optional turn-by-turn transcripts.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Won,
    Lost,
}

impl Outcome {
    pub fn from_won(won: bool) -> Self {
        if won { Outcome::Won } else { Outcome::Lost }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Outcome::Won => "Won",
            Outcome::Lost => "Lost",
        })
    }
}

impl FromStr for Outcome {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Won" => Ok(Outcome::Won),
            "Lost" => Ok(Outcome::Lost),
            _ => anyhow::bail!("unknown outcome '{s}'"),
        }
    }
}

/// One line of a summary file: `Won, 0.0421, 2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameRecord {
    pub outcome: Outcome,
    pub seconds: f64,
    pub guesses: u32,
}

impl GameRecord {
    pub fn parse(line: &str) -> anyhow::Result<Self> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let [outcome, seconds, guesses] = fields.as_slice() else {
            anyhow::bail!("expected 3 fields in record line '{line}'");
        };
        Ok(GameRecord {
            outcome: outcome.parse()?,
            seconds: seconds
                .parse()
                .with_context(|| format!("bad seconds in '{line}'"))?,
            guesses: guesses
                .parse()
                .with_context(|| format!("bad guess count in '{line}'"))?,
        })
    }

    /// Reads every non-blank line of a summary file.
    pub fn read_all(path: &Path) -> anyhow::Result<Vec<Self>> {
        let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        text.lines()
            .filter(|l| !l.trim().is_empty())
            .map(GameRecord::parse)
            .collect()
    }
}

impl fmt::Display for GameRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.outcome, self.seconds, self.guesses)
    }
}

/// Where one game's records go. The summary line is appended to a shared
/// file; the transcript, if any, is buffered and written when the game ends.
#[derive(Debug)]
pub struct GameLog {
    summary: PathBuf,
    transcript: Option<PathBuf>,
    turns: String,
}

impl GameLog {
    pub fn new(summary: impl Into<PathBuf>) -> Self {
        GameLog {
            summary: summary.into(),
            transcript: None,
            turns: String::new(),
        }
    }

    pub fn with_transcript(mut self, path: impl Into<PathBuf>) -> Self {
        self.transcript = Some(path.into());
        self
    }

    /// Buffers the board as it stood at the start of a turn.
    pub fn record_turn(&mut self, board: &str, took: Duration) {
        if self.transcript.is_some() {
            let took = took.as_secs_f64();
            self.turns.push_str(board);
            self.turns.push_str(&format!("\nTook: {took} seconds\n\n"));
        }
    }

    pub fn finish(&mut self, record: &GameRecord) -> anyhow::Result<()> {
        create_parent(&self.summary)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.summary)
            .with_context(|| format!("opening {}", self.summary.display()))?;
        writeln!(file, "{record}")?;

        if let Some(path) = &self.transcript {
            create_parent(path)?;
            let (outcome, seconds) = (record.outcome, record.seconds);
            let header = format!("{outcome}\nTotal Time: {seconds} seconds\n\n");
            fs::write(path, header + &self.turns)
                .with_context(|| format!("writing {}", path.display()))?;
        }
        self.turns.clear();
        Ok(())
    }
}

fn create_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    Ok(())
}

/// Aggregate over a set of games.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub games: usize,
    pub wins: usize,
    pub mean_seconds: f64,
    pub max_seconds: f64,
    pub mean_guesses: f64,
}

impl Summary {
    pub fn from_records(records: &[GameRecord]) -> Option<Self> {
        if records.is_empty() {
            return None;
        }
        let n = records.len() as f64;
        Some(Summary {
            games: records.len(),
            wins: records.iter().filter(|r| r.outcome == Outcome::Won).count(),
            mean_seconds: records.iter().map(|r| r.seconds).sum::<f64>() / n,
            max_seconds: records.iter().map(|r| r.seconds).fold(0.0, f64::max),
            mean_guesses: records.iter().map(|r| f64::from(r.guesses)).sum::<f64>() / n,
        })
    }

    pub fn win_rate(&self) -> f64 {
        self.wins as f64 / self.games as f64
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Games: {}", self.games)?;
        writeln!(f, "Win Rate: {:.4}", self.win_rate())?;
        writeln!(f, "Mean Time: {:.4} seconds", self.mean_seconds)?;
        writeln!(f, "Max Time: {:.4} seconds", self.max_seconds)?;
        write!(f, "Mean Guesses: {:.2}", self.mean_guesses)
    }
}
