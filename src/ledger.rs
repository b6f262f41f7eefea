use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::context::BetContext;
use crate::master::ProjectionCore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Win,
    Loss,
    Push,
    Void,
}

impl Outcome {
    /// `w`/`l`/`p`/`v` prefixes, case-insensitive.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().chars().next()? {
            'w' => Some(Outcome::Win),
            'l' => Some(Outcome::Loss),
            'p' => Some(Outcome::Push),
            'v' => Some(Outcome::Void),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub bet: BetContext,
    pub analysis: ProjectionCore,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_outcome: Option<Outcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pnl: Option<f64>,
}

/// Append-only JSONL file of projections awaiting grading.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, bet: &BetContext, analysis: &ProjectionCore) -> Result<LedgerEntry> {
        let entry = LedgerEntry {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            bet: bet.clone(),
            analysis: *analysis,
            actual_outcome: None,
            pnl: None,
        };
        let mut line = serde_json::to_string(&entry).context("failed to encode ledger entry")?;
        line.push('\n');

        let _guard = self.write_lock.lock().expect("ledger lock poisoned");
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("failed to append to {}", self.path.display()))?;
        Ok(entry)
    }

    /// Best-effort append used by the synthesizer.
    pub fn record(&self, bet: &BetContext, analysis: &ProjectionCore) {
        match self.append(bet, analysis) {
            Ok(entry) => info!(id = %entry.id, player = %bet.player_name, "ledger: recorded projection"),
            Err(err) => warn!(error = %err, "ledger: failed to record projection"),
        }
    }

    /// Every parseable entry in file order; a missing file is empty.
    pub fn read_all(&self) -> Result<Vec<LedgerEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        Ok(parse_entries(&raw))
    }

    /// Grades one entry in place. Returns `false` when the id is unknown.
    /// Every other line, parseable or not, is written back unchanged.
    pub fn set_outcome(&self, id: Uuid, outcome: Outcome, pnl: Option<f64>) -> Result<bool> {
        let _guard = self.write_lock.lock().expect("ledger lock poisoned");
        if !self.path.exists() {
            return Ok(false);
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;

        let mut body = String::with_capacity(raw.len());
        let mut graded = false;
        for line in raw.split_inclusive('\n') {
            let entry = if graded {
                None
            } else {
                serde_json::from_str::<LedgerEntry>(line.trim()).ok().filter(|e| e.id == id)
            };
            match entry {
                Some(mut entry) => {
                    entry.actual_outcome = Some(outcome);
                    entry.pnl = pnl.or(entry.pnl);
                    body.push_str(&serde_json::to_string(&entry).context("failed to encode ledger entry")?);
                    body.push('\n');
                    graded = true;
                }
                None => body.push_str(line),
            }
        }
        if !graded {
            return Ok(false);
        }

        let tmp = self.path.with_extension("jsonl.tmp");
        fs::write(&tmp, body).with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(true)
    }
}

pub fn parse_entries(raw: &str) -> Vec<LedgerEntry> {
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<LedgerEntry>(line) {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(error = %err, "ledger: skipping malformed line");
                None
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Scorecard {
    pub graded: usize,
    pub wins: usize,
    pub losses: usize,
    pub pushes: usize,
}

impl Scorecard {
    pub fn from_entries(entries: &[LedgerEntry]) -> Self {
        let mut card = Scorecard::default();
        for outcome in entries.iter().filter_map(|e| e.actual_outcome) {
            card.graded += 1;
            match outcome {
                Outcome::Win => card.wins += 1,
                Outcome::Loss => card.losses += 1,
                Outcome::Push => card.pushes += 1,
                Outcome::Void => {}
            }
        }
        card
    }

    /// Wins over decided (win + loss) entries, e.g. `66.7%`.
    pub fn win_rate(&self) -> String {
        let decided = self.wins + self.losses;
        if decided == 0 {
            return "0.0%".to_string();
        }
        format!("{:.1}%", self.wins as f64 / decided as f64 * 100.0)
    }
}
