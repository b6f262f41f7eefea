use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use uuid::Uuid;

use propdesk::config::AppConfig;
use propdesk::ledger::{Ledger, Outcome, Scorecard};

const RECENT_ROWS: usize = 10;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let path = match flag_value(&args, "--ledger") {
        Some(path) => PathBuf::from(path),
        None => AppConfig::from_env()?.ledger_path(),
    };
    let ledger = Ledger::new(path);

    if let Some(id) = flag_value(&args, "--grade") {
        let id = Uuid::parse_str(id.trim()).with_context(|| format!("invalid entry id {id}"))?;
        let raw = flag_value(&args, "--outcome").ok_or_else(|| anyhow!("--grade needs --outcome w|l|p|v"))?;
        let outcome = Outcome::parse(&raw).ok_or_else(|| anyhow!("unknown outcome {raw}"))?;
        let pnl = match flag_value(&args, "--pnl") {
            Some(raw) => Some(raw.trim().parse::<f64>().with_context(|| format!("invalid pnl {raw}"))?),
            None => None,
        };
        if !ledger.set_outcome(id, outcome, pnl)? {
            return Err(anyhow!("no ledger entry with id {id}"));
        }
        println!("Graded {id} as {outcome:?}");
    }

    let entries = ledger.read_all()?;
    let card = Scorecard::from_entries(&entries);
    println!("Ledger: {}", ledger.path().display());
    println!("Entries: {} (graded {})", entries.len(), card.graded);
    println!(
        "Record: {}-{}-{}  win rate {}",
        card.wins,
        card.losses,
        card.pushes,
        card.win_rate()
    );

    let skip = entries.len().saturating_sub(RECENT_ROWS);
    for entry in entries.iter().skip(skip) {
        println!(
            "{}  {}  {} {} {:?} {:.2}  {}",
            entry.id,
            entry.timestamp.format("%Y-%m-%d %H:%M"),
            entry.bet.player_name,
            entry.bet.prop_type,
            entry.analysis.projection,
            entry.analysis.confidence_score,
            entry
                .actual_outcome
                .map(|o| format!("{o:?}"))
                .unwrap_or_else(|| "pending".to_string())
        );
    }
    Ok(())
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}
