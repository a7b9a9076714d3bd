//! Loads the scraper's text dumps into the SQLite store.
//!
//! The scraper appends one block per record: `key: value` lines (the table's
//! `data-stat` names, prefixed by `team:` and `season:`) terminated by a blank
//! line. Season stats and game logs go to separate files.

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use tracing::{info, warn};

use crate::records::{GameRecord, Location, STAT_COLUMNS, SeasonStat, StatLine};
use crate::store::SqliteStore;

/// Franchise codes used by the source site, with full team names as they
/// appear in the opponent column of the game logs.
pub const KNOWN_TEAMS: [(&str, &str); 13] = [
    ("ATL", "Atlanta Dream"),
    ("CHI", "Chicago Sky"),
    ("CON", "Connecticut Sun"),
    ("DAL", "Dallas Wings"),
    ("GSV", "Golden State Valkyries"),
    ("IND", "Indiana Fever"),
    ("LAS", "Los Angeles Sparks"),
    ("LVA", "Las Vegas Aces"),
    ("MIN", "Minnesota Lynx"),
    ("NYL", "New York Liberty"),
    ("PHO", "Phoenix Mercury"),
    ("SEA", "Seattle Storm"),
    ("WAS", "Washington Mystics"),
];

const DATE_FORMATS: [&str; 4] = ["%a, %b %d, %Y", "%b %d, %Y", "%Y-%m-%d", "%m/%d/%Y"];

#[derive(Debug, Clone, Default)]
pub struct Block {
    pub line: usize,
    pub fields: Vec<(String, String)>,
}

impl Block {
    fn get(&self, keys: &[&str]) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| keys.contains(&k.as_str()))
            .map(|(_, v)| v.as_str())
            .filter(|v| !is_missing(v))
    }
}

#[derive(Debug, Clone)]
pub struct StatEntry {
    pub abbreviation: String,
    pub season: i32,
    pub games_played: Option<i64>,
    pub minutes_per_game: Option<f64>,
    pub stats: StatLine,
}

#[derive(Debug, Clone)]
pub struct GameEntry {
    pub abbreviation: String,
    pub season: i32,
    pub date: NaiveDate,
    pub location: Location,
    pub opponent_name: String,
    pub result: Option<String>,
    pub points: Option<i64>,
    pub opp_points: Option<i64>,
    pub wins: Option<i64>,
    pub losses: Option<i64>,
    pub streak: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DumpParse<T> {
    pub entries: Vec<T>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct IngestSummary {
    pub db_path: Option<PathBuf>,
    pub teams: usize,
    pub stats_upserted: usize,
    pub games_upserted: usize,
    pub errors: Vec<String>,
}

pub fn parse_blocks(raw: &str) -> Vec<Block> {
    let mut out = Vec::new();
    let mut current = Block::default();
    for (idx, line) in raw.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !current.fields.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            continue;
        }
        let Some((key, value)) = trimmed.split_once(':') else {
            continue;
        };
        if current.fields.is_empty() {
            current.line = idx + 1;
        }
        current
            .fields
            .push((key.trim().to_string(), value.trim().to_string()));
    }
    if !current.fields.is_empty() {
        out.push(current);
    }
    out
}

pub fn parse_stat_dump(raw: &str) -> DumpParse<StatEntry> {
    let mut entries = Vec::new();
    let mut errors = Vec::new();
    for block in parse_blocks(raw) {
        match parse_stat_block(&block) {
            Ok(entry) => entries.push(entry),
            Err(err) => errors.push(format!("line {}: {err}", block.line)),
        }
    }
    DumpParse { entries, errors }
}

pub fn parse_game_dump(raw: &str) -> DumpParse<GameEntry> {
    let mut entries = Vec::new();
    let mut errors = Vec::new();
    for block in parse_blocks(raw) {
        match parse_game_block(&block) {
            Ok(entry) => entries.push(entry),
            Err(err) => errors.push(format!("line {}: {err}", block.line)),
        }
    }
    DumpParse { entries, errors }
}

fn parse_stat_block(block: &Block) -> Result<StatEntry> {
    let (abbreviation, season) = block_header(block)?;
    let mut stats = StatLine::default();
    for (key, value) in &block.fields {
        if !STAT_COLUMNS.contains(&key.as_str()) || is_missing(value) {
            continue;
        }
        stats.set(key, Some(parse_number(value)?));
    }
    Ok(StatEntry {
        abbreviation,
        season,
        games_played: block.get(&["g"]).map(parse_int).transpose()?,
        minutes_per_game: block.get(&["mp_per_g"]).map(parse_number).transpose()?,
        stats,
    })
}

fn parse_game_block(block: &Block) -> Result<GameEntry> {
    let (abbreviation, season) = block_header(block)?;
    let raw_date = block
        .get(&["date_game", "date"])
        .ok_or_else(|| anyhow!("missing game date"))?;
    let opponent_name = block
        .get(&["opp_name", "opponent"])
        .ok_or_else(|| anyhow!("missing opponent"))?
        .to_string();
    Ok(GameEntry {
        abbreviation,
        season,
        date: parse_date(raw_date)?,
        location: Location::parse(block.get(&["game_location"]).unwrap_or_default()),
        opponent_name,
        result: block.get(&["game_result", "result"]).map(str::to_string),
        points: block.get(&["pts", "points"]).map(parse_int).transpose()?,
        opp_points: block.get(&["opp_pts", "opp_points"]).map(parse_int).transpose()?,
        wins: block.get(&["wins"]).map(parse_int).transpose()?,
        losses: block.get(&["losses"]).map(parse_int).transpose()?,
        streak: block.get(&["game_streak"]).map(str::to_string),
    })
}

fn block_header(block: &Block) -> Result<(String, i32)> {
    let team = block
        .get(&["team"])
        .ok_or_else(|| anyhow!("missing team"))?
        .to_ascii_uppercase();
    let season = block
        .get(&["season"])
        .ok_or_else(|| anyhow!("missing season"))?
        .parse::<i32>()
        .context("invalid season")?;
    Ok((team, season))
}

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Ok(date);
        }
    }
    Err(anyhow!("unrecognized date {trimmed:?}"))
}

fn parse_number(raw: &str) -> Result<f64> {
    let trimmed = raw.trim();
    // The site prints percentages as ".462".
    trimmed
        .parse::<f64>()
        .with_context(|| format!("invalid number {trimmed:?}"))
}

fn parse_int(raw: &str) -> Result<i64> {
    let trimmed = raw.trim();
    trimmed
        .parse::<i64>()
        .with_context(|| format!("invalid integer {trimmed:?}"))
}

fn is_missing(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || v.eq_ignore_ascii_case("none")
}

/// Upserts the known franchises, then every parsed stat and game record.
/// Records for unknown franchise codes are skipped and reported.
pub fn load_into_store(
    store: &mut SqliteStore,
    stats: &DumpParse<StatEntry>,
    games: &DumpParse<GameEntry>,
) -> Result<IngestSummary> {
    for (abbreviation, name) in KNOWN_TEAMS {
        store.upsert_team(name, abbreviation)?;
    }

    let mut errors: Vec<String> = stats.errors.iter().chain(&games.errors).cloned().collect();
    let mut stats_upserted = 0usize;
    for entry in &stats.entries {
        let Some(team_id) = store.team_id_by_abbreviation(&entry.abbreviation)? else {
            errors.push(format!("unknown team code {} in stats", entry.abbreviation));
            continue;
        };
        store.upsert_season_stat(&SeasonStat {
            team_id,
            season: entry.season,
            games_played: entry.games_played,
            minutes_per_game: entry.minutes_per_game,
            stats: entry.stats,
        })?;
        stats_upserted += 1;
    }

    let mut games_upserted = 0usize;
    for entry in &games.entries {
        let Some(team_id) = store.team_id_by_abbreviation(&entry.abbreviation)? else {
            errors.push(format!("unknown team code {} in games", entry.abbreviation));
            continue;
        };
        store.upsert_game(&GameRecord {
            team_id,
            season: entry.season,
            date: entry.date,
            location: entry.location,
            opponent_name: entry.opponent_name.clone(),
            result: entry.result.clone(),
            points: entry.points,
            opp_points: entry.opp_points,
            wins: entry.wins,
            losses: entry.losses,
            streak: entry.streak.clone(),
        })?;
        games_upserted += 1;
    }

    for err in &errors {
        warn!(error = %err, "ingest record skipped");
    }
    info!(stats_upserted, games_upserted, "ingest finished");

    Ok(IngestSummary {
        db_path: None,
        teams: KNOWN_TEAMS.len(),
        stats_upserted,
        games_upserted,
        errors,
    })
}
