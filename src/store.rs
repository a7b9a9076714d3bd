use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};

use crate::records::{GameRecord, Location, STAT_COLUMNS, SeasonStat, StatLine, Team};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Read-only view of the three relations the pipeline needs.
pub trait StatsStore {
    fn list_teams(&self) -> Result<Vec<Team>>;
    fn list_games(&self) -> Result<Vec<GameRecord>>;
    fn list_season_stats(&self) -> Result<Vec<SeasonStat>>;
}

/// Snapshot held entirely in memory. Used by tests, benches and callers that
/// already loaded the relations elsewhere.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub teams: Vec<Team>,
    pub games: Vec<GameRecord>,
    pub stats: Vec<SeasonStat>,
}

impl StatsStore for MemoryStore {
    fn list_teams(&self) -> Result<Vec<Team>> {
        Ok(self.teams.clone())
    }

    fn list_games(&self) -> Result<Vec<GameRecord>> {
        Ok(self.games.clone())
    }

    fn list_season_stats(&self) -> Result<Vec<SeasonStat>> {
        Ok(self.stats.clone())
    }
}

pub struct SqliteStore {
    conn: Connection,
}

pub fn default_db_path() -> Option<PathBuf> {
    crate::config::app_cache_dir().map(|dir| dir.join("wnba.sqlite"))
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn =
            Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Inserts or renames a team keyed by abbreviation and returns its id.
    pub fn upsert_team(&self, name: &str, abbreviation: &str) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO teams(name, abbreviation) VALUES (?1, ?2)
                 ON CONFLICT(abbreviation) DO UPDATE SET name = excluded.name",
                params![name, abbreviation],
            )
            .context("upsert team")?;
        self.team_id_by_abbreviation(abbreviation)?
            .with_context(|| format!("team {abbreviation} missing after upsert"))
    }

    pub fn team_id_by_abbreviation(&self, abbreviation: &str) -> Result<Option<i64>> {
        self.conn
            .query_row(
                "SELECT id FROM teams WHERE abbreviation = ?1",
                params![abbreviation],
                |row| row.get::<_, i64>(0),
            )
            .optional()
            .context("query team by abbreviation")
    }

    /// Replaces any existing stat rows for the same (team, season).
    pub fn upsert_season_stat(&mut self, stat: &SeasonStat) -> Result<()> {
        let tx = self.conn.transaction().context("begin stat transaction")?;
        tx.execute(
            "DELETE FROM stats WHERE team_id = ?1 AND season = ?2",
            params![stat.team_id, stat.season],
        )
        .context("clear season stat")?;
        insert_stat_row(&tx, stat)?;
        tx.commit().context("commit stat transaction")?;
        Ok(())
    }

    /// Appends a stat row without deduplication. Mirrors what a careless
    /// re-ingest would do; the feature builder reports the duplicates.
    pub fn insert_season_stat(&self, stat: &SeasonStat) -> Result<()> {
        insert_stat_row(&self.conn, stat)
    }

    pub fn upsert_game(&self, game: &GameRecord) -> Result<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO games (
                    team_id, season, date, game_location, opponent, result,
                    points, opp_points, wins, losses, game_streak
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                ON CONFLICT(team_id, season, date) DO UPDATE SET
                    game_location = excluded.game_location,
                    opponent = excluded.opponent,
                    result = excluded.result,
                    points = excluded.points,
                    opp_points = excluded.opp_points,
                    wins = excluded.wins,
                    losses = excluded.losses,
                    game_streak = excluded.game_streak
                "#,
                params![
                    game.team_id,
                    game.season,
                    game.date.format(DATE_FORMAT).to_string(),
                    game.location.as_str(),
                    game.opponent_name,
                    game.result,
                    game.points,
                    game.opp_points,
                    game.wins,
                    game.losses,
                    game.streak,
                ],
            )
            .context("upsert game")?;
        Ok(())
    }
}

impl StatsStore for SqliteStore {
    fn list_teams(&self) -> Result<Vec<Team>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, abbreviation FROM teams ORDER BY id ASC")
            .context("prepare teams query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Team {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    abbreviation: row.get(2)?,
                })
            })
            .context("query teams")?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("decode team row")?);
        }
        Ok(out)
    }

    fn list_games(&self) -> Result<Vec<GameRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT team_id, season, date, game_location, opponent, result,
                       points, opp_points, wins, losses, game_streak
                FROM games
                ORDER BY id ASC
                "#,
            )
            .context("prepare games query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i32>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, Option<i64>>(6)?,
                    row.get::<_, Option<i64>>(7)?,
                    row.get::<_, Option<i64>>(8)?,
                    row.get::<_, Option<i64>>(9)?,
                    row.get::<_, Option<String>>(10)?,
                ))
            })
            .context("query games")?;

        let mut out = Vec::new();
        for row in rows {
            let (team_id, season, date, location, opponent, result, points, opp_points, wins, losses, streak) =
                row.context("decode game row")?;
            let date = NaiveDate::parse_from_str(&date, DATE_FORMAT)
                .with_context(|| format!("invalid stored game date {date:?}"))?;
            out.push(GameRecord {
                team_id,
                season,
                date,
                location: Location::parse(location.as_deref().unwrap_or_default()),
                opponent_name: opponent.unwrap_or_default(),
                result,
                points,
                opp_points,
                wins,
                losses,
                streak,
            });
        }
        Ok(out)
    }

    fn list_season_stats(&self) -> Result<Vec<SeasonStat>> {
        let sql = format!(
            "SELECT team_id, season, g, mp_per_g, {} FROM stats ORDER BY id ASC",
            STAT_COLUMNS.join(", ")
        );
        let mut stmt = self.conn.prepare(&sql).context("prepare stats query")?;
        let rows = stmt
            .query_map([], |row| {
                let mut values = [None; STAT_COLUMNS.len()];
                for (idx, slot) in values.iter_mut().enumerate() {
                    *slot = row.get::<_, Option<f64>>(4 + idx)?;
                }
                Ok(SeasonStat {
                    team_id: row.get(0)?,
                    season: row.get(1)?,
                    games_played: row.get(2)?,
                    minutes_per_game: row.get(3)?,
                    stats: StatLine::from_values(values),
                })
            })
            .context("query stats")?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("decode stat row")?);
        }
        Ok(out)
    }
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    let stat_columns = STAT_COLUMNS
        .iter()
        .map(|c| format!("{c} REAL NULL"))
        .collect::<Vec<_>>()
        .join(",\n            ");
    conn.execute_batch(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS teams (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            abbreviation TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS stats (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            team_id INTEGER NOT NULL REFERENCES teams(id),
            season INTEGER NOT NULL,
            g INTEGER NULL,
            mp_per_g REAL NULL,
            {stat_columns}
        );
        CREATE INDEX IF NOT EXISTS idx_stats_team_season ON stats(team_id, season);

        CREATE TABLE IF NOT EXISTS games (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            team_id INTEGER NOT NULL REFERENCES teams(id),
            season INTEGER NOT NULL,
            date TEXT NOT NULL,
            game_location TEXT NULL,
            opponent TEXT NULL,
            result TEXT NULL,
            points INTEGER NULL,
            opp_points INTEGER NULL,
            wins INTEGER NULL,
            losses INTEGER NULL,
            game_streak TEXT NULL,
            UNIQUE(team_id, season, date)
        );
        CREATE INDEX IF NOT EXISTS idx_games_season ON games(season);
        "#
    ))
    .context("create sqlite schema")?;
    Ok(())
}

fn insert_stat_row(conn: &Connection, stat: &SeasonStat) -> Result<()> {
    let placeholders = (5..5 + STAT_COLUMNS.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO stats (team_id, season, g, mp_per_g, {}) VALUES (?1, ?2, ?3, ?4, {placeholders})",
        STAT_COLUMNS.join(", ")
    );

    let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![
        Box::new(stat.team_id),
        Box::new(stat.season),
        Box::new(stat.games_played),
        Box::new(stat.minutes_per_game),
    ];
    for value in stat.stats.values() {
        values.push(Box::new(value));
    }
    conn.execute(&sql, rusqlite::params_from_iter(values.iter()))
        .context("insert season stat")?;
    Ok(())
}
