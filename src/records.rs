//! Fixed-schema records shared by the store, ingestion and feature builder.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const STAT_COUNT: usize = 21;

/// Per-game rate statistics used as model features, in manifest order.
pub const STAT_COLUMNS: [&str; STAT_COUNT] = [
    "fg_per_g",
    "fga_per_g",
    "fg_pct",
    "fg3_per_g",
    "fg3a_per_g",
    "fg3_pct",
    "fg2_per_g",
    "fg2a_per_g",
    "fg2_pct",
    "ft_per_g",
    "fta_per_g",
    "ft_pct",
    "orb_per_g",
    "drb_per_g",
    "trb_per_g",
    "ast_per_g",
    "stl_per_g",
    "blk_per_g",
    "tov_per_g",
    "pf_per_g",
    "pts_per_g",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,
    pub name: String,
    pub abbreviation: String,
}

/// Season averages for one team. Any value may be missing when the source
/// table was incomplete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatLine {
    pub fg_per_g: Option<f64>,
    pub fga_per_g: Option<f64>,
    pub fg_pct: Option<f64>,
    pub fg3_per_g: Option<f64>,
    pub fg3a_per_g: Option<f64>,
    pub fg3_pct: Option<f64>,
    pub fg2_per_g: Option<f64>,
    pub fg2a_per_g: Option<f64>,
    pub fg2_pct: Option<f64>,
    pub ft_per_g: Option<f64>,
    pub fta_per_g: Option<f64>,
    pub ft_pct: Option<f64>,
    pub orb_per_g: Option<f64>,
    pub drb_per_g: Option<f64>,
    pub trb_per_g: Option<f64>,
    pub ast_per_g: Option<f64>,
    pub stl_per_g: Option<f64>,
    pub blk_per_g: Option<f64>,
    pub tov_per_g: Option<f64>,
    pub pf_per_g: Option<f64>,
    pub pts_per_g: Option<f64>,
}

impl StatLine {
    /// Values in [`STAT_COLUMNS`] order.
    pub fn values(&self) -> [Option<f64>; STAT_COUNT] {
        [
            self.fg_per_g,
            self.fga_per_g,
            self.fg_pct,
            self.fg3_per_g,
            self.fg3a_per_g,
            self.fg3_pct,
            self.fg2_per_g,
            self.fg2a_per_g,
            self.fg2_pct,
            self.ft_per_g,
            self.fta_per_g,
            self.ft_pct,
            self.orb_per_g,
            self.drb_per_g,
            self.trb_per_g,
            self.ast_per_g,
            self.stl_per_g,
            self.blk_per_g,
            self.tov_per_g,
            self.pf_per_g,
            self.pts_per_g,
        ]
    }

    pub fn from_values(values: [Option<f64>; STAT_COUNT]) -> Self {
        let [
            fg_per_g,
            fga_per_g,
            fg_pct,
            fg3_per_g,
            fg3a_per_g,
            fg3_pct,
            fg2_per_g,
            fg2a_per_g,
            fg2_pct,
            ft_per_g,
            fta_per_g,
            ft_pct,
            orb_per_g,
            drb_per_g,
            trb_per_g,
            ast_per_g,
            stl_per_g,
            blk_per_g,
            tov_per_g,
            pf_per_g,
            pts_per_g,
        ] = values;
        Self {
            fg_per_g,
            fga_per_g,
            fg_pct,
            fg3_per_g,
            fg3a_per_g,
            fg3_pct,
            fg2_per_g,
            fg2a_per_g,
            fg2_pct,
            ft_per_g,
            fta_per_g,
            ft_pct,
            orb_per_g,
            drb_per_g,
            trb_per_g,
            ast_per_g,
            stl_per_g,
            blk_per_g,
            tov_per_g,
            pf_per_g,
            pts_per_g,
        }
    }

    /// All values present, or `None` if any is missing.
    pub fn complete(&self) -> Option<[f64; STAT_COUNT]> {
        let values = self.values();
        let mut out = [0.0; STAT_COUNT];
        for (slot, value) in out.iter_mut().zip(values) {
            *slot = value?;
        }
        Some(out)
    }

    /// Sets a field by its column name. Returns false for unknown names.
    pub fn set(&mut self, column: &str, value: Option<f64>) -> bool {
        let Some(idx) = STAT_COLUMNS.iter().position(|c| *c == column) else {
            return false;
        };
        let mut values = self.values();
        values[idx] = value;
        *self = Self::from_values(values);
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonStat {
    pub team_id: i64,
    pub season: i32,
    pub games_played: Option<i64>,
    pub minutes_per_game: Option<f64>,
    pub stats: StatLine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Location {
    Home,
    Away,
}

impl Location {
    pub fn as_str(self) -> &'static str {
        match self {
            Location::Home => "home",
            Location::Away => "away",
        }
    }

    /// Anything that is not explicitly away (including the scraper's `@`) is home.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "away" | "@" => Location::Away,
            _ => Location::Home,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub team_id: i64,
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

impl GameRecord {
    pub fn is_win(&self) -> bool {
        self.result.as_deref().map(str::trim) == Some("W")
    }
}
