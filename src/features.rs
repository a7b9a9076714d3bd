//! Joins the game log to both teams' season stats and derives the model's
//! design matrix.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::records::{GameRecord, STAT_COLUMNS, STAT_COUNT, SeasonStat, StatLine, Team};
use crate::rolling::TrailingWindow;
use crate::store::StatsStore;

pub const OPP_SUFFIX: &str = "_opp_stats";
pub const HOME_COLUMN: &str = "home";
pub const LAST_PTS_COLUMN: &str = "last_3_pts";
pub const LAST_OPP_PTS_COLUMN: &str = "last_3_opp_pts";

pub const FEATURE_COUNT: usize = 2 * STAT_COUNT + 3;
pub const HOME_IDX: usize = 2 * STAT_COUNT;
pub const LAST_PTS_IDX: usize = HOME_IDX + 1;
pub const LAST_OPP_PTS_IDX: usize = HOME_IDX + 2;

pub type FeatureVector = [f64; FEATURE_COUNT];

/// Column manifest: own stats, suffixed opponent stats, home, recency.
pub fn feature_columns() -> Vec<String> {
    let mut out = Vec::with_capacity(FEATURE_COUNT);
    out.extend(STAT_COLUMNS.iter().map(|c| c.to_string()));
    out.extend(STAT_COLUMNS.iter().map(|c| format!("{c}{OPP_SUFFIX}")));
    out.push(HOME_COLUMN.to_string());
    out.push(LAST_PTS_COLUMN.to_string());
    out.push(LAST_OPP_PTS_COLUMN.to_string());
    out
}

pub fn raw_stat_columns() -> Vec<String> {
    STAT_COLUMNS.iter().map(|c| c.to_string()).collect()
}

/// One historical game from one team's point of view.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub team_id: i64,
    pub opponent_id: i64,
    pub season: i32,
    pub date: NaiveDate,
    pub own: [f64; STAT_COUNT],
    pub opp: [f64; STAT_COUNT],
    pub home: bool,
    pub last_3_pts: f64,
    pub last_3_opp_pts: f64,
    pub points: Option<i64>,
    pub opp_points: Option<i64>,
    pub label: u8,
}

impl FeatureRow {
    pub fn features(&self) -> FeatureVector {
        let mut out = [0.0; FEATURE_COUNT];
        out[..STAT_COUNT].copy_from_slice(&self.own);
        out[STAT_COUNT..HOME_IDX].copy_from_slice(&self.opp);
        out[HOME_IDX] = if self.home { 1.0 } else { 0.0 };
        out[LAST_PTS_IDX] = self.last_3_pts;
        out[LAST_OPP_PTS_IDX] = self.last_3_opp_pts;
        out
    }
}

/// Counts of games that did not make it into the table, by reason.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub games_total: usize,
    pub unresolved_opponent: usize,
    pub missing_stats: usize,
    pub duplicate_stats: usize,
    pub missing_features: usize,
    pub rows: usize,
    pub unresolved_names: BTreeSet<String>,
    pub duplicate_keys: BTreeSet<(i64, i32)>,
}

impl BuildReport {
    pub fn has_integrity_issues(&self) -> bool {
        self.unresolved_opponent > 0 || self.duplicate_stats > 0
    }

    /// Integrity violations as errors, for callers that want to surface them.
    pub fn integrity_errors(&self) -> Vec<PipelineError> {
        let mut out = Vec::new();
        for name in &self.unresolved_names {
            out.push(PipelineError::DataIntegrity(format!(
                "opponent {name:?} does not match any team"
            )));
        }
        for (team_id, season) in &self.duplicate_keys {
            out.push(PipelineError::DataIntegrity(format!(
                "multiple stat rows for team {team_id} season {season}"
            )));
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct FeatureTable {
    pub rows: Vec<FeatureRow>,
    pub columns: Vec<String>,
    pub raw_stat_columns: Vec<String>,
    pub report: BuildReport,
}

impl FeatureTable {
    pub fn labels(&self) -> Vec<u8> {
        self.rows.iter().map(|r| r.label).collect()
    }

    pub fn matrix(&self) -> Vec<FeatureVector> {
        self.rows.iter().map(FeatureRow::features).collect()
    }

    pub fn latest_season(&self) -> Option<i32> {
        self.rows.iter().map(|r| r.season).max()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub fn build_features(store: &dyn StatsStore, window: usize) -> Result<FeatureTable> {
    let teams = store.list_teams()?;
    let games = store.list_games()?;
    let stats = store.list_season_stats()?;
    Ok(build_features_from(&teams, &games, &stats, window))
}

pub fn build_features_from(
    teams: &[Team],
    games: &[GameRecord],
    stats: &[SeasonStat],
    window: usize,
) -> FeatureTable {
    let resolver = NameResolver::new(teams);

    let mut by_key: HashMap<(i64, i32), Vec<&SeasonStat>> = HashMap::new();
    for stat in stats {
        by_key.entry((stat.team_id, stat.season)).or_default().push(stat);
    }

    let mut report = BuildReport {
        games_total: games.len(),
        ..BuildReport::default()
    };

    let mut joined: Vec<Joined<'_>> = Vec::with_capacity(games.len());
    for game in games {
        let Some(opponent_id) = resolver.resolve(&game.opponent_name) else {
            report.unresolved_opponent += 1;
            report.unresolved_names.insert(game.opponent_name.clone());
            continue;
        };
        // One reason per dropped game: the opponent side is not looked up
        // once the own side has failed.
        let Some(own) = lookup_stat(&by_key, game.team_id, game.season, &mut report) else {
            continue;
        };
        let Some(opp) = lookup_stat(&by_key, opponent_id, game.season, &mut report) else {
            continue;
        };
        joined.push(Joined {
            game,
            opponent_id,
            own,
            opp,
        });
    }

    // Stable: same-date games keep their original log order.
    joined.sort_by(|a, b| {
        a.game
            .team_id
            .cmp(&b.game.team_id)
            .then(a.game.date.cmp(&b.game.date))
    });

    let mut rows = Vec::with_capacity(joined.len());
    let mut current_team: Option<i64> = None;
    let mut pts_window = TrailingWindow::new(window);
    let mut opp_pts_window = TrailingWindow::new(window);
    for j in &joined {
        if current_team != Some(j.game.team_id) {
            current_team = Some(j.game.team_id);
            pts_window = TrailingWindow::new(window);
            opp_pts_window = TrailingWindow::new(window);
        }
        let last_3_pts = pts_window.mean();
        let last_3_opp_pts = opp_pts_window.mean();
        pts_window.push(j.game.points.map(|p| p as f64));
        opp_pts_window.push(j.game.opp_points.map(|p| p as f64));

        let (Some(own), Some(opp), Some(last_3_pts), Some(last_3_opp_pts)) = (
            j.own.complete(),
            j.opp.complete(),
            last_3_pts,
            last_3_opp_pts,
        ) else {
            report.missing_features += 1;
            continue;
        };

        rows.push(FeatureRow {
            team_id: j.game.team_id,
            opponent_id: j.opponent_id,
            season: j.game.season,
            date: j.game.date,
            own,
            opp,
            home: j.game.location == crate::records::Location::Home,
            last_3_pts,
            last_3_opp_pts,
            points: j.game.points,
            opp_points: j.game.opp_points,
            label: u8::from(j.game.is_win()),
        });
    }

    report.rows = rows.len();
    for (team_id, season) in &report.duplicate_keys {
        warn!(team_id, season, "duplicate season stat rows; games excluded");
    }
    if report.unresolved_opponent > 0 {
        warn!(
            count = report.unresolved_opponent,
            names = ?report.unresolved_names,
            "games with unresolved opponent excluded"
        );
    }
    debug!(
        missing_stats = report.missing_stats,
        missing_features = report.missing_features,
        "feature rows dropped"
    );
    info!(
        games = report.games_total,
        rows = report.rows,
        "feature table built"
    );

    FeatureTable {
        rows,
        columns: feature_columns(),
        raw_stat_columns: raw_stat_columns(),
        report,
    }
}

struct Joined<'a> {
    game: &'a GameRecord,
    opponent_id: i64,
    own: StatLine,
    opp: StatLine,
}

fn lookup_stat(
    by_key: &HashMap<(i64, i32), Vec<&SeasonStat>>,
    team_id: i64,
    season: i32,
    report: &mut BuildReport,
) -> Option<StatLine> {
    match by_key.get(&(team_id, season)).map(Vec::as_slice) {
        None | Some([]) => {
            report.missing_stats += 1;
            None
        }
        Some([single]) => Some(single.stats),
        Some(_) => {
            report.duplicate_stats += 1;
            report.duplicate_keys.insert((team_id, season));
            None
        }
    }
}

/// Opponent names come from scraped text; exact match first, then a
/// trimmed, case-insensitive one.
struct NameResolver {
    exact: HashMap<String, i64>,
    folded: HashMap<String, i64>,
}

impl NameResolver {
    fn new(teams: &[Team]) -> Self {
        let mut exact = HashMap::new();
        let mut folded = HashMap::new();
        for team in teams {
            exact.insert(team.name.clone(), team.id);
            folded.insert(fold_name(&team.name), team.id);
        }
        Self { exact, folded }
    }

    fn resolve(&self, name: &str) -> Option<i64> {
        if let Some(id) = self.exact.get(name) {
            return Some(*id);
        }
        self.folded.get(&fold_name(name)).copied()
    }
}

fn fold_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
