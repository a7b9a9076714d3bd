//! Predictions for games that have not been played yet.
//!
//! An unplayed game has no row in the feature table, so its inputs are
//! reconstructed from each side's most recent rolling form: the same shifted
//! trailing means the feature builder uses, read off the last historical row
//! of the team (own stats and points) and of the opponent (its stats as seen
//! by the teams that faced it).

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::features::{
    FEATURE_COUNT, FeatureRow, FeatureVector, HOME_IDX, LAST_OPP_PTS_IDX, LAST_PTS_IDX,
};
use crate::pipeline::FittedPipeline;
use crate::records::{STAT_COUNT, Team};
use crate::rolling::{TrailingVectorWindow, TrailingWindow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matchup {
    pub team_id: i64,
    pub opponent_id: i64,
    pub home: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchupPrediction {
    pub team_id: i64,
    pub opponent_id: i64,
    pub team_name: String,
    pub opponent_name: String,
    pub predicted_win: bool,
    pub predicted_winner_name: String,
    pub win_probability: f64,
    /// Number of projected features that had no history and were imputed.
    pub imputed_features: usize,
}

/// Rejects requests naming the same team twice or an id outside `teams`.
pub fn validate_matchups(teams: &[Team], matchups: &[Matchup]) -> Result<()> {
    let known: HashSet<i64> = teams.iter().map(|t| t.id).collect();
    for m in matchups {
        if m.team_id == m.opponent_id
            || !known.contains(&m.team_id)
            || !known.contains(&m.opponent_id)
        {
            return Err(PipelineError::UnknownEntity {
                team_id: m.team_id,
                opponent_id: m.opponent_id,
            });
        }
    }
    Ok(())
}

/// Latest shifted rolling form per team.
#[derive(Debug, Clone, Default)]
pub struct TeamForms {
    own: HashMap<i64, Option<[f64; STAT_COUNT]>>,
    last_pts: HashMap<i64, Option<f64>>,
    last_opp_pts: HashMap<i64, Option<f64>>,
    as_opponent: HashMap<i64, Option<[f64; STAT_COUNT]>>,
}

impl TeamForms {
    pub fn from_history(rows: &[FeatureRow], window: usize) -> Self {
        let mut forms = TeamForms::default();

        let mut by_team: Vec<&FeatureRow> = rows.iter().collect();
        by_team.sort_by(|a, b| a.team_id.cmp(&b.team_id).then(a.date.cmp(&b.date)));
        let mut current: Option<i64> = None;
        let mut own_w = TrailingVectorWindow::<STAT_COUNT>::new(window);
        let mut pts_w = TrailingWindow::new(window);
        let mut opp_pts_w = TrailingWindow::new(window);
        for row in by_team {
            if current != Some(row.team_id) {
                current = Some(row.team_id);
                own_w = TrailingVectorWindow::new(window);
                pts_w = TrailingWindow::new(window);
                opp_pts_w = TrailingWindow::new(window);
            }
            // Last row per team wins; each value excludes that row itself.
            forms.own.insert(row.team_id, own_w.mean());
            forms.last_pts.insert(row.team_id, pts_w.mean());
            forms.last_opp_pts.insert(row.team_id, opp_pts_w.mean());
            own_w.push(row.own);
            pts_w.push(row.points.map(|p| p as f64));
            opp_pts_w.push(row.opp_points.map(|p| p as f64));
        }

        let mut by_opponent: Vec<&FeatureRow> = rows.iter().collect();
        by_opponent.sort_by(|a, b| a.opponent_id.cmp(&b.opponent_id).then(a.date.cmp(&b.date)));
        let mut current: Option<i64> = None;
        let mut opp_w = TrailingVectorWindow::<STAT_COUNT>::new(window);
        for row in by_opponent {
            if current != Some(row.opponent_id) {
                current = Some(row.opponent_id);
                opp_w = TrailingVectorWindow::new(window);
            }
            forms.as_opponent.insert(row.opponent_id, opp_w.mean());
            opp_w.push(row.opp);
        }

        forms
    }

    /// Raw (unscaled) features for a matchup; `None` where no history exists.
    pub fn project(&self, matchup: &Matchup) -> [Option<f64>; FEATURE_COUNT] {
        let mut out = [None; FEATURE_COUNT];
        if let Some(Some(own)) = self.own.get(&matchup.team_id) {
            for (slot, v) in out[..STAT_COUNT].iter_mut().zip(own) {
                *slot = Some(*v);
            }
        }
        if let Some(Some(opp)) = self.as_opponent.get(&matchup.opponent_id) {
            for (slot, v) in out[STAT_COUNT..HOME_IDX].iter_mut().zip(opp) {
                *slot = Some(*v);
            }
        }
        out[HOME_IDX] = Some(if matchup.home { 1.0 } else { 0.0 });
        out[LAST_PTS_IDX] = self.last_pts.get(&matchup.team_id).copied().flatten();
        out[LAST_OPP_PTS_IDX] = self.last_opp_pts.get(&matchup.team_id).copied().flatten();
        out
    }
}

/// Fills gaps with the training mean of the column, which the scaler maps to
/// exactly zero.
pub fn impute(projected: &[Option<f64>; FEATURE_COUNT], pipeline: &FittedPipeline) -> (FeatureVector, usize) {
    let means = &pipeline.scaler().means;
    let mut out = [0.0; FEATURE_COUNT];
    let mut imputed = 0;
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = match projected[i] {
            Some(v) => v,
            None => {
                imputed += 1;
                means[i]
            }
        };
    }
    (out, imputed)
}

pub fn predict_matchups(
    matchups: &[Matchup],
    pipeline: &FittedPipeline,
    history: &[FeatureRow],
    teams: &[Team],
) -> Result<Vec<MatchupPrediction>> {
    validate_matchups(teams, matchups)?;

    let names: HashMap<i64, &str> = teams.iter().map(|t| (t.id, t.name.as_str())).collect();
    let forms = TeamForms::from_history(history, pipeline.rolling_window());

    let mut out = Vec::with_capacity(matchups.len());
    for m in matchups {
        let (raw, imputed_features) = impute(&forms.project(m), pipeline);
        let win_probability = pipeline.predict_probability(&raw).clamp(0.0, 1.0);
        let predicted_win = win_probability >= 0.5;
        let team_name = names.get(&m.team_id).copied().unwrap_or_default().to_string();
        let opponent_name = names
            .get(&m.opponent_id)
            .copied()
            .unwrap_or_default()
            .to_string();
        if imputed_features > 0 {
            debug!(
                team_id = m.team_id,
                opponent_id = m.opponent_id,
                imputed_features,
                "matchup projected with missing form"
            );
        }
        out.push(MatchupPrediction {
            team_id: m.team_id,
            opponent_id: m.opponent_id,
            predicted_winner_name: if predicted_win {
                team_name.clone()
            } else {
                opponent_name.clone()
            },
            team_name,
            opponent_name,
            predicted_win,
            win_probability,
            imputed_features,
        });
    }
    info!(count = out.len(), "matchups predicted");
    Ok(out)
}
