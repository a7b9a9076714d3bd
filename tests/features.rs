mod common;

use wnba_predictor::build_features_from;
use wnba_predictor::features::{FEATURE_COUNT, HOME_IDX, LAST_PTS_IDX};
use wnba_predictor::records::{GameRecord, Location};

use common::{date, game, season_stat, stat_line, teams};

/// Lynx play the Liberty four times in 2024 scoring 70, 80, 90, 60.
fn four_game_log() -> Vec<GameRecord> {
    [70, 80, 90, 60]
        .iter()
        .enumerate()
        .map(|(idx, pts)| {
            game(
                1,
                2024,
                date(2024, idx as u64 * 3),
                "New York Liberty",
                if idx % 2 == 0 { Location::Home } else { Location::Away },
                *pts,
                75,
            )
        })
        .collect()
}

#[test]
fn rolling_points_only_use_earlier_games() {
    let stats = vec![season_stat(1, 2024), season_stat(2, 2024)];
    let table = build_features_from(&teams(), &four_game_log(), &stats, 3);

    // First game has no earlier points and is dropped.
    assert_eq!(table.rows.len(), 3);
    assert_eq!(table.report.missing_features, 1);
    assert_eq!(table.rows[0].last_3_pts, 70.0);
    assert_eq!(table.rows[1].last_3_pts, 75.0);
    assert_eq!(table.rows[2].last_3_pts, 80.0);
    assert_eq!(table.rows[2].last_3_opp_pts, 75.0);
    assert_eq!(table.rows[2].points, Some(60));
}

#[test]
fn current_result_never_leaks_into_its_own_row() {
    let stats = vec![season_stat(1, 2024), season_stat(2, 2024)];
    let base = build_features_from(&teams(), &four_game_log(), &stats, 3);

    let mut changed = four_game_log();
    changed[2].points = Some(140);
    changed[2].result = Some("W".to_string());
    let perturbed = build_features_from(&teams(), &changed, &stats, 3);

    // Third game's own features are untouched; only the fourth one moves.
    assert_eq!(base.rows[1].features(), perturbed.rows[1].features());
    assert_ne!(
        base.rows[2].features()[LAST_PTS_IDX],
        perturbed.rows[2].features()[LAST_PTS_IDX]
    );
}

#[test]
fn season_stats_are_copied_verbatim_for_both_sides() {
    let stats = vec![season_stat(1, 2024), season_stat(2, 2024)];
    let table = build_features_from(&teams(), &four_game_log(), &stats, 3);
    let row = &table.rows[0];
    assert_eq!(Some(row.own), stat_line(1, 2024).complete());
    assert_eq!(Some(row.opp), stat_line(2, 2024).complete());
    assert_eq!(row.opponent_id, 2);
    assert!(!row.home);
    assert_eq!(row.features()[HOME_IDX], 0.0);
    assert_eq!(table.columns.len(), FEATURE_COUNT);
    assert_eq!(table.raw_stat_columns.len(), 21);
}

#[test]
fn building_twice_gives_identical_tables() {
    let store = common::league(&[2023, 2024], 3);
    let a = build_features_from(&store.teams, &store.games, &store.stats, 3);
    let b = build_features_from(&store.teams, &store.games, &store.stats, 3);
    assert_eq!(a.rows, b.rows);
    assert_eq!(a.report, b.report);
}

#[test]
fn rolling_window_spans_season_boundaries() {
    let store = common::league(&[2023, 2024], 2);
    let table = build_features_from(&store.teams, &store.games, &store.stats, 3);
    // Only each team's very first game lacks history.
    assert_eq!(table.report.missing_features, store.teams.len());
    assert_eq!(table.rows.len(), store.games.len() - store.teams.len());
    assert!(table.rows.iter().any(|r| r.season == 2024));
}

#[test]
fn duplicate_stat_rows_are_reported_and_skipped() {
    let stats = vec![season_stat(1, 2024), season_stat(1, 2024), season_stat(2, 2024)];
    let table = build_features_from(&teams(), &four_game_log(), &stats, 3);
    assert!(table.rows.is_empty());
    assert_eq!(table.report.duplicate_stats, 4);
    assert!(table.report.duplicate_keys.contains(&(1, 2024)));
    assert!(table.report.has_integrity_issues());
    assert_eq!(table.report.integrity_errors().len(), 1);
}

#[test]
fn unresolved_opponents_are_counted_not_fatal() {
    let stats = vec![season_stat(1, 2024), season_stat(2, 2024)];
    let mut games = four_game_log();
    games[3].opponent_name = "Atlantis Tides".to_string();
    games[1].opponent_name = "  new york   LIBERTY ".to_string();
    let table = build_features_from(&teams(), &games, &stats, 3);

    assert_eq!(table.report.unresolved_opponent, 1);
    assert!(table.report.unresolved_names.contains("Atlantis Tides"));
    // Loosely spelled name still resolves.
    assert_eq!(table.rows.len(), 2);
    assert!(table.rows.iter().all(|r| r.opponent_id == 2));
}

#[test]
fn incomplete_stat_line_drops_the_game() {
    let mut own = season_stat(1, 2024);
    own.stats.fg3_pct = None;
    let stats = vec![own, season_stat(2, 2024)];
    let table = build_features_from(&teams(), &four_game_log(), &stats, 3);
    assert!(table.rows.is_empty());
    assert_eq!(table.report.missing_features, 4);
    assert_eq!(table.report.missing_stats, 0);
}

#[test]
fn missing_season_stats_are_counted() {
    let stats = vec![season_stat(1, 2024)];
    let table = build_features_from(&teams(), &four_game_log(), &stats, 3);
    assert!(table.rows.is_empty());
    assert_eq!(table.report.missing_stats, 4);
}

#[test]
fn each_dropped_game_is_counted_once() {
    let table = build_features_from(&teams(), &four_game_log(), &[], 3);
    assert!(table.rows.is_empty());
    // Both sides are missing, but every game is one loss.
    assert_eq!(table.report.missing_stats, 4);

    let stats = vec![season_stat(1, 2024), season_stat(1, 2024)];
    let table = build_features_from(&teams(), &four_game_log(), &stats, 3);
    assert_eq!(table.report.duplicate_stats, 4);
    assert_eq!(table.report.missing_stats, 0);
    assert_eq!(
        table.report.duplicate_stats + table.report.missing_stats,
        table.report.games_total
    );
}

#[test]
fn labels_follow_the_result_column() {
    let stats = vec![season_stat(1, 2024), season_stat(2, 2024)];
    let table = build_features_from(&teams(), &four_game_log(), &stats, 3);
    // 80 and 90 beat 75, 60 does not.
    assert_eq!(table.labels(), vec![1, 1, 0]);
}
