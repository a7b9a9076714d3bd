#![allow(dead_code)]

use chrono::{Days, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use wnba_predictor::records::{GameRecord, Location, STAT_COUNT, SeasonStat, StatLine, Team};
use wnba_predictor::store::MemoryStore;

pub const TEAMS: [(&str, &str); 4] = [
    ("MIN", "Minnesota Lynx"),
    ("NYL", "New York Liberty"),
    ("SEA", "Seattle Storm"),
    ("CHI", "Chicago Sky"),
];

pub fn teams() -> Vec<Team> {
    TEAMS
        .iter()
        .enumerate()
        .map(|(idx, (abbr, name))| Team {
            id: idx as i64 + 1,
            name: name.to_string(),
            abbreviation: abbr.to_string(),
        })
        .collect()
}

pub fn team_name(team_id: i64) -> String {
    TEAMS[(team_id - 1) as usize].1.to_string()
}

pub fn strength(team_id: i64, season: i32) -> f64 {
    ((team_id * 7 + i64::from(season) * 3) % 5) as f64
}

/// Complete season line whose values move with team strength.
pub fn stat_line(team_id: i64, season: i32) -> StatLine {
    let s = strength(team_id, season);
    let mut values = [None; STAT_COUNT];
    for (idx, slot) in values.iter_mut().enumerate() {
        *slot = Some(10.0 + idx as f64 + s * (1.0 + (idx % 3) as f64) + f64::from(season - 2020) * 0.1);
    }
    StatLine::from_values(values)
}

pub fn season_stat(team_id: i64, season: i32) -> SeasonStat {
    SeasonStat {
        team_id,
        season,
        games_played: Some(40),
        minutes_per_game: Some(200.0),
        stats: stat_line(team_id, season),
    }
}

pub fn game(
    team_id: i64,
    season: i32,
    date: NaiveDate,
    opponent: &str,
    location: Location,
    points: i64,
    opp_points: i64,
) -> GameRecord {
    GameRecord {
        team_id,
        season,
        date,
        location,
        opponent_name: opponent.to_string(),
        result: Some(if points > opp_points { "W" } else { "L" }.to_string()),
        points: Some(points),
        opp_points: Some(opp_points),
        wins: None,
        losses: None,
        streak: None,
    }
}

pub fn date(season: i32, offset: u64) -> NaiveDate {
    NaiveDate::from_ymd_opt(season, 5, 1)
        .unwrap()
        .checked_add_days(Days::new(offset))
        .unwrap()
}

/// Round-robin league: every pair meets once per round, one game per day,
/// and both sides of each game are logged.
pub fn league(seasons: &[i32], rounds: usize) -> MemoryStore {
    let teams = teams();
    let mut stats = Vec::new();
    let mut games = Vec::new();
    for &season in seasons {
        for team in &teams {
            stats.push(season_stat(team.id, season));
        }
        let mut day = 0u64;
        for round in 0..rounds {
            for a in 1..=teams.len() as i64 {
                for b in (a + 1)..=teams.len() as i64 {
                    let noise = ((round as i64 * 31 + a * 7 + b * 13 + i64::from(season)) % 5) as f64 - 2.0;
                    let a_wins = strength(a, season) + noise > strength(b, season);
                    let (a_pts, b_pts) = if a_wins {
                        (80 + (round as i64 % 7), 72 + (b % 4))
                    } else {
                        (71 + (a % 4), 79 + (round as i64 % 6))
                    };
                    let a_home = (round + a as usize) % 2 == 0;
                    let when = date(season, day);
                    day += 1;
                    games.push(game(
                        a,
                        season,
                        when,
                        &team_name(b),
                        if a_home { Location::Home } else { Location::Away },
                        a_pts,
                        b_pts,
                    ));
                    games.push(game(
                        b,
                        season,
                        when,
                        &team_name(a),
                        if a_home { Location::Away } else { Location::Home },
                        b_pts,
                        a_pts,
                    ));
                }
            }
        }
    }
    MemoryStore {
        teams,
        games,
        stats,
    }
}

/// Twelve-team league with random strengths, per-column stat noise and
/// noisy margins. Season lines of different teams are strongly collinear.
pub fn noisy_league(seasons: &[i32], seed: u64) -> MemoryStore {
    const NAMES: [&str; 12] = [
        "Atlanta Dream",
        "Chicago Sky",
        "Connecticut Sun",
        "Dallas Wings",
        "Indiana Fever",
        "Los Angeles Sparks",
        "Las Vegas Aces",
        "Minnesota Lynx",
        "New York Liberty",
        "Phoenix Mercury",
        "Seattle Storm",
        "Washington Mystics",
    ];
    let mut rng = StdRng::seed_from_u64(seed);
    let teams: Vec<Team> = NAMES
        .iter()
        .enumerate()
        .map(|(idx, name)| Team {
            id: idx as i64 + 1,
            name: name.to_string(),
            abbreviation: format!("T{idx:02}"),
        })
        .collect();

    let mut stats = Vec::new();
    let mut games = Vec::new();
    for &season in seasons {
        let mut strength = Vec::with_capacity(teams.len());
        for team in &teams {
            let s: f64 = rng.gen_range(-1.0..1.0);
            strength.push(s);
            let mut values = [None; STAT_COUNT];
            for (idx, slot) in values.iter_mut().enumerate() {
                *slot = Some(10.0 + idx as f64 + s * 3.0 + rng.gen_range(-0.5..0.5));
            }
            stats.push(SeasonStat {
                team_id: team.id,
                season,
                games_played: Some(40),
                minutes_per_game: Some(200.0),
                stats: StatLine::from_values(values),
            });
        }

        let mut day = 0u64;
        for _round in 0..3 {
            for a in 0..teams.len() {
                for b in (a + 1)..teams.len() {
                    let when = date(season, day);
                    day += 1;
                    let margin = ((strength[a] - strength[b]) * 8.0 + rng.gen_range(-12.0..12.0)).round() as i64;
                    let a_pts = 80 + margin / 2;
                    let b_pts = 80 - margin / 2 - 1;
                    let a_home = rng.gen_bool(0.5);
                    let (a_loc, b_loc) = if a_home {
                        (Location::Home, Location::Away)
                    } else {
                        (Location::Away, Location::Home)
                    };
                    games.push(game(teams[a].id, season, when, &teams[b].name, a_loc, a_pts, b_pts));
                    games.push(game(teams[b].id, season, when, &teams[a].name, b_loc, b_pts, a_pts));
                }
            }
        }
    }
    MemoryStore {
        teams,
        games,
        stats,
    }
}
