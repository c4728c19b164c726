// CSV import of games, box scores, rosters and lineup stints into the row store.
//
// Each file type has a raw serde row, a reader-based loader that skips bad
// rows with a warning, and a path-based wrapper that attaches the path to
// I/O and CSV errors.

use std::io::Read;
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{info, warn};

use crate::aggregate::{LineupStint, PlayerId, SeasonId, StintSide, TeamId};
use crate::config::DataConfig;
use crate::db::{Database, GameRecord, PlayerGameRecord, RosterEntry};

const DATE_FORMAT: &str = "%Y-%m-%d";

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },
}

// ---------------------------------------------------------------------------
// Raw CSV serde structs (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawGame {
    game_id: i64,
    season_id: SeasonId,
    game_date: String,
    home_team_id: TeamId,
    away_team_id: TeamId,
    #[serde(default)]
    home_score: Option<i64>,
    #[serde(default)]
    away_score: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawBoxScore {
    game_id: i64,
    team_id: TeamId,
    player_id: PlayerId,
    #[serde(default)]
    minutes: Option<f64>,
    #[serde(default)]
    pts: Option<f64>,
    #[serde(default)]
    fgm: Option<f64>,
    #[serde(default)]
    fga: Option<f64>,
    #[serde(default)]
    tpm: Option<f64>,
    #[serde(default)]
    tpa: Option<f64>,
    #[serde(default)]
    ftm: Option<f64>,
    #[serde(default)]
    fta: Option<f64>,
    #[serde(default)]
    oreb: Option<f64>,
    #[serde(default)]
    dreb: Option<f64>,
    #[serde(default)]
    ast: Option<f64>,
    #[serde(default)]
    stl: Option<f64>,
    #[serde(default)]
    blk: Option<f64>,
    #[serde(default)]
    tov: Option<f64>,
    #[serde(default)]
    pf: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawRoster {
    player_id: PlayerId,
    season_id: SeasonId,
    team_id: TeamId,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawStint {
    stint_id: i64,
    game_id: i64,
    seconds: f64,
    home_team_id: TeamId,
    away_team_id: TeamId,
    home_pts: f64,
    away_pts: f64,
    h1: PlayerId,
    h2: PlayerId,
    h3: PlayerId,
    h4: PlayerId,
    h5: PlayerId,
    a1: PlayerId,
    a2: PlayerId,
    a3: PlayerId,
    a4: PlayerId,
    a5: PlayerId,
}

// ---------------------------------------------------------------------------
// Reader-based loaders
// ---------------------------------------------------------------------------

fn load_games_from_reader<R: Read>(rdr: R) -> Result<Vec<GameRecord>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut games = Vec::new();
    for result in reader.deserialize::<RawGame>() {
        match result {
            Ok(raw) => {
                let Ok(game_date) = NaiveDate::parse_from_str(raw.game_date.trim(), DATE_FORMAT) else {
                    warn!("skipping game {}: unparsable date '{}'", raw.game_id, raw.game_date);
                    continue;
                };
                games.push(GameRecord {
                    game_id: raw.game_id,
                    season_id: raw.season_id,
                    game_date,
                    home_team_id: raw.home_team_id,
                    away_team_id: raw.away_team_id,
                    home_score: raw.home_score,
                    away_score: raw.away_score,
                });
            }
            Err(e) => {
                warn!("skipping malformed game row: {}", e);
            }
        }
    }
    Ok(games)
}

fn load_box_scores_from_reader<R: Read>(rdr: R) -> Result<Vec<PlayerGameRecord>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut lines = Vec::new();
    for result in reader.deserialize::<RawBoxScore>() {
        match result {
            Ok(raw) => {
                let line = PlayerGameRecord {
                    game_id: raw.game_id,
                    team_id: raw.team_id,
                    player_id: raw.player_id,
                    minutes: raw.minutes,
                    pts: raw.pts,
                    fgm: raw.fgm,
                    fga: raw.fga,
                    tpm: raw.tpm,
                    tpa: raw.tpa,
                    ftm: raw.ftm,
                    fta: raw.fta,
                    oreb: raw.oreb,
                    dreb: raw.dreb,
                    ast: raw.ast,
                    stl: raw.stl,
                    blk: raw.blk,
                    tov: raw.tov,
                    pf: raw.pf,
                };
                if !line.stat_columns().iter().flatten().all(|v| v.is_finite()) {
                    warn!(
                        "skipping box score for player {} in game {}: non-finite stat value",
                        raw.player_id, raw.game_id
                    );
                    continue;
                }
                lines.push(line);
            }
            Err(e) => {
                warn!("skipping malformed box score row: {}", e);
            }
        }
    }
    Ok(lines)
}

fn load_roster_from_reader<R: Read>(rdr: R) -> Result<Vec<RosterEntry>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut entries = Vec::new();
    for result in reader.deserialize::<RawRoster>() {
        match result {
            Ok(raw) => entries.push(RosterEntry {
                player_id: raw.player_id,
                season_id: raw.season_id,
                team_id: raw.team_id,
                name: raw.name.trim().to_string(),
            }),
            Err(e) => {
                warn!("skipping malformed roster row: {}", e);
            }
        }
    }
    Ok(entries)
}

fn load_stints_from_reader<R: Read>(rdr: R) -> Result<Vec<LineupStint>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut stints = Vec::new();
    for result in reader.deserialize::<RawStint>() {
        match result {
            Ok(raw) => {
                if ![raw.seconds, raw.home_pts, raw.away_pts].iter().all(|v| v.is_finite()) {
                    warn!("skipping stint {}: non-finite seconds or points", raw.stint_id);
                    continue;
                }
                stints.push(LineupStint {
                    stint_id: raw.stint_id,
                    game_id: raw.game_id,
                    seconds: raw.seconds,
                    home: StintSide {
                        team_id: raw.home_team_id,
                        players: [raw.h1, raw.h2, raw.h3, raw.h4, raw.h5],
                        points: raw.home_pts,
                    },
                    away: StintSide {
                        team_id: raw.away_team_id,
                        players: [raw.a1, raw.a2, raw.a3, raw.a4, raw.a5],
                        points: raw.away_pts,
                    },
                });
            }
            Err(e) => {
                warn!("skipping malformed stint row: {}", e);
            }
        }
    }
    Ok(stints)
}

// ---------------------------------------------------------------------------
// Public path-based loaders
// ---------------------------------------------------------------------------

/// Open `path` and run a reader-based loader over it.
fn load_file<T, F>(path: &Path, load: F) -> Result<Vec<T>, ImportError>
where
    F: FnOnce(std::fs::File) -> Result<Vec<T>, csv::Error>,
{
    let file = std::fs::File::open(path).map_err(|e| ImportError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    load(file).map_err(|e| ImportError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

pub fn load_games(path: &Path) -> Result<Vec<GameRecord>, ImportError> {
    load_file(path, load_games_from_reader)
}

pub fn load_box_scores(path: &Path) -> Result<Vec<PlayerGameRecord>, ImportError> {
    load_file(path, load_box_scores_from_reader)
}

pub fn load_roster(path: &Path) -> Result<Vec<RosterEntry>, ImportError> {
    load_file(path, load_roster_from_reader)
}

pub fn load_stints(path: &Path) -> Result<Vec<LineupStint>, ImportError> {
    load_file(path, load_stints_from_reader)
}

/// Rows written per table by `import_data`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub games: usize,
    pub box_scores: usize,
    pub roster: usize,
    pub stints: usize,
}

/// Load every configured CSV and write it to `db`. Relative paths resolve
/// against `base_dir`. Rosters and stints are skipped when not configured.
pub fn import_data(db: &Database, data: &DataConfig, base_dir: &Path) -> anyhow::Result<ImportSummary> {
    let mut summary = ImportSummary::default();

    let games = load_games(&DataConfig::resolve(base_dir, &data.games))?;
    summary.games = db.import_games(&games).context("failed to import games")?;

    let box_scores = load_box_scores(&DataConfig::resolve(base_dir, &data.box_scores))?;
    summary.box_scores = db
        .import_player_games(&box_scores)
        .context("failed to import box scores")?;

    if let Some(path) = &data.rosters {
        let roster = load_roster(&DataConfig::resolve(base_dir, path))?;
        summary.roster = db.import_roster(&roster).context("failed to import roster")?;
    }

    if let Some(path) = &data.stints {
        let stints = load_stints(&DataConfig::resolve(base_dir, path))?;
        summary.stints = db.import_stints(&stints).context("failed to import stints")?;
    }

    info!(
        "Imported {} games, {} box scores, {} roster entries, {} stints",
        summary.games, summary.box_scores, summary.roster, summary.stints
    );
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
