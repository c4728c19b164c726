// Season aggregates built with SQL over the row store.
//
// Every SUM is COALESCEd, so an empty season yields zeroed aggregates rather
// than NULL columns.

use std::collections::{BTreeSet, HashMap};

use anyhow::{bail, Context, Result};
use rusqlite::{params, Row};
use tracing::info;

use crate::aggregate::{
    BoxTotals, LeagueSeasonAggregate, PlayerId, PlayerSeasonTotals, SeasonId, TeamId,
    TeamSeasonAggregate, BOX_COLUMNS,
};
use crate::db::Database;
use crate::metrics::GAME_MINUTES;

/// `COALESCE(SUM(<prefix>.<col>), 0) AS <alias_prefix><col>` for every box column.
fn sum_columns(prefix: &str, alias_prefix: &str) -> String {
    BOX_COLUMNS
        .iter()
        .map(|c| format!("COALESCE(SUM({prefix}.{c}), 0) AS {alias_prefix}{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Read the 15 box columns starting at `start`.
fn box_totals(row: &Row<'_>, start: usize) -> rusqlite::Result<BoxTotals> {
    let mut cols = [0.0; 15];
    for (i, col) in cols.iter_mut().enumerate() {
        *col = row.get(start + i)?;
    }
    Ok(BoxTotals::from_columns(cols))
}

/// Team and opponent totals for every team with box scores in the season.
///
/// Per-(game, team) subtotals are joined to the other team's subtotal in the
/// same game, so each team's `opp` covers exactly the games it played.
/// Wins and losses come from final scores; unscored games and ties count as
/// neither.
pub fn build_team_aggregates(db: &Database, season_id: SeasonId) -> Result<HashMap<TeamId, TeamSeasonAggregate>> {
    let sql = format!(
        "WITH side AS (
             SELECT pg.game_id, pg.team_id, {side_sums}
             FROM player_games pg
             JOIN games g ON g.game_id = pg.game_id
             WHERE g.season_id = ?1
             GROUP BY pg.game_id, pg.team_id
         )
         SELECT t.team_id,
                COUNT(*),
                COALESCE(SUM(CASE
                    WHEN g.home_score IS NULL OR g.away_score IS NULL THEN 0
                    WHEN t.team_id = g.home_team_id AND g.home_score > g.away_score THEN 1
                    WHEN t.team_id = g.away_team_id AND g.away_score > g.home_score THEN 1
                    ELSE 0 END), 0),
                COALESCE(SUM(CASE
                    WHEN g.home_score IS NULL OR g.away_score IS NULL THEN 0
                    WHEN t.team_id = g.home_team_id AND g.home_score < g.away_score THEN 1
                    WHEN t.team_id = g.away_team_id AND g.away_score < g.home_score THEN 1
                    ELSE 0 END), 0),
                {team_sums},
                {opp_sums}
         FROM side t
         JOIN side o ON o.game_id = t.game_id AND o.team_id <> t.team_id
         JOIN games g ON g.game_id = t.game_id
         GROUP BY t.team_id
         ORDER BY t.team_id",
        side_sums = sum_columns("pg", ""),
        team_sums = sum_columns("t", "team_"),
        opp_sums = sum_columns("o", "opp_"),
    );

    let conn = db.conn()?;
    let mut stmt = conn
        .prepare(&sql)
        .context("failed to prepare team aggregate query")?;
    let teams = stmt
        .query_map(params![season_id], |row| {
            let games: i64 = row.get(1)?;
            let wins: i64 = row.get(2)?;
            let losses: i64 = row.get(3)?;
            Ok(TeamSeasonAggregate {
                team_id: row.get(0)?,
                season_id,
                games: games as u32,
                wins: wins as u32,
                losses: losses as u32,
                team: box_totals(row, 4)?,
                opp: box_totals(row, 4 + BOX_COLUMNS.len())?,
            })
        })
        .context("failed to query team aggregates")?
        .map(|r| r.map(|agg| (agg.team_id, agg)))
        .collect::<std::result::Result<HashMap<_, _>, _>>()
        .context("failed to map team aggregate rows")?;

    info!("Built {} team aggregates for season {}", teams.len(), season_id);
    Ok(teams)
}

/// League-wide sums over every player-game of the season.
pub fn build_league_aggregate(db: &Database, season_id: SeasonId) -> Result<LeagueSeasonAggregate> {
    let sql = format!(
        "SELECT {sums}
         FROM player_games pg
         JOIN games g ON g.game_id = pg.game_id
         WHERE g.season_id = ?1",
        sums = sum_columns("pg", ""),
    );

    let conn = db.conn()?;
    let totals = conn
        .query_row(&sql, params![season_id], |row| box_totals(row, 0))
        .context("failed to query league aggregate")?;
    let league = LeagueSeasonAggregate::from_totals(season_id, totals);

    info!(
        "Built league aggregate for season {}: {:.1} possessions, pace {:.2}",
        season_id, league.lg_poss, league.lg_pace
    );
    Ok(league)
}

/// One row per player on the season roster or with a box score, ordered by
/// player id.
///
/// `gp` counts games with positive minutes. The team is the roster team when
/// there is one, otherwise the team of the player's most recent game. The
/// fallback plus-minus is the final margin of each game played, scaled by
/// the share of regulation the player was on court (capped at 1).
pub fn build_player_totals(db: &Database, season_id: SeasonId) -> Result<Vec<PlayerSeasonTotals>> {
    let conn = db.conn()?;

    // Box-score sums per player
    let sql = format!(
        "SELECT pg.player_id,
                COALESCE(SUM(CASE WHEN pg.minutes > 0 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE
                    WHEN pg.minutes > 0 AND g.home_score IS NOT NULL AND g.away_score IS NOT NULL
                    THEN (CASE WHEN pg.team_id = g.home_team_id
                               THEN g.home_score - g.away_score
                               ELSE g.away_score - g.home_score END)
                         * MIN(pg.minutes / ?2, 1.0)
                    ELSE 0 END), 0),
                {sums}
         FROM player_games pg
         JOIN games g ON g.game_id = pg.game_id
         WHERE g.season_id = ?1
         GROUP BY pg.player_id",
        sums = sum_columns("pg", ""),
    );
    let mut stmt = conn
        .prepare(&sql)
        .context("failed to prepare player totals query")?;
    let box_rows: HashMap<PlayerId, (u32, f64, BoxTotals)> = stmt
        .query_map(params![season_id, GAME_MINUTES], |row| {
            let player_id: PlayerId = row.get(0)?;
            let gp: i64 = row.get(1)?;
            let raw_pm: f64 = row.get(2)?;
            Ok((player_id, (gp as u32, raw_pm, box_totals(row, 3)?)))
        })
        .context("failed to query player totals")?
        .collect::<std::result::Result<HashMap<_, _>, _>>()
        .context("failed to map player totals rows")?;

    // Team of each player's most recent game; later rows overwrite earlier ones
    let mut stmt = conn
        .prepare(
            "SELECT pg.player_id, pg.team_id
             FROM player_games pg
             JOIN games g ON g.game_id = pg.game_id
             WHERE g.season_id = ?1
             ORDER BY g.game_date, g.game_id",
        )
        .context("failed to prepare latest team query")?;
    let latest_team: HashMap<PlayerId, TeamId> = stmt
        .query_map(params![season_id], |row| Ok((row.get(0)?, row.get(1)?)))
        .context("failed to query latest teams")?
        .collect::<std::result::Result<HashMap<_, _>, _>>()
        .context("failed to map latest team rows")?;

    // Roster presence
    let mut stmt = conn
        .prepare("SELECT player_id, team_id, name FROM roster WHERE season_id = ?1")
        .context("failed to prepare roster query")?;
    let roster: HashMap<PlayerId, (TeamId, String)> = stmt
        .query_map(params![season_id], |row| {
            Ok((row.get(0)?, (row.get(1)?, row.get(2)?)))
        })
        .context("failed to query roster")?
        .collect::<std::result::Result<HashMap<_, _>, _>>()
        .context("failed to map roster rows")?;

    let ids: BTreeSet<PlayerId> = box_rows.keys().chain(roster.keys()).copied().collect();

    let players: Vec<PlayerSeasonTotals> = ids
        .into_iter()
        .map(|player_id| {
            let (team_id, name) = match roster.get(&player_id) {
                Some((team_id, name)) => (Some(*team_id), name.clone()),
                None => (latest_team.get(&player_id).copied(), String::new()),
            };
            match box_rows.get(&player_id) {
                Some((gp, raw_pm, sums)) => PlayerSeasonTotals {
                    raw_plus_minus: *raw_pm,
                    ..PlayerSeasonTotals::from_sums(player_id, team_id, name, *gp, sums)
                },
                None => PlayerSeasonTotals::from_sums(player_id, team_id, name, 0, &BoxTotals::default()),
            }
        })
        .collect();

    let roster_only = players.iter().filter(|p| p.gp == 0).count();
    info!(
        "Built {} player rows for season {} ({} without games)",
        players.len(),
        season_id,
        roster_only
    );
    Ok(players)
}

/// The requested season, or the latest season with games.
pub fn resolve_season(db: &Database, requested: Option<SeasonId>) -> Result<SeasonId> {
    match requested {
        Some(id) => Ok(id),
        None => db.latest_season()?.context("no games found; nothing to compute"),
    }
}

/// Output rows: players with at least `min_games` games, narrowed to a single
/// player when one is asked for. Asking for a player that is filtered out or
/// absent is an error.
pub fn select_players(
    mut players: Vec<PlayerSeasonTotals>,
    min_games: u32,
    player: Option<PlayerId>,
) -> Result<Vec<PlayerSeasonTotals>> {
    players.retain(|p| p.gp >= min_games);
    if let Some(player_id) = player {
        players.retain(|p| p.player_id == player_id);
        if players.is_empty() {
            bail!("player {player_id} not found with at least {min_games} games");
        }
    }
    Ok(players)
}
