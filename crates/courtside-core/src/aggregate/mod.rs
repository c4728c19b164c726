// Season-scoped records: player totals, team/opponent aggregates, league
// normalization constants and plus-minus segments.

pub mod builder;

use serde::{Deserialize, Serialize};

use crate::metrics::possessions::simple_possessions;
use crate::metrics::{safe_div, GAME_MINUTES};

pub type PlayerId = i64;
pub type TeamId = i64;
pub type SeasonId = i64;

/// Stat columns of a player-game row, in the order `BoxTotals::from_columns`
/// expects them. Shared by the schema, the importer and the builder SQL.
pub const BOX_COLUMNS: [&str; 15] = [
    "minutes", "pts", "fgm", "fga", "tpm", "tpa", "ftm", "fta", "oreb", "dreb", "ast", "stl",
    "blk", "tov", "pf",
];

// ---------------------------------------------------------------------------
// Box totals
// ---------------------------------------------------------------------------

/// Summed counting stats for one side of the ball over some set of games.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoxTotals {
    pub min: f64,
    pub pts: f64,
    pub fgm: f64,
    pub fga: f64,
    pub tpm: f64,
    pub tpa: f64,
    pub ftm: f64,
    pub fta: f64,
    pub oreb: f64,
    pub dreb: f64,
    pub reb: f64,
    pub ast: f64,
    pub stl: f64,
    pub blk: f64,
    pub tov: f64,
    pub pf: f64,
}

impl BoxTotals {
    /// Build from column values laid out in `BOX_COLUMNS` order. Total
    /// rebounds are derived from the offensive/defensive split.
    pub fn from_columns(c: [f64; 15]) -> Self {
        Self {
            min: c[0],
            pts: c[1],
            fgm: c[2],
            fga: c[3],
            tpm: c[4],
            tpa: c[5],
            ftm: c[6],
            fta: c[7],
            oreb: c[8],
            dreb: c[9],
            reb: c[8] + c[9],
            ast: c[10],
            stl: c[11],
            blk: c[12],
            tov: c[13],
            pf: c[14],
        }
    }
}

// ---------------------------------------------------------------------------
// Player season totals
// ---------------------------------------------------------------------------

/// One player's season row as handed over by the query layer.
///
/// `min`, `pts`, `reb`, `ast`, `stl`, `blk`, `tov` and the `avg_*` fields are
/// per-game averages; the `total_*` shooting fields are season totals.
/// `raw_plus_minus` is the minute-scaled team margin over the games the
/// player appeared in, used when no lineup-stint data covers the player.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerSeasonTotals {
    pub player_id: PlayerId,
    pub team_id: Option<TeamId>,
    #[serde(default)]
    pub name: String,
    pub gp: u32,
    pub min: f64,
    pub pts: f64,
    pub reb: f64,
    pub ast: f64,
    pub stl: f64,
    pub blk: f64,
    pub tov: f64,
    pub total_fgm: f64,
    pub total_fga: f64,
    pub total_tpm: f64,
    pub total_tpa: f64,
    pub total_ftm: f64,
    pub total_fta: f64,
    pub avg_off_reb: f64,
    pub avg_def_reb: f64,
    pub avg_pf: f64,
    #[serde(default)]
    pub raw_plus_minus: f64,
}

impl PlayerSeasonTotals {
    /// Convert season sums into the averaged row shape. Every average is 0
    /// when the player has no games.
    pub fn from_sums(
        player_id: PlayerId,
        team_id: Option<TeamId>,
        name: String,
        gp: u32,
        sums: &BoxTotals,
    ) -> Self {
        let games = gp as f64;
        let avg = |v: f64| safe_div(v, games);
        Self {
            player_id,
            team_id,
            name,
            gp,
            min: avg(sums.min),
            pts: avg(sums.pts),
            reb: avg(sums.reb),
            ast: avg(sums.ast),
            stl: avg(sums.stl),
            blk: avg(sums.blk),
            tov: avg(sums.tov),
            total_fgm: sums.fgm,
            total_fga: sums.fga,
            total_tpm: sums.tpm,
            total_tpa: sums.tpa,
            total_ftm: sums.ftm,
            total_fta: sums.fta,
            avg_off_reb: avg(sums.oreb),
            avg_def_reb: avg(sums.dreb),
            avg_pf: avg(sums.pf),
            raw_plus_minus: 0.0,
        }
    }

    /// Scale a per-game average back up to a season total.
    pub fn total(&self, per_game: f64) -> f64 {
        per_game * self.gp as f64
    }

    pub fn total_minutes(&self) -> f64 {
        self.total(self.min)
    }
}

// ---------------------------------------------------------------------------
// Team and league aggregates
// ---------------------------------------------------------------------------

/// A team's season totals alongside its opponents' totals over the same games.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamSeasonAggregate {
    pub team_id: TeamId,
    pub season_id: SeasonId,
    pub games: u32,
    pub wins: u32,
    pub losses: u32,
    pub team: BoxTotals,
    pub opp: BoxTotals,
}

/// League-wide season sums, used only as normalization constants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeagueSeasonAggregate {
    pub season_id: SeasonId,
    pub totals: BoxTotals,
    pub lg_poss: f64,
    pub lg_pace: f64,
}

impl LeagueSeasonAggregate {
    /// Derive possessions and pace from raw league sums. Pace is per team per
    /// regulation game and is 0 for a league without minutes.
    pub fn from_totals(season_id: SeasonId, totals: BoxTotals) -> Self {
        let lg_poss = simple_possessions(totals.fga, totals.fta, totals.tov, totals.oreb);
        let lg_pace = if totals.min > 0.0 {
            GAME_MINUTES * lg_poss / (totals.min / 5.0)
        } else {
            0.0
        };
        Self {
            season_id,
            totals,
            lg_poss,
            lg_pace,
        }
    }
}

// ---------------------------------------------------------------------------
// Plus-minus
// ---------------------------------------------------------------------------

/// Score differential accumulated by one player while playing for one team.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlusMinusSegment {
    pub team_id: TeamId,
    pub total_pm: f64,
    pub on_court_seconds: f64,
}

/// A player's plus-minus split per team, so mid-season trades keep each
/// stretch tied to the right team's possession rate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlusMinusAggregate {
    pub player_id: PlayerId,
    pub segments: Vec<PlusMinusSegment>,
}

impl PlusMinusAggregate {
    pub fn total_pm(&self) -> f64 {
        self.segments.iter().map(|s| s.total_pm).sum()
    }
}

/// One team's five players and points scored during a stint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StintSide {
    pub team_id: TeamId,
    pub players: [PlayerId; 5],
    pub points: f64,
}

/// A stretch of game time with both lineups unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineupStint {
    pub stint_id: i64,
    pub game_id: i64,
    pub seconds: f64,
    pub home: StintSide,
    pub away: StintSide,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_totals_derive_rebounds() {
        let b = BoxTotals::from_columns([
            200.0, 80.0, 30.0, 60.0, 6.0, 20.0, 14.0, 20.0, 9.0, 25.0, 18.0, 7.0, 3.0, 12.0, 19.0,
        ]);
        assert_eq!(b.reb, 34.0);
        assert_eq!(b.pf, 19.0);
        assert_eq!(b.fga, 60.0);
    }

    #[test]
    fn from_sums_averages_per_game() {
        let sums = BoxTotals {
            min: 300.0,
            pts: 180.0,
            fgm: 70.0,
            fga: 140.0,
            oreb: 10.0,
            dreb: 40.0,
            reb: 50.0,
            pf: 20.0,
            ..Default::default()
        };
        let p = PlayerSeasonTotals::from_sums(7, Some(1), "Test".into(), 10, &sums);
        assert_eq!(p.min, 30.0);
        assert_eq!(p.pts, 18.0);
        assert_eq!(p.reb, 5.0);
        assert_eq!(p.avg_off_reb, 1.0);
        assert_eq!(p.total_fga, 140.0);
        assert_eq!(p.total_minutes(), 300.0);
    }

    #[test]
    fn from_sums_with_no_games_is_all_zero() {
        let p = PlayerSeasonTotals::from_sums(7, None, String::new(), 0, &BoxTotals::default());
        assert_eq!(p.min, 0.0);
        assert_eq!(p.pts, 0.0);
        assert_eq!(p.total_minutes(), 0.0);
    }

    #[test]
    fn league_pace_from_totals() {
        let totals = BoxTotals {
            min: 20000.0,
            fga: 6000.0,
            fta: 1700.0,
            tov: 1100.0,
            oreb: 1050.0,
            ..Default::default()
        };
        let lg = LeagueSeasonAggregate::from_totals(2024, totals);
        assert!((lg.lg_poss - 6798.0).abs() < 1e-9);
        assert!((lg.lg_pace - 67.98).abs() < 1e-9);
    }

    #[test]
    fn league_without_minutes_has_zero_pace() {
        let lg = LeagueSeasonAggregate::from_totals(2024, BoxTotals::default());
        assert_eq!(lg.lg_pace, 0.0);
        assert_eq!(lg.lg_poss, 0.0);
    }

    #[test]
    fn plus_minus_total_sums_segments() {
        let agg = PlusMinusAggregate {
            player_id: 1,
            segments: vec![
                PlusMinusSegment { team_id: 1, total_pm: 12.0, on_court_seconds: 600.0 },
                PlusMinusSegment { team_id: 2, total_pm: -5.0, on_court_seconds: 300.0 },
            ],
        };
        assert_eq!(agg.total_pm(), 7.0);
    }
}
