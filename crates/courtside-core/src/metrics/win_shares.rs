// Win Shares: offensive and defensive credit measured in wins.
//
// Both halves are marginal points divided by the marginal points that buy a
// win for this team's pace. Offense compares points produced against 92% of
// league scoring on the same possessions. Defense credits points saved
// against the league per-possession rate, plus a small replacement-level
// floor.

use serde::{Deserialize, Serialize};

use crate::aggregate::{LeagueSeasonAggregate, TeamSeasonAggregate};
use crate::metrics::{round_to, team_pace, GAME_MINUTES};

/// Players on court per team.
const COURT_SLOTS: f64 = 5.0;
/// Share of league scoring a replacement-level offense produces.
const REPLACEMENT_OFFENSE: f64 = 0.92;
/// Replacement-level defensive credit per opponent possession, as a share of
/// league points per possession.
const REPLACEMENT_DEFENSE: f64 = 0.08;

/// Rating Engine outputs and possession context for one player.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WinSharesInputs {
    pub pprod: Option<f64>,
    pub tot_poss: Option<f64>,
    /// The already-rounded defensive rating.
    pub def_rtg: Option<f64>,
    pub total_min: f64,
    pub team_poss: f64,
    pub opp_poss: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WinShares {
    pub ows: f64,
    pub dws: f64,
    pub ws: f64,
    pub ws_40: f64,
}

/// Compute Win Shares, or `None` unless every input is present and every
/// denominator positive. There are no partial results.
pub fn compute_win_shares(
    inputs: &WinSharesInputs,
    team: &TeamSeasonAggregate,
    league: &LeagueSeasonAggregate,
) -> Option<WinShares> {
    let (Some(pprod), Some(tot_poss), Some(def_rtg)) = (inputs.pprod, inputs.tot_poss, inputs.def_rtg)
    else {
        return None;
    };
    if inputs.total_min <= 0.0 || inputs.team_poss <= 0.0 || inputs.opp_poss <= 0.0 {
        return None;
    }
    let lg = &league.totals;
    if lg.pts <= 0.0 || league.lg_poss <= 0.0 || league.lg_pace <= 0.0 || lg.min <= 0.0 {
        return None;
    }
    if team.team.min <= 0.0 {
        return None;
    }

    // League minutes over one team-game's worth of minutes
    let team_games = lg.min / (COURT_SLOTS * GAME_MINUTES);
    let lg_pts_per_game = lg.pts / team_games;
    let lg_pts_per_poss = lg.pts / league.lg_poss;

    let pace = team_pace(inputs.team_poss, team.team.min);
    let marginal_pts_per_win = 2.0 * lg_pts_per_game * pace / league.lg_pace;

    let marginal_offense = (pprod - REPLACEMENT_OFFENSE * lg_pts_per_poss * tot_poss).max(0.0);
    let ows = marginal_offense / marginal_pts_per_win;

    let minute_share = inputs.total_min / team.team.min;
    let points_saved = minute_share * inputs.opp_poss * (lg_pts_per_poss - def_rtg / 100.0);
    let replacement = minute_share * inputs.opp_poss * REPLACEMENT_DEFENSE * lg_pts_per_poss;
    let dws = (points_saved + replacement) / marginal_pts_per_win;

    let ws = ows + dws;
    Some(WinShares {
        ows: round_to(ows, 2),
        dws: round_to(dws, 2),
        ws: round_to(ws, 2),
        ws_40: round_to(ws / inputs.total_min * GAME_MINUTES, 3),
    })
}
