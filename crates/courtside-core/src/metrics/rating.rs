// Individual offensive and defensive ratings.
//
// Offense follows the points-produced / individual-possessions decomposition:
// credit for each scoring possession is split between the shooter, the
// passer, the free-throw shooter and the offensive rebounder using team-level
// weights. Defense starts from the team's points allowed per 100 opponent
// possessions and individualizes it through a stop-percentage estimate.

use serde::{Deserialize, Serialize};

use crate::aggregate::PlayerSeasonTotals;
use crate::metrics::{round_to, safe_div, TeamContext};

const MIN_DEF_RTG: f64 = 50.0;
const MAX_DEF_RTG: f64 = 150.0;

/// Offensive rating plus the intermediate terms Win Shares consumes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OffensiveRating {
    /// Points produced per 100 individual possessions, one decimal.
    pub off_rtg: f64,
    /// Points produced (unrounded).
    pub pprod: f64,
    /// Individual possessions used (unrounded).
    pub tot_poss: f64,
}

/// Compute a player's offensive rating from season totals and team context.
///
/// Returns `None` when the player used no possessions. A player who used
/// possessions but produced nothing (a turnovers-only line) is rated zero,
/// which keeps "rated as zero" distinct from "not ratable".
pub fn compute_player_off_rtg(p: &PlayerSeasonTotals, team: &TeamContext<'_>) -> Option<OffensiveRating> {
    let t = &team.aggregate.team;
    let o = &team.aggregate.opp;

    let mp = p.total_minutes();
    let pts = p.total(p.pts);
    let ast = p.total(p.ast);
    let orb = p.total(p.avg_off_reb);
    let tov = p.total(p.tov);
    let (fgm, fga, tpm, ftm, fta) = (p.total_fgm, p.total_fga, p.total_tpm, p.total_ftm, p.total_fta);

    // Share of the team's court time
    let share = safe_div(mp, t.min / 5.0);

    // Fraction of the player's made shots that were assisted
    let q_ast = share * (1.14 * safe_div(t.ast - ast, t.fgm))
        + safe_div(
            safe_div(t.ast, t.min) * mp * 5.0 - ast,
            safe_div(t.fgm, t.min) * mp * 5.0 - fgm,
        ) * (1.0 - share);
    let fg_credit = 1.0 - 0.5 * safe_div(pts - ftm, 2.0 * fga) * q_ast;
    let teammate_shooting = safe_div((t.pts - t.ftm) - (pts - ftm), 2.0 * (t.fga - fga));

    let fg_part = fgm * fg_credit;
    let ast_part = 0.5 * teammate_shooting * ast;
    let ft_part = (1.0 - (1.0 - safe_div(ftm, fta)).powi(2)) * 0.4 * fta;

    let team_scoring_poss = t.fgm + (1.0 - (1.0 - safe_div(t.ftm, t.fta)).powi(2)) * t.fta * 0.4;
    let team_orb_pct = safe_div(t.oreb, t.oreb + (o.reb - o.oreb));
    let team_play_pct = safe_div(team_scoring_poss, t.fga + t.fta * 0.4 + t.tov);
    let team_orb_weight = safe_div(
        (1.0 - team_orb_pct) * team_play_pct,
        (1.0 - team_orb_pct) * team_play_pct + team_orb_pct * (1.0 - team_play_pct),
    );

    let orb_part = orb * team_orb_weight * team_play_pct;
    // Discount for scoring possessions the offensive rebounder already claimed
    let orb_discount = 1.0 - safe_div(t.oreb, team_scoring_poss) * team_orb_weight * team_play_pct;

    let sc_poss = (fg_part + ast_part + ft_part) * orb_discount + orb_part;
    let fg_x_poss = (fga - fgm) * (1.0 - 1.07 * team_orb_pct);
    let ft_x_poss = (1.0 - safe_div(ftm, fta)).powi(2) * 0.4 * fta;
    let tot_poss = sc_poss + fg_x_poss + ft_x_poss + tov;

    let pprod_fg = 2.0 * (fgm + 0.5 * tpm) * fg_credit;
    let pprod_ast = 2.0
        * safe_div(t.fgm - fgm + 0.5 * (t.tpm - tpm), t.fgm - fgm)
        * 0.5
        * teammate_shooting
        * ast;
    let pprod_orb = orb * team_orb_weight * team_play_pct * safe_div(t.pts, team_scoring_poss);
    let pprod = (pprod_fg + pprod_ast + ftm) * orb_discount + pprod_orb;

    if tot_poss <= 0.0 {
        return None;
    }
    if pprod <= 0.0 {
        return Some(OffensiveRating {
            off_rtg: 0.0,
            pprod: 0.0,
            tot_poss,
        });
    }
    Some(OffensiveRating {
        off_rtg: round_to(100.0 * pprod / tot_poss, 1),
        pprod,
        tot_poss,
    })
}

/// Compute a player's defensive rating.
///
/// Returns `None` when the opponents have no possessions. With no player or
/// team minutes to individualize against, the team baseline is returned.
/// Otherwise `team_drtg * (1 - 0.2 * stop_pct)`, clamped to [50, 150].
pub fn compute_player_def_rtg(p: &PlayerSeasonTotals, team: &TeamContext<'_>, total_min: f64) -> Option<f64> {
    let t = &team.aggregate.team;
    let o = &team.aggregate.opp;
    let opp_poss = team.opp_poss;
    if opp_poss <= 0.0 {
        return None;
    }
    let team_drtg = 100.0 * o.pts / opp_poss;
    if total_min <= 0.0 || t.min <= 0.0 {
        return Some(round_to(team_drtg, 1));
    }

    let stl = p.total(p.stl);
    let blk = p.total(p.blk);
    let drb = p.total(p.avg_def_reb);
    let pf = p.total(p.avg_pf);

    let opp_orb_pct = safe_div(o.oreb, o.oreb + t.dreb);
    let opp_fg_pct = safe_div(o.fgm, o.fga);
    // Weight of forced misses against defensive rebounds
    let fm_wt = safe_div(
        opp_fg_pct * (1.0 - opp_orb_pct),
        opp_fg_pct * (1.0 - opp_orb_pct) + (1.0 - opp_fg_pct) * opp_orb_pct,
    );

    let individual_stops = stl + blk * fm_wt * (1.0 - 1.07 * opp_orb_pct) + drb * (1.0 - fm_wt);
    let team_share_stops = (safe_div(o.fga - o.fgm - t.blk, t.min) * fm_wt * (1.0 - 1.07 * opp_orb_pct)
        + safe_div(o.tov - t.stl, t.min))
        * total_min
        + safe_div(pf, t.pf) * 0.4 * o.fta * (1.0 - safe_div(o.ftm, o.fta)).powi(2);
    let stops = individual_stops + team_share_stops;

    let stop_pct = safe_div(stops * t.min, opp_poss * total_min);
    let def_rtg = (team_drtg * (1.0 - 0.2 * stop_pct)).clamp(MIN_DEF_RTG, MAX_DEF_RTG);
    Some(round_to(def_rtg, 1))
}

/// `off_rtg - def_rtg` to one decimal, when both exist.
pub fn net_rating(off_rtg: Option<f64>, def_rtg: Option<f64>) -> Option<f64> {
    match (off_rtg, def_rtg) {
        (Some(off), Some(def)) => Some(round_to(off - def, 1)),
        _ => None,
    }
}
