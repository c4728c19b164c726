// Player Efficiency Rating.
//
// Unadjusted PER is a per-minute linear weighting of box-score events with
// league-derived weights. It is pace-adjusted to the league and scaled so the
// league itself rates 15.

use crate::aggregate::{LeagueSeasonAggregate, PlayerSeasonTotals};
use crate::metrics::{or_default, round_to, safe_div, TeamContext};

const LEAGUE_AVERAGE_PER: f64 = 15.0;

/// League-wide weights feeding the unadjusted PER formula.
#[derive(Debug, Clone, Copy, PartialEq)]
struct LeagueWeights {
    factor: f64,
    /// Value of a possession.
    vop: f64,
    /// League defensive rebound share of all rebounds.
    drb_pct: f64,
    ft_per_pf: f64,
    fta_per_pf: f64,
}

impl LeagueWeights {
    fn from_league(league: &LeagueSeasonAggregate) -> Self {
        let lg = &league.totals;
        Self {
            factor: or_default(
                2.0 / 3.0 - safe_div(0.5 * safe_div(lg.ast, lg.fgm), 2.0 * safe_div(lg.fgm, lg.ftm)),
                0.44,
            ),
            vop: or_default(safe_div(lg.pts, lg.fga - lg.oreb + lg.tov + 0.44 * lg.fta), 1.0),
            drb_pct: or_default(safe_div(lg.reb - lg.oreb, lg.reb), 0.7),
            ft_per_pf: safe_div(lg.ftm, lg.pf),
            fta_per_pf: safe_div(lg.fta, lg.pf),
        }
    }
}

/// Season totals for one unadjusted-PER evaluation.
#[derive(Debug, Clone, Copy, Default)]
struct PerLine {
    min: f64,
    tpm: f64,
    ast: f64,
    fgm: f64,
    fga: f64,
    ftm: f64,
    fta: f64,
    tov: f64,
    trb: f64,
    orb: f64,
    stl: f64,
    blk: f64,
    pf: f64,
    /// Assist ratio (AST / FGM) of the team the line played for.
    team_ast_ratio: f64,
}

fn unadjusted_per(line: &PerLine, w: &LeagueWeights) -> f64 {
    let ar = line.team_ast_ratio;
    let u = line.tpm + (2.0 / 3.0) * line.ast + (2.0 - w.factor * ar) * line.fgm
        + line.ftm * 0.5 * (1.0 + (1.0 - ar) + (2.0 / 3.0) * ar)
        - w.vop * line.tov
        - w.vop * w.drb_pct * (line.fga - line.fgm)
        - w.vop * 0.44 * (0.44 + 0.56 * w.drb_pct) * (line.fta - line.ftm)
        + w.vop * (1.0 - w.drb_pct) * (line.trb - line.orb)
        + w.vop * w.drb_pct * line.orb
        + line.stl
        + w.vop * w.drb_pct * line.blk
        - line.pf * (w.ft_per_pf - 0.44 * w.fta_per_pf * w.vop);
    safe_div(u, line.min)
}

/// PER to one decimal. `gp` and `min_avg` are passed separately so callers can
/// evaluate partial seasons; no minutes gives 0, as does any non-finite result.
pub fn compute_per(
    p: &PlayerSeasonTotals,
    gp: u32,
    min_avg: f64,
    team: &TeamContext<'_>,
    league: &LeagueSeasonAggregate,
) -> f64 {
    let games = gp as f64;
    let mp = games * min_avg;
    if mp <= 0.0 {
        return 0.0;
    }
    let weights = LeagueWeights::from_league(league);
    let t = &team.aggregate.team;

    let player = PerLine {
        min: mp,
        tpm: p.total_tpm,
        ast: p.ast * games,
        fgm: p.total_fgm,
        fga: p.total_fga,
        ftm: p.total_ftm,
        fta: p.total_fta,
        tov: p.tov * games,
        trb: p.reb * games,
        orb: p.avg_off_reb * games,
        stl: p.stl * games,
        blk: p.blk * games,
        pf: p.avg_pf * games,
        team_ast_ratio: safe_div(t.ast, t.fgm),
    };
    let uper = unadjusted_per(&player, &weights);

    let pace_adjustment = or_default(safe_div(league.lg_pace, team.pace()), 1.0);

    let lg = &league.totals;
    let league_line = PerLine {
        min: lg.min,
        tpm: lg.tpm,
        ast: lg.ast,
        fgm: lg.fgm,
        fga: lg.fga,
        ftm: lg.ftm,
        fta: lg.fta,
        tov: lg.tov,
        trb: lg.reb,
        orb: lg.oreb,
        stl: lg.stl,
        blk: lg.blk,
        pf: lg.pf,
        team_ast_ratio: safe_div(lg.ast, lg.fgm),
    };
    let league_aper = unadjusted_per(&league_line, &weights);

    let value = if league_aper != 0.0 {
        pace_adjustment * uper * LEAGUE_AVERAGE_PER / league_aper
    } else {
        f64::NAN
    };
    if value.is_finite() {
        round_to(value, 1)
    } else {
        0.0
    }
}
