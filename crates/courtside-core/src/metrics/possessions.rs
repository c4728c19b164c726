// Possession estimation from box-score totals.

use serde::{Deserialize, Serialize};

use crate::aggregate::{BoxTotals, TeamSeasonAggregate};
use crate::metrics::{round_to, safe_div};

/// Which possession formula to apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PossessionStrategy {
    /// `FGA + 0.44*FTA + TOV - OREB`, one side at a time.
    #[default]
    Simple,
    /// Basketball-Reference's two-sided estimate, averaging team and opponent.
    BbrStandard,
}

/// The opposing side's box totals, needed only by `BbrStandard`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OpponentInputs {
    pub fga: f64,
    pub fta: f64,
    pub tov: f64,
    pub oreb: f64,
    pub fgm: f64,
    pub dreb: f64,
}

/// Inputs to a possession estimate. `fgm`, `dreb` and `opp` may be absent,
/// in which case `BbrStandard` falls back to the simple formula.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PossessionInputs {
    pub fga: f64,
    pub fta: f64,
    pub tov: f64,
    pub oreb: f64,
    pub fgm: Option<f64>,
    pub dreb: Option<f64>,
    pub opp: Option<OpponentInputs>,
}

impl PossessionInputs {
    /// Full two-sided inputs from a team's and its opponents' totals.
    pub fn from_box(team: &BoxTotals, opp: &BoxTotals) -> Self {
        Self {
            fga: team.fga,
            fta: team.fta,
            tov: team.tov,
            oreb: team.oreb,
            fgm: Some(team.fgm),
            dreb: Some(team.dreb),
            opp: Some(OpponentInputs {
                fga: opp.fga,
                fta: opp.fta,
                tov: opp.tov,
                oreb: opp.oreb,
                fgm: opp.fgm,
                dreb: opp.dreb,
            }),
        }
    }
}

pub fn simple_possessions(fga: f64, fta: f64, tov: f64, oreb: f64) -> f64 {
    fga + 0.44 * fta + tov - oreb
}

/// One side's term of the two-sided estimate.
fn bbr_side_term(fga: f64, fta: f64, tov: f64, fgm: f64, orb_pct: f64) -> f64 {
    fga + 0.4 * fta - 1.07 * orb_pct * (fga - fgm) + tov
}

/// Estimate possessions with the chosen strategy.
///
/// `BbrStandard` rounds to one decimal; it degrades to `Simple` when any of
/// the two-sided fields is missing.
pub fn estimate_possessions(inputs: &PossessionInputs, strategy: PossessionStrategy) -> f64 {
    let simple = || simple_possessions(inputs.fga, inputs.fta, inputs.tov, inputs.oreb);
    match strategy {
        PossessionStrategy::Simple => simple(),
        PossessionStrategy::BbrStandard => {
            let (Some(fgm), Some(dreb), Some(opp)) = (inputs.fgm, inputs.dreb, inputs.opp) else {
                return simple();
            };
            let team_orb_pct = safe_div(inputs.oreb, inputs.oreb + opp.dreb);
            let opp_orb_pct = safe_div(opp.oreb, opp.oreb + dreb);
            let team_term = bbr_side_term(inputs.fga, inputs.fta, inputs.tov, fgm, team_orb_pct);
            let opp_term = bbr_side_term(opp.fga, opp.fta, opp.tov, opp.fgm, opp_orb_pct);
            round_to(0.5 * (team_term + opp_term), 1)
        }
    }
}

/// Possessions for the team and for its opponents over the aggregate's games.
///
/// The two-sided estimate already averages both sides, so `BbrStandard`
/// returns the same figure twice.
pub fn estimate_team_and_opp_possessions(
    ts: &TeamSeasonAggregate,
    strategy: PossessionStrategy,
) -> (f64, f64) {
    match strategy {
        PossessionStrategy::Simple => (
            simple_possessions(ts.team.fga, ts.team.fta, ts.team.tov, ts.team.oreb),
            simple_possessions(ts.opp.fga, ts.opp.fta, ts.opp.tov, ts.opp.oreb),
        ),
        PossessionStrategy::BbrStandard => {
            let poss = estimate_possessions(&PossessionInputs::from_box(&ts.team, &ts.opp), strategy);
            (poss, poss)
        }
    }
}
