// Usage and box-rate percentages that need team and opponent context.

use serde::{Deserialize, Serialize};

use crate::aggregate::PlayerSeasonTotals;
use crate::metrics::{round_to, TeamContext};

/// Team-relative rates. A field is `None` when its denominator is not
/// positive: "not computable", as opposed to a computed zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoxRates {
    pub usg_pct: Option<f64>,
    pub oreb_pct: Option<f64>,
    pub dreb_pct: Option<f64>,
    pub reb_pct: Option<f64>,
    pub ast_pct: Option<f64>,
    pub stl_pct: Option<f64>,
    pub blk_pct: Option<f64>,
}

/// `100 * num / den` to one decimal, or `None` for a non-positive denominator.
fn pct(num: f64, den: f64) -> Option<f64> {
    if den > 0.0 {
        Some(round_to(100.0 * num / den, 1))
    } else {
        None
    }
}

/// Compute usage and box rates. Returns `None` when the player has no games
/// or no minutes.
pub fn compute_box_rates(p: &PlayerSeasonTotals, team: &TeamContext<'_>) -> Option<BoxRates> {
    let mp = p.total_minutes();
    if p.gp == 0 || mp <= 0.0 {
        return None;
    }
    let t = &team.aggregate.team;
    let o = &team.aggregate.opp;
    // Team minutes per court slot
    let tm5 = t.min / 5.0;

    let tov = p.total(p.tov);
    let player_usage = p.total_fga + 0.44 * p.total_fta + tov;
    let team_usage = t.fga + 0.44 * t.fta + t.tov;

    Some(BoxRates {
        usg_pct: pct(player_usage * tm5, mp * team_usage),
        oreb_pct: pct(p.total(p.avg_off_reb) * tm5, mp * (t.oreb + o.dreb)),
        dreb_pct: pct(p.total(p.avg_def_reb) * tm5, mp * (t.dreb + o.oreb)),
        reb_pct: pct(p.total(p.reb) * tm5, mp * (t.reb + o.reb)),
        ast_pct: pct(p.total(p.ast), (mp / tm5) * t.fgm - p.total_fgm),
        stl_pct: pct(p.total(p.stl) * tm5, mp * team.opp_poss),
        blk_pct: pct(p.total(p.blk) * tm5, mp * (o.fga - o.tpa)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::TeamSeasonAggregate;
    use crate::metrics::fixtures;
    use crate::metrics::possessions::PossessionStrategy;

    #[test]
    fn fixture_rates() {
        let team = fixtures::team();
        let ctx = TeamContext::new(&team, PossessionStrategy::Simple);
        let r = compute_box_rates(&fixtures::player(), &ctx).unwrap();
        assert_eq!(r.usg_pct, Some(27.2));
        assert_eq!(r.oreb_pct, Some(3.8));
        assert_eq!(r.dreb_pct, Some(15.0));
        assert_eq!(r.reb_pct, Some(9.5));
        assert_eq!(r.ast_pct, Some(27.1));
        assert_eq!(r.stl_pct, Some(3.5));
        assert_eq!(r.blk_pct, Some(3.1));
    }

    #[test]
    fn no_minutes_skips_everything() {
        let team = fixtures::team();
        let ctx = TeamContext::new(&team, PossessionStrategy::Simple);
        let p = PlayerSeasonTotals {
            min: 0.0,
            ..fixtures::player()
        };
        assert!(compute_box_rates(&p, &ctx).is_none());
        let p = PlayerSeasonTotals {
            gp: 0,
            ..fixtures::player()
        };
        assert!(compute_box_rates(&p, &ctx).is_none());
    }

    #[test]
    fn empty_team_leaves_fields_unset() {
        let team = TeamSeasonAggregate::default();
        let ctx = TeamContext::new(&team, PossessionStrategy::Simple);
        let r = compute_box_rates(&fixtures::player(), &ctx).unwrap();
        assert_eq!(r.usg_pct, None);
        assert_eq!(r.oreb_pct, None);
        assert_eq!(r.reb_pct, None);
        assert_eq!(r.stl_pct, None);
        assert_eq!(r.blk_pct, None);
        // No team minutes: the minute share is undefined, so unset rather than zero
        assert_eq!(r.ast_pct, None);
    }

    #[test]
    fn player_carrying_every_team_assist_chance() {
        // Minute share of team FGM equal to the player's own FGM leaves no
        // teammate baskets to assist.
        let team = fixtures::team();
        let ctx = TeamContext::new(&team, PossessionStrategy::Simple);
        let p = PlayerSeasonTotals {
            total_fgm: 290.0 * 300.0 / 400.0,
            ..fixtures::player()
        };
        assert_eq!(compute_box_rates(&p, &ctx).unwrap().ast_pct, None);
    }
}
