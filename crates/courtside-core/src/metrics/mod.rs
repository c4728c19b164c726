// Advanced metrics engine: possession accounting, rate stats, ratings, PER,
// Win Shares and plus-minus, plus the per-player pipeline that wires them
// together according to which season context is available.

pub mod basic;
pub mod per;
pub mod plus_minus;
pub mod possessions;
pub mod rating;
pub mod usage;
pub mod win_shares;

use std::collections::HashMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregate::{
    LeagueSeasonAggregate, PlayerId, PlayerSeasonTotals, PlusMinusAggregate, TeamId,
    TeamSeasonAggregate,
};
use basic::BasicRates;
use possessions::{estimate_team_and_opp_possessions, PossessionStrategy};
use usage::BoxRates;
use win_shares::WinSharesInputs;

/// Regulation game length in minutes; pace and WS/40 are expressed per this span.
pub const GAME_MINUTES: f64 = 40.0;

// ---------------------------------------------------------------------------
// Numeric helpers
// ---------------------------------------------------------------------------

/// Round half up to `decimals` places. Negative halves round toward positive
/// infinity (-2.25 -> -2.2 at one decimal).
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor + 0.5).floor() / factor
}

/// Division that yields 0 for a zero denominator.
pub fn safe_div(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

/// Substitute `default` for a zero or non-finite value.
pub fn or_default(value: f64, default: f64) -> f64 {
    if value == 0.0 || !value.is_finite() {
        default
    } else {
        value
    }
}

// ---------------------------------------------------------------------------
// Team context
// ---------------------------------------------------------------------------

/// A team aggregate paired with its possession estimates, computed once per
/// team and shared by every calculator that needs team context.
#[derive(Debug, Clone, Copy)]
pub struct TeamContext<'a> {
    pub aggregate: &'a TeamSeasonAggregate,
    pub team_poss: f64,
    pub opp_poss: f64,
}

impl<'a> TeamContext<'a> {
    pub fn new(aggregate: &'a TeamSeasonAggregate, strategy: PossessionStrategy) -> Self {
        let (team_poss, opp_poss) = estimate_team_and_opp_possessions(aggregate, strategy);
        Self {
            aggregate,
            team_poss,
            opp_poss,
        }
    }

    /// Possessions per regulation game. 0 when the team has no minutes.
    pub fn pace(&self) -> f64 {
        team_pace(self.team_poss, self.aggregate.team.min)
    }
}

pub(crate) fn team_pace(team_poss: f64, team_min: f64) -> f64 {
    if team_min > 0.0 {
        GAME_MINUTES * team_poss / (team_min / 5.0)
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Output record
// ---------------------------------------------------------------------------

/// Every derived field the engine can attach to a player row. Basic rates are
/// always present; the rest stay `None` when their inputs are missing or
/// degenerate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub ts_pct: f64,
    pub efg_pct: f64,
    pub tpar: f64,
    pub ftr: f64,
    pub pir: f64,
    pub ast_to: f64,
    pub tov_pct: f64,
    pub game_score: f64,
    pub pts36: f64,
    pub reb36: f64,
    pub ast36: f64,
    pub usg_pct: Option<f64>,
    pub off_rtg: Option<f64>,
    pub def_rtg: Option<f64>,
    pub net_rtg: Option<f64>,
    pub oreb_pct: Option<f64>,
    pub dreb_pct: Option<f64>,
    pub reb_pct: Option<f64>,
    pub ast_pct: Option<f64>,
    pub stl_pct: Option<f64>,
    pub blk_pct: Option<f64>,
    pub per: Option<f64>,
    pub ows: Option<f64>,
    pub dws: Option<f64>,
    pub ws: Option<f64>,
    pub ws_40: Option<f64>,
    pub plus_minus_total: Option<f64>,
    pub plus_minus_per_game: Option<f64>,
    pub plus_minus_per100: Option<f64>,
}

impl DerivedMetrics {
    fn from_basic(b: &BasicRates) -> Self {
        Self {
            ts_pct: b.ts_pct,
            efg_pct: b.efg_pct,
            tpar: b.tpar,
            ftr: b.ftr,
            pir: b.pir,
            ast_to: b.ast_to,
            tov_pct: b.tov_pct,
            game_score: b.game_score,
            pts36: b.pts36,
            reb36: b.reb36,
            ast36: b.ast36,
            ..Default::default()
        }
    }

    fn apply_box_rates(&mut self, r: &BoxRates) {
        self.usg_pct = r.usg_pct;
        self.oreb_pct = r.oreb_pct;
        self.dreb_pct = r.dreb_pct;
        self.reb_pct = r.reb_pct;
        self.ast_pct = r.ast_pct;
        self.stl_pct = r.stl_pct;
        self.blk_pct = r.blk_pct;
    }
}

/// The caller's row extended with derived metrics. Serializes flat, with
/// unset metrics as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStatLine {
    #[serde(flatten)]
    pub totals: PlayerSeasonTotals,
    #[serde(flatten)]
    pub metrics: DerivedMetrics,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Read-only season context shared by every player computation.
#[derive(Debug, Clone, Copy)]
pub struct SeasonContext<'a> {
    pub teams: &'a HashMap<TeamId, TeamSeasonAggregate>,
    pub league: Option<&'a LeagueSeasonAggregate>,
    pub plus_minus: Option<&'a HashMap<PlayerId, PlusMinusAggregate>>,
    pub strategy: PossessionStrategy,
}

/// Run every calculator whose context is available for one player.
///
/// Order:
/// 1. Basic rates (always).
/// 2. Usage/box rates and the Rating Engine, when the player's team aggregate
///    exists and the player has logged games and minutes.
/// 3. PER and Win Shares, when the league aggregate is present as well. Win
///    Shares consumes the Rating Engine's points produced, possessions and
///    defensive rating.
/// 4. Plus-minus: stint segments first, then the team-margin fallback.
pub fn compute_player_metrics(row: &PlayerSeasonTotals, ctx: &SeasonContext<'_>) -> PlayerStatLine {
    let mut metrics = DerivedMetrics::from_basic(&basic::compute_basic_rates(row));

    let team = row
        .team_id
        .and_then(|id| ctx.teams.get(&id))
        .map(|agg| TeamContext::new(agg, ctx.strategy));
    let total_min = row.total_minutes();
    let played = row.gp > 0 && total_min > 0.0;

    match team {
        Some(team) if played => {
            if let Some(rates) = usage::compute_box_rates(row, &team) {
                metrics.apply_box_rates(&rates);
            }

            let offense = rating::compute_player_off_rtg(row, &team);
            let def_rtg = rating::compute_player_def_rtg(row, &team, total_min);
            metrics.off_rtg = offense.map(|o| o.off_rtg);
            metrics.def_rtg = def_rtg;
            metrics.net_rtg = rating::net_rating(metrics.off_rtg, metrics.def_rtg);

            match ctx.league {
                Some(league) => {
                    metrics.per = Some(per::compute_per(row, row.gp, row.min, &team, league));

                    let inputs = WinSharesInputs {
                        pprod: offense.map(|o| o.pprod),
                        tot_poss: offense.map(|o| o.tot_poss),
                        def_rtg,
                        total_min,
                        team_poss: team.team_poss,
                        opp_poss: team.opp_poss,
                    };
                    if let Some(ws) = win_shares::compute_win_shares(&inputs, team.aggregate, league) {
                        metrics.ows = Some(ws.ows);
                        metrics.dws = Some(ws.dws);
                        metrics.ws = Some(ws.ws);
                        metrics.ws_40 = Some(ws.ws_40);
                    }
                }
                None => debug!(player_id = row.player_id, "no league aggregate; skipping PER and win shares"),
            }
        }
        Some(_) => {}
        None => debug!(player_id = row.player_id, "no team aggregate; skipping team-context metrics"),
    }

    apply_plus_minus(row, ctx, &mut metrics);

    PlayerStatLine {
        totals: row.clone(),
        metrics,
    }
}

fn apply_plus_minus(row: &PlayerSeasonTotals, ctx: &SeasonContext<'_>, metrics: &mut DerivedMetrics) {
    let stint_aggregate = ctx
        .plus_minus
        .and_then(|m| m.get(&row.player_id))
        .filter(|agg| !agg.segments.is_empty());

    let total = match stint_aggregate {
        Some(agg) => Some(agg.total_pm()),
        None if row.gp > 0 => Some(row.raw_plus_minus),
        None => None,
    };
    metrics.plus_minus_total = total.map(|t| round_to(t, 1));
    metrics.plus_minus_per_game = total
        .filter(|_| row.gp > 0)
        .map(|t| round_to(t / row.gp as f64, 1));

    // Stint-covered players never take the team-margin per-100.
    metrics.plus_minus_per100 = match stint_aggregate {
        Some(agg) => plus_minus::compute_plus_minus_per100(Some(agg), ctx.teams, ctx.strategy),
        None => row.team_id.and_then(|team_id| {
            plus_minus::compute_fallback_plus_minus_per100(
                row.raw_plus_minus,
                team_id,
                row.total_minutes(),
                ctx.teams,
                ctx.strategy,
            )
        }),
    };
}

/// Compute every player in parallel. Output order matches input order.
pub fn compute_all(rows: &[PlayerSeasonTotals], ctx: &SeasonContext<'_>) -> Vec<PlayerStatLine> {
    rows.par_iter()
        .map(|row| compute_player_metrics(row, ctx))
        .collect()
}

// ---------------------------------------------------------------------------
// Shared test fixtures
// ---------------------------------------------------------------------------


#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{PlusMinusSegment, TeamSeasonAggregate};

    fn teams() -> HashMap<TeamId, TeamSeasonAggregate> {
        let mut m = HashMap::new();
        m.insert(10, fixtures::team());
        m
    }

    // ---- helpers ----

    #[test]
    fn round_to_is_half_up() {
        assert_eq!(round_to(0.0625, 3), 0.063);
        assert_eq!(round_to(2.25, 1), 2.3);
        assert_eq!(round_to(-2.25, 1), -2.2);
        assert_eq!(round_to(19.0, 1), 19.0);
    }

    #[test]
    fn safe_div_zero_denominator() {
        assert_eq!(safe_div(5.0, 0.0), 0.0);
        assert_eq!(safe_div(6.0, 3.0), 2.0);
    }

    #[test]
    fn or_default_replaces_zero_and_nan() {
        assert_eq!(or_default(0.0, 1.0), 1.0);
        assert_eq!(or_default(f64::NAN, 1.0), 1.0);
        assert_eq!(or_default(f64::INFINITY, 1.0), 1.0);
        assert_eq!(or_default(0.3, 1.0), 0.3);
    }

    #[test]
    fn team_context_pace() {
        let team = fixtures::team();
        let ctx = TeamContext::new(&team, PossessionStrategy::Simple);
        // 640 + 0.44*190 + 175 - 100 = 798.6 possessions over 400 team-minutes
        assert!((ctx.team_poss - 798.6).abs() < 1e-9);
        assert!((ctx.pace() - 79.86).abs() < 1e-9);
    }

    // ---- pipeline ----

    #[test]
    fn full_context_attaches_every_metric() {
        let teams = teams();
        let league = fixtures::league();
        let ctx = SeasonContext {
            teams: &teams,
            league: Some(&league),
            plus_minus: None,
            strategy: PossessionStrategy::Simple,
        };
        let line = compute_player_metrics(&fixtures::player(), &ctx);
        let m = &line.metrics;

        assert_eq!(m.ts_pct, 0.587);
        assert_eq!(m.tpar, 0.357);
        assert_eq!(m.ftr, 0.214);
        assert_eq!(m.usg_pct, Some(27.2));
        assert_eq!(m.off_rtg, Some(105.9));
        assert_eq!(m.def_rtg, Some(86.3));
        assert_eq!(m.net_rtg, Some(19.6));
        assert_eq!(m.per, Some(15.2));
        assert_eq!(m.ows, Some(0.0));
        assert_eq!(m.dws, Some(0.26));
        assert_eq!(m.ws, Some(0.26));
        assert_eq!(m.ws_40, Some(0.035));
        assert!(m.plus_minus_per100.is_some());
        assert_eq!(line.totals, fixtures::player());
    }

    #[test]
    fn missing_league_skips_per_and_win_shares() {
        let teams = teams();
        let ctx = SeasonContext {
            teams: &teams,
            league: None,
            plus_minus: None,
            strategy: PossessionStrategy::Simple,
        };
        let m = compute_player_metrics(&fixtures::player(), &ctx).metrics;
        assert!(m.off_rtg.is_some());
        assert!(m.usg_pct.is_some());
        assert_eq!(m.per, None);
        assert_eq!(m.ws, None);
        assert_eq!(m.ws_40, None);
    }

    #[test]
    fn missing_team_leaves_only_basic_rates() {
        let teams = HashMap::new();
        let league = fixtures::league();
        let ctx = SeasonContext {
            teams: &teams,
            league: Some(&league),
            plus_minus: None,
            strategy: PossessionStrategy::Simple,
        };
        let m = compute_player_metrics(&fixtures::player(), &ctx).metrics;
        assert_eq!(m.ts_pct, 0.587);
        assert_eq!(m.usg_pct, None);
        assert_eq!(m.off_rtg, None);
        assert_eq!(m.def_rtg, None);
        assert_eq!(m.per, None);
        assert_eq!(m.plus_minus_per100, None);
        // Raw margin is still reported without a team to normalize against.
        assert_eq!(m.plus_minus_total, Some(24.0));
        assert_eq!(m.plus_minus_per_game, Some(2.4));
    }

    #[test]
    fn roster_only_player_gets_zeros_and_nulls() {
        let teams = teams();
        let league = fixtures::league();
        let ctx = SeasonContext {
            teams: &teams,
            league: Some(&league),
            plus_minus: None,
            strategy: PossessionStrategy::Simple,
        };
        let row = PlayerSeasonTotals {
            player_id: 99,
            team_id: Some(10),
            ..Default::default()
        };
        let line = compute_player_metrics(&row, &ctx);
        let m = &line.metrics;
        assert_eq!(line.totals.gp, 0);
        assert_eq!(m.ts_pct, 0.0);
        assert_eq!(m.pir, 0.0);
        assert_eq!(m.game_score, 0.0);
        assert_eq!(m.usg_pct, None);
        assert_eq!(m.def_rtg, None);
        assert_eq!(m.per, None);
        assert_eq!(m.plus_minus_total, None);
        assert_eq!(m.plus_minus_per100, None);

        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["gp"], 0);
        assert_eq!(json["pts"], 0.0);
        assert!(json["plus_minus_per100"].is_null());
        assert!(json["per"].is_null());
    }

    #[test]
    fn stint_segments_take_precedence_over_fallback() {
        let teams = teams();
        let mut pm = HashMap::new();
        pm.insert(
            1,
            PlusMinusAggregate {
                player_id: 1,
                segments: vec![PlusMinusSegment {
                    team_id: 10,
                    total_pm: 40.0,
                    on_court_seconds: 18000.0,
                }],
            },
        );
        let ctx = SeasonContext {
            teams: &teams,
            league: None,
            plus_minus: Some(&pm),
            strategy: PossessionStrategy::Simple,
        };
        let m = compute_player_metrics(&fixtures::player(), &ctx).metrics;
        assert_eq!(m.plus_minus_total, Some(40.0));
        assert_eq!(m.plus_minus_per_game, Some(4.0));
        // 18000 s at 798.6 poss per 24000 team-seconds = 598.95 possessions
        assert_eq!(m.plus_minus_per100, Some(6.7));
    }

    #[test]
    fn stint_player_with_unknown_segment_team_gets_no_per100() {
        let teams = teams();
        let mut pm = HashMap::new();
        pm.insert(
            1,
            PlusMinusAggregate {
                player_id: 1,
                segments: vec![PlusMinusSegment {
                    team_id: 77,
                    total_pm: -50.0,
                    on_court_seconds: 18000.0,
                }],
            },
        );
        let ctx = SeasonContext {
            teams: &teams,
            league: None,
            plus_minus: Some(&pm),
            strategy: PossessionStrategy::Simple,
        };
        let m = compute_player_metrics(&fixtures::player(), &ctx).metrics;
        assert_eq!(m.plus_minus_total, Some(-50.0));
        assert_eq!(m.plus_minus_per_game, Some(-5.0));
        // Team 10 is known and the raw margin is +24, but that source is not mixed in
        assert_eq!(m.plus_minus_per100, None);
    }

    #[test]
    fn compute_all_preserves_order() {
        let teams = teams();
        let ctx = SeasonContext {
            teams: &teams,
            league: None,
            plus_minus: None,
            strategy: PossessionStrategy::Simple,
        };
        let rows: Vec<PlayerSeasonTotals> = (1..=20)
            .map(|id| PlayerSeasonTotals {
                player_id: id,
                ..fixtures::player()
            })
            .collect();
        let out = compute_all(&rows, &ctx);
        let ids: Vec<PlayerId> = out.iter().map(|l| l.totals.player_id).collect();
        assert_eq!(ids, (1..=20).collect::<Vec<_>>());
    }
}
