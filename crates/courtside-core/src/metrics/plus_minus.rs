// Plus-minus: stint aggregation and per-100-possession normalization.

use std::collections::HashMap;

use crate::aggregate::{
    LineupStint, PlayerId, PlusMinusAggregate, PlusMinusSegment, StintSide, TeamId,
    TeamSeasonAggregate,
};
use crate::metrics::possessions::{estimate_team_and_opp_possessions, PossessionStrategy};
use crate::metrics::{round_to, safe_div};

/// Team possessions per second of game clock over the season.
fn possessions_per_second(team: &TeamSeasonAggregate, strategy: PossessionStrategy) -> f64 {
    let (team_poss, _) = estimate_team_and_opp_possessions(team, strategy);
    safe_div(team_poss, team.team.min / 5.0 * 60.0)
}

/// Fold lineup stints into per-player, per-team plus-minus segments.
///
/// Every home player is credited `home_pts - away_pts` and the stint's
/// seconds; every away player the negation. A traded player ends up with one
/// segment per team, in the order first seen.
pub fn build_plus_minus_aggregates(stints: &[LineupStint]) -> HashMap<PlayerId, PlusMinusAggregate> {
    let mut out: HashMap<PlayerId, PlusMinusAggregate> = HashMap::new();

    let mut credit = |side: &StintSide, margin: f64, seconds: f64| {
        for &player_id in &side.players {
            let agg = out.entry(player_id).or_insert_with(|| PlusMinusAggregate {
                player_id,
                segments: Vec::new(),
            });
            match agg.segments.iter_mut().find(|s| s.team_id == side.team_id) {
                Some(seg) => {
                    seg.total_pm += margin;
                    seg.on_court_seconds += seconds;
                }
                None => agg.segments.push(PlusMinusSegment {
                    team_id: side.team_id,
                    total_pm: margin,
                    on_court_seconds: seconds,
                }),
            }
        }
    };

    for stint in stints {
        let margin = stint.home.points - stint.away.points;
        credit(&stint.home, margin, stint.seconds);
        credit(&stint.away, -margin, stint.seconds);
    }
    out
}

/// Plus-minus per 100 on-court possessions from stint segments.
///
/// Each segment's seconds are converted to possessions at its own team's
/// season rate. `None` without segments, when a segment's team has no
/// aggregate, or when the segments add up to no possessions.
pub fn compute_plus_minus_per100(
    agg: Option<&PlusMinusAggregate>,
    teams: &HashMap<TeamId, TeamSeasonAggregate>,
    strategy: PossessionStrategy,
) -> Option<f64> {
    let agg = agg?;
    if agg.segments.is_empty() {
        return None;
    }

    let mut total_pm = 0.0;
    let mut on_court_poss = 0.0;
    for seg in &agg.segments {
        let team = teams.get(&seg.team_id)?;
        total_pm += seg.total_pm;
        on_court_poss += seg.on_court_seconds * possessions_per_second(team, strategy);
    }

    if on_court_poss <= 0.0 {
        return None;
    }
    Some(round_to(100.0 * total_pm / on_court_poss, 1))
}

/// Plus-minus per 100 possessions from the minute-scaled team margin, for
/// players without stint coverage. On-court possessions are the player's
/// minutes at the team's season possession rate.
pub fn compute_fallback_plus_minus_per100(
    raw_total: f64,
    team_id: TeamId,
    player_total_minutes: f64,
    teams: &HashMap<TeamId, TeamSeasonAggregate>,
    strategy: PossessionStrategy,
) -> Option<f64> {
    let team = teams.get(&team_id)?;
    if player_total_minutes <= 0.0 {
        return None;
    }
    let (team_poss, _) = estimate_team_and_opp_possessions(team, strategy);
    let on_court_poss = player_total_minutes * safe_div(team_poss, team.team.min / 5.0);
    if on_court_poss <= 0.0 {
        return None;
    }
    Some(round_to(100.0 * raw_total / on_court_poss, 1))
}
