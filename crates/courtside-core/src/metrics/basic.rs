// Shooting and efficiency rates that need only the player's own totals.
//
// Every zero denominator yields 0 rather than an error.

use serde::{Deserialize, Serialize};

use crate::aggregate::PlayerSeasonTotals;
use crate::metrics::{round_to, safe_div};

/// Per-36 normalization span in minutes.
const PER36_MINUTES: f64 = 36.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicRates {
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
}

/// True shooting: `PTS / (2 * (FGA + 0.44 * FTA))`, bounded to [0, 1].
pub fn true_shooting_pct(pts: f64, fga: f64, fta: f64) -> f64 {
    safe_div(pts, 2.0 * (fga + 0.44 * fta)).clamp(0.0, 1.0)
}

/// Effective field goal: `(FGM + 0.5 * 3PM) / FGA`.
pub fn effective_fg_pct(fgm: f64, tpm: f64, fga: f64) -> f64 {
    safe_div(fgm + 0.5 * tpm, fga)
}

/// `stat * 36 / max(MIN, 1)` on per-game averages.
pub fn per36(stat: f64, min: f64) -> f64 {
    round_to(stat * PER36_MINUTES / min.max(1.0), 1)
}

pub fn compute_basic_rates(p: &PlayerSeasonTotals) -> BasicRates {
    let gp = p.gp as f64;
    let pts_total = p.total(p.pts);

    // Per-game shooting lines
    let fga = safe_div(p.total_fga, gp);
    let fta = safe_div(p.total_fta, gp);
    let fgm = safe_div(p.total_fgm, gp);
    let ftm = safe_div(p.total_ftm, gp);

    let pir = if p.gp > 0 {
        p.pts + p.reb + p.ast + p.stl + p.blk - p.tov - (fga - fgm) - (fta - ftm)
    } else {
        0.0
    };

    let game_score = if p.gp > 0 {
        p.pts + 0.4 * fgm - 0.7 * fga - 0.4 * (fta - ftm)
            + 0.7 * p.avg_off_reb
            + 0.3 * p.avg_def_reb
            + p.stl
            + 0.7 * p.ast
            + 0.7 * p.blk
            - 0.4 * p.avg_pf
            - p.tov
    } else {
        0.0
    };

    BasicRates {
        ts_pct: round_to(true_shooting_pct(pts_total, p.total_fga, p.total_fta), 3),
        efg_pct: round_to(effective_fg_pct(p.total_fgm, p.total_tpm, p.total_fga), 3),
        tpar: round_to(safe_div(p.total_tpa, p.total_fga), 3),
        ftr: round_to(safe_div(p.total_fta, p.total_fga), 3),
        pir: round_to(pir, 1),
        ast_to: round_to(safe_div(p.ast, p.tov), 2),
        tov_pct: round_to(100.0 * safe_div(p.tov, fga + 0.44 * fta + p.tov), 1),
        game_score: round_to(game_score, 1),
        pts36: per36(p.pts, p.min),
        reb36: per36(p.reb, p.min),
        ast36: per36(p.ast, p.min),
    }
}
