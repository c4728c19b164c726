// Courtside entry point.
//
// Startup sequence:
// 1. Initialize tracing (stderr, so stdout carries only JSON)
// 2. Load config from the base directory
// 3. Open the row store and import the configured CSV files
// 4. Build season aggregates and plus-minus segments
// 5. Compute every player's metrics and print them as JSON

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use courtside_core::aggregate::builder;
use courtside_core::aggregate::SeasonId;
use courtside_core::config::{self, DataConfig};
use courtside_core::db::Database;
use courtside_core::import;
use courtside_core::metrics::{self, plus_minus, SeasonContext};

#[derive(Parser)]
#[command(name = "courtside")]
#[command(about = "Compute advanced basketball metrics from box scores")]
struct Cli {
    /// Directory holding defaults/ and config/ (default: current directory)
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Season to compute (default: latest season in the games file)
    #[arg(long)]
    season: Option<SeasonId>,

    /// Only print this player
    #[arg(long)]
    player: Option<i64>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

fn main() -> anyhow::Result<()> {
    init_tracing()?;
    let cli = Cli::parse();

    // 2. Load config
    let base_dir = match cli.base_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("failed to resolve working directory")?,
    };
    config::ensure_config_files(&base_dir).context("failed to initialize configuration")?;
    let config = config::load_config_from(&base_dir).context("failed to load configuration")?;
    info!(
        "Config loaded: strategy={:?}, min_games={}",
        config.engine.possession_strategy, config.engine.min_games
    );

    // 3. Open database and import
    let db_path = if config.database.path == ":memory:" {
        config.database.path.clone()
    } else {
        DataConfig::resolve(&base_dir, &config.database.path)
            .display()
            .to_string()
    };
    let db = Database::open(&db_path).context("failed to open database")?;
    info!("Database opened at {}", db_path);
    import::import_data(&db, &config.data, &base_dir).context("failed to import data")?;

    let season_id = builder::resolve_season(&db, cli.season)?;

    // 4. Season aggregates
    let teams = builder::build_team_aggregates(&db, season_id)?;
    let league = builder::build_league_aggregate(&db, season_id)?;
    let players = builder::build_player_totals(&db, season_id)?;

    let stints = if config.data.stints.is_some() {
        db.load_stints(season_id)?
    } else {
        Vec::new()
    };
    let plus_minus = plus_minus::build_plus_minus_aggregates(&stints);
    if stints.is_empty() {
        info!("No lineup stints for season {}; using team-margin plus-minus", season_id);
    } else {
        info!("Loaded {} lineup stints for season {}", stints.len(), season_id);
    }

    // 5. Compute and print
    let players = builder::select_players(players, config.engine.min_games, cli.player)
        .with_context(|| format!("season {season_id}"))?;

    let ctx = SeasonContext {
        teams: &teams,
        league: Some(&league),
        plus_minus: (!plus_minus.is_empty()).then_some(&plus_minus),
        strategy: config.engine.possession_strategy,
    };
    let lines = metrics::compute_all(&players, &ctx);
    info!("Computed metrics for {} players", lines.len());

    let json = if cli.pretty || config.output.pretty {
        serde_json::to_string_pretty(&lines)
    } else {
        serde_json::to_string(&lines)
    }
    .context("failed to serialize output")?;
    println!("{json}");

    Ok(())
}

/// Initialize tracing to stderr; stdout is reserved for the JSON output.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("courtside=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
