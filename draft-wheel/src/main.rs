// Draft wheel entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Build the DraftState from the player pool or a saved snapshot
// 4. Run the requested subcommand

use std::path::Path;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{info, warn};

use draft_wheel::config::{self, Config};
use draft_wheel::draft::DraftState;
use draft_wheel::lottery::POSITION_DOMAIN;
use draft_wheel::persistence::{read_player_pool, CsvSnapshotStore};
use draft_wheel::service;
use draft_wheel::stats::{self, BucketCount, RoleDistribution, DEFAULT_RATING_BUCKETS};

#[derive(Debug, Parser)]
#[command(name = "draft-wheel", about = "Weighted-lottery team draft")]
struct Cli {
    /// Start from the saved remaining/teams files instead of the player pool.
    #[arg(long, global = true)]
    resume: bool,

    /// Log lottery internals (debug level) unless RUST_LOG overrides it.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the lottery odds for one team and role.
    Preview {
        #[arg(long)]
        team: String,
        #[arg(long)]
        role: String,
        #[arg(long)]
        json: bool,
    },
    /// Draft every team round-robin with seeded spins.
    Simulate {
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Teams to create when none are configured or saved.
        #[arg(long, default_value_t = 2)]
        teams: usize,
        /// Write the remaining/teams files when done.
        #[arg(long)]
        save: bool,
    },
    /// Pool and roster aggregates.
    Stats {
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1. Initialize tracing
    let log_path = std::env::current_dir()?.join(LOG_DIR).join(LOG_FILE);
    init_tracing(&log_path, cli.verbose)?;
    info!("Draft wheel starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: {} roles, team size {}, global average {}",
        config.engine.roles.len(),
        config.engine.team_size,
        config.engine.global_average_rating
    );

    // 3. Build the draft state
    let state = build_state(&config, cli.resume)?;

    // 4. Dispatch
    match cli.command {
        Command::Preview { team, role, json } => preview(state, &team, &role, json),
        Command::Simulate { seed, teams, save } => simulate(state, &config, seed, teams, save).await,
        Command::Stats { json } => print_stats(&state, json),
    }
}

fn build_state(config: &Config, resume: bool) -> anyhow::Result<DraftState> {
    let mut state =
        DraftState::new(config.engine.clone()).context("invalid draft configuration")?;

    if resume {
        let store = CsvSnapshotStore::from_paths(&config.data_paths);
        state
            .load_from(&store)
            .context("failed to load saved draft")?;
        info!("Resumed draft from {}", config.data_paths.teams);
    } else {
        let path = Path::new(&config.data_paths.players);
        let players = read_player_pool(path)
            .with_context(|| format!("failed to read player pool {}", path.display()))?;
        state.load_pool(players).context("failed to load player pool")?;
    }

    Ok(state)
}

fn preview(mut state: DraftState, team: &str, role: &str, json: bool) -> anyhow::Result<()> {
    if state.register_team(team) {
        info!("Previewing for new team {}", team);
    }
    let rows = state.explain(team, role)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!(
        "Team {} / {}: ideal rating {:.0}, base randomness {:.2}",
        team,
        role,
        state.ideal_rating(team)?,
        state.base_randomness(team)?
    );
    if rows.is_empty() {
        println!("No candidates left for {role}.");
        return Ok(());
    }
    println!(
        "{:<20} {:>8} {:>4} {:>8} {:>8} {:>8}",
        "player", "rating", "pri", "ratio", "weight", "chance"
    );
    for row in &rows {
        println!(
            "{:<20} {:>8.0} {:>4} {:>8.3} {:>8.4} {:>7.2}%",
            row.player,
            row.rating,
            row.priority,
            row.ratio,
            row.raw_weight,
            row.probability * 100.0
        );
    }
    Ok(())
}

async fn simulate(
    mut state: DraftState,
    config: &Config,
    seed: u64,
    team_count: usize,
    save: bool,
) -> anyhow::Result<()> {
    if state.teams().is_empty() {
        for i in 1..=team_count {
            state.register_team(&format!("Team {i}"));
        }
    }
    if state.teams().is_empty() {
        bail!("no teams to draft for");
    }

    let team_size = config.engine.team_size;
    let mut open_slots: Vec<(String, usize)> = state
        .teams()
        .iter()
        .map(|t| (t.id.clone(), team_size.saturating_sub(t.len())))
        .collect();
    let roles = config.engine.roles.clone();

    let (handle, task) = service::spawn(state);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    'rounds: loop {
        let mut drafted_this_round = false;
        for (team_id, slots) in open_slots.iter_mut() {
            if *slots == 0 {
                continue;
            }
            let unfilled = handle.unfilled_roles(team_id).await?;
            let requested = unfilled.first().unwrap_or(&roles[0]).clone();

            let mut candidate = None;
            for role in std::iter::once(&requested).chain(roles.iter()) {
                if !handle.is_role_empty(role).await? {
                    candidate = Some(role.clone());
                    break;
                }
            }
            let Some(candidate) = candidate else {
                info!("Every role pool is empty, stopping");
                break 'rounds;
            };
            if candidate != requested {
                warn!("{} pool is empty, drawing from {}", requested, candidate);
            }

            let position = rng.gen_range(0.0..=POSITION_DOMAIN);
            match handle.spin(team_id, &requested, &candidate, position).await? {
                Some(player) => {
                    println!("{team_id}: {player} ({requested}) at {position:.2}");
                    *slots -= 1;
                    drafted_this_round = true;
                }
                None => warn!("Spin at {position:.2} for {team_id} drafted nobody"),
            }
        }
        if !drafted_this_round {
            break;
        }
    }

    drop(handle);
    let state = task.await.context("draft service task failed")?;

    for team in state.teams() {
        let names: Vec<String> = team
            .players()
            .iter()
            .map(|e| format!("{} ({})", e.player, e.role))
            .collect();
        println!(
            "{:<12} avg {:>7.1}  {}",
            team.id,
            team.average_rating(),
            names.join(", ")
        );
    }

    if save {
        let store = CsvSnapshotStore::from_paths(&config.data_paths);
        state.save_to(&store).context("failed to save draft")?;
        println!(
            "Saved to {} and {}",
            config.data_paths.remaining, config.data_paths.teams
        );
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct StatsReport {
    pool_average_rating: f64,
    drafted_average_rating: f64,
    rating_buckets: Vec<BucketCount>,
    roles: Vec<RoleDistribution>,
    /// Undrafted names per role, highest rating first.
    candidates_by_role: Vec<(String, Vec<String>)>,
}

fn print_stats(state: &DraftState, json: bool) -> anyhow::Result<()> {
    let report = StatsReport {
        pool_average_rating: state.pool_average_rating(),
        drafted_average_rating: state.drafted_average_rating(),
        rating_buckets: stats::rating_bucket_counts(state, &DEFAULT_RATING_BUCKETS),
        roles: stats::role_distribution_counts(state),
        candidates_by_role: state.players_by_role(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Pool average:    {:.1}", report.pool_average_rating);
    println!("Drafted average: {:.1}", report.drafted_average_rating);
    println!();
    println!("{:<10} {:>6} {:>8} {:>6}", "bucket", "core", "support", "mixed");
    for b in &report.rating_buckets {
        println!(
            "{:<10} {:>6} {:>8} {:>6}",
            b.label, b.core_only, b.support_only, b.mixed
        );
    }
    println!();
    println!("{:<14} {:>6} {:>8}", "role", "count", "avg");
    for r in &report.roles {
        println!("{:<14} {:>6} {:>8.1}", r.role, r.count, r.average_rating);
    }
    println!();
    for (role, names) in &report.candidates_by_role {
        println!("{role}: {}", names.join(", "));
    }
    Ok(())
}

const LOG_DIR: &str = "logs";
const LOG_FILE: &str = "draft-wheel.log";

/// Send all tracing output to `log_path` so stdout stays clean for reports.
/// `RUST_LOG` wins over `verbose` when set.
fn init_tracing(log_path: &Path, verbose: bool) -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    if let Some(dir) = log_path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create log directory {}", dir.display()))?;
    }
    let log_file = std::fs::File::create(log_path)
        .with_context(|| format!("failed to create log file {}", log_path.display()))?;

    let default_filter = if verbose {
        "draft_wheel=debug,warn"
    } else {
        "draft_wheel=info,warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to set tracing subscriber: {e}"))
}
