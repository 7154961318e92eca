// Courtside entry point.
//
// Startup sequence:
// 1. Parse the command line
// 2. Initialize tracing (log to file, stdout is for command output)
// 3. Load config (copying defaults on first run)
// 4. Open the database, build the engine and worker pool
// 5. Run the command, then drain the pool

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use courtside_app::engine::Engine;
use courtside_app::pool::WorkerPool;
use courtside_core::config;
use courtside_core::db::Database;
use courtside_core::efficiency::Position;
use courtside_core::facts::load_daily_file;
use courtside_core::roster::RosterEntry;
use courtside_core::window::AveragePeriod;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "courtside", version, about = "Rolling-window NBA player averages")]
struct Cli {
    /// Directory holding config/, defaults/ and logs/ (defaults to the CWD).
    #[arg(long, env = "COURTSIDE_HOME", global = true)]
    base_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest one day's box-score CSV and recompute affected averages.
    Import {
        csv: PathBuf,
        /// Game date for every row in the file.
        #[arg(long)]
        date: NaiveDate,
    },
    /// Recompute every snapshot from game history.
    Rebuild {
        #[arg(long)]
        season: Option<String>,
    },
    /// Print the season and week a date falls in.
    Resolve { date: NaiveDate },
    /// Print a player's running averages as JSON.
    Averages {
        #[arg(long)]
        player: String,
        #[arg(long, value_parser = parse_period, default_value = "three_week")]
        period: AveragePeriod,
        #[arg(long)]
        season: Option<String>,
    },
    /// Add or update a roster stint.
    Roster {
        #[arg(long)]
        player: String,
        #[arg(long)]
        team: Option<String>,
        #[arg(long, value_parser = parse_position)]
        position: Option<Position>,
        #[arg(long)]
        enrolled: NaiveDate,
        #[arg(long)]
        released: Option<NaiveDate>,
        #[arg(long)]
        unplayable: bool,
    },
}

fn parse_period(s: &str) -> Result<AveragePeriod, String> {
    AveragePeriod::from_name(s)
        .ok_or_else(|| format!("unknown period `{s}` (one_week, three_week, nine_week)"))
}

fn parse_position(s: &str) -> Result<Position, String> {
    Position::from_str_pos(s).ok_or_else(|| format!("unknown position `{s}`"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let base_dir = match &cli.base_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("failed to read current directory")?,
    };

    init_tracing(&base_dir)?;
    info!("Courtside starting: {:?}", cli.command);

    config::ensure_config_files(&base_dir).context("failed to initialize config")?;
    let config = config::load_config_from(&base_dir).context("failed to load configuration")?;
    info!(
        "Config loaded: {} workers, periods {:?}",
        config.engine.workers, config.engine.periods
    );

    let db_path = resolve_db_path(&base_dir, &config.db_path);
    let db = Arc::new(Database::open(&db_path).context("failed to open database")?);
    info!("Database opened at {}", db_path);

    let engine = Arc::new(Engine::new(db.clone(), &config).context("failed to start engine")?);

    match cli.command {
        Command::Import { csv, date } => {
            let pool = WorkerPool::start(engine.clone(), config.engine.workers);
            let result = import(&pool, &csv, date).await;
            pool.shutdown().await;
            result?;
        }
        Command::Rebuild { season } => {
            let pool = WorkerPool::start(engine.clone(), config.engine.workers);
            let result = pool.rebuild(season.as_deref()).await;
            pool.shutdown().await;
            let report = result.context("rebuild failed")?;
            println!(
                "rebuilt {} player-seasons: {} rows written, {} ineligible, {} failed",
                report.events,
                report.rows_written,
                report.ineligible,
                report.failed.len()
            );
            report.ensure_committed().context("rebuild incomplete")?;
        }
        Command::Resolve { date } => {
            let resolved = engine.calendar().resolve(date)?;
            println!("{} week {}", resolved.season, resolved.week_id);
        }
        Command::Averages {
            player,
            period,
            season,
        } => {
            let rows = db.load_averages(&player, period, season.as_deref())?;
            let json =
                serde_json::to_string_pretty(&rows).context("failed to serialize averages")?;
            println!("{json}");
        }
        Command::Roster {
            player,
            team,
            position,
            enrolled,
            released,
            unplayable,
        } => {
            let entry = RosterEntry {
                player,
                team,
                position,
                playable: !unplayable,
                enroll_date: enrolled,
                release_date: released,
            };
            db.upsert_roster_entry(&entry)?;
            info!("Roster entry saved for {}", entry.player);
            println!("saved roster entry for {}", entry.player);
        }
    }

    info!("Courtside finished");
    Ok(())
}

async fn import(pool: &WorkerPool, csv: &Path, date: NaiveDate) -> anyhow::Result<()> {
    let rows = load_daily_file(csv)?;
    let report = pool.import(rows, date).await?;
    for rejection in &report.rejected {
        eprintln!("rejected: {rejection}");
    }

    println!(
        "imported {} facts ({} rejected): {} rows written, {} ineligible, {} failed",
        report.stored,
        report.rejected.len(),
        report.batch.rows_written,
        report.batch.ineligible,
        report.batch.failed.len()
    );
    report
        .batch
        .ensure_committed()
        .with_context(|| format!("import of {} incomplete", csv.display()))?;
    Ok(())
}

/// Relative database paths are taken from `base_dir`.
fn resolve_db_path(base_dir: &Path, db_path: &str) -> String {
    let path = Path::new(db_path);
    if db_path == ":memory:" || path.is_absolute() {
        db_path.to_string()
    } else {
        base_dir.join(path).display().to_string()
    }
}

/// Initialize tracing to log to `logs/courtside.log` under `base_dir`.
fn init_tracing(base_dir: &Path) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = base_dir.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("courtside.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("courtside=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
