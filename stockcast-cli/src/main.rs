//! Stockcast CLI: ingestion, prediction lifecycle and reporting commands.
//!
//! Commands:
//! - `init`: create the database and seed the stock universe
//! - `populate` / `populate-chunk`: backfill price history (batch or resumable)
//! - `update-daily`: fetch the last trading day, or fill gaps with `--smart`
//! - `lock` / `resolve`: scheduled prediction maintenance
//! - `predict` / `show-prediction` / `delete-prediction` / `user add`: analyst actions
//! - `chart`, `leaderboard`, `analyst`, `status`, `stocks`: read models

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stockcast_core::data::{PolygonProvider, RateLimiter, Throttled, Universe};
use stockcast_core::domain::{Horizon, NewAnalyst, NewPrediction};
use stockcast_core::store::{PredictionStore, PriceStore, SqliteStore, SymbolQuery};
use stockcast_runner::export::{
    export_chart_json, export_coverage_csv, generate_coverage_report, save_chart_artifacts,
    write_chart_csv,
};
use stockcast_runner::ingest::{
    drive_chunks, populate_all, populate_next, update_daily, update_smart, HistoryRange,
    LogProgress, PopulateOptions,
};
use stockcast_runner::predictions::{self, lock_sweep, resolve_due};
use stockcast_runner::{accuracy_leaderboard, analyst_profile, build_chart, StockcastConfig};

#[derive(Parser)]
#[command(
    name = "stockcast",
    about = "Stockcast CLI: stock prediction marketplace back end"
)]
struct Cli {
    /// Path to a TOML config file. Defaults to ./stockcast.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and seed the stock universe.
    Init {
        /// Universe TOML file. Defaults to the built-in 50-stock list.
        #[arg(long)]
        universe: Option<PathBuf>,
    },
    /// Populate price history for every symbol in one run.
    Populate {
        /// Skip symbols already populated by an earlier run.
        #[arg(long, default_value_t = false)]
        skip_populated: bool,
    },
    /// Populate the next unpopulated symbol and print a JSON progress report.
    PopulateChunk {
        /// Keep invoking until every symbol is handled.
        #[arg(long, default_value_t = false)]
        until_done: bool,

        /// Invocation cap for --until-done.
        #[arg(long, default_value_t = 1_000)]
        max: usize,
    },
    /// Fetch the last trading day's bar for every symbol.
    UpdateDaily {
        /// Fill every missing weekday since each symbol's latest bar.
        #[arg(long, default_value_t = false)]
        smart: bool,

        /// Reference date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        today: Option<String>,
    },
    /// Lock every prediction created before today (UTC).
    Lock,
    /// Record actual prices for forecasts whose target date has passed.
    Resolve,
    /// Submit a prediction.
    Predict {
        /// Analyst id.
        #[arg(long)]
        user: i64,

        /// Ticker, e.g. AAPL.
        #[arg(long)]
        symbol: String,

        /// Price at submission time.
        #[arg(long)]
        current: f64,

        #[arg(long = "7d")]
        d7: Option<f64>,
        #[arg(long = "28d")]
        d28: Option<f64>,
        #[arg(long = "60d")]
        d60: Option<f64>,
        #[arg(long = "90d")]
        d90: Option<f64>,
        #[arg(long = "180d")]
        d180: Option<f64>,
        #[arg(long = "365d")]
        d365: Option<f64>,
    },
    /// Show one prediction to its owner.
    ShowPrediction {
        id: i64,

        /// Analyst id; must own the prediction.
        #[arg(long)]
        user: i64,
    },
    /// Delete an unlocked prediction.
    DeletePrediction {
        id: i64,

        /// Analyst id; must own the prediction.
        #[arg(long)]
        user: i64,
    },
    /// Print a symbol's historical closes and prediction percentiles.
    Chart {
        symbol: String,

        /// Also write the chart as CSV.
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Save chart.json and chart.csv under this directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Rank analysts by mean absolute percentage error.
    Leaderboard {
        /// Horizon: 7d, 28d, 60d, 90d, 180d or 365d.
        #[arg(long, default_value = "7d")]
        horizon: Horizon,

        /// Maximum rows. Defaults to the configured limit.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show an analyst's profile, or their predictions for one stock.
    Analyst {
        id: i64,

        /// List this analyst's predictions for the ticker instead.
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Analyst management.
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Report population progress and per-symbol coverage.
    Status {
        /// Print a Markdown report instead of a summary line.
        #[arg(long, default_value_t = false)]
        markdown: bool,

        /// Write per-symbol coverage as CSV.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// List or search stocks.
    Stocks {
        /// Case-insensitive match on ticker or name.
        #[arg(long)]
        search: Option<String>,

        #[arg(long)]
        sector: Option<String>,

        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Register an analyst.
    Add {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        bio: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stockcast=info,stockcast_core=info,stockcast_runner=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = StockcastConfig::load(cli.config.as_deref())?;
    tracing::debug!(database = %config.database.path.display(), "configuration loaded");

    match cli.command {
        Commands::Init { universe } => run_init(&config, universe.as_deref()),
        Commands::Populate { skip_populated } => run_populate(&config, skip_populated),
        Commands::PopulateChunk { until_done, max } => run_populate_chunk(&config, until_done, max),
        Commands::UpdateDaily { smart, today } => run_update_daily(&config, smart, today),
        Commands::Lock => {
            let store = open_store(&config)?;
            let locked = lock_sweep(&store, Utc::now())?;
            println!("Locked {locked} predictions");
            Ok(())
        }
        Commands::Resolve => {
            let store = open_store(&config)?;
            let summary = resolve_due(&store, &store, Utc::now())?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Commands::Predict {
            user,
            symbol,
            current,
            d7,
            d28,
            d60,
            d90,
            d180,
            d365,
        } => {
            let prices = [
                (Horizon::D7, d7),
                (Horizon::D28, d28),
                (Horizon::D60, d60),
                (Horizon::D90, d90),
                (Horizon::D180, d180),
                (Horizon::D365, d365),
            ]
            .into_iter()
            .filter_map(|(h, p)| p.map(|p| (h, p)))
            .collect();
            run_predict(&config, user, &symbol, current, prices)
        }
        Commands::ShowPrediction { id, user } => {
            let store = open_store(&config)?;
            let prediction = predictions::get_owned(&store, id, user)?;
            println!("{}", serde_json::to_string_pretty(&prediction)?);
            Ok(())
        }
        Commands::DeletePrediction { id, user } => {
            let store = open_store(&config)?;
            predictions::delete(&store, id, user)?;
            println!("Deleted prediction {id}");
            Ok(())
        }
        Commands::Chart {
            symbol,
            csv,
            output_dir,
        } => run_chart(&config, &symbol, csv.as_deref(), output_dir.as_deref()),
        Commands::Leaderboard { horizon, limit } => {
            let store = open_store(&config)?;
            let limit = limit.unwrap_or(config.leaderboard.default_limit);
            let board = accuracy_leaderboard(&store, horizon, limit)?;
            println!("{}", serde_json::to_string_pretty(&board)?);
            Ok(())
        }
        Commands::Analyst {
            id,
            symbol: Some(ticker),
        } => {
            let store = open_store(&config)?;
            let Some(symbol) = store.find_symbol(&ticker.to_uppercase())? else {
                bail!("unknown symbol '{ticker}'");
            };
            let list = predictions::list_for_user(&store, id, Some(symbol.id))?;
            println!("{}", serde_json::to_string_pretty(&list)?);
            Ok(())
        }
        Commands::Analyst { id, symbol: None } => {
            let store = open_store(&config)?;
            let Some(profile) = analyst_profile(&store, id)? else {
                bail!("analyst {id} not found");
            };
            println!("{}", serde_json::to_string_pretty(&profile)?);
            Ok(())
        }
        Commands::User {
            action: UserAction::Add { name, email, bio },
        } => {
            let store = open_store(&config)?;
            let analyst = store.insert_user(&NewAnalyst { name, email, bio })?;
            println!("{}", serde_json::to_string_pretty(&analyst)?);
            Ok(())
        }
        Commands::Status { markdown, csv } => run_status(&config, markdown, csv.as_deref()),
        Commands::Stocks {
            search,
            sector,
            limit,
        } => {
            let store = open_store(&config)?;
            let symbols = store.search_symbols(&SymbolQuery {
                text: search,
                sector,
                limit,
            })?;
            for s in &symbols {
                println!(
                    "{:<6} {:<40} {}",
                    s.ticker,
                    s.name,
                    s.sector.as_deref().unwrap_or("-")
                );
            }
            Ok(())
        }
    }
}

fn open_store(config: &StockcastConfig) -> Result<SqliteStore> {
    SqliteStore::open(&config.database.path)
        .with_context(|| format!("failed to open database {}", config.database.path.display()))
}

/// HTTP provider behind the shared 5-requests-per-minute limiter.
fn build_provider(config: &StockcastConfig) -> Result<Throttled<PolygonProvider>> {
    let provider = PolygonProvider::new(
        config.api_key()?,
        config.provider.base_url.as_str(),
        config.provider.request_timeout(),
    )?;
    let limiter = Arc::new(RateLimiter::new(config.provider.min_request_interval()));
    Ok(Throttled::new(provider, limiter))
}

fn history_range(config: &StockcastConfig) -> HistoryRange {
    HistoryRange::trailing_years(chrono::Local::now().date_naive(), config.provider.history_years)
}

fn run_init(config: &StockcastConfig, universe: Option<&Path>) -> Result<()> {
    let universe = match universe {
        Some(path) => Universe::from_file(path).map_err(anyhow::Error::msg)?,
        None => Universe::default_sp50(),
    };
    let store = open_store(config)?;
    let added = store.seed_symbols(&universe.stocks)?;
    println!(
        "Seeded {added} new symbols ({} in universe) into {}",
        universe.len(),
        config.database.path.display()
    );
    Ok(())
}

fn run_populate(config: &StockcastConfig, skip_populated: bool) -> Result<()> {
    let store = open_store(config)?;
    let provider = build_provider(config)?;
    let summary = populate_all(
        &provider,
        &store,
        history_range(config),
        PopulateOptions { skip_populated },
        &LogProgress,
    )?;

    println!(
        "Populated {}/{} symbols ({} rows, {} without data, {} unchanged, {} already populated)",
        summary.succeeded,
        summary.total,
        summary.rows_inserted,
        summary.skipped,
        summary.unchanged,
        summary.already_populated
    );
    if !summary.all_succeeded() {
        for (sym, err) in &summary.errors {
            eprintln!("Error for {sym}: {err}");
        }
        std::process::exit(1);
    }
    Ok(())
}

fn run_populate_chunk(config: &StockcastConfig, until_done: bool, max: usize) -> Result<()> {
    let store = open_store(config)?;
    let provider = build_provider(config)?;
    let range = history_range(config);

    if until_done {
        let summary = drive_chunks(&provider, &store, range, max)?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        let outcome = populate_next(&provider, &store, range)?;
        println!("{}", serde_json::to_string_pretty(&outcome.report())?);
    }
    Ok(())
}

fn run_update_daily(config: &StockcastConfig, smart: bool, today: Option<String>) -> Result<()> {
    let today = today
        .as_deref()
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()?
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let store = open_store(config)?;
    let provider = build_provider(config)?;

    if smart {
        let summary = update_smart(&provider, &store, today)?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        let summary = update_daily(&provider, &store, today)?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    Ok(())
}

fn run_predict(
    config: &StockcastConfig,
    user_id: i64,
    ticker: &str,
    current_price: f64,
    prices: BTreeMap<Horizon, f64>,
) -> Result<()> {
    let store = open_store(config)?;
    let Some(symbol) = store.find_symbol(&ticker.to_uppercase())? else {
        bail!("unknown symbol '{ticker}'");
    };
    let prediction = NewPrediction {
        user_id,
        symbol_id: symbol.id,
        current_price,
        prices,
    };
    let stored = predictions::submit(&store, &store, &prediction, Utc::now())?;
    println!("{}", serde_json::to_string_pretty(&stored)?);
    Ok(())
}

fn run_chart(
    config: &StockcastConfig,
    ticker: &str,
    csv: Option<&Path>,
    output_dir: Option<&Path>,
) -> Result<()> {
    let store = open_store(config)?;
    let Some(symbol) = store.find_symbol(&ticker.to_uppercase())? else {
        bail!("unknown symbol '{ticker}'");
    };
    let chart = build_chart(&store, &store, &symbol)?;

    println!("{}", export_chart_json(&chart)?);
    if let Some(path) = csv {
        write_chart_csv(&chart, path)?;
        eprintln!("CSV written to: {}", path.display());
    }
    if let Some(dir) = output_dir {
        let saved = save_chart_artifacts(&chart, dir)?;
        eprintln!("Artifacts saved to: {}", saved.display());
    }
    Ok(())
}

fn run_status(config: &StockcastConfig, markdown: bool, csv: Option<&Path>) -> Result<()> {
    let store = open_store(config)?;
    let progress = store.progress()?;
    let coverage = store.coverage()?;

    if markdown {
        print!("{}", generate_coverage_report(&progress, &coverage));
    } else {
        println!(
            "{}/{} symbols settled ({}%), {} with data, {} without, {} price rows",
            progress.symbols_with_data + progress.symbols_no_data,
            progress.total_symbols,
            progress.percent_complete(),
            progress.symbols_with_data,
            progress.symbols_no_data,
            progress.total_prices
        );
    }
    if let Some(path) = csv {
        std::fs::write(path, export_coverage_csv(&coverage)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        eprintln!("Coverage CSV written to: {}", path.display());
    }
    Ok(())
}
