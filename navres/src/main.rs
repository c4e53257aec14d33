//! navres - place query resolution CLI
//!
//! Loads configuration, opens the outcome database, registers every provider
//! that has an API key, and runs one command. Results are printed to stdout
//! as pretty JSON; logs go to stderr or the configured log file.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use navres::config::build_providers;
use navres::db::{init_database_pool, SqliteOutcomeStore, DATABASE_FILE};
use navres::providers::ParallelGeocoder;
use navres::services::outcome_store::FeedbackSummary;
use navres::{Candidate, Pattern, ResolveError, Resolver, ResolverOptions, SideSignals};
use navres_common::config::{load_toml_config, resolve_config_path, resolve_data_folder};
use serde::Serialize;
use tracing::info;

/// Command-line arguments for navres
#[derive(Parser, Debug)]
#[command(name = "navres")]
#[command(about = "Resolve place queries to coordinates across multiple geocoding providers")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Folder holding the outcome database
    #[arg(short, long, global = true)]
    data_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a query through the learned provider cascade
    Resolve {
        query: String,
    },

    /// Cross-check a query against every verification source
    Verify {
        query: String,
    },

    /// Pick the best location for a business using side signals
    Select {
        business: String,

        #[command(flatten)]
        signals: SignalArgs,
    },

    /// Record whether a served location was correct
    Feedback {
        query: String,

        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        #[arg(long)]
        address: String,

        /// Provider that served the location
        #[arg(long, default_value = "unknown")]
        provider: String,

        #[arg(long, conflicts_with = "incorrect", required_unless_present = "incorrect")]
        correct: bool,

        #[arg(long)]
        incorrect: bool,
    },

    /// Show learned routing statistics and feedback accuracy
    Stats,
}

#[derive(ClapArgs, Debug)]
struct SignalArgs {
    /// Phone number listed for the business
    #[arg(long)]
    phone: Option<String>,

    /// Address text from the listing
    #[arg(long)]
    address: Option<String>,

    /// Neighbourhood or city hint
    #[arg(long)]
    area: Option<String>,
}

impl From<SignalArgs> for SideSignals {
    fn from(args: SignalArgs) -> Self {
        SideSignals {
            phone_number: args.phone,
            address_hint: args.address,
            area_hint: args.area,
        }
    }
}

#[derive(Serialize)]
struct PatternReport {
    pattern: Pattern,
    total_observations: u64,
    provider_successes: std::collections::BTreeMap<String, u64>,
    feedback: FeedbackSummary,
    accuracy: Option<f64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref()).context("Failed to locate config file")?;
    let config = load_toml_config(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    navres_common::logging::init(&config.logging).context("Failed to initialize logging")?;

    let data_folder = resolve_data_folder(args.data_folder.as_deref(), &config);
    info!("Config: {}", config_path.display());
    info!("Data folder: {}", data_folder.display());

    let pool = init_database_pool(&data_folder.join(DATABASE_FILE))
        .await
        .context("Failed to open outcome database")?;
    let store = Arc::new(SqliteOutcomeStore::new(pool));

    let providers = build_providers(&config);
    let options = ResolverOptions::from_settings(&config.resolver, &config.known_locations);
    let provider_timeout = options.provider_timeout;

    let resolver = Resolver::new(
        providers.cascade.clone(),
        providers.verification.clone(),
        store,
        options,
    )
    .await
    .context("Failed to initialize resolver")?;

    match args.command {
        Command::Resolve { query } => {
            if providers.cascade.is_empty() {
                bail!("No providers configured; set at least one API key");
            }
            match resolver.resolve(&query).await {
                Ok(candidate) => print_json(&candidate)?,
                Err(ResolveError::NotFound(query)) => bail!("No confident location found for '{}'", query),
                Err(e) => return Err(e.into()),
            }
        }

        Command::Verify { query } => {
            let result = resolver.verify(&query, None).await;
            print_json(&result)?;
        }

        Command::Select { business, signals } => {
            let candidates = ParallelGeocoder::new(providers.cascade.clone())
                .with_timeout(provider_timeout)
                .geocode_all(&business)
                .await;
            let signals = SideSignals::from(signals);

            match resolver.select_best(&business, &candidates, &signals) {
                Ok(best) => print_json(&best)?,
                Err(ResolveError::NoConfidentMatch { best_score, .. }) => {
                    bail!(
                        "No confident match for '{}' among {} candidate(s) (best score: {})",
                        business,
                        candidates.len(),
                        best_score.map_or("n/a".to_string(), |s| format!("{:.2}", s))
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Command::Feedback {
            query,
            lat,
            lon,
            address,
            provider,
            correct,
            incorrect: _,
        } => {
            let served = Candidate::new(lat, lon, address, 1.0, provider);
            resolver.record_feedback(&query, served, correct).await;
            info!(query = %query, correct, "Feedback submitted");
        }

        Command::Stats => {
            let stats = resolver.routing_stats().await;
            let mut report = Vec::with_capacity(Pattern::ALL.len());
            for pattern in Pattern::ALL {
                let feedback = resolver
                    .feedback_summary(pattern)
                    .await
                    .with_context(|| format!("Failed to load feedback for {}", pattern))?;
                let stat = stats.get(&pattern).cloned().unwrap_or_default();
                report.push(PatternReport {
                    pattern,
                    total_observations: stat.total_observations,
                    provider_successes: stat.provider_counts,
                    accuracy: feedback.accuracy(),
                    feedback,
                });
            }
            print_json(&report)?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
