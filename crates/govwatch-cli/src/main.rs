mod display;
mod io;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use govwatch_ai::{AiProvider, Assessor, FileProvider};
use govwatch_core::config::TemporalConfig;
use govwatch_core::schema::{document_scores_to_batch, weekly_aggregates_to_batch};
use govwatch_core::temporal::aggregate_weekly;
use govwatch_core::trends::{correlation_matrix, detect_anomalies};
use govwatch_core::{RuleSet, RulesConfig, TierEngine, classify, convergence};
use govwatch_store::{MemoryStore, ScoreStore, TemporalService, WeekRange};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "govwatch", version, about = "Severity monitoring for government text")]
struct Cli {
    /// Rules JSON replacing the embedded defaults.
    #[arg(long, global = true, env = "GOVWATCH_RULES")]
    rules: Option<PathBuf>,

    /// Print JSON to stdout instead of cards and tables.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify each item of a JSON array of content items.
    Classify { items: PathBuf },

    /// Assess categories from a JSON object of category -> items.
    Assess {
        input: PathBuf,
        /// JSON object of category -> AI opinion.
        #[arg(long)]
        opinions: Option<PathBuf>,
        /// Only this category.
        #[arg(long)]
        category: Option<String>,
        /// Document scores to check for weekly trend anomalies.
        #[arg(long)]
        scores: Option<PathBuf>,
    },

    /// Score each document per category.
    Score {
        input: PathBuf,
        /// Write scores to this file (.json, or .arrow for Arrow IPC).
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Aggregate document scores into weekly and cumulative views.
    Aggregate {
        scores: PathBuf,
        /// Persist to a DuckDB database file.
        #[arg(long)]
        db: Option<PathBuf>,
        #[arg(long)]
        half_life: Option<f64>,
    },

    /// Detect convergence of infrastructure themes across categories.
    Converge {
        input: PathBuf,
        #[arg(long)]
        opinions: Option<PathBuf>,
    },

    /// Summarise the loaded rule set.
    Rules { category: Option<String> },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.rules {
        Some(path) => RulesConfig::load(path)?,
        None => RulesConfig::embedded()?,
    };
    let rules = Arc::new(RuleSet::compile(config).context("compiling rules")?);
    info!(version = %rules.config().version, "govwatch v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Classify { items } => cmd_classify(&items, cli.json),
        Command::Assess {
            input,
            opinions,
            category,
            scores,
        } => {
            cmd_assess(
                rules,
                &input,
                opinions.as_deref(),
                category.as_deref(),
                scores.as_deref(),
                cli.json,
            )
            .await
        }
        Command::Score { input, out } => cmd_score(&rules, &input, out.as_deref(), cli.json),
        Command::Aggregate {
            scores,
            db,
            half_life,
        } => {
            let config = temporal_config(&rules, half_life);
            let scores = io::read_scores(&scores)?;
            match db {
                #[cfg(feature = "duckdb")]
                Some(path) => {
                    let store = govwatch_store::DuckStore::open_persistent(&path)?;
                    run_aggregate(store, config, &scores, cli.json)
                }
                #[cfg(not(feature = "duckdb"))]
                Some(_) => anyhow::bail!("--db requires the duckdb feature"),
                None => run_aggregate(MemoryStore::new(), config, &scores, cli.json),
            }
        }
        Command::Converge { input, opinions } => {
            cmd_converge(rules, &input, opinions.as_deref(), cli.json).await
        }
        Command::Rules { category } => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(rules.config())?);
            } else {
                display::print_rules_summary(&rules, category.as_deref());
            }
            Ok(())
        }
    }
}

fn load_provider(opinions: Option<&Path>) -> anyhow::Result<Option<FileProvider>> {
    opinions
        .map(|p| FileProvider::load(p).with_context(|| format!("loading opinions {}", p.display())))
        .transpose()
}

fn temporal_config(rules: &RuleSet, half_life: Option<f64>) -> TemporalConfig {
    let mut config = rules.config().temporal;
    if let Some(h) = half_life {
        config.half_life_weeks = h;
    }
    config
}

fn cmd_classify(path: &Path, json: bool) -> anyhow::Result<()> {
    let items: Vec<govwatch_core::ContentItem> = io::read_json(path)?;
    let rows: Vec<_> = items.iter().map(|i| (i.title.clone(), classify(i))).collect();
    if json {
        let out: Vec<_> = rows
            .iter()
            .map(|(title, class)| json!({ "title": title, "class": class }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        display::print_classifications(&rows);
    }
    Ok(())
}

async fn cmd_assess(
    rules: Arc<RuleSet>,
    input: &Path,
    opinions: Option<&Path>,
    category: Option<&str>,
    scores: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    let batches = io::read_batches(input, category)?;
    let provider = load_provider(opinions)?;
    let weekly = match scores {
        Some(path) => aggregate_weekly(&io::read_scores(path)?, rules.config().temporal.top_keywords),
        None => Vec::new(),
    };
    let anomaly_z = rules.config().temporal.anomaly_z;

    let assessor = Assessor::new(rules);
    let mut results = assessor
        .assess_all(&batches, provider.as_ref().map(|p| p as &dyn AiProvider), Utc::now())
        .await;
    if scores.is_some() {
        results = results
            .into_iter()
            .map(|a| {
                let anomalies = detect_anomalies(&a.category, &weekly, anomaly_z);
                a.with_trend_anomalies(anomalies)
            })
            .collect();
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for a in &results {
            display::print_assessment_card(a);
        }
    }
    Ok(())
}

fn cmd_score(rules: &RuleSet, input: &Path, out: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let batches = io::read_batches(input, None)?;
    let engine = TierEngine::new(rules);
    let today = Utc::now().date_naive();
    let scores: Vec<_> = batches
        .iter()
        .flat_map(|(category, items)| engine.score_documents(category, items, today))
        .collect();
    info!(documents = scores.len(), "documents scored");

    if let Some(path) = out {
        io::write_scores(path, &scores)?;
        info!(path = %path.display(), "scores written");
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&scores)?);
    } else {
        display::print_batches(&[document_scores_to_batch(&scores)?])?;
    }
    Ok(())
}

fn run_aggregate<S: ScoreStore>(
    store: S,
    config: TemporalConfig,
    scores: &[govwatch_core::DocumentScore],
    json: bool,
) -> anyhow::Result<()> {
    let mut service = TemporalService::new(store, config);
    service.record(scores)?;
    let rows = service.recompute_all()?;
    info!(weekly_rows = rows, "aggregation complete");

    let categories = service.store().categories()?;
    let mut weekly = Vec::new();
    for category in &categories {
        weekly.extend(service.store().weekly_range(category, WeekRange::all())?);
    }
    let cumulative: Vec<_> = categories.iter().map(|c| service.cumulative(c)).collect();
    let anomalies: Vec<_> = categories.iter().flat_map(|c| service.anomalies(c)).collect();
    let correlations = correlation_matrix(&weekly);

    if json {
        let out = json!({
            "weekly": weekly,
            "cumulative": cumulative,
            "anomalies": anomalies,
            "correlations": correlations,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    display::print_batches(&[weekly_aggregates_to_batch(&weekly)?])?;
    println!();
    for c in &cumulative {
        display::print_cumulative_card(c);
    }
    for a in &anomalies {
        println!("  anomaly {:<18} {} score {:.2} (z {:+.2})", a.category, a.week_of, a.score, a.z_score);
    }
    for c in correlations.iter().filter(|c| c.shared_weeks >= 2) {
        println!(
            "  correlation {} ~ {}: {:+.2} over {} weeks",
            c.left, c.right, c.coefficient, c.shared_weeks
        );
    }
    Ok(())
}

async fn cmd_converge(
    rules: Arc<RuleSet>,
    input: &Path,
    opinions: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    let batches = io::read_batches(input, None)?;
    let provider = load_provider(opinions)?;
    let assessor = Assessor::new(rules.clone());
    let now = Utc::now();
    let assessments = assessor
        .assess_all(&batches, provider.as_ref().map(|p| p as &dyn AiProvider), now)
        .await;
    let snapshots: Vec<_> = assessments.iter().map(|a| a.snapshot()).collect();
    let result = convergence::analyze(&rules, &snapshots, now);

    if json {
        let out = json!({ "assessment": result, "point": result.to_point() });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        display::print_convergence_card(&result);
    }
    Ok(())
}
