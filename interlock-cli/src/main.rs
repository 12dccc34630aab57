//! Interlock CLI - DUI penalty calculator and case risk assessment

#![deny(warnings)]

// Global invariants enforced:
// - Results go to stdout, logs and progress to stderr
// - Batch output preserves input order

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use interlock_core::analysis::{calculate_penalty, AssessOptions, PenaltyRequest};
use interlock_core::config::{self, ResolvedConfig};
use interlock_core::defense::defense_strategies;
use interlock_core::recommend::recommendations;
use interlock_core::report::{self, render_json};
use interlock_core::{analyst_from_config, analyze_case, health, CaseRecord, ChargeMode, NSW_RULE_TABLE};
use rayon::prelude::*;
use serde::de::DeserializeOwned;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "interlock")]
#[command(about = "NSW drink driving penalty calculator and case risk assessment")]
#[command(version)]
struct Cli {
    /// Path to config file (default: auto-discover)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Reject unknown additional charges instead of ignoring them
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Calculate the penalty range for a BAC reading
    Penalty {
        /// Blood alcohol concentration in g/100mL
        #[arg(long, allow_negative_numbers = true)]
        bac: f64,

        /// Number of prior offenses
        #[arg(long, default_value = "0", allow_negative_numbers = true)]
        priors: i64,

        /// Additional charge (repeatable), e.g. REFUSE_BREATH_TEST
        #[arg(long = "charge")]
        charges: Vec<String>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Produce a narrative risk report for a case file ("-" reads stdin)
    Analyze {
        case: PathBuf,

        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Suggest defense strategies for a case file
    Defense {
        case: PathBuf,

        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Recommendations and preparation timeline for a case file
    Recommend {
        case: PathBuf,

        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Calculate penalties for a JSON array of requests
    Batch {
        requests: PathBuf,

        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Print the penalty rule table
    Table {
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Show analyst mode and rule table version
    Health {
        #[arg(long, default_value = "json")]
        format: OutputFormat,
    },
    /// Validate or show configuration
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file
    Validate {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the resolved configuration (defaults + config file + environment)
    Show {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);
    if env_bool("INTERLOCK_LOG_JSON", false) {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?
    };
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

fn load_config(cli_config: Option<&Path>, strict: bool) -> anyhow::Result<ResolvedConfig> {
    let cwd = std::env::current_dir()?;
    let mut resolved =
        config::load_and_resolve(&cwd, cli_config).context("failed to load configuration")?;
    if let Some(ref p) = resolved.config_path {
        tracing::info!(path = %p.display(), "using config");
    }
    // CLI flags override config file values
    if strict {
        resolved.charge_mode = ChargeMode::Strict;
    }
    Ok(resolved)
}

fn print_output(format: OutputFormat, text: impl FnOnce() -> String, json: impl FnOnce() -> String) {
    match format {
        OutputFormat::Text => print!("{}", text()),
        OutputFormat::Json => println!("{}", json()),
    }
}

fn run_batch(
    requests: &[PenaltyRequest],
    options: &AssessOptions,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let progress = ProgressBar::new(requests.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} requests")
            .context("invalid progress template")?
            .progress_chars("=> "),
    );

    let results: Vec<_> = requests
        .par_iter()
        .map(|request| {
            let result = calculate_penalty(request, options);
            progress.inc(1);
            result
        })
        .collect();
    progress.finish_and_clear();

    let failed = results.iter().filter(|r| r.is_err()).count();
    if failed > 0 {
        tracing::warn!(failed, total = results.len(), "some batch requests were rejected");
    }

    print_output(
        format,
        || report::render_batch_text(&results),
        || {
            let values: Vec<serde_json::Value> = results
                .iter()
                .map(|r| match r {
                    Ok(a) => serde_json::to_value(a).unwrap_or(serde_json::Value::Null),
                    Err(e) => serde_json::json!({ "error": e.to_string() }),
                })
                .collect();
            render_json(&values)
        },
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Penalty {
            bac,
            priors,
            charges,
            format,
        } => {
            let resolved = load_config(config_path, cli.strict)?;
            let request = PenaltyRequest::new(bac, priors).with_charges(charges);
            let assessment = calculate_penalty(&request, &resolved.assess_options())?;
            print_output(
                format,
                || report::render_assessment_text(&assessment),
                || render_json(&assessment),
            );
        }
        Commands::Analyze { case, format } => {
            let resolved = load_config(config_path, cli.strict)?;
            let record: CaseRecord = read_json(&case)?;
            let analyst = analyst_from_config(&resolved);
            tracing::debug!(analyst = analyst.name(), "analyzing case");
            let narrative = analyze_case(&record, analyst.as_ref())?;
            print_output(
                format,
                || report::render_narrative_text(&narrative),
                || render_json(&narrative),
            );
        }
        Commands::Defense { case, format } => {
            let record: CaseRecord = read_json(&case)?;
            record.validate()?;
            let defenses = defense_strategies(&record);
            print_output(
                format,
                || report::render_defense_text(&defenses),
                || render_json(&defenses),
            );
        }
        Commands::Recommend { case, format } => {
            let resolved = load_config(config_path, cli.strict)?;
            let record: CaseRecord = read_json(&case)?;
            let analyst = analyst_from_config(&resolved);
            let narrative = analyze_case(&record, analyst.as_ref())?;
            let recs = recommendations(&narrative, &record)?;
            print_output(
                format,
                || report::render_recommendations_text(&recs),
                || render_json(&recs),
            );
        }
        Commands::Batch { requests, format } => {
            let resolved = load_config(config_path, cli.strict)?;
            let requests: Vec<PenaltyRequest> = read_json(&requests)?;
            run_batch(&requests, &resolved.assess_options(), format)?;
        }
        Commands::Table { format } => {
            print_output(
                format,
                || report::render_table_text(&NSW_RULE_TABLE),
                || render_json(&report::table_rows(&NSW_RULE_TABLE)),
            );
        }
        Commands::Health { format } => {
            let resolved = load_config(config_path, cli.strict)?;
            let status = health(&resolved);
            print_output(
                format,
                || {
                    format!(
                        "status: {}\nprovider: {}\nmock mode: {}\nrule table: {} ({})\n",
                        status.status,
                        status.provider,
                        status.mock_mode,
                        status.rule_table_version,
                        status.jurisdiction
                    )
                },
                || render_json(&status),
            );
        }
        Commands::Config { action } => match action {
            ConfigAction::Validate { path } => {
                let cwd = std::env::current_dir()?;
                match config::load_and_resolve(&cwd, path.as_deref().or(config_path)) {
                    Ok(resolved) => {
                        if let Some(ref p) = resolved.config_path {
                            println!("Config valid: {}", p.display());
                        } else {
                            println!("No config file found. Using defaults.");
                        }
                    }
                    Err(e) => {
                        eprintln!("Config validation failed: {:#}", e);
                        std::process::exit(1);
                    }
                }
            }
            ConfigAction::Show { path } => {
                let resolved = load_config(path.as_deref().or(config_path), cli.strict)?;
                show_config(&resolved);
            }
        },
    }

    Ok(())
}

fn show_config(resolved: &ResolvedConfig) {
    println!("Configuration:");
    if let Some(ref p) = resolved.config_path {
        println!("  Source: {}", p.display());
    } else {
        println!("  Source: defaults (no config file found)");
    }
    println!();
    println!(
        "Charge mode: {}",
        match resolved.charge_mode {
            ChargeMode::Lenient => "lenient",
            ChargeMode::Strict => "strict",
        }
    );
    println!();
    println!("Risk thresholds:");
    println!("  medium_bac: {}", resolved.risk_thresholds.medium_bac);
    println!("  high_bac: {}", resolved.risk_thresholds.high_bac);
    println!("  medium_priors: {}", resolved.risk_thresholds.medium_priors);
    println!("  high_priors: {}", resolved.risk_thresholds.high_priors);
    println!();
    println!("Analyst:");
    println!(
        "  mode: {}",
        if resolved.api_key().is_some() {
            "live with heuristic fallback"
        } else {
            "heuristic"
        }
    );
    println!("  endpoint: {}", resolved.ai.endpoint);
    println!("  model: {}", resolved.ai.model);
    println!("  timeout_ms: {}", resolved.ai.timeout.as_millis());
    println!("  max_tokens: {}", resolved.ai.max_tokens);
    println!();
    println!("Rate limit:");
    println!("  window_ms: {}", resolved.rate_limit.window.as_millis());
    println!("  max_requests: {}", resolved.rate_limit.max_requests);
}
