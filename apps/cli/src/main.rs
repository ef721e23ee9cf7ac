use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    config::load_settings, DiagnosisSession, HttpBackend, PredictionPhase, SlotState,
    SubmitOutcome,
};
use serde_json::Value;
use shared::domain::{CorrelationKind, FeatureGroup};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Breast cancer prediction client")]
struct Cli {
    /// Backend base URL; overrides diagnosis_client.toml and the environment.
    #[arg(long)]
    server_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the 30 measurements the predictor expects.
    Features,
    /// Check that the backend is reachable.
    Health,
    /// Submit measurements and print the predicted diagnosis.
    Predict {
        /// JSON object mapping feature names to values.
        #[arg(long)]
        input: Option<PathBuf>,
        /// A single measurement, e.g. --feature "mean radius=17.99".
        #[arg(long = "feature", value_name = "NAME=VALUE")]
        features: Vec<String>,
        /// Submit even if some measurements are missing.
        #[arg(long)]
        allow_partial: bool,
    },
    /// Download the four correlation matrices.
    Correlations {
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = load_settings();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&settings.log_filter).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let server_url = cli.server_url.unwrap_or(settings.server_url);
    let backend = Arc::new(
        HttpBackend::new(&server_url).with_context(|| "cannot use configured backend url")?,
    );
    tracing::debug!(url = %backend.base_url(), "backend configured");

    match cli.command {
        Command::Features => {
            for group in FeatureGroup::ALL {
                println!("{}:", group.title());
                for feature in group.features() {
                    println!("  {feature}");
                }
            }
        }
        Command::Health => {
            let message = backend
                .health()
                .await
                .with_context(|| format!("backend at {} is unreachable", backend.base_url()))?;
            println!("{message}");
        }
        Command::Predict {
            input,
            features,
            allow_partial,
        } => predict(backend, input, features, allow_partial).await?,
        Command::Correlations { out_dir } => correlations(backend, out_dir).await?,
    }

    Ok(())
}

async fn predict(
    backend: Arc<HttpBackend>,
    input: Option<PathBuf>,
    assignments: Vec<String>,
    allow_partial: bool,
) -> Result<()> {
    let session = DiagnosisSession::new(backend);

    if let Some(path) = input {
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        let values: serde_json::Map<String, Value> = serde_json::from_str(&raw)
            .with_context(|| format!("'{}' is not a JSON object", path.display()))?;
        for (name, value) in &values {
            session
                .set_field_by_name(name, &raw_input(value)?)
                .await?;
        }
    }
    for assignment in &assignments {
        let (name, value) = parse_assignment(assignment)?;
        session.set_field_by_name(name, value).await?;
    }

    let missing = session.missing_features().await;
    if !missing.is_empty() && !allow_partial {
        let names: Vec<&str> = missing.iter().map(|feature| feature.name()).collect();
        bail!(
            "{} measurement(s) missing: {} (pass --allow-partial to submit anyway)",
            missing.len(),
            names.join(", ")
        );
    }

    match session.submit().await {
        SubmitOutcome::Applied(PredictionPhase::Succeeded(result)) => {
            println!("Probability of Malignancy: {}", result.probability_percent());
            println!("Diagnosis: {}", result.diagnosis);
            Ok(())
        }
        SubmitOutcome::Applied(PredictionPhase::Failed(err)) => bail!("prediction failed: {err}"),
        other => bail!("prediction did not settle: {other:?}"),
    }
}

async fn correlations(backend: Arc<HttpBackend>, out_dir: PathBuf) -> Result<()> {
    let session = DiagnosisSession::new(backend);
    session.show_correlations().await;

    fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create '{}'", out_dir.display()))?;

    let mut failed = Vec::new();
    for kind in CorrelationKind::ALL {
        match session.correlation_slot(kind).await {
            SlotState::Loaded(handle) => {
                let path = out_dir.join(format!("corr_{}.png", kind.slug()));
                fs::write(&path, handle.bytes())
                    .with_context(|| format!("failed to write '{}'", path.display()))?;
                println!("{}: {}", kind.title(), path.display());
            }
            SlotState::Failed(message) => {
                eprintln!("{}: {message}", kind.title());
                failed.push(kind.slug());
            }
            other => {
                eprintln!("{}: did not settle ({other:?})", kind.title());
                failed.push(kind.slug());
            }
        }
    }

    if !failed.is_empty() {
        bail!("failed to load correlation matrices: {}", failed.join(", "));
    }
    Ok(())
}

fn parse_assignment(assignment: &str) -> Result<(&str, &str)> {
    assignment
        .split_once('=')
        .map(|(name, value)| (name.trim(), value))
        .with_context(|| format!("expected NAME=VALUE, got '{assignment}'"))
}

/// Raw form text for a JSON value; `null` clears the field.
fn raw_input(value: &Value) -> Result<String> {
    match value {
        Value::Number(number) => Ok(number.to_string()),
        Value::String(text) => Ok(text.clone()),
        Value::Null => Ok(String::new()),
        other => bail!("unsupported measurement value: {other}"),
    }
}
