use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;

use flight_delay::{
    api::{self, AppState},
    config::ServiceConfig,
    dataset,
    model::BoostParams,
    store::{FileModelStore, LayeredModelStore, ModelStore, RetryPolicy, RetryingStore},
    DelayClassifier, DelayError, FeatureBuilder, FeatureSelector, FlightDetail, PredictionService,
    TrainOptions,
};

#[derive(Parser)]
#[command(name = "flight_delay", about = "Flight delay prediction service", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve predictions over HTTP
    Serve {
        /// Listen port (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Train a model from historical flight data and save it to the model store
    Train {
        /// CSV file with historical flights
        #[arg(short, long)]
        data: PathBuf,

        /// Share of rows held out for evaluation
        #[arg(long, default_value_t = 0.33)]
        holdout: f64,

        /// Seed for the holdout split
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Boosting rounds
        #[arg(long, default_value_t = 100)]
        rounds: usize,

        /// Learning rate
        #[arg(long, default_value_t = 0.01)]
        learning_rate: f32,

        /// Also write the training report to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Score a single flight with the stored model
    Predict {
        /// Operating airline (OPERA)
        #[arg(short, long)]
        airline: String,

        /// Flight type, N or I (TIPOVUELO)
        #[arg(short = 't', long)]
        flight_type: String,

        /// Month, 1-12 (MES)
        #[arg(short, long)]
        month: i64,
    },
}

pub fn build_store(config: &ServiceConfig) -> Box<dyn ModelStore> {
    let primary: Box<dyn ModelStore> = Box::new(FileModelStore::new(&config.model_path));
    let store: Box<dyn ModelStore> = match &config.fallback_model_path {
        Some(fallback) => Box::new(LayeredModelStore::new(
            primary,
            Box::new(FileModelStore::new(fallback)),
        )),
        None => primary,
    };
    let policy = RetryPolicy {
        max_attempts: config.store_retry_attempts.max(1),
        ..Default::default()
    };
    Box::new(RetryingStore::new(store, policy))
}

pub async fn run(cli: Cli, config: ServiceConfig) -> Result<()> {
    match cli.command {
        Commands::Serve { port } => serve(config, port).await,
        Commands::Train {
            data,
            holdout,
            seed,
            rounds,
            learning_rate,
            report,
        } => {
            let options = TrainOptions {
                boost: BoostParams {
                    n_estimators: rounds,
                    learning_rate,
                    ..Default::default()
                },
                holdout_fraction: holdout,
                seed,
            };
            tokio::task::spawn_blocking(move || train(&config, &data, &options, report.as_deref()))
                .await
                .context("training task panicked")?
        }
        Commands::Predict {
            airline,
            flight_type,
            month,
        } => tokio::task::spawn_blocking(move || predict(&config, FlightDetail::new(airline, flight_type, month)))
            .await
            .context("prediction task panicked")?,
    }
}

async fn serve(config: ServiceConfig, port: Option<u16>) -> Result<()> {
    let schema = config.feature_schema()?;
    let classifier = Arc::new(DelayClassifier::new());

    let store = build_store(&config);
    let location = store.location();
    let loader = Arc::clone(&classifier);
    let loaded = tokio::task::spawn_blocking(move || loader.load_from(store.as_ref()))
        .await
        .context("model load task panicked")?;
    match loaded {
        Ok(_) => {}
        Err(DelayError::Store(e)) if e.is_not_found() => {
            tracing::warn!(location = %location, "no model artifact yet; /predict answers 503 until one is trained");
        }
        Err(e) => return Err(e).with_context(|| format!("loading model from {location}")),
    }

    let service = PredictionService::new(schema, classifier)?;
    let app = api::router(AppState::new(service));

    let port = port.unwrap_or(config.port);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn train(
    config: &ServiceConfig,
    data: &std::path::Path,
    options: &TrainOptions,
    report_path: Option<&std::path::Path>,
) -> Result<()> {
    let schema = config.feature_schema()?;
    let selector = FeatureSelector::from_schema(&schema)?;
    let records = dataset::load_records(data).with_context(|| format!("reading {}", data.display()))?;
    let (set, summary) = dataset::build_training_set(records, &FeatureBuilder::new(), &selector);

    let classifier = DelayClassifier::new();
    let report = classifier.train(&set, &schema, options)?;
    let model = classifier
        .snapshot()
        .context("classifier holds no model after a successful training run")?;

    let store = build_store(config);
    store
        .save(&model)
        .with_context(|| format!("saving model to {}", store.location()))?;

    let out = serde_json::to_string_pretty(&json!({
        "rows": summary,
        "training": report,
        "model": store.location(),
    }))?;
    if let Some(path) = report_path {
        std::fs::write(path, &out).with_context(|| format!("writing report to {}", path.display()))?;
    }
    println!("{out}");
    Ok(())
}

fn predict(config: &ServiceConfig, flight: FlightDetail) -> Result<()> {
    let schema = config.feature_schema()?;
    let classifier = Arc::new(DelayClassifier::new());
    let store = build_store(config);
    classifier
        .load_from(store.as_ref())
        .with_context(|| format!("loading model from {}", store.location()))?;

    let service = PredictionService::new(schema, classifier)?;
    let results = service.predict(std::slice::from_ref(&flight))?;
    for result in &results {
        println!(
            "{}",
            serde_json::to_string(&json!({
                "flight": flight,
                "probability": result.probability,
                "predict": result.label(),
            }))?
        );
    }
    Ok(())
}
