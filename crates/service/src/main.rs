//! Khet Sahayak CLI
//!
//! Trains the fertilizer recommender from the configured CSV and then lists
//! classes, answers a single recommendation, prints a training report or
//! serves the HTTP API.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use khet_service::{
    api, RangePolicy, RecommendationRequest, RecommendationService, ServiceConfig, TrainingReport,
};
use khet_trainer::{fit_pipeline, Dataset};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "khet-sahayak")]
#[command(author = "Khet Sahayak Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fertilizer recommendations from soil, climate and crop data", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Training CSV (overrides config and KHET_DATA_PATH)
    #[arg(short, long, global = true)]
    data: Option<PathBuf>,

    /// Number of trees in the forest
    #[arg(long, global = true)]
    trees: Option<usize>,

    /// Random seed for training
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Out-of-range numeric inputs: reject or clamp
    #[arg(long, global = true)]
    range_policy: Option<RangePolicy>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the soil and crop types the model accepts
    Classes,

    /// Recommend a fertilizer for one set of readings
    Recommend(RecommendArgs),

    /// Train, print a report and optionally export the model
    Train {
        /// Directory to write model.json and model.hash into
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Serve the HTTP API
    Serve {
        /// Listen host (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Listen port (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Args, Debug)]
struct RecommendArgs {
    /// Temperature in °C (0-60)
    #[arg(long, default_value_t = 25.0)]
    temperature: f64,

    /// Relative humidity in % (0-100)
    #[arg(long, default_value_t = 50.0)]
    humidity: f64,

    /// Soil moisture in % (0-100)
    #[arg(long, default_value_t = 30.0)]
    moisture: f64,

    /// Soil type; defaults to the first known type
    #[arg(long)]
    soil_type: Option<String>,

    /// Crop type; defaults to the first known type
    #[arg(long)]
    crop_type: Option<String>,

    /// Nitrogen (0-200)
    #[arg(long, default_value_t = 100)]
    nitrogen: i64,

    /// Phosphorus (0-200)
    #[arg(long, default_value_t = 100)]
    phosphorus: i64,

    /// Potassium (0-200)
    #[arg(long, default_value_t = 100)]
    potassium: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let mut config = load_config(&cli)?;

    match cli.command {
        Command::Classes => {
            let service = build_service(&config)?;
            println!("Soil types: {}", service.soil_classes().join(", "));
            println!("Crop types: {}", service.crop_classes().join(", "));
        }
        Command::Recommend(args) => {
            let service = build_service(&config)?;
            let request = recommendation_request(&service, args)?;
            let fertilizer = service
                .recommend(&request)
                .context("Recommendation failed")?;
            println!("{fertilizer}");
        }
        Command::Train { output } => train(&config, output.as_deref())?,
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            config.validate().context("Invalid configuration")?;

            let service = Arc::new(build_service(&config)?);
            api::serve(service, &config.bind_address()).await?;
            info!("Khet Sahayak stopped");
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .context("Failed to set tracing subscriber")?;

    Ok(())
}

fn load_config(cli: &Cli) -> Result<ServiceConfig> {
    let mut config =
        ServiceConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    if let Some(data) = &cli.data {
        config.data_path = data.clone();
    }
    if let Some(trees) = cli.trees {
        config.forest.n_estimators = trees;
    }
    if let Some(seed) = cli.seed {
        config.forest.seed = seed;
    }
    if let Some(policy) = cli.range_policy {
        config.range_policy = policy;
    }

    Ok(config)
}

fn build_service(config: &ServiceConfig) -> Result<RecommendationService> {
    RecommendationService::from_config(config).context("Failed to initialise the recommender")
}

fn recommendation_request(
    service: &RecommendationService,
    args: RecommendArgs,
) -> Result<RecommendationRequest> {
    let soil_type = match args.soil_type {
        Some(soil) => soil,
        None => service
            .soil_classes()
            .first()
            .cloned()
            .context("Model has no soil types")?,
    };
    let crop_type = match args.crop_type {
        Some(crop) => crop,
        None => service
            .crop_classes()
            .first()
            .cloned()
            .context("Model has no crop types")?,
    };

    Ok(RecommendationRequest {
        temperature: args.temperature,
        humidity: args.humidity,
        moisture: args.moisture,
        soil_type,
        crop_type,
        nitrogen: args.nitrogen,
        phosphorus: args.phosphorus,
        potassium: args.potassium,
    })
}

fn train(config: &ServiceConfig, output: Option<&Path>) -> Result<()> {
    config.validate().context("Invalid configuration")?;

    info!("Loading dataset from: {}", config.data_path.display());
    let dataset = Dataset::from_csv(&config.data_path).context("Failed to load dataset")?;

    let params = config.forest.to_params();
    info!(
        "Training {} trees (seed {}, max_features {}, max_depth {:?})",
        params.n_estimators, params.seed, params.max_features, params.max_depth
    );
    let pipeline = fit_pipeline(&dataset, &params).context("Training failed")?;
    let report = TrainingReport::new(&dataset, &pipeline).context("Failed to build report")?;
    println!("{report}");

    if let Some(dir) = output {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

        let model_path = dir.join("model.json");
        let canonical_json = pipeline
            .model
            .to_canonical_json()
            .context("Failed to serialize model")?;
        std::fs::write(&model_path, &canonical_json)
            .with_context(|| format!("Failed to write {}", model_path.display()))?;

        let hash_path = dir.join("model.hash");
        std::fs::write(&hash_path, &report.fingerprint)
            .with_context(|| format!("Failed to write {}", hash_path.display()))?;

        info!("Model: {}", model_path.display());
        info!("Hash: {} ({})", hash_path.display(), report.fingerprint);
    }

    Ok(())
}
