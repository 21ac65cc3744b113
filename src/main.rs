use anyhow::{Context, Result};
use clap::Parser;
use smartfarm_vision::{config::DetectionConfig, web::serve, Config};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "smartfarm-vision")]
#[command(about = "Crop ripeness prediction service for the smart-farm app")]
struct Args {
    /// Server bind address
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:5000")]
    bind: String,

    /// Number of worker threads
    #[arg(long, env = "WORKERS")]
    workers: Option<usize>,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Model directory path
    #[arg(long, env = "MODELS_DIR", default_value = "models")]
    models_dir: String,

    /// Where uploaded crop photos are stored
    #[arg(long, env = "UPLOAD_DIR", default_value = "static/uploads/crop_images")]
    upload_dir: String,

    /// Ripeness model weights file inside the models directory
    #[arg(long, env = "RIPENESS_MODEL", default_value = "ripe_straw.onnx")]
    ripeness_model: String,

    /// Spoilage model weights file inside the models directory
    #[arg(long, env = "SPOILAGE_MODEL", default_value = "rotten_straw.onnx")]
    spoilage_model: String,

    /// Minimum detection confidence
    #[arg(long, env = "CONFIDENCE_THRESHOLD", default_value_t = 0.25)]
    confidence: f32,

    /// NMS IoU threshold
    #[arg(long, env = "IOU_THRESHOLD", default_value_t = 0.45)]
    iou: f32,

    /// Model input edge in pixels
    #[arg(long, env = "INPUT_SIZE", default_value_t = 640)]
    input_size: u32,

    /// Enable development mode
    #[arg(long, env = "DEV_MODE")]
    dev: bool,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .with_target(false)
        .init();

    tracing::info!("Starting smart-farm ripeness service...");
    tracing::info!("Bind address: {}", args.bind);
    tracing::info!("Models directory: {}", args.models_dir);
    tracing::info!("Upload directory: {}", args.upload_dir);

    let config = Config::new(args.bind, args.models_dir, args.upload_dir, args.workers, args.dev)?
        .with_model_files(args.ripeness_model, args.spoilage_model)
        .with_detection(DetectionConfig {
            confidence_threshold: args.confidence,
            iou_threshold: args.iou,
            input_size: args.input_size,
            ..DetectionConfig::default()
        })?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.workers)
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(serve(config))?;

    Ok(())
}
