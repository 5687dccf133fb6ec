mod output;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use sortiq_classify::{FrameClassifier, HostedClassifier, Recovery, RecoveryPolicy};
use sortiq_core::{EndpointConfig, ModelResult, SortiqConfig};
use sortiq_extract::surface::{CaptureSurface, ImageSurface};
use sortiq_extract::{FfmpegBackend, VideoSource};
use sortiq_pipeline::{combine_sources, AnalyzeOptions, VideoAnalyzer};

#[derive(Parser)]
#[command(
    name = "sortiq",
    version,
    about = "Sortiq — waste classification from video and images",
    long_about = "Sortiq extracts frames from waste videos, classifies them against\nhosted inference endpoints, and reports a category breakdown.\n\nConfigure endpoints in sortiq.toml or pass --endpoint directly."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a video: extract frames and classify each one
    Analyze {
        /// Path to the video file to analyze
        file: PathBuf,

        /// Frames extracted per second of video (default: 1)
        #[arg(long)]
        fps: Option<f64>,

        /// Hard cap on extracted frames
        #[arg(long)]
        max_frames: Option<u32>,

        /// Inference endpoint URL, overrides the config file
        #[arg(long)]
        endpoint: Option<String>,

        /// Bearer token for the endpoint
        #[arg(long)]
        token: Option<String>,

        /// Path to a sortiq.toml config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Emit the full report as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Classify a single image through every configured endpoint
    Classify {
        /// Path to the JPEG image to classify
        file: PathBuf,

        /// Inference endpoint URL, overrides the config file
        #[arg(long)]
        endpoint: Option<String>,

        /// Bearer token for the endpoint
        #[arg(long)]
        token: Option<String>,

        /// Path to a sortiq.toml config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Emit the combined result as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// List the waste categories Sortiq reports over
    Categories,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    match cli.command {
        Commands::Analyze {
            file,
            fps,
            max_frames,
            endpoint,
            token,
            config,
            json,
        } => {
            let config = resolve_config(config.as_deref(), endpoint, token)?;
            run_analyze(&file, fps, max_frames, &config, json).await
        }
        Commands::Classify {
            file,
            endpoint,
            token,
            config,
            json,
        } => {
            let config = resolve_config(config.as_deref(), endpoint, token)?;
            run_classify(&file, &config, json).await
        }
        Commands::Categories => {
            output::print_categories();
            Ok(())
        }
    }
}

/// Load the config file (if any) and fold in command-line overrides.
/// An `--endpoint` override takes priority over every configured endpoint.
fn resolve_config(
    path: Option<&std::path::Path>,
    endpoint: Option<String>,
    token: Option<String>,
) -> Result<SortiqConfig> {
    let mut config = match path {
        Some(path) => SortiqConfig::load_from_file(path)
            .map_err(|e| anyhow!("could not load config {}: {}", path.display(), e))?,
        None => SortiqConfig::default(),
    };

    if let Some(url) = endpoint {
        config.endpoints.insert(
            0,
            EndpointConfig {
                name: "cli".to_string(),
                url,
                token,
                timeout_secs: 30,
            },
        );
    }

    if config.endpoints.is_empty() {
        bail!("no classification endpoint configured; pass --endpoint or add one to sortiq.toml");
    }
    Ok(config)
}

async fn run_analyze(
    file: &std::path::Path,
    fps: Option<f64>,
    max_frames: Option<u32>,
    config: &SortiqConfig,
    json: bool,
) -> Result<()> {
    if !FfmpegBackend::is_available() {
        bail!("ffmpeg not found on PATH; install ffmpeg to analyze videos");
    }
    if !file.exists() {
        bail!("video file not found: {}", file.display());
    }

    let mut classifier = HostedClassifier::new(config.endpoints[0].clone());
    classifier
        .initialize()
        .context("classifier initialization failed")?;

    let surface = CaptureSurface::new(Box::new(FfmpegBackend::new()), Box::new(ImageSurface::new()));
    let mut analyzer = VideoAnalyzer::new(surface, Arc::new(classifier), config.video.clone());
    analyzer.initialize().context("capture surface initialization failed")?;

    let options = AnalyzeOptions {
        frames_per_second: fps,
        max_frames,
        on_progress: Some(Arc::new(|p: f64| {
            eprint!("\rAnalyzing... {:>3.0}%", p * 100.0);
            let _ = std::io::stderr().flush();
        })),
    };

    let source = VideoSource::Path(file.to_path_buf());
    let result = analyzer.analyze(&source, &options).await;
    analyzer.cleanup().await;
    eprintln!();

    let result = result.map_err(|e| anyhow!("analysis failed: {}", e))?;

    if json {
        let report = output::VideoReport::from_result(&result);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        output::print_video_result(&result);
    }
    Ok(())
}

async fn run_classify(file: &std::path::Path, config: &SortiqConfig, json: bool) -> Result<()> {
    let jpeg = std::fs::read(file)
        .with_context(|| format!("could not read image {}", file.display()))?;

    // Query up to the first three endpoints independently. A failing source
    // runs its recovery strategy; whatever it cannot recover becomes an
    // error-valued result and the other sources still count.
    let mut results: Vec<ModelResult> = Vec::new();
    for endpoint in config.endpoints.iter().take(3) {
        results.push(classify_via(endpoint, config, &jpeg).await);
    }

    let combined = combine_sources(&results);
    if json {
        #[derive(serde::Serialize)]
        struct ClassifyReport {
            sources: Vec<ModelResult>,
            best: Option<(sortiq_core::WasteCategory, f32)>,
            distribution: Vec<(sortiq_core::WasteCategory, f32)>,
        }
        let report = ClassifyReport {
            sources: results,
            best: combined.best,
            distribution: combined.distribution.clone(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        output::print_combined(&combined);
    }
    Ok(())
}

/// Classify one image through one endpoint, with recovery. A fallback
/// directive retries against the named endpoint from the config.
async fn classify_via(
    endpoint: &EndpointConfig,
    config: &SortiqConfig,
    jpeg: &[u8],
) -> ModelResult {
    let first = match classifier_for(endpoint) {
        Ok(classifier) => classifier,
        Err(e) => return ModelResult::failed(e.to_string()),
    };

    let predictions = match first.classify(jpeg).await {
        Ok(predictions) => predictions,
        Err(error) => {
            let policy = RecoveryPolicy::new().with_notify(Arc::new(|message: &str| {
                eprintln!("note: {}", message);
            }));
            let outcome = policy.run(error, || first.classify(jpeg)).await;
            match outcome {
                Recovery::Recovered(predictions) => predictions,
                Recovery::Fallback(target) => {
                    let fallback = config.endpoints.iter().find(|e| e.name == target);
                    match fallback {
                        Some(fallback_endpoint) => {
                            match classifier_for(fallback_endpoint) {
                                Ok(classifier) => match classifier.classify(jpeg).await {
                                    Ok(predictions) => predictions,
                                    Err(e) => return ModelResult::failed(e.to_string()),
                                },
                                Err(e) => return ModelResult::failed(e.to_string()),
                            }
                        }
                        None => {
                            return ModelResult::failed(format!(
                                "fallback endpoint '{}' not configured",
                                target
                            ))
                        }
                    }
                }
                Recovery::Failed(e) => return ModelResult::failed(e.to_string()),
            }
        }
    };

    match predictions.first() {
        Some(top) => {
            let mut result = ModelResult::new(top.label.clone(), top.score);
            result.recyclable = Some(top.category.recyclable());
            result.subcategories = predictions.iter().skip(1).map(|p| p.label.clone()).collect();
            result
        }
        None => ModelResult::failed("endpoint returned no predictions"),
    }
}

fn classifier_for(endpoint: &EndpointConfig) -> Result<HostedClassifier> {
    let mut classifier = HostedClassifier::new(endpoint.clone());
    classifier
        .initialize()
        .map_err(|e| anyhow!("endpoint '{}': {}", endpoint.name, e))?;
    Ok(classifier)
}
