use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{
    config::ClientConfig, load_config, stages::Stage, ImageCandidate, PredictionClient,
    SessionController, SessionState,
};
use shared::domain::ServiceStatus;
use tracing_subscriber::EnvFilter;

/// Classify a traffic-sign photo with the remote prediction service.
#[derive(Parser, Debug)]
struct Args {
    /// Image to classify.
    #[arg(long, required_unless_present = "check_health")]
    image: Option<PathBuf>,
    /// Overrides `classifier.toml` and `BACK_END_URL`.
    #[arg(long, env = "CLASSIFIER_BASE_URL")]
    base_url: Option<String>,
    /// Ping the service's health endpoint and exit.
    #[arg(long)]
    check_health: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let mut config = load_config();
    if let Some(base_url) = &args.base_url {
        config = config
            .with_base_url(base_url)
            .context("invalid --base-url")?;
    }
    tracing::info!(base_url = config.base_url(), "using classification service");

    if args.check_health {
        return check_health(config).await;
    }

    let Some(image) = args.image else {
        return Ok(ExitCode::FAILURE);
    };
    classify(config, image).await
}

async fn check_health(config: ClientConfig) -> Result<ExitCode> {
    let status = PredictionClient::new(config)
        .health()
        .await
        .context("health check failed")?;
    println!("Service status: {status:?}");
    Ok(if status == ServiceStatus::Ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn classify(config: ClientConfig, image: PathBuf) -> Result<ExitCode> {
    let controller = SessionController::new(config);
    let candidate = ImageCandidate::from_path(&image)
        .await
        .with_context(|| format!("failed to open {}", image.display()))?;

    let selected = controller.select(candidate).await;
    if let Some(error) = selected.error() {
        eprintln!("{}", error.message());
        return Ok(ExitCode::FAILURE);
    }

    let mut updates = controller.subscribe();
    let printer = tokio::spawn(async move {
        let mut last_stage = None;
        while updates.changed().await.is_ok() {
            let state = updates.borrow_and_update().clone();
            match state {
                SessionState::Staging { stage_index, .. } if last_stage != Some(stage_index) => {
                    last_stage = Some(stage_index);
                    if let Some(stage) = Stage::from_index(stage_index) {
                        println!("[{}/6] {}", stage_index + 1, stage.text());
                    }
                }
                SessionState::Succeeded { .. } | SessionState::Failed { .. } => break,
                _ => {}
            }
        }
    });

    let outcome = controller.analyze().await;
    drop(controller);
    printer.await.context("stage printer task failed")?;

    match outcome {
        SessionState::Succeeded { result, .. } => {
            println!("{}", result.title);
            println!("{}", result.description);
            if let Some(confidence) = result.confidence {
                println!("Confidence: {:.1}%", confidence * 100.0);
            }
            Ok(ExitCode::SUCCESS)
        }
        other => {
            let message = other
                .error()
                .map(|error| error.message().to_string())
                .unwrap_or_else(|| format!("analysis ended in state {}", other.name()));
            eprintln!("{message}");
            Ok(ExitCode::FAILURE)
        }
    }
}
