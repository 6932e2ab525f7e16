use ai_playground::app::App;
use ai_playground::models::{GeneratedMedia, OutputEncoding, VisualExplanation};
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Flow {
    /// Five second clip straight from the prompt.
    Video,
    /// Eight second educational clip about a concept.
    Explanation,
    /// Written explanation plus a clip, requested together.
    WithExplanation,
}

#[derive(Debug, Parser)]
#[command(name = "ai-playground")]
#[command(about = "Generate videos from text prompts with a hosted AI model")]
struct CliArgs {
    /// Which generation flow to run.
    #[arg(long, value_enum, default_value_t = Flow::Video)]
    flow: Flow,

    /// Where to write the video. Defaults to output/<date>_<id>.<ext>.
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Print the provider's video URL instead of downloading the video.
    #[arg(long, conflicts_with = "output")]
    remote_url: bool,

    /// Prompt or concept; multiple words are joined with spaces.
    #[arg(value_name = "PROMPT", required = true, num_args = 1..)]
    prompt: Vec<String>,
}

fn default_output_path(dir: &Path, date: NaiveDate, id: Uuid, extension: &str) -> PathBuf {
    dir.join(format!("{}_{}.{}", date.format("%Y-%m-%d"), id, extension))
}

fn write_media(media: &GeneratedMedia, output: Option<PathBuf>) -> Result<PathBuf> {
    let path = output.unwrap_or_else(|| {
        default_output_path(
            Path::new("output"),
            Local::now().date_naive(),
            Uuid::new_v4(),
            media.file_extension(),
        )
    });

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let bytes = media.decode()?;
    std::fs::write(&path, &bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

impl CliArgs {
    fn output_encoding(&self) -> OutputEncoding {
        if self.remote_url {
            OutputEncoding::RemoteUrl
        } else {
            OutputEncoding::DataUri
        }
    }
}

fn print_explanation(explanation: &VisualExplanation) {
    println!("# {}\n", explanation.title);
    println!("{}\n", explanation.explanation);
    println!("Visual prompt: {}", explanation.image_prompt);
}

async fn run(app: &App, args: CliArgs) -> Result<()> {
    let prompt = args.prompt.join(" ");

    let video = match args.flow {
        Flow::Video => app.generate_video(&prompt).await?,
        Flow::Explanation => app.generate_video_explanation(&prompt).await?,
        Flow::WithExplanation => {
            let result = app.generate_video_with_explanation(&prompt).await?;
            print_explanation(&result.explanation);
            result.video
        }
    };

    match video {
        Some(media) if !media.is_data_uri() => {
            info!("Video available at the provider ({})", media.content_type);
            println!("{}", media.uri);
        }
        Some(media) => {
            let path = write_media(&media, args.output)?;
            info!("Saved {} to {}", media.content_type, path.display());
            println!("{}", path.display());
        }
        None => warn!("The model finished without producing a video"),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ai_playground=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = CliArgs::parse();

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, abandoning generation (the remote job keeps running)");
            let _ = cancel_tx.send(true);
        }
    });

    match App::new() {
        Ok(app) => {
            let app = app
                .with_cancel(cancel_rx)
                .with_output_encoding(args.output_encoding());
            match run(&app, args).await {
                Ok(_) => {
                    info!("Generation completed");
                    Ok(())
                }
                Err(e) => {
                    error!("Generation failed: {:#}", e);
                    std::process::exit(1);
                }
            }
        }
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    }
}
