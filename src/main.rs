use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use review_export::{
    recognized_languages, Config, ErrorKind, LogProgress, ReviewService, RunError,
};

#[derive(Parser)]
#[command(name = "review-export")]
#[command(about = "Download every review for a Steam app as CSV")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(long, default_value = ".review-export/config.yml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch all reviews for an app and write them to a CSV file
    Fetch {
        /// Steam app ID (e.g. 688130)
        app_id: String,

        /// Language code, or "all"
        #[arg(long, default_value = "all")]
        language: String,

        /// Maximum number of pages to request
        #[arg(long, default_value_t = 100)]
        max_pages: u32,

        /// Directory for the CSV file (defaults to the configured output dir)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Override the review API base URL
        #[arg(long, env = "REVIEW_EXPORT_BASE_URL")]
        base_url: Option<String>,
    },

    /// List accepted language codes
    Languages,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("review_export=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch {
            app_id,
            language,
            max_pages,
            output_dir,
            base_url,
        } => {
            let mut config = Config::load(&cli.config)?;
            if let Some(base_url) = base_url {
                config.api.base_url = base_url;
            }
            run_fetch(config, &app_id, &language, max_pages, output_dir).await?;
        }
        Commands::Languages => {
            println!("all");
            for code in recognized_languages() {
                println!("{}", code);
            }
        }
    }

    Ok(())
}

async fn run_fetch(
    config: Config,
    app_id: &str,
    language: &str,
    max_pages: u32,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let output_dir = output_dir.unwrap_or_else(|| config.export.output_dir.clone());
    let mut service = ReviewService::new(config)?;

    // Validation happens before any network activity
    let request = service
        .parse_request(app_id, language, max_pages)
        .context("Invalid input")?;

    info!(
        app_id = request.app_id,
        language = %request.language,
        max_pages = request.max_pages,
        "Fetching reviews"
    );

    let result = match service.run(&request, &mut LogProgress).await {
        Ok(result) => result,
        Err(err) => {
            let summary = describe_failure(&err);
            return Err(anyhow::Error::new(err).context(summary));
        }
    };

    let Some(csv) = result.csv else {
        println!("No reviews to export.");
        return Ok(());
    };

    fs::create_dir_all(&output_dir).with_context(|| {
        format!("Failed to create output directory: {}", output_dir.display())
    })?;

    let path = output_dir.join(&result.file_name);
    fs::write(&path, &csv)
        .with_context(|| format!("Failed to write CSV: {}", path.display()))?;

    info!(path = %path.display(), bytes = csv.len(), "CSV written");

    println!(
        "Wrote {} reviews to {} ({})",
        result.outcome.reviews.len(),
        path.display(),
        result.outcome.stop_reason
    );

    Ok(())
}

fn describe_failure(err: &RunError) -> &'static str {
    match err {
        RunError::Fetch(e) => match e.kind() {
            ErrorKind::InvalidInput => "Invalid input",
            ErrorKind::Transport => "Network error while fetching reviews",
            ErrorKind::Rejected => "The review API rejected the request",
        },
        RunError::Export(_) => "Failed to build CSV",
    }
}
