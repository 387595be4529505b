use anyhow::Result;
use clap::{Parser, Subcommand};
use lexicon_stats::*;
use std::path::Path;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[derive(Parser)]
#[command(name = "lexicon-stats", version, about = "Sample Jetstream collection usage and aggregate the samples")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Count commits per collection for one window and write a sample file.
    Sample {
        /// Window length in seconds (overrides feed.duration_secs).
        #[arg(long)]
        duration: Option<u64>,
        /// Subscribe URL (overrides feed.url).
        #[arg(long)]
        url: Option<String>,
    },
    /// Merge every sample file into the aggregate report.
    Aggregate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut app_config = config::AppConfig::load()?;
    tracing::debug!(version = %version::tag(), "starting");

    match cli.command {
        Command::Sample { duration, url } => {
            if let Some(d) = duration {
                app_config.feed.duration_secs = d;
            }
            if let Some(u) = url {
                app_config.feed.url = u;
            }
            app_config.validate()?;

            let record = sampler::sample(&app_config.feed).await?;
            let repo = sample_repo::SampleRepo::new(&app_config.storage.samples_dir);
            let path = repo.save(&record)?;
            println!("Wrote {} events to {}", record.total, path.display());
        }
        Command::Aggregate => {
            let repo = sample_repo::SampleRepo::new(&app_config.storage.samples_dir);
            let outcome = aggregator::run(
                &repo,
                Path::new(&app_config.storage.report_path),
                chrono::Utc::now(),
            )?;
            match outcome {
                aggregator::AggregateOutcome::NoSamples => println!("No sample files found"),
                aggregator::AggregateOutcome::Written {
                    samples,
                    events,
                    collections,
                    ..
                } => println!(
                    "Aggregated {} samples, {} total events, {} collections",
                    samples, events, collections
                ),
            }
        }
    }

    Ok(())
}
