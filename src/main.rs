use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use map_datasets::config::Config;
use map_datasets::constants::{get_supported_jobs, HTTP_TIMEOUT_SECS};
use map_datasets::infra::http_client::ReqwestHttp;
use map_datasets::logging;
use map_datasets::pipeline::Pipeline;
use map_datasets::types::{JobContext, JobOutcome};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "map_datasets")]
#[command(about = "Convert public NSW map data feeds into GeoJSON and GeoPackage files")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch sources and write the datasets
    Run {
        /// Specific jobs to run (comma-separated). Defaults to all jobs
        #[arg(long)]
        jobs: Option<String>,
        /// Path to a TOML config file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Directory the datasets are written to
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// List the available jobs
    List,
}

fn parse_job_list(jobs: Option<&str>) -> Vec<String> {
    match jobs {
        Some(list) => list
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        None => get_supported_jobs().into_iter().map(String::from).collect(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::List => {
            for job in get_supported_jobs() {
                println!("{job}");
            }
        }
        Commands::Run {
            jobs,
            config,
            output_dir,
        } => {
            let mut config = Config::load(config.as_deref()).context("Failed to load configuration")?;
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }

            let _guard = logging::init_logging(&config.log_dir);
            let job_names = parse_job_list(jobs.as_deref());
            info!(
                "Running jobs [{}] into {}",
                job_names.join(", "),
                config.output_dir.display()
            );

            let http = ReqwestHttp::with_timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
                .context("Failed to build HTTP client")?;
            let ctx = JobContext {
                config: &config,
                http: &http,
                now: chrono::Local::now().naive_local(),
            };

            let summary = Pipeline::run_jobs(&job_names, &ctx).await;

            for report in &summary.reports {
                match report.outcome {
                    JobOutcome::Written => println!(
                        "{}: {} features written ({} records, {} skipped)",
                        report.job, report.features_written, report.records_seen, report.records_skipped
                    ),
                    JobOutcome::Unchanged => println!("{}: source unchanged", report.job),
                }
            }
            for failure in &summary.failures {
                error!("{} failed: {}", failure.job, failure.error);
                println!("{}: FAILED ({})", failure.job, failure.error);
            }

            if !summary.is_success() {
                bail!("{} of {} jobs failed", summary.failures.len(), job_names.len());
            }
        }
    }

    Ok(())
}
