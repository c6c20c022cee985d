use crate::apis::create_job;
use crate::error::Result;
use crate::types::{DatasetJob, JobContext, JobOutcome, JobReport};
use metrics::{counter, histogram};
use std::fs;
use tracing::{error, info, instrument, warn};

/// A job that failed as a whole
#[derive(Debug, Clone)]
pub struct JobFailure {
    pub job: String,
    pub error: String,
}

/// Outcome of running a list of jobs
#[derive(Debug, Default)]
pub struct RunSummary {
    pub reports: Vec<JobReport>,
    pub failures: Vec<JobFailure>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct Pipeline;

impl Pipeline {
    /// Run one job with timing and run counters around it
    #[instrument(skip(job, ctx), fields(job_name = %job.job_name()))]
    pub async fn run_job(job: &dyn DatasetJob, ctx: &JobContext<'_>) -> Result<JobReport> {
        let job_name = job.job_name().to_string();
        info!("Starting job {}", job_name);
        counter!("map_datasets_job_runs_total", "job" => job_name.clone()).increment(1);
        let started = std::time::Instant::now();

        fs::create_dir_all(&ctx.config.output_dir)?;
        let result = job.run(ctx).await;

        let elapsed = started.elapsed().as_secs_f64();
        histogram!("map_datasets_job_duration_seconds", "job" => job_name.clone()).record(elapsed);

        match &result {
            Ok(report) => {
                counter!("map_datasets_features_written_total", "job" => job_name.clone())
                    .increment(report.features_written as u64);
                counter!("map_datasets_records_skipped_total", "job" => job_name.clone())
                    .increment(report.records_skipped as u64);
                match report.outcome {
                    JobOutcome::Written => info!(
                        "Job {} finished in {:.2}s: {} records, {} features written, {} skipped",
                        job_name, elapsed, report.records_seen, report.features_written, report.records_skipped
                    ),
                    JobOutcome::Unchanged => {
                        info!("Job {} finished in {:.2}s: source unchanged", job_name, elapsed)
                    }
                }
            }
            Err(e) => {
                counter!("map_datasets_job_failures_total", "job" => job_name.clone()).increment(1);
                error!("Job {} failed after {:.2}s: {}", job_name, elapsed, e);
            }
        }
        result
    }

    /// Run the named jobs in order. A failing or unknown job is recorded and
    /// the remaining jobs still run.
    pub async fn run_jobs(job_names: &[String], ctx: &JobContext<'_>) -> RunSummary {
        let mut summary = RunSummary::default();
        for job_name in job_names {
            let Some(job) = create_job(job_name) else {
                warn!("Unknown job: {}", job_name);
                summary.failures.push(JobFailure {
                    job: job_name.clone(),
                    error: "unknown job".to_string(),
                });
                continue;
            };

            match Self::run_job(job.as_ref(), ctx).await {
                Ok(report) => summary.reports.push(report),
                Err(e) => summary.failures.push(JobFailure {
                    job: job_name.clone(),
                    error: e.to_string(),
                }),
            }
        }
        summary
    }
}
