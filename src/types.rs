use crate::app::ports::HttpClientPort;
use crate::config::Config;
use crate::error::Result;
use chrono::NaiveDateTime;
use std::path::PathBuf;

/// Everything a job needs from the outside world for one run
pub struct JobContext<'a> {
    pub config: &'a Config,
    pub http: &'a dyn HttpClientPort,
    /// Wall-clock time the run started, used for expiry classification
    pub now: NaiveDateTime,
}

/// How a run ended when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Written,
    Unchanged,
}

/// Result of one job run
#[derive(Debug, Clone)]
pub struct JobReport {
    pub job: String,
    pub outcome: JobOutcome,
    pub records_seen: usize,
    pub features_written: usize,
    pub records_skipped: usize,
    pub outputs: Vec<PathBuf>,
}

impl JobReport {
    pub fn written(job: &str) -> Self {
        Self {
            job: job.to_string(),
            outcome: JobOutcome::Written,
            records_seen: 0,
            features_written: 0,
            records_skipped: 0,
            outputs: Vec::new(),
        }
    }

    pub fn unchanged(job: &str) -> Self {
        Self {
            outcome: JobOutcome::Unchanged,
            ..Self::written(job)
        }
    }
}

/// Core trait that every dataset job implements
#[async_trait::async_trait]
pub trait DatasetJob: Send + Sync {
    /// Name used on the command line and in logs
    fn job_name(&self) -> &'static str;

    /// Fetch, normalize and write the dataset. Returning an error means the
    /// run failed as a whole; per-record problems are counted in the report.
    async fn run(&self, ctx: &JobContext<'_>) -> Result<JobReport>;
}
