//! Run summaries: the pre-flight configuration recap, per-phase
//! results, the failure checklist, and the optional JSON report.

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;

use crate::config::SyncJob;
use crate::sync::{PhaseResult, SyncPhase};

/// Troubleshooting checklist shown after a failed sync.
pub const TROUBLESHOOTING: [&str; 5] = [
    "Verify your AWS credentials are correct",
    "Check that the bucket name is correct and accessible to you",
    "Try the AWS CLI directly: aws s3 ls s3://your-bucket",
    "Check that your IAM user has sufficient permissions for S3 operations",
    "Check for special characters in your credentials that might need escaping",
];

/// Machine-readable report for `--json`, printed as one line on stdout.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub source: String,
    pub remote: String,
    pub region: String,
    pub delete: bool,
    pub excludes: Vec<String>,
    pub dry_run: Option<PhaseSummary>,
    pub live: Option<PhaseSummary>,
    pub outcome: Outcome,
}

/// Condensed result of one rclone invocation.
#[derive(Debug, Serialize)]
pub struct PhaseSummary {
    pub success: bool,
    pub files_transferred: u64,
    pub bytes_transferred: u64,
    pub planned_actions: u64,
    pub duration_ms: u64,
    pub error: Option<String>,
}

impl From<&PhaseResult> for PhaseSummary {
    fn from(result: &PhaseResult) -> Self {
        Self {
            success: result.success,
            files_transferred: result.stats.files_transferred,
            bytes_transferred: result.stats.bytes_transferred,
            planned_actions: result.stats.planned_actions,
            duration_ms: result.duration_ms,
            error: result.error.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failed,
    Cancelled,
}

impl RunReport {
    /// Start a report for a validated job. Secrets never enter the
    /// report; only target coordinates and options do.
    pub fn new(job: &SyncJob) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            source: job.source.display().to_string(),
            remote: job.target.remote_spec(),
            region: job.target.region.clone(),
            delete: job.options.delete_extraneous,
            excludes: job.options.excludes.clone(),
            dry_run: None,
            live: None,
            outcome: Outcome::Cancelled,
        }
    }

    pub fn record_phase(&mut self, result: &PhaseResult) {
        let summary = PhaseSummary::from(result);
        match result.phase {
            SyncPhase::DryRun => self.dry_run = Some(summary),
            SyncPhase::Live => self.live = Some(summary),
        }
    }

    pub fn finish(&mut self, outcome: Outcome) {
        self.finished_at = Some(Utc::now());
        self.outcome = outcome;
    }

    /// Emit the report as a single JSON line on stdout.
    pub fn print_json(&self) {
        match serde_json::to_string(self) {
            Ok(json) => println!("{}", json),
            Err(e) => tracing::error!(error = %e, "failed to serialize run report"),
        }
    }
}

/// Print the pre-flight configuration recap.
pub fn print_config_summary(job: &SyncJob) {
    println!();
    println!("{}", "Sync Configuration Summary".bold().underline());
    println!("  Source directory:      {}", job.source.display());
    println!("  Destination:           {}", job.target.remote_spec());
    println!("  AWS region:            {}", job.target.region);
    println!(
        "  Delete in destination: {}",
        if job.options.delete_extraneous {
            "yes".yellow().to_string()
        } else {
            "no".to_string()
        }
    );
    if !job.options.excludes.is_empty() {
        println!("  Excluding:             {}", job.options.excludes.join(", "));
    }
    println!(
        "  Dry run first:         {}",
        if job.options.dry_run_first { "yes" } else { "no" }
    );
    println!();
}

/// Print a phase's rclone output followed by a one-line summary.
pub fn print_phase(result: &PhaseResult) {
    let output = result.output.trim_end();
    if !output.is_empty() {
        println!("{}", output);
    }

    match (result.phase, result.success) {
        (SyncPhase::DryRun, true) => {
            println!(
                "{} Dry run finished: {} operation(s) would be performed ({} ms).",
                "✓".green(),
                result.stats.planned_actions,
                result.duration_ms
            );
        }
        (SyncPhase::Live, true) => {
            println!(
                "{} Sync finished: {} file(s), {} byte(s) transferred in {} ms.",
                "✓".green(),
                result.stats.files_transferred,
                result.stats.bytes_transferred,
                result.duration_ms
            );
        }
        (phase, false) => {
            println!(
                "{} {} phase failed: {}",
                "✗".red(),
                phase,
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
}

/// Closing message for a successful run.
pub fn print_success() {
    println!();
    println!("{}", "Sync operation completed successfully!".green().bold());
}

/// Closing message plus the troubleshooting checklist for a failed run.
pub fn print_failure() {
    println!();
    println!("{}", "Sync operation encountered issues.".red().bold());
    println!();
    println!("{}", "Troubleshooting".bold().underline());
    for (i, hint) in TROUBLESHOOTING.iter().enumerate() {
        println!("  {}. {}", i + 1, hint);
    }
}
