//! Interactive one-way directory sync to Amazon S3.
//!
//! The heavy lifting (transfer, diffing, retry, checksums) is delegated
//! to rclone; this crate orchestrates the linear flow around it:
//! detect-or-install rclone, collect configuration, verify credentials,
//! dry-run, confirm, sync, report.

pub mod cli;
pub mod config;
pub mod install;
pub mod prompt;
pub mod report;
pub mod sync;
pub mod verify;

use anyhow::{Context, Result, bail};
use colored::Colorize;

use crate::cli::Cli;
use crate::config::{Credentials, S3Target, SyncJob, SyncOptions};
use crate::prompt::Wizard;
use crate::report::{Outcome, RunReport};
use crate::sync::{SyncEngine, SyncPhase};
use crate::verify::VerifyOutcome;

/// How a run ended when it did not error out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Cancelled,
}

/// Run the whole sync flow.
///
/// Fully synchronous and single-threaded: each step blocks on process
/// execution or user input before the next one starts.
pub fn run(cli: Cli) -> Result<RunOutcome> {
    println!("{}", console::style("S3 Directory Sync (via rclone)").bold());

    let rclone = install::ensure_installed(cli.rclone_path.as_deref(), !cli.no_install)
        .context("could not find or install rclone")?;
    println!("Using rclone: {}", rclone.describe());

    let wizard = Wizard::new();
    let mut job = collect_job(&cli, &wizard)?;
    job.validate()?;

    if !cli.skip_verify && !verify_with_retry(&cli, &wizard, &mut job)? {
        return finish(cli.json, RunReport::new(&job), Outcome::Cancelled, None);
    }

    report::print_config_summary(&job);
    if !cli.yes && !wizard.confirm("Proceed with this configuration?", true)? {
        return finish(cli.json, RunReport::new(&job), Outcome::Cancelled, None);
    }

    let engine = SyncEngine::new(&rclone.path);
    let mut run_report = RunReport::new(&job);

    if job.options.dry_run_first {
        println!();
        println!("Performing a dry run first (no files will be modified)...");
        let dry = engine.run_phase(&job, SyncPhase::DryRun)?;
        report::print_phase(&dry);
        run_report.record_phase(&dry);

        if !dry.success {
            return finish(cli.json, run_report, Outcome::Failed, dry.error);
        }

        if !cli.yes && !wizard.confirm("Proceed with the actual sync?", true)? {
            return finish(cli.json, run_report, Outcome::Cancelled, None);
        }
    }

    println!();
    println!("Performing sync...");
    let live = engine.run_phase(&job, SyncPhase::Live)?;
    report::print_phase(&live);
    run_report.record_phase(&live);

    if live.success {
        report::print_success();
        finish(cli.json, run_report, Outcome::Success, None)
    } else {
        finish(cli.json, run_report, Outcome::Failed, live.error)
    }
}

fn finish(
    json: bool,
    mut run_report: RunReport,
    outcome: Outcome,
    error: Option<String>,
) -> Result<RunOutcome> {
    run_report.finish(outcome);
    if json {
        run_report.print_json();
    }
    match outcome {
        Outcome::Success => Ok(RunOutcome::Completed),
        Outcome::Cancelled => Ok(RunOutcome::Cancelled),
        Outcome::Failed => {
            report::print_failure();
            bail!(
                "sync failed: {}",
                error.unwrap_or_else(|| "see rclone output above".to_string())
            )
        }
    }
}

/// Assemble the job from CLI flags, prompting for whatever is missing.
///
/// With `--yes` no prompt is ever shown: optional values fall back to
/// their defaults and missing required values are hard errors.
fn collect_job(cli: &Cli, wizard: &Wizard) -> Result<SyncJob> {
    let interactive = !cli.yes;

    let source = match &cli.source {
        Some(path) => {
            let expanded = config::expand_tilde(&path.display().to_string());
            if !expanded.is_dir() {
                bail!("source directory not found: {}", expanded.display());
            }
            expanded
        }
        None if interactive => wizard.source_dir()?,
        None => bail!("--source is required with --yes"),
    };

    let bucket = match &cli.bucket {
        Some(raw) => {
            let (name, was_arn) = config::normalize_bucket_name(raw);
            if name.is_empty() {
                bail!("--bucket must not be empty");
            }
            if was_arn {
                println!("Extracted bucket name '{}' from the provided ARN.", name);
            }
            name
        }
        None if interactive => wizard.bucket()?,
        None => bail!("--bucket is required with --yes"),
    };

    let region = match &cli.region {
        Some(raw) => config::normalize_region(raw),
        None if interactive => wizard.region()?,
        None => config::DEFAULT_REGION.to_string(),
    };

    let dest_path = match &cli.dest_path {
        Some(raw) => config::normalize_dest_path(raw),
        None if interactive => wizard.dest_path()?,
        None => None,
    };

    let credentials = match (&cli.access_key_id, &cli.secret_access_key) {
        (Some(key), Some(secret)) => Credentials::new(key.clone(), secret.clone()),
        _ if interactive => wizard.credentials()?,
        _ => bail!(
            "credentials are required with --yes (flags or AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY)"
        ),
    };

    let flag_options = SyncOptions {
        dry_run_first: !cli.skip_dry_run,
        delete_extraneous: cli.delete,
        excludes: cli.exclude.clone(),
    };
    // Only walk through the option prompts when the user gave none of
    // the option flags; otherwise the flags are the answers.
    let options = if interactive && !cli.skip_dry_run && !cli.delete && cli.exclude.is_empty() {
        wizard.options(&flag_options)?
    } else {
        flag_options
    };

    let mut target = S3Target::new(bucket, region);
    target.dest_path = dest_path;

    Ok(SyncJob {
        source,
        target,
        credentials,
        options,
    })
}

/// Verify credentials, offering one re-entry round on failure.
///
/// Returns false when the user declines to continue.
fn verify_with_retry(cli: &Cli, wizard: &Wizard, job: &mut SyncJob) -> Result<bool> {
    println!();
    println!("Verifying AWS credentials...");

    let mut reentered = false;
    loop {
        match verify::verify_credentials(&job.target, &job.credentials) {
            VerifyOutcome::Verified => {
                println!("{} AWS credentials verified successfully!", "✓".green());
                return Ok(true);
            }
            VerifyOutcome::SkippedNoCli => {
                println!("Note: aws CLI not found. Skipping credential verification.");
                return Ok(true);
            }
            VerifyOutcome::Failed(err) => {
                println!("{} AWS credential verification failed: {}", "✗".red(), err);
                println!();
                println!("Possible issues:");
                for (i, hint) in verify::FAILURE_HINTS.iter().enumerate() {
                    println!("  {}. {}", i + 1, hint);
                }
                println!();

                if cli.yes {
                    // Unattended runs take every confirmation as "yes".
                    println!("Continuing anyway (--yes).");
                    return Ok(true);
                }

                if wizard.confirm("Continue with the sync anyway?", false)? {
                    return Ok(true);
                }

                if !reentered
                    && wizard.confirm("Re-enter your AWS credentials?", true)?
                {
                    job.credentials = wizard.credentials()?;
                    reentered = true;
                    continue;
                }

                return Ok(false);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sample_job() -> SyncJob {
        SyncJob {
            source: PathBuf::from("/data"),
            target: S3Target::new("bkt", "us-east-1"),
            credentials: Credentials::new("AKIA", "secret"),
            options: SyncOptions::default(),
        }
    }

    #[test]
    fn cancelled_runs_finish_cleanly_with_a_report() {
        let outcome = finish(true, RunReport::new(&sample_job()), Outcome::Cancelled, None)
            .expect("cancellation is not an error");
        assert_eq!(outcome, RunOutcome::Cancelled);
    }
}
