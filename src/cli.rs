//! Command-line surface.
//!
//! Every answer the interactive wizard can collect has a flag counterpart
//! here, so the whole run can be driven unattended (`--yes` plus the
//! required values). Credentials are also accepted from the standard AWS
//! environment variables and are never echoed back.

use std::path::PathBuf;

use clap::Parser;

/// Interactive one-way directory sync to Amazon S3 via rclone.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "s3sync",
    version,
    about = "Sync a local directory to an S3 bucket using rclone",
    after_help = "Values not supplied as flags are collected interactively.\n\
                  Credentials may come from AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY."
)]
pub struct Cli {
    /// Local directory to sync
    #[arg(long, value_name = "DIR")]
    pub source: Option<PathBuf>,

    /// S3 bucket name (a full ARN is accepted and normalized)
    #[arg(long, value_name = "NAME")]
    pub bucket: Option<String>,

    /// AWS region (defaults to us-east-1 when left empty)
    #[arg(long, value_name = "REGION")]
    pub region: Option<String>,

    /// Destination key prefix within the bucket
    #[arg(long, value_name = "PATH")]
    pub dest_path: Option<String>,

    /// Pattern to exclude from the sync (repeatable)
    #[arg(long, value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Delete files in the destination that no longer exist in the source
    #[arg(long)]
    pub delete: bool,

    /// Skip the dry-run phase and sync immediately
    #[arg(long)]
    pub skip_dry_run: bool,

    /// Assume "yes" at every confirmation and never prompt
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Use this rclone binary instead of detecting or installing one
    #[arg(long, value_name = "PATH")]
    pub rclone_path: Option<PathBuf>,

    /// Fail instead of installing rclone when it is missing
    #[arg(long)]
    pub no_install: bool,

    /// Skip the aws-cli credential check
    #[arg(long)]
    pub skip_verify: bool,

    /// Print a JSON run report to stdout when finished
    #[arg(long)]
    pub json: bool,

    /// AWS access key ID (prompted for when absent)
    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true, value_name = "KEY")]
    pub access_key_id: Option<String>,

    /// AWS secret access key (prompted for when absent)
    #[arg(
        long,
        env = "AWS_SECRET_ACCESS_KEY",
        hide_env_values = true,
        value_name = "SECRET"
    )]
    pub secret_access_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_contract_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_full_flag_set() {
        let cli = Cli::parse_from([
            "s3sync",
            "--source",
            "/tmp/data",
            "--bucket",
            "my-bucket",
            "--region",
            "eu-west-1",
            "--dest-path",
            "backups/daily",
            "--exclude",
            "*.tmp",
            "--exclude",
            "cache/",
            "--delete",
            "--skip-dry-run",
            "--yes",
            "--skip-verify",
            "--json",
        ]);

        assert_eq!(cli.source, Some(PathBuf::from("/tmp/data")));
        assert_eq!(cli.bucket.as_deref(), Some("my-bucket"));
        assert_eq!(cli.region.as_deref(), Some("eu-west-1"));
        assert_eq!(cli.dest_path.as_deref(), Some("backups/daily"));
        assert_eq!(cli.exclude, vec!["*.tmp".to_string(), "cache/".to_string()]);
        assert!(cli.delete);
        assert!(cli.skip_dry_run);
        assert!(cli.yes);
        assert!(cli.skip_verify);
        assert!(cli.json);
    }

    #[test]
    fn defaults_are_interactive() {
        let cli = Cli::parse_from(["s3sync"]);
        assert!(cli.source.is_none());
        assert!(cli.bucket.is_none());
        assert!(!cli.yes);
        assert!(!cli.delete);
        assert!(!cli.skip_dry_run);
        assert!(cli.exclude.is_empty());
    }
}
