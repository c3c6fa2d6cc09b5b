//! Transient run configuration.
//!
//! Everything here lives in memory for the duration of one run and is
//! handed to rclone as arguments or written into the ephemeral config
//! file. Nothing is persisted.
//!
//! The normalization rules mirror what users actually paste into the
//! prompts: full bucket ARNs, regions left empty, destination prefixes
//! with a leading slash.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Region used when the user leaves the region prompt empty.
pub const DEFAULT_REGION: &str = "us-east-1";

/// ARN prefix users paste instead of a bare bucket name.
pub const BUCKET_ARN_PREFIX: &str = "arn:aws:s3:::";

/// Validation errors for a sync job.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("bucket name must not be empty")]
    EmptyBucket,

    #[error("access key ID must not be empty")]
    EmptyAccessKey,

    #[error("secret access key must not be empty")]
    EmptySecretKey,

    #[error("source directory not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("source is not a directory: {0}")]
    SourceNotADirectory(PathBuf),
}

/// Where the files go: bucket, region and optional key prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Target {
    pub bucket: String,
    pub region: String,
    /// Key prefix inside the bucket, already stripped of any leading slash.
    pub dest_path: Option<String>,
}

impl S3Target {
    pub fn new(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            region: region.into(),
            dest_path: None,
        }
    }

    pub fn with_dest_path(mut self, raw: &str) -> Self {
        self.dest_path = normalize_dest_path(raw);
        self
    }

    /// The rclone remote spec, e.g. `s3:bucket` or `s3:bucket/prefix`.
    pub fn remote_spec(&self) -> String {
        match &self.dest_path {
            Some(prefix) => format!("s3:{}/{}", self.bucket, prefix),
            None => format!("s3:{}", self.bucket),
        }
    }
}

/// AWS credentials held in memory for the duration of one run.
///
/// The Debug impl redacts the secret so the struct can appear in traces
/// without leaking it.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[redacted]")
            .finish()
    }
}

/// User-selected sync behavior.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Run `--dry-run` first and confirm before the real sync.
    pub dry_run_first: bool,
    /// Pass `--delete-after` so extraneous destination files are removed.
    pub delete_extraneous: bool,
    /// rclone `--exclude` patterns.
    pub excludes: Vec<String>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            dry_run_first: true,
            delete_extraneous: false,
            excludes: Vec::new(),
        }
    }
}

/// Everything one run needs, validated before any process is spawned.
#[derive(Debug, Clone)]
pub struct SyncJob {
    pub source: PathBuf,
    pub target: S3Target,
    pub credentials: Credentials,
    pub options: SyncOptions,
}

impl SyncJob {
    /// Basic non-emptiness and existence checks on required fields.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target.bucket.trim().is_empty() {
            return Err(ConfigError::EmptyBucket);
        }
        if self.credentials.access_key_id.trim().is_empty() {
            return Err(ConfigError::EmptyAccessKey);
        }
        if self.credentials.secret_access_key.trim().is_empty() {
            return Err(ConfigError::EmptySecretKey);
        }
        if !self.source.exists() {
            return Err(ConfigError::SourceNotFound(self.source.clone()));
        }
        if !self.source.is_dir() {
            return Err(ConfigError::SourceNotADirectory(self.source.clone()));
        }
        Ok(())
    }
}

/// Strip the `arn:aws:s3:::` prefix when a full ARN was entered.
///
/// Returns the normalized name and whether the input looked like an ARN.
pub fn normalize_bucket_name(raw: &str) -> (String, bool) {
    let trimmed = raw.trim();
    match trimmed.strip_prefix(BUCKET_ARN_PREFIX) {
        Some(name) => (name.to_string(), true),
        None => (trimmed.to_string(), false),
    }
}

/// Empty region input falls back to [`DEFAULT_REGION`].
pub fn normalize_region(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        DEFAULT_REGION.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Trim and strip the leading slash from a destination prefix.
/// Empty input means "bucket root".
pub fn normalize_dest_path(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_start_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Split a comma-separated exclude list into clean patterns.
pub fn parse_exclude_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

/// Expand a leading `~` or `~/` in a user-entered path.
pub fn expand_tilde(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    if trimmed == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = trimmed.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(trimmed)
}

/// Check whether a directory is listed on the PATH environment variable.
pub fn dir_on_path(dir: &Path) -> bool {
    std::env::var_os("PATH")
        .map(|path| std::env::split_paths(&path).any(|p| p == dir))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_arn_prefix_is_stripped() {
        let (name, was_arn) = normalize_bucket_name("arn:aws:s3:::my-data-bucket");
        assert_eq!(name, "my-data-bucket");
        assert!(was_arn);
    }

    #[test]
    fn plain_bucket_name_passes_through() {
        let (name, was_arn) = normalize_bucket_name("  my-data-bucket ");
        assert_eq!(name, "my-data-bucket");
        assert!(!was_arn);
    }

    #[test]
    fn empty_region_defaults() {
        assert_eq!(normalize_region(""), "us-east-1");
        assert_eq!(normalize_region("   "), "us-east-1");
        assert_eq!(normalize_region("eu-central-1"), "eu-central-1");
    }

    #[test]
    fn dest_path_leading_slash_is_stripped() {
        assert_eq!(normalize_dest_path("/backups/daily"), Some("backups/daily".into()));
        assert_eq!(normalize_dest_path("backups"), Some("backups".into()));
        assert_eq!(normalize_dest_path(""), None);
        assert_eq!(normalize_dest_path("  / "), None);
    }

    #[test]
    fn remote_spec_formats() {
        let target = S3Target::new("bkt", "us-east-1");
        assert_eq!(target.remote_spec(), "s3:bkt");

        let target = S3Target::new("bkt", "us-east-1").with_dest_path("/photos/2024");
        assert_eq!(target.remote_spec(), "s3:bkt/photos/2024");
    }

    #[test]
    fn exclude_list_parsing() {
        assert_eq!(
            parse_exclude_list("*.tmp, *.temp ,temp/"),
            vec!["*.tmp", "*.temp", "temp/"]
        );
        assert!(parse_exclude_list("").is_empty());
        assert!(parse_exclude_list(" , ,").is_empty());
    }

    #[test]
    fn credentials_debug_is_redacted() {
        let creds = Credentials::new("AKIAEXAMPLE", "super-secret-value");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("AKIAEXAMPLE"));
        assert!(!debug.contains("super-secret-value"));
        assert!(debug.contains("[redacted]"));
    }

    #[test]
    fn validate_rejects_empty_fields() {
        let tmp = tempfile::tempdir().unwrap();
        let mut job = SyncJob {
            source: tmp.path().to_path_buf(),
            target: S3Target::new("", "us-east-1"),
            credentials: Credentials::new("key", "secret"),
            options: SyncOptions::default(),
        };
        assert!(matches!(job.validate(), Err(ConfigError::EmptyBucket)));

        job.target.bucket = "bkt".into();
        job.credentials.access_key_id = String::new();
        assert!(matches!(job.validate(), Err(ConfigError::EmptyAccessKey)));

        job.credentials.access_key_id = "key".into();
        job.credentials.secret_access_key = "  ".into();
        assert!(matches!(job.validate(), Err(ConfigError::EmptySecretKey)));
    }

    #[test]
    fn validate_checks_source_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("a_file");
        std::fs::write(&file, b"x").unwrap();

        let mut job = SyncJob {
            source: tmp.path().join("missing"),
            target: S3Target::new("bkt", "us-east-1"),
            credentials: Credentials::new("key", "secret"),
            options: SyncOptions::default(),
        };
        assert!(matches!(job.validate(), Err(ConfigError::SourceNotFound(_))));

        job.source = file;
        assert!(matches!(
            job.validate(),
            Err(ConfigError::SourceNotADirectory(_))
        ));

        job.source = tmp.path().to_path_buf();
        assert!(job.validate().is_ok());
    }

    #[test]
    fn tilde_expansion() {
        let expanded = expand_tilde("~/data");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expanded, home.join("data"));
        }
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
    }

    #[test]
    fn sync_options_default_to_safe_values() {
        let opts = SyncOptions::default();
        assert!(opts.dry_run_first);
        assert!(!opts.delete_extraneous);
        assert!(opts.excludes.is_empty());
    }
}
