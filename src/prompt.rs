//! Interactive terminal prompts for the sync configuration wizard.
//!
//! Built on dialoguer with the ColorfulTheme, matching the progress
//! styling from indicatif used elsewhere. Each prompt loops until it
//! has a usable value; cancellation (Ctrl-C / Esc) surfaces as
//! [`PromptError::Cancelled`] so the caller can exit cleanly instead of
//! treating it as a failure.
//!
//! The secret access key is read as a visible input on purpose: hidden
//! inputs break paste in several terminals, so we favor paste
//! compatibility and print an explicit warning instead.

use std::path::PathBuf;

use colored::Colorize;
use dialoguer::{Confirm, Input, theme::ColorfulTheme};
use thiserror::Error;

use crate::config::{
    Credentials, DEFAULT_REGION, SyncOptions, expand_tilde, normalize_bucket_name,
    normalize_dest_path, normalize_region, parse_exclude_list,
};

/// Errors from interactive prompts.
#[derive(Error, Debug)]
pub enum PromptError {
    #[error("operation cancelled by user")]
    Cancelled,

    #[error("terminal I/O error: {0}")]
    Io(String),
}

impl From<dialoguer::Error> for PromptError {
    fn from(err: dialoguer::Error) -> Self {
        let dialoguer::Error::IO(io) = err;
        if io.kind() == std::io::ErrorKind::Interrupted {
            PromptError::Cancelled
        } else {
            PromptError::Io(io.to_string())
        }
    }
}

/// The interactive configuration wizard.
///
/// Only invoked for values the CLI flags did not supply.
pub struct Wizard {
    theme: ColorfulTheme,
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new()
    }
}

impl Wizard {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }

    /// Prompt for the source directory until an existing one is given.
    pub fn source_dir(&self) -> Result<PathBuf, PromptError> {
        loop {
            let raw: String = Input::with_theme(&self.theme)
                .with_prompt("Source directory to sync")
                .interact_text()?;

            let expanded = expand_tilde(&raw);
            if expanded.is_dir() {
                return Ok(expanded);
            }
            println!("Directory not found: {}", expanded.display());
            println!("Please enter a valid directory path.");
        }
    }

    /// Prompt for the bucket name, unwrapping a pasted ARN with a
    /// confirmation.
    pub fn bucket(&self) -> Result<String, PromptError> {
        loop {
            let raw: String = Input::with_theme(&self.theme)
                .with_prompt("S3 bucket name (just the name, not the ARN)")
                .interact_text()?;

            let (name, was_arn) = normalize_bucket_name(&raw);
            if name.is_empty() {
                println!("Bucket name is required.");
                continue;
            }

            if was_arn {
                println!("That looks like an ARN rather than a bucket name.");
                let use_extracted = self.confirm(
                    &format!("Use '{}' as the bucket name?", name),
                    true,
                )?;
                if !use_extracted {
                    continue;
                }
            }

            return Ok(name);
        }
    }

    /// Prompt for the region, defaulting to us-east-1.
    pub fn region(&self) -> Result<String, PromptError> {
        let raw: String = Input::with_theme(&self.theme)
            .with_prompt("AWS region")
            .default(DEFAULT_REGION.to_string())
            .interact_text()?;
        Ok(normalize_region(&raw))
    }

    /// Prompt for the optional destination prefix within the bucket.
    pub fn dest_path(&self) -> Result<Option<String>, PromptError> {
        let raw: String = Input::with_theme(&self.theme)
            .with_prompt("Destination path within the bucket (empty for bucket root)")
            .allow_empty(true)
            .interact_text()?;
        Ok(normalize_dest_path(&raw))
    }

    /// Prompt for both credential values.
    pub fn credentials(&self) -> Result<Credentials, PromptError> {
        println!();
        println!("{}", "AWS Credentials".bold().underline());
        println!(
            "{}",
            "Credentials are used for this run only and are never stored.".dimmed()
        );
        println!(
            "{} The secret key is shown while typing for paste compatibility.",
            "!".yellow()
        );

        let access_key_id = self.required_value("AWS Access Key ID")?;
        let secret_access_key = self.required_value("AWS Secret Access Key")?;
        Ok(Credentials::new(access_key_id, secret_access_key))
    }

    fn required_value(&self, prompt: &str) -> Result<String, PromptError> {
        loop {
            let raw: String = Input::with_theme(&self.theme)
                .with_prompt(prompt)
                .interact_text()?;
            let trimmed = raw.trim().to_string();
            if !trimmed.is_empty() {
                return Ok(trimmed);
            }
            println!("{} is required.", prompt);
        }
    }

    /// Prompt for sync behavior; `defaults` seeds each answer (usually
    /// from CLI flags).
    pub fn options(&self, defaults: &SyncOptions) -> Result<SyncOptions, PromptError> {
        println!();
        println!("{}", "Sync Options".bold().underline());

        let dry_run_first =
            self.confirm("Perform a dry run first?", defaults.dry_run_first)?;
        let delete_extraneous = self.confirm(
            "Delete files in the destination that don't exist in the source?",
            defaults.delete_extraneous,
        )?;

        let raw_excludes: String = Input::with_theme(&self.theme)
            .with_prompt("Patterns to exclude (comma-separated, e.g. '*.tmp,temp/')")
            .allow_empty(true)
            .default(defaults.excludes.join(","))
            .show_default(!defaults.excludes.is_empty())
            .interact_text()?;

        Ok(SyncOptions {
            dry_run_first,
            delete_extraneous,
            excludes: parse_exclude_list(&raw_excludes),
        })
    }

    /// Yes/no confirmation; Esc counts as cancellation.
    pub fn confirm(&self, message: &str, default: bool) -> Result<bool, PromptError> {
        Confirm::with_theme(&self.theme)
            .with_prompt(message)
            .default(default)
            .interact_opt()?
            .ok_or(PromptError::Cancelled)
    }
}
