// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// Seam to the external actions usage analysis.
///
/// The analysis itself lives outside this crate. [`UsageAnalyzer`] is the
/// contract the run depends on and [`CommandAnalyzer`] adapts an external
/// program to it.
use std::{path::PathBuf, time::Duration};

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info};

use crate::{error::Error, report, scope::Scope};

/// Program invoked by [`CommandAnalyzer`] when none is configured.
pub const DEFAULT_ANALYZER_PROGRAM: &str = "action-permissions";

/// One observed use of an action, kept opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize,)]
#[serde(transparent)]
pub struct UsageRecord(pub serde_json::Value,);

impl UsageRecord
{
    /// Borrows the underlying JSON value.
    pub fn as_value(&self,) -> &serde_json::Value
    {
        &self.0
    }
}

/// Computes usage records and renders them as report text.
#[async_trait]
pub trait UsageAnalyzer: Send + Sync
{
    /// Computes the usage records for `scope`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Collaborator`] when the analysis fails.
    async fn compute_usage(&self, scope: &Scope,) -> Result<Vec<UsageRecord,>, Error,>;

    /// Renders `records` as CSV text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Collaborator`] when rendering fails.
    fn to_csv(&self, records: &[UsageRecord],) -> Result<String, Error,>;

    /// Renders `records` as Markdown text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Collaborator`] when rendering fails.
    fn to_markdown(&self, records: &[UsageRecord],) -> Result<String, Error,>;
}

/// Runs an external analysis program and reads JSON records from its stdout.
///
/// The program receives the token as `GITHUB_TOKEN`, the scope as
/// `--enterprise <slug>` or `--owner <login>`, and `--format json`.
#[derive(Debug, Clone,)]
pub struct CommandAnalyzer
{
    program: PathBuf,
    token:   String,
}

impl CommandAnalyzer
{
    /// Creates an analyzer invoking `program` with `token`.
    pub fn new(program: impl Into<PathBuf,>, token: impl Into<String,>,) -> Self
    {
        Self {
            program: program.into(), token: token.into(),
        }
    }

    fn arguments(scope: &Scope,) -> [&str; 4]
    {
        let flag = match scope {
            Scope::Enterprise(_,) => "--enterprise",
            Scope::Owner(_,) => "--owner",
        };
        [flag, scope.name(), "--format", "json",]
    }
}

#[async_trait]
impl UsageAnalyzer for CommandAnalyzer
{
    async fn compute_usage(&self, scope: &Scope,) -> Result<Vec<UsageRecord,>, Error,>
    {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.yellow} [{elapsed_precise}] {msg}",)
                .expect("valid template",),
        );
        pb.enable_steady_tick(Duration::from_millis(120,),);
        pb.set_message(format!("Computing actions usage for {scope}..."),);

        debug!("Running {} for {}", self.program.display(), scope);
        let output = Command::new(&self.program,)
            .env("GITHUB_TOKEN", &self.token,)
            .args(Self::arguments(scope,),)
            .kill_on_drop(true,)
            .output()
            .await
            .map_err(|e| {
                pb.abandon();
                Error::collaborator(format!("failed to run {}: {e}", self.program.display()),)
            },)?;

        if !output.status.success() {
            pb.abandon_with_message("Usage analysis failed",);
            let stderr = String::from_utf8_lossy(&output.stderr,);
            return Err(Error::collaborator(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            ),),);
        }

        let records: Vec<UsageRecord,> = serde_json::from_slice(&output.stdout,).map_err(|e| {
            pb.abandon();
            Error::collaborator(format!("invalid usage records from {}: {e}", self.program.display()),)
        },)?;

        pb.finish_with_message(format!("Computed {} usage records", records.len()),);
        info!("Computed {} usage records for {}", records.len(), scope);

        Ok(records,)
    }

    fn to_csv(&self, records: &[UsageRecord],) -> Result<String, Error,>
    {
        Ok(report::render_csv(records,),)
    }

    fn to_markdown(&self, records: &[UsageRecord],) -> Result<String, Error,>
    {
        Ok(report::render_markdown(records,),)
    }
}
