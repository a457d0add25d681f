// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Step outputs and workflow commands understood by the Actions runner.
//!
//! Outputs are appended to the file named by `GITHUB_OUTPUT` using the
//! multiline delimiter syntax. Failures are surfaced through the `::error::`
//! workflow command so they appear as annotations on the run.

use std::{
    fs::OpenOptions,
    io::{self, Write},
    path::Path,
};

use serde::Serialize;

use crate::{
    error::{Error, io_error},
    report::ReportFormat,
};

const DELIMITER_PREFIX: &str = "ghadelimiter_";

/// Values exposed as step outputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize,)]
pub struct ActionOutputs
{
    /// Rendered CSV report, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csv_result:  Option<String,>,
    /// Rendered Markdown report, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub md_result:   Option<String,>,
    /// JSON serialization of all usage records.
    pub json_result: String,
}

impl ActionOutputs
{
    /// Creates outputs carrying only the JSON records.
    pub fn new(json_result: String,) -> Self
    {
        Self {
            json_result,
            ..Self::default()
        }
    }

    /// Stores the rendered report for `format`.
    pub fn set_report(&mut self, format: ReportFormat, rendered: String,)
    {
        match format {
            ReportFormat::Csv => self.csv_result = Some(rendered,),
            ReportFormat::Markdown => self.md_result = Some(rendered,),
        }
    }

    fn entries(&self,) -> Vec<(&'static str, &str,),>
    {
        let mut entries = Vec::with_capacity(3,);
        if let Some(csv,) = &self.csv_result {
            entries.push(("csv_result", csv.as_str(),),);
        }
        if let Some(md,) = &self.md_result {
            entries.push(("md_result", md.as_str(),),);
        }
        entries.push(("json_result", self.json_result.as_str(),),);
        entries
    }

    /// Writes every output in the runner's multiline file format.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from `writer`.
    pub fn write_commands<W: Write,>(&self, writer: &mut W,) -> io::Result<(),>
    {
        for (name, value,) in self.entries() {
            let delimiter = delimiter_for(value,);
            writeln!(writer, "{name}<<{delimiter}")?;
            writeln!(writer, "{value}")?;
            writeln!(writer, "{delimiter}")?;
        }
        Ok((),)
    }

    /// Appends the outputs to the runner's output file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the file cannot be opened or written.
    pub fn append_to(&self, path: &Path,) -> Result<(), Error,>
    {
        let mut file = OpenOptions::new()
            .create(true,)
            .append(true,)
            .open(path,)
            .map_err(|source| io_error(path, source,),)?;
        self.write_commands(&mut file,).map_err(|source| io_error(path, source,),)
    }
}

/// Picks a heredoc delimiter that does not occur in `value`.
fn delimiter_for(value: &str,) -> String
{
    let mut counter = 0_u32;
    loop {
        let candidate = format!("{DELIMITER_PREFIX}{counter}");
        if !value.contains(&candidate,) {
            return candidate;
        }
        counter += 1;
    }
}

/// Formats `message` as an `::error::` workflow command.
///
/// # Examples
///
/// ```
/// use actions_usage::error_command;
///
/// assert_eq!(error_command("50% done\nfailed"), "::error::50%25 done%0Afailed");
/// ```
pub fn error_command(message: &str,) -> String
{
    let escaped = message.replace('%', "%25",).replace('\r', "%0D",).replace('\n', "%0A",);
    format!("::error::{escaped}")
}
