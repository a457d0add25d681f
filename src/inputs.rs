// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Workflow inputs and their validation into an executable [`RunPlan`].
//!
//! Inputs arrive as loosely typed strings from the runner. Validation is pure
//! and fail-fast: it never touches the network, and the first violated rule
//! is reported.

use std::{fmt, path::PathBuf};

use serde::Serialize;

use crate::{error::Error, scope::Scope, workspace::OutputPath};

const TRUE_VALUES: &[&str] = &["true", "True", "TRUE"];
const FALSE_VALUES: &[&str] = &["false", "False", "FALSE"];

/// Raw inputs as received from the workflow step and runner environment.
#[derive(Debug, Clone, Default,)]
pub struct ActionInputs
{
    /// Token used for the usage analysis and for pushing reports.
    pub token:                Option<String,>,
    /// Enterprise slug selecting the enterprise scope.
    pub enterprise:           Option<String,>,
    /// Organization or user login selecting the owner scope.
    pub owner:                Option<String,>,
    /// Workspace-relative path of the CSV report.
    pub csv:                  Option<String,>,
    /// Workspace-relative path of the Markdown report.
    pub md:                   Option<String,>,
    /// Raw `push_results_to_repo` input.
    pub push_results_to_repo: Option<String,>,
    /// Workspace root that report paths must stay inside.
    pub workspace:            Option<PathBuf,>,
    /// Repository receiving pushed reports, as `owner/repo`.
    pub repository:           Option<String,>,
}

/// Repository coordinates parsed from `owner/repo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize,)]
pub struct RepoRef
{
    /// Account that owns the repository.
    pub owner: String,
    /// Repository name.
    pub repo:  String,
}

impl RepoRef
{
    /// Parses `owner/repo` as exported in `GITHUB_REPOSITORY`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when either half is missing or more
    /// than one separator is present.
    pub fn parse(value: &str,) -> Result<Self, Error,>
    {
        let trimmed = value.trim();
        match trimmed.split_once('/',) {
            Some((owner, repo,),)
                if !owner.is_empty() && !repo.is_empty() && !repo.contains('/',) =>
            {
                Ok(Self {
                    owner: owner.to_owned(),
                    repo:  repo.to_owned(),
                },)
            }
            _ => Err(Error::configuration(format!(
                "invalid repository '{trimmed}', expected owner/repo"
            ),),),
        }
    }
}

impl fmt::Display for RepoRef
{
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result
    {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Identity recorded as committer of pushed reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize,)]
pub struct CommitIdentity
{
    /// Display name of the committer.
    pub name:  String,
    /// Email address of the committer.
    pub email: String,
}

impl CommitIdentity
{
    /// The GitHub Actions bot account.
    pub fn actions_bot() -> Self
    {
        Self {
            name:  "github-actions[bot]".to_owned(),
            email: "41898282+github-actions[bot]@users.noreply.github.com".to_owned(),
        }
    }
}

/// Push settings, present only when reports are committed back.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct PublishTarget
{
    /// Repository receiving the reports.
    pub repository: RepoRef,
    /// Committer attached to every write.
    pub committer:  CommitIdentity,
}

/// Validated work for a single run.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct RunPlan
{
    /// Token forwarded to the collaborator and the API client.
    pub token:    String,
    /// Enterprise or owner boundary.
    pub scope:    Scope,
    /// CSV report location, when requested.
    pub csv:      Option<OutputPath,>,
    /// Markdown report location, when requested.
    pub markdown: Option<OutputPath,>,
    /// Push settings, when `push_results_to_repo` is enabled.
    pub publish:  Option<PublishTarget,>,
}

/// Parses a workflow boolean input.
///
/// Accepts the YAML 1.2 core schema spellings understood by the runner. A
/// missing or blank value is `false`.
///
/// # Errors
///
/// Returns [`Error::Configuration`] for any other spelling.
///
/// # Examples
///
/// ```
/// use actions_usage::parse_boolean_input;
///
/// assert!(parse_boolean_input("push_results_to_repo", Some("True",),)?);
/// assert!(!parse_boolean_input("push_results_to_repo", None,)?);
/// assert!(parse_boolean_input("push_results_to_repo", Some("yes",),).is_err());
/// # Ok::<(), actions_usage::Error>(())
/// ```
pub fn parse_boolean_input(name: &str, value: Option<&str,>,) -> Result<bool, Error,>
{
    let Some(value,) = value.map(str::trim,).filter(|value| !value.is_empty(),) else {
        return Ok(false,);
    };

    if TRUE_VALUES.contains(&value,) {
        return Ok(true,);
    }
    if FALSE_VALUES.contains(&value,) {
        return Ok(false,);
    }

    Err(Error::configuration(format!(
        "Input does not meet YAML 1.2 \"Core Schema\" specification: {name}\nSupport boolean \
         input list: `true | True | TRUE | false | False | FALSE`"
    ),),)
}

impl ActionInputs
{
    /// Validates the inputs and produces the plan for this run.
    ///
    /// Checks run in order: token, scope, CSV path, Markdown path, push
    /// target. The workspace root is only required when a report path is set,
    /// and the repository only when pushing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for missing or malformed inputs and
    /// [`Error::PathTraversal`] for report paths escaping the workspace.
    pub fn validate(&self,) -> Result<RunPlan, Error,>
    {
        let token = non_blank(self.token.as_deref(),)
            .ok_or_else(|| Error::configuration("Input required and not supplied: token",),)?
            .to_owned();

        let scope = Scope::select(self.enterprise.as_deref(), self.owner.as_deref(),)?;
        let csv = self.output_path(self.csv.as_deref(),)?;
        let markdown = self.output_path(self.md.as_deref(),)?;

        let push = parse_boolean_input(
            "push_results_to_repo",
            self.push_results_to_repo.as_deref(),
        )?;
        let publish = if push {
            let repository = non_blank(self.repository.as_deref(),).ok_or_else(|| {
                Error::configuration("GITHUB_REPOSITORY is required to push results",)
            },)?;
            Some(PublishTarget {
                repository: RepoRef::parse(repository,)?,
                committer:  CommitIdentity::actions_bot(),
            },)
        } else {
            None
        };

        Ok(RunPlan {
            token,
            scope,
            csv,
            markdown,
            publish,
        },)
    }

    fn output_path(&self, relative: Option<&str,>,) -> Result<Option<OutputPath,>, Error,>
    {
        let Some(relative,) = non_blank(relative,) else {
            return Ok(None,);
        };

        let root = self.workspace.as_deref().filter(|root| !root.as_os_str().is_empty(),).ok_or_else(
            || Error::configuration("GITHUB_WORKSPACE is required when writing reports",),
        )?;

        OutputPath::resolve(root, relative,).map(Some,)
    }
}

fn non_blank(value: Option<&str,>,) -> Option<&str,>
{
    value.map(str::trim,).filter(|value| !value.is_empty(),)
}
