// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// Control flow of a single run.
///
/// Computes usage once, then renders, writes and optionally pushes each
/// requested report. Pushes are attempted independently; their failures are
/// collected in the [`RunReport`] instead of aborting the remaining formats.
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    analyzer::UsageAnalyzer,
    contents::{ContentsApi, FileLocation, PushOutcome, PushRequest, push_if_changed},
    error::Error,
    inputs::RunPlan,
    outputs::ActionOutputs,
    report::{ReportFormat, write_report},
};

/// Everything a run produced.
#[derive(Debug,)]
pub struct RunReport
{
    /// Step outputs for every format that rendered.
    pub outputs:  ActionOutputs,
    /// Outcomes of successful pushes, in format order.
    pub pushes:   Vec<PushOutcome,>,
    /// Push failures, in format order.
    pub failures: Vec<Error,>,
}

impl RunReport
{
    /// Converts collected push failures into the run result.
    ///
    /// # Errors
    ///
    /// Returns the single failure verbatim or an aggregated
    /// [`Error::Publish`] when several pushes failed.
    pub fn finish(self,) -> Result<(), Error,>
    {
        match Error::aggregate(self.failures,) {
            Some(error,) => Err(error,),
            None => Ok((),),
        }
    }

    /// Like [`RunReport::finish`], but also accounts for the result of
    /// emitting the step outputs.
    ///
    /// # Errors
    ///
    /// Returns the emission error when no push failed, the push failure when
    /// outputs were emitted, or [`Error::Combined`] when both failed.
    pub fn conclude(self, emitted: Result<(), Error,>,) -> Result<(), Error,>
    {
        match (emitted, self.finish(),) {
            (Ok((),), finished,) => finished,
            (Err(error,), Ok((),),) => Err(error,),
            (Err(emit_error,), Err(push_error,),) => Err(Error::combine(emit_error, push_error,),),
        }
    }
}

#[derive(Debug, Serialize,)]
struct Summary<'a,>
{
    records: usize,
    pushed:  &'a [PushOutcome],
}

/// Executes a validated plan.
///
/// # Errors
///
/// Returns collaborator, serialization and local I/O errors immediately, and
/// [`Error::Client`] when the plan publishes but no `contents` client was
/// supplied. Push failures are reported through [`RunReport::failures`].
pub async fn execute<A, C,>(
    plan: &RunPlan,
    analyzer: &A,
    contents: Option<&C,>,
) -> Result<RunReport, Error,>
where
    A: UsageAnalyzer + ?Sized,
    C: ContentsApi + ?Sized,
{
    let publisher = match (&plan.publish, contents,) {
        (Some(publish,), Some(contents,),) => Some((publish, contents,),),
        (Some(_,), None,) => return Err(Error::client("publishing requires a GitHub client",),),
        (None, _,) => None,
    };

    let records = analyzer.compute_usage(&plan.scope,).await?;
    let mut outputs = ActionOutputs::new(serde_json::to_string(&records,)?,);
    let mut pushes = Vec::new();
    let mut failures = Vec::new();

    let requested = [(ReportFormat::Csv, plan.csv.as_ref(),), (ReportFormat::Markdown, plan.markdown.as_ref(),),];

    for (format, target,) in requested {
        let Some(target,) = target else {
            continue;
        };

        let rendered = match format {
            ReportFormat::Csv => analyzer.to_csv(&records,)?,
            ReportFormat::Markdown => analyzer.to_markdown(&records,)?,
        };

        let written = write_report(target.resolved(), &rendered,)?;
        info!("Wrote {} report to {} ({} bytes)", format.label(), written.path.display(), written.bytes);

        if let Some((publish, contents,),) = publisher {
            let request = PushRequest {
                location:  FileLocation {
                    owner: publish.repository.owner.clone(),
                    repo:  publish.repository.repo.clone(),
                    path:  target.repo_path(),
                },
                message:   format.commit_message(),
                content:   rendered.as_bytes().to_vec(),
                committer: Some(publish.committer.clone(),),
            };

            match push_if_changed(contents, &request,).await {
                Ok(outcome,) => pushes.push(outcome,),
                Err(error,) => {
                    warn!("Push of {} report failed: {}", format.label(), error);
                    failures.push(error,);
                }
            }
        }

        outputs.set_report(format, rendered,);
    }

    let summary = Summary {
        records: records.len(), pushed: &pushes,
    };
    info!("Run summary: {}", serde_json::to_string(&summary,)?);

    Ok(RunReport {
        outputs,
        pushes,
        failures,
    },)
}
