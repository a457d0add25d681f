//! Building blocks for publishing GitHub Actions usage reports.
//!
//! The library validates workflow inputs, delegates the usage analysis to an
//! external collaborator, renders CSV and Markdown reports, and commits them
//! back to a repository only when their content changed. Public APIs document
//! their error semantics so the binary can report failures verbatim.

mod analyzer;
mod contents;
mod error;
mod inputs;
mod outputs;
mod report;
mod run;
mod scope;
mod workspace;

pub use analyzer::{CommandAnalyzer, DEFAULT_ANALYZER_PROGRAM, UsageAnalyzer, UsageRecord};
pub use contents::{
    ContentsApi, DEFAULT_API_URL, FetchOutcome, FileLocation, FileWrite, OctocrabContents,
    PushOutcome, PushRequest, RemoteFile, WriteReceipt, push_if_changed,
};
pub use error::{Error, io_error};
pub use inputs::{
    ActionInputs, CommitIdentity, PublishTarget, RepoRef, RunPlan, parse_boolean_input,
};
pub use outputs::{ActionOutputs, error_command};
pub use report::{ReportFile, ReportFormat, render_csv, render_markdown, write_report};
pub use run::{RunReport, execute};
pub use scope::Scope;
pub use workspace::OutputPath;
