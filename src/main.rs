//! Command-line entry point for the actions usage report step.
//!
//! Inputs are read from flags or from the environment variables the Actions
//! runner exports for a step (`INPUT_*` and `GITHUB_*`). Failures are printed
//! as an `::error::` workflow command and exit with status 1.

use std::{
    io,
    path::{Path, PathBuf},
    process,
};

use actions_usage::{
    ActionInputs, ActionOutputs, CommandAnalyzer, DEFAULT_ANALYZER_PROGRAM, Error,
    OctocrabContents, RunPlan, error_command, execute,
};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Report GitHub Actions usage and optionally commit the reports.
#[derive(Debug, Parser,)]
#[command(
    name = "actions-usage",
    version,
    about = "Report GitHub Actions usage for an enterprise or organization"
)]
struct Cli
{
    /// Token used for the analysis and for pushing reports.
    #[arg(long, env = "INPUT_TOKEN", hide_env_values = true)]
    token: Option<String,>,

    /// Enterprise slug; mutually exclusive with --owner.
    #[arg(long, env = "INPUT_ENTERPRISE", value_name = "SLUG")]
    enterprise: Option<String,>,

    /// Organization or user login; mutually exclusive with --enterprise.
    #[arg(long, env = "INPUT_OWNER", value_name = "LOGIN")]
    owner: Option<String,>,

    /// Workspace-relative path of the CSV report.
    #[arg(long, env = "INPUT_CSV", value_name = "PATH")]
    csv: Option<String,>,

    /// Workspace-relative path of the Markdown report.
    #[arg(long, env = "INPUT_MD", value_name = "PATH")]
    md: Option<String,>,

    /// Commit the reports to the current repository (`true` or `false`).
    #[arg(long = "push-results-to-repo", env = "INPUT_PUSH_RESULTS_TO_REPO", value_name = "BOOL")]
    push_results_to_repo: Option<String,>,

    /// Workspace root that report paths must stay inside.
    #[arg(long, env = "GITHUB_WORKSPACE", value_name = "DIR")]
    workspace: Option<PathBuf,>,

    /// Repository receiving pushed reports.
    #[arg(long, env = "GITHUB_REPOSITORY", value_name = "OWNER/REPO")]
    repository: Option<String,>,

    /// REST API endpoint, for GitHub Enterprise Server.
    #[arg(long = "api-url", env = "GITHUB_API_URL", value_name = "URL")]
    api_url: Option<String,>,

    /// File receiving step outputs; printed to stdout as JSON when unset.
    #[arg(long = "output-file", env = "GITHUB_OUTPUT", value_name = "PATH")]
    output_file: Option<PathBuf,>,

    /// Program computing the usage records.
    #[arg(long, env = "USAGE_ANALYZER", value_name = "PROGRAM", default_value = DEFAULT_ANALYZER_PROGRAM)]
    analyzer: PathBuf,

    #[arg(long = "runner-debug", env = "RUNNER_DEBUG", hide = true)]
    runner_debug: Option<String,>,
}

impl Cli
{
    fn inputs(&self,) -> ActionInputs
    {
        ActionInputs {
            token:                self.token.clone(),
            enterprise:           self.enterprise.clone(),
            owner:                self.owner.clone(),
            csv:                  self.csv.clone(),
            md:                   self.md.clone(),
            push_results_to_repo: self.push_results_to_repo.clone(),
            workspace:            self.workspace.clone(),
            repository:           self.repository.clone(),
        }
    }
}

/// Entry point that reports errors and sets the appropriate exit status.
#[tokio::main(flavor = "current_thread")]
async fn main()
{
    let cli = Cli::parse();
    init_tracing(cli.runner_debug.as_deref() == Some("1",),);

    if let Err(error,) = run(&cli,).await {
        println!("{}", error_command(&error.to_display_string()));
        process::exit(1,);
    }
}

fn init_tracing(runner_debug: bool,)
{
    let fallback = if runner_debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback,),);

    tracing_subscriber::fmt().with_env_filter(filter,).with_writer(io::stderr,).init();
}

/// Validates inputs, runs the analysis and publishes outputs.
///
/// # Errors
///
/// Propagates validation, collaborator, I/O and push errors.
async fn run(cli: &Cli,) -> Result<(), Error,>
{
    let plan = cli.inputs().validate()?;
    info!("Computing actions usage for {}", plan.scope);

    let analyzer = CommandAnalyzer::new(&cli.analyzer, plan.token.as_str(),);
    let contents = publishing_client(&plan, cli.api_url.as_deref(),)?;

    let report = execute(&plan, &analyzer, contents.as_ref(),).await?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let emitted = emit_outputs(&report.outputs, cli.output_file.as_deref(), &mut handle,);

    report.conclude(emitted,)
}

/// Builds the API client only for runs that push reports.
fn publishing_client(plan: &RunPlan, api_url: Option<&str,>,) -> Result<Option<OctocrabContents,>, Error,>
{
    plan.publish
        .as_ref()
        .map(|_| OctocrabContents::from_token(&plan.token, api_url,),)
        .transpose()
}

fn emit_outputs<W: io::Write,>(
    outputs: &ActionOutputs,
    output_file: Option<&Path,>,
    fallback: &mut W,
) -> Result<(), Error,>
{
    match output_file.filter(|path| !path.as_os_str().is_empty(),) {
        Some(path,) => outputs.append_to(path,),
        None => {
            serde_json::to_writer_pretty(fallback, outputs,)?;
            Ok((),)
        }
    }
}
