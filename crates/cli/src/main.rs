use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use autopilot_api::{AutomationClient, JobService};
use autopilot_engine::{DriveOptions, HttpBundler, Orchestrator, drive};
use autopilot_types::RunConfig;
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const BUNDLER_URL_ENV: &str = "AUTOMATION_BUNDLER_URL";

#[derive(Debug, Parser)]
#[command(name = "autopilot", version, about = "Drive automation jobs to completion without manual input")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate an input bundle, create the job, and drive it
    Run(RunArgs),
    /// Attach to an existing job and drive it
    Resume(ResumeArgs),
    /// Cancel a job
    Cancel {
        #[arg(long)]
        job_id: String,
    },
    /// Print the protocol, or one of its domains
    Protocol {
        #[arg(long)]
        domain_id: Option<String>,
    },
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Run configuration file (YAML for .yaml/.yml, JSON otherwise)
    #[arg(long)]
    config: PathBuf,
    /// Bundler endpoint receiving the bundler configuration
    #[arg(long, env = BUNDLER_URL_ENV)]
    bundler_url: String,
    #[command(flatten)]
    drive: DriveArgs,
}

#[derive(Debug, Args)]
struct ResumeArgs {
    #[arg(long)]
    job_id: String,
    #[arg(long)]
    domain_id: String,
    #[command(flatten)]
    drive: DriveArgs,
}

#[derive(Debug, Args)]
struct DriveArgs {
    /// Milliseconds between job polls
    #[arg(long, default_value_t = 1000)]
    poll_interval_ms: u64,
    /// Seconds to wait before each input submission
    #[arg(long, default_value_t = 0)]
    input_delay_secs: u64,
    /// Cancel the job when driving it fails
    #[arg(long)]
    cancel_on_failure: bool,
    /// Stop once the job is created or resumed
    #[arg(long)]
    no_drive: bool,
}

impl DriveArgs {
    fn options(&self) -> DriveOptions {
        DriveOptions {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            input_delay: Duration::from_secs(self.input_delay_secs),
            cancel_on_failure: self.cancel_on_failure,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => run(args).await,
        Command::Resume(args) => resume(args).await,
        Command::Cancel { job_id } => {
            let client = AutomationClient::new_from_env()?;
            client
                .cancel_job(&job_id)
                .await
                .with_context(|| format!("failed to cancel job {job_id}"))?;
            info!(%job_id, "job canceled");
            Ok(())
        }
        Command::Protocol { domain_id } => {
            let client = AutomationClient::new_from_env()?;
            let protocol = client.fetch_protocol().await.context("failed to fetch protocol")?;
            let out = match domain_id {
                Some(id) => {
                    let domain = protocol.domain(&id).with_context(|| format!("unknown domain: {id}"))?;
                    serde_json::to_value(domain)?
                }
                None => serde_json::to_value(&protocol)?,
            };
            print_json(&out)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run(args: RunArgs) -> Result<()> {
    let config = load_run_config(&args.config)?;
    let mut orchestrator = orchestrator(&args.bundler_url)?;
    orchestrator
        .run_job(&config)
        .await
        .with_context(|| format!("failed to run job for service {}", config.service_id))?;
    finish(orchestrator, &args.drive).await
}

async fn resume(args: ResumeArgs) -> Result<()> {
    // Resumed jobs never generate a bundle, so the endpoint may be unset.
    let bundler_url = std::env::var(BUNDLER_URL_ENV).unwrap_or_default();
    let mut orchestrator = orchestrator(&bundler_url)?;
    orchestrator
        .resume_job(&args.job_id, &args.domain_id)
        .await
        .with_context(|| format!("failed to resume job {}", args.job_id))?;
    finish(orchestrator, &args.drive).await
}

fn orchestrator(bundler_url: &str) -> Result<Orchestrator> {
    let service = AutomationClient::new_from_env()?;
    let bundler = HttpBundler::new(bundler_url).context("failed to build bundler client")?;
    debug!(api = %service.base_url(), bundler = %bundler.endpoint(), "clients configured");
    Ok(Orchestrator::new(Arc::new(service), Arc::new(bundler)))
}

async fn finish(mut orchestrator: Orchestrator, args: &DriveArgs) -> Result<()> {
    if args.no_drive {
        let job = orchestrator.job().context("no active job")?;
        return print_json(&serde_json::to_value(job)?);
    }

    let report = drive(&mut orchestrator, args.options()).await.context("failed to drive job")?;
    info!(
        polls = report.polls,
        inputs_submitted = report.inputs_submitted,
        elapsed_ms = (report.finished_at - report.started_at).num_milliseconds(),
        "driving finished"
    );
    print_json(&serde_json::to_value(&report.job)?)
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_run_config(path: &Path) -> Result<RunConfig> {
    let text = std::fs::read_to_string(path).with_context(|| format!("failed to read config {}", path.display()))?;
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    let config: RunConfig = if is_yaml {
        serde_yaml::from_str(&text).with_context(|| format!("invalid YAML config {}", path.display()))?
    } else {
        serde_json::from_str(&text).with_context(|| format!("invalid JSON config {}", path.display()))?
    };
    Ok(config)
}
