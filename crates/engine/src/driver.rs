//! Poll loop that drives the active job until it stops needing attention.

use std::time::Duration;

use autopilot_types::{Job, JobState};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::{error::OrchestratorError, orchestrator::Orchestrator};

/// Knobs for [`drive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveOptions {
    /// Wait between a processing step and the next job refresh.
    pub poll_interval: Duration,
    /// Wait between resolving an input and submitting it.
    pub input_delay: Duration,
    /// Cancel the remote job once when the loop fails.
    pub cancel_on_failure: bool,
}

impl Default for DriveOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            input_delay: Duration::ZERO,
            cancel_on_failure: false,
        }
    }
}

/// Summary of a finished [`drive`] call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveReport {
    /// Last snapshot of the job when the loop stopped.
    pub job: Job,
    /// Number of job refreshes performed.
    pub polls: u32,
    pub inputs_submitted: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Process, sleep, refresh, repeat until [`Orchestrator::process`] returns `false`.
///
/// The first step works on the snapshot already held by the orchestrator.
/// With `cancel_on_failure`, one cancel attempt is made for the active job
/// before the original error is returned.
pub async fn drive(orchestrator: &mut Orchestrator, options: DriveOptions) -> Result<DriveReport, OrchestratorError> {
    let started_at = Utc::now();
    let mut polls = 0;
    let mut inputs_submitted = 0;

    let outcome = poll_until_idle(orchestrator, &options, &mut polls, &mut inputs_submitted).await;
    if let Err(error) = outcome {
        if options.cancel_on_failure && orchestrator.job().is_some() {
            warn!(%error, "orchestration failed; canceling job");
            if let Err(cancel_error) = orchestrator.cancel().await {
                warn!(error = %cancel_error, "cancel after failure did not succeed");
            }
        }
        return Err(error);
    }

    let job = orchestrator.job().cloned().ok_or(OrchestratorError::NotReady)?;
    info!(
        job_id = %job.id,
        state = ?job.state,
        finished = job.state.is_finished(),
        polls,
        inputs_submitted,
        "job no longer needs processing"
    );
    Ok(DriveReport {
        job,
        polls,
        inputs_submitted,
        started_at,
        finished_at: Utc::now(),
    })
}

async fn poll_until_idle(
    orchestrator: &mut Orchestrator,
    options: &DriveOptions,
    polls: &mut u32,
    inputs_submitted: &mut u32,
) -> Result<(), OrchestratorError> {
    loop {
        let awaiting_input = orchestrator.job().is_some_and(|job| job.state == JobState::AwaitingInput);
        if !orchestrator.process(options.input_delay).await? {
            return Ok(());
        }
        if awaiting_input {
            *inputs_submitted += 1;
        }

        tokio::time::sleep(options.poll_interval).await;
        orchestrator.refresh().await?;
        *polls += 1;
    }
}
