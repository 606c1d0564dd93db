//! Job orchestration: run/resume lifecycle and the polling state machine.
//!
//! An [`Orchestrator`] owns exactly one active job at a time. The caller
//! owns the poll loop: it calls [`Orchestrator::process`] with the latest
//! job snapshot and refreshes that snapshot between calls (see
//! [`crate::drive`] for a ready-made loop).

use std::{sync::Arc, time::Duration};

use autopilot_api::JobService;
use autopilot_types::{Domain, InputBundle, InputCreationRequest, InputReceipt, Job, JobCreationRequest, JobState, RunConfig};
use tracing::{debug, info, warn};

use crate::{
    bundle::BundleSource,
    derive::DerivationRegistry,
    error::OrchestratorError,
    resolve::{InputResolver, InputSource},
};

/// Mutable state of one orchestrator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrchestratorState {
    /// Protocol domain of the active job.
    pub domain_id: Option<String>,
    /// Latest snapshot of the active job. `None` until a run or resume succeeds.
    pub job: Option<Job>,
    /// Bundle generated by the last run. Resumed jobs keep whatever was here before.
    pub bundle: Option<InputBundle>,
}

/// Drives one remote job through its lifecycle.
pub struct Orchestrator {
    service: Arc<dyn JobService>,
    bundler: Arc<dyn BundleSource>,
    derivations: DerivationRegistry,
    state: OrchestratorState,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("derivations", &self.derivations)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Create an orchestrator with the built-in derivation strategies and no active job.
    pub fn new(service: Arc<dyn JobService>, bundler: Arc<dyn BundleSource>) -> Self {
        Self {
            service,
            bundler,
            derivations: DerivationRegistry::default(),
            state: OrchestratorState::default(),
        }
    }

    /// Replace the derivation strategy table.
    pub fn with_derivations(mut self, derivations: DerivationRegistry) -> Self {
        self.derivations = derivations;
        self
    }

    pub fn state(&self) -> &OrchestratorState {
        &self.state
    }

    pub fn job(&self) -> Option<&Job> {
        self.state.job.as_ref()
    }

    pub fn domain_id(&self) -> Option<&str> {
        self.state.domain_id.as_deref()
    }

    pub fn bundle(&self) -> Option<&InputBundle> {
        self.state.bundle.as_ref()
    }

    /// Generate a bundle and create the job described by `config`.
    ///
    /// The job is created `max(1, replica_count)` times with the identical
    /// request and the last created job becomes the active one. A creation
    /// failure stops the loop; jobs created by earlier iterations are left
    /// running and untracked.
    pub async fn run_job(&mut self, config: &RunConfig) -> Result<Job, OrchestratorError> {
        let bundle = self.bundler.generate(&config.bundler_config).await?;
        self.state.bundle = Some(bundle);
        self.state.domain_id = Some(config.domain_id.clone());

        let input = if config.oversupply_inputs {
            let protocol = self
                .service
                .fetch_protocol()
                .await
                .map_err(OrchestratorError::ProtocolFetch)?;
            filter_inputs(protocol.domain(&config.domain_id), self.state.bundle.as_ref())
        } else {
            InputBundle::new()
        };

        let request = JobCreationRequest {
            service_id: config.service_id.clone(),
            input,
            callback_url: config.job_callback_url(),
        };

        let total = config.effective_replica_count();
        info!(
            service_id = %request.service_id,
            domain_id = %config.domain_id,
            initial_inputs = request.input.len(),
            replicas = total,
            "creating job"
        );

        let mut replica = 1;
        loop {
            let job = self
                .service
                .create_job(&request)
                .await
                .map_err(|source| OrchestratorError::JobCreation { replica, total, source })?;
            info!(job_id = %job.id, replica, total, "job created");
            self.state.job = Some(job);

            if replica >= total {
                break;
            }
            replica += 1;
        }

        self.state.job.clone().ok_or(OrchestratorError::NotReady)
    }

    /// Attach to an existing job.
    ///
    /// State is only modified once the job and protocol were fetched and
    /// `domain_id` was found in the protocol. The bundle is left untouched.
    pub async fn resume_job(&mut self, job_id: &str, domain_id: &str) -> Result<(), OrchestratorError> {
        let job = self
            .service
            .fetch_job(job_id)
            .await
            .map_err(|source| OrchestratorError::JobFetch {
                job_id: job_id.to_string(),
                source,
            })?;

        let protocol = self
            .service
            .fetch_protocol()
            .await
            .map_err(OrchestratorError::ProtocolFetch)?;
        if !protocol.contains_domain(domain_id) {
            warn!(%job_id, %domain_id, "refusing to resume job with unknown domain");
            return Err(OrchestratorError::UnknownDomain(domain_id.to_string()));
        }

        info!(job_id = %job.id, %domain_id, state = ?job.state, "job resumed");
        self.state.domain_id = Some(domain_id.to_string());
        self.state.job = Some(job);
        Ok(())
    }

    /// Replace the active job snapshot with a freshly fetched one.
    pub async fn refresh(&mut self) -> Result<&Job, OrchestratorError> {
        let job_id = self.state.job.as_ref().ok_or(OrchestratorError::NotReady)?.id.clone();
        let job = self
            .service
            .fetch_job(&job_id)
            .await
            .map_err(|source| OrchestratorError::JobFetch { job_id, source })?;
        debug!(job_id = %job.id, state = ?job.state, "job refreshed");
        Ok(self.state.job.insert(job))
    }

    /// Cancel the active job.
    pub async fn cancel(&self) -> Result<(), OrchestratorError> {
        let job = self.state.job.as_ref().ok_or(OrchestratorError::NotReady)?;
        self.service
            .cancel_job(&job.id)
            .await
            .map_err(|source| OrchestratorError::JobCancel {
                job_id: job.id.clone(),
                source,
            })?;
        info!(job_id = %job.id, "job canceled");
        Ok(())
    }

    /// Take one step based on the current job snapshot.
    ///
    /// Returns `true` while the caller should keep polling: the job is
    /// processing, or it was awaiting input and the input was submitted.
    /// Any other state returns `false`. No fresh job state is fetched here.
    pub async fn process(&mut self, input_delay: Duration) -> Result<bool, OrchestratorError> {
        let job = self.state.job.as_ref().ok_or(OrchestratorError::NotReady)?;
        match job.state {
            JobState::Processing => Ok(true),
            JobState::AwaitingInput => {
                self.create_input(input_delay).await?;
                Ok(true)
            }
            JobState::AwaitingExternalAction => {
                info!(job_id = %job.id, "job awaits an external action; stopping");
                Ok(false)
            }
            state => {
                debug!(job_id = %job.id, ?state, "job needs no further processing");
                Ok(false)
            }
        }
    }

    /// Resolve and submit the input the active job is waiting for.
    ///
    /// `input_delay` is waited out between resolution and submission.
    pub async fn create_input(&self, input_delay: Duration) -> Result<InputReceipt, OrchestratorError> {
        let job = self.state.job.as_ref().ok_or(OrchestratorError::NotReady)?;
        let domain_id = self.state.domain_id.as_deref().ok_or(OrchestratorError::NotReady)?;
        let key = job
            .awaiting_input_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| OrchestratorError::MissingAwaitedKey { job_id: job.id.clone() })?;

        let resolver = InputResolver::new(self.service.as_ref(), &self.derivations);
        let resolved = resolver
            .resolve(&job.id, domain_id, key, self.state.bundle.as_ref())
            .await?;

        let from_bundle = resolved.source == InputSource::Bundle;
        if !input_delay.is_zero() {
            info!(
                job_id = %job.id,
                %key,
                delay_ms = input_delay.as_millis(),
                "waiting before submitting input"
            );
            tokio::time::sleep(input_delay).await;
        }

        let request = InputCreationRequest {
            key: resolved.key,
            data: resolved.value,
        };
        let receipt = self
            .service
            .submit_input(&job.id, &request)
            .await
            .map_err(|source| OrchestratorError::InputSubmission {
                key: request.key.clone(),
                source,
            })?;
        info!(job_id = %job.id, key = %request.key, from_bundle, "input submitted");
        Ok(receipt)
    }
}

/// Keep the bundle entries whose keys are declared inputs of `domain`.
///
/// Unknown bundle keys are dropped; declared keys missing from the bundle are
/// simply absent. A missing domain or bundle yields an empty map.
pub fn filter_inputs(domain: Option<&Domain>, bundle: Option<&InputBundle>) -> InputBundle {
    let (Some(domain), Some(bundle)) = (domain, bundle) else {
        return InputBundle::new();
    };
    bundle
        .iter()
        .filter(|(key, _)| domain.declares_input(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
