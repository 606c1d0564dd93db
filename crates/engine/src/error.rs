use autopilot_api::ApiError;
use thiserror::Error;

use crate::{bundle::BundleError, derive::DeriveError};

/// Every failure the orchestrator reports.
///
/// Nothing in the engine cancels a job on failure; callers that want that
/// behavior compose it on top of these errors (see [`crate::DriveOptions`]).
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Bundle(#[from] BundleError),

    #[error("failed to fetch job {job_id}: {source}")]
    JobFetch { job_id: String, source: ApiError },

    #[error("failed to fetch protocol: {0}")]
    ProtocolFetch(#[source] ApiError),

    #[error("unknown domain: {0}")]
    UnknownDomain(String),

    #[error("failed to create job (replica {replica} of {total}): {source}")]
    JobCreation { replica: u32, total: u32, source: ApiError },

    #[error("orchestrator is not ready to create input: no job created or resumed")]
    NotReady,

    #[error("job {job_id} is awaiting input but names no input key")]
    MissingAwaitedKey { job_id: String },

    #[error("unexpected awaiting input key {key} for domain {domain_id}")]
    UnknownInputKey { domain_id: String, key: String },

    #[error("input {key} cannot be derived: definition has no {missing}")]
    NotDerivable { key: String, missing: &'static str },

    #[error("input {key} uses unsupported derivation method {method}")]
    UnsupportedDerivation { key: String, method: String },

    #[error("failed to fetch output {output_key} for input {key}: {source}")]
    OutputFetch { key: String, output_key: String, source: ApiError },

    #[error("output {output_key} cannot produce input {key}: {source}")]
    MalformedOutput { key: String, output_key: String, source: DeriveError },

    #[error("failed to submit input {key}: {source}")]
    InputSubmission { key: String, source: ApiError },

    #[error("failed to cancel job {job_id}: {source}")]
    JobCancel { job_id: String, source: ApiError },
}
