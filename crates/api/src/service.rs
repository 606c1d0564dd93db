use async_trait::async_trait;
use autopilot_types::{InputCreationRequest, InputReceipt, Job, JobCreationRequest, JobOutput, Protocol};

use crate::ApiError;

/// Operations the orchestrator needs from the automation service.
///
/// Every method is a single round trip. Implementations must not retry;
/// timeouts are a property of the underlying transport.
#[async_trait]
pub trait JobService: Send + Sync {
    /// Fetch the protocol schema describing every domain.
    async fn fetch_protocol(&self) -> Result<Protocol, ApiError>;

    async fn create_job(&self, request: &JobCreationRequest) -> Result<Job, ApiError>;

    async fn fetch_job(&self, job_id: &str) -> Result<Job, ApiError>;

    /// Fetch the output `key` previously emitted by job `job_id`.
    async fn fetch_output(&self, job_id: &str, key: &str) -> Result<JobOutput, ApiError>;

    async fn submit_input(&self, job_id: &str, request: &InputCreationRequest) -> Result<InputReceipt, ApiError>;

    async fn cancel_job(&self, job_id: &str) -> Result<(), ApiError>;
}
