//! In-memory collaborators for orchestrator tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use autopilot_api::{ApiError, JobService};
use autopilot_types::{
    BundlerConfig, InputBundle, InputCreationRequest, InputReceipt, Job, JobCreationRequest, JobOutput, Protocol,
};
use serde_json::Value;

use crate::bundle::{BundleError, BundleSource};

pub fn server_error() -> ApiError {
    ApiError::Status {
        status: 500,
        message: "server error".into(),
    }
}

/// Service fake that records every call it receives.
#[derive(Default)]
pub struct RecordingService {
    pub protocol: Option<Protocol>,
    pub outputs: HashMap<String, Value>,
    /// Snapshots handed out by `fetch_job`, oldest first. The last one repeats.
    pub snapshots: Mutex<VecDeque<Job>>,
    /// Number of `create_job` calls that succeed before the next one fails.
    pub fail_create_after: Option<usize>,
    pub fail_submit: bool,
    pub fail_cancel: bool,
    pub calls: Mutex<Vec<String>>,
    pub created: Mutex<Vec<JobCreationRequest>>,
    pub submitted: Mutex<Vec<InputCreationRequest>>,
    pub create_count: AtomicUsize,
}

impl RecordingService {
    pub fn with_protocol(protocol: Protocol) -> Self {
        Self {
            protocol: Some(protocol),
            ..Self::default()
        }
    }

    pub fn with_output(mut self, key: &str, value: Value) -> Self {
        self.outputs.insert(key.to_string(), value);
        self
    }

    pub fn with_snapshots(self, snapshots: impl IntoIterator<Item = Job>) -> Self {
        self.snapshots.lock().expect("snapshots lock").extend(snapshots);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn created(&self) -> Vec<JobCreationRequest> {
        self.created.lock().expect("created lock").clone()
    }

    pub fn submitted(&self) -> Vec<InputCreationRequest> {
        self.submitted.lock().expect("submitted lock").clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().expect("calls lock").push(call.into());
    }
}

#[async_trait]
impl JobService for RecordingService {
    async fn fetch_protocol(&self) -> Result<Protocol, ApiError> {
        self.record("fetch_protocol");
        self.protocol.clone().ok_or_else(server_error)
    }

    async fn create_job(&self, request: &JobCreationRequest) -> Result<Job, ApiError> {
        self.record("create_job");
        let index = self.create_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_create_after.is_some_and(|limit| index >= limit) {
            return Err(server_error());
        }
        self.created.lock().expect("created lock").push(request.clone());
        Ok(Job::new(format!("job-{}", index + 1), Default::default()))
    }

    async fn fetch_job(&self, job_id: &str) -> Result<Job, ApiError> {
        self.record(format!("fetch_job {job_id}"));
        let mut snapshots = self.snapshots.lock().expect("snapshots lock");
        match snapshots.len() {
            0 => Err(server_error()),
            1 => Ok(snapshots[0].clone()),
            _ => Ok(snapshots.pop_front().ok_or_else(server_error)?),
        }
    }

    async fn fetch_output(&self, job_id: &str, key: &str) -> Result<JobOutput, ApiError> {
        self.record(format!("fetch_output {job_id} {key}"));
        self.outputs
            .get(key)
            .map(|data| JobOutput {
                key: Some(key.to_string()),
                data: data.clone(),
            })
            .ok_or(ApiError::Status {
                status: 404,
                message: format!("output {key} not found"),
            })
    }

    async fn submit_input(&self, job_id: &str, request: &InputCreationRequest) -> Result<InputReceipt, ApiError> {
        self.record(format!("submit_input {job_id} {}", request.key));
        if self.fail_submit {
            return Err(server_error());
        }
        self.submitted.lock().expect("submitted lock").push(request.clone());
        Ok(InputReceipt {
            id: Some("input-id".into()),
            key: Some(request.key.clone()),
        })
    }

    async fn cancel_job(&self, job_id: &str) -> Result<(), ApiError> {
        self.record(format!("cancel_job {job_id}"));
        if self.fail_cancel { Err(server_error()) } else { Ok(()) }
    }
}

/// Bundler fake returning a fixed bundle, or failing with HTTP 500 when `bundle` is `None`.
#[derive(Default)]
pub struct StaticBundler {
    pub bundle: Option<InputBundle>,
    pub requests: Mutex<Vec<BundlerConfig>>,
}

impl StaticBundler {
    pub fn returning(entries: impl IntoIterator<Item = (&'static str, Value)>) -> Self {
        Self {
            bundle: Some(entries.into_iter().map(|(key, value)| (key.to_string(), value)).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BundleSource for StaticBundler {
    async fn generate(&self, config: &BundlerConfig) -> Result<InputBundle, BundleError> {
        self.requests.lock().expect("requests lock").push(config.clone());
        self.bundle.clone().ok_or(BundleError::GenerationFailed { status: 500 })
    }
}
