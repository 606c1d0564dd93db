//! Job resources exchanged with the automation service.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::InputBundle;

/// Lifecycle state reported by the service for a job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobState {
    /// The automation is running and needs nothing from the caller.
    #[default]
    Processing,
    /// The automation is blocked until the input named by `awaitingInputKey` is submitted.
    AwaitingInput,
    /// The automation waits on a third-party step such as 3-D Secure authentication.
    #[serde(rename = "awaitingTds")]
    AwaitingExternalAction,
    /// The job finished successfully.
    Success,
    /// The job finished with an error.
    Fail,
    /// The job was canceled.
    Canceled,
    /// Any state this client does not recognize.
    #[serde(other)]
    Unknown,
}

impl JobState {
    /// True for states after which the service will not change the job again.
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Success | Self::Fail | Self::Canceled)
    }
}

/// Error details attached to a failed job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobErrorInfo {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Snapshot of a remote job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    #[serde(default)]
    pub state: JobState,
    /// Input key the job is blocked on. Only meaningful in [`JobState::AwaitingInput`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub awaiting_input_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobErrorInfo>,
}

impl Job {
    /// Creates a snapshot in the given state with no awaited input.
    pub fn new(id: impl Into<String>, state: JobState) -> Self {
        Self {
            id: id.into(),
            service_id: None,
            state,
            awaiting_input_key: None,
            error: None,
        }
    }

    /// Creates a snapshot blocked on `key`.
    pub fn awaiting_input(id: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            awaiting_input_key: Some(key.into()),
            ..Self::new(id, JobState::AwaitingInput)
        }
    }
}

/// Body of a job creation call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCreationRequest {
    pub service_id: String,
    /// Initial input data keyed by input key.
    #[serde(default)]
    pub input: InputBundle,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub callback_url: String,
}

/// Output previously emitted by a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default)]
    pub data: Value,
}

/// Body of an input submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputCreationRequest {
    pub key: String,
    pub data: Value,
}

/// Acknowledgement returned by the service for a submitted input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputReceipt {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
}
