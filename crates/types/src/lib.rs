//! Shared type definitions for the autopilot workspace.
//!
//! The models here describe the wire format of the automation service
//! (jobs, outputs, inputs), the protocol schema (domains and their
//! declared inputs), and the run configuration accepted by the
//! orchestrator.

pub mod config;
pub mod job;
pub mod protocol;

pub use config::{BundlerConfig, InputBundle, RunConfig, make_callback_url};
pub use job::{InputCreationRequest, InputReceipt, Job, JobCreationRequest, JobErrorInfo, JobOutput, JobState};
pub use protocol::{Domain, InputDefinition, Protocol};
