//! Automation service client.
//!
//! This crate provides a lightweight client for the remote job-execution
//! service and the protocol schema store. It focuses on:
//!
//! - Constructing an HTTP client with sensible defaults
//! - Reading the API key and endpoints from the environment
//! - Validating base URLs for safety
//! - Mapping every call onto the typed [`ApiError`]
//!
//! The orchestrator depends only on the [`JobService`] trait, so tests and
//! alternative transports can stand in for [`AutomationClient`].
//!
//! # Example
//!
//! ```ignore
//! use autopilot_api::{AutomationClient, JobService};
//!
//! async fn show(job_id: &str) -> anyhow::Result<()> {
//!     let client = AutomationClient::new_from_env()?;
//!     let job = client.fetch_job(job_id).await?;
//!     println!("{} is {:?}", job.id, job.state);
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod service;

pub use client::{
    API_BASE_ENV, API_KEY_ENV, AutomationClient, ClientConfig, DEFAULT_API_BASE, DEFAULT_PROTOCOL_URL, PROTOCOL_URL_ENV,
    validate_base_url,
};
pub use error::ApiError;
pub use service::JobService;
