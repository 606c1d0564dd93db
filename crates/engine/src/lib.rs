//! # Autopilot Engine
//!
//! The engine drives a remote automation job to completion without a human
//! in the loop. Whenever the job blocks on an input, the engine answers it
//! either from a pre-generated input bundle or by deriving the value from an
//! output the job produced earlier.
//!
//! ## Usage
//!
//! ```ignore
//! use std::{sync::Arc, time::Duration};
//! use autopilot_api::AutomationClient;
//! use autopilot_engine::{DriveOptions, HttpBundler, Orchestrator, drive};
//!
//! async fn run(config: autopilot_types::RunConfig) -> anyhow::Result<()> {
//!     let service = Arc::new(AutomationClient::new_from_env()?);
//!     let bundler = Arc::new(HttpBundler::new("https://bundler.example.com/generate")?);
//!     let mut orchestrator = Orchestrator::new(service, bundler);
//!     orchestrator.run_job(&config).await?;
//!     let report = drive(&mut orchestrator, DriveOptions::default()).await?;
//!     println!("job {} finished as {:?}", report.job.id, report.job.state);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **`bundle`**: Input bundle generation against the bundler endpoint
//! - **`derive`**: Named derivation strategies and their registry
//! - **`resolve`**: Resolution of an awaited input key to a concrete value
//! - **`orchestrator`**: Run/resume lifecycle and the polling state machine
//! - **`driver`**: Poll loop composing refresh, process, and the cancel policy

pub mod bundle;
pub mod derive;
pub mod driver;
pub mod error;
pub mod orchestrator;
pub mod resolve;

#[cfg(test)]
mod test_support;

pub use bundle::{BundleError, BundleSource, HttpBundler, generate_bundle};
pub use derive::{CONSENT, Consent, DeriveError, Derivation, DerivationRegistry, SELECT_ONE, SelectOne};
pub use driver::{DriveOptions, DriveReport, drive};
pub use error::OrchestratorError;
pub use orchestrator::{Orchestrator, OrchestratorState, filter_inputs};
pub use resolve::{InputResolver, InputSource, ResolvedInput};
