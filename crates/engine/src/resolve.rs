//! Resolution of an awaited input key to the value that will be submitted.
//!
//! A value stored in the run's input bundle always wins. Otherwise the
//! protocol is consulted for the domain's definition of the key, the job
//! output it names is fetched, and the definition's derivation strategy is
//! applied to that output.

use std::fmt;

use autopilot_api::JobService;
use autopilot_types::InputBundle;
use serde_json::Value;
use tracing::debug;

use crate::{derive::DerivationRegistry, error::OrchestratorError};

/// Where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// Looked up in the input bundle.
    Bundle,
    /// Derived from job output `output_key` with strategy `method`.
    Derived { output_key: String, method: String },
}

/// A concrete value ready for submission.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedInput {
    pub key: String,
    pub value: Value,
    pub source: InputSource,
}

/// Resolves input values for one job.
#[derive(Clone, Copy)]
pub struct InputResolver<'a> {
    service: &'a dyn JobService,
    derivations: &'a DerivationRegistry,
}

impl fmt::Debug for InputResolver<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputResolver")
            .field("derivations", &self.derivations.methods())
            .finish_non_exhaustive()
    }
}

impl<'a> InputResolver<'a> {
    pub fn new(service: &'a dyn JobService, derivations: &'a DerivationRegistry) -> Self {
        Self { service, derivations }
    }

    /// Resolve `key` for job `job_id` running in domain `domain_id`.
    ///
    /// When `bundle` holds `key`, no protocol or output lookup takes place.
    pub async fn resolve(
        &self,
        job_id: &str,
        domain_id: &str,
        key: &str,
        bundle: Option<&InputBundle>,
    ) -> Result<ResolvedInput, OrchestratorError> {
        if let Some(value) = bundle.and_then(|bundle| bundle.get(key)) {
            debug!(%job_id, %key, "input resolved from bundle");
            return Ok(ResolvedInput {
                key: key.to_string(),
                value: value.clone(),
                source: InputSource::Bundle,
            });
        }

        self.derive(job_id, domain_id, key).await
    }

    async fn derive(&self, job_id: &str, domain_id: &str, key: &str) -> Result<ResolvedInput, OrchestratorError> {
        let protocol = self
            .service
            .fetch_protocol()
            .await
            .map_err(OrchestratorError::ProtocolFetch)?;

        let definition = protocol
            .domain(domain_id)
            .and_then(|domain| domain.input(key))
            .ok_or_else(|| OrchestratorError::UnknownInputKey {
                domain_id: domain_id.to_string(),
                key: key.to_string(),
            })?;

        let output_key = definition
            .source_output_key
            .as_deref()
            .ok_or_else(|| OrchestratorError::NotDerivable {
                key: key.to_string(),
                missing: "source output key",
            })?;
        let method = definition
            .derivation_method
            .as_deref()
            .ok_or_else(|| OrchestratorError::NotDerivable {
                key: key.to_string(),
                missing: "derivation method",
            })?;
        let strategy = self
            .derivations
            .get(method)
            .ok_or_else(|| OrchestratorError::UnsupportedDerivation {
                key: key.to_string(),
                method: method.to_string(),
            })?;

        let output = self
            .service
            .fetch_output(job_id, output_key)
            .await
            .map_err(|source| OrchestratorError::OutputFetch {
                key: key.to_string(),
                output_key: output_key.to_string(),
                source,
            })?;

        let value = strategy
            .derive(output.data)
            .map_err(|source| OrchestratorError::MalformedOutput {
                key: key.to_string(),
                output_key: output_key.to_string(),
                source,
            })?;

        debug!(%job_id, %key, %output_key, %method, "input derived from output");
        Ok(ResolvedInput {
            key: key.to_string(),
            value,
            source: InputSource::Derived {
                output_key: output_key.to_string(),
                method: method.to_string(),
            },
        })
    }
}
