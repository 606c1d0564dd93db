//! Run configuration consumed by the orchestrator.
//!
//! A [`RunConfig`] is authored as JSON or YAML with camelCase keys. The
//! legacy keys `jibConfig` and `howMany` are accepted as aliases for
//! `bundlerConfig` and `replicaCount`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value};

/// Flat mapping from input key to value, produced once per run by the bundler.
pub type InputBundle = IndexMap<String, Value>;

/// Configuration forwarded to the input bundler.
///
/// The bundler owns the vocabulary of this document, so every key is kept in
/// the open `settings` map and forwarded verbatim. Unknown keys survive a
/// deserialize/serialize cycle unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BundlerConfig {
    /// Bundler settings keyed by name.
    #[serde(flatten)]
    pub settings: JsonMap<String, Value>,
}

impl BundlerConfig {
    /// Creates an empty bundler configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the configuration with `key` set to `value`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// Looks up a single setting.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }
}

/// Instruction describing how a job should be created and fed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    /// Automation service the job runs against.
    pub service_id: String,
    /// Protocol domain used to look up declared inputs and derivation rules.
    pub domain_id: String,
    /// Configuration passed to the bundler to synthesize initial inputs.
    #[serde(alias = "jibConfig")]
    pub bundler_config: BundlerConfig,
    /// Webhook url; the domain id is appended as a query parameter when set.
    #[serde(default)]
    pub callback_url: String,
    /// When true, every declared domain input found in the bundle is sent at creation time.
    #[serde(default)]
    pub oversupply_inputs: bool,
    /// Number of identical jobs to create. Values below one are treated as one.
    #[serde(default = "default_replica_count", alias = "howMany")]
    pub replica_count: i64,
}

fn default_replica_count() -> i64 {
    1
}

impl RunConfig {
    /// Creates a configuration with defaults for every optional field.
    pub fn new(service_id: impl Into<String>, domain_id: impl Into<String>, bundler_config: BundlerConfig) -> Self {
        Self {
            service_id: service_id.into(),
            domain_id: domain_id.into(),
            bundler_config,
            callback_url: String::new(),
            oversupply_inputs: false,
            replica_count: default_replica_count(),
        }
    }

    /// Replica count with the floor of one applied.
    pub fn effective_replica_count(&self) -> u32 {
        u32::try_from(self.replica_count.max(1)).unwrap_or(u32::MAX)
    }

    /// Callback url sent to the service for this run.
    pub fn job_callback_url(&self) -> String {
        make_callback_url(&self.callback_url, &self.domain_id)
    }
}

/// Appends `?domainId=<domain_id>` to a non-empty callback url.
///
/// An empty url stays empty so the service does not receive a bare query string.
pub fn make_callback_url(url: &str, domain_id: &str) -> String {
    if url.is_empty() {
        return String::new();
    }
    format!("{url}?domainId={domain_id}")
}
