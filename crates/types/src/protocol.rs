//! Protocol schema: the per-domain catalogue of inputs and derivation rules.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Protocol document as served by the schema store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Protocol {
    #[serde(default)]
    pub domains: IndexMap<String, Domain>,
}

impl Protocol {
    pub fn domain(&self, domain_id: &str) -> Option<&Domain> {
        self.domains.get(domain_id)
    }

    pub fn contains_domain(&self, domain_id: &str) -> bool {
        self.domains.contains_key(domain_id)
    }
}

/// A named category of automation with its declared inputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    #[serde(default)]
    pub inputs: IndexMap<String, InputDefinition>,
}

impl Domain {
    /// Whether `key` is a declared input of this domain.
    pub fn declares_input(&self, key: &str) -> bool {
        self.inputs.contains_key(key)
    }

    pub fn input(&self, key: &str) -> Option<&InputDefinition> {
        self.inputs.get(key)
    }
}

/// Declares how an input may be derived from an earlier job output.
///
/// Both fields are optional on the wire: inputs that can only be supplied by
/// the caller carry neither.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_output_key: Option<String>,
    /// Name of the derivation strategy, for example `Consent` or `SelectOne`.
    #[serde(default, rename = "inputMethod", alias = "derivationMethod", skip_serializing_if = "Option::is_none")]
    pub derivation_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl InputDefinition {
    /// Definition derived from `source_output_key` with `method`.
    pub fn derived(source_output_key: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            source_output_key: Some(source_output_key.into()),
            derivation_method: Some(method.into()),
            description: None,
        }
    }
}
