//! Derivation strategies turning a job output into an input value.
//!
//! Protocol input definitions name their strategy (for example `Consent`).
//! The [`DerivationRegistry`] maps those names onto [`Derivation`]
//! implementations, so new methods are added by registering a strategy
//! rather than by changing the resolver.

use std::{collections::HashMap, fmt::Debug, sync::Arc};

use serde_json::Value;
use thiserror::Error;

/// Method name of the pass-through strategy.
pub const CONSENT: &str = "Consent";
/// Method name of the first-of-sequence strategy.
pub const SELECT_ONE: &str = "SelectOne";

/// Reason an output could not be turned into an input value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeriveError {
    #[error("expected an array, found {found}")]
    NotASequence { found: &'static str },
    #[error("expected a non-empty array")]
    EmptySequence,
    /// Free-form rejection for strategies registered by callers.
    #[error("{0}")]
    Rejected(String),
}

/// A named rule computing an input value from an output value.
pub trait Derivation: Send + Sync + Debug {
    fn derive(&self, output: Value) -> Result<Value, DeriveError>;
}

/// Submits the output value unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Consent;

impl Derivation for Consent {
    fn derive(&self, output: Value) -> Result<Value, DeriveError> {
        Ok(output)
    }
}

/// Submits the first element of an array output.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectOne;

impl Derivation for SelectOne {
    fn derive(&self, output: Value) -> Result<Value, DeriveError> {
        match output {
            Value::Array(items) => items.into_iter().next().ok_or(DeriveError::EmptySequence),
            other => Err(DeriveError::NotASequence {
                found: json_type_name(&other),
            }),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Lookup table from method name to strategy.
///
/// `Default` registers [`CONSENT`] and [`SELECT_ONE`].
#[derive(Debug, Clone)]
pub struct DerivationRegistry {
    strategies: HashMap<String, Arc<dyn Derivation>>,
}

impl DerivationRegistry {
    /// A registry with no strategies at all.
    pub fn empty() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// Add or replace the strategy for `method`, returning the previous one.
    pub fn register(&mut self, method: impl Into<String>, strategy: Arc<dyn Derivation>) -> Option<Arc<dyn Derivation>> {
        self.strategies.insert(method.into(), strategy)
    }

    pub fn get(&self, method: &str) -> Option<&Arc<dyn Derivation>> {
        self.strategies.get(method)
    }

    pub fn contains(&self, method: &str) -> bool {
        self.strategies.contains_key(method)
    }

    /// Registered method names in sorted order.
    pub fn methods(&self) -> Vec<&str> {
        let mut methods: Vec<&str> = self.strategies.keys().map(String::as_str).collect();
        methods.sort_unstable();
        methods
    }
}

impl Default for DerivationRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(CONSENT, Arc::new(Consent));
        registry.register(SELECT_ONE, Arc::new(SelectOne));
        registry
    }
}
