//! Input bundle generation.
//!
//! The bundler is an external HTTP endpoint that synthesizes a flat set of
//! input values from a caller-supplied configuration. A bundle is requested
//! once per run with a single POST; there are no retries and no caching.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use autopilot_types::{BundlerConfig, InputBundle};
use autopilot_util::http::{JsonParseError, decode_response_json};
use reqwest::{Client, StatusCode, header};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

const BUNDLER_TIMEOUT: Duration = Duration::from_secs(30);

/// Failure while generating an input bundle.
#[derive(Debug, Error)]
pub enum BundleError {
    /// The configuration could not be serialized to JSON.
    #[error("failed to encode bundler config: {0}")]
    ConfigEncoding(#[source] serde_json::Error),
    /// The request never produced a response, including malformed endpoint urls.
    #[error("bundler request failed: {0}")]
    Transport(#[source] reqwest::Error),
    /// The bundler answered with anything other than 200.
    #[error("data generation failed (HTTP {status})")]
    GenerationFailed { status: u16 },
    /// The bundler answered 200 with a body that is not a JSON object.
    #[error("failed to decode bundler response: {0}")]
    ResponseDecode(#[source] JsonParseError),
}

/// POST `config` to `endpoint` and decode the response into an [`InputBundle`].
///
/// The bundle keys are exactly the keys of the returned JSON object.
pub async fn generate_bundle<C>(http: &Client, endpoint: &str, config: &C) -> Result<InputBundle, BundleError>
where
    C: Serialize + ?Sized,
{
    let body = serde_json::to_vec(config).map_err(BundleError::ConfigEncoding)?;
    let start = Instant::now();
    debug!(%endpoint, body_len = body.len(), "requesting input bundle");

    let response = http
        .post(endpoint)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body)
        .send()
        .await
        .map_err(|error| {
            warn!(%endpoint, error = %error, "bundler request failed");
            BundleError::Transport(error)
        })?;

    let status = response.status();
    if status != StatusCode::OK {
        warn!(
            %endpoint,
            status = %status,
            duration_ms = start.elapsed().as_millis(),
            "bundler rejected the request"
        );
        return Err(BundleError::GenerationFailed { status: status.as_u16() });
    }

    let text = response.text().await.map_err(BundleError::Transport)?;
    // A `null` body carries no inputs.
    let bundle = decode_response_json::<Option<InputBundle>>(&text, Some(status))
        .map_err(BundleError::ResponseDecode)?
        .unwrap_or_default();

    let keys: Vec<&str> = bundle.keys().map(String::as_str).collect();
    info!(?keys, duration_ms = start.elapsed().as_millis(), "generated input bundle");
    Ok(bundle)
}

/// Anything that can turn a [`BundlerConfig`] into an [`InputBundle`].
#[async_trait]
pub trait BundleSource: Send + Sync {
    async fn generate(&self, config: &BundlerConfig) -> Result<InputBundle, BundleError>;
}

/// [`BundleSource`] backed by an HTTP bundler endpoint.
#[derive(Debug, Clone)]
pub struct HttpBundler {
    http: Client,
    endpoint: String,
}

impl HttpBundler {
    /// Create a bundler client for `endpoint` with a 30 second request timeout.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, BundleError> {
        let http = Client::builder()
            .timeout(BUNDLER_TIMEOUT)
            .build()
            .map_err(BundleError::Transport)?;
        Ok(Self::with_client(http, endpoint))
    }

    pub fn with_client(http: Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl BundleSource for HttpBundler {
    async fn generate(&self, config: &BundlerConfig) -> Result<InputBundle, BundleError> {
        generate_bundle(&self.http, &self.endpoint, config).await
    }
}
