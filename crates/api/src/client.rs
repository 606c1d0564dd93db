use std::env;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use autopilot_types::{InputCreationRequest, InputReceipt, Job, JobCreationRequest, JobOutput, Protocol};
use autopilot_util::http::{PREVIEW_LIMIT, decode_response_json, status_error_message, truncate_response_preview};
use autopilot_util::{build_path, redact_sensitive};
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url, header};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::{ApiError, JobService};

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "AUTOMATION_API_KEY";
/// Environment variable overriding the service base url.
pub const API_BASE_ENV: &str = "AUTOMATION_API_BASE";
/// Environment variable overriding the protocol schema url.
pub const PROTOCOL_URL_ENV: &str = "AUTOMATION_PROTOCOL_URL";

pub const DEFAULT_API_BASE: &str = "https://api.automationcloud.net";
pub const DEFAULT_PROTOCOL_URL: &str = "https://protocol.automationcloud.net/schema.json";

/// Hostnames allowed for local development regardless of scheme.
const LOCALHOST_DOMAINS: &[&str] = &["localhost", "127.0.0.1"];

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for [`AutomationClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub protocol_url: String,
    pub timeout: Duration,
}

impl ClientConfig {
    /// Settings for `base_url` with the default protocol url and timeout.
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            protocol_url: DEFAULT_PROTOCOL_URL.to_string(),
            timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn with_protocol_url(mut self, protocol_url: impl Into<String>) -> Self {
        self.protocol_url = protocol_url.into();
        self
    }

    /// Resolve settings from the process environment.
    ///
    /// `AUTOMATION_API_KEY` is required. `AUTOMATION_API_BASE` and
    /// `AUTOMATION_PROTOCOL_URL` fall back to the public endpoints.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Resolve settings through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup(API_KEY_ENV)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| anyhow!("{API_KEY_ENV} is not set"))?;
        let base_url = lookup(API_BASE_ENV).unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let protocol_url = lookup(PROTOCOL_URL_ENV).unwrap_or_else(|| DEFAULT_PROTOCOL_URL.to_string());

        Ok(Self::new(api_key, base_url).with_protocol_url(protocol_url))
    }
}

/// Thin wrapper around a configured `reqwest::Client` for the automation service.
///
/// Requests are built against a validated base url and authenticated with the
/// API key as the basic-auth user name.
#[derive(Debug, Clone)]
pub struct AutomationClient {
    base_url: String,
    protocol_url: String,
    api_key: String,
    http: Client,
    user_agent: String,
}

impl AutomationClient {
    /// Build a client from explicit settings.
    ///
    /// Both urls are validated: `localhost` and `127.0.0.1` may use any scheme,
    /// every other host must use https.
    pub fn new(config: ClientConfig) -> Result<Self> {
        validate_base_url(&config.base_url)?;
        validate_base_url(&config.protocol_url)?;

        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(default_headers)
            .timeout(config.timeout)
            .build()
            .context("build http client")?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            protocol_url: config.protocol_url,
            api_key: config.api_key,
            http,
            user_agent: format!("autopilot/{}; {}", env!("CARGO_PKG_VERSION"), env::consts::OS),
        })
    }

    /// Build a client from `AUTOMATION_*` environment variables.
    pub fn new_from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a `reqwest::RequestBuilder` for a method and API-relative path.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "building request");
        self.authorized(self.http.request(method, url))
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header(header::USER_AGENT, &self.user_agent)
            .basic_auth(&self.api_key, None::<&str>)
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder, operation: &'static str) -> Result<T, ApiError> {
        let (status, text) = self.send(builder, operation).await?;
        decode_response_json(&text, Some(status)).map_err(|error| {
            warn!(operation, error = %error, "response did not match the expected shape");
            ApiError::from(error)
        })
    }

    async fn send(&self, builder: RequestBuilder, operation: &'static str) -> Result<(StatusCode, String), ApiError> {
        let start = Instant::now();
        let response = builder.send().await.map_err(|error| {
            warn!(operation, error = %error, duration_ms = start.elapsed().as_millis(), "request failed");
            ApiError::Transport(error)
        })?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let preview = redact_sensitive(&truncate_response_preview(&body, PREVIEW_LIMIT));
            warn!(
                operation,
                status = %status,
                body = %preview,
                duration_ms = start.elapsed().as_millis(),
                "request rejected"
            );
            let message = status_error_message(status.as_u16()).unwrap_or(preview);
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        debug!(operation, status = %status, duration_ms = start.elapsed().as_millis(), "request completed");
        Ok((status, body))
    }
}

fn job_path(template: &str, job_id: &str, key: Option<&str>) -> String {
    match key {
        Some(key) => build_path(template, &[("job_id", job_id), ("key", key)]),
        None => build_path(template, &[("job_id", job_id)]),
    }
}

#[async_trait]
impl JobService for AutomationClient {
    async fn fetch_protocol(&self) -> Result<Protocol, ApiError> {
        debug!(url = %self.protocol_url, "fetching protocol");
        let builder = self.http.get(&self.protocol_url).header(header::USER_AGENT, &self.user_agent);
        self.send_json(builder, "fetch_protocol").await
    }

    async fn create_job(&self, request: &JobCreationRequest) -> Result<Job, ApiError> {
        debug!(
            service_id = %request.service_id,
            input_count = request.input.len(),
            has_callback = !request.callback_url.is_empty(),
            "creating job"
        );
        let builder = self.request(Method::POST, "/jobs").json(request);
        self.send_json(builder, "create_job").await
    }

    async fn fetch_job(&self, job_id: &str) -> Result<Job, ApiError> {
        let builder = self.request(Method::GET, &job_path("/jobs/{job_id}", job_id, None));
        self.send_json(builder, "fetch_job").await
    }

    async fn fetch_output(&self, job_id: &str, key: &str) -> Result<JobOutput, ApiError> {
        let builder = self.request(Method::GET, &job_path("/jobs/{job_id}/outputs/{key}", job_id, Some(key)));
        self.send_json(builder, "fetch_output").await
    }

    async fn submit_input(&self, job_id: &str, request: &InputCreationRequest) -> Result<InputReceipt, ApiError> {
        let builder = self
            .request(Method::POST, &job_path("/jobs/{job_id}/inputs", job_id, None))
            .json(request);
        self.send_json(builder, "submit_input").await
    }

    async fn cancel_job(&self, job_id: &str) -> Result<(), ApiError> {
        let builder = self.request(Method::POST, &job_path("/jobs/{job_id}/cancel", job_id, None));
        self.send(builder, "cancel_job").await.map(|_| ())
    }
}

/// Validate that a base URL is acceptable for use by the client.
///
/// Rules:
/// - `localhost` or `127.0.0.1`: any scheme is allowed
/// - otherwise: scheme must be HTTPS
pub fn validate_base_url(base: &str) -> Result<()> {
    let parsed_base_url = Url::parse(base).map_err(|e| anyhow!("Invalid base URL '{}': {}", base, e))?;

    let host_name = parsed_base_url
        .host_str()
        .ok_or_else(|| anyhow!("base URL '{}' must include a host", base))?;

    if LOCALHOST_DOMAINS
        .iter()
        .any(|&allowed| host_name.eq_ignore_ascii_case(allowed))
    {
        return Ok(());
    }

    if parsed_base_url.scheme() != "https" {
        return Err(anyhow!(
            "base URL must use https for non-localhost hosts; got '{}://'",
            parsed_base_url.scheme()
        ));
    }

    Ok(())
}
