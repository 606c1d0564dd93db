//! Response helpers shared by every HTTP caller in the workspace.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Longest body preview kept in errors and log lines.
pub const PREVIEW_LIMIT: usize = 200;

/// Hint shown instead of a raw body for statuses caused by credentials.
///
/// # Example
/// ```rust
/// use autopilot_util::http::status_error_message;
///
/// assert!(status_error_message(401).unwrap().contains("AUTOMATION_API_KEY"));
/// assert!(status_error_message(404).is_none());
/// ```
pub fn status_error_message(status_code: u16) -> Option<String> {
    match status_code {
        401 => Some("Unauthorized (401). Hint: set AUTOMATION_API_KEY=...".into()),
        403 => Some("Forbidden (403). Hint: check that the API key may access this service".into()),
        _ => None,
    }
}

/// Decode a response body, keeping the status and a body preview on failure.
///
/// Malformed payloads are reported instead of degrading to `null`.
pub fn decode_response_json<T: DeserializeOwned>(text: &str, status: Option<StatusCode>) -> Result<T, JsonParseError> {
    serde_json::from_str(text).map_err(|source| JsonParseError {
        status,
        source,
        body_preview: truncate_response_preview(text, PREVIEW_LIMIT),
    })
}

/// Single-line preview of `text` holding at most `limit` characters.
///
/// Runs of whitespace collapse into one space and an ellipsis marks a cut.
pub fn truncate_response_preview(text: &str, limit: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return "<empty>".to_string();
    }
    match collapsed.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &collapsed[..cut]),
        None => collapsed,
    }
}

/// A response body that did not decode into the expected shape.
#[derive(Debug, Error)]
#[error("failed to parse JSON response ({}): {source}. body preview: {body_preview}", status_note(.status))]
pub struct JsonParseError {
    status: Option<StatusCode>,
    #[source]
    source: serde_json::Error,
    body_preview: String,
}

fn status_note(status: &Option<StatusCode>) -> String {
    match status {
        Some(code) => format!("status {code}"),
        None => "unknown status".to_string(),
    }
}

impl JsonParseError {
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn body_preview(&self) -> &str {
        &self.body_preview
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn decode_failure_reports_status_and_preview() {
        let error = decode_response_json::<Value>("{\n\"a\":", Some(StatusCode::OK)).expect_err("truncated json");
        let message = error.to_string();
        assert!(message.contains("status 200 OK"), "message: {message}");
        assert_eq!(error.body_preview(), "{ \"a\":");
        assert_eq!(error.status(), Some(StatusCode::OK));
    }

    #[test]
    fn decode_failure_without_status() {
        let error = decode_response_json::<Vec<u32>>("{}", None).expect_err("object is not a list");
        assert!(error.to_string().contains("unknown status"));
    }

    #[test]
    fn preview_marks_empty_bodies() {
        assert_eq!(truncate_response_preview("  \n", 10), "<empty>");
    }

    #[test]
    fn preview_cuts_on_character_boundaries() {
        assert_eq!(truncate_response_preview(&"x".repeat(50), 10), format!("{}...", "x".repeat(10)));
        assert_eq!(truncate_response_preview("ééééé", 3), "ééé...");
        assert_eq!(truncate_response_preview("short", 10), "short");
    }

    #[test]
    fn typed_decode_succeeds_for_matching_shapes() {
        let parsed: Vec<u32> = decode_response_json("[1,2,3]", None).expect("decode array");
        assert_eq!(parsed, vec![1, 2, 3]);
    }
}
