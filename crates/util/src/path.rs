use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Bytes left as-is in a path segment: RFC 3986 unreserved characters.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// Resolves a path template such as `/jobs/{job_id}/outputs/{key}`.
///
/// Each `{name}` placeholder listed in `segments` is replaced by its
/// percent-encoded value, so a value can never introduce extra path segments.
/// Placeholders without a value stay unchanged.
///
/// # Examples
/// ```rust
/// use autopilot_util::build_path;
///
/// assert_eq!(build_path("/jobs/{job_id}/inputs", &[("job_id", "job-1")]), "/jobs/job-1/inputs");
/// ```
pub fn build_path(template: &str, segments: &[(&str, &str)]) -> String {
    segments.iter().fold(template.to_string(), |path, (name, value)| {
        let placeholder = format!("{{{name}}}");
        path.replace(&placeholder, &utf8_percent_encode(value, PATH_SEGMENT).to_string())
    })
}
