use crate::error::{CoreError, Result};

/// Turn a candidate into an openable URL.
///
/// Absolute http(s) URLs are returned as-is. Paths are appended to the base URL
/// without its trailing slash; query strings and fragments get a `/` in between.
pub fn resolve_candidate(candidate: &str, base_url: Option<&str>) -> Result<String> {
    let candidate = candidate.trim();

    if candidate.starts_with("http://") || candidate.starts_with("https://") {
        return Ok(candidate.to_string());
    }

    if !(candidate.starts_with('/') || candidate.starts_with('?') || candidate.starts_with('#')) {
        return Err(CoreError::UnsupportedCandidate(candidate.to_string()));
    }

    let base = base_url
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .ok_or(CoreError::MissingBaseUrl)?;
    let base = base.strip_suffix('/').unwrap_or(base);

    if candidate.starts_with('/') {
        Ok(format!("{}{}", base, candidate))
    } else {
        Ok(format!("{}/{}", base, candidate))
    }
}
