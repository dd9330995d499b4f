//! Step 1: pull the opaque token out of an obfuscated link.

use super::protocol::DecoderProtocol;
use crate::error::DecodeError;
use url::Url;

/// Returns the last path segment when the link has the aggregator's shape:
/// the expected host, at least two path segments, and a known route name as
/// the second-to-last one.
pub fn extract_token(protocol: &DecoderProtocol, obfuscated_url: &str) -> Result<String, DecodeError> {
    let url = Url::parse(obfuscated_url)
        .map_err(|e| DecodeError::InvalidUrlFormat(format!("{obfuscated_url}: {e}")))?;

    if url.host_str() != Some(protocol.host.as_str()) {
        return Err(DecodeError::InvalidUrlFormat(format!(
            "host {:?} is not {}",
            url.host_str().unwrap_or_default(),
            protocol.host
        )));
    }

    let segments: Vec<&str> = url.path_segments().map(|s| s.collect()).unwrap_or_default();
    if segments.len() < 2 {
        return Err(DecodeError::InvalidUrlFormat(format!(
            "path {:?} has fewer than two segments",
            url.path()
        )));
    }

    let route = segments[segments.len() - 2];
    if !protocol.routes.iter().any(|r| r == route) {
        return Err(DecodeError::InvalidUrlFormat(format!(
            "route {route:?} is not one of {:?}",
            protocol.routes
        )));
    }

    match segments[segments.len() - 1] {
        "" => Err(DecodeError::InvalidUrlFormat("empty token".into())),
        token => Ok(token.to_string()),
    }
}
