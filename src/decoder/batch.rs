//! Step 3: the signed batch-execute call that returns the destination URL.
//!
//! The request mirrors the aggregator front-end's own `garturlreq` RPC: a
//! JSON array, itself JSON-encoded as a string, wrapped in the batch
//! envelope and sent form-encoded as `f.req`. The response starts with an
//! anti-XSSI prefix; the payload is the chunk after the first blank line.

use super::protocol::DecoderProtocol;
use crate::error::DecodeError;
use crate::http::HttpClient;
use crate::models::DecodingParams;
use crate::rate_limiter::RateLimiter;
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

/// Build the `f.req=...` form body.
///
/// `locale` is the `"<REGION>:<lang>"` marker the front-end sends, e.g.
/// `"US:en"`.
pub fn build_request_body(
    protocol: &DecoderProtocol,
    params: &DecodingParams,
    locale: &str,
) -> Result<String, DecodeError> {
    if params.timestamp.is_empty() || !params.timestamp.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DecodeError::DecodeRequestFailed(format!(
            "timestamp {:?} is not numeric",
            params.timestamp
        )));
    }

    let quote = |s: &str| Value::String(s.to_string()).to_string();
    let inner = format!(
        r#"["garturlreq",[["X","X",["X","X"],null,null,1,1,{locale},null,1,null,null,null,null,null,0,1],"X","X",1,[1,1,1],1,1,null,0,0,null,0],{token},{timestamp},{signature}]"#,
        locale = quote(locale),
        token = quote(&params.token),
        timestamp = params.timestamp,
        signature = quote(&params.signature),
    );
    let envelope = json!([[[protocol.rpc_id, inner]]]).to_string();
    Ok(format!("f.req={}", urlencoding::encode(&envelope)))
}

/// Dig the destination URL out of a batch-execute response body.
///
/// # Returns
/// The URL at `[0][2] -> [1]` of the payload rows, after dropping the
/// protocol's trailer rows; only absolute http(s) URLs are accepted.
pub fn parse_response(protocol: &DecoderProtocol, body: &str) -> Result<String, DecodeError> {
    let fail = |what: &str| DecodeError::DecodeRequestFailed(what.to_string());

    let chunk = body
        .split("\n\n")
        .nth(1)
        .ok_or_else(|| fail("response has no payload after the prefix"))?;
    let outer: Value = serde_json::from_str(chunk.trim())
        .map_err(|e| fail(&format!("payload is not JSON: {e}")))?;
    let rows = outer
        .as_array()
        .ok_or_else(|| fail("payload is not an array"))?;
    let kept = rows
        .len()
        .checked_sub(protocol.response_trailer_len)
        .filter(|n| *n > 0)
        .ok_or_else(|| fail("payload has no rows before the trailer"))?;
    let encoded = rows[..kept][0]
        .get(2)
        .and_then(Value::as_str)
        .ok_or_else(|| fail("row has no encoded result at index 2"))?;
    let decoded: Value = serde_json::from_str(encoded)
        .map_err(|e| fail(&format!("encoded result is not JSON: {e}")))?;
    let destination = decoded
        .get(1)
        .and_then(Value::as_str)
        .ok_or_else(|| fail("result has no URL at index 1"))?;

    match Url::parse(destination) {
        Ok(u) if u.scheme() == "http" || u.scheme() == "https" => Ok(destination.to_string()),
        _ => Err(fail(&format!("{destination:?} is not an absolute http(s) URL"))),
    }
}

/// Send the signed request and return the destination URL.
///
/// # Arguments
/// * `http` - Transport for the POST.
/// * `limiter` - The aggregator limiter; acquired once, after the body is
///   built, so a malformed timestamp costs no request slot.
/// * `protocol` - Endpoint, RPC id and response trailer length.
/// * `params` - Signature, timestamp and token from [`super::params::fetch_params`].
/// * `locale` - `"<REGION>:<lang>"`, e.g. `"US:en"`.
///
/// # Returns
/// An absolute http(s) publisher URL.
///
/// # Errors
/// [`DecodeError::DecodeRequestFailed`] for a bad timestamp, a transport or
/// status failure, or a response that does not contain a URL.
pub async fn decode_call(
    http: &dyn HttpClient,
    limiter: &RateLimiter,
    protocol: &DecoderProtocol,
    params: &DecodingParams,
    locale: &str,
) -> Result<String, DecodeError> {
    let body = build_request_body(protocol, params, locale)?;
    limiter.acquire().await;
    let resp = http
        .post_form(&protocol.batch_endpoint, body)
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| DecodeError::DecodeRequestFailed(e.to_string()))?;
    debug!(bytes = resp.body.len(), "batch response received");
    parse_response(protocol, &resp.body)
}
