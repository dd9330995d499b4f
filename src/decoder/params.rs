//! Step 2: fetch the signature and timestamp the decode call is signed with.
//!
//! The aggregator's article page embeds them as data attributes on one
//! element. Each template in [`DecoderProtocol::param_templates`] is tried
//! in order; a network error, a non-2xx status or a page without the element
//! all move on to the next template.

use super::protocol::DecoderProtocol;
use crate::error::DecodeError;
use crate::http::HttpClient;
use crate::models::DecodingParams;
use crate::rate_limiter::RateLimiter;
use scraper::{Html, Selector};
use tracing::{debug, warn};

/// Read the signing attributes from an article page.
///
/// Returns `None` when the element or either attribute is missing.
pub fn parse_params(protocol: &DecoderProtocol, html: &str, token: &str) -> Option<DecodingParams> {
    let selector = Selector::parse(&protocol.params_selector).ok()?;
    let document = Html::parse_document(html);
    let element = document.select(&selector).next()?;
    let signature = element.value().attr(&protocol.signature_attr)?;
    let timestamp = element.value().attr(&protocol.timestamp_attr)?;
    Some(DecodingParams {
        signature: signature.to_string(),
        timestamp: timestamp.to_string(),
        token: token.to_string(),
    })
}

/// Fetch the signing parameters for `token`.
///
/// # Arguments
/// * `http` - Transport for the article page requests.
/// * `limiter` - The aggregator limiter; acquired before every request.
/// * `protocol` - Supplies the page templates, tried in order.
/// * `token` - The opaque article token from [`super::token::extract_token`].
///
/// # Returns
/// The first template's parameters that parse.
///
/// # Errors
/// [`DecodeError::DecodingParamsUnavailable`] naming the last template's
/// failure once every template has been tried.
pub async fn fetch_params(
    http: &dyn HttpClient,
    limiter: &RateLimiter,
    protocol: &DecoderProtocol,
    token: &str,
) -> Result<DecodingParams, DecodeError> {
    let mut last_cause = String::from("no parameter templates configured");

    for url in protocol.param_urls(token) {
        limiter.acquire().await;
        let resp = match http.get(&url).await.and_then(|r| r.error_for_status()) {
            Ok(resp) => resp,
            Err(e) => {
                warn!(%url, error = %e, "decoding params fetch failed");
                last_cause = format!("{url}: {e}");
                continue;
            }
        };

        match parse_params(protocol, &resp.body, token) {
            Some(params) => {
                debug!(%url, "decoding params found");
                return Ok(params);
            }
            None => {
                warn!(%url, selector = %protocol.params_selector, "page lacks decoding params");
                last_cause = format!("{url}: no {} element", protocol.params_selector);
            }
        }
    }

    Err(DecodeError::DecodingParamsUnavailable(last_cause))
}
