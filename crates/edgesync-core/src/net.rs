//! Shared HTTP response handling for provider adapters
//!
//! Every provider call funnels its response through here so they all agree
//! on three things: bodies are capped at [`MAX_RESPONSE_BODY_BYTES`], any
//! status of 300 or above is a remote API error carrying the body text, and
//! an empty body skips JSON parsing entirely (several provider endpoints
//! answer 200 with nothing).

use crate::error::Error;

/// Upper bound on how much of a response body is read (~1 MB)
pub const MAX_RESPONSE_BODY_BYTES: usize = 1_024_000;

/// Read a response body, truncating at [`MAX_RESPONSE_BODY_BYTES`]
pub async fn read_body_capped(mut response: reqwest::Response) -> Result<Vec<u8>, Error> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let remaining = MAX_RESPONSE_BODY_BYTES - body.len();
        if chunk.len() >= remaining {
            body.extend_from_slice(&chunk[..remaining]);
            break;
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Drain a provider response into JSON
///
/// Returns `Value::Null` for empty bodies. Parse failures are reported as
/// remote API errors under `provider`, never as raw serde errors, so the
/// offending provider is always identifiable in logs.
pub async fn read_json_response(
    response: reqwest::Response,
    provider: &str,
) -> Result<serde_json::Value, Error> {
    let status = response.status();
    let body = read_body_capped(response).await?;

    if status.as_u16() >= 300 {
        return Err(Error::remote_api(
            provider,
            format!(
                "HTTP {}: {}",
                status.as_u16(),
                String::from_utf8_lossy(&body).trim()
            ),
        ));
    }

    if body.is_empty() {
        return Ok(serde_json::Value::Null);
    }

    serde_json::from_slice(&body)
        .map_err(|err| Error::remote_api(provider, format!("invalid JSON in response: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cap_is_roughly_one_megabyte() {
        assert_eq!(MAX_RESPONSE_BODY_BYTES, 1_024_000);
    }
}
