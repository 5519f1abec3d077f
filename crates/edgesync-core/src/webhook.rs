//! Webhook notification delivery
//!
//! Templates in the webhook configuration (URL, headers, body) may carry
//! three placeholders — `#{serviceType}`, `#{serviceName}` and
//! `#{serviceStatus}` — substituted textually before dispatch. An empty
//! body sends a GET; a non-empty body sends a POST whose content type is
//! sniffed from the body's first character unless the configured headers
//! override it.

use crate::config::WebhookConfig;
use crate::traits::{Notifier, ServiceKind, ServiceStatus};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Substitute the three status placeholders in a template string
///
/// Unknown or partial placeholders are left untouched.
pub fn substitute(
    template: &str,
    kind: ServiceKind,
    service_name: &str,
    status: ServiceStatus,
) -> String {
    template
        .replace("#{serviceType}", kind.as_str())
        .replace("#{serviceName}", service_name)
        .replace("#{serviceStatus}", status.as_str())
}

/// Parse newline-separated `Key: Value` pairs
///
/// Lines split on `\r\n` when present, else `\n`. A line must contain
/// exactly one colon or it is dropped; key and value are trimmed and may be
/// empty after trimming.
pub fn parse_headers(text: &str) -> Vec<(String, String)> {
    let sep = if text.contains("\r\n") { "\r\n" } else { "\n" };
    let mut headers = Vec::new();
    for line in text.split(sep) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        if value.contains(':') {
            continue;
        }
        headers.push((key.trim().to_string(), value.trim().to_string()));
    }
    headers
}

/// Whether a body should be sent as JSON
///
/// True when the first character (untrimmed) is `{` or `[`.
pub fn is_json_body(body: &str) -> bool {
    matches!(body.as_bytes().first(), Some(b'{') | Some(b'['))
}

/// HTTP webhook notifier
pub struct WebhookNotifier {
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new() -> Result<Self, crate::Error> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(
        &self,
        webhook: &WebhookConfig,
        kind: ServiceKind,
        service_name: &str,
        status: ServiceStatus,
    ) -> Result<bool, crate::Error> {
        if webhook.url.is_empty() {
            return Ok(false);
        }

        let url = substitute(&webhook.url, kind, service_name, status);
        let body = substitute(&webhook.body, kind, service_name, status);
        let header_text = substitute(&webhook.headers, kind, service_name, status);

        let mut headers = HeaderMap::new();
        if !body.is_empty() {
            let content_type = if is_json_body(&body) {
                "application/json"
            } else {
                "application/x-www-form-urlencoded"
            };
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        // Configured headers win over the sniffed content type.
        for (key, value) in parse_headers(&header_text) {
            let name = match HeaderName::from_bytes(key.as_bytes()) {
                Ok(name) => name,
                Err(_) => {
                    tracing::debug!(header = %key, "skipping invalid webhook header name");
                    continue;
                }
            };
            let value = match HeaderValue::from_str(&value) {
                Ok(value) => value,
                Err(_) => {
                    tracing::debug!(header = %key, "skipping invalid webhook header value");
                    continue;
                }
            };
            headers.insert(name, value);
        }

        let request = if body.is_empty() {
            self.client.get(&url)
        } else {
            self.client.post(&url).body(body)
        };

        let response = request.headers(headers).send().await?;
        let ok = response.status().is_success();
        if !ok {
            tracing::warn!(status = %response.status(), "webhook answered with non-success status");
        }
        Ok(ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_substituted_everywhere() {
        let out = substitute(
            "https://hook.test/#{serviceType}/#{serviceName}?s=#{serviceStatus}",
            ServiceKind::Cdn,
            "edge-site",
            ServiceStatus::UpdateSucceeded,
        );
        assert_eq!(out, "https://hook.test/cdn/edge-site?s=update_succeeded");
    }

    #[test]
    fn partial_placeholders_are_left_alone() {
        let out = substitute(
            "#{serviceTyp} #{servicename}",
            ServiceKind::Dns,
            "x",
            ServiceStatus::UpdateFailed,
        );
        assert_eq!(out, "#{serviceTyp} #{servicename}");
    }

    #[test]
    fn headers_parse_key_value_lines() {
        let headers = parse_headers("Content-Type: application/json\nX-Token: abc123");
        assert_eq!(
            headers,
            vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                ("X-Token".to_string(), "abc123".to_string()),
            ]
        );
    }

    #[test]
    fn headers_split_on_crlf_when_present() {
        let headers = parse_headers("A: 1\r\nB: 2");
        assert_eq!(
            headers,
            vec![
                ("A".to_string(), "1".to_string()),
                ("B".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn lines_without_exactly_one_colon_are_dropped() {
        let headers = parse_headers("NoColonHere\nX-Time: 12:30:00\nGood: yes");
        assert_eq!(headers, vec![("Good".to_string(), "yes".to_string())]);
    }

    #[test]
    fn blank_lines_and_padding_are_tolerated() {
        let headers = parse_headers("\n  X-A :  1  \n\n");
        assert_eq!(headers, vec![("X-A".to_string(), "1".to_string())]);
    }

    #[test]
    fn empty_keys_and_values_survive_parsing() {
        let headers = parse_headers(": v\nK:");
        assert_eq!(
            headers,
            vec![
                ("".to_string(), "v".to_string()),
                ("K".to_string(), "".to_string()),
            ]
        );
    }

    #[test]
    fn json_bodies_are_sniffed_untrimmed() {
        assert!(is_json_body(r#"{"a":1}"#));
        assert!(is_json_body("[1,2]"));
        assert!(!is_json_body(" {\"a\":1}"));
        assert!(!is_json_body("a=1&b=2"));
        assert!(!is_json_body(""));
    }
}
