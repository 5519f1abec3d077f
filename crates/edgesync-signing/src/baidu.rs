// # Baidu BCE signing (bce-auth-v1)
//
// https://cloud.baidu.com/doc/Reference/s/Njwvz1wot
//
// The canonical request is
//
//   Method \n CanonicalURI \n CanonicalQueryString \n CanonicalHeaders
//
// with only `host` in the signed header set. The signing key is the hex
// HMAC-SHA256 of the auth prefix under the account secret, and the
// signature is the hex HMAC-SHA256 of the canonical request under that
// hex string.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::query_escape;

pub const DEFAULT_HOST: &str = "cdn.baidubce.com";

const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
const EXPIRATION_PERIOD: &str = "1800";

/// Header values produced by one signing pass. `date` carries the same
/// timestamp the authorization prefix was built from and belongs in
/// `x-bce-date`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub authorization: String,
    pub date: String,
}

pub(crate) fn hmac_sha256_hex(secret: &str, message: &str) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Escapes each path segment, leaving the separating slashes alone.
pub fn canonical_uri(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Sorts pairs by key (values sort within a repeated key) and escapes both
/// sides. An empty query canonicalizes to the empty string.
pub fn canonical_query_string(query: &[(String, String)]) -> String {
    if query.is_empty() {
        return String::new();
    }
    let mut pairs: Vec<(&str, &str)> = query
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    pairs.sort();
    pairs
        .iter()
        .map(|(key, value)| format!("{}={}", query_escape(key), query_escape(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Signs one request at the given instant.
pub fn sign_at(
    access_key_id: &str,
    access_secret: &str,
    method: &str,
    path: &str,
    query: &[(String, String)],
    host: &str,
    timestamp: DateTime<Utc>,
) -> Signature {
    let date = timestamp.format(DATE_FORMAT).to_string();
    let prefix = format!("bce-auth-v1/{access_key_id}/{date}/{EXPIRATION_PERIOD}");

    let host = if host.is_empty() { DEFAULT_HOST } else { host };
    let canonical_headers = format!("host:{host}");
    let canonical_request = format!(
        "{}\n{}\n{}\n{}",
        method,
        canonical_uri(path),
        canonical_query_string(query),
        canonical_headers
    );

    let signing_key = hmac_sha256_hex(access_secret, &prefix);
    let signature = hmac_sha256_hex(&signing_key, &canonical_request);

    Signature {
        authorization: format!("{prefix}/host/{signature}"),
        date,
    }
}

/// Wall-clock wrapper for [`sign_at`].
pub fn sign(
    access_key_id: &str,
    access_secret: &str,
    method: &str,
    path: &str,
    query: &[(String, String)],
    host: &str,
) -> Signature {
    sign_at(
        access_key_id,
        access_secret,
        method,
        path,
        query,
        host,
        Utc::now(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn canonical_uri_escapes_segments_not_separators() {
        assert_eq!(canonical_uri("/v2/domain/example.com"), "/v2/domain/example.com");
        assert_eq!(canonical_uri("/v2/a b"), "/v2/a%20b");
        assert_eq!(canonical_uri(""), "");
    }

    #[test]
    fn canonical_query_string_sorts_keys_and_values() {
        let query = vec![
            ("b".to_string(), "2".to_string()),
            ("a".to_string(), "z".to_string()),
            ("a".to_string(), "m".to_string()),
        ];
        assert_eq!(canonical_query_string(&query), "a=m&a=z&b=2");
        assert_eq!(canonical_query_string(&[]), "");
    }

    #[test]
    fn canonicalization_round_trips_on_canonical_strings() {
        fn decode(text: &str) -> String {
            urlencoding::decode(&text.replace('+', " "))
                .unwrap()
                .into_owned()
        }

        let query = vec![
            ("name".to_string(), "test value".to_string()),
            ("key".to_string(), "abc+def".to_string()),
            ("tag".to_string(), "测试".to_string()),
        ];
        let canonical = canonical_query_string(&query);
        assert_eq!(canonical, "key=abc%2Bdef&name=test+value&tag=%E6%B5%8B%E8%AF%95");

        // Parsing the canonical form back into pairs and re-encoding yields
        // the identical string.
        let reparsed: Vec<(String, String)> = canonical
            .split('&')
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap();
                (decode(key), decode(value))
            })
            .collect();
        assert_eq!(canonical_query_string(&reparsed), canonical);
    }

    #[test]
    fn get_without_query_matches_fixed_vector() {
        let sig = sign_at(
            "ak",
            "sk",
            "GET",
            "/v2/domain/example.com/config",
            &[],
            "cdn.baidubce.com",
            ts(1704067200),
        );
        assert_eq!(
            sig.authorization,
            "bce-auth-v1/ak/2024-01-01T00:00:00Z/1800/host/\
             add5cfb814b4c2b5d8802aca5f99622b019ddc25a6d4c64323de189dba7a5a0d"
        );
        assert_eq!(sig.date, "2024-01-01T00:00:00Z");
    }

    #[test]
    fn put_matches_fixed_vector() {
        let sig = sign_at(
            "test-access-key",
            "test-secret-key",
            "PUT",
            "/v2/domain/drcdn.example.com",
            &[],
            "cdn.baidubce.com",
            ts(1717245045),
        );
        assert_eq!(
            sig.authorization,
            "bce-auth-v1/test-access-key/2024-06-01T12:30:45Z/1800/host/\
             628287e674f8ab878ac57435615f7bb4bae278e6a88c6cff68f493bd7e6c020c"
        );
    }

    #[test]
    fn empty_valued_query_parameter_is_signed() {
        // The origin-config PUT sends `?origin` on the wire; the canonical
        // form still carries `origin=`.
        let query = vec![("origin".to_string(), String::new())];
        let sig = sign_at(
            "ak",
            "sk",
            "PUT",
            "/v2/domain/example.com/config",
            &query,
            "cdn.baidubce.com",
            ts(1704067200),
        );
        assert_eq!(
            sig.authorization,
            "bce-auth-v1/ak/2024-01-01T00:00:00Z/1800/host/\
             05d20ac1131afe42aac30e7596bf75cabf20d93e74153e65a1aa4743206acbdc"
        );
    }

    #[test]
    fn empty_host_falls_back_to_the_cdn_endpoint() {
        let with_default = sign_at("ak", "sk", "GET", "/v2/x", &[], "", ts(1704067200));
        let explicit = sign_at(
            "ak",
            "sk",
            "GET",
            "/v2/x",
            &[],
            DEFAULT_HOST,
            ts(1704067200),
        );
        assert_eq!(with_default, explicit);
    }

    #[test]
    fn nested_hmac_uses_the_hex_key_as_ascii() {
        // The outer HMAC is keyed by the hex string itself, not the raw
        // digest bytes it encodes.
        let inner = hmac_sha256_hex("secret", "prefix");
        assert_eq!(inner.len(), 64);
        assert!(inner.bytes().all(|b| b.is_ascii_hexdigit()));
    }
}
