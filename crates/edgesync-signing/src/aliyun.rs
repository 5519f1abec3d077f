// # Aliyun RPC signing
//
// Implements the legacy RPC signature scheme shared by the Aliyun CDN,
// DCDN, ESA and DNS APIs. The string to sign is
//
//   HTTPMethod & specialEncode("/") & specialEncode(sortedQueryString)
//
// where the query string is first encoded with the usual query rules and
// then run through a second, stricter pass. The signature is the base64 of
// an HMAC over that string, keyed with the account secret plus a trailing
// `&`.

use std::collections::BTreeMap;

use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::Sha1;
use sha2::Sha256;

use crate::query_escape;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Renders `params` as a sorted query string, escaping keys and values.
/// This is the wire form adapters put in the request URL, and the inner
/// encoding layer of the string to sign.
pub fn encode_params(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", query_escape(key), query_escape(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// The second encoding pass applied to already query-encoded text. `%7E`
/// comes back as `~`, the separators `% * / & =` are percent-encoded once
/// more, and `+` (the query form of a space) becomes `%20`.
fn special_encode(encoded: &str) -> String {
    let bytes = encoded.as_bytes();
    let mut out = String::with_capacity(encoded.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if bytes[i..].starts_with(b"%7E") => {
                out.push('~');
                i += 3;
                continue;
            }
            b'%' => out.push_str("%25"),
            b'*' => out.push_str("%2A"),
            b'/' => out.push_str("%2F"),
            b'&' => out.push_str("%26"),
            b'=' => out.push_str("%3D"),
            b'+' => out.push_str("%20"),
            ch => out.push(ch as char),
        }
        i += 1;
    }
    out
}

fn string_to_sign(http_method: &str, params: &BTreeMap<String, String>) -> String {
    format!(
        "{}&{}&{}",
        http_method,
        special_encode("/"),
        special_encode(&encode_params(params))
    )
}

/// Signs the canonical string with `sign_method` (`HMAC-SHA1`, `HMAC-SHA256`
/// or `HMAC-MD5`; anything else falls back to SHA1) and the secret plus a
/// trailing `&` as the key.
pub fn hmac_sign(
    sign_method: &str,
    http_method: &str,
    secret: &str,
    params: &BTreeMap<String, String>,
) -> Vec<u8> {
    let key = format!("{secret}&");
    let data = string_to_sign(http_method, params);
    match sign_method {
        "HMAC-SHA256" => {
            let mut mac = Hmac::<Sha256>::new_from_slice(key.as_bytes())
                .expect("HMAC can take key of any size");
            mac.update(data.as_bytes());
            mac.finalize().into_bytes().to_vec()
        }
        "HMAC-MD5" => {
            let mut mac = Hmac::<Md5>::new_from_slice(key.as_bytes())
                .expect("HMAC can take key of any size");
            mac.update(data.as_bytes());
            mac.finalize().into_bytes().to_vec()
        }
        _ => {
            let mut mac = Hmac::<Sha1>::new_from_slice(key.as_bytes())
                .expect("HMAC can take key of any size");
            mac.update(data.as_bytes());
            mac.finalize().into_bytes().to_vec()
        }
    }
}

/// Base64 form of [`hmac_sign`], the value the API expects in `Signature`.
pub fn hmac_sign_b64(
    sign_method: &str,
    http_method: &str,
    secret: &str,
    params: &BTreeMap<String, String>,
) -> String {
    general_purpose::STANDARD.encode(hmac_sign(sign_method, http_method, secret, params))
}

/// Stamps `params` with the public signature parameters and computes
/// `Signature` last, from a caller-supplied timestamp and nonce. `Version`
/// is owned by the caller because it differs per API.
pub fn sign_params_at(
    access_key_id: &str,
    access_secret: &str,
    params: &mut BTreeMap<String, String>,
    http_method: &str,
    timestamp: DateTime<Utc>,
    nonce: &str,
) {
    params.insert("SignatureMethod".to_string(), "HMAC-SHA1".to_string());
    params.insert("SignatureNonce".to_string(), nonce.to_string());
    params.insert("AccessKeyId".to_string(), access_key_id.to_string());
    params.insert("SignatureVersion".to_string(), "1.0".to_string());
    params.insert(
        "Timestamp".to_string(),
        timestamp.format(TIMESTAMP_FORMAT).to_string(),
    );
    params.insert("Format".to_string(), "JSON".to_string());
    let signature = hmac_sign_b64("HMAC-SHA1", http_method, access_secret, params);
    params.insert("Signature".to_string(), signature);
}

/// Wall-clock wrapper for [`sign_params_at`] with a nanosecond nonce.
pub fn sign_params(
    access_key_id: &str,
    access_secret: &str,
    params: &mut BTreeMap<String, String>,
    http_method: &str,
) {
    let now = Utc::now();
    let nonce = now.timestamp_nanos_opt().unwrap_or_default().to_string();
    sign_params_at(access_key_id, access_secret, params, http_method, now, &nonce);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn special_encode_rules() {
        assert_eq!(special_encode("/"), "%2F");
        assert_eq!(special_encode("a=b&c=d"), "a%3Db%26c%3Dd");
        assert_eq!(special_encode("a+b"), "a%20b");
        assert_eq!(special_encode("%7E"), "~");
        assert_eq!(special_encode("%2F"), "%252F");
        assert_eq!(special_encode("x*y"), "x%2Ay");
    }

    #[test]
    fn describe_request_matches_fixed_vector() {
        let mut p = params(&[
            ("Action", "DescribeDomainRecords"),
            ("DomainName", "example.com"),
            ("Version", "2015-01-09"),
            ("SignatureMethod", "HMAC-SHA1"),
            ("SignatureNonce", "1704067200000000000"),
            ("AccessKeyId", "testid"),
            ("SignatureVersion", "1.0"),
            ("Timestamp", "2024-01-01T00:00:00Z"),
            ("Format", "JSON"),
        ]);

        assert_eq!(
            string_to_sign("GET", &p),
            "GET&%2F&AccessKeyId%3Dtestid%26Action%3DDescribeDomainRecords\
             %26DomainName%3Dexample.com%26Format%3DJSON%26SignatureMethod\
             %3DHMAC-SHA1%26SignatureNonce%3D1704067200000000000%26Signature\
             Version%3D1.0%26Timestamp%3D2024-01-01T00%253A00%253A00Z%26\
             Version%3D2015-01-09"
        );
        assert_eq!(
            hmac_sign_b64("HMAC-SHA1", "GET", "testsecret", &p),
            "SQiAMre92eWrY7PaffclYJELGBQ="
        );

        p.remove("SignatureNonce");
        p.remove("Timestamp");
        let ts = DateTime::from_timestamp(1704067200, 0).unwrap();
        sign_params_at("testid", "testsecret", &mut p, "GET", ts, "1704067200000000000");
        assert_eq!(p["Signature"], "SQiAMre92eWrY7PaffclYJELGBQ=");
        assert_eq!(p["Timestamp"], "2024-01-01T00:00:00Z");
    }

    #[test]
    fn payload_with_json_and_specials_matches_fixed_vector() {
        let mut p = params(&[
            ("Action", "AddCdnDomain"),
            (
                "Sources",
                r#"[{"content":"1.2.3.4","type":"ipaddr","priority":"20","port":80,"weight":"10"}]"#,
            ),
            ("Note", "hello world~/x"),
        ]);
        let ts = DateTime::from_timestamp(1717245045, 0).unwrap();
        sign_params_at("ak", "sk", &mut p, "GET", ts, "42");

        assert_eq!(p["Timestamp"], "2024-06-01T12:30:45Z");
        assert_eq!(p["Signature"], "+g5YHLU7JwNREZmG6L1fFXr+36U=");

        let without_signature: BTreeMap<String, String> = p
            .iter()
            .filter(|(k, _)| k.as_str() != "Signature")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let sts = string_to_sign("GET", &without_signature);
        assert!(sts.contains("Note%3Dhello%20world~%252Fx"));
    }

    #[test]
    fn digest_lengths_follow_the_method() {
        let p = params(&[("Action", "DescribeCdnService"), ("Format", "JSON")]);
        assert_eq!(hmac_sign("HMAC-SHA1", "GET", "test-secret", &p).len(), 20);
        assert_eq!(hmac_sign("HMAC-SHA256", "GET", "test-secret", &p).len(), 32);
        assert_eq!(hmac_sign("HMAC-MD5", "GET", "test-secret", &p).len(), 16);
        // Unknown methods fall back to SHA1.
        assert_eq!(hmac_sign("UNKNOWN", "GET", "test-secret", &p).len(), 20);
    }

    #[test]
    fn secret_and_params_change_the_signature() {
        let p1 = params(&[("Action", "Action1")]);
        let p2 = params(&[("Action", "Action2")]);
        assert_ne!(
            hmac_sign("HMAC-SHA1", "GET", "secret1", &p1),
            hmac_sign("HMAC-SHA1", "GET", "secret2", &p1)
        );
        assert_ne!(
            hmac_sign("HMAC-SHA1", "GET", "secret", &p1),
            hmac_sign("HMAC-SHA1", "GET", "secret", &p2)
        );
        assert_ne!(
            hmac_sign("HMAC-SHA1", "GET", "secret", &p1),
            hmac_sign("HMAC-SHA1", "POST", "secret", &p1)
        );
        assert_eq!(
            hmac_sign("HMAC-SHA1", "GET", "secret", &p1),
            hmac_sign("HMAC-SHA1", "GET", "secret", &p1)
        );
    }

    #[test]
    fn encode_params_sorts_and_escapes() {
        let p = params(&[("b", "2"), ("a", "1"), ("q", "hello world/x")]);
        assert_eq!(encode_params(&p), "a=1&b=2&q=hello+world%2Fx");
    }
}
