// # edgesync-signing
//
// Request signing for the three provider API families EdgeSync talks to:
//
// - `aliyun`: RPC-style signatures, HMAC over a doubly-encoded sorted
//   query string
// - `baidu`: BCE auth v1, nested HMAC-SHA256 over a canonical request
// - `tencent`: TC3-HMAC-SHA256 with date-scoped key derivation
//
// Each scheme has a deterministic entry point taking an explicit timestamp
// (and nonce where the scheme uses one) so signatures can be checked
// against fixed vectors, plus a wall-clock wrapper for production use.
//
// The crate is deliberately free of I/O and async: signers take the request
// pieces as plain values and hand back header values. Adapters own the HTTP
// side.

pub mod aliyun;
pub mod baidu;
pub mod tencent;

/// Percent-encodes `value` the way classic query-string encoding does:
/// alphanumerics and `-_.~` pass through, space becomes `+`, everything
/// else becomes `%XX`. All three provider canonicalizations build on this.
pub fn query_escape(value: &str) -> String {
    urlencoding::encode(value).replace("%20", "+")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_escape_matches_query_component_rules() {
        assert_eq!(query_escape("hello world"), "hello+world");
        assert_eq!(query_escape("a/b&c=d"), "a%2Fb%26c%3Dd");
        assert_eq!(query_escape("safe-_.~chars"), "safe-_.~chars");
        assert_eq!(query_escape("百度"), "%E7%99%BE%E5%BA%A6");
        assert_eq!(query_escape("a+b"), "a%2Bb");
    }
}
