//! Domain-name helpers shared by DNS and site-scoped CDN adapters

/// Root (registrable) portion of a domain
///
/// Strips a wildcard prefix, then keeps the last two labels. Domains with
/// two or fewer labels are returned unchanged.
pub fn root_domain(domain: &str) -> String {
    let domain = domain.strip_prefix("*.").unwrap_or(domain);
    let parts: Vec<&str> = domain.split('.').collect();
    if parts.len() <= 2 {
        return domain.to_string();
    }
    format!("{}.{}", parts[parts.len() - 2], parts[parts.len() - 1])
}

/// Host record (RR) portion of a domain
///
/// Wildcards collapse to `*`, bare root domains to `@`, everything else to
/// the labels preceding the root domain.
pub fn host_record(domain: &str) -> String {
    if domain.starts_with("*.") {
        return "*".to_string();
    }
    let parts: Vec<&str> = domain.split('.').collect();
    if parts.len() <= 2 {
        return "@".to_string();
    }
    parts[..parts.len() - 2].join(".")
}

/// Parse a configured TTL string into seconds
///
/// Empty and `AUTO` mean the provider default (600). Plain integers pass
/// through, `s`/`m`/`h` suffixes convert, anything else falls back to 600.
pub fn parse_ttl(text: &str) -> i64 {
    if text.is_empty() || text == "AUTO" {
        return 600;
    }
    if let Ok(ttl) = text.parse::<i64>() {
        return ttl;
    }
    let lower = text.to_lowercase();
    if let Some(num) = lower.strip_suffix('s') {
        if let Ok(ttl) = num.parse::<i64>() {
            return ttl;
        }
    } else if let Some(num) = lower.strip_suffix('m') {
        if let Ok(ttl) = num.parse::<i64>() {
            return ttl * 60;
        }
    } else if let Some(num) = lower.strip_suffix('h') {
        if let Ok(ttl) = num.parse::<i64>() {
            return ttl * 3600;
        }
    }
    600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_domain_keeps_last_two_labels() {
        assert_eq!(root_domain("a.b.example.com"), "example.com");
        assert_eq!(root_domain("www.example.com"), "example.com");
        assert_eq!(root_domain("example.com"), "example.com");
        assert_eq!(root_domain("localhost"), "localhost");
        assert_eq!(root_domain("*.example.com"), "example.com");
    }

    #[test]
    fn host_record_extracts_rr() {
        assert_eq!(host_record("*.example.com"), "*");
        assert_eq!(host_record("*.deep.example.com"), "*");
        assert_eq!(host_record("example.com"), "@");
        assert_eq!(host_record("www.example.com"), "www");
        assert_eq!(host_record("a.b.example.com"), "a.b");
    }

    #[test]
    fn ttl_parsing() {
        assert_eq!(parse_ttl(""), 600);
        assert_eq!(parse_ttl("AUTO"), 600);
        assert_eq!(parse_ttl("auto"), 600);
        assert_eq!(parse_ttl("120"), 120);
        assert_eq!(parse_ttl("-1"), -1);
        assert_eq!(parse_ttl("30s"), 30);
        assert_eq!(parse_ttl("10M"), 600);
        assert_eq!(parse_ttl("1h"), 3600);
        assert_eq!(parse_ttl("soon"), 600);
        assert_eq!(parse_ttl("junk"), 600);
    }
}
