//! Source model
//!
//! A "source" is the resolvable unit shared by CDN origin entries and DNS
//! record targets: a kind tag, a value (static address, URL list, interface
//! name, or shell command) and an optional interface match pattern. The kind
//! decides which resolution strategy applies and whether the value takes
//! part in drift detection at all.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static IPV4_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"((25[0-5]|(2[0-4]|1{0,1}[0-9]){0,1}[0-9])\.){3,3}(25[0-5]|(2[0-4]|1{0,1}[0-9]){0,1}[0-9])")
        .unwrap()
});

static IPV6_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"((([0-9A-Fa-f]{1,4}:){7}([0-9A-Fa-f]{1,4}|:))|(([0-9A-Fa-f]{1,4}:){6}(:[0-9A-Fa-f]{1,4}|((25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)(\.(25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)){3})|:))|(([0-9A-Fa-f]{1,4}:){5}(((:[0-9A-Fa-f]{1,4}){1,2})|:((25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)(\.(25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)){3})|:))|(([0-9A-Fa-f]{1,4}:){4}(((:[0-9A-Fa-f]{1,4}){1,3})|((:[0-9A-Fa-f]{1,4})?:((25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)(\.(25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)){3}))|:))|(([0-9A-Fa-f]{1,4}:){3}(((:[0-9A-Fa-f]{1,4}){1,4})|((:[0-9A-Fa-f]{1,4}){0,2}:((25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)(\.(25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)){3}))|:))|(([0-9A-Fa-f]{1,4}:){2}(((:[0-9A-Fa-f]{1,4}){1,5})|((:[0-9A-Fa-f]{1,4}){0,3}:((25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)(\.(25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)){3}))|:))|(([0-9A-Fa-f]{1,4}:){1}(((:[0-9A-Fa-f]{1,4}){1,6})|((:[0-9A-Fa-f]{1,4}){0,4}:((25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)(\.(25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)){3}))|:))|(:(((:[0-9A-Fa-f]{1,4}){1,7})|((:[0-9A-Fa-f]{1,4}){0,5}:((25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)(\.(25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)){3}))|:)))",
    )
    .unwrap()
});

/// Address family a dynamic source resolves within
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    /// Extract the first address of this family found in arbitrary text
    /// (HTTP response bodies, command output). First match wins.
    pub fn find_in(&self, text: &str) -> Option<String> {
        let re: &Regex = match self {
            AddressFamily::V4 => &IPV4_RE,
            AddressFamily::V6 => &IPV6_RE,
        };
        re.find(text).map(|m| m.as_str().to_string())
    }

    /// Whether the text contains an address of this family anywhere
    pub fn matches(&self, text: &str) -> bool {
        match self {
            AddressFamily::V4 => IPV4_RE.is_match(text),
            AddressFamily::V6 => IPV6_RE.is_match(text),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AddressFamily::V4 => "ipv4",
            AddressFamily::V6 => "ipv6",
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a string looks like a plain IPv4 or IPv6 address
///
/// Used by CDN adapters to decide between address-type and domain-type
/// origin entries for dynamically resolved values.
pub fn looks_like_ip(text: &str) -> bool {
    AddressFamily::V4.matches(text) || AddressFamily::V6.matches(text)
}

/// Source kind tag; the wire names appear verbatim in configuration files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Static IPv4 address
    Ipv4,
    /// Static IPv6 address
    Ipv6,
    /// Static domain name (CNAME-style origin)
    Domain,
    /// IPv4 probed from a URL list
    DynamicIpv4Url,
    /// IPv6 probed from a URL list
    DynamicIpv6Url,
    /// IPv4 read from a local network interface
    DynamicIpv4Interface,
    /// IPv6 read from a local network interface
    DynamicIpv6Interface,
    /// IPv4 extracted from shell command output
    DynamicIpv4Command,
    /// IPv6 extracted from shell command output
    DynamicIpv6Command,
}

impl SourceKind {
    /// Whether this kind is resolved live each cycle (participates in drift)
    pub fn is_dynamic(&self) -> bool {
        !matches!(
            self,
            SourceKind::Ipv4 | SourceKind::Ipv6 | SourceKind::Domain
        )
    }

    /// The address family this kind resolves within, if any
    pub fn family(&self) -> Option<AddressFamily> {
        match self {
            SourceKind::Ipv4
            | SourceKind::DynamicIpv4Url
            | SourceKind::DynamicIpv4Interface
            | SourceKind::DynamicIpv4Command => Some(AddressFamily::V4),
            SourceKind::Ipv6
            | SourceKind::DynamicIpv6Url
            | SourceKind::DynamicIpv6Interface
            | SourceKind::DynamicIpv6Command => Some(AddressFamily::V6),
            SourceKind::Domain => None,
        }
    }

    /// Whether this kind carries a hostname rather than an address
    pub fn is_domain(&self) -> bool {
        matches!(self, SourceKind::Domain)
    }

    /// The configuration wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Ipv4 => "ipv4",
            SourceKind::Ipv6 => "ipv6",
            SourceKind::Domain => "domain",
            SourceKind::DynamicIpv4Url => "dynamic_ipv4_url",
            SourceKind::DynamicIpv6Url => "dynamic_ipv6_url",
            SourceKind::DynamicIpv4Interface => "dynamic_ipv4_interface",
            SourceKind::DynamicIpv6Interface => "dynamic_ipv6_interface",
            SourceKind::DynamicIpv4Command => "dynamic_ipv4_command",
            SourceKind::DynamicIpv6Command => "dynamic_ipv6_command",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolvable source target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTarget {
    /// Source kind
    #[serde(rename = "type")]
    pub kind: SourceKind,
    /// Static value, URL list (comma-separated), interface name, or command
    #[serde(default)]
    pub value: String,
    /// Optional pattern narrowing interface address selection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
}

impl SourceTarget {
    pub fn new(kind: SourceKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            regex: None,
        }
    }

    /// Cache identity of this target
    pub fn key(&self) -> SourceKey {
        SourceKey {
            kind: self.kind,
            value: self.value.clone(),
            pattern: self.regex.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.value.trim().is_empty() {
            return Err(crate::Error::validation(format!(
                "source of type '{}' has an empty value",
                self.kind
            )));
        }
        Ok(())
    }
}

/// Identity of a resolvable source: kind + value + optional match pattern
///
/// Keys both the process-wide cycle cache and the per-service drift caches,
/// so services sharing an identical source also share one probe per cycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceKey {
    pub kind: SourceKind,
    pub value: String,
    pub pattern: Option<String>,
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pattern {
            Some(p) => write!(f, "{}:{}:{}", self.kind, self.value, p),
            None => write!(f, "{}:{}", self.kind, self.value),
        }
    }
}
