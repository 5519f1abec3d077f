//! Configuration types for the EdgeSync system
//!
//! This module defines all configuration structures used throughout the
//! crate. The engine reads these as a snapshot each cycle and may write back
//! exactly one field: a learned CDN alias (`cname`).

use crate::source::SourceTarget;
use serde::{Deserialize, Serialize};

/// Main EdgeSync configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// CDN reconciliation section
    #[serde(default)]
    pub cdn: Section<CdnService>,

    /// DNS reconciliation section
    #[serde(default)]
    pub dns: Section<DnsService>,

    /// Webhook notification settings
    #[serde(default)]
    pub webhook: WebhookConfig,
}

impl Config {
    /// Validate the configuration structurally
    ///
    /// Provider-specific validation (credentials, variant support) is owned
    /// by the adapters and repeated every cycle; this catches config-file
    /// mistakes early at daemon startup.
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.cdn.enabled {
            for service in &self.cdn.services {
                service.validate()?;
            }
        }
        if self.dns.enabled {
            for service in &self.dns.services {
                service.validate()?;
            }
        }
        Ok(())
    }
}

/// A feature section: an enabled switch plus the services it manages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Section<T> {
    /// Whether this section is reconciled at all
    #[serde(default)]
    pub enabled: bool,

    /// Configured services, in reconciliation order
    #[serde(default)]
    pub services: Vec<T>,
}

impl<T> Default for Section<T> {
    fn default() -> Self {
        Self {
            enabled: false,
            services: Vec::new(),
        }
    }
}

/// One CDN service to keep converged with its observed sources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdnService {
    /// Stable identifier (logs and events)
    #[serde(default)]
    pub id: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Accelerated domain
    pub domain: String,

    /// Provider key: "aliyun", "baiducloud" or "tencent"
    pub provider: String,

    /// Product variant within the provider
    #[serde(default)]
    pub variant: CdnVariant,

    /// Provider access key id
    pub access_key: String,

    /// Provider access key secret
    pub access_secret: String,

    /// Provider-assigned alias, learned from describe calls and written
    /// back to the configuration when it changes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cname: Option<String>,

    /// Ordered origin sources
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
}

impl CdnService {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.domain.is_empty() {
            return Err(crate::Error::validation("CDN service domain is empty"));
        }
        if self.provider.is_empty() {
            return Err(crate::Error::validation(format!(
                "CDN service '{}' has no provider key",
                self.domain
            )));
        }
        for source in &self.sources {
            source.target.validate()?;
        }
        Ok(())
    }

    /// Name used in logs and webhook payloads
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.domain
        } else {
            &self.name
        }
    }
}

/// CDN product variant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CdnVariant {
    /// Classic CDN (all providers)
    #[default]
    Cdn,
    /// Aliyun DCDN
    Dcdn,
    /// Aliyun ESA (site-scoped records)
    Esa,
    /// Baidu dynamic-route CDN
    Drcdn,
    /// Tencent EdgeOne (zone-scoped acceleration domains)
    Edgeone,
}

impl CdnVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            CdnVariant::Cdn => "cdn",
            CdnVariant::Dcdn => "dcdn",
            CdnVariant::Esa => "esa",
            CdnVariant::Drcdn => "drcdn",
            CdnVariant::Edgeone => "edgeone",
        }
    }
}

/// One origin source of a CDN service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSpec {
    /// What to resolve for this origin
    #[serde(flatten)]
    pub target: SourceTarget,

    /// Origin pull protocol
    #[serde(default)]
    pub protocol: Protocol,

    /// Origin HTTP port (provider default 80 when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Origin HTTPS port (provider default 443 when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub https_port: Option<u16>,

    /// Main or backup origin
    #[serde(default)]
    pub priority: Priority,

    /// Origin weight (provider default 10 when unset or zero)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
}

impl SourceSpec {
    pub fn new(target: SourceTarget) -> Self {
        Self {
            target,
            protocol: Protocol::default(),
            port: None,
            https_port: None,
            priority: Priority::default(),
            weight: None,
        }
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = Some(weight);
        self
    }

    /// HTTP origin port, defaulted
    pub fn http_port(&self) -> u16 {
        self.port.unwrap_or(80)
    }

    /// HTTPS origin port, defaulted
    pub fn https_port(&self) -> u16 {
        self.https_port.unwrap_or(443)
    }

    /// Weight with the provider default applied (zero counts as unset)
    pub fn effective_weight(&self) -> u32 {
        match self.weight {
            Some(w) if w > 0 => w,
            _ => 10,
        }
    }
}

/// Origin pull protocol
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Pull over HTTP only
    #[default]
    Http,
    /// Pull over HTTPS only
    Https,
    /// Follow the client protocol
    Auto,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
            Protocol::Auto => "auto",
        }
    }
}

/// Origin priority tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Main,
    Backup,
}

/// One DNS record to keep converged with its observed target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsService {
    /// Stable identifier (logs and events)
    #[serde(default)]
    pub id: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Fully qualified record domain (wildcards allowed)
    pub domain: String,

    /// Provider key: "alidns"
    pub provider: String,

    /// Provider access key id
    pub access_key: String,

    /// Provider access key secret
    pub access_secret: String,

    /// DNS record type
    pub record_type: RecordType,

    /// TTL text: seconds, `s`/`m`/`h` suffixed, or `AUTO`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,

    /// Where the record value comes from
    #[serde(flatten)]
    pub target: SourceTarget,
}

impl DnsService {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.domain.is_empty() {
            return Err(crate::Error::validation("DNS service domain is empty"));
        }
        if self.provider.is_empty() {
            return Err(crate::Error::validation(format!(
                "DNS service '{}' has no provider key",
                self.domain
            )));
        }
        self.target.validate()
    }

    /// Name used in logs and webhook payloads
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.domain
        } else {
            &self.name
        }
    }

    /// TTL in seconds; non-positive values mean "leave to the provider"
    pub fn ttl_seconds(&self) -> i64 {
        crate::domain::parse_ttl(self.ttl.as_deref().unwrap_or(""))
    }
}

/// DNS record type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    A,
    #[serde(rename = "AAAA")]
    Aaaa,
    #[serde(rename = "CNAME")]
    Cname,
    #[serde(rename = "TXT")]
    Txt,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Txt => "TXT",
        }
    }
}

/// Webhook notification settings
///
/// `url`, `headers` and `body` may carry the placeholders `#{serviceType}`,
/// `#{serviceName}` and `#{serviceStatus}`, substituted at dispatch time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Whether notifications are dispatched at all
    #[serde(default)]
    pub enabled: bool,

    /// Target URL; empty disables dispatch
    #[serde(default)]
    pub url: String,

    /// Newline-separated `Key: Value` pairs
    #[serde(default)]
    pub headers: String,

    /// Request body; empty means GET, non-empty means POST
    #[serde(default)]
    pub body: String,
}
