// # Baidu Cloud CDN Adapter
//
// Converges accelerated domains on Baidu's CDN and its dynamic-route
// product DRCDN, both served by https://cdn.baidubce.com. Calls are JSON
// over GET/PUT with the `bce-auth-v1` Authorization header from
// `edgesync_signing::baidu`.
//
// ## Provider key
//
// - `baiducloud` — CDN section, variants `cdn` / `drcdn` (anything else
//   is treated as plain CDN)
//
// Origins travel as `peer` URLs (`scheme://address:port`, IPv6 addresses
// bracketed); a source with protocol `auto` expands into one http and one
// https peer. Baidu reports failures as a `code`/`message` pair in the
// body, sometimes on a 2xx status, so every response is checked for one.

use std::time::Duration;

use async_trait::async_trait;
use edgesync_core::net::read_json_response;
use edgesync_core::{
    AdapterRegistry, AddressFamily, CdnAdapter, CdnAdapterFactory, CdnService, CdnVariant,
    Convergence, Error, Priority, Protocol, ResolvedValues,
};
use edgesync_signing::baidu::{self, DEFAULT_HOST};
use serde::{Deserialize, Serialize};

const PROVIDER: &str = "baiducloud";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One origin peer
///
/// `weight` is omitted when the source leaves it unset or zero; Baidu
/// then applies its own default.
#[derive(Debug, Serialize)]
struct OriginPeer {
    peer: String,
    backup: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    weight: Option<u32>,
}

/// `PUT /v2/domain/{domain}` payload
#[derive(Debug, Serialize)]
struct CreateBody {
    origin: Vec<OriginPeer>,
    form: &'static str,
    #[serde(rename = "productType", skip_serializing_if = "Option::is_none")]
    product_type: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dsa: Option<DsaConfig>,
}

#[derive(Debug, Serialize)]
struct DsaConfig {
    enabled: bool,
}

/// `PUT /v2/domain/{domain}/config?origin` payload
#[derive(Debug, Serialize)]
struct ModifyBody {
    origin: Vec<OriginPeer>,
}

#[derive(Debug, Deserialize)]
struct DomainConfig {
    #[serde(default)]
    cname: String,
}

/// Adapter for the `baiducloud` provider key
pub struct BaiduCdn {
    client: reqwest::Client,
}

impl BaiduCdn {
    pub fn new() -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }

    /// Signed BCE call; body errors are surfaced even on 2xx statuses
    async fn request(
        &self,
        service: &CdnService,
        method: reqwest::Method,
        path: &str,
        query: &[(String, String)],
        body: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, Error> {
        let signature = baidu::sign(
            &service.access_key,
            &service.access_secret,
            method.as_str(),
            path,
            query,
            DEFAULT_HOST,
        );

        let url = format!("https://{}{}{}", DEFAULT_HOST, path, query_suffix(query));
        let mut request = self
            .client
            .request(method, &url)
            .header("Content-Type", "application/json")
            .header("Authorization", &signature.authorization)
            .header("x-bce-date", &signature.date);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let body = read_json_response(response, PROVIDER).await?;
        check_api_error(&body)?;
        Ok(body)
    }

    /// Reads the domain configuration; Baidu has no dedicated existence
    /// check, so an absent domain surfaces as a not-found failure
    async fn describe_domain(&self, service: &CdnService) -> Result<Option<DomainConfig>, Error> {
        let path = format!("/v2/domain/{}/config", service.domain);
        match self
            .request(service, reqwest::Method::GET, &path, &[], None)
            .await
        {
            Ok(body) => Ok(Some(parse(body)?)),
            Err(err) if is_absent_error(&err) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Creates the domain, then reads it back for the assigned alias
    async fn create_domain(
        &self,
        service: &CdnService,
        origin: Vec<OriginPeer>,
    ) -> Result<Option<String>, Error> {
        tracing::info!(
            "Baidu {} domain {} is absent, creating it",
            service.variant.as_str(),
            service.domain
        );

        let body = create_body(service.variant, origin);
        let path = format!("/v2/domain/{}", service.domain);
        self.request(
            service,
            reqwest::Method::PUT,
            &path,
            &[],
            Some(serde_json::to_value(&body)?),
        )
        .await?;

        match self.describe_domain(service).await {
            Ok(Some(config)) => Ok(non_empty(&config.cname)),
            Ok(None) => Ok(None),
            Err(err) => {
                tracing::warn!(
                    "Created Baidu domain {} but could not read back its alias: {}",
                    service.domain,
                    err
                );
                Ok(None)
            }
        }
    }

    async fn modify_origin(
        &self,
        service: &CdnService,
        origin: Vec<OriginPeer>,
    ) -> Result<(), Error> {
        tracing::info!(
            "Baidu {} domain {} exists, updating origin configuration",
            service.variant.as_str(),
            service.domain
        );

        let body = ModifyBody { origin };
        let path = format!("/v2/domain/{}/config", service.domain);
        let query = [("origin".to_string(), String::new())];
        self.request(
            service,
            reqwest::Method::PUT,
            &path,
            &query,
            Some(serde_json::to_value(&body)?),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl CdnAdapter for BaiduCdn {
    fn validate(&self, service: &CdnService) -> Result<(), Error> {
        if service.access_key.is_empty() || service.access_secret.is_empty() {
            return Err(Error::validation(format!(
                "Baidu service '{}' is missing credentials",
                service.label()
            )));
        }
        if service.domain.is_empty() {
            return Err(Error::validation("Baidu service has no domain"));
        }
        if service.sources.is_empty() {
            return Err(Error::validation(format!(
                "Baidu service '{}' has no origin sources",
                service.label()
            )));
        }
        Ok(())
    }

    async fn converge(
        &self,
        service: &CdnService,
        resolved: &ResolvedValues,
    ) -> Result<Convergence, Error> {
        let existing = self.describe_domain(service).await?;
        let origin = origin_peers(service, resolved);

        match existing {
            None => {
                let alias = self.create_domain(service, origin).await?;
                Ok(Convergence::created(alias))
            }
            Some(config) => {
                self.modify_origin(service, origin).await?;
                Ok(Convergence::modified(non_empty(&config.cname)))
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Expands the configured sources into `peer` entries
///
/// `auto` yields an http peer on the plain port and an https peer on the
/// https port. The other protocols yield one peer on the configured port,
/// defaulting to 443 for https and 80 otherwise.
fn origin_peers(service: &CdnService, resolved: &ResolvedValues) -> Vec<OriginPeer> {
    let mut peers = Vec::new();
    for source in &service.sources {
        let address = resolved.value_or_configured(&source.target);
        let backup = source.priority == Priority::Backup;
        let weight = source.weight.filter(|w| *w > 0);

        match source.protocol {
            Protocol::Auto => {
                peers.push(OriginPeer {
                    peer: peer_url("http", address, source.http_port()),
                    backup,
                    weight,
                });
                peers.push(OriginPeer {
                    peer: peer_url("https", address, source.https_port()),
                    backup,
                    weight,
                });
            }
            Protocol::Https => peers.push(OriginPeer {
                peer: peer_url("https", address, source.port.unwrap_or(443)),
                backup,
                weight,
            }),
            Protocol::Http => peers.push(OriginPeer {
                peer: peer_url("http", address, source.http_port()),
                backup,
                weight,
            }),
        }
    }
    peers
}

/// `scheme://address:port` with IPv6 addresses bracketed
fn peer_url(scheme: &str, address: &str, port: u16) -> String {
    if AddressFamily::V6.matches(address) {
        format!("{}://[{}]:{}", scheme, address, port)
    } else {
        format!("{}://{}:{}", scheme, address, port)
    }
}

/// Create payload; DRCDN asks for the dynamic form plus its product flags
fn create_body(variant: CdnVariant, origin: Vec<OriginPeer>) -> CreateBody {
    let drcdn = variant == CdnVariant::Drcdn;
    CreateBody {
        origin,
        form: if drcdn { "dynamic" } else { "default" },
        product_type: drcdn.then_some(1),
        dsa: drcdn.then(|| DsaConfig { enabled: true }),
    }
}

/// Wire form of the query, keeping bare keys for empty values
/// (`?origin`, not `?origin=`)
fn query_suffix(query: &[(String, String)]) -> String {
    if query.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = query
        .iter()
        .map(|(key, value)| {
            if value.is_empty() {
                key.clone()
            } else {
                format!("{}={}", key, value)
            }
        })
        .collect();
    format!("?{}", parts.join("&"))
}

fn check_api_error(body: &serde_json::Value) -> Result<(), Error> {
    let code = body.get("code").and_then(|c| c.as_str()).unwrap_or("");
    if code.is_empty() {
        return Ok(());
    }
    let message = body.get("message").and_then(|m| m.as_str()).unwrap_or("");
    if is_auth_failure(code) {
        tracing::error!("Baidu API rejected the request [code={}]: {}", code, message);
    } else {
        tracing::warn!("Baidu API call failed [code={}]: {}", code, message);
    }
    Err(Error::remote_api(PROVIDER, format!("{}: {}", code, message)))
}

/// Codes that point at bad credentials rather than a bad request
fn is_auth_failure(code: &str) -> bool {
    [
        "AccessDenied",
        "InvalidAccessKeyId",
        "SignatureDoesNotMatch",
        "Forbidden",
        "Unauthorized",
    ]
    .iter()
    .any(|marker| code.contains(marker))
}

fn is_absent_error(err: &Error) -> bool {
    let text = err.to_string();
    text.contains("404") || text.contains("not found")
}

fn non_empty(text: &str) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn parse<T: serde::de::DeserializeOwned>(body: serde_json::Value) -> Result<T, Error> {
    serde_json::from_value(body)
        .map_err(|err| Error::remote_api(PROVIDER, format!("unexpected response shape: {err}")))
}

/// Factory for [`BaiduCdn`] adapters
pub struct BaiduCdnFactory;

impl CdnAdapterFactory for BaiduCdnFactory {
    fn create(&self) -> Result<Box<dyn CdnAdapter>, Error> {
        Ok(Box::new(BaiduCdn::new()?))
    }
}

/// Register the Baidu adapter with a registry
///
/// # Example
///
/// ```rust
/// use edgesync_core::AdapterRegistry;
///
/// let registry = AdapterRegistry::new();
/// edgesync_provider_baidu::register(&registry);
/// assert!(registry.has_cdn("baiducloud"));
/// ```
pub fn register(registry: &AdapterRegistry) {
    registry.register_cdn("baiducloud", Box::new(BaiduCdnFactory));
}
