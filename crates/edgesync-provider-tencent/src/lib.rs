// # Tencent Cloud CDN Adapter
//
// Converges accelerated domains on Tencent CDN and EdgeOne, selected by
// the service variant:
//
// - `cdn`     — classic CDN, https://cdn.tencentcloudapi.com/ (API
//   2018-06-06); anything that is not `edgeone` is treated as plain CDN
// - `edgeone` — acceleration domains under an EdgeOne zone,
//   https://teo.tencentcloudapi.com/ (API 2022-09-01)
//
// Every call is a JSON POST against `/` with the action in the
// `X-TC-Action` header and TC3-HMAC-SHA256 headers from
// `edgesync_signing::tencent`. Failures come back as a `Response.Error`
// object in the body, usually on a 200 status.
//
// CDN takes the whole origin list as `address:port` entries (a weight
// suffix is added when more than one source is configured). EdgeOne
// models the domain as a single acceleration domain under the zone of
// the root domain, so only the first configured source is written.

use std::time::Duration;

use async_trait::async_trait;
use edgesync_core::net::read_json_response;
use edgesync_core::{
    AdapterRegistry, CdnAdapter, CdnAdapterFactory, CdnService, CdnVariant, Convergence, Error,
    Priority, Protocol, ResolvedValues, domain,
};
use edgesync_signing::tencent;
use serde::{Deserialize, Serialize};

const PROVIDER: &str = "tencent";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const CDN_HOST: &str = "cdn.tencentcloudapi.com";
const TEO_HOST: &str = "teo.tencentcloudapi.com";

/// Host and signing service for a variant
fn service_scope(variant: CdnVariant) -> (&'static str, &'static str) {
    match variant {
        CdnVariant::Edgeone => (TEO_HOST, "teo"),
        _ => (CDN_HOST, "cdn"),
    }
}

/// `Origin` block for CDN writes
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct OriginBlock {
    origins: Vec<String>,
    origin_type: &'static str,
    server_name: String,
    origin_pull_protocol: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    backup_origins: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct DescribeDomainsResponse {
    #[serde(rename = "TotalNumber", default)]
    total_number: i64,
    #[serde(rename = "Domains", default)]
    domains: Vec<DomainSummary>,
}

#[derive(Debug, Deserialize)]
struct DomainSummary {
    #[serde(rename = "Cname", default)]
    cname: String,
    #[serde(rename = "Status", default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct DescribeZonesResponse {
    #[serde(rename = "TotalCount", default)]
    total_count: i64,
    #[serde(rename = "Zones", default)]
    zones: Vec<ZoneSummary>,
}

#[derive(Debug, Deserialize)]
struct ZoneSummary {
    #[serde(rename = "ZoneId")]
    zone_id: String,
}

#[derive(Debug, Deserialize)]
struct DescribeAccelerationDomainsResponse {
    #[serde(rename = "TotalCount", default)]
    total_count: i64,
    #[serde(rename = "AccelerationDomains", default)]
    domains: Vec<AccelerationDomainSummary>,
}

#[derive(Debug, Deserialize)]
struct AccelerationDomainSummary {
    #[serde(rename = "Cname", default)]
    cname: String,
    #[serde(rename = "DomainStatus", default)]
    status: String,
}

/// Adapter for the `tencent` provider key
pub struct TencentCdn {
    client: reqwest::Client,
}

impl TencentCdn {
    pub fn new() -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }

    /// Signed v3 call; returns the inner `Response` object
    async fn request(
        &self,
        service: &CdnService,
        action: &str,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, Error> {
        let (host, scope) = service_scope(service.variant);
        let payload = payload.to_string();
        tracing::debug!("Tencent {} payload: {}", action, payload);

        let signed = tencent::sign(
            &service.access_key,
            &service.access_secret,
            scope,
            &tencent::Request::json_post(host, &payload),
        );

        let url = format!("https://{}/", host);
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Authorization", &signed.authorization)
            .header("X-TC-Action", action)
            .header("X-TC-Timestamp", &signed.timestamp)
            .header("X-TC-Version", &signed.version)
            .body(payload)
            .send()
            .await?;

        let body = read_json_response(response, PROVIDER).await?;
        check_api_error(&body)?;
        Ok(body
            .get("Response")
            .cloned()
            .unwrap_or(serde_json::Value::Null))
    }

    async fn describe_cdn_domain(
        &self,
        service: &CdnService,
    ) -> Result<Option<DomainSummary>, Error> {
        let payload = serde_json::json!({
            "Filters": [{ "Name": "domain", "Value": [service.domain.as_str()] }]
        });
        let body = self
            .request(service, "DescribeDomainsConfig", payload)
            .await?;
        let response: DescribeDomainsResponse = parse(body)?;
        if response.total_number == 0 {
            return Ok(None);
        }
        let first = response.domains.into_iter().next().ok_or_else(|| {
            Error::remote_api(PROVIDER, "describe returned a count but no domain entries")
        })?;
        Ok(Some(first))
    }

    /// Zone id for the EdgeOne variant; a missing zone fails the
    /// convergence (zones are created in the console, never by this agent)
    async fn edgeone_zone_id(&self, service: &CdnService) -> Result<String, Error> {
        let root = domain::root_domain(&service.domain);
        let payload = serde_json::json!({
            "Filters": [{ "Name": "zone-name", "Values": [root.as_str()] }]
        });
        let body = self.request(service, "DescribeZones", payload).await?;
        let response: DescribeZonesResponse = parse(body)?;
        if response.total_count == 0 {
            return Err(Error::remote_api(
                PROVIDER,
                format!("no EdgeOne zone found for root domain '{}'", root),
            ));
        }
        let zone = response.zones.into_iter().next().ok_or_else(|| {
            Error::remote_api(PROVIDER, "zone listing returned a count but no zones")
        })?;
        Ok(zone.zone_id)
    }

    async fn describe_edgeone_domain(
        &self,
        service: &CdnService,
        zone_id: &str,
    ) -> Result<Option<AccelerationDomainSummary>, Error> {
        let payload = serde_json::json!({
            "ZoneId": zone_id,
            "Filters": [{ "Name": "domain-name", "Values": [service.domain.as_str()] }]
        });
        let body = self
            .request(service, "DescribeAccelerationDomains", payload)
            .await?;
        let response: DescribeAccelerationDomainsResponse = parse(body)?;
        if response.total_count == 0 {
            return Ok(None);
        }
        let first = response.domains.into_iter().next().ok_or_else(|| {
            Error::remote_api(
                PROVIDER,
                "describe returned a count but no acceleration domains",
            )
        })?;
        Ok(Some(first))
    }

    async fn converge_cdn(
        &self,
        service: &CdnService,
        resolved: &ResolvedValues,
    ) -> Result<Convergence, Error> {
        let existing = self.describe_cdn_domain(service).await?;
        let origin = origin_block(service, resolved)?;

        match existing {
            None => {
                tracing::info!("Tencent CDN domain {} is absent, creating it", service.domain);
                let payload = serde_json::json!({
                    "Domain": service.domain,
                    "ServiceType": "web",
                    "Origin": origin,
                });
                self.request(service, "AddCdnDomain", payload).await?;

                let alias = match self.describe_cdn_domain(service).await {
                    Ok(found) => found.and_then(|d| non_empty(&d.cname)),
                    Err(err) => {
                        tracing::warn!(
                            "Created Tencent domain {} but could not read back its alias: {}",
                            service.domain,
                            err
                        );
                        None
                    }
                };
                Ok(Convergence::created(alias))
            }
            Some(found) => {
                tracing::info!(
                    "Tencent CDN domain {} exists [status={}], updating origin configuration",
                    service.domain,
                    found.status
                );
                let payload = serde_json::json!({
                    "Domain": service.domain,
                    "Origin": origin,
                });
                self.request(service, "UpdateDomainConfig", payload).await?;
                Ok(Convergence::modified(non_empty(&found.cname)))
            }
        }
    }

    async fn converge_edgeone(
        &self,
        service: &CdnService,
        resolved: &ResolvedValues,
    ) -> Result<Convergence, Error> {
        let zone_id = self.edgeone_zone_id(service).await?;
        let existing = self.describe_edgeone_domain(service, &zone_id).await?;
        let payload = edgeone_domain_payload(service, resolved, &zone_id)?;

        let action = match &existing {
            None => {
                tracing::info!(
                    "Tencent EdgeOne domain {} is absent under zone {}, creating it",
                    service.domain,
                    zone_id
                );
                "CreateAccelerationDomain"
            }
            Some(found) => {
                tracing::info!(
                    "Tencent EdgeOne domain {} exists [status={}], updating origin configuration",
                    service.domain,
                    found.status
                );
                "ModifyAccelerationDomain"
            }
        };
        self.request(service, action, payload).await?;

        // The zone assigns the alias; read it back after either write
        let alias = match self.describe_edgeone_domain(service, &zone_id).await {
            Ok(found) => found.and_then(|d| non_empty(&d.cname)),
            Err(err) => {
                tracing::warn!(
                    "Converged Tencent EdgeOne domain {} but could not read back its alias: {}",
                    service.domain,
                    err
                );
                None
            }
        };

        if existing.is_none() {
            Ok(Convergence::created(alias))
        } else {
            Ok(Convergence::modified(alias))
        }
    }
}

#[async_trait]
impl CdnAdapter for TencentCdn {
    fn validate(&self, service: &CdnService) -> Result<(), Error> {
        if service.access_key.is_empty() || service.access_secret.is_empty() {
            return Err(Error::validation(format!(
                "Tencent service '{}' is missing credentials",
                service.label()
            )));
        }
        if service.domain.is_empty() {
            return Err(Error::validation("Tencent service has no domain"));
        }
        if service.sources.is_empty() {
            return Err(Error::validation(format!(
                "Tencent service '{}' has no origin sources",
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
        match service.variant {
            CdnVariant::Edgeone => self.converge_edgeone(service, resolved).await,
            _ => self.converge_cdn(service, resolved).await,
        }
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Origin block for CDN writes
///
/// The first source decides the origin type and the pull protocol.
/// Entries carry the protocol port (`auto` leaves the port to Tencent)
/// and a weight suffix once more than one source is configured;
/// backup-priority sources land in `BackupOrigins`.
fn origin_block(service: &CdnService, resolved: &ResolvedValues) -> Result<OriginBlock, Error> {
    let first = service.sources.first().ok_or_else(|| {
        Error::validation(format!(
            "Tencent service '{}' has no origin sources",
            service.label()
        ))
    })?;

    let origin_type = if first.target.kind.is_domain() { "domain" } else { "ip" };
    let pull_protocol = match first.protocol {
        Protocol::Auto => "follow",
        Protocol::Https => "https",
        Protocol::Http => "http",
    };

    let multi = service.sources.len() > 1;
    let mut origins = Vec::new();
    let mut backups = Vec::new();
    for source in &service.sources {
        let mut entry = resolved.value_or_configured(&source.target).to_string();
        match source.protocol {
            Protocol::Http => entry = format!("{}:{}", entry, source.http_port()),
            Protocol::Https => entry = format!("{}:{}", entry, source.https_port()),
            Protocol::Auto => {}
        }
        if multi {
            entry = format!("{}:{}", entry, source.effective_weight());
        }
        if source.priority == Priority::Backup {
            backups.push(entry);
        } else {
            origins.push(entry);
        }
    }

    Ok(OriginBlock {
        origins,
        origin_type,
        server_name: service.domain.clone(),
        origin_pull_protocol: pull_protocol,
        backup_origins: if backups.is_empty() { None } else { Some(backups) },
    })
}

/// Create/Modify payload for an EdgeOne acceleration domain
///
/// EdgeOne takes a single origin: the first configured source, with the
/// pull protocol and both origin ports lifted from it.
fn edgeone_domain_payload(
    service: &CdnService,
    resolved: &ResolvedValues,
    zone_id: &str,
) -> Result<serde_json::Value, Error> {
    let first = service.sources.first().ok_or_else(|| {
        Error::validation(format!(
            "Tencent service '{}' has no origin sources",
            service.label()
        ))
    })?;

    let origin_protocol = match first.protocol {
        Protocol::Auto => "FOLLOW",
        Protocol::Https => "HTTPS",
        Protocol::Http => "HTTP",
    };

    Ok(serde_json::json!({
        "ZoneId": zone_id,
        "DomainName": service.domain,
        "OriginInfo": {
            "OriginType": "IP_DOMAIN",
            "Origin": resolved.value_or_configured(&first.target),
        },
        "OriginProtocol": origin_protocol,
        "HttpOriginPort": first.http_port(),
        "HttpsOriginPort": first.https_port(),
    }))
}

/// Tencent reports failures as `Response.Error`, usually on a 200
fn check_api_error(body: &serde_json::Value) -> Result<(), Error> {
    let error = &body["Response"]["Error"];
    if error.is_null() {
        return Ok(());
    }
    let code = error.get("Code").and_then(|c| c.as_str()).unwrap_or("");
    let message = error.get("Message").and_then(|m| m.as_str()).unwrap_or("");
    tracing::warn!("Tencent API call failed [code={}]: {}", code, message);
    Err(Error::remote_api(PROVIDER, format!("{}: {}", code, message)))
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

/// Factory for [`TencentCdn`] adapters
pub struct TencentCdnFactory;

impl CdnAdapterFactory for TencentCdnFactory {
    fn create(&self) -> Result<Box<dyn CdnAdapter>, Error> {
        Ok(Box::new(TencentCdn::new()?))
    }
}

/// Register the Tencent adapter with a registry
///
/// # Example
///
/// ```rust
/// use edgesync_core::AdapterRegistry;
///
/// let registry = AdapterRegistry::new();
/// edgesync_provider_tencent::register(&registry);
/// assert!(registry.has_cdn("tencent"));
/// ```
pub fn register(registry: &AdapterRegistry) {
    registry.register_cdn("tencent", Box::new(TencentCdnFactory));
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgesync_core::{SourceKind, SourceSpec, SourceTarget};

    fn service(variant: CdnVariant, sources: Vec<SourceSpec>) -> CdnService {
        CdnService {
            id: "c1".to_string(),
            name: String::new(),
            domain: "cdn.example.com".to_string(),
            provider: "tencent".to_string(),
            variant,
            access_key: "ak".to_string(),
            access_secret: "sk".to_string(),
            cname: None,
            sources,
        }
    }

    #[test]
    fn origin_entries_carry_port_and_weight() {
        let main = SourceSpec::new(SourceTarget::new(SourceKind::Ipv4, "203.0.113.9"));
        let mut backup = SourceSpec::new(SourceTarget::new(SourceKind::Domain, "origin.example.net"))
            .with_protocol(Protocol::Https)
            .with_priority(Priority::Backup)
            .with_weight(30);
        backup.https_port = Some(8443);
        let service = service(CdnVariant::Cdn, vec![main, backup]);

        let block = origin_block(&service, &ResolvedValues::new()).unwrap();
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "Origins": ["203.0.113.9:80:10"],
                "OriginType": "ip",
                "ServerName": "cdn.example.com",
                "OriginPullProtocol": "http",
                "BackupOrigins": ["origin.example.net:8443:30"]
            })
        );
    }

    #[test]
    fn single_auto_source_has_neither_port_nor_weight() {
        let source = SourceSpec::new(SourceTarget::new(SourceKind::Domain, "origin.example.net"))
            .with_protocol(Protocol::Auto);
        let service = service(CdnVariant::Cdn, vec![source]);

        let block = origin_block(&service, &ResolvedValues::new()).unwrap();
        assert_eq!(block.origins, vec!["origin.example.net".to_string()]);
        assert_eq!(block.origin_type, "domain");
        assert_eq!(block.origin_pull_protocol, "follow");

        let json = serde_json::to_value(&block).unwrap();
        assert!(json.get("BackupOrigins").is_none());
    }

    #[test]
    fn dynamic_sources_count_as_ip_origins() {
        let source = SourceSpec::new(SourceTarget::new(
            SourceKind::DynamicIpv4Url,
            "https://probe.test/ip",
        ));
        let mut resolved = ResolvedValues::new();
        resolved.insert(source.target.key(), "198.51.100.7".to_string());
        let service = service(CdnVariant::Cdn, vec![source]);

        let block = origin_block(&service, &resolved).unwrap();
        assert_eq!(block.origin_type, "ip");
        assert_eq!(block.origins, vec!["198.51.100.7:80".to_string()]);
    }

    #[test]
    fn edgeone_payload_follows_the_first_source() {
        let mut source = SourceSpec::new(SourceTarget::new(SourceKind::Ipv4, "203.0.113.9"))
            .with_protocol(Protocol::Auto);
        source.https_port = Some(8443);
        let service = service(CdnVariant::Edgeone, vec![source]);

        let payload = edgeone_domain_payload(&service, &ResolvedValues::new(), "zone-2qz").unwrap();
        assert_eq!(
            payload,
            serde_json::json!({
                "ZoneId": "zone-2qz",
                "DomainName": "cdn.example.com",
                "OriginInfo": { "OriginType": "IP_DOMAIN", "Origin": "203.0.113.9" },
                "OriginProtocol": "FOLLOW",
                "HttpOriginPort": 80,
                "HttpsOriginPort": 8443
            })
        );
    }

    #[test]
    fn response_errors_surface_even_on_success_statuses() {
        let clean = serde_json::json!({ "Response": { "RequestId": "r-1" } });
        assert!(check_api_error(&clean).is_ok());

        let failed = serde_json::json!({
            "Response": {
                "Error": { "Code": "AuthFailure.SignatureFailure", "Message": "signature expired" },
                "RequestId": "r-2"
            }
        });
        let err = check_api_error(&failed).unwrap_err();
        assert!(
            err.to_string()
                .contains("AuthFailure.SignatureFailure: signature expired")
        );
    }

    #[test]
    fn variants_pick_the_matching_endpoint() {
        assert_eq!(
            service_scope(CdnVariant::Edgeone),
            ("teo.tencentcloudapi.com", "teo")
        );
        assert_eq!(service_scope(CdnVariant::Cdn), ("cdn.tencentcloudapi.com", "cdn"));
        // unknown-to-Tencent variants fall back to plain CDN
        assert_eq!(service_scope(CdnVariant::Esa), ("cdn.tencentcloudapi.com", "cdn"));
    }

    #[test]
    fn validate_requires_credentials_and_sources() {
        let adapter = TencentCdn::new().unwrap();
        let source = SourceSpec::new(SourceTarget::new(SourceKind::Ipv4, "203.0.113.9"));

        assert!(adapter.validate(&service(CdnVariant::Cdn, vec![source])).is_ok());

        let mut missing_secret = service(CdnVariant::Edgeone, Vec::new());
        missing_secret.access_secret = String::new();
        assert!(adapter.validate(&missing_secret).unwrap_err().is_validation());

        let no_sources = service(CdnVariant::Cdn, Vec::new());
        assert!(adapter.validate(&no_sources).unwrap_err().is_validation());
    }
}
