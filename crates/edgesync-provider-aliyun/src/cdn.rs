// # Aliyun CDN Adapter
//
// Converges accelerated domains across Aliyun's three acceleration
// products, selected by the service variant:
//
// - `cdn`  — classic CDN, https://cdn.aliyuncs.com/ (API 2018-05-10)
// - `dcdn` — dynamic-route CDN, https://dcdn.aliyuncs.com/ (API 2018-01-15)
// - `esa`  — edge acceleration, https://esa.cn-hangzhou.aliyuncs.com/
//   (API 2024-09-10)
//
// All three speak the same RPC dialect: every call is a signed query
// string, GET for reads and CDN/DCDN writes, POST for ESA writes. CDN and
// DCDN take the whole origin list as a JSON-encoded `Sources` parameter.
// ESA models the domain as one record under a site, so the site id is
// resolved from the root domain first and only the first configured source
// is written.
//
// The alias (CNAME) assigned by Aliyun comes back on the describe call and
// is reported to the engine for configuration write-back.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use edgesync_core::net::read_json_response;
use edgesync_core::source::looks_like_ip;
use edgesync_core::{
    CdnAdapter, CdnAdapterFactory, CdnService, CdnVariant, Convergence, Error, Priority,
    ResolvedValues, SourceKind, SourceSpec, domain,
};
use serde::{Deserialize, Serialize};

const PROVIDER: &str = "aliyun";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const CDN_ENDPOINT: &str = "https://cdn.aliyuncs.com/";
const DCDN_ENDPOINT: &str = "https://dcdn.aliyuncs.com/";
const ESA_ENDPOINT: &str = "https://esa.cn-hangzhou.aliyuncs.com/";

/// Adapter for the `aliyun` provider key
pub struct AliyunCdn {
    client: reqwest::Client,
}

/// Endpoint and API version for a variant
fn endpoint_for(variant: CdnVariant) -> (&'static str, &'static str) {
    match variant {
        CdnVariant::Dcdn => (DCDN_ENDPOINT, "2018-01-15"),
        CdnVariant::Esa => (ESA_ENDPOINT, "2024-09-10"),
        _ => (CDN_ENDPOINT, "2018-05-10"),
    }
}

/// One entry of the JSON-encoded `Sources` parameter (cdn/dcdn)
///
/// `port` is a bare number while `priority` and `weight` travel as strings.
#[derive(Debug, Serialize)]
struct OriginEntry {
    content: String,
    #[serde(rename = "type")]
    kind: &'static str,
    priority: &'static str,
    port: u16,
    weight: String,
}

#[derive(Debug, Deserialize)]
struct DescribeDomainsResponse {
    #[serde(rename = "TotalCount", default)]
    total_count: i64,
    #[serde(rename = "Domains", default)]
    domains: DomainPage,
}

#[derive(Debug, Default, Deserialize)]
struct DomainPage {
    #[serde(rename = "PageData", default)]
    page_data: Vec<DomainSummary>,
}

#[derive(Debug, Deserialize)]
struct DomainSummary {
    #[serde(rename = "Cname", default)]
    cname: String,
}

#[derive(Debug, Deserialize)]
struct ListSitesResponse {
    #[serde(rename = "TotalCount", default)]
    total_count: i64,
    #[serde(rename = "Sites", default)]
    sites: Vec<SiteSummary>,
}

#[derive(Debug, Deserialize)]
struct SiteSummary {
    #[serde(rename = "SiteId")]
    site_id: i64,
}

#[derive(Debug, Deserialize)]
struct ListRecordsResponse {
    #[serde(rename = "TotalCount", default)]
    total_count: i64,
    #[serde(rename = "Records", default)]
    records: Vec<RecordSummary>,
}

#[derive(Debug, Deserialize)]
struct RecordSummary {
    #[serde(rename = "RecordId")]
    record_id: i64,
    #[serde(rename = "RecordCname", default)]
    cname: String,
}

impl AliyunCdn {
    pub fn new() -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }

    /// Signed RPC call; the response body is JSON or empty
    async fn request(
        &self,
        service: &CdnService,
        http_method: &str,
        mut params: BTreeMap<String, String>,
    ) -> Result<serde_json::Value, Error> {
        let (endpoint, version) = endpoint_for(service.variant);
        params.insert("Version".to_string(), version.to_string());
        edgesync_signing::aliyun::sign_params(
            &service.access_key,
            &service.access_secret,
            &mut params,
            http_method,
        );

        let url = format!(
            "{}?{}",
            endpoint,
            edgesync_signing::aliyun::encode_params(&params)
        );
        let request = if http_method == "POST" {
            self.client.post(&url)
        } else {
            self.client.get(&url)
        };
        let response = request.send().await?;
        read_json_response(response, PROVIDER).await
    }

    async fn describe_domain(&self, service: &CdnService) -> Result<Option<DomainSummary>, Error> {
        let action = if service.variant == CdnVariant::Dcdn {
            "DescribeDcdnUserDomains"
        } else {
            "DescribeUserDomains"
        };

        let mut params = BTreeMap::new();
        params.insert("Action".to_string(), action.to_string());
        params.insert("DomainName".to_string(), service.domain.clone());
        params.insert("DomainSearchType".to_string(), "full_match".to_string());

        let body = self.request(service, "GET", params).await?;
        let response: DescribeDomainsResponse = parse(body)?;
        if response.total_count == 0 {
            return Ok(None);
        }
        let first = response.domains.page_data.into_iter().next().ok_or_else(|| {
            Error::remote_api(PROVIDER, "describe returned a count but no domain entries")
        })?;
        Ok(Some(first))
    }

    /// Site id for the ESA variant; a missing site fails the convergence
    /// (sites are created in the console, never by this agent)
    async fn esa_site_id(&self, service: &CdnService) -> Result<i64, Error> {
        let root = domain::root_domain(&service.domain);

        let mut params = BTreeMap::new();
        params.insert("Action".to_string(), "ListSites".to_string());
        params.insert("SiteName".to_string(), root.clone());

        let body = self.request(service, "GET", params).await?;
        let response: ListSitesResponse = parse(body)?;
        if response.total_count == 0 {
            return Err(Error::remote_api(
                PROVIDER,
                format!("no ESA site found for root domain '{}'", root),
            ));
        }
        let site = response.sites.first().ok_or_else(|| {
            Error::remote_api(PROVIDER, "site listing returned a count but no sites")
        })?;
        Ok(site.site_id)
    }

    async fn esa_record(
        &self,
        service: &CdnService,
        site_id: i64,
    ) -> Result<Option<RecordSummary>, Error> {
        let mut params = BTreeMap::new();
        params.insert("Action".to_string(), "ListRecords".to_string());
        params.insert("RecordName".to_string(), service.domain.clone());
        params.insert("SiteId".to_string(), site_id.to_string());

        let body = self.request(service, "GET", params).await?;
        let response: ListRecordsResponse = parse(body)?;
        if response.total_count == 0 {
            return Ok(None);
        }
        Ok(response.records.into_iter().next())
    }

    async fn converge_domain(
        &self,
        service: &CdnService,
        resolved: &ResolvedValues,
    ) -> Result<Convergence, Error> {
        let existing = self.describe_domain(service).await?;
        let alias = existing.as_ref().and_then(|d| non_empty(&d.cname));
        let sources = sources_param(service, resolved)?;

        let mut params = BTreeMap::new();
        params.insert("DomainName".to_string(), service.domain.clone());
        params.insert("Sources".to_string(), sources);

        if existing.is_none() {
            tracing::info!(
                "Aliyun {} domain {} is absent, creating it",
                service.variant.as_str(),
                service.domain
            );
            if service.variant == CdnVariant::Dcdn {
                params.insert("Action".to_string(), "AddDcdnDomain".to_string());
            } else {
                params.insert("Action".to_string(), "AddCdnDomain".to_string());
                params.insert("CdnType".to_string(), "web".to_string());
            }
            self.request(service, "GET", params).await?;
            Ok(Convergence::created(alias))
        } else {
            tracing::info!(
                "Aliyun {} domain {} exists, updating origin configuration",
                service.variant.as_str(),
                service.domain
            );
            let action = if service.variant == CdnVariant::Dcdn {
                "UpdateDcdnDomain"
            } else {
                "ModifyCdnDomain"
            };
            params.insert("Action".to_string(), action.to_string());
            self.request(service, "GET", params).await?;
            Ok(Convergence::modified(alias))
        }
    }

    async fn converge_esa(
        &self,
        service: &CdnService,
        resolved: &ResolvedValues,
    ) -> Result<Convergence, Error> {
        let site_id = self.esa_site_id(service).await?;
        let record = self.esa_record(service, site_id).await?;
        let alias = record.as_ref().and_then(|r| non_empty(&r.cname));

        match record {
            None => {
                tracing::info!(
                    "Aliyun ESA record {} is absent under site {}, creating it",
                    service.domain,
                    site_id
                );
                let mut params = BTreeMap::new();
                params.insert("Action".to_string(), "CreateRecord".to_string());
                params.insert("RecordName".to_string(), service.domain.clone());
                params.insert("SiteId".to_string(), site_id.to_string());
                params.insert("Proxied".to_string(), "true".to_string());
                params.insert("BizName".to_string(), "web".to_string());
                params.insert("Ttl".to_string(), "1".to_string());
                esa_record_params(service, resolved, &mut params)?;

                self.request(service, "POST", params).await?;
                Ok(Convergence::created(alias))
            }
            Some(record) => {
                tracing::info!(
                    "Aliyun ESA record {} exists [record_id={}], updating it",
                    service.domain,
                    record.record_id
                );
                let mut params = BTreeMap::new();
                params.insert("Action".to_string(), "UpdateRecord".to_string());
                params.insert("RecordId".to_string(), record.record_id.to_string());
                esa_record_params(service, resolved, &mut params)?;

                self.request(service, "POST", params).await?;
                Ok(Convergence::modified(alias))
            }
        }
    }
}

#[async_trait]
impl CdnAdapter for AliyunCdn {
    fn validate(&self, service: &CdnService) -> Result<(), Error> {
        if service.access_key.is_empty() || service.access_secret.is_empty() {
            return Err(Error::validation(format!(
                "Aliyun service '{}' is missing credentials",
                service.label()
            )));
        }
        if service.domain.is_empty() {
            return Err(Error::validation("Aliyun service has no domain"));
        }
        if service.sources.is_empty() {
            return Err(Error::validation(format!(
                "Aliyun service '{}' has no origin sources",
                service.label()
            )));
        }
        match service.variant {
            CdnVariant::Cdn | CdnVariant::Dcdn | CdnVariant::Esa => Ok(()),
            other => Err(Error::validation(format!(
                "Aliyun does not support variant '{}'",
                other.as_str()
            ))),
        }
    }

    async fn converge(
        &self,
        service: &CdnService,
        resolved: &ResolvedValues,
    ) -> Result<Convergence, Error> {
        match service.variant {
            CdnVariant::Esa => self.converge_esa(service, resolved).await,
            _ => self.converge_domain(service, resolved).await,
        }
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// JSON-encoded `Sources` parameter for CDN/DCDN writes
fn sources_param(service: &CdnService, resolved: &ResolvedValues) -> Result<String, Error> {
    let entries: Vec<OriginEntry> = service
        .sources
        .iter()
        .map(|source| {
            let content = resolved.value_or_configured(&source.target).to_string();
            OriginEntry {
                kind: origin_kind(source, &content),
                priority: priority_code(source.priority),
                port: source.http_port(),
                weight: source.effective_weight().to_string(),
                content,
            }
        })
        .collect();
    Ok(serde_json::to_string(&entries)?)
}

/// Record type parameters shared by ESA create and update
///
/// A domain-type first source becomes a proxied CNAME record; address
/// sources use the combined `A/AAAA` record type.
fn esa_record_params(
    service: &CdnService,
    resolved: &ResolvedValues,
    params: &mut BTreeMap<String, String>,
) -> Result<(), Error> {
    let first = service.sources.first().ok_or_else(|| {
        Error::validation(format!(
            "Aliyun service '{}' has no origin sources",
            service.label()
        ))
    })?;

    if first.target.kind.is_domain() {
        params.insert("Type".to_string(), "CNAME".to_string());
        params.insert("SourceType".to_string(), "Domain".to_string());
    } else {
        params.insert("Type".to_string(), "A/AAAA".to_string());
    }

    let content = resolved.value_or_configured(&first.target);
    params.insert(
        "Data".to_string(),
        serde_json::json!({ "Value": content }).to_string(),
    );
    Ok(())
}

/// `ipaddr` vs `domain` tag for one origin entry
fn origin_kind(source: &SourceSpec, content: &str) -> &'static str {
    if matches!(source.target.kind, SourceKind::Ipv4 | SourceKind::Ipv6) {
        return "ipaddr";
    }
    if looks_like_ip(content) { "ipaddr" } else { "domain" }
}

fn priority_code(priority: Priority) -> &'static str {
    match priority {
        Priority::Main => "20",
        Priority::Backup => "30",
    }
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

/// Factory for [`AliyunCdn`] adapters
pub struct AliyunCdnFactory;

impl CdnAdapterFactory for AliyunCdnFactory {
    fn create(&self) -> Result<Box<dyn CdnAdapter>, Error> {
        Ok(Box::new(AliyunCdn::new()?))
    }
}
