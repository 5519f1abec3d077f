// # Alidns Adapter
//
// Keeps one DNS record converged at Aliyun's authoritative DNS
// (https://alidns.aliyuncs.com/, API 2015-01-09). The record is addressed
// by root domain plus host record (RR), both derived from the configured
// domain: wildcards collapse to `*`, bare root domains to `@`.
//
// Every call is a signed GET. The record value arrives pre-resolved from
// the engine; this adapter only decides between `AddDomainRecord` and
// `UpdateDomainRecord`.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use edgesync_core::net::read_json_response;
use edgesync_core::{Convergence, DnsAdapter, DnsAdapterFactory, DnsService, Error, domain};
use serde::Deserialize;

const PROVIDER: &str = "alidns";
const ENDPOINT: &str = "https://alidns.aliyuncs.com/";
const API_VERSION: &str = "2015-01-09";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Adapter for the `alidns` provider key
pub struct Alidns {
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct DescribeRecordsResponse {
    #[serde(rename = "TotalCount", default)]
    total_count: i64,
    #[serde(rename = "DomainRecords", default)]
    domain_records: RecordList,
}

#[derive(Debug, Default, Deserialize)]
struct RecordList {
    #[serde(rename = "Record", default)]
    record: Vec<RecordSummary>,
}

#[derive(Debug, Deserialize)]
struct RecordSummary {
    #[serde(rename = "RecordId")]
    record_id: String,
    #[serde(rename = "Value", default)]
    value: String,
}

impl Alidns {
    pub fn new() -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }

    async fn request(
        &self,
        service: &DnsService,
        mut params: BTreeMap<String, String>,
    ) -> Result<serde_json::Value, Error> {
        params.insert("Version".to_string(), API_VERSION.to_string());
        edgesync_signing::aliyun::sign_params(
            &service.access_key,
            &service.access_secret,
            &mut params,
            "GET",
        );

        let url = format!(
            "{}?{}",
            ENDPOINT,
            edgesync_signing::aliyun::encode_params(&params)
        );
        let response = self.client.get(&url).send().await?;
        read_json_response(response, PROVIDER).await
    }

    async fn describe_record(&self, service: &DnsService) -> Result<Option<RecordSummary>, Error> {
        let mut params = BTreeMap::new();
        params.insert("Action".to_string(), "DescribeDomainRecords".to_string());
        params.insert(
            "DomainName".to_string(),
            domain::root_domain(&service.domain),
        );
        params.insert("RRKeyWord".to_string(), domain::host_record(&service.domain));
        params.insert(
            "TypeKeyWord".to_string(),
            service.record_type.as_str().to_string(),
        );

        let body = self.request(service, params).await?;
        let response: DescribeRecordsResponse = serde_json::from_value(body)
            .map_err(|err| Error::remote_api(PROVIDER, format!("unexpected response shape: {err}")))?;

        if response.total_count == 0 {
            return Ok(None);
        }
        let first = response.domain_records.record.into_iter().next().ok_or_else(|| {
            Error::remote_api(PROVIDER, "describe returned a count but no records")
        })?;
        Ok(Some(first))
    }

    async fn add_record(&self, service: &DnsService, value: &str) -> Result<(), Error> {
        let mut params = record_params(service, value);
        params.insert("Action".to_string(), "AddDomainRecord".to_string());
        params.insert(
            "DomainName".to_string(),
            domain::root_domain(&service.domain),
        );

        self.request(service, params).await?;
        Ok(())
    }

    async fn update_record(
        &self,
        service: &DnsService,
        record_id: &str,
        value: &str,
    ) -> Result<(), Error> {
        let mut params = record_params(service, value);
        params.insert("Action".to_string(), "UpdateDomainRecord".to_string());
        params.insert("RecordId".to_string(), record_id.to_string());

        self.request(service, params).await?;
        Ok(())
    }
}

/// RR, type, value and TTL parameters shared by add and update
///
/// Non-positive TTLs are left to the provider default.
fn record_params(service: &DnsService, value: &str) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    params.insert("RR".to_string(), domain::host_record(&service.domain));
    params.insert(
        "Type".to_string(),
        service.record_type.as_str().to_string(),
    );
    params.insert("Value".to_string(), value.to_string());

    let ttl = service.ttl_seconds();
    if ttl > 0 {
        params.insert("TTL".to_string(), ttl.to_string());
    }
    params
}

#[async_trait]
impl DnsAdapter for Alidns {
    fn validate(&self, service: &DnsService) -> Result<(), Error> {
        if service.access_key.is_empty() || service.access_secret.is_empty() {
            return Err(Error::validation(format!(
                "alidns service '{}' is missing credentials",
                service.label()
            )));
        }
        if service.domain.is_empty() {
            return Err(Error::validation("alidns service has no domain"));
        }
        service.target.validate()
    }

    async fn converge(&self, service: &DnsService, value: &str) -> Result<Convergence, Error> {
        match self.describe_record(service).await? {
            Some(record) => {
                tracing::info!(
                    "alidns record {} exists [record_id={}, stored={}], updating it",
                    service.domain,
                    record.record_id,
                    record.value
                );
                self.update_record(service, &record.record_id, value).await?;
                Ok(Convergence::modified(None))
            }
            None => {
                tracing::info!("alidns record {} is absent, creating it", service.domain);
                self.add_record(service, value).await?;
                Ok(Convergence::created(None))
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Factory for [`Alidns`] adapters
pub struct AlidnsFactory;

impl DnsAdapterFactory for AlidnsFactory {
    fn create(&self) -> Result<Box<dyn DnsAdapter>, Error> {
        Ok(Box::new(Alidns::new()?))
    }
}
