// # URL probe
//
// Fetches one or more probe URLs (comma separated, tried in order) and
// extracts the first address of the requested family from the response
// body. Requests go out through family-pinned clients so a dual-stack host
// answers over the family we are asking about, and never through a proxy.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use edgesync_core::traits::AddressProbe;
use edgesync_core::{AddressFamily, Error};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct UrlProbe {
    v4_client: reqwest::Client,
    v6_client: reqwest::Client,
}

impl UrlProbe {
    pub fn new() -> Result<Self, Error> {
        Ok(Self {
            v4_client: family_pinned_client(IpAddr::from([0, 0, 0, 0]))?,
            v6_client: family_pinned_client(IpAddr::from([0u16; 8]))?,
        })
    }

    fn client(&self, family: AddressFamily) -> &reqwest::Client {
        match family {
            AddressFamily::V4 => &self.v4_client,
            AddressFamily::V6 => &self.v6_client,
        }
    }
}

/// Binding the local side to the unspecified address of one family forces
/// connections onto that family.
fn family_pinned_client(local: IpAddr) -> Result<reqwest::Client, Error> {
    Ok(reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .local_address(local)
        .no_proxy()
        .build()?)
}

/// Probe endpoints answer with a handful of bytes; the shared cap guards
/// against misconfigured URLs pointing at arbitrary content.
async fn read_body_capped(response: reqwest::Response) -> Result<String, Error> {
    let body = edgesync_core::net::read_body_capped(response).await?;
    Ok(String::from_utf8_lossy(&body).into_owned())
}

#[async_trait]
impl AddressProbe for UrlProbe {
    async fn probe(
        &self,
        family: AddressFamily,
        value: &str,
        _pattern: Option<&str>,
    ) -> Result<String, Error> {
        let client = self.client(family);

        for url in value.split(',') {
            let url = url.trim();
            if url.is_empty() {
                continue;
            }

            let response = match client.get(url).send().await {
                Ok(response) => response,
                Err(err) => {
                    tracing::warn!("Probe URL {} unreachable: {}", url, err);
                    continue;
                }
            };

            let body = match read_body_capped(response).await {
                Ok(body) => body,
                Err(err) => {
                    tracing::warn!("Failed to read probe response from {}: {}", url, err);
                    continue;
                }
            };

            match family.find_in(&body) {
                Some(address) => return Ok(address),
                None => {
                    tracing::info!(
                        "No {} address in response from {} ({} bytes)",
                        family,
                        url,
                        body.len()
                    );
                }
            }
        }

        Err(Error::resolution(format!(
            "No {} address found from probe URLs: {}",
            family, value
        )))
    }

    fn strategy_name(&self) -> &'static str {
        "url"
    }
}
