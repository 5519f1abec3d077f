// # Interface probe
//
// Reads an address off a named local network interface. Loopback and
// link-local addresses never qualify. For IPv6, where an interface often
// carries several globally routable addresses, an optional pattern narrows
// the pick; without one the first qualifying address wins.

use std::net::IpAddr;

use async_trait::async_trait;
use edgesync_core::traits::AddressProbe;
use edgesync_core::{AddressFamily, Error};
use regex::Regex;

#[derive(Debug, Default)]
pub struct InterfaceProbe;

impl InterfaceProbe {
    pub fn new() -> Self {
        Self
    }
}

fn family_matches(ip: &IpAddr, family: AddressFamily) -> bool {
    match family {
        AddressFamily::V4 => ip.is_ipv4(),
        AddressFamily::V6 => ip.is_ipv6(),
    }
}

fn is_link_local(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_link_local(),
        // fe80::/10
        IpAddr::V6(v6) => (v6.segments()[0] & 0xffc0) == 0xfe80,
    }
}

#[async_trait]
impl AddressProbe for InterfaceProbe {
    async fn probe(
        &self,
        family: AddressFamily,
        value: &str,
        pattern: Option<&str>,
    ) -> Result<String, Error> {
        let matcher = match pattern {
            Some(pattern) if !pattern.is_empty() => {
                Some(Regex::new(pattern).map_err(|err| {
                    Error::validation(format!(
                        "Invalid interface match pattern {:?}: {}",
                        pattern, err
                    ))
                })?)
            }
            _ => None,
        };

        let interfaces = if_addrs::get_if_addrs()?;

        for iface in &interfaces {
            if iface.name != value {
                continue;
            }
            let ip = iface.addr.ip();
            if !family_matches(&ip, family) || ip.is_loopback() || is_link_local(&ip) {
                continue;
            }
            let text = ip.to_string();
            if let Some(matcher) = &matcher {
                if !matcher.is_match(&text) {
                    continue;
                }
            }
            return Ok(text);
        }

        Err(Error::resolution(format!(
            "No {} address on interface {}",
            family, value
        )))
    }

    fn strategy_name(&self) -> &'static str {
        "interface"
    }
}
