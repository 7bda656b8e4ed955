//! Registry enrichment for public hops.
//!
//! A lookup runs in three steps:
//!
//! 1. reject special-purpose ("bogon") addresses without touching the network;
//! 2. find the origin ASN, country and regional registry through Team Cymru's
//!    DNS service ([`asn`]);
//! 3. ask that registry's RDAP server for the network object ([`rdap`]).
//!
//! [`RegistryEnricher`] plugs this into the trace loop as a [`HopEnricher`]
//! that turns every failure into "no annotation".

pub mod asn;
pub mod bogon;
pub mod error;
pub mod rdap;

pub use asn::{AsnRecord, Rir};
pub use bogon::check_bogon;
pub use error::RegistryError;
pub use rdap::RdapNetwork;

use async_trait::async_trait;
use hickory_resolver::TokioResolver;
use std::net::Ipv4Addr;
use std::time::Duration;
use tracert_core::HopEnricher;
use tracing::debug;

/// Country code some registries publish for pan-European allocations.
const SUPPRESSED_COUNTRY: &str = "EU";

/// What a successful lookup found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryInfo {
    /// Network name from RDAP.
    pub name: Option<String>,
    /// Origin AS number.
    pub asn: Option<String>,
    /// Country code.
    pub country: Option<String>,
}

impl RegistryInfo {
    /// Joins the reportable fields into a one-line summary.
    ///
    /// The ASN is only kept when it is a single number, the country only when
    /// it is not `EU`. Returns `None` when nothing is left.
    pub fn annotation(&self) -> Option<String> {
        let mut parts: Vec<&str> = Vec::with_capacity(3);

        if let Some(name) = non_empty(&self.name) {
            parts.push(name);
        }
        if let Some(asn) = non_empty(&self.asn) {
            if asn.bytes().all(|b| b.is_ascii_digit()) {
                parts.push(asn);
            }
        }
        if let Some(country) = non_empty(&self.country) {
            if country != SUPPRESSED_COUNTRY {
                parts.push(country);
            }
        }

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Looks up registry data over DNS and RDAP.
pub struct RegistryEnricher {
    resolver: TokioResolver,
    client: reqwest::Client,
}

impl RegistryEnricher {
    /// Creates an enricher using the system resolver configuration.
    ///
    /// `timeout` bounds each RDAP request.
    pub fn new(timeout: Duration) -> Result<Self, RegistryError> {
        let resolver = TokioResolver::builder_tokio()
            .map_err(|e| RegistryError::Other(format!("failed to create DNS resolver: {e}")))?
            .build();

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tracert-as/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RegistryError::Other(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { resolver, client })
    }

    /// Runs the full lookup for `ip`.
    pub async fn lookup(&self, ip: Ipv4Addr) -> Result<RegistryInfo, RegistryError> {
        check_bogon(ip)?;

        let origin = asn::lookup_origin(&self.resolver, ip).await?;
        debug!(
            ip = %ip,
            asn = %origin.asn,
            prefix = %origin.prefix,
            country = %origin.country,
            registry = ?origin.registry,
            "Found origin ASN"
        );

        let network =
            rdap::lookup_network(&self.client, origin.registry.rdap_base(), ip).await?;
        debug!(ip = %ip, handle = ?network.handle, "Found RDAP network");

        Ok(RegistryInfo {
            name: network.name,
            asn: Some(origin.asn),
            country: network.country,
        })
    }
}

/// Turns a lookup outcome into the hop annotation; failures only get logged.
fn annotate(ip: Ipv4Addr, result: Result<RegistryInfo, RegistryError>) -> Option<String> {
    match result {
        Ok(info) => info.annotation(),
        Err(e) if e.is_expected() => {
            debug!(ip = %ip, error = %e, "Registry lookup failed");
            None
        }
        Err(e) => {
            debug!(ip = %ip, error = %e, "Unexpected registry lookup failure");
            None
        }
    }
}

#[async_trait]
impl HopEnricher for RegistryEnricher {
    async fn enrich(&self, ip: Ipv4Addr) -> Option<String> {
        annotate(ip, self.lookup(ip).await)
    }
}
