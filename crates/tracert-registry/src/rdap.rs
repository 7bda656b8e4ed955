//! RDAP network queries.

use crate::RegistryError;
use serde::Deserialize;
use std::net::Ipv4Addr;
use tracing::trace;

/// The fields of an RDAP `ip network` object we report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RdapNetwork {
    /// Registry handle, e.g. `NET-8-8-8-0-2`.
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl RdapNetwork {
    /// Decodes an RDAP response body.
    pub fn from_json(body: &str) -> Result<Self, RegistryError> {
        serde_json::from_str(body)
            .map_err(|e| RegistryError::Other(format!("invalid RDAP response: {e}")))
    }
}

/// Queries the RDAP `ip` endpoint at `base` for the network containing `ip`.
///
/// `base` ends with the path prefix the address is appended to, as returned
/// by [`crate::Rir::rdap_base`].
pub async fn lookup_network(
    client: &reqwest::Client,
    base: &str,
    ip: Ipv4Addr,
) -> Result<RdapNetwork, RegistryError> {
    let url = format!("{base}{ip}");
    trace!(url = %url, "Querying RDAP");

    let http_error = |reason: String| RegistryError::HttpLookup {
        url: url.clone(),
        reason,
    };

    let response = client
        .get(&url)
        .header(reqwest::header::ACCEPT, "application/rdap+json")
        .send()
        .await
        .map_err(|e| http_error(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(http_error(format!("HTTP status {status}")));
    }

    let body = response.text().await.map_err(|e| http_error(e.to_string()))?;
    RdapNetwork::from_json(&body)
}
