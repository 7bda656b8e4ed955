//! Error types for registry lookups.

use std::net::Ipv4Addr;
use thiserror::Error;

/// Why a registry lookup produced nothing.
///
/// None of these stop a trace; the hop is printed without a summary.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The address sits in a block that never appears in registry data.
    #[error("IPv4 address {addr} is already defined as {range}")]
    Bogon { addr: Ipv4Addr, range: &'static str },

    /// The RDAP query failed at the HTTP layer.
    #[error("HTTP lookup failed for {url}: {reason}")]
    HttpLookup { url: String, reason: String },

    /// The ASN lookup failed or named a registry we do not know.
    #[error("ASN registry lookup failed: {0}")]
    AsnRegistry(String),

    /// Anything else, such as an RDAP body that is not the expected JSON.
    #[error("Registry lookup failed: {0}")]
    Other(String),
}

impl RegistryError {
    /// True for the failures a lookup is expected to hit in normal operation.
    pub fn is_expected(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}
