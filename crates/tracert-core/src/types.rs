//! Core types for trace operations.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::time::Duration;

/// Default upper bound on the TTL.
pub const DEFAULT_MAX_HOPS: u8 = 30;
/// Default time to wait for a reply to one probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);
/// Default time budget for the registry lookup of one hop.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Response to a single probe.
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    /// The TTL that was used for this probe.
    pub ttl: u8,
    /// The address that responded.
    pub ip: Ipv4Addr,
    /// Round-trip time for this probe.
    pub rtt: Duration,
    /// Whether this response was an echo reply from the destination.
    pub is_dest: bool,
}

/// Parameters for trace execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceParams {
    /// Maximum TTL to probe.
    pub max_hops: u8,
    /// How long to wait for the reply to each probe.
    pub probe_timeout: Duration,
    /// How long a registry lookup may take before the hop is reported without one.
    pub lookup_timeout: Duration,
}

impl Default for TraceParams {
    fn default() -> Self {
        Self {
            max_hops: DEFAULT_MAX_HOPS,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }
}

impl TraceParams {
    /// Validates the parameters.
    pub fn validate(&self) -> Result<(), crate::TracerouteError> {
        if self.max_hops == 0 {
            return Err(crate::TracerouteError::InvalidMaxHops(self.max_hops));
        }
        if self.probe_timeout.is_zero() {
            return Err(crate::TracerouteError::InvalidTimeout {
                name: "probe timeout",
            });
        }
        if self.lookup_timeout.is_zero() {
            return Err(crate::TracerouteError::InvalidTimeout {
                name: "lookup timeout",
            });
        }
        Ok(())
    }
}

/// Whether a responding address belongs to a private/local range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HopClass {
    Private,
    Public,
}

impl std::fmt::Display for HopClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HopClass::Private => write!(f, "private"),
            HopClass::Public => write!(f, "public"),
        }
    }
}
