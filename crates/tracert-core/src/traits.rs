//! Core traits at the seams of the trace loop.

use crate::{Hop, ProbeResponse, Trace, TracerouteError};
use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Sends TTL-limited probes and receives the replies they provoke.
///
/// The ICMP driver is the production implementation; tests script their own.
#[async_trait]
pub trait TracerouteDriver: Send {
    /// Sends a probe with the specified TTL.
    async fn send_probe(&mut self, ttl: u8) -> Result<(), TracerouteError>;

    /// Receives a probe response with timeout.
    ///
    /// Returns `Ok(None)` if nothing was read within the timeout.
    /// Returns a retryable `Err` for packets that were not ours, and a
    /// non-retryable `Err` for fatal errors that should stop the trace.
    async fn receive_probe(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<ProbeResponse>, TracerouteError>;

    /// Closes the driver, releasing resources.
    async fn close(&mut self) -> Result<(), TracerouteError>;
}

/// Looks up a short registry summary for a public hop.
///
/// Implementations swallow their own failures: `None` means "report the hop
/// without a summary", never "stop the trace".
#[async_trait]
pub trait HopEnricher: Send + Sync {
    async fn enrich(&self, ip: Ipv4Addr) -> Option<String>;
}

/// Enricher used when registry lookups are switched off.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEnrichment;

#[async_trait]
impl HopEnricher for NoEnrichment {
    async fn enrich(&self, _ip: Ipv4Addr) -> Option<String> {
        None
    }
}

/// Receives hops as soon as they are produced.
pub trait HopSink {
    /// Called once, before the first probe.
    fn start(&mut self, trace: &Trace) -> std::io::Result<()>;

    /// Called for every hop, in TTL order.
    fn hop(&mut self, hop: &Hop) -> std::io::Result<()>;

    /// Called once the trace is terminal.
    fn finish(&mut self, trace: &Trace) -> std::io::Result<()>;
}
