//! Packet transmission sink trait.

use async_trait::async_trait;
use std::net::Ipv4Addr;
use tracert_core::TracerouteError;

/// Trait for packet transmission.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Writes a complete IPv4 packet (header included) towards `addr`.
    async fn write_to(&mut self, buf: &[u8], addr: Ipv4Addr) -> Result<(), TracerouteError>;

    /// Closes the sink.
    async fn close(&mut self) -> Result<(), TracerouteError>;
}
