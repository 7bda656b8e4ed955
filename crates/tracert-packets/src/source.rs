//! Packet capture source trait.

use async_trait::async_trait;
use std::time::Instant;
use tracert_core::TracerouteError;

/// Trait for packet capture sources.
#[async_trait]
pub trait Source: Send + Sync {
    /// Sets the read deadline for subsequent read operations.
    fn set_read_deadline(&mut self, deadline: Instant) -> Result<(), TracerouteError>;

    /// Reads a packet (starting at IP layer) into the buffer.
    /// Returns the number of bytes read, or `ReadTimeout` once the deadline passes.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, TracerouteError>;

    /// Closes the source.
    async fn close(&mut self) -> Result<(), TracerouteError>;
}
