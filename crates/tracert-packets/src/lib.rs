//! Packet I/O abstraction for tracert-as.
//!
//! Provides platform-agnostic interfaces for sending and receiving raw IPv4
//! packets, and a parser for the ICMP replies a trace provokes.

pub mod parser;
pub mod platform;
pub mod sink;
pub mod source;

pub use parser::{parse_icmp, EchoIds, IcmpInfo, IcmpKind, IpPair};
pub use sink::Sink;
pub use source::Source;

/// Handle containing both source and sink for packet I/O.
///
/// Both halves share the one raw socket opened by [`new_source_sink`].
pub struct SourceSinkHandle {
    /// Packet capture source.
    pub source: Box<dyn Source>,
    /// Packet transmission sink.
    pub sink: Box<dyn Sink>,
}

/// Opens the raw socket and splits it into a Source and Sink.
///
/// This is the privilege check: without raw-socket rights it fails with
/// [`tracert_core::TracerouteError::PermissionDenied`] before any probe is sent.
pub fn new_source_sink() -> Result<SourceSinkHandle, tracert_core::TracerouteError> {
    platform::new_source_sink()
}
