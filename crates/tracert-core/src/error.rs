//! Error types for trace operations.

use thiserror::Error;

/// Main error type for trace operations.
#[derive(Error, Debug)]
pub enum TracerouteError {
    // Socket/IO errors
    #[error("Failed to create socket: {0}")]
    SocketCreation(#[source] std::io::Error),

    #[error("Permission denied opening raw socket: {0}")]
    PermissionDenied(#[source] std::io::Error),

    #[error("Read timeout exceeded")]
    ReadTimeout,

    #[error("Write failed: {0}")]
    WriteFailed(#[source] std::io::Error),

    #[error("Failed to write trace output: {0}")]
    Output(#[source] std::io::Error),

    // Packet errors
    #[error("Failed to parse {layer} layer: {reason}")]
    PacketParseFailed { layer: &'static str, reason: String },

    #[error("Packet did not match traceroute")]
    PacketMismatch,

    #[error("Malformed packet: {0}")]
    MalformedPacket(String),

    // Driver errors
    #[error("Raw ICMP sockets are not available on this platform")]
    DriverNotAvailable,

    // DNS errors
    #[error("Failed to resolve hostname {hostname}: {source}")]
    DnsResolutionFailed {
        hostname: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    // Configuration errors
    #[error("Invalid max hops: {0} (must be between 1 and 255)")]
    InvalidMaxHops(u8),

    #[error("Invalid {name}: must be greater than zero")]
    InvalidTimeout { name: &'static str },

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TracerouteError {
    /// Returns true if this error is retryable (e.g., timeout, packet mismatch, parse failure).
    ///
    /// Retryable errors mean the reader should keep waiting for a reply: a raw ICMP
    /// socket sees every ICMP packet delivered to the host, most of which belong to
    /// somebody else.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ReadTimeout
                | Self::PacketMismatch
                | Self::MalformedPacket(_)
                | Self::PacketParseFailed { .. }
        )
    }

    /// Builds a resolution failure for `hostname`.
    pub fn resolution(
        hostname: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::DnsResolutionFailed {
            hostname: hostname.into(),
            source: source.into(),
        }
    }
}

impl From<std::io::Error> for TracerouteError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut => TracerouteError::ReadTimeout,
            std::io::ErrorKind::WouldBlock => TracerouteError::ReadTimeout,
            std::io::ErrorKind::PermissionDenied => TracerouteError::PermissionDenied(err),
            _ => TracerouteError::Internal(err.to_string()),
        }
    }
}

/// Result type alias for trace operations.
pub type TracerouteResult<T> = Result<T, TracerouteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(TracerouteError::ReadTimeout.is_retryable());
        assert!(TracerouteError::PacketMismatch.is_retryable());
        assert!(TracerouteError::MalformedPacket("test".into()).is_retryable());
        assert!(TracerouteError::PacketParseFailed {
            layer: "IPv4",
            reason: "test".into()
        }
        .is_retryable());
        assert!(!TracerouteError::DriverNotAvailable.is_retryable());
        assert!(!TracerouteError::resolution("nowhere.invalid", "NXDOMAIN").is_retryable());
    }

    #[test]
    fn test_io_error_mapping() {
        let timed_out = std::io::Error::from(std::io::ErrorKind::TimedOut);
        assert!(matches!(
            TracerouteError::from(timed_out),
            TracerouteError::ReadTimeout
        ));

        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert!(matches!(
            TracerouteError::from(denied),
            TracerouteError::PermissionDenied(_)
        ));

        let other = std::io::Error::other("boom");
        assert!(matches!(
            TracerouteError::from(other),
            TracerouteError::Internal(_)
        ));
    }

    #[test]
    fn test_resolution_message_names_host() {
        let err = TracerouteError::resolution("nowhere.invalid", "no record found");
        assert_eq!(
            err.to_string(),
            "Failed to resolve hostname nowhere.invalid: no record found"
        );
    }
}
