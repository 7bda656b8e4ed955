//! Platform-specific packet I/O implementations.

#[cfg(target_os = "linux")]
pub mod linux;

use crate::SourceSinkHandle;
use tracert_core::TracerouteError;

/// Creates a Source and Sink appropriate for the current platform.
pub fn new_source_sink() -> Result<SourceSinkHandle, TracerouteError> {
    #[cfg(target_os = "linux")]
    return linux::new_source_sink();

    #[cfg(not(target_os = "linux"))]
    return Err(TracerouteError::DriverNotAvailable);
}
