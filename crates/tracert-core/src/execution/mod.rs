//! Trace execution.
//!
//! Probing is strictly serial: the probe for TTL n+1 is only sent once the
//! probe for TTL n has been answered or has timed out.

pub mod serial;

pub use serial::TraceOrchestrator;
