//! Core types, traits, and error handling for tracert-as.
//!
//! This crate provides the fundamental abstractions used throughout the
//! tracer:
//!
//! - [`TracerouteDriver`] trait for the probe implementation
//! - [`HopEnricher`] trait for registry lookups on public hops
//! - [`TraceOrchestrator`] for the hop-by-hop loop
//! - [`Trace`] and [`Hop`] for the results, and sinks that render them
//! - [`TracerouteError`] for error handling

pub mod classify;
pub mod error;
pub mod execution;
pub mod render;
pub mod result;
pub mod traits;
pub mod types;

pub use classify::{classify, is_private_ip};
pub use error::{TracerouteError, TracerouteResult};
pub use execution::TraceOrchestrator;
pub use render::{JsonRenderer, TextRenderer};
pub use result::{Hop, HopOutcome, Trace, TraceStatus};
pub use traits::{HopEnricher, HopSink, NoEnrichment, TracerouteDriver};
pub use types::{
    HopClass, ProbeResponse, TraceParams, DEFAULT_LOOKUP_TIMEOUT, DEFAULT_MAX_HOPS,
    DEFAULT_PROBE_TIMEOUT,
};
