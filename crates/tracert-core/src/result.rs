//! Result types for trace output.

use crate::{HopClass, TracerouteError};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::time::Duration;

/// What came back for one TTL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum HopOutcome {
    /// A router (or the destination) answered.
    Responded {
        /// The address that answered.
        ip_address: Ipv4Addr,
        /// Private or public.
        class: HopClass,
        /// Round-trip time in milliseconds.
        rtt: f64,
        /// Registry summary, only ever set for public hops.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        annotation: Option<String>,
    },
    /// Nothing matched before the probe timeout.
    TimedOut,
}

/// A single hop in a trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hop {
    /// The TTL for this hop.
    pub ttl: u8,
    #[serde(flatten)]
    pub outcome: HopOutcome,
}

impl Hop {
    /// A hop whose probe was never answered.
    pub fn timed_out(ttl: u8) -> Self {
        Self {
            ttl,
            outcome: HopOutcome::TimedOut,
        }
    }

    /// A hop answered from a private range; never annotated.
    pub fn private(ttl: u8, ip_address: Ipv4Addr, rtt: Duration) -> Self {
        Self {
            ttl,
            outcome: HopOutcome::Responded {
                ip_address,
                class: HopClass::Private,
                rtt: rtt.as_secs_f64() * 1000.0,
                annotation: None,
            },
        }
    }

    /// A hop answered from a public address, with an optional registry summary.
    pub fn public(ttl: u8, ip_address: Ipv4Addr, rtt: Duration, annotation: Option<String>) -> Self {
        Self {
            ttl,
            outcome: HopOutcome::Responded {
                ip_address,
                class: HopClass::Public,
                rtt: rtt.as_secs_f64() * 1000.0,
                annotation,
            },
        }
    }

    /// The responding address, if any.
    pub fn ip_address(&self) -> Option<Ipv4Addr> {
        match &self.outcome {
            HopOutcome::Responded { ip_address, .. } => Some(*ip_address),
            HopOutcome::TimedOut => None,
        }
    }

    pub fn class(&self) -> Option<HopClass> {
        match &self.outcome {
            HopOutcome::Responded { class, .. } => Some(*class),
            HopOutcome::TimedOut => None,
        }
    }

    pub fn annotation(&self) -> Option<&str> {
        match &self.outcome {
            HopOutcome::Responded { annotation, .. } => annotation.as_deref(),
            HopOutcome::TimedOut => None,
        }
    }
}

/// Where a trace stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStatus {
    /// Still probing.
    InProgress,
    /// A hop answered from the destination address.
    Reached,
    /// Every TTL up to the hop budget was probed without reaching the destination.
    Exhausted,
}

/// A complete (or in-progress) trace to one destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    /// Destination as given on the command line.
    pub destination: String,
    /// The address it resolved to.
    pub ip_address: Ipv4Addr,
    /// Upper bound on the TTL.
    pub max_hops: u8,
    /// Hops in TTL order, starting at 1.
    pub hops: Vec<Hop>,
    pub status: TraceStatus,
}

impl Trace {
    pub fn new(destination: impl Into<String>, ip_address: Ipv4Addr, max_hops: u8) -> Self {
        Self {
            destination: destination.into(),
            ip_address,
            max_hops,
            hops: Vec::with_capacity(max_hops as usize),
            status: TraceStatus::InProgress,
        }
    }

    /// Appends the next hop, marking the trace reached if it answered from the destination.
    ///
    /// Hops must arrive with contiguous TTLs starting at 1, and nothing may follow
    /// a terminal hop.
    pub fn push(&mut self, hop: Hop) -> Result<(), TracerouteError> {
        if self.is_terminal() {
            return Err(TracerouteError::Internal(format!(
                "Hop TTL={} added to a finished trace",
                hop.ttl
            )));
        }
        let expected = self.hops.len() + 1;
        if hop.ttl as usize != expected || expected > self.max_hops as usize {
            return Err(TracerouteError::Internal(format!(
                "Hop TTL mismatch: expected {}, got {}",
                expected, hop.ttl
            )));
        }

        let reached = hop.ip_address() == Some(self.ip_address);
        self.hops.push(hop);
        if reached {
            self.status = TraceStatus::Reached;
        } else if self.hops.len() == self.max_hops as usize {
            self.status = TraceStatus::Exhausted;
        }
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.status != TraceStatus::InProgress
    }

    /// Serializes the trace to JSON with indentation.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
