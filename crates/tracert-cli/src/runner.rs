//! Runner that wires resolution, the raw socket, enrichment and output together.

use hickory_resolver::TokioResolver;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use tracert_core::{
    HopEnricher, HopSink, JsonRenderer, NoEnrichment, TextRenderer, Trace, TraceOrchestrator,
    TraceParams, TracerouteDriver, TracerouteError,
};
use tracert_icmp::IcmpDriver;
use tracert_packets::new_source_sink;
use tracert_registry::RegistryEnricher;
use tracing::{debug, info, warn};

/// Everything one invocation needs.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Destination exactly as typed.
    pub destination: String,
    pub params: TraceParams,
    /// Annotate public hops with registry data.
    pub lookup: bool,
    /// Emit JSON instead of the streaming text format.
    pub json: bool,
}

/// Get the local IP address the kernel would use to reach `target`.
///
/// Connecting a UDP socket only consults the routing table; nothing is sent.
fn get_local_addr(target: Ipv4Addr) -> Result<Ipv4Addr, TracerouteError> {
    let socket = UdpSocket::bind("0.0.0.0:0").map_err(TracerouteError::SocketCreation)?;

    socket
        .connect(SocketAddr::new(IpAddr::V4(target), 33434))
        .map_err(TracerouteError::SocketCreation)?;

    match socket.local_addr().map_err(TracerouteError::SocketCreation)?.ip() {
        IpAddr::V4(ip) => Ok(ip),
        IpAddr::V6(ip) => Err(TracerouteError::Internal(format!(
            "Unexpected IPv6 source address {ip}"
        ))),
    }
}

/// Parses an address literal.
///
/// Only the standard forms are literals: dotted-quad IPv4 and IPv6. Shorthand
/// such as `127.1` or `0x7f.1` is treated as a hostname.
fn parse_literal(hostname: &str) -> Option<IpAddr> {
    hostname.parse().ok()
}

/// Resolve a hostname or literal to a single IPv4 address.
pub async fn resolve_hostname(hostname: &str) -> Result<Ipv4Addr, TracerouteError> {
    if let Some(ip) = parse_literal(hostname) {
        return match ip {
            IpAddr::V4(ip) => Ok(ip),
            IpAddr::V6(_) => Err(TracerouteError::resolution(
                hostname,
                "IPv6 destinations are not supported",
            )),
        };
    }

    let resolver = TokioResolver::builder_tokio()
        .map_err(|e| TracerouteError::resolution(hostname, e))?
        .build();

    let lookup = resolver
        .ipv4_lookup(hostname)
        .await
        .map_err(|e| TracerouteError::resolution(hostname, e))?;

    lookup
        .iter()
        .next()
        .map(|a| a.0)
        .ok_or_else(|| TracerouteError::resolution(hostname, "no IPv4 address found"))
}

fn build_enricher(config: &RunConfig) -> Box<dyn HopEnricher> {
    if !config.lookup {
        return Box::new(NoEnrichment);
    }

    match RegistryEnricher::new(config.params.lookup_timeout) {
        Ok(enricher) => Box::new(enricher),
        Err(e) => {
            warn!(error = %e, "Registry lookups unavailable, continuing without annotations");
            Box::new(NoEnrichment)
        }
    }
}

/// Run one trace, writing hops to stdout as they are discovered.
pub async fn run(config: RunConfig) -> Result<Trace, TracerouteError> {
    let target_ip = resolve_hostname(&config.destination).await?;
    debug!(destination = %config.destination, ip = %target_ip, "Resolved destination");

    let orchestrator = TraceOrchestrator::new(config.params, build_enricher(&config))?;

    let handle = new_source_sink()?;
    let src_ip = get_local_addr(target_ip)?;
    debug!(src = %src_ip, "Using local address");

    let mut driver = IcmpDriver::new(
        src_ip,
        target_ip,
        handle.source,
        handle.sink,
        config.params.max_hops,
    );

    info!(
        destination = %config.destination,
        ip = %target_ip,
        max_hops = config.params.max_hops,
        "Starting trace"
    );

    let mut sink: Box<dyn HopSink> = if config.json {
        Box::new(JsonRenderer::new(std::io::stdout()))
    } else {
        Box::new(TextRenderer::new(std::io::stdout()))
    };

    let outcome = orchestrator
        .run(&mut driver, &config.destination, target_ip, sink.as_mut())
        .await;

    if let Err(e) = driver.close().await {
        debug!(error = %e, "Failed to close driver");
    }

    outcome
}
