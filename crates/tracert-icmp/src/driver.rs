//! ICMP traceroute driver implementation.

use crate::packet::create_icmp_echo_packet;
use async_trait::async_trait;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::{Duration, Instant};
use tracert_core::{ProbeResponse, TracerouteDriver, TracerouteError};
use tracert_packets::{parse_icmp, EchoIds, IcmpInfo, Sink, Source};
use tracing::{debug, trace};

/// Global echo ID counter for unique IDs across driver instances.
static ECHO_ID_COUNTER: AtomicU16 = AtomicU16::new(1);

/// Gets the next echo ID, mixed with the process id so that concurrent
/// tracers on the same host do not claim each other's replies.
fn next_echo_id() -> u16 {
    let pid = std::process::id() as u16;
    pid.wrapping_add(ECHO_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// ICMP traceroute driver.
pub struct IcmpDriver {
    /// Source IP address written into every probe.
    src_ip: Ipv4Addr,
    /// Target IP address.
    target_ip: Ipv4Addr,
    /// Packet source for receiving.
    source: Box<dyn Source>,
    /// Packet sink for sending.
    sink: Box<dyn Sink>,
    /// Read buffer.
    buffer: Vec<u8>,
    /// Map of TTL to send time for RTT calculation.
    sent_probes: HashMap<u8, Instant>,
    /// Echo ID for this trace session.
    echo_id: u16,
    /// Maximum TTL.
    max_ttl: u8,
}

impl IcmpDriver {
    /// Creates a new ICMP driver.
    pub fn new(
        src_ip: Ipv4Addr,
        target_ip: Ipv4Addr,
        source: Box<dyn Source>,
        sink: Box<dyn Sink>,
        max_ttl: u8,
    ) -> Self {
        Self {
            src_ip,
            target_ip,
            source,
            sink,
            buffer: vec![0u8; 1500],
            sent_probes: HashMap::new(),
            echo_id: next_echo_id(),
            max_ttl,
        }
    }

    /// The echo identifier carried by every probe of this session.
    pub fn echo_id(&self) -> u16 {
        self.echo_id
    }

    fn store_probe(&mut self, ttl: u8) -> Result<(), TracerouteError> {
        // Refuse to store if we would overwrite
        if self.sent_probes.contains_key(&ttl) {
            return Err(TracerouteError::Internal(format!(
                "Tried to send the same probe twice for TTL={}",
                ttl
            )));
        }

        self.sent_probes.insert(ttl, Instant::now());
        Ok(())
    }

    fn get_rtt_from_seq(&self, seq: u16) -> Result<(u8, Duration), TracerouteError> {
        let ttl = u8::try_from(seq)
            .ok()
            .filter(|ttl| (1..=self.max_ttl).contains(ttl))
            .ok_or_else(|| {
                TracerouteError::MalformedPacket(format!("Invalid sequence number {}", seq))
            })?;

        match self.sent_probes.get(&ttl) {
            Some(send_time) => Ok((ttl, send_time.elapsed())),
            None => Err(TracerouteError::MalformedPacket(format!(
                "No probe sent for sequence number {}",
                seq
            ))),
        }
    }

    fn check_echo_id(&self, echo: Option<EchoIds>) -> Result<EchoIds, TracerouteError> {
        let echo = echo.ok_or(TracerouteError::PacketMismatch)?;
        if echo.id != self.echo_id {
            trace!(
                expected = self.echo_id,
                actual = echo.id,
                "Ignored ICMP packet with different echo ID"
            );
            return Err(TracerouteError::PacketMismatch);
        }
        Ok(echo)
    }

    /// Matches a parsed ICMP message against the probes of this session.
    fn handle_icmp(&self, info: IcmpInfo) -> Result<Option<ProbeResponse>, TracerouteError> {
        if info.is_echo_reply() {
            return self.handle_echo_reply(&info);
        }

        if info.is_ttl_exceeded() || info.is_dest_unreachable() {
            return self.handle_icmp_error(&info);
        }

        Err(TracerouteError::PacketMismatch)
    }

    fn handle_echo_reply(&self, info: &IcmpInfo) -> Result<Option<ProbeResponse>, TracerouteError> {
        let echo = self.check_echo_id(info.echo)?;
        let (ttl, rtt) = self.get_rtt_from_seq(echo.seq)?;

        Ok(Some(ProbeResponse {
            ttl,
            ip: info.ip_pair.src_addr,
            rtt,
            is_dest: info.ip_pair.src_addr == self.target_ip,
        }))
    }

    fn handle_icmp_error(&self, info: &IcmpInfo) -> Result<Option<ProbeResponse>, TracerouteError> {
        let quoted = info.icmp_pair.ok_or_else(|| {
            TracerouteError::MalformedPacket("Missing quoted packet".to_string())
        })?;

        // Check that the quoted packet was destined for our target
        if quoted.dst_addr != self.target_ip {
            trace!(
                expected = %self.target_ip,
                actual = %quoted.dst_addr,
                "Ignored ICMP error with different destination"
            );
            return Err(TracerouteError::PacketMismatch);
        }

        // Check that the quoted packet was from us
        if quoted.src_addr != self.src_ip {
            trace!(
                expected = %self.src_ip,
                actual = %quoted.src_addr,
                "Ignored ICMP error with different source"
            );
            return Err(TracerouteError::PacketMismatch);
        }

        let echo = self.check_echo_id(info.echo)?;
        let (ttl, rtt) = self.get_rtt_from_seq(echo.seq)?;
        trace!(
            ttl = ttl,
            kind = ?info.kind,
            code = info.icmp_code,
            from = %info.ip_pair.src_addr,
            "Matched ICMP error to probe"
        );

        Ok(Some(ProbeResponse {
            ttl,
            ip: info.ip_pair.src_addr,
            rtt,
            is_dest: false,
        }))
    }
}

#[async_trait]
impl TracerouteDriver for IcmpDriver {
    async fn send_probe(&mut self, ttl: u8) -> Result<(), TracerouteError> {
        if ttl == 0 || ttl > self.max_ttl {
            return Err(TracerouteError::Internal(format!(
                "Asked to send invalid TTL {}",
                ttl
            )));
        }

        self.store_probe(ttl)?;

        let packet = create_icmp_echo_packet(self.src_ip, self.target_ip, ttl, self.echo_id)?;

        trace!(
            ttl = ttl,
            echo_id = self.echo_id,
            "Sending ICMP Echo Request probe"
        );

        self.sink.write_to(&packet, self.target_ip).await
    }

    async fn receive_probe(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<ProbeResponse>, TracerouteError> {
        let deadline = Instant::now() + timeout;
        self.source.set_read_deadline(deadline)?;

        let n = self.source.read(&mut self.buffer).await?;

        let info = match parse_icmp(&self.buffer[..n]) {
            Ok(info) => info,
            Err(e) => {
                debug!(error = %e, "Failed to parse packet");
                return Err(e);
            }
        };

        self.handle_icmp(info)
    }

    async fn close(&mut self) -> Result<(), TracerouteError> {
        let sink_result = self.sink.close().await;
        let source_result = self.source.close().await;

        sink_result?;
        source_result?;

        Ok(())
    }
}
