//! ICMP reply parsing using etherparse.

use etherparse::{Icmpv4Slice, Icmpv4Type, IpNumber, Ipv4HeaderSlice};
use std::net::Ipv4Addr;
use tracert_core::TracerouteError;

/// ICMP type of an echo request.
const ICMP_ECHO_REQUEST: u8 = 8;
/// Length of the ICMP header that routers quote back after the IP header.
const ICMP_HEADER_LEN: usize = 8;

/// IP source/destination pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpPair {
    /// Source IP address.
    pub src_addr: Ipv4Addr,
    /// Destination IP address.
    pub dst_addr: Ipv4Addr,
}

/// Identifier/sequence pair of an echo request or reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoIds {
    pub id: u16,
    pub seq: u16,
}

/// The ICMP messages a trace cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IcmpKind {
    /// Echo reply from the destination.
    EchoReply,
    /// A router dropped the probe because its TTL ran out.
    TimeExceeded,
    /// A router could not deliver the probe.
    DestinationUnreachable,
    /// Anything else, by ICMP type.
    Other(u8),
}

/// Parsed ICMP information from a packet.
#[derive(Debug, Clone)]
pub struct IcmpInfo {
    pub kind: IcmpKind,
    /// ICMP code.
    pub icmp_code: u8,
    /// Source/dest IPs from the outer IP header.
    pub ip_pair: IpPair,
    /// Echo id/seq: from the reply itself for echo replies, from the quoted
    /// echo request for error messages.
    pub echo: Option<EchoIds>,
    /// Source/dest IPs of the quoted packet, for error messages.
    pub icmp_pair: Option<IpPair>,
}

impl IcmpInfo {
    pub fn is_echo_reply(&self) -> bool {
        self.kind == IcmpKind::EchoReply
    }

    pub fn is_ttl_exceeded(&self) -> bool {
        self.kind == IcmpKind::TimeExceeded
    }

    pub fn is_dest_unreachable(&self) -> bool {
        self.kind == IcmpKind::DestinationUnreachable
    }
}

/// Parses a raw packet buffer (starting from the IPv4 header) as an ICMP message.
///
/// Non-ICMP packets are reported as [`TracerouteError::PacketMismatch`].
pub fn parse_icmp(data: &[u8]) -> Result<IcmpInfo, TracerouteError> {
    let ip = Ipv4HeaderSlice::from_slice(data).map_err(|e| TracerouteError::PacketParseFailed {
        layer: "IPv4",
        reason: e.to_string(),
    })?;

    if ip.protocol() != IpNumber::ICMP {
        return Err(TracerouteError::PacketMismatch);
    }

    let ip_pair = IpPair {
        src_addr: ip.source_addr(),
        dst_addr: ip.destination_addr(),
    };

    let icmp = Icmpv4Slice::from_slice(&data[ip.slice().len()..]).map_err(|e| {
        TracerouteError::PacketParseFailed {
            layer: "ICMP",
            reason: e.to_string(),
        }
    })?;

    let (kind, icmp_code) = match icmp.icmp_type() {
        Icmpv4Type::EchoReply(echo) => {
            return Ok(IcmpInfo {
                kind: IcmpKind::EchoReply,
                icmp_code: 0,
                ip_pair,
                echo: Some(EchoIds {
                    id: echo.id,
                    seq: echo.seq,
                }),
                icmp_pair: None,
            });
        }
        Icmpv4Type::TimeExceeded(code) => (IcmpKind::TimeExceeded, code.code_u8()),
        Icmpv4Type::DestinationUnreachable(header) => {
            (IcmpKind::DestinationUnreachable, header.code_u8())
        }
        _ => (IcmpKind::Other(icmp.type_u8()), icmp.code_u8()),
    };

    if let IcmpKind::Other(_) = kind {
        return Ok(IcmpInfo {
            kind,
            icmp_code,
            ip_pair,
            echo: None,
            icmp_pair: None,
        });
    }

    let (icmp_pair, echo) = parse_quoted_packet(icmp.payload())?;
    Ok(IcmpInfo {
        kind,
        icmp_code,
        ip_pair,
        echo,
        icmp_pair: Some(icmp_pair),
    })
}

/// Parses the IPv4 header and first 8 bytes that an ICMP error quotes back.
///
/// Routers only quote the start of the original datagram, so the quoted header
/// is parsed on its own without checking its total length.
fn parse_quoted_packet(payload: &[u8]) -> Result<(IpPair, Option<EchoIds>), TracerouteError> {
    let inner = Ipv4HeaderSlice::from_slice(payload).map_err(|e| {
        TracerouteError::PacketParseFailed {
            layer: "Inner IPv4",
            reason: e.to_string(),
        }
    })?;

    let pair = IpPair {
        src_addr: inner.source_addr(),
        dst_addr: inner.destination_addr(),
    };

    let quoted = &payload[inner.slice().len()..];
    if inner.protocol() != IpNumber::ICMP || quoted.len() < ICMP_HEADER_LEN {
        return Ok((pair, None));
    }

    // Type(1) + Code(1) + Checksum(2) + ID(2) + Seq(2)
    if quoted[0] != ICMP_ECHO_REQUEST {
        return Ok((pair, None));
    }

    let echo = EchoIds {
        id: u16::from_be_bytes([quoted[4], quoted[5]]),
        seq: u16::from_be_bytes([quoted[6], quoted[7]]),
    };
    Ok((pair, Some(echo)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pnet_packet::icmp::{checksum as icmp_checksum, IcmpPacket};
    use pnet_packet::ipv4::{checksum as ipv4_checksum, Ipv4Packet};

    const ME: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 10);
    const TARGET: Ipv4Addr = Ipv4Addr::new(8, 8, 8, 8);
    const ROUTER: Ipv4Addr = Ipv4Addr::new(203, 0, 113, 1);

    /// Builds a 20-byte IPv4 header with valid checksum.
    fn ipv4_header(src: Ipv4Addr, dst: Ipv4Addr, protocol: u8, total_len: u16) -> Vec<u8> {
        let mut header = vec![0u8; 20];
        header[0] = 0x45;
        header[2..4].copy_from_slice(&total_len.to_be_bytes());
        header[8] = 64;
        header[9] = protocol;
        header[12..16].copy_from_slice(&src.octets());
        header[16..20].copy_from_slice(&dst.octets());
        let sum = ipv4_checksum(&Ipv4Packet::new(&header).unwrap());
        header[10..12].copy_from_slice(&sum.to_be_bytes());
        header
    }

    fn icmp_message(icmp_type: u8, code: u8, rest: [u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut icmp = vec![icmp_type, code, 0, 0];
        icmp.extend_from_slice(&rest);
        icmp.extend_from_slice(payload);
        let sum = icmp_checksum(&IcmpPacket::new(&icmp).unwrap());
        icmp[2..4].copy_from_slice(&sum.to_be_bytes());
        icmp
    }

    fn frame(src: Ipv4Addr, dst: Ipv4Addr, icmp: Vec<u8>) -> Vec<u8> {
        let mut packet = ipv4_header(src, dst, 1, (20 + icmp.len()) as u16);
        packet.extend(icmp);
        packet
    }

    fn id_seq(id: u16, seq: u16) -> [u8; 4] {
        let id = id.to_be_bytes();
        let seq = seq.to_be_bytes();
        [id[0], id[1], seq[0], seq[1]]
    }

    #[test]
    fn test_parse_echo_reply() {
        let packet = frame(TARGET, ME, icmp_message(0, 0, id_seq(0xBEEF, 7), &[7]));
        let info = parse_icmp(&packet).unwrap();

        assert!(info.is_echo_reply());
        assert_eq!(info.ip_pair.src_addr, TARGET);
        assert_eq!(info.ip_pair.dst_addr, ME);
        assert_eq!(info.echo, Some(EchoIds { id: 0xBEEF, seq: 7 }));
        assert!(info.icmp_pair.is_none());
    }

    #[test]
    fn test_parse_time_exceeded() {
        // Quoted datagram: original IPv4 header + first 8 bytes of the echo request
        let mut quoted = ipv4_header(ME, TARGET, 1, 29);
        quoted.extend_from_slice(&[8, 0, 0x12, 0x34]);
        quoted.extend_from_slice(&id_seq(0xBEEF, 3));

        let packet = frame(ROUTER, ME, icmp_message(11, 0, [0; 4], &quoted));
        let info = parse_icmp(&packet).unwrap();

        assert!(info.is_ttl_exceeded());
        assert_eq!(info.icmp_code, 0);
        assert_eq!(info.ip_pair.src_addr, ROUTER);
        assert_eq!(
            info.icmp_pair,
            Some(IpPair {
                src_addr: ME,
                dst_addr: TARGET
            })
        );
        assert_eq!(info.echo, Some(EchoIds { id: 0xBEEF, seq: 3 }));
    }

    #[test]
    fn test_parse_time_exceeded_for_other_protocol() {
        // A quoted UDP datagram carries no echo ids
        let mut quoted = ipv4_header(ME, TARGET, 17, 28);
        quoted.extend_from_slice(&[0x82, 0x9A, 0x82, 0x9A, 0, 8, 0, 0]);

        let packet = frame(ROUTER, ME, icmp_message(11, 0, [0; 4], &quoted));
        let info = parse_icmp(&packet).unwrap();

        assert!(info.is_ttl_exceeded());
        assert!(info.echo.is_none());
    }

    #[test]
    fn test_parse_other_icmp() {
        // Echo request seen on the wire (e.g. someone pinging us)
        let packet = frame(ROUTER, ME, icmp_message(8, 0, id_seq(1, 1), &[]));
        let info = parse_icmp(&packet).unwrap();
        assert_eq!(info.kind, IcmpKind::Other(8));
        assert!(info.echo.is_none());
    }

    #[test]
    fn test_non_icmp_is_mismatch() {
        let mut packet = ipv4_header(ROUTER, ME, 17, 28);
        packet.extend_from_slice(&[0; 8]);
        assert!(matches!(
            parse_icmp(&packet),
            Err(TracerouteError::PacketMismatch)
        ));
    }

    #[test]
    fn test_truncated_packet_is_retryable() {
        let err = parse_icmp(&[0x45, 0, 0]).unwrap_err();
        assert!(err.is_retryable());
    }
}
