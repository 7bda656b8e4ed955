//! ICMP packet construction using pnet.

use pnet_packet::icmp::echo_request::MutableEchoRequestPacket;
use pnet_packet::icmp::{IcmpCode, IcmpTypes, MutableIcmpPacket};
use pnet_packet::ip::IpNextHeaderProtocols;
use pnet_packet::ipv4::{Ipv4Flags, MutableIpv4Packet};
use std::net::Ipv4Addr;
use tracert_core::TracerouteError;

/// Size of an option-less IPv4 header.
pub const IPV4_HEADER_LEN: usize = 20;
/// Size of the ICMP echo header.
pub const ICMP_HEADER_LEN: usize = 8;

/// Creates an IPv4 packet carrying an ICMP Echo Request for one hop.
///
/// The IP TTL is `ttl`, the echo identifier is `echo_id` and the echo sequence
/// number is the TTL, so a reply (or the request quoted in a Time Exceeded)
/// identifies the probe it answers. Both checksums are filled in.
pub fn create_icmp_echo_packet(
    src_ip: Ipv4Addr,
    dst_ip: Ipv4Addr,
    ttl: u8,
    echo_id: u16,
) -> Result<Vec<u8>, TracerouteError> {
    // ICMP Echo Request: 8 bytes header + 1 byte payload (ttl)
    let icmp_len = ICMP_HEADER_LEN + 1;
    let ip_len = IPV4_HEADER_LEN + icmp_len;

    let mut buffer = vec![0u8; ip_len];

    {
        let mut ip_packet = MutableIpv4Packet::new(&mut buffer)
            .ok_or_else(|| TracerouteError::Internal("Failed to create IP packet".to_string()))?;

        ip_packet.set_version(4);
        ip_packet.set_header_length(5);
        ip_packet.set_total_length(ip_len as u16);
        ip_packet.set_identification(echo_id);
        ip_packet.set_flags(Ipv4Flags::DontFragment);
        ip_packet.set_ttl(ttl);
        ip_packet.set_next_level_protocol(IpNextHeaderProtocols::Icmp);
        ip_packet.set_source(src_ip);
        ip_packet.set_destination(dst_ip);

        let ip_checksum = pnet_packet::ipv4::checksum(&ip_packet.to_immutable());
        ip_packet.set_checksum(ip_checksum);
    }

    {
        let mut echo = MutableEchoRequestPacket::new(&mut buffer[IPV4_HEADER_LEN..])
            .ok_or_else(|| TracerouteError::Internal("Failed to create ICMP packet".to_string()))?;

        echo.set_icmp_type(IcmpTypes::EchoRequest);
        echo.set_icmp_code(IcmpCode::new(0));
        echo.set_identifier(echo_id);
        echo.set_sequence_number(ttl as u16);
        echo.set_payload(&[ttl]);
    }

    {
        let mut icmp = MutableIcmpPacket::new(&mut buffer[IPV4_HEADER_LEN..])
            .ok_or_else(|| TracerouteError::Internal("Failed to create ICMP view".to_string()))?;
        let icmp_checksum = pnet_packet::icmp::checksum(&icmp.to_immutable());
        icmp.set_checksum(icmp_checksum);
    }

    Ok(buffer)
}
