//! IANA special-purpose IPv4 blocks that registries hold no data for.

use crate::RegistryError;
use ipnet::Ipv4Net;
use std::net::Ipv4Addr;

/// Special-purpose blocks and their IANA names.
const BOGONS: &[(Ipv4Net, &str)] = &[
    (Ipv4Net::new_assert(Ipv4Addr::new(0, 0, 0, 0), 8), "This Network"),
    (Ipv4Net::new_assert(Ipv4Addr::new(10, 0, 0, 0), 8), "Private-Use Networks"),
    (Ipv4Net::new_assert(Ipv4Addr::new(100, 64, 0, 0), 10), "Shared Address Space"),
    (Ipv4Net::new_assert(Ipv4Addr::new(127, 0, 0, 0), 8), "Loopback"),
    (Ipv4Net::new_assert(Ipv4Addr::new(169, 254, 0, 0), 16), "Link Local"),
    (Ipv4Net::new_assert(Ipv4Addr::new(172, 16, 0, 0), 12), "Private-Use Networks"),
    (Ipv4Net::new_assert(Ipv4Addr::new(192, 0, 0, 0), 24), "IETF Protocol Assignments"),
    (Ipv4Net::new_assert(Ipv4Addr::new(192, 0, 2, 0), 24), "TEST-NET-1"),
    (Ipv4Net::new_assert(Ipv4Addr::new(192, 88, 99, 0), 24), "6to4 Relay Anycast"),
    (Ipv4Net::new_assert(Ipv4Addr::new(192, 168, 0, 0), 16), "Private-Use Networks"),
    (Ipv4Net::new_assert(Ipv4Addr::new(198, 18, 0, 0), 15), "Network Interconnect Device Benchmark Testing"),
    (Ipv4Net::new_assert(Ipv4Addr::new(198, 51, 100, 0), 24), "TEST-NET-2"),
    (Ipv4Net::new_assert(Ipv4Addr::new(203, 0, 113, 0), 24), "TEST-NET-3"),
    (Ipv4Net::new_assert(Ipv4Addr::new(224, 0, 0, 0), 4), "Multicast"),
    (Ipv4Net::new_assert(Ipv4Addr::new(240, 0, 0, 0), 4), "Reserved for Future Use"),
    (Ipv4Net::new_assert(Ipv4Addr::new(255, 255, 255, 255), 32), "Limited Broadcast"),
];

/// Returns the name of the most specific special-purpose block `ip` falls
/// in, if any.
pub fn special_purpose_block(ip: Ipv4Addr) -> Option<&'static str> {
    BOGONS
        .iter()
        .filter(|(net, _)| net.contains(&ip))
        .max_by_key(|(net, _)| net.prefix_len())
        .map(|(_, name)| *name)
}

/// Fails with [`RegistryError::Bogon`] for special-purpose addresses.
pub fn check_bogon(ip: Ipv4Addr) -> Result<(), RegistryError> {
    match special_purpose_block(ip) {
        Some(range) => Err(RegistryError::Bogon { addr: ip, range }),
        None => Ok(()),
    }
}
