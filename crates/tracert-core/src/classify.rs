//! Hop classification.

use crate::HopClass;
use std::net::Ipv4Addr;

/// Classifies a responding address.
///
/// 10/8, 172.16/12, 192.168/16, loopback (127/8) and link-local (169.254/16)
/// are private; everything else is public.
pub fn classify(ip: Ipv4Addr) -> HopClass {
    if is_private_ip(ip) {
        HopClass::Private
    } else {
        HopClass::Public
    }
}

/// Check if an IP address is private.
pub fn is_private_ip(ip: Ipv4Addr) -> bool {
    ip.is_private() || ip.is_loopback() || ip.is_link_local()
}
