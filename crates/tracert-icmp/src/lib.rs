//! ICMP probing for tracert-as.

mod driver;
mod packet;

pub use driver::IcmpDriver;
pub use packet::{create_icmp_echo_packet, ICMP_HEADER_LEN, IPV4_HEADER_LEN};
