//! Linux packet I/O over a raw ICMP socket.

use crate::{Sink, Source, SourceSinkHandle};
use async_trait::async_trait;
use std::io;
use std::net::Ipv4Addr;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::unix::AsyncFd;
use tracert_core::TracerouteError;
use tracing::trace;

/// A raw `IPPROTO_ICMP` socket with `IP_HDRINCL` set.
///
/// Reads return every ICMP packet delivered to the host, IPv4 header included.
/// Writes take a complete IPv4 packet; the kernel fills in the header checksum
/// and identification only when they are zero.
pub struct RawIcmpSocket {
    fd: AsyncFd<OwnedFd>,
}

impl RawIcmpSocket {
    /// Opens the socket. Requires `CAP_NET_RAW` (or root).
    pub fn open() -> Result<Self, TracerouteError> {
        let fd = unsafe {
            libc::socket(
                libc::AF_INET,
                libc::SOCK_RAW | libc::SOCK_NONBLOCK | libc::SOCK_CLOEXEC,
                libc::IPPROTO_ICMP,
            )
        };

        if fd < 0 {
            let err = io::Error::last_os_error();
            return Err(match err.kind() {
                io::ErrorKind::PermissionDenied => TracerouteError::PermissionDenied(err),
                _ => TracerouteError::SocketCreation(err),
            });
        }

        let fd = unsafe { OwnedFd::from_raw_fd(fd) };

        // Set IP_HDRINCL so we write the IP header ourselves
        let one: libc::c_int = 1;
        let result = unsafe {
            libc::setsockopt(
                fd.as_raw_fd(),
                libc::IPPROTO_IP,
                libc::IP_HDRINCL,
                &one as *const _ as *const libc::c_void,
                std::mem::size_of::<libc::c_int>() as libc::socklen_t,
            )
        };

        if result < 0 {
            return Err(TracerouteError::Internal(format!(
                "Failed to set IP_HDRINCL: {}",
                io::Error::last_os_error()
            )));
        }

        let fd = AsyncFd::try_new(fd)
            .map_err(|e| TracerouteError::SocketCreation(e.into_parts().1))?;
        Ok(Self { fd })
    }

    /// Receives one packet, waiting until the socket is readable.
    pub async fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let mut guard = self.fd.readable().await?;
            let result = guard.try_io(|inner| {
                let n = unsafe {
                    libc::recv(
                        inner.as_raw_fd(),
                        buf.as_mut_ptr() as *mut libc::c_void,
                        buf.len(),
                        0,
                    )
                };
                if n < 0 {
                    Err(io::Error::last_os_error())
                } else {
                    Ok(n as usize)
                }
            });

            match result {
                Ok(result) => return result,
                Err(_would_block) => continue,
            }
        }
    }

    /// Sends a complete IPv4 packet to `addr`.
    pub async fn send_to(&self, buf: &[u8], addr: Ipv4Addr) -> io::Result<()> {
        let mut sa: libc::sockaddr_in = unsafe { std::mem::zeroed() };
        sa.sin_family = libc::AF_INET as libc::sa_family_t;
        sa.sin_addr.s_addr = u32::from_ne_bytes(addr.octets());

        loop {
            let mut guard = self.fd.writable().await?;
            let result = guard.try_io(|inner| {
                let n = unsafe {
                    libc::sendto(
                        inner.as_raw_fd(),
                        buf.as_ptr() as *const libc::c_void,
                        buf.len(),
                        0,
                        &sa as *const libc::sockaddr_in as *const libc::sockaddr,
                        std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
                    )
                };
                if n < 0 {
                    Err(io::Error::last_os_error())
                } else {
                    Ok(())
                }
            });

            match result {
                Ok(result) => return result,
                Err(_would_block) => continue,
            }
        }
    }
}

/// Read half of the shared raw socket.
pub struct RawSource {
    socket: Arc<RawIcmpSocket>,
    read_deadline: Option<Instant>,
}

#[async_trait]
impl Source for RawSource {
    fn set_read_deadline(&mut self, deadline: Instant) -> Result<(), TracerouteError> {
        self.read_deadline = Some(deadline);
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, TracerouteError> {
        let Some(deadline) = self.read_deadline else {
            return self.socket.recv(buf).await.map_err(TracerouteError::from);
        };

        let deadline = tokio::time::Instant::from_std(deadline);
        match tokio::time::timeout_at(deadline, self.socket.recv(buf)).await {
            Ok(Ok(n)) => {
                trace!(len = n, "Read packet");
                Ok(n)
            }
            Ok(Err(e)) => Err(TracerouteError::from(e)),
            Err(_) => Err(TracerouteError::ReadTimeout),
        }
    }

    async fn close(&mut self) -> Result<(), TracerouteError> {
        // The fd is closed when the last half is dropped
        Ok(())
    }
}

/// Write half of the shared raw socket.
pub struct RawSink {
    socket: Arc<RawIcmpSocket>,
}

#[async_trait]
impl Sink for RawSink {
    async fn write_to(&mut self, buf: &[u8], addr: Ipv4Addr) -> Result<(), TracerouteError> {
        self.socket
            .send_to(buf, addr)
            .await
            .map_err(TracerouteError::WriteFailed)
    }

    async fn close(&mut self) -> Result<(), TracerouteError> {
        Ok(())
    }
}

/// Opens the raw socket and returns both halves.
pub fn new_source_sink() -> Result<SourceSinkHandle, TracerouteError> {
    let socket = Arc::new(RawIcmpSocket::open()?);

    Ok(SourceSinkHandle {
        source: Box::new(RawSource {
            socket: Arc::clone(&socket),
            read_deadline: None,
        }),
        sink: Box::new(RawSink { socket }),
    })
}
