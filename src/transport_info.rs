//! TCP-level transport sampling (spec §4.5, C5).
//!
//! Grounded directly on `proxygen/lib/services/TransportInfo.cpp`:
//! `initWithSocket` samples `TCP_INFO` via `getsockopt` on Linux/FreeBSD and
//! falls back to an invalid, `rtt = -1` reading everywhere else.

use std::time::Duration;

/// A point-in-time snapshot of a TCP connection's kernel-reported stats.
/// `valid` mirrors proxygen's `validTcpinfo`: `false` means `rtt` (and any
/// other field) could not be sampled and must not be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportInfo {
    pub rtt: Option<Duration>,
    pub valid: bool,
}

impl TransportInfo {
    /// An unsampled reading — what a connection has before its first
    /// `sample` call, or on a platform with no `TCP_INFO` support.
    pub const fn invalid() -> Self {
        Self { rtt: None, valid: false }
    }

    /// Samples `TCP_INFO` for the socket behind `fd`. Mirrors
    /// `TransportInfo::initWithSocket`: success sets `valid` and `rtt` from
    /// `tcpi_rtt`; failure (including "not supported on this platform")
    /// yields [`Self::invalid`]. Takes a raw descriptor rather than a
    /// concrete stream type so it works the same for `std::net::TcpStream`
    /// and `mio::net::TcpStream` alike, matching proxygen's
    /// `initWithSocket(int fd)`.
    #[cfg(target_os = "linux")]
    pub fn sample(fd: std::os::unix::io::RawFd) -> Self {
        use std::mem;

        let mut info: libc::tcp_info = unsafe { mem::zeroed() };
        let mut len = mem::size_of::<libc::tcp_info>() as libc::socklen_t;
        let rc = unsafe {
            libc::getsockopt(
                fd,
                libc::IPPROTO_TCP,
                libc::TCP_INFO,
                &mut info as *mut _ as *mut libc::c_void,
                &mut len,
            )
        };
        if rc < 0 {
            return Self::invalid();
        }
        Self {
            rtt: Some(Duration::from_micros(info.tcpi_rtt as u64)),
            valid: true,
        }
    }

    #[cfg(not(target_os = "linux"))]
    pub fn sample(_fd: i32) -> Self {
        Self::invalid()
    }
}

impl Default for TransportInfo {
    fn default() -> Self {
        Self::invalid()
    }
}
