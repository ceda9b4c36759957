//! Request identifier generation.
//!
//! Ids have the shape `{process}-{host}-{unix_secs}.{nanos}.{seq}.{rand}`:
//! the process name and host address say where the request entered, the
//! timestamp orders ids, the per-process sequence keeps ids from one process
//! distinct even when the clock does not advance, and the random suffix
//! separates processes that share a name and host.

use chrono::Utc;
use rand::Rng;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU32, Ordering};

static SEQUENCE: AtomicU32 = AtomicU32::new(0);
static HOST: OnceLock<String> = OnceLock::new();

/// Generate a new request id for `process_name` on `host`.
#[must_use]
pub fn generate(process_name: &str, host: &str) -> String {
    let now = Utc::now();
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let disambiguator: u16 = rand::thread_rng().gen_range(0..1000);
    format!(
        "{process_name}-{host}-{}.{:09}.{seq}.{disambiguator:03}",
        now.timestamp(),
        now.timestamp_subsec_nanos()
    )
}

/// Address of this host, resolved once per process.
///
/// Empty when no private IPv4 address can be found.
pub fn local_host() -> &'static str {
    HOST.get_or_init(|| local_ipv4().map(|ip| ip.to_string()).unwrap_or_default())
}

/// First private, non-loopback IPv4 address used for outbound traffic.
///
/// Connecting a UDP socket sends nothing; it only asks the OS which local
/// address would route to the target.
fn local_ipv4() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect((Ipv4Addr::new(10, 254, 254, 254), 1)).ok()?;
    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(ip) if is_private_candidate(ip) => Some(ip),
        _ => None,
    }
}

/// Addresses in the 10/8, 172/8 and 192/8 ranges, loopback excluded.
const fn is_private_candidate(ip: Ipv4Addr) -> bool {
    if ip.is_loopback() || ip.is_unspecified() {
        return false;
    }
    matches!(ip.octets()[0], 10 | 172 | 192)
}
