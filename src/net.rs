// ABOUTME: Local network helpers.
// ABOUTME: Finds an unused TCP port by letting the OS assign one.

use crate::error::Result;
use std::net::{Ipv4Addr, TcpListener};

/// Return a TCP port that was free at the time of the call.
///
/// The listener is released before returning, so another process may claim
/// the port before the caller binds it.
pub fn free_port() -> Result<u16> {
    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    let port = listener.local_addr()?.port();
    drop(listener);
    tracing::debug!("Found free port {}", port);
    Ok(port)
}
