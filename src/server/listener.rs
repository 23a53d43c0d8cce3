use std::net::SocketAddr;

use anyhow::Context;
use mio::net::TcpListener;

/// Binds the non-blocking listening socket on all interfaces.
pub fn bind(port: u16) -> anyhow::Result<TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    TcpListener::bind(addr).with_context(|| format!("cannot listen on port {port}"))
}
