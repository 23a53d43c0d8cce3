use std::io::{self, Write};
use std::os::fd::AsRawFd;
use std::time::Instant;

use mio::net::{TcpListener, TcpStream};
use mio::{Interest, Token};
use tracing::{info, warn};

use crate::config::Limits;
use crate::http::response::{StatusCode, error_response};
use crate::transaction::Transaction;
use crate::transaction::registry::{Admission, Registry};

/// Drains the listening socket on a readiness edge, turning each accepted
/// connection into a registered transaction.
pub fn accept_ready(
    poll: &mio::Registry,
    listener: &mut TcpListener,
    registry: &mut Registry<TcpStream>,
    limits: &Limits,
) {
    loop {
        match listener.accept() {
            Ok((stream, peer)) => admit(poll, registry, stream, limits, peer),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(error = %e, "accept failed");
                return;
            }
        }
    }
}

fn admit(
    poll: &mio::Registry,
    registry: &mut Registry<TcpStream>,
    stream: TcpStream,
    limits: &Limits,
    peer: std::net::SocketAddr,
) {
    let descriptor = stream.as_raw_fd() as usize;
    let txn = Transaction::new(stream, descriptor, limits.max_buffer);

    match registry.allocate(txn, Instant::now()) {
        Admission::Accepted { evicted } => {
            if let Some(mut old) = evicted {
                let _ = poll.deregister(&mut old.stream);
                info!(descriptor = old.descriptor, "evicted idle transaction");
            }
            // Registration follows insertion so that a refused connection
            // never touches the multiplexer.
            if let Some(txn) = registry.lookup(descriptor) {
                if let Err(e) =
                    poll.register(&mut txn.stream, Token(descriptor), Interest::READABLE)
                {
                    warn!(%peer, error = %e, "cannot register connection");
                    registry.release(descriptor);
                    return;
                }
            }
            info!(%peer, descriptor, "accepted connection");
        }
        Admission::Refused(mut txn) => {
            warn!(%peer, "transaction table full; refusing connection");
            // One best-effort write so a fast client sees a well-formed
            // refusal; dropping the record closes the socket.
            let _ = txn
                .stream
                .write(&error_response(StatusCode::ServiceUnavailable, "server too busy"));
        }
    }
}
