use std::io;
use std::time::Instant;

use anyhow::Context;
use mio::net::{TcpListener, TcpStream};
use mio::{Events, Poll, Token};
use tracing::{debug, info};

use crate::config::Config;
use crate::server::{acceptor, listener};
use crate::transaction::record::Interest;
use crate::transaction::{Progress, Registry};

const LISTENER: Token = Token(usize::MAX);

/// The event dispatcher: owns the multiplexer, the listener, and the
/// transaction registry, and demultiplexes readiness events to the
/// acceptor or to a transaction's state machine.
pub struct Server {
    poll: Poll,
    listener: TcpListener,
    registry: Registry<TcpStream>,
    config: Config,
}

impl Server {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let poll = Poll::new().context("cannot create readiness multiplexer")?;
        let mut listener = listener::bind(config.port)?;
        poll.registry()
            .register(&mut listener, LISTENER, mio::Interest::READABLE)
            .context("cannot register listening socket")?;
        let registry = Registry::new(config.limits.max_transactions, config.limits.idle_timeout);

        Ok(Self {
            poll,
            listener,
            registry,
            config,
        })
    }

    /// Runs the dispatch loop until a fatal signal interrupts the wait.
    pub fn run(&mut self) -> anyhow::Result<()> {
        let mut events = Events::with_capacity(self.config.limits.max_events);
        info!(port = self.config.port, "server up and running");

        loop {
            match self.poll.poll(&mut events, None) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                    info!("interrupted; shutting down");
                    return Ok(());
                }
                Err(e) => return Err(e).context("multiplexer wait failed"),
            }

            for event in events.iter() {
                match event.token() {
                    LISTENER => acceptor::accept_ready(
                        self.poll.registry(),
                        &mut self.listener,
                        &mut self.registry,
                        &self.config.limits,
                    ),
                    Token(descriptor) => self.drive(descriptor, event),
                }
            }
        }
    }

    /// Routes one readiness event into the descriptor's state machine.
    fn drive(&mut self, descriptor: usize, event: &mio::event::Event) {
        self.registry.touch(descriptor, Instant::now());
        let Some(txn) = self.registry.lookup(descriptor) else {
            // Torn down earlier in this same event batch.
            return;
        };

        let registered = txn.interest;
        let mut progress = Progress::Pending;
        if event.is_readable() {
            progress = txn.on_readable(&self.config.doc_root, &self.config.limits);
        }
        if progress == Progress::Pending && event.is_writable() {
            progress = txn.on_writable();
        }

        match progress {
            Progress::Pending => {
                if txn.interest != registered {
                    let wanted = match txn.interest {
                        Interest::Readable => mio::Interest::READABLE,
                        Interest::Writable => mio::Interest::WRITABLE,
                    };
                    if self
                        .poll
                        .registry()
                        .reregister(&mut txn.stream, Token(descriptor), wanted)
                        .is_err()
                    {
                        self.teardown(descriptor);
                    }
                }
            }
            Progress::Finished | Progress::Failed => self.teardown(descriptor),
        }
    }

    /// Releases the record from registry and multiplexer together;
    /// dropping it closes the socket and any open files.
    fn teardown(&mut self, descriptor: usize) {
        if let Some(mut txn) = self.registry.release(descriptor) {
            let _ = self.poll.registry().deregister(&mut txn.stream);
            debug!(descriptor, "transaction closed");
        }
    }
}
