//! The readiness-driven server loop: listener setup, connection
//! acceptance, and event dispatch.

pub mod acceptor;
pub mod event_loop;
pub mod listener;

pub use event_loop::Server;
