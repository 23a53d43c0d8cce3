//! The per-connection transaction engine.
//!
//! A transaction is the server-side state for one client connection across
//! the full request/response lifecycle. The engine is single-threaded and
//! readiness-driven: every handler runs to `WouldBlock` or completion and
//! then returns to the event loop.
//!
//! - **`record`**: per-connection state and the cursor-tracked I/O buffers
//! - **`registry`**: descriptor-keyed table with idle-timeout eviction
//! - **`transfer`**: incremental non-blocking read/write/sendfile loops
//! - **`machine`**: the I/O-state x protocol-stage state machine

pub mod machine;
pub mod record;
pub mod registry;
pub mod transfer;

pub use machine::Progress;
pub use record::Transaction;
pub use registry::Registry;
pub use transfer::Transport;
