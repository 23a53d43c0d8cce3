use std::path::PathBuf;
use std::time::Duration;

/// Fixed engine limits recognized by the transaction engine.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Maximum length of a single request line or header line, in bytes.
    pub max_line: usize,
    /// Capacity of the inbound and outbound transaction buffers.
    pub max_buffer: usize,
    /// Maximum readiness events drained per multiplexer wait.
    pub max_events: usize,
    /// Maximum concurrent transactions held by the registry.
    pub max_transactions: usize,
    /// Maximum accepted upload size in bytes.
    pub max_file_size: u64,
    /// A transaction idle longer than this becomes evictable.
    pub idle_timeout: Duration,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_line: 1024,
            max_buffer: 10240,
            max_events: 64,
            max_transactions: 1024,
            max_file_size: 1 << 30,
            idle_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub doc_root: PathBuf,
    pub limits: Limits,
}

impl Config {
    /// Builds the configuration from command-line arguments.
    ///
    /// Exactly one positional argument is accepted: the listening port.
    pub fn from_args(mut args: impl Iterator<Item = String>) -> Result<Self, UsageError> {
        let program = args.next().unwrap_or_else(|| "depot".to_string());
        let port = match (args.next(), args.next()) {
            (Some(port), None) => port,
            _ => return Err(UsageError { program }),
        };
        let port = port.parse().map_err(|_| UsageError { program })?;

        Ok(Self {
            port,
            doc_root: PathBuf::from("."),
            limits: Limits::default(),
        })
    }
}

/// The command line did not name exactly one valid port.
#[derive(Debug)]
pub struct UsageError {
    pub program: String,
}

impl std::fmt::Display for UsageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "usage: {} <port>", self.program)
    }
}

impl std::error::Error for UsageError {}
