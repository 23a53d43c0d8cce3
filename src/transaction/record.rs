use std::fs::File;
use std::path::PathBuf;
use std::time::Instant;

use bytes::BytesMut;

use crate::http::request::RequestHead;

/// Which I/O operation runs when the descriptor signals readiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoState {
    AwaitRequestHead,
    ReadBody,
    WriteBuffer,
    WriteFile,
}

/// Which protocol step follows once the current I/O operation completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    SendResponseHead,
    SendResponseBody,
    ReadRequestBody,
    Done,
}

/// Readiness the transaction currently needs from the multiplexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interest {
    Readable,
    Writable,
}

/// Fixed-capacity inbound buffer with `filled` and `scanned` cursors.
///
/// `scanned` belongs to the resumable header-terminator search and never
/// exceeds `filled`; `filled` never exceeds capacity.
#[derive(Debug)]
pub struct RecvBuffer {
    data: Box<[u8]>,
    filled: usize,
    pub scanned: usize,
}

impl RecvBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity].into_boxed_slice(),
            filled: 0,
            scanned: 0,
        }
    }

    pub fn filled(&self) -> &[u8] {
        &self.data[..self.filled]
    }

    pub fn space(&mut self) -> &mut [u8] {
        &mut self.data[self.filled..]
    }

    pub fn advance(&mut self, n: usize) {
        self.filled += n;
        debug_assert!(self.filled <= self.data.len());
    }

    pub fn is_full(&self) -> bool {
        self.filled == self.data.len()
    }

    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// Resumes the header-terminator search over the filled region.
    /// Returns the offset where `\r\n\r\n` begins.
    pub fn scan_header_end(&mut self) -> Option<usize> {
        crate::http::parser::scan_header_end(&self.data[..self.filled], &mut self.scanned)
    }

    /// Drops the first `n` bytes, shifting any remainder to the front.
    /// Used when body bytes arrive in the same read as the header.
    pub fn shift_front(&mut self, n: usize) {
        debug_assert!(n <= self.filled);
        self.data.copy_within(n..self.filled, 0);
        self.filled -= n;
        self.scanned = 0;
    }

    pub fn clear(&mut self) {
        self.filled = 0;
        self.scanned = 0;
    }
}

/// Outbound buffer with an acknowledged-length cursor (`sent ≤ len`).
#[derive(Debug, Default)]
pub struct SendBuffer {
    data: BytesMut,
    sent: usize,
}

impl SendBuffer {
    /// Replaces the buffered bytes and resets the acknowledged cursor.
    pub fn load(&mut self, data: BytesMut) {
        self.data = data;
        self.sent = 0;
    }

    pub fn pending(&self) -> &[u8] {
        &self.data[self.sent..]
    }

    pub fn advance(&mut self, n: usize) {
        self.sent += n;
        debug_assert!(self.sent <= self.data.len());
    }

    pub fn is_drained(&self) -> bool {
        self.sent == self.data.len()
    }
}

/// All per-connection state. Dropping the record closes the socket and
/// any open resource or upload file.
pub struct Transaction<T> {
    /// The connected socket, generic so tests can drive the machine with
    /// a bounded-chunk transport.
    pub stream: T,
    /// Descriptor value used as the registry key and multiplexer token.
    pub descriptor: usize,

    pub inbound: RecvBuffer,
    pub outbound: SendBuffer,

    pub head: Option<RequestHead>,
    /// Resolved local path, retained for diagnostics after `head` is set.
    pub filename: Option<PathBuf>,

    /// Open resource being downloaded, with its size and the offset
    /// acknowledged by sendfile so a partial send resumes where it left.
    pub resource: Option<File>,
    pub resource_size: u64,
    pub resource_offset: u64,

    /// Upload destination and progress; `saved` is monotonic and never
    /// exceeds the declared content length.
    pub upload: Option<File>,
    pub content_length: u64,
    pub saved: u64,

    pub state: IoState,
    pub stage: Option<Stage>,
    pub interest: Interest,
    pub last_active: Instant,
}

impl<T> Transaction<T> {
    pub fn new(stream: T, descriptor: usize, buffer_capacity: usize) -> Self {
        Self {
            stream,
            descriptor,
            inbound: RecvBuffer::new(buffer_capacity),
            outbound: SendBuffer::default(),
            head: None,
            filename: None,
            resource: None,
            resource_size: 0,
            resource_offset: 0,
            upload: None,
            content_length: 0,
            saved: 0,
            state: IoState::AwaitRequestHead,
            stage: None,
            interest: Interest::Readable,
            last_active: Instant::now(),
        }
    }
}
