use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::AsFd;

use nix::sys::sendfile::sendfile;

use crate::transaction::record::{RecvBuffer, SendBuffer};

/// Upper bound on bytes handed to one sendfile call.
const SENDFILE_CHUNK: usize = 512 * 1024;

/// How one drain loop against a non-blocking descriptor ended. A genuine
/// I/O error is returned as `Err` and is terminal for the transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drain {
    /// Nothing more immediately available; wait for the next readiness edge.
    WouldBlock,
    /// Zero-length read: the peer closed its half of the connection.
    Disconnected,
    /// This side finished: inbound buffer full, or all pending bytes sent.
    Complete,
}

pub type TransferResult = io::Result<Drain>;

/// Byte transport a transaction drives. Production uses a mio TCP stream;
/// tests substitute a pipe that caps every call at a few bytes.
pub trait Transport: Read + Write {
    /// Transmits up to `count` bytes of `file` starting at `*offset`
    /// without an intermediate user-space copy, advancing the offset by
    /// the bytes actually sent.
    fn send_file(&mut self, file: &File, offset: &mut u64, count: usize) -> io::Result<usize>;
}

impl Transport for mio::net::TcpStream {
    fn send_file(&mut self, file: &File, offset: &mut u64, count: usize) -> io::Result<usize> {
        let mut off = *offset as i64;
        let sent = sendfile(self.as_fd(), file.as_fd(), Some(&mut off), count)
            .map_err(io::Error::from)?;
        *offset = off as u64;
        Ok(sent)
    }
}

/// Drains the readable descriptor into the inbound buffer up to capacity.
pub fn read_into<T: Transport>(stream: &mut T, buf: &mut RecvBuffer) -> TransferResult {
    loop {
        if buf.is_full() {
            return Ok(Drain::Complete);
        }
        match stream.read(buf.space()) {
            Ok(0) => return Ok(Drain::Disconnected),
            Ok(n) => buf.advance(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(Drain::WouldBlock),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Drains the outbound buffer to the descriptor, tracking acknowledged
/// bytes so a partial write resumes on the next readiness edge.
pub fn write_from<T: Transport>(stream: &mut T, buf: &mut SendBuffer) -> TransferResult {
    loop {
        if buf.is_drained() {
            return Ok(Drain::Complete);
        }
        match stream.write(buf.pending()) {
            Ok(0) => return Ok(Drain::Disconnected),
            Ok(n) => buf.advance(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(Drain::WouldBlock),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Sends the remainder of an open resource file, resuming from `*offset`.
/// `Complete` once the offset reaches `size`.
pub fn send_file_from<T: Transport>(
    stream: &mut T,
    file: &File,
    offset: &mut u64,
    size: u64,
) -> TransferResult {
    loop {
        let remaining = size.saturating_sub(*offset);
        if remaining == 0 {
            return Ok(Drain::Complete);
        }
        let count = remaining.min(SENDFILE_CHUNK as u64) as usize;
        match stream.send_file(file, offset, count) {
            // The resource shrank underneath us; nothing sane left to send.
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "resource file truncated during transfer",
                ));
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(Drain::WouldBlock),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Writes buffered upload bytes to the destination file. A short write is
/// treated as disk-full and is not retried.
pub fn persist_chunk(file: &mut File, bytes: &[u8]) -> io::Result<()> {
    let written = file.write(bytes)?;
    if written < bytes.len() {
        return Err(io::Error::new(
            io::ErrorKind::WriteZero,
            "short write to upload destination",
        ));
    }
    Ok(())
}
