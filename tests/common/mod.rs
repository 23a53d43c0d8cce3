use std::fs::File;
use std::io::{self, Read, Write};
use std::os::unix::fs::FileExt;

use depot::transaction::Transport;

/// In-memory transport that caps every read, write, and sendfile call at
/// `chunk` bytes, so tests can exercise partial-I/O resumption.
pub struct ChunkPipe {
    input: Vec<u8>,
    read_pos: usize,
    /// Whether exhausting the input looks like an orderly close (true)
    /// or a would-block open connection (false).
    pub eof: bool,
    pub output: Vec<u8>,
    chunk: usize,
}

impl ChunkPipe {
    pub fn new(input: &[u8], chunk: usize) -> Self {
        Self {
            input: input.to_vec(),
            read_pos: 0,
            eof: false,
            output: Vec::new(),
            chunk,
        }
    }

    pub fn with_eof(input: &[u8], chunk: usize) -> Self {
        let mut pipe = Self::new(input, chunk);
        pipe.eof = true;
        pipe
    }

    /// Queues more client bytes, as if another network burst arrived.
    #[allow(dead_code)]
    pub fn feed(&mut self, bytes: &[u8]) {
        self.input.extend_from_slice(bytes);
    }
}

impl Read for ChunkPipe {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.input.len() - self.read_pos;
        if available == 0 {
            if self.eof {
                return Ok(0);
            }
            return Err(io::Error::from(io::ErrorKind::WouldBlock));
        }
        let n = available.min(buf.len()).min(self.chunk);
        buf[..n].copy_from_slice(&self.input[self.read_pos..self.read_pos + n]);
        self.read_pos += n;
        Ok(n)
    }
}

impl Write for ChunkPipe {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = buf.len().min(self.chunk);
        self.output.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for ChunkPipe {
    fn send_file(&mut self, file: &File, offset: &mut u64, count: usize) -> io::Result<usize> {
        let mut tmp = vec![0u8; count.min(self.chunk)];
        let n = file.read_at(&mut tmp, *offset)?;
        self.output.extend_from_slice(&tmp[..n]);
        *offset += n as u64;
        Ok(n)
    }
}
