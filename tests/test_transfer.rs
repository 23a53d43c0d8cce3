mod common;

use std::io::Write;

use bytes::BytesMut;
use common::ChunkPipe;
use depot::transaction::record::{RecvBuffer, SendBuffer};
use depot::transaction::transfer::{Drain, persist_chunk, read_into, send_file_from, write_from};

#[test]
fn test_read_into_drains_to_would_block() {
    for chunk in [1, 16, 4096] {
        let mut pipe = ChunkPipe::new(b"hello world", chunk);
        let mut buf = RecvBuffer::new(4096);

        assert_eq!(read_into(&mut pipe, &mut buf).unwrap(), Drain::WouldBlock);
        assert_eq!(buf.filled(), b"hello world", "chunk {chunk}");
    }
}

#[test]
fn test_read_into_reports_disconnect() {
    let mut pipe = ChunkPipe::with_eof(b"partial", 4);
    let mut buf = RecvBuffer::new(4096);

    assert_eq!(read_into(&mut pipe, &mut buf).unwrap(), Drain::Disconnected);
    assert_eq!(buf.filled(), b"partial");
}

#[test]
fn test_read_into_stops_at_capacity() {
    let mut pipe = ChunkPipe::new(b"abcdefgh", 3);
    let mut buf = RecvBuffer::new(4);

    assert_eq!(read_into(&mut pipe, &mut buf).unwrap(), Drain::Complete);
    assert_eq!(buf.filled(), b"abcd");
    assert!(buf.is_full());
}

#[test]
fn test_write_from_resumes_partial_writes() {
    for chunk in [1, 16, 4096] {
        let mut pipe = ChunkPipe::new(b"", chunk);
        let mut buf = SendBuffer::default();
        buf.load(BytesMut::from(&b"response bytes"[..]));

        assert_eq!(write_from(&mut pipe, &mut buf).unwrap(), Drain::Complete);
        assert!(buf.is_drained());
        assert_eq!(pipe.output, b"response bytes", "chunk {chunk}");
    }
}

#[test]
fn test_send_file_resumes_from_offset() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("payload.bin");
    let content: Vec<u8> = (0..=255u8).cycle().take(4000).collect();
    std::fs::File::create(&path)
        .unwrap()
        .write_all(&content)
        .unwrap();
    let file = std::fs::File::open(&path).unwrap();

    for chunk in [1, 16, 4096] {
        let mut pipe = ChunkPipe::new(b"", chunk);
        let mut offset = 0u64;

        let out = send_file_from(&mut pipe, &file, &mut offset, content.len() as u64).unwrap();
        assert_eq!(out, Drain::Complete, "chunk {chunk}");
        assert_eq!(offset, content.len() as u64);
        assert_eq!(pipe.output, content, "chunk {chunk}");
    }
}

#[test]
fn test_persist_chunk_writes_everything() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("upload.bin");
    let mut file = std::fs::File::create(&path).unwrap();

    persist_chunk(&mut file, b"chunk one ").unwrap();
    persist_chunk(&mut file, b"chunk two").unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"chunk one chunk two");
}

#[test]
fn test_recv_buffer_shift_front() {
    let mut buf = RecvBuffer::new(16);
    let mut pipe = ChunkPipe::new(b"headerBODY", 16);
    read_into(&mut pipe, &mut buf).unwrap();

    buf.shift_front(6);
    assert_eq!(buf.filled(), b"BODY");
    assert_eq!(buf.scanned, 0);
}
