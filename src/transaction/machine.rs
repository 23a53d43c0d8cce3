use std::fs::{File, OpenOptions};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::Path;

use tracing::{debug, warn};

use crate::config::Limits;
use crate::http::request::{Method, RequestHead};
use crate::http::response::{StatusCode, error_response, response_head};
use crate::http::{mime, parser};
use crate::transaction::record::{Interest, IoState, Stage, Transaction};
use crate::transaction::transfer::{self, Drain, Transport};

/// What the event loop should do with a transaction after a readiness
/// handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Wait for the next readiness edge under the record's current interest.
    Pending,
    /// Protocol completed normally; tear the transaction down.
    Finished,
    /// Transport or protocol failure; tear down without further output.
    Failed,
}

impl<T: Transport> Transaction<T> {
    /// Drives the transaction on read-readiness. Loops until `WouldBlock`
    /// or a terminal condition, as the edge-triggered contract requires.
    pub fn on_readable(&mut self, doc_root: &Path, limits: &Limits) -> Progress {
        match self.state {
            IoState::AwaitRequestHead => self.read_request_head(doc_root, limits),
            IoState::ReadBody => self.read_body(),
            // Spurious read-readiness while writing; ignore.
            IoState::WriteBuffer | IoState::WriteFile => Progress::Pending,
        }
    }

    /// Drives the transaction on write-readiness, chaining stages until
    /// `WouldBlock` or completion.
    pub fn on_writable(&mut self) -> Progress {
        loop {
            match self.state {
                IoState::WriteBuffer => {
                    match transfer::write_from(&mut self.stream, &mut self.outbound) {
                        Ok(Drain::WouldBlock) => return Progress::Pending,
                        Ok(Drain::Disconnected) => return Progress::Failed,
                        Ok(Drain::Complete) => {
                            if let Some(done) = self.advance_stage() {
                                return done;
                            }
                        }
                        Err(e) => {
                            debug!(descriptor = self.descriptor, error = %e, "write failed");
                            return Progress::Failed;
                        }
                    }
                }
                IoState::WriteFile => {
                    let Some(file) = self.resource.as_ref() else {
                        return Progress::Failed;
                    };
                    match transfer::send_file_from(
                        &mut self.stream,
                        file,
                        &mut self.resource_offset,
                        self.resource_size,
                    ) {
                        Ok(Drain::Complete) => return Progress::Finished,
                        Ok(Drain::WouldBlock) => return Progress::Pending,
                        Ok(Drain::Disconnected) => return Progress::Failed,
                        Err(e) => {
                            debug!(descriptor = self.descriptor, error = %e, "sendfile failed");
                            return Progress::Failed;
                        }
                    }
                }
                // Spurious write-readiness while reading; ignore.
                IoState::AwaitRequestHead | IoState::ReadBody => return Progress::Pending,
            }
        }
    }

    fn read_request_head(&mut self, doc_root: &Path, limits: &Limits) -> Progress {
        loop {
            let outcome = match transfer::read_into(&mut self.stream, &mut self.inbound) {
                Ok(o) => o,
                Err(e) => {
                    debug!(descriptor = self.descriptor, error = %e, "read failed");
                    return Progress::Failed;
                }
            };

            if let Some(end) = self.inbound.scan_header_end() {
                return self.install_head(end, doc_root, limits);
            }

            match outcome {
                Drain::WouldBlock => return Progress::Pending,
                Drain::Disconnected => return Progress::Failed,
                // Buffer exhausted with no terminator in sight: fatal to
                // the transaction, not to the server.
                Drain::Complete => {
                    return self.reject(StatusCode::BadRequest, "request head too large");
                }
            }
        }
    }

    fn install_head(&mut self, head_end: usize, doc_root: &Path, limits: &Limits) -> Progress {
        let parsed = parser::parse_head(&self.inbound.filled()[..head_end], doc_root, limits);
        let head = match parsed {
            Ok(head) => head,
            Err(e) => {
                warn!(descriptor = self.descriptor, ?e, "rejecting request");
                return self.reject(e.status(), "could not parse request");
            }
        };

        debug!(
            descriptor = self.descriptor,
            method = ?head.method,
            uri = %head.uri,
            "request head parsed"
        );

        match head.method {
            Method::Get | Method::Head => self.prepare_download(head),
            Method::Post => self.prepare_upload(head, head_end + 4),
        }
    }

    fn prepare_download(&mut self, head: RequestHead) -> Progress {
        let meta = match std::fs::metadata(&head.filename) {
            Ok(meta) => meta,
            Err(_) => return self.reject(StatusCode::NotFound, "couldn't find this file"),
        };
        if !meta.is_file() {
            return self.reject(StatusCode::NotFound, "couldn't find this file");
        }
        if meta.permissions().mode() & 0o400 == 0 {
            return self.reject(StatusCode::Forbidden, "couldn't read this file");
        }

        self.resource_size = meta.len();
        self.filename = Some(head.filename.clone());
        self.head = Some(head);
        // The response head is built once this (empty) write buffer
        // "completes" on the first write edge: the SendResponseHead stage
        // self-loops through WriteBuffer.
        self.state = IoState::WriteBuffer;
        self.stage = Some(Stage::SendResponseHead);
        self.interest = Interest::Writable;
        Progress::Pending
    }

    fn prepare_upload(&mut self, head: RequestHead, body_start: usize) -> Progress {
        let Some(length) = head.content_length else {
            return self.reject(StatusCode::BadRequest, "missing content length");
        };

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(&head.filename);
        let file = match file {
            Ok(file) => file,
            Err(e) => {
                warn!(descriptor = self.descriptor, error = %e, "cannot create upload destination");
                return self.reject(
                    StatusCode::InternalServerError,
                    "couldn't create destination file",
                );
            }
        };

        self.upload = Some(file);
        self.content_length = length;
        self.saved = 0;
        self.filename = Some(head.filename.clone());
        self.head = Some(head);
        self.state = IoState::ReadBody;
        self.stage = Some(Stage::ReadRequestBody);

        // Bytes read past the header boundary already belong to the body;
        // shift them to the buffer front and fall through to draining.
        self.inbound.shift_front(body_start);
        self.read_body()
    }

    fn read_body(&mut self) -> Progress {
        loop {
            let outcome = match transfer::read_into(&mut self.stream, &mut self.inbound) {
                Ok(o) => o,
                Err(e) => {
                    debug!(descriptor = self.descriptor, error = %e, "read failed");
                    return Progress::Failed;
                }
            };

            if !self.inbound.is_empty() {
                let need = self.content_length - self.saved;
                let take = (self.inbound.len() as u64).min(need) as usize;
                let Some(file) = self.upload.as_mut() else {
                    return Progress::Failed;
                };
                if let Err(e) = transfer::persist_chunk(file, &self.inbound.filled()[..take]) {
                    warn!(descriptor = self.descriptor, error = %e, "upload write failed");
                    return self.reject(
                        StatusCode::InternalServerError,
                        "couldn't store uploaded file",
                    );
                }
                self.saved += take as u64;
                self.inbound.clear();
            }

            if self.saved == self.content_length {
                self.stage = Some(Stage::Done);
                return Progress::Finished;
            }

            match outcome {
                Drain::WouldBlock => return Progress::Pending,
                Drain::Disconnected => return Progress::Failed,
                Drain::Complete => continue,
            }
        }
    }

    /// Runs the protocol stage that follows a fully drained write buffer.
    /// `None` means the caller keeps looping under the new I/O state.
    fn advance_stage(&mut self) -> Option<Progress> {
        match self.stage {
            Some(Stage::SendResponseHead) => {
                let content_type = self
                    .filename
                    .as_deref()
                    .map(mime::content_type)
                    .unwrap_or("text/plain");
                self.outbound
                    .load(response_head(StatusCode::Ok, self.resource_size, content_type));
                self.stage = Some(Stage::SendResponseBody);
                None
            }
            Some(Stage::SendResponseBody) => {
                if self.head.as_ref().map(|h| h.method) == Some(Method::Head) {
                    return Some(Progress::Finished);
                }
                let Some(filename) = self.filename.as_ref() else {
                    return Some(Progress::Failed);
                };
                match File::open(filename) {
                    Ok(file) => {
                        self.resource = Some(file);
                        self.resource_offset = 0;
                        self.state = IoState::WriteFile;
                        self.stage = Some(Stage::Done);
                        None
                    }
                    Err(e) => {
                        // The 200 head is already on the wire; nothing
                        // coherent left to say.
                        warn!(descriptor = self.descriptor, error = %e, "resource vanished");
                        Some(Progress::Failed)
                    }
                }
            }
            Some(Stage::Done) => Some(Progress::Finished),
            Some(Stage::ReadRequestBody) | None => Some(Progress::Failed),
        }
    }

    /// Short-circuits to an error response: the status line and a minimal
    /// HTML body drain through WriteBuffer, then the transaction ends.
    fn reject(&mut self, status: StatusCode, detail: &str) -> Progress {
        self.outbound.load(error_response(status, detail));
        self.state = IoState::WriteBuffer;
        self.stage = Some(Stage::Done);
        self.interest = Interest::Writable;
        Progress::Pending
    }
}
