use std::path::Path;

use crate::config::Limits;
use crate::http::headers::HeaderList;
use crate::http::request::{Method, RequestHead, resolve_uri};
use crate::http::response::StatusCode;

/// Ways a request head can be rejected. Each maps to the status code the
/// transaction answers with before tearing down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestError {
    MalformedRequestLine,
    MalformedHeader,
    LineTooLong,
    UnsupportedMethod,
    InvalidPath,
    MissingContentLength,
    InvalidContentLength,
    UploadTooLarge,
}

impl RequestError {
    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::UnsupportedMethod => StatusCode::NotImplemented,
            RequestError::MalformedRequestLine
            | RequestError::MalformedHeader
            | RequestError::LineTooLong
            | RequestError::InvalidPath
            | RequestError::MissingContentLength
            | RequestError::InvalidContentLength
            | RequestError::UploadTooLarge => StatusCode::BadRequest,
        }
    }
}

/// Resumable scan for the `\r\n\r\n` header terminator.
///
/// `scanned` marks how far previous calls have proven terminator-free; it
/// is advanced so repeated calls never rescan more than the three bytes a
/// split terminator could straddle. Returns the offset where the
/// terminator begins.
pub fn scan_header_end(buf: &[u8], scanned: &mut usize) -> Option<usize> {
    let mut pos = *scanned;
    while pos + 4 <= buf.len() {
        if &buf[pos..pos + 4] == b"\r\n\r\n" {
            *scanned = pos;
            return Some(pos);
        }
        pos += 1;
    }
    *scanned = buf.len().saturating_sub(3);
    None
}

/// Parses a complete request head (everything before the terminator).
///
/// The slice must not include the terminator itself. Filesystem checks on
/// the resolved filename are the state machine's job; this is a pure
/// function of the bytes.
pub fn parse_head(
    head: &[u8],
    doc_root: &Path,
    limits: &Limits,
) -> Result<RequestHead, RequestError> {
    let text = std::str::from_utf8(head).map_err(|_| RequestError::MalformedRequestLine)?;
    let mut lines = text.split("\r\n");

    let request_line = lines.next().ok_or(RequestError::MalformedRequestLine)?;
    if request_line.len() > limits.max_line {
        return Err(RequestError::LineTooLong);
    }

    let mut parts = request_line.split_whitespace();
    let method_token = parts.next().ok_or(RequestError::MalformedRequestLine)?;
    let uri = parts.next().ok_or(RequestError::MalformedRequestLine)?;
    let version = parts.next().ok_or(RequestError::MalformedRequestLine)?;
    if parts.next().is_some() {
        return Err(RequestError::MalformedRequestLine);
    }

    let method = Method::from_token(method_token).ok_or(RequestError::UnsupportedMethod)?;
    let filename = resolve_uri(uri, doc_root).ok_or(RequestError::InvalidPath)?;

    let mut headers = HeaderList::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        if line.len() > limits.max_line {
            return Err(RequestError::LineTooLong);
        }
        let (name, rest) = line.split_once(':').ok_or(RequestError::MalformedHeader)?;
        // Exactly one separating space is mandatory; anything after it,
        // including further whitespace, belongs to the value.
        let value = rest.strip_prefix(' ').ok_or(RequestError::MalformedHeader)?;
        if name.is_empty() {
            return Err(RequestError::MalformedHeader);
        }
        headers.push(name, value);
    }

    let content_length = match method {
        Method::Post => Some(validate_content_length(&headers, limits)?),
        Method::Get | Method::Head => None,
    };

    Ok(RequestHead {
        method,
        uri: uri.to_string(),
        version: version.to_string(),
        filename,
        headers,
        content_length,
    })
}

fn validate_content_length(headers: &HeaderList, limits: &Limits) -> Result<u64, RequestError> {
    let raw = headers
        .get("Content-Length")
        .ok_or(RequestError::MissingContentLength)?;
    let length: u64 = raw
        .trim()
        .parse()
        .map_err(|_| RequestError::InvalidContentLength)?;
    if length == 0 {
        return Err(RequestError::InvalidContentLength);
    }
    if length > limits.max_file_size {
        return Err(RequestError::UploadTooLarge);
    }
    Ok(length)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_finds_terminator() {
        let buf = b"GET / HTTP/1.0\r\n\r\n";
        let mut scanned = 0;
        assert_eq!(scan_header_end(buf, &mut scanned), Some(14));
    }

    #[test]
    fn scan_resumes_without_rescanning() {
        let buf = b"GET / HTTP/1.0\r\n";
        let mut scanned = 0;
        assert_eq!(scan_header_end(buf, &mut scanned), None);
        assert_eq!(scanned, buf.len() - 3);

        let buf = b"GET / HTTP/1.0\r\n\r\n";
        assert_eq!(scan_header_end(buf, &mut scanned), Some(14));
    }

    #[test]
    fn parse_simple_get() {
        let head = b"GET /index.html HTTP/1.0\r\nHost: example.com";
        let parsed = parse_head(head, Path::new("."), &Limits::default()).unwrap();

        assert_eq!(parsed.method, Method::Get);
        assert_eq!(parsed.uri, "/index.html");
        assert_eq!(parsed.headers.get("Host"), Some("example.com"));
    }
}
