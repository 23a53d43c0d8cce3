use bytes::{BufMut, BytesMut};

const HTTP_VERSION: &str = "HTTP/1.0";
const SERVER_NAME: &str = "Depot File Server";

/// Status codes the server produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 400 Bad Request
    BadRequest,
    /// 403 Forbidden
    Forbidden,
    /// 404 Not Found
    NotFound,
    /// 500 Internal Server Error
    InternalServerError,
    /// 501 Not Implemented
    NotImplemented,
    /// 503 Service Unavailable
    ServiceUnavailable,
}

impl StatusCode {
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::Forbidden => 403,
            StatusCode::NotFound => 404,
            StatusCode::InternalServerError => 500,
            StatusCode::NotImplemented => 501,
            StatusCode::ServiceUnavailable => 503,
        }
    }

    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::NotImplemented => "Not Implemented",
            StatusCode::ServiceUnavailable => "Service Unavailable",
        }
    }
}

/// Serializes a response head: status line, the fixed header set, and the
/// blank separator line. The body, if any, is transferred separately.
pub fn response_head(status: StatusCode, content_length: u64, content_type: &str) -> BytesMut {
    let mut buf = BytesMut::with_capacity(256);
    buf.put_slice(
        format!(
            "{} {} {}\r\n",
            HTTP_VERSION,
            status.as_u16(),
            status.reason_phrase()
        )
        .as_bytes(),
    );
    buf.put_slice(format!("Server: {SERVER_NAME}\r\n").as_bytes());
    buf.put_slice(b"Connection: close\r\n");
    buf.put_slice(format!("Content-length: {content_length}\r\n").as_bytes());
    buf.put_slice(format!("Content-type: {content_type}\r\n\r\n").as_bytes());
    buf
}

/// Builds a complete error response: head plus a minimal HTML body.
pub fn error_response(status: StatusCode, detail: &str) -> BytesMut {
    let body = format!(
        "<html><title>Depot Error</title><body bgcolor=\"ffffff\">\r\n\
         {}: {}\r\n\
         <p>{}\r\n\
         <hr><em>The Depot file server</em>\r\n",
        status.as_u16(),
        status.reason_phrase(),
        detail,
    );

    let mut buf = response_head(status, body.len() as u64, "text/html");
    buf.put_slice(body.as_bytes());
    buf
}
