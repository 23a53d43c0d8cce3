use std::path::{Component, Path, PathBuf};

use crate::http::headers::HeaderList;

/// Default document substituted for a URI ending in `/`.
pub const DEFAULT_DOCUMENT: &str = "home.html";

/// Request methods the server implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Head,
}

impl Method {
    /// Matches a request-line token case-insensitively.
    ///
    /// Returns `None` for any method the server does not implement; the
    /// caller maps that to 501.
    pub fn from_token(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("GET") {
            Some(Method::Get)
        } else if token.eq_ignore_ascii_case("POST") {
            Some(Method::Post)
        } else if token.eq_ignore_ascii_case("HEAD") {
            Some(Method::Head)
        } else {
            None
        }
    }
}

/// A fully parsed request head: request line, resolved filename, headers.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: Method,
    pub uri: String,
    pub version: String,
    /// Local path the URI resolves to, relative to the document root.
    pub filename: PathBuf,
    pub headers: HeaderList,
    /// Declared body length; present and validated only for POST.
    pub content_length: Option<u64>,
}

/// Maps a request URI onto a path under the document root.
///
/// A URI with no trailing path component gets the default document
/// appended. URIs carrying a `..` segment are refused outright; callers
/// treat `None` as a 400.
pub fn resolve_uri(uri: &str, doc_root: &Path) -> Option<PathBuf> {
    let relative = uri.trim_start_matches('/');
    let candidate = if uri.ends_with('/') || relative.is_empty() {
        Path::new(relative).join(DEFAULT_DOCUMENT)
    } else {
        PathBuf::from(relative)
    };

    if candidate
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return None;
    }
    Some(doc_root.join(candidate))
}
