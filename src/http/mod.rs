//! HTTP/1.0 protocol implementation.
//!
//! - **`headers`**: ordered request header list
//! - **`parser`**: resumable request-head parsing from raw byte buffers
//! - **`request`**: parsed request representation and URI resolution
//! - **`response`**: status codes, response heads, and error pages
//! - **`mime`**: content-type inference from filename suffixes

pub mod headers;
pub mod mime;
pub mod parser;
pub mod request;
pub mod response;
