//! Depot - Event-Driven HTTP/1.0 File Server
//!
//! Core library: request parsing, the per-connection transaction engine,
//! and the readiness-driven server loop.

pub mod config;
pub mod http;
pub mod server;
pub mod transaction;
