//! MCP transport implementations
//!
//! - `http` - stateless JSON-RPC over HTTP with health and resource metadata routes

pub mod http;

pub use http::HttpTransport;
