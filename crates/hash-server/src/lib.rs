//! # hash-server
//!
//! Axum HTTP + SSE server for the hash tool.
//!
//! - `GET /sse` opens a downstream event stream and registers a session
//! - `POST /messages?sessionId=…` routes an upstream JSON-RPC call to that session
//! - Per-connection heartbeats keep idle streams alive through proxies
//! - Routing failures are classified into client and server faults at the boundary
//! - `GET /health` and `GET /metrics` for observability

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod health;
pub mod mcp;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod transport;
