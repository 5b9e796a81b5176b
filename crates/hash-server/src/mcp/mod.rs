//! Model Context Protocol over JSON-RPC 2.0.

pub mod handler;
pub mod types;

pub use handler::McpHandler;
