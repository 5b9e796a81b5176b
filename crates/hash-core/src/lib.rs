//! # hash-core
//!
//! Shared types for the hash MCP server.
//!
//! - [`ids::SessionId`]: opaque token identifying one downstream stream
//! - [`digest`]: the fixed set of supported hash algorithms and the digest function
//! - [`tools`]: the contract every server-side tool implements

#![deny(unsafe_code)]

pub mod digest;
pub mod ids;
pub mod tools;
