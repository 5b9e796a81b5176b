//! SSE transport: session registry, per-connection lifecycle and heartbeat,
//! and routing of upstream calls to downstream streams.

pub mod handle;
pub mod heartbeat;
pub mod lifecycle;
pub mod registry;
pub mod router;
pub mod stream;
