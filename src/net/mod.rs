//! Network surface: message framing, wire protocol, TCP server loop.

pub mod framing;
pub mod protocol;
pub mod server;
