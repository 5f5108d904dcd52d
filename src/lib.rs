//! Co-op Sync Server Library
//!
//! Authoritative state server for a fixed-population (32 slot) co-op
//! session. Clients push local state (position, equipment, world clock,
//! quest progress) and poll filtered snapshots of everyone else; the
//! engine merges the updates into one canonical world view under
//! bounded-wait locks and arbitrates authority over shared fields.

pub mod config;
pub mod engine;
pub mod equipment;
pub mod net;
pub mod trackers;
pub mod util;
