//! Collaborator trackers consumed by the sync engine.
//!
//! Each tracker owns one slice of shared session state (world clock,
//! name/model announcements, enemy health, quest flags, teleports,
//! prop hunt roles) and keeps per-slot outbound queues so every
//! participant eventually hears about every change. All mutation goes
//! through the engine's primary lock; the trackers themselves are plain
//! data.

pub mod enemies;
pub mod models;
pub mod names;
pub mod prophunt;
pub mod quests;
pub mod teleport;
pub mod world;
