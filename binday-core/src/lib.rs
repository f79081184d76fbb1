//! Collection resolution engine for the binday bin-night reminder.

/// Target-day matching and companion bins.
pub mod matcher;
/// Domain models shared by all sources and notifiers.
pub mod model;
/// Label and date normalization.
pub mod normalize;
/// Traits describing sources and notification channels.
pub mod ports;
/// Declarative per-source rule tables.
pub mod rules;
/// Resolution pipeline and dispatch facade.
pub mod service;
/// Selection of the next collection day.
pub mod window;

pub use model::*;
pub use ports::*;
pub use rules::*;
pub use service::*;
