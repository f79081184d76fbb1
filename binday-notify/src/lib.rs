//! Notification channels that tell the household which bins to put out.

/// Pushover push notifications.
pub mod pushover;
/// Plain terminal output.
pub mod stdout;

pub use pushover::{Priority, PushoverNotifier};
pub use stdout::StdoutNotifier;
