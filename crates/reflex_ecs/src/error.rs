//! Fatal setup errors.
//!
//! The runtime distinguishes two failure classes. Setup errors, such as a
//! system declaring an event channel that was never registered, are raised
//! synchronously at registration time, before any tick runs, and propagate
//! to the caller. An *unsatisfiable* query parameter at tick time is not an
//! error: the bound system is silently skipped for that tick.

use thiserror::Error;

/// Errors raised by registration and mutation APIs.
#[derive(Debug, Error)]
pub enum EcsError {
    /// A system declared an event reader or writer for an event kind that
    /// was never passed to [`crate::World::register_event`].
    #[error("system '{system}' declares event '{event}' which was never registered")]
    UnregisteredEvent {
        /// The name the system was registered under.
        system: String,
        /// The type name of the missing event kind.
        event: &'static str,
    },
}
