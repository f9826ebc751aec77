//! Application layer orchestrating the appointment lifecycle.
//!
//! The [`engine::LifecycleEngine`] drives every status transition through
//! the store's conditional-update discipline; the [`session::SessionProtocol`]
//! owns the PIN-based session start.

pub mod engine;
pub mod session;

/// Conditional updates that hit a race are retried once (re-read and
/// re-evaluate) before surfacing a conflict to the caller.
pub(crate) const CONFLICT_RETRIES: usize = 1;
