//! Appointment lifecycle and cancellation-penalty engine for a
//! family/educator booking marketplace.
//!
//! The [`application::engine::LifecycleEngine`] drives appointments from
//! request through acceptance, PIN-validated session start, completion,
//! cancellation or no-show, applying the time-windowed penalty rules
//! against an injected payment gateway, store, notifier and clock.

pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
