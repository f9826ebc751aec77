//! Thin IO surfaces wrapping the engine.

pub mod csv;
