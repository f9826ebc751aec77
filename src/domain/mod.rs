//! Domain layer: entities, value objects, business policy and the ports
//! the application layer is wired against.

pub mod appointment;
pub mod clock;
pub mod penalty;
pub mod policy;
pub mod ports;
