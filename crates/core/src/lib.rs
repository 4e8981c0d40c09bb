//! Pure domain layer for the carpool rides service.
//!
//! Holds the error taxonomy, the ride/participant status enums with their
//! state machines, and the seat-capacity rules. No I/O: every check in this
//! crate is a pure function, so the booking invariants are testable without
//! a database. Persistence lives in `carpool-db`, HTTP in `carpool-api`.

pub mod booking;
pub mod error;
pub mod status;
pub mod types;
