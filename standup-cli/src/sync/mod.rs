//! Sync glue between CLI commands and the server.

mod session;

pub use session::{client_from_config, runtime, DaySession, SessionError};
