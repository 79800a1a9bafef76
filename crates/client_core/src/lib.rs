//! Client-side state for a retrospective target board session.
//!
//! [`RetrospectiveState`] is the aggregate and [`RetrospectiveState::apply`]
//! its pure transition function. [`Session`] owns one state and turns user
//! intents into actions. [`queries`] and [`export`] are read-only views.

pub mod export;
pub mod queries;
pub mod session;
pub mod store;

pub use export::{ExportError, ExportFormat, ExportSnapshot};
pub use queries::{BoardSummary, ScoreStats, UNKNOWN_PARTICIPANT};
pub use session::{Session, SessionError, SESSION_QUERY_KEY};
pub use store::{Ignored, RetroHeader, RetrospectiveState};

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
