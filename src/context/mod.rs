//! Context module - conversation state and prompt context
//!
//! - `session`: volatile per-conversation turn history
//! - `summary`: plain-text telemetry block for embedding into prompts
//!
//! Neither feeds back into the diagnostic rule engine.

pub mod session;
pub mod summary;

pub use session::{ConversationSession, Role, SessionStore, Turn};
pub use summary::{format_measurement, telemetry_summary, UNKNOWN_MARKER};
