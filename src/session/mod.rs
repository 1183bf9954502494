//! Session Protocol: the `/ws/asr` WebSocket surface.

pub mod protocol;
pub mod task;

pub use protocol::{ClientMessage, ServerMessage};
pub use task::{run_session, SessionDeps};
