//! Hermes conversation handling
//!
//! Session storage, context window construction, the inbound dispatcher that
//! drives one exchange per message, and the control command router.

pub mod commands;
pub mod context_window;
pub mod dispatcher;
pub mod router;
pub mod session_store;

pub use commands::{parse_command, Command, CommandRouter, CommandTexts};
pub use context_window::ContextWindow;
pub use dispatcher::{DispatchOutcome, DispatcherSettings, FollowUpSettings, InboundDispatcher};
pub use router::MessageRouter;
pub use session_store::{SessionPermit, SessionStore};
