pub mod error;
pub mod message;
pub mod traits;
pub mod types;

pub use error::RelayError;
pub use message::{Completion, CompletionRequest, InboundMessage};
pub use traits::{CompletionRelay, InboundHandler, ReplySink};
pub use types::{CompletionMode, MessageFormat, Role, RunStatus, Session, Turn};
