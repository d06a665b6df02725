pub mod followup;
pub mod poll;

pub use followup::FollowUpScheduler;
pub use poll::{poll_until, PollOutcome, PollPolicy};
