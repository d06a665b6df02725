//! Context window construction.
//!
//! The window is turn-count based: the last `k` turns of the session, no token
//! accounting. It does not guarantee the payload fits the downstream limit.

use hermes_core::{CompletionRequest, Session, Turn};

#[derive(Debug, Clone)]
pub struct ContextWindow {
    pub instructions: String,
    /// The last `k` stored turns, oldest first.
    pub history: Vec<Turn>,
    pub incoming: Turn,
}

impl ContextWindow {
    /// `[instructions] + last k turns of session + [incoming user turn]`.
    pub fn build(session: &Session, instructions: &str, k: usize, user_text: &str) -> Self {
        Self {
            instructions: instructions.to_string(),
            history: session.recent(k).to_vec(),
            incoming: Turn::user(user_text),
        }
    }

    pub fn to_request(&self, session: &Session) -> CompletionRequest {
        CompletionRequest {
            session_id: session.id.clone(),
            instructions: self.instructions.clone(),
            history: self.history.clone(),
            user_text: self.incoming.text.clone(),
            thread_id: session.thread_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with(n: usize) -> Session {
        let mut session = Session::new("chat-1");
        for i in 0..n {
            if i % 2 == 0 {
                session.append(Turn::user(format!("u{i}")));
            } else {
                session.append(Turn::assistant(format!("a{i}")));
            }
        }
        session
    }

    #[test]
    fn includes_instructions_last_k_and_incoming() {
        let session = session_with(8);
        let request = ContextWindow::build(&session, "Be brief.", 3, "next question").to_request(&session);

        assert_eq!(
            request.ordered_messages(),
            vec![
                ("system", "Be brief."),
                ("assistant", "a5"),
                ("user", "u6"),
                ("assistant", "a7"),
                ("user", "next question"),
            ]
        );
    }

    #[test]
    fn empty_instructions_are_omitted() {
        let session = session_with(0);
        let request = ContextWindow::build(&session, "", 10, "hi").to_request(&session);
        assert_eq!(request.ordered_messages(), vec![("user", "hi")]);
    }

    #[test]
    fn request_carries_thread_and_session() {
        let mut session = session_with(2);
        session.thread_id = Some("thread_1".into());
        let request = ContextWindow::build(&session, "sys", 10, "hi").to_request(&session);
        assert_eq!(request.session_id, "chat-1");
        assert_eq!(request.thread_id.as_deref(), Some("thread_1"));
        assert_eq!(request.history.len(), 2);
        assert_eq!(request.user_text, "hi");
    }
}
