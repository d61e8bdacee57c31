pub mod username;

pub use username::{is_valid_username, MAX_USERNAME_LEN};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutput {
    pub session_id: SessionId,
    pub text: String,
    /// When true, the session worker closes the connection after writing
    /// this message.
    pub disconnect: bool,
}

impl SessionOutput {
    pub fn new(session_id: SessionId, text: impl Into<String>) -> Self {
        Self {
            session_id,
            text: text.into(),
            disconnect: false,
        }
    }

    /// Create a final message that will disconnect the session after delivery.
    pub fn with_disconnect(session_id: SessionId, text: impl Into<String>) -> Self {
        Self {
            session_id,
            text: text.into(),
            disconnect: true,
        }
    }
}

/// Lifecycle of a connection, from the first prompt to the closed socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Prompting,
    AwaitingHandshakeReply {
        username: String,
    },
    Authenticated {
        username: String,
    },
    CreatingCharacter {
        username: String,
    },
    /// The handshake succeeded but the character cannot be bound to this
    /// connection (already online).
    Rejected {
        username: String,
    },
    Active {
        username: String,
    },
    Closed,
}

impl SessionState {
    pub fn username(&self) -> Option<&str> {
        match self {
            SessionState::Prompting | SessionState::Closed => None,
            SessionState::AwaitingHandshakeReply { username }
            | SessionState::Authenticated { username }
            | SessionState::CreatingCharacter { username }
            | SessionState::Rejected { username }
            | SessionState::Active { username } => Some(username),
        }
    }

    /// Whether `next` is a legal successor of this state.
    pub fn can_transition_to(&self, next: &SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (_, Closed) => !matches!(self, Closed),
            (Prompting, AwaitingHandshakeReply { .. }) => true,
            (AwaitingHandshakeReply { .. }, Authenticated { .. })
            | (AwaitingHandshakeReply { .. }, CreatingCharacter { .. })
            | (AwaitingHandshakeReply { .. }, Prompting) => true,
            (CreatingCharacter { .. }, Active { .. })
            | (CreatingCharacter { .. }, Rejected { .. })
            | (CreatingCharacter { .. }, Prompting) => true,
            (Authenticated { .. }, Active { .. }) | (Authenticated { .. }, Rejected { .. }) => true,
            _ => false,
        }
    }
}

/// Budget of failed login attempts for one connection.
#[derive(Debug, Clone)]
pub struct LoginAttempts {
    used: u32,
    max: u32,
}

impl LoginAttempts {
    pub fn new(max: u32) -> Self {
        Self { used: 0, max }
    }

    /// Count one failed attempt.
    pub fn record_failure(&mut self) {
        self.used = self.used.saturating_add(1);
    }

    pub fn exhausted(&self) -> bool {
        self.used >= self.max
    }

    pub fn used(&self) -> u32 {
        self.used
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_constructors() {
        let out = SessionOutput::new(SessionId(3), "hello");
        assert_eq!(out.session_id, SessionId(3));
        assert!(!out.disconnect);

        let out = SessionOutput::with_disconnect(SessionId(3), "bye");
        assert_eq!(out.text, "bye");
        assert!(out.disconnect);
    }

    #[test]
    fn login_attempts_budget() {
        let mut attempts = LoginAttempts::new(3);
        assert!(!attempts.exhausted());
        attempts.record_failure();
        attempts.record_failure();
        assert!(!attempts.exhausted());
        attempts.record_failure();
        assert!(attempts.exhausted());
        assert_eq!(attempts.used(), 3);
    }

    #[test]
    fn state_username() {
        assert_eq!(SessionState::Prompting.username(), None);
        let state = SessionState::Active {
            username: "bob".into(),
        };
        assert_eq!(state.username(), Some("bob"));
    }

    #[test]
    fn login_path_transitions() {
        let u = || "bob".to_string();
        let path = [
            SessionState::Prompting,
            SessionState::AwaitingHandshakeReply { username: u() },
            SessionState::CreatingCharacter { username: u() },
            SessionState::Active { username: u() },
            SessionState::Closed,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(&pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn illegal_transitions() {
        let active = SessionState::Active {
            username: "bob".into(),
        };
        assert!(!SessionState::Prompting.can_transition_to(&active));
        assert!(!SessionState::Closed.can_transition_to(&SessionState::Closed));
        assert!(!active.can_transition_to(&SessionState::Prompting));
    }
}
