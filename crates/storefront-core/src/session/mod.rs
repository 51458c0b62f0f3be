//! Session signal supplied by the authentication collaborator.
//!
//! This layer never authenticates. It only observes transitions between
//! anonymous and authenticated sessions and carries the opaque token to the
//! network adapters.

use std::fmt;

/// Opaque bearer credentials.
///
/// `Debug` never prints the token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    token: String,
}

impl Credentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// `Authorization` header value.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Current authentication state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    credentials: Option<Credentials>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(credentials: Credentials) -> Self {
        Self {
            credentials: Some(credentials),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }
}

/// Direction of a session change, as seen by the lifecycle coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTransition {
    /// Anonymous → authenticated (login, or a restored session at start-up).
    LoggedIn,
    /// Authenticated → anonymous.
    LoggedOut,
    /// Authenticated before and after; only the credentials may differ.
    Refreshed,
    /// Anonymous before and after.
    Unchanged,
}

impl SessionTransition {
    pub fn between(previous: &Session, next: &Session) -> Self {
        match (previous.is_authenticated(), next.is_authenticated()) {
            (false, true) => Self::LoggedIn,
            (true, false) => Self::LoggedOut,
            (true, true) => Self::Refreshed,
            (false, false) => Self::Unchanged,
        }
    }
}
