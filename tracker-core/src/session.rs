//! Session credentials for the realtime feed
//!
//! The feed does not own authentication: the surrounding application issues
//! and refreshes the bearer token and derives the subscription tier. This
//! type is a snapshot of both, handed to the feed on every change.

use serde::{Deserialize, Serialize};

/// A snapshot of the current session credential and subscription tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer access token, if the user is logged in.
    pub token: Option<String>,
    /// Whether the user holds an active VIP subscription.
    pub vip: bool,
}

impl Session {
    /// Session for a logged-in user.
    pub fn new(token: impl Into<String>, vip: bool) -> Self {
        Self {
            token: Some(token.into()),
            vip,
        }
    }

    /// Session with no credential (logged out).
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A feed channel may only be open for a VIP session with a
    /// non-empty token.
    pub fn eligible(&self) -> bool {
        self.vip && self.token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// The token, if present and non-empty.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }
}
