//! Session lifecycle states.
//!
//! A connection moves through:
//! 1. `Uninitialized` until the `initialize` request succeeds
//! 2. `Initialized` while serving requests and configuration updates
//! 3. `ShutdownRequested` once `shutdown` has been answered
//! 4. `Exited` after `exit`, or as soon as the stream ends or fails

use std::fmt;

/// State of one client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Waiting for `initialize`.
    #[default]
    Uninitialized,
    /// Handshake done; serving requests.
    Initialized,
    /// `shutdown` answered; only `exit` is meaningful now.
    ShutdownRequested,
    /// Connection closed or about to close.
    Exited,
}

impl SessionState {
    /// Check if the session is ready to handle language requests.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Initialized)
    }

    /// Check if the session has ended.
    #[must_use]
    pub const fn is_exited(&self) -> bool {
        matches!(self, Self::Exited)
    }

    /// Whether moving to `next` keeps the lifecycle monotonic.
    ///
    /// `Initialized` may stay `Initialized`; every state may jump to `Exited`.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Uninitialized, Self::Initialized)
                | (Self::Initialized, Self::Initialized | Self::ShutdownRequested)
                | (_, Self::Exited)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initialized => "initialized",
            Self::ShutdownRequested => "shutdown requested",
            Self::Exited => "exited",
        };
        f.write_str(name)
    }
}

/// The state a method requires before it may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// Only before `initialize`.
    Uninitialized,
    /// Only after `initialize` and before `shutdown`.
    Initialized,
    /// Any state before the session has exited.
    Any,
}

impl Precondition {
    /// Check the precondition against the current state.
    #[must_use]
    pub const fn permits(&self, state: SessionState) -> bool {
        match self {
            Self::Uninitialized => matches!(state, SessionState::Uninitialized),
            Self::Initialized => matches!(state, SessionState::Initialized),
            Self::Any => !state.is_exited(),
        }
    }
}
