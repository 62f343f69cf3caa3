//! Type definitions and aliases

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// Which load pattern to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TestMode {
    /// All sessions long-poll the same key until one write releases them
    #[default]
    SharedKeyWait,
    /// One PUT per freshly generated key, no watch and no barriers
    RandomKeyPut,
}

impl TestMode {
    /// Numeric code used by the `-t` flag and `TEST_MODE`
    pub fn code(&self) -> u8 {
        match self {
            TestMode::SharedKeyWait => 1,
            TestMode::RandomKeyPut => 2,
        }
    }

    /// Resolve a numeric code
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            1 => Ok(TestMode::SharedKeyWait),
            2 => Ok(TestMode::RandomKeyPut),
            other => Err(AppError::validation(format!(
                "Unknown test type {} (1: wait the same key, 2: put random keys)",
                other
            ))),
        }
    }
}

impl FromStr for TestMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let code: u8 = s
            .trim()
            .parse()
            .map_err(|_| AppError::parse(format!("Invalid test type: {}", s)))?;
        Self::from_code(code)
    }
}

impl fmt::Display for TestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestMode::SharedKeyWait => write!(f, "shared-key wait"),
            TestMode::RandomKeyPut => write!(f, "random-key put"),
        }
    }
}

/// Lifecycle of one simulated long-poll client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Sending the GET and waiting for response headers
    Connecting,
    /// Sleeping after a transport failure before reconnecting
    RetryingConnect,
    /// Headers received; established barrier signaled
    Established,
    /// Blocked reading the body until the watch fires
    WaitingForResolution,
    /// Sleeping after a body-read failure before re-issuing the GET
    RetryingRead,
    /// Body fully read; resolved barrier signaled
    Resolved,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Connecting => "connecting",
            SessionState::RetryingConnect => "retrying-connect",
            SessionState::Established => "established",
            SessionState::WaitingForResolution => "waiting-for-resolution",
            SessionState::RetryingRead => "retrying-read",
            SessionState::Resolved => "resolved",
        }
    }

    /// Whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Connecting, Established)
                | (Connecting, RetryingConnect)
                | (RetryingConnect, Connecting)
                | (Established, WaitingForResolution)
                | (WaitingForResolution, Resolved)
                | (WaitingForResolution, RetryingRead)
                | (RetryingRead, Connecting)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_codes_round_trip() {
        assert_eq!(TestMode::from_code(1).unwrap(), TestMode::SharedKeyWait);
        assert_eq!(TestMode::from_code(2).unwrap(), TestMode::RandomKeyPut);
        assert_eq!(TestMode::RandomKeyPut.code(), 2);
        assert!(TestMode::from_code(3).is_err());
        assert_eq!("1".parse::<TestMode>().unwrap(), TestMode::SharedKeyWait);
        assert!("x".parse::<TestMode>().is_err());
    }

    #[test]
    fn test_session_transitions() {
        use SessionState::*;
        assert!(Connecting.can_transition_to(Established));
        assert!(Connecting.can_transition_to(RetryingConnect));
        assert!(WaitingForResolution.can_transition_to(RetryingRead));
        assert!(RetryingRead.can_transition_to(Connecting));
        assert!(!Resolved.can_transition_to(Connecting));
        assert!(!Connecting.can_transition_to(Resolved));
        assert!(!Established.can_transition_to(Established));
    }
}
