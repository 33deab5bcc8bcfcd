//! WebSocket close codes.

use std::fmt;

/// Status code carried by a WebSocket close.
///
/// Only 1000, 1001 and 1005 are treated as intentional termination. Anything
/// else (including 1006, which the transport synthesizes when the stream
/// drops without a close frame) is abnormal and eligible for reconnection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CloseCode(pub u16);

impl CloseCode {
    /// Normal closure.
    pub const NORMAL: Self = Self(1000);
    /// Endpoint going away (page navigation, server shutdown).
    pub const GOING_AWAY: Self = Self(1001);
    /// Close frame carried no status code.
    pub const NO_STATUS: Self = Self(1005);
    /// Connection dropped without a close frame.
    pub const ABNORMAL: Self = Self(1006);
    /// Endpoint hit an unexpected condition.
    pub const INTERNAL_ERROR: Self = Self(1011);

    /// Whether this code marks an intentional, non-error termination.
    #[must_use]
    pub const fn is_normal(self) -> bool {
        matches!(self.0, 1000 | 1001 | 1005)
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.0
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
