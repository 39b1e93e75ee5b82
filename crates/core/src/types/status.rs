//! Cart lifecycle status.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a cart actor.
///
/// A cart starts `Active` and moves to `CheckedOut` exactly once. There is no
/// transition back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CartStatus {
    #[default]
    Active,
    CheckedOut,
}

impl CartStatus {
    /// Whether the cart still accepts commands.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    /// Whether the cart has reached its terminal state.
    #[must_use]
    pub const fn is_checked_out(self) -> bool {
        matches!(self, Self::CheckedOut)
    }
}

impl fmt::Display for CartStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("active"),
            Self::CheckedOut => f.write_str("checked out"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_active() {
        assert_eq!(CartStatus::default(), CartStatus::Active);
        assert!(CartStatus::default().is_active());
    }

    #[test]
    fn test_serde_screaming_snake_case() {
        let json = serde_json::to_string(&CartStatus::CheckedOut).unwrap();
        assert_eq!(json, "\"CHECKED_OUT\"");
    }
}
