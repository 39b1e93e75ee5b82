//! Cart commands.
//!
//! Commands come in two shapes with different contracts:
//!
//! - [`CartCommand`] - `add`, `remove`, `list`; the caller waits for the
//!   resulting snapshot.
//! - Checkout - fire-and-forget; the caller only learns whether the command
//!   was accepted.
//!
//! [`CartAction`] is the untyped union of both, as received from a front end
//! that passes an action name and an optional item identifier.

use super::id::ItemId;

/// A command answered with a [`CartSnapshot`](super::CartSnapshot).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartCommand {
    /// Add one unit of an item.
    Add(ItemId),
    /// Remove one unit of an item; absent items are left alone.
    Remove(ItemId),
    /// Read the current items without mutating them.
    List,
}

impl CartCommand {
    /// Wire name of the command.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Add(_) => "add",
            Self::Remove(_) => "remove",
            Self::List => "list",
        }
    }

    /// The item the command targets, if any.
    #[must_use]
    pub const fn item(&self) -> Option<&ItemId> {
        match self {
            Self::Add(item) | Self::Remove(item) => Some(item),
            Self::List => None,
        }
    }
}

/// Errors that can occur when parsing a [`CartAction`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// The action name is not one of `add`, `remove`, `list`, `checkout`.
    #[error("unknown cart action: {0}")]
    UnknownAction(String),
    /// `add` or `remove` arrived without an item identifier.
    #[error("cart action {0} requires an item id")]
    MissingItem(&'static str),
}

/// Any action a front end can request for a session's cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAction {
    Command(CartCommand),
    Checkout,
}

impl CartAction {
    /// Build an action from its name and optional item identifier.
    ///
    /// An empty item identifier counts as missing. `list` and `checkout`
    /// ignore the item identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError`] for unknown names or a missing item.
    ///
    /// # Example
    ///
    /// ```rust
    /// use session_cart_core::{CartAction, CartCommand, ItemId};
    ///
    /// let action = CartAction::parse("add", Some("apple")).unwrap();
    /// assert_eq!(action, CartAction::Command(CartCommand::Add(ItemId::new("apple"))));
    ///
    /// assert!(CartAction::parse("remove", None).is_err());
    /// assert_eq!(CartAction::parse("checkout", None).unwrap(), CartAction::Checkout);
    /// ```
    pub fn parse(kind: &str, item_id: Option<&str>) -> Result<Self, ActionError> {
        let item = item_id.filter(|id| !id.is_empty()).map(ItemId::from);

        match kind {
            "add" => item
                .map(|item| Self::Command(CartCommand::Add(item)))
                .ok_or(ActionError::MissingItem("add")),
            "remove" => item
                .map(|item| Self::Command(CartCommand::Remove(item)))
                .ok_or(ActionError::MissingItem("remove")),
            "list" => Ok(Self::Command(CartCommand::List)),
            "checkout" => Ok(Self::Checkout),
            other => Err(ActionError::UnknownAction(other.to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            CartAction::parse("remove", Some("car")).unwrap(),
            CartAction::Command(CartCommand::Remove(ItemId::new("car")))
        );
        assert_eq!(
            CartAction::parse("list", Some("ignored")).unwrap(),
            CartAction::Command(CartCommand::List)
        );
    }

    #[test]
    fn test_parse_missing_item() {
        assert_eq!(
            CartAction::parse("add", Some("")),
            Err(ActionError::MissingItem("add"))
        );
        assert_eq!(
            CartAction::parse("remove", None),
            Err(ActionError::MissingItem("remove"))
        );
    }

    #[test]
    fn test_parse_unknown() {
        let err = CartAction::parse("refund", None).unwrap_err();
        assert_eq!(err.to_string(), "unknown cart action: refund");
    }

    #[test]
    fn test_command_accessors() {
        let add = CartCommand::Add(ItemId::new("apple"));
        assert_eq!(add.name(), "add");
        assert_eq!(add.item().map(ItemId::as_str), Some("apple"));
        assert_eq!(CartCommand::List.item(), None);
    }
}
