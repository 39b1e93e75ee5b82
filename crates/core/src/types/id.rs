//! Opaque string identifiers.
//!
//! Use the `define_string_id!` macro to create type-safe wrappers that prevent
//! accidentally mixing session identifiers with item identifiers. The wrapped
//! value is never parsed or validated; it is only ever used as a map key.

use uuid::Uuid;

/// Macro to define a type-safe string identifier.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>`, `AsRef<str>` and `Borrow<str>` implementations
///
/// # Example
///
/// ```rust
/// # use session_cart_core::define_string_id;
/// define_string_id!(WishlistId);
/// define_string_id!(CouponCode);
///
/// let wishlist = WishlistId::new("w-1");
/// let coupon = CouponCode::new("w-1");
///
/// // These are different types, so this won't compile:
/// // let _: WishlistId = coupon;
/// assert_eq!(wishlist.as_str(), coupon.as_str());
/// ```
#[macro_export]
macro_rules! define_string_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an opaque string value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the underlying string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl ::core::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(SessionId);
define_string_id!(ItemId);

/// Prefix of identifiers minted by [`SessionId::generate`].
pub const SESSION_ID_PREFIX: &str = "session-";

impl SessionId {
    /// Mint a fresh, unique session identifier (`session-<uuid v4>`).
    ///
    /// Nothing in the cart engine depends on this shape; hosts may supply
    /// identifiers from any other unique source.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("{SESSION_ID_PREFIX}{}", Uuid::new_v4()))
    }
}
