//! Newtype IDs for type-safe entity references.
//!
//! Identities live in the hosted backend's auth namespace and are keyed by
//! UUID; marketplace rows such as seller applications use numeric keys. Use
//! the `define_id!` macro for the numeric kind and [`IdentityId`] for the
//! UUID kind so the two can never be mixed up.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to define a type-safe numeric ID wrapper.
///
/// Creates a newtype wrapper around `i64` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_i64()`
/// - `From<i64>` and `Into<i64>` implementations
///
/// # Example
///
/// ```rust
/// # use campus_trade_core::define_id;
/// define_id!(ApplicationId);
/// define_id!(ProductId);
///
/// let app_id = ApplicationId::new(1);
/// let product_id = ProductId::new(1);
///
/// // These are different types, so this won't compile:
/// // let _: ApplicationId = product_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Create a new ID from an i64 value.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the underlying i64 value.
            #[must_use]
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(ApplicationId);

/// Identity reference into the backend's auth namespace.
///
/// Identities are keyed by UUID rather than a numeric sequence. The reviewer
/// field on applications is only ever populated with a value that parses as
/// one of these; anything else is omitted rather than sent malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(Uuid);

impl IdentityId {
    /// Create an identity ID from a UUID.
    #[must_use]
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Parse an identity ID from its canonical string form.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a syntactically valid UUID.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }

    /// Get the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl core::fmt::Display for IdentityId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for IdentityId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<IdentityId> for Uuid {
    fn from(id: IdentityId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_id_parses_canonical_uuid() {
        let id = IdentityId::parse("4f5c1b52-0b54-4a2e-9c63-2c6de8e1a001").expect("valid uuid");
        assert_eq!(id.to_string(), "4f5c1b52-0b54-4a2e-9c63-2c6de8e1a001");
    }

    #[test]
    fn identity_id_rejects_garbage() {
        assert!(IdentityId::parse("not-a-uuid").is_err());
        assert!(IdentityId::parse("").is_err());
        assert!(IdentityId::parse("1234").is_err());
    }

    #[test]
    fn numeric_ids_round_trip() {
        let id = ApplicationId::new(42);
        assert_eq!(id.as_i64(), 42);
        assert_eq!(ApplicationId::from(42), id);
        assert_eq!(i64::from(id), 42);
    }
}
