//! Marketplace roles and the seller-capability merge policy.

use serde::{Deserialize, Serialize};

/// Role held by a marketplace identity.
///
/// Roles form an ordered capability set. Seller capability is additive:
/// granting it to a publisher yields [`Role::PublisherSeller`] rather than
/// replacing the publishing capability, and administrative rank is never
/// lowered by a seller grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Default role for every signed-up identity.
    #[default]
    Buyer,
    /// May list and sell products.
    Seller,
    /// May publish campus news articles.
    NewsPublisher,
    /// Holds both publishing and selling capability.
    PublisherSeller,
    /// Full access to marketplace management.
    Admin,
    /// Full access including admin management.
    SuperAdmin,
}

impl Role {
    /// Resolve the role that results from granting seller capability.
    ///
    /// The merge policy:
    /// - publishers (`news_publisher`, `publisher_seller`) become
    ///   `publisher_seller` - selling is added, publishing is kept
    /// - `admin` and `super_admin` are preserved unchanged
    /// - everyone else becomes plain `seller`
    #[must_use]
    pub const fn with_seller_capability(self) -> Self {
        match self {
            Self::NewsPublisher | Self::PublisherSeller => Self::PublisherSeller,
            Self::Admin | Self::SuperAdmin => self,
            Self::Buyer | Self::Seller => Self::Seller,
        }
    }

    /// Whether this role can sell on the marketplace.
    #[must_use]
    pub const fn can_sell(self) -> bool {
        matches!(self, Self::Seller | Self::PublisherSeller)
    }

    /// Whether this role carries administrative rank.
    #[must_use]
    pub const fn is_admin_class(self) -> bool {
        matches!(self, Self::Admin | Self::SuperAdmin)
    }

    /// Canonical backend string for this role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buyer => "buyer",
            Self::Seller => "seller",
            Self::NewsPublisher => "news_publisher",
            Self::PublisherSeller => "publisher_seller",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buyer" => Ok(Self::Buyer),
            "seller" => Ok(Self::Seller),
            "news_publisher" => Ok(Self::NewsPublisher),
            "publisher_seller" => Ok(Self::PublisherSeller),
            "admin" => Ok(Self::Admin),
            "super_admin" => Ok(Self::SuperAdmin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seller_grant_merges_with_publishing() {
        assert_eq!(
            Role::NewsPublisher.with_seller_capability(),
            Role::PublisherSeller
        );
        assert_eq!(
            Role::PublisherSeller.with_seller_capability(),
            Role::PublisherSeller
        );
    }

    #[test]
    fn seller_grant_preserves_admin_rank() {
        assert_eq!(Role::Admin.with_seller_capability(), Role::Admin);
        assert_eq!(Role::SuperAdmin.with_seller_capability(), Role::SuperAdmin);
    }

    #[test]
    fn seller_grant_promotes_buyer() {
        assert_eq!(Role::Buyer.with_seller_capability(), Role::Seller);
        assert_eq!(Role::Seller.with_seller_capability(), Role::Seller);
    }

    #[test]
    fn role_round_trips_through_backend_string() {
        for role in [
            Role::Buyer,
            Role::Seller,
            Role::NewsPublisher,
            Role::PublisherSeller,
            Role::Admin,
            Role::SuperAdmin,
        ] {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
        assert!("janitor".parse::<Role>().is_err());
    }
}
