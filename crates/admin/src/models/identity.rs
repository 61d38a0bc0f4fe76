//! Marketplace identity records.

use campus_trade_core::{IdentityId, Phone, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A marketplace principal.
///
/// Role is mutable; transitions on seller approval follow
/// [`Role::with_seller_capability`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    pub role: Role,
    pub display_name: String,
    pub phone: Option<Phone>,
    pub email: Option<String>,
    /// Campus department, when declared at signup.
    pub department: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Identity {
    /// First name for message composition (first whitespace-separated word
    /// of the display name, or the whole name if it has no spaces).
    #[must_use]
    pub fn first_name(&self) -> &str {
        self.display_name
            .split_whitespace()
            .next()
            .unwrap_or(&self.display_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn identity(name: &str) -> Identity {
        Identity {
            id: IdentityId::new(Uuid::nil()),
            role: Role::Buyer,
            display_name: name.to_string(),
            phone: None,
            email: None,
            department: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn first_name_takes_leading_word() {
        assert_eq!(identity("Wei Chen").first_name(), "Wei");
        assert_eq!(identity("Madison").first_name(), "Madison");
        assert_eq!(identity("  padded  name ").first_name(), "padded");
    }
}
