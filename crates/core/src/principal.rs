//! Authenticated actor identity.

use crate::types::DbId;

/// Role names as stored in the `users.role` column and JWT claims.
pub const ROLE_CUSTOMER: &str = "customer";
pub const ROLE_EXPERT: &str = "expert";

/// An authenticated actor: either a customer who submits documents for
/// review, or an expert who reviews them.
///
/// Guard logic dispatches on this enum by pattern match so adding a role
/// forces every guard to be revisited by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Principal {
    Customer(DbId),
    Expert(DbId),
}

impl Principal {
    /// The actor's user id, regardless of role.
    pub fn id(&self) -> DbId {
        match self {
            Principal::Customer(id) | Principal::Expert(id) => *id,
        }
    }

    /// The role name for this principal (matches `users.role`).
    pub fn role(&self) -> &'static str {
        match self {
            Principal::Customer(_) => ROLE_CUSTOMER,
            Principal::Expert(_) => ROLE_EXPERT,
        }
    }

    /// Build a principal from a stored role name.
    ///
    /// Returns `None` for unknown role strings; callers treat that as an
    /// authentication failure rather than panicking on bad data.
    pub fn from_role(role: &str, id: DbId) -> Option<Self> {
        match role {
            ROLE_CUSTOMER => Some(Principal::Customer(id)),
            ROLE_EXPERT => Some(Principal::Expert(id)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_role_round_trip() {
        let p = Principal::from_role("customer", 7).unwrap();
        assert_eq!(p, Principal::Customer(7));
        assert_eq!(p.role(), "customer");
        assert_eq!(p.id(), 7);

        let p = Principal::from_role("expert", 9).unwrap();
        assert_eq!(p, Principal::Expert(9));
        assert_eq!(p.role(), "expert");
    }

    #[test]
    fn test_unknown_role_rejected() {
        assert!(Principal::from_role("admin", 1).is_none());
        assert!(Principal::from_role("", 1).is_none());
    }
}
