//! Role-aware field write policy
//!
//! The write path asks the policy, never the role directly, so new roles or
//! protected fields extend here without touching the engine.

use crate::models::{Role, PROTECTED_FIELD};

/// Decides whether a role may write a given field
pub trait FieldPolicy: Send + Sync {
    fn may_write(&self, role: Role, field: &str) -> bool;

    /// The fields this policy restricts for non-privileged roles
    fn protected_fields(&self) -> &[&'static str];
}

/// Default policy: a single protected field (unit price) writable only by
/// the privileged role
#[derive(Debug, Clone, Default)]
pub struct ProtectedFieldPolicy;

impl FieldPolicy for ProtectedFieldPolicy {
    fn may_write(&self, role: Role, field: &str) -> bool {
        if field == PROTECTED_FIELD {
            role.is_privileged()
        } else {
            true
        }
    }

    fn protected_fields(&self) -> &[&'static str] {
        &[PROTECTED_FIELD]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staff_may_not_write_price() {
        let policy = ProtectedFieldPolicy;
        assert!(!policy.may_write(Role::Staff, "price_cents"));
        assert!(policy.may_write(Role::Owner, "price_cents"));
    }

    #[test]
    fn test_unprotected_fields_open_to_all() {
        let policy = ProtectedFieldPolicy;
        assert!(policy.may_write(Role::Staff, "name"));
        assert!(policy.may_write(Role::Staff, "quantity"));
    }
}
