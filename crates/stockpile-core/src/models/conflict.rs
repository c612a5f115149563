//! Conflict descriptor emitted when a write is rejected
//!
//! Constructed at the moment of rejection, consumed immediately by the
//! client to drive resolution, never persisted.

use serde::{Deserialize, Serialize};

use super::product::ProductId;

/// Why a conditional write was rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConflictDescriptor {
    /// The client's version is stale
    Version {
        resource: String,
        id: ProductId,
        expected_version: i64,
        actual_version: i64,
    },
    /// A restricted actor tried to change the protected field
    Restricted {
        resource: String,
        id: ProductId,
        field: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_conflict_serializes_both_versions() {
        let conflict = ConflictDescriptor::Version {
            resource: "product".to_string(),
            id: ProductId::new(),
            expected_version: 1,
            actual_version: 3,
        };
        let json = serde_json::to_value(&conflict).unwrap();
        assert_eq!(json["kind"], "version");
        assert_eq!(json["expected_version"], 1);
        assert_eq!(json["actual_version"], 3);
    }

    #[test]
    fn test_restricted_conflict_names_the_field() {
        let conflict = ConflictDescriptor::Restricted {
            resource: "product".to_string(),
            id: ProductId::new(),
            field: "price_cents".to_string(),
        };
        let json = serde_json::to_value(&conflict).unwrap();
        assert_eq!(json["field"], "price_cents");
    }
}
