//! Client-side conflict resolution
//!
//! A rejected write hands the caller a [`ConflictDescriptor`]; the caller
//! picks exactly one resolution, which yields at most one follow-up network
//! operation. A resubmission that conflicts again starts a fresh cycle —
//! there is no retry loop here.

use thiserror::Error;

use crate::models::{ConflictDescriptor, Product, ProductPatch, UpdateRequest};

/// What the client should do next after resolving
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionStep {
    /// Issue one conditional write with this request
    Resubmit(UpdateRequest),
    /// Fetch the current server record and adopt it as the new baseline;
    /// no write is issued
    Refetch,
}

/// The three resolutions for a version conflict
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionResolution {
    /// Resubmit the client's own payload at the server's actual version
    KeepMine,
    /// Discard local changes and re-read the server record
    AcceptRemote,
    /// Resubmit caller-edited fields at the server's actual version
    MergeManual(ProductPatch),
}

/// The two resolutions for a protected-field rejection
///
/// Merge-manual is not offered: there is no version mismatch to merge
/// against. Both choices converge on a payload that no longer changes the
/// protected field; they differ only in whether the field is omitted or
/// pinned to the server's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestrictedResolution {
    /// Drop the protected-field change, submit nothing for it
    DropProtectedChange,
    /// Keep all non-protected changes, revert the protected field to the
    /// server's current value
    KeepUnprotectedChanges,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("resolution does not apply to this conflict kind")]
    WrongKind,
    #[error("conflict names an unknown protected field: {0}")]
    UnknownField(String),
}

/// Resolve a version conflict
pub fn resolve_version(
    conflict: &ConflictDescriptor,
    local: &ProductPatch,
    choice: VersionResolution,
) -> Result<ResolutionStep, ResolutionError> {
    let ConflictDescriptor::Version { actual_version, .. } = conflict else {
        return Err(ResolutionError::WrongKind);
    };

    Ok(match choice {
        VersionResolution::KeepMine => ResolutionStep::Resubmit(UpdateRequest {
            version: *actual_version,
            fields: local.clone(),
        }),
        VersionResolution::AcceptRemote => ResolutionStep::Refetch,
        VersionResolution::MergeManual(edited) => ResolutionStep::Resubmit(UpdateRequest {
            version: *actual_version,
            fields: edited,
        }),
    })
}

/// Seed a merge form: the client's values where present, the server's
/// otherwise. Every field comes back populated so the actor can edit
/// field-by-field.
#[must_use]
pub fn merge_seed(local: &ProductPatch, server: &Product) -> ProductPatch {
    ProductPatch {
        name: Some(local.name.clone().unwrap_or_else(|| server.name.clone())),
        sku: local.sku.clone().or_else(|| server.sku.clone()),
        quantity: Some(local.quantity.unwrap_or(server.quantity)),
        price_cents: Some(local.price_cents.unwrap_or(server.price_cents)),
    }
}

/// Resolve a protected-field rejection
///
/// The original request's version is kept as-is: a permission rejection
/// says nothing about version staleness.
pub fn resolve_restricted(
    conflict: &ConflictDescriptor,
    original: &UpdateRequest,
    server: &Product,
    choice: RestrictedResolution,
) -> Result<ResolutionStep, ResolutionError> {
    let ConflictDescriptor::Restricted { field, .. } = conflict else {
        return Err(ResolutionError::WrongKind);
    };

    let mut fields = original.fields.clone();
    match field.as_str() {
        "price_cents" => {
            fields.price_cents = match choice {
                RestrictedResolution::DropProtectedChange => None,
                RestrictedResolution::KeepUnprotectedChanges => Some(server.price_cents),
            };
        }
        other => return Err(ResolutionError::UnknownField(other.to_string())),
    }

    Ok(ResolutionStep::Resubmit(UpdateRequest {
        version: original.version,
        fields,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProductDraft, ProductId};
    use pretty_assertions::assert_eq;

    fn version_conflict(id: ProductId) -> ConflictDescriptor {
        ConflictDescriptor::Version {
            resource: "product".to_string(),
            id,
            expected_version: 1,
            actual_version: 3,
        }
    }

    fn restricted_conflict(id: ProductId) -> ConflictDescriptor {
        ConflictDescriptor::Restricted {
            resource: "product".to_string(),
            id,
            field: "price_cents".to_string(),
        }
    }

    fn server_product() -> Product {
        Product::new(ProductDraft {
            name: "Beans".to_string(),
            sku: Some("SKU-1".to_string()),
            quantity: 10,
            price_cents: 999,
        })
    }

    fn local_patch() -> ProductPatch {
        ProductPatch {
            name: Some("Y".to_string()),
            price_cents: Some(1599),
            ..ProductPatch::default()
        }
    }

    #[test]
    fn test_keep_mine_corrects_version_only() {
        let id = ProductId::new();
        let step = resolve_version(
            &version_conflict(id),
            &local_patch(),
            VersionResolution::KeepMine,
        )
        .unwrap();

        assert_eq!(
            step,
            ResolutionStep::Resubmit(UpdateRequest {
                version: 3,
                fields: local_patch(),
            })
        );
    }

    #[test]
    fn test_accept_remote_issues_no_write() {
        let id = ProductId::new();
        let step = resolve_version(
            &version_conflict(id),
            &local_patch(),
            VersionResolution::AcceptRemote,
        )
        .unwrap();
        assert_eq!(step, ResolutionStep::Refetch);
    }

    #[test]
    fn test_merge_manual_uses_edited_fields_at_actual_version() {
        let id = ProductId::new();
        let edited = ProductPatch {
            name: Some("Merged".to_string()),
            quantity: Some(4),
            ..ProductPatch::default()
        };
        let step = resolve_version(
            &version_conflict(id),
            &local_patch(),
            VersionResolution::MergeManual(edited.clone()),
        )
        .unwrap();

        assert_eq!(
            step,
            ResolutionStep::Resubmit(UpdateRequest {
                version: 3,
                fields: edited,
            })
        );
    }

    #[test]
    fn test_merge_seed_prefers_local_values() {
        let server = server_product();
        let seed = merge_seed(&local_patch(), &server);

        assert_eq!(seed.name.as_deref(), Some("Y"));
        assert_eq!(seed.price_cents, Some(1599));
        // Absent locally, filled from the server
        assert_eq!(seed.quantity, Some(10));
        assert_eq!(seed.sku.as_deref(), Some("SKU-1"));
    }

    #[test]
    fn test_restricted_drop_removes_protected_field() {
        let id = ProductId::new();
        let original = UpdateRequest {
            version: 1,
            fields: local_patch(),
        };
        let step = resolve_restricted(
            &restricted_conflict(id),
            &original,
            &server_product(),
            RestrictedResolution::DropProtectedChange,
        )
        .unwrap();

        let ResolutionStep::Resubmit(request) = step else {
            panic!("expected resubmit");
        };
        assert_eq!(request.version, 1);
        assert!(request.fields.price_cents.is_none());
        assert_eq!(request.fields.name.as_deref(), Some("Y"));
    }

    #[test]
    fn test_restricted_keep_reverts_to_server_price() {
        let id = ProductId::new();
        let original = UpdateRequest {
            version: 1,
            fields: local_patch(),
        };
        let step = resolve_restricted(
            &restricted_conflict(id),
            &original,
            &server_product(),
            RestrictedResolution::KeepUnprotectedChanges,
        )
        .unwrap();

        let ResolutionStep::Resubmit(request) = step else {
            panic!("expected resubmit");
        };
        assert_eq!(request.fields.price_cents, Some(999));
        assert_eq!(request.fields.name.as_deref(), Some("Y"));
    }

    #[test]
    fn test_wrong_kind_is_rejected() {
        let id = ProductId::new();
        let err = resolve_version(
            &restricted_conflict(id),
            &local_patch(),
            VersionResolution::KeepMine,
        )
        .unwrap_err();
        assert_eq!(err, ResolutionError::WrongKind);

        let original = UpdateRequest {
            version: 1,
            fields: local_patch(),
        };
        let err = resolve_restricted(
            &version_conflict(id),
            &original,
            &server_product(),
            RestrictedResolution::DropProtectedChange,
        )
        .unwrap_err();
        assert_eq!(err, ResolutionError::WrongKind);
    }
}
