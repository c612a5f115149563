//! The conditional write path: validation, write guard, conflict detection
//!
//! Outcomes are a tagged union rather than errors so the precedence order
//! (validation, existence, permission, version) stays explicit and testable.
//! Infrastructure failures are the only thing surfaced through `Result`.

use crate::db::{ConditionalDelete, ConditionalWrite, LibSqlProductRepository, ProductRepository};
use crate::error::Result;
use crate::models::{
    validate_draft, validate_patch, Actor, ConflictDescriptor, Product, ProductDraft, ProductId,
    UpdateRequest, ValidationFailure, RESOURCE,
};
use crate::policy::{FieldPolicy, ProtectedFieldPolicy};
use libsql::Connection;

/// Outcome of a conditional update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The write was accepted; the record carries the incremented version
    Updated(Product),
    /// The payload failed validation
    Invalid(ValidationFailure),
    /// No record with the requested id
    NotFound,
    /// A restricted actor attempted to change a protected field
    Restricted { field: String },
    /// The client's version is stale
    Conflict {
        expected_version: i64,
        actual_version: i64,
    },
}

impl WriteOutcome {
    /// Build the transient conflict descriptor for a rejected write, if the
    /// rejection is one the resolution protocol handles
    #[must_use]
    pub fn conflict_descriptor(&self, id: ProductId) -> Option<ConflictDescriptor> {
        match self {
            Self::Conflict {
                expected_version,
                actual_version,
            } => Some(ConflictDescriptor::Version {
                resource: RESOURCE.to_string(),
                id,
                expected_version: *expected_version,
                actual_version: *actual_version,
            }),
            Self::Restricted { field } => Some(ConflictDescriptor::Restricted {
                resource: RESOURCE.to_string(),
                id,
                field: field.clone(),
            }),
            _ => None,
        }
    }
}

/// Outcome of a conditional delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    Conflict {
        expected_version: i64,
        actual_version: i64,
    },
}

/// Outcome of a create
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(Product),
    Invalid(ValidationFailure),
}

/// Orchestrates the write path over a repository and a field policy
pub struct WriteEngine<'a, P: FieldPolicy = ProtectedFieldPolicy> {
    repo: LibSqlProductRepository<'a>,
    policy: P,
}

impl<'a> WriteEngine<'a, ProtectedFieldPolicy> {
    /// Engine with the default protected-price policy
    pub const fn new(conn: &'a Connection) -> Self {
        Self {
            repo: LibSqlProductRepository::new(conn),
            policy: ProtectedFieldPolicy,
        }
    }
}

impl<'a, P: FieldPolicy> WriteEngine<'a, P> {
    pub const fn with_policy(conn: &'a Connection, policy: P) -> Self {
        Self {
            repo: LibSqlProductRepository::new(conn),
            policy,
        }
    }

    /// Create a new product at version 1
    pub async fn create(&self, actor: &Actor, draft: ProductDraft) -> Result<CreateOutcome> {
        if let Some(failure) = validate_draft(&draft) {
            return Ok(CreateOutcome::Invalid(failure));
        }

        let product = self.repo.insert(draft).await?;
        tracing::info!(actor = %actor.id, product = %product.id, "Created product");
        Ok(CreateOutcome::Created(product))
    }

    /// Read a product
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>> {
        self.repo.get(id).await
    }

    /// List products, most recently updated first
    pub async fn list(&self, limit: usize, offset: usize) -> Result<Vec<Product>> {
        self.repo.list(limit, offset).await
    }

    /// Apply a conditional update
    ///
    /// Precedence: validation, record existence, write guard, version check,
    /// apply. The guard is checked before the version so a restricted actor
    /// learns about the field violation even when their version is stale.
    pub async fn update(
        &self,
        actor: &Actor,
        id: ProductId,
        request: UpdateRequest,
    ) -> Result<WriteOutcome> {
        if let Some(failure) = validate_patch(&request.fields) {
            return Ok(WriteOutcome::Invalid(failure));
        }

        let Some(current) = self.repo.get(id).await? else {
            return Ok(WriteOutcome::NotFound);
        };

        if let Some(field) = self.restricted_change(actor, &current, &request) {
            tracing::debug!(
                actor = %actor.id,
                role = %actor.role,
                product = %id,
                field,
                "Write guard rejected protected-field change"
            );
            return Ok(WriteOutcome::Restricted {
                field: field.to_string(),
            });
        }

        let fields = request.fields.apply_to(&current);
        match self
            .repo
            .conditional_update(id, request.version, &fields)
            .await?
        {
            ConditionalWrite::Applied(updated) => {
                tracing::info!(
                    actor = %actor.id,
                    product = %id,
                    version = updated.version,
                    "Applied conditional update"
                );
                Ok(WriteOutcome::Updated(updated))
            }
            ConditionalWrite::VersionMismatch { actual_version } => {
                tracing::debug!(
                    actor = %actor.id,
                    product = %id,
                    expected = request.version,
                    actual = actual_version,
                    "Version conflict"
                );
                Ok(WriteOutcome::Conflict {
                    expected_version: request.version,
                    actual_version,
                })
            }
            // Row deleted after our existence check; report as absent
            ConditionalWrite::Missing => Ok(WriteOutcome::NotFound),
        }
    }

    /// Delete a record if the caller's version is current
    pub async fn delete(
        &self,
        actor: &Actor,
        id: ProductId,
        expected_version: i64,
    ) -> Result<DeleteOutcome> {
        match self.repo.conditional_delete(id, expected_version).await? {
            ConditionalDelete::Deleted => {
                tracing::info!(actor = %actor.id, product = %id, "Deleted product");
                Ok(DeleteOutcome::Deleted)
            }
            ConditionalDelete::VersionMismatch { actual_version } => Ok(DeleteOutcome::Conflict {
                expected_version,
                actual_version,
            }),
            ConditionalDelete::Missing => Ok(DeleteOutcome::NotFound),
        }
    }

    /// The first protected field the request would change against policy,
    /// if any. A submitted value equal to the stored one is not a change.
    fn restricted_change(
        &self,
        actor: &Actor,
        current: &Product,
        request: &UpdateRequest,
    ) -> Option<&'static str> {
        for field in self.policy.protected_fields() {
            let changed = match *field {
                "price_cents" => request
                    .fields
                    .price_cents
                    .is_some_and(|price| price != current.price_cents),
                "name" => request
                    .fields
                    .name
                    .as_deref()
                    .is_some_and(|name| name != current.name),
                "quantity" => request
                    .fields
                    .quantity
                    .is_some_and(|quantity| quantity != current.quantity),
                "sku" => request
                    .fields
                    .sku
                    .as_deref()
                    .is_some_and(|sku| current.sku.as_deref() != Some(sku)),
                _ => false,
            };
            if changed && !self.policy.may_write(actor.role, field) {
                return Some(field);
            }
        }
        None
    }
}
