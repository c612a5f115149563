//! Product model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Resource name used in error envelopes and conflict descriptors
pub const RESOURCE: &str = "product";

/// Field name of the role-protected attribute (unit price)
pub const PROTECTED_FIELD: &str = "price_cents";

/// A unique identifier for a product, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(Uuid);

impl ProductId {
    /// Create a new unique product ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for ProductId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProductId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// An inventory record for one stocked item
///
/// `version` is the sole concurrency token: it starts at 1 and every
/// accepted write increments it by exactly 1. Timestamps are informational
/// and never consulted for conflict detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier
    pub id: ProductId,
    /// Display name
    pub name: String,
    /// Optional stock-keeping unit code
    pub sku: Option<String>,
    /// Units on hand
    pub quantity: i64,
    /// Unit price in integer cents (the protected field)
    pub price_cents: i64,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
    /// Monotonic write counter, starts at 1
    pub version: i64,
}

impl Product {
    /// Create a new product at version 1 from a draft
    #[must_use]
    pub fn new(draft: ProductDraft) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: ProductId::new(),
            name: draft.name,
            sku: draft.sku,
            quantity: draft.quantity,
            price_cents: draft.price_cents,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }
}

/// Payload for creating a product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub price_cents: i64,
}

/// Partial update payload; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_cents: Option<i64>,
}

impl ProductPatch {
    /// True when no field is present
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.sku.is_none()
            && self.quantity.is_none()
            && self.price_cents.is_none()
    }

    /// Apply this patch on top of an existing product's fields
    #[must_use]
    pub fn apply_to(&self, base: &Product) -> AppliedFields {
        AppliedFields {
            name: self.name.clone().unwrap_or_else(|| base.name.clone()),
            sku: self.sku.clone().or_else(|| base.sku.clone()),
            quantity: self.quantity.unwrap_or(base.quantity),
            price_cents: self.price_cents.unwrap_or(base.price_cents),
        }
    }
}

/// Fully resolved field values ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedFields {
    pub name: String,
    pub sku: Option<String>,
    pub quantity: i64,
    pub price_cents: i64,
}

/// A conditional write request: partial fields plus the client's believed
/// record version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRequest {
    /// The version of the record the client last read
    pub version: i64,
    /// Field changes to apply
    #[serde(flatten)]
    pub fields: ProductPatch,
}

/// A failed input validation: which fields are missing or out of range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFailure {
    pub resource: &'static str,
    pub required_fields: Vec<&'static str>,
}

/// Validate a creation draft; `name` is required and non-empty, numeric
/// fields must be non-negative
pub fn validate_draft(draft: &ProductDraft) -> Option<ValidationFailure> {
    let mut bad = Vec::new();
    if draft.name.trim().is_empty() {
        bad.push("name");
    }
    if draft.quantity < 0 {
        bad.push("quantity");
    }
    if draft.price_cents < 0 {
        bad.push("price_cents");
    }
    failure(bad)
}

/// Validate an update patch; present fields obey the same rules as a draft
pub fn validate_patch(patch: &ProductPatch) -> Option<ValidationFailure> {
    let mut bad = Vec::new();
    if patch.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
        bad.push("name");
    }
    if patch.quantity.is_some_and(|quantity| quantity < 0) {
        bad.push("quantity");
    }
    if patch.price_cents.is_some_and(|price| price < 0) {
        bad.push("price_cents");
    }
    failure(bad)
}

fn failure(fields: Vec<&'static str>) -> Option<ValidationFailure> {
    if fields.is_empty() {
        None
    } else {
        Some(ValidationFailure {
            resource: RESOURCE,
            required_fields: fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn draft(name: &str) -> ProductDraft {
        ProductDraft {
            name: name.to_string(),
            sku: None,
            quantity: 3,
            price_cents: 999,
        }
    }

    #[test]
    fn test_product_id_unique() {
        let id1 = ProductId::new();
        let id2 = ProductId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_product_id_parse() {
        let id = ProductId::new();
        let parsed: ProductId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_new_product_starts_at_version_one() {
        let product = Product::new(draft("Beans"));
        assert_eq!(product.version, 1);
        assert_eq!(product.created_at, product.updated_at);
    }

    #[test]
    fn test_patch_apply_preserves_absent_fields() {
        let product = Product::new(draft("Beans"));
        let patch = ProductPatch {
            quantity: Some(7),
            ..ProductPatch::default()
        };

        let applied = patch.apply_to(&product);
        assert_eq!(applied.name, "Beans");
        assert_eq!(applied.quantity, 7);
        assert_eq!(applied.price_cents, 999);
    }

    #[test]
    fn test_validate_draft_requires_name() {
        let failure = validate_draft(&draft("   ")).unwrap();
        assert_eq!(failure.resource, "product");
        assert_eq!(failure.required_fields, vec!["name"]);
    }

    #[test]
    fn test_validate_patch_rejects_negative_price() {
        let patch = ProductPatch {
            price_cents: Some(-1),
            ..ProductPatch::default()
        };
        let failure = validate_patch(&patch).unwrap();
        assert_eq!(failure.required_fields, vec!["price_cents"]);
    }

    #[test]
    fn test_validate_patch_allows_empty_patch() {
        assert!(validate_patch(&ProductPatch::default()).is_none());
    }

    #[test]
    fn test_update_request_round_trips_flattened_fields() {
        let json = r#"{"version":3,"name":"Rice","price_cents":450}"#;
        let request: UpdateRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.version, 3);
        assert_eq!(request.fields.name.as_deref(), Some("Rice"));
        assert_eq!(request.fields.price_cents, Some(450));
        assert!(request.fields.quantity.is_none());
    }
}
