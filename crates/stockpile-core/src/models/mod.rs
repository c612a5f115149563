//! Data models for Stockpile

mod actor;
mod conflict;
mod product;

pub use actor::{Actor, Role};
pub use conflict::ConflictDescriptor;
pub use product::{
    validate_draft, validate_patch, AppliedFields, Product, ProductDraft, ProductId, ProductPatch,
    UpdateRequest, ValidationFailure, PROTECTED_FIELD, RESOURCE,
};
