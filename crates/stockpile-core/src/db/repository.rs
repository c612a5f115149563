//! Product repository implementation

use crate::error::{Error, Result};
use crate::models::{AppliedFields, Product, ProductDraft, ProductId};
use libsql::{params, Connection, Row};

/// Result of a version-conditional update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionalWrite {
    /// The expected version matched; the record now carries the new version
    Applied(Product),
    /// The row exists but its version differs from the expected one
    VersionMismatch { actual_version: i64 },
    /// No row with that id
    Missing,
}

/// Result of a version-conditional delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionalDelete {
    Deleted,
    VersionMismatch { actual_version: i64 },
    Missing,
}

/// Trait for product storage operations
///
/// `conditional_update` and `conditional_delete` are the only write paths
/// that touch existing rows; both compare-and-increment in a single
/// statement so two writers holding the same stale version cannot both win.
pub trait ProductRepository {
    /// Insert a new product at version 1
    fn insert(&self, draft: ProductDraft) -> impl std::future::Future<Output = Result<Product>> + Send;

    /// Get a product by ID
    fn get(&self, id: ProductId) -> impl std::future::Future<Output = Result<Option<Product>>> + Send;

    /// List products, most recently updated first
    fn list(
        &self,
        limit: usize,
        offset: usize,
    ) -> impl std::future::Future<Output = Result<Vec<Product>>> + Send;

    /// Apply field values if and only if the stored version equals
    /// `expected_version`; an accepted write sets `version + 1`
    fn conditional_update(
        &self,
        id: ProductId,
        expected_version: i64,
        fields: &AppliedFields,
    ) -> impl std::future::Future<Output = Result<ConditionalWrite>> + Send;

    /// Delete the row if and only if the stored version equals
    /// `expected_version`
    fn conditional_delete(
        &self,
        id: ProductId,
        expected_version: i64,
    ) -> impl std::future::Future<Output = Result<ConditionalDelete>> + Send;
}

/// libSQL implementation of `ProductRepository`
pub struct LibSqlProductRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlProductRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a product from a database row
    fn parse_product(row: &Row) -> Result<Product> {
        let id: String = row.get(0)?;
        let id = id
            .parse()
            .map_err(|_| Error::Database(format!("Invalid product id in row: {id}")))?;
        Ok(Product {
            id,
            name: row.get(1)?,
            sku: row.get(2)?,
            quantity: row.get(3)?,
            price_cents: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
            version: row.get(7)?,
        })
    }
}

const SELECT_COLUMNS: &str =
    "id, name, sku, quantity, price_cents, created_at, updated_at, version";

impl ProductRepository for LibSqlProductRepository<'_> {
    async fn insert(&self, draft: ProductDraft) -> Result<Product> {
        let product = Product::new(draft);

        self.conn
            .execute(
                "INSERT INTO products (id, name, sku, quantity, price_cents, created_at, updated_at, version)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    product.id.as_str(),
                    product.name.clone(),
                    product.sku.clone(),
                    product.quantity,
                    product.price_cents,
                    product.created_at,
                    product.updated_at,
                    product.version
                ],
            )
            .await?;

        Ok(product)
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {SELECT_COLUMNS} FROM products WHERE id = ?1"),
                params![id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_product(&row)?)),
            None => Ok(None),
        }
    }

    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<Product>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM products
                     ORDER BY updated_at DESC
                     LIMIT ?1 OFFSET ?2"
                ),
                params![limit as i64, offset as i64],
            )
            .await?;

        let mut products = Vec::new();
        while let Some(row) = rows.next().await? {
            products.push(Self::parse_product(&row)?);
        }
        Ok(products)
    }

    async fn conditional_update(
        &self,
        id: ProductId,
        expected_version: i64,
        fields: &AppliedFields,
    ) -> Result<ConditionalWrite> {
        let now = chrono::Utc::now().timestamp_millis();

        // Single conditional statement: the version check and the increment
        // are atomic with respect to other writers.
        let affected = self
            .conn
            .execute(
                "UPDATE products
                 SET name = ?1, sku = ?2, quantity = ?3, price_cents = ?4,
                     updated_at = ?5, version = version + 1
                 WHERE id = ?6 AND version = ?7",
                params![
                    fields.name.clone(),
                    fields.sku.clone(),
                    fields.quantity,
                    fields.price_cents,
                    now,
                    id.as_str(),
                    expected_version
                ],
            )
            .await?;

        if affected == 0 {
            return Ok(match self.get(id).await? {
                Some(current) => ConditionalWrite::VersionMismatch {
                    actual_version: current.version,
                },
                None => ConditionalWrite::Missing,
            });
        }

        let updated = self
            .get(id)
            .await?
            .ok_or_else(|| Error::Database(format!("Row vanished after update: {id}")))?;
        Ok(ConditionalWrite::Applied(updated))
    }

    async fn conditional_delete(
        &self,
        id: ProductId,
        expected_version: i64,
    ) -> Result<ConditionalDelete> {
        let affected = self
            .conn
            .execute(
                "DELETE FROM products WHERE id = ?1 AND version = ?2",
                params![id.as_str(), expected_version],
            )
            .await?;

        if affected == 0 {
            return Ok(match self.get(id).await? {
                Some(current) => ConditionalDelete::VersionMismatch {
                    actual_version: current.version,
                },
                None => ConditionalDelete::Missing,
            });
        }

        Ok(ConditionalDelete::Deleted)
    }
}
