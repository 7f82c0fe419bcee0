pub mod memory;

use crate::error::Result;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// A stored URL record in the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlRecord {
    /// Surrogate key assigned by the store on insert.
    pub id: i64,
    /// The short code that resolves to `original_url`.
    pub short_code: ShortCode,
    /// The original URL that was shortened.
    pub original_url: String,
    /// When the record was inserted.
    pub created_at: Timestamp,
}

/// A read-only view of a repository.
#[async_trait]
pub trait ReadRepository: Send + Sync + 'static {
    /// Retrieves the URL record for a given short code.
    /// Returns `None` if the code does not exist.
    async fn get(&self, code: &ShortCode) -> Result<Option<UrlRecord>>;

    /// Retrieves the record previously created for an exact URL string.
    /// Returns `None` if the URL was never shortened.
    async fn find_by_url(&self, original_url: &str) -> Result<Option<UrlRecord>>;
}

#[async_trait]
pub trait Repository: ReadRepository {
    /// Inserts a new URL record and returns it.
    ///
    /// The check for an existing `code` and the insert happen atomically.
    /// Returns `Err(StorageError::Conflict)` if the code is already taken.
    async fn insert(&self, code: &ShortCode, original_url: &str) -> Result<UrlRecord>;
}
