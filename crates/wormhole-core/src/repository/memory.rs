use crate::error::{Result, StorageError};
use crate::repository::{ReadRepository, Repository, UrlRecord};
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use jiff::Timestamp;
use std::sync::atomic::{AtomicI64, Ordering};

/// In-memory implementation of the Repository trait using DashMap.
///
/// DashMap provides better concurrency than RwLock<HashMap> because it
/// uses sharded locks, allowing concurrent reads and writes to different
/// buckets without blocking. Inserts go through `entry`, which holds the
/// shard lock across the check and the write.
#[derive(Debug)]
pub struct InMemoryRepository {
    by_code: DashMap<String, UrlRecord>,
    by_url: DashMap<String, String>,
    next_id: AtomicI64,
}

impl InMemoryRepository {
    /// Creates a new in-memory repository.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates a new in-memory repository with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            by_code: DashMap::with_capacity(capacity),
            by_url: DashMap::with_capacity(capacity),
            next_id: AtomicI64::new(1),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReadRepository for InMemoryRepository {
    async fn get(&self, code: &ShortCode) -> Result<Option<UrlRecord>> {
        Ok(self.by_code.get(code.as_str()).map(|entry| entry.clone()))
    }

    async fn find_by_url(&self, original_url: &str) -> Result<Option<UrlRecord>> {
        let Some(code) = self.by_url.get(original_url).map(|entry| entry.clone()) else {
            return Ok(None);
        };

        Ok(self.by_code.get(&code).map(|entry| entry.clone()))
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn insert(&self, code: &ShortCode, original_url: &str) -> Result<UrlRecord> {
        let record = match self.by_code.entry(code.as_str().to_owned()) {
            Entry::Occupied(_) => return Err(StorageError::Conflict(code.to_string())),
            Entry::Vacant(vacant) => {
                let record = UrlRecord {
                    id: self.next_id.fetch_add(1, Ordering::SeqCst),
                    short_code: code.clone(),
                    original_url: original_url.to_owned(),
                    created_at: Timestamp::now(),
                };
                vacant.insert(record.clone());
                record
            }
        };

        // First code wins the reverse index, like the oldest row in SQL.
        self.by_url
            .entry(original_url.to_owned())
            .or_insert_with(|| code.as_str().to_owned());

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn code(s: &str) -> ShortCode {
        ShortCode::new_unchecked(s)
    }

    #[tokio::test]
    async fn insert_and_get() {
        let repo = InMemoryRepository::new();

        let inserted = repo
            .insert(&code("abc123"), "https://example.com")
            .await
            .unwrap();

        let result = repo.get(&code("abc123")).await.unwrap().unwrap();
        assert_eq!(result, inserted);
        assert_eq!(result.original_url, "https://example.com");
        assert_eq!(result.short_code.as_str(), "abc123");
    }

    #[tokio::test]
    async fn get_nonexistent() {
        let repo = InMemoryRepository::new();

        let result = repo.get(&code("nope")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn insert_conflict() {
        let repo = InMemoryRepository::new();

        repo.insert(&code("abc123"), "https://example.com")
            .await
            .unwrap();

        let err = repo
            .insert(&code("abc123"), "https://other.com")
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Conflict(_)));
        // The original record is untouched.
        let result = repo.get(&code("abc123")).await.unwrap().unwrap();
        assert_eq!(result.original_url, "https://example.com");
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn ids_increase_monotonically() {
        let repo = InMemoryRepository::new();

        let first = repo.insert(&code("aaa"), "https://a.com").await.unwrap();
        let second = repo.insert(&code("bbb"), "https://b.com").await.unwrap();

        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn find_by_url_uses_exact_match() {
        let repo = InMemoryRepository::new();

        repo.insert(&code("abc123"), "https://example.com")
            .await
            .unwrap();

        let hit = repo.find_by_url("https://example.com").await.unwrap();
        assert_eq!(hit.unwrap().short_code.as_str(), "abc123");

        assert!(repo
            .find_by_url("https://example.com/")
            .await
            .unwrap()
            .is_none());
        assert!(repo
            .find_by_url("HTTPS://example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn find_by_url_keeps_first_code() {
        let repo = InMemoryRepository::new();

        repo.insert(&code("first"), "https://example.com")
            .await
            .unwrap();
        repo.insert(&code("second"), "https://example.com")
            .await
            .unwrap();

        let hit = repo.find_by_url("https://example.com").await.unwrap();
        assert_eq!(hit.unwrap().short_code.as_str(), "first");
    }

    #[tokio::test]
    async fn concurrent_inserts_of_same_code_admit_one() {
        let repo = Arc::new(InMemoryRepository::new());
        let mut handles = vec![];

        for i in 0..16u64 {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                repo.insert(&code("same"), &format!("https://example{}.com", i))
                    .await
                    .is_ok()
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap() {
                successes += 1;
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_access() {
        let repo = Arc::new(InMemoryRepository::new());
        let mut handles = vec![];

        for i in 0..10u64 {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                let c = ShortCode::new_unchecked(format!("code{:03}", i));
                repo.insert(&c, &format!("https://example{}.com", i))
                    .await
                    .unwrap();
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        for i in 0..10u64 {
            let c = ShortCode::new_unchecked(format!("code{:03}", i));
            let result = repo.get(&c).await.unwrap().unwrap();
            assert_eq!(result.original_url, format!("https://example{}.com", i));
        }
    }
}
