use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, trace, warn};
use typed_builder::TypedBuilder;
use wormhole_core::{Repository, ShortCode, Shortener, ShortenerError, StorageError, UrlRecord};
use wormhole_generator::Generator;

pub const DEFAULT_MAX_ATTEMPTS: usize = 10;

/// Tunables for [`ShortenerService`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct ShortenerSettings {
    /// How many candidate codes to try before giving up with
    /// [`ShortenerError::CapacityExhausted`]. Zero is treated as one.
    #[builder(default = DEFAULT_MAX_ATTEMPTS)]
    max_attempts: usize,
}

impl ShortenerSettings {
    pub fn max_attempts(&self) -> usize {
        self.max_attempts.max(1)
    }
}

impl Default for ShortenerSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// A concrete implementation of the `Shortener` trait.
///
/// This service wraps a `Repository` and a `Generator` to handle:
/// - Idempotent shortening: an exact URL string already stored gets its
///   existing code back
/// - Collision retry: a candidate rejected by the store's uniqueness
///   constraint is replaced by a fresh one, up to `max_attempts` times
#[derive(Debug)]
pub struct ShortenerService<R, G> {
    repository: Arc<R>,
    generator: Arc<G>,
    settings: ShortenerSettings,
}

impl<R, G> Clone for ShortenerService<R, G> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            generator: Arc::clone(&self.generator),
            settings: self.settings.clone(),
        }
    }
}

impl<R: Repository, G: Generator> ShortenerService<R, G> {
    /// Creates a new `ShortenerService` with default settings.
    pub fn new(repository: R, generator: G) -> Self {
        Self::with_settings(repository, generator, ShortenerSettings::default())
    }

    pub fn with_settings(repository: R, generator: G, settings: ShortenerSettings) -> Self {
        Self {
            repository: Arc::new(repository),
            generator: Arc::new(generator),
            settings,
        }
    }

    /// Returns the shared repository handle.
    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    fn validate_url(url: &str) -> Result<(), ShortenerError> {
        if url.is_empty() {
            return Err(ShortenerError::InvalidUrl(
                "URL cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn generate_code(&self) -> ShortCode {
        self.generator.generate().into()
    }
}

#[async_trait]
impl<R: Repository, G: Generator> Shortener for ShortenerService<R, G> {
    async fn shorten(&self, original_url: &str) -> Result<ShortCode, ShortenerError> {
        Self::validate_url(original_url)?;

        if let Some(existing) = self.repository.find_by_url(original_url).await? {
            trace!(code = %existing.short_code, "url already shortened");
            return Ok(existing.short_code);
        }

        let attempts = self.settings.max_attempts();
        for attempt in 1..=attempts {
            let candidate = self.generate_code();

            match self.repository.insert(&candidate, original_url).await {
                Ok(record) => {
                    debug!(code = %record.short_code, id = record.id, attempt, "short code assigned");
                    return Ok(record.short_code);
                }
                Err(StorageError::Conflict(_)) => {
                    debug!(code = %candidate, attempt, "short code collision, retrying");
                }
                Err(other) => return Err(other.into()),
            }
        }

        warn!(attempts, "short code space exhausted");
        Err(ShortenerError::CapacityExhausted { attempts })
    }

    async fn resolve(&self, code: &ShortCode) -> Result<Option<UrlRecord>, ShortenerError> {
        Ok(self.repository.get(code).await?)
    }
}
