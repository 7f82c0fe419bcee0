pub mod error;
pub mod random;

pub use error::Error;
pub use random::{RandomGenerator, ALPHABET, DEFAULT_CODE_LENGTH};

use wormhole_core::ShortCode;

/// Trait for generating short codes.
///
/// Implementations are pure generators that don't interact with storage.
/// They make no uniqueness promise: callers that need unique codes must
/// check candidates against the store and retry on collision.
pub trait Generator: Send + Sync + 'static {
    type Output: Into<ShortCode>;

    /// Generates a candidate short code.
    fn generate(&self) -> Self::Output;
}
