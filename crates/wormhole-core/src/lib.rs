//! Core types and traits for the Wormhole URL shortener.
//!
//! This crate provides the types shared by the code generator, the storage
//! backends, the shortening engine and the HTTP gateway.

pub mod error;
pub mod repository;
pub mod shortcode;
pub mod shortener;

pub use error::{CoreError, ShortenerError, StorageError};
pub use repository::memory::InMemoryRepository;
pub use repository::{ReadRepository, Repository, UrlRecord};
pub use shortcode::ShortCode;
pub use shortener::Shortener;
