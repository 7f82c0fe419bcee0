//! URL shortener service implementation.
//!
//! This crate provides [`ShortenerService`], the engine behind the
//! `shorten` and `resolve` operations. Core types are re-exported from
//! `wormhole_core`.

pub mod service;

pub use service::{ShortenerService, ShortenerSettings, DEFAULT_MAX_ATTEMPTS};
pub use wormhole_core::{Shortener, ShortenerError};
