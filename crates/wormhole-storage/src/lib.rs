pub mod sqlite;

pub use sqlite::SqliteRepository;
pub use wormhole_core::{
    InMemoryRepository, ReadRepository, Repository, StorageError, UrlRecord,
};
