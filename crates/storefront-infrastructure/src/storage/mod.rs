//! Durable storage backends.

pub mod atomic_file;
pub mod file_store;

pub use atomic_file::{AtomicFile, StorageError};
pub use file_store::FileStore;
