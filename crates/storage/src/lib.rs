#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{ExamStateRepository, InMemoryRepository, Storage, StorageError};
