// quillwiki-store: SQLite persistence and transactional page operations.

pub mod annotations;
pub mod config;
pub mod error;
pub mod history;
pub mod manager;
pub mod store;

pub use error::{PageError, PageResult};
pub use manager::PageManager;
