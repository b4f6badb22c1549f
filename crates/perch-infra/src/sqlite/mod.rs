//! SQLite-backed persistence.

mod memory;
mod pool;

pub use memory::SqliteMemoryStore;
pub use pool::DatabasePool;
