//! Session resolution: cache, resume, create.

mod manager;
mod store;

pub use manager::SessionManager;
pub use store::{InMemorySessionStore, SessionStore};
