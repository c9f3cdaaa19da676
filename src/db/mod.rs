//! Persistence for permit applications

mod memory;
mod pool;
mod postgres;
mod store;

pub use memory::MemoryStore;
pub use pool::{create_pool, run_migrations};
pub use postgres::PgStore;
pub use store::{ApplicationStore, StoreError};
