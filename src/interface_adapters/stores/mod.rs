// Persistence adapters: in-process maps for development and tests, PostgreSQL
// for deployments.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

/// Characters are unique by case-insensitive name.
pub(crate) fn character_key(name: &str) -> String {
    name.trim().to_lowercase()
}
