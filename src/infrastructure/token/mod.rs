//! Token ledger implementations

mod postgres_repository;
mod repository;

pub use postgres_repository::PostgresTokenLedger;
pub use repository::InMemoryTokenLedger;
