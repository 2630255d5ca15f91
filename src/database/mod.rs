pub mod aggregates;
pub mod manager;
pub mod memory_store;
pub mod models;
pub mod pg_store;
pub mod schema;
pub mod store;

use std::sync::Arc;

use tracing::info;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory_store::MemoryStore;
pub use pg_store::PgStore;
pub use schema::{Collection, Document};
pub use store::{FindQuery, Store};

use crate::config::DatabaseConfig;

/// Opens the configured store: Postgres when a URL is set, otherwise an in-memory store.
pub async fn connect(config: &DatabaseConfig) -> Result<Arc<dyn Store>, DatabaseError> {
    match config.url {
        Some(_) => Ok(Arc::new(PgStore::connect(config).await?)),
        None => {
            info!("DATABASE_URL not set, using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
