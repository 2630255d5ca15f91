use async_trait::async_trait;
use uuid::Uuid;

use super::aggregates::Aggregate;
use super::manager::DatabaseError;
use super::schema::{Collection, Document};
use crate::filter::{FilterSpec, SelectSpec, SortSpec};

/// A bounded fetch: filter, projection, order and window.
#[derive(Debug, Clone, Default)]
pub struct FindQuery {
    pub filter: FilterSpec,
    pub select: SelectSpec,
    pub sort: SortSpec,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindQuery {
    pub fn filtered(filter: FilterSpec) -> Self {
        Self { filter, ..Default::default() }
    }
}

/// Persistence seam. Implementations must make `update_by_id` and `delete_by_id`
/// atomic per document; callers rely on that instead of locking.
#[async_trait]
pub trait Store: Send + Sync {
    async fn find(&self, collection: Collection, query: &FindQuery) -> Result<Vec<Document>, DatabaseError>;

    async fn count(&self, collection: Collection, filter: &FilterSpec) -> Result<u64, DatabaseError>;

    async fn find_by_id(&self, collection: Collection, id: Uuid) -> Result<Option<Document>, DatabaseError>;

    /// Inserts a document, assigning `id` and `createdAt` when absent.
    async fn create(&self, collection: Collection, doc: Document) -> Result<Document, DatabaseError>;

    /// Merges `changes` into the stored document. `None` when the id does not exist.
    async fn update_by_id(
        &self,
        collection: Collection,
        id: Uuid,
        changes: Document,
    ) -> Result<Option<Document>, DatabaseError>;

    /// Removes and returns the document. `None` when the id does not exist.
    async fn delete_by_id(&self, collection: Collection, id: Uuid) -> Result<Option<Document>, DatabaseError>;

    async fn delete_many(&self, collection: Collection, filter: &FilterSpec) -> Result<u64, DatabaseError>;

    /// Recomputes a bootcamp average from its courses or reviews and stores it as one atomic
    /// step, so concurrent refreshes cannot overwrite a newer mean with an older one.
    /// Returns the stored value, `None` when there is nothing to average.
    async fn refresh_average(&self, aggregate: Aggregate, bootcamp: Uuid) -> Result<Option<f64>, DatabaseError>;

    async fn ping(&self) -> Result<(), DatabaseError>;
}
