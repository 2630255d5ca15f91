use crate::database::schema::Collection;

use super::types::{SortDirection, SortKey, SortSpec};

/// Final sort key on every ordered query, so pages never overlap.
const TIEBREAKER: &str = "id";

pub struct FilterOrder;

impl FilterOrder {
    /// Sort keys the collection can actually order by. Unknown, hidden and list fields are
    /// skipped; when nothing is left the default newest-first order applies. `id` always
    /// closes the list.
    pub fn resolve(sort: &SortSpec, collection: Collection) -> Vec<SortKey> {
        let sortable = |key: &&SortKey| {
            collection
                .field(&key.field)
                .map(|f| !f.list)
                .unwrap_or(false)
        };
        let mut keys: Vec<SortKey> = sort.keys().iter().filter(sortable).cloned().collect();
        if keys.is_empty() {
            keys = SortSpec::default().keys().to_vec();
        }
        if !keys.iter().any(|key| key.field == TIEBREAKER) {
            keys.push(SortKey::asc(TIEBREAKER));
        }
        keys
    }

    /// Missing values sort first ascending and last descending, the same as the memory store.
    pub fn generate(sort: &SortSpec, collection: Collection) -> String {
        let parts: Vec<String> = Self::resolve(sort, collection)
            .into_iter()
            .map(|key| {
                let nulls = match key.direction {
                    SortDirection::Asc => "NULLS FIRST",
                    SortDirection::Desc => "NULLS LAST",
                };
                format!("\"{}\" {} {}", key.field, key.direction.to_sql(), nulls)
            })
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }
}
