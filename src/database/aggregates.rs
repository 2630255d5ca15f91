//! Bootcamp averages derived from their courses and reviews.

use tracing::{debug, error};
use uuid::Uuid;

use super::manager::DatabaseError;
use super::schema::Collection;
use super::store::Store;

/// Which derived field to refresh, and where it is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    /// Mean course tuition.
    AverageCost,
    /// Mean review rating.
    AverageRating,
}

impl Aggregate {
    /// Collection and numeric field the mean is taken over.
    pub fn source(&self) -> (Collection, &'static str) {
        match self {
            Aggregate::AverageCost => (Collection::Courses, "tuition"),
            Aggregate::AverageRating => (Collection::Reviews, "rating"),
        }
    }

    pub fn target_field(&self) -> &'static str {
        match self {
            Aggregate::AverageCost => "averageCost",
            Aggregate::AverageRating => "averageRating",
        }
    }

    pub fn for_collection(collection: Collection) -> Option<Self> {
        match collection {
            Collection::Courses => Some(Aggregate::AverageCost),
            Collection::Reviews => Some(Aggregate::AverageRating),
            _ => None,
        }
    }
}

pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

async fn recompute(store: &dyn Store, aggregate: Aggregate, bootcamp: Uuid) -> Result<(), DatabaseError> {
    let average = store.refresh_average(aggregate, bootcamp).await?;
    debug!("{} of bootcamp {} is now {:?}", aggregate.target_field(), bootcamp, average);
    Ok(())
}

/// Refreshes a bootcamp average after a committed write. Failures are logged, never returned:
/// the write that triggered the refresh has already succeeded.
pub async fn refresh(store: &dyn Store, aggregate: Aggregate, bootcamp: Uuid) {
    if let Err(e) = recompute(store, aggregate, bootcamp).await {
        error!("Failed to refresh {} for bootcamp {}: {}", aggregate.target_field(), bootcamp, e);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::database::memory_store::MemoryStore;
    use crate::database::Document;
    use crate::filter::{FilterCondition, FilterSpec};
    use serde_json::{json, Value};

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[tokio::test]
    async fn average_cost_follows_courses() {
        let store = MemoryStore::new();
        let bootcamp = store.create(Collection::Bootcamps, doc(json!({ "name": "Devworks" }))).await.unwrap();
        let id = Uuid::parse_str(bootcamp["id"].as_str().unwrap()).unwrap();

        for tuition in [8000, 12000] {
            store
                .create(Collection::Courses, doc(json!({ "bootcamp": id.to_string(), "tuition": tuition })))
                .await
                .unwrap();
        }
        refresh(&store, Aggregate::AverageCost, id).await;
        let stored = store.find_by_id(Collection::Bootcamps, id).await.unwrap().unwrap();
        assert_eq!(stored["averageCost"], 10000.0);

        let all = FilterSpec::new().and(FilterCondition::eq("bootcamp", id.to_string()));
        store.delete_many(Collection::Courses, &all).await.unwrap();
        refresh(&store, Aggregate::AverageCost, id).await;
        let stored = store.find_by_id(Collection::Bootcamps, id).await.unwrap().unwrap();
        assert!(stored.get("averageCost").is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_refreshes_settle_on_the_full_mean() {
        let store = Arc::new(MemoryStore::new());
        let bootcamp = store.create(Collection::Bootcamps, doc(json!({ "name": "Devworks" }))).await.unwrap();
        let id = Uuid::parse_str(bootcamp["id"].as_str().unwrap()).unwrap();

        let tasks: Vec<_> = (1..=20)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .create(Collection::Courses, doc(json!({ "bootcamp": id.to_string(), "tuition": i * 100 })))
                        .await
                        .unwrap();
                    refresh(store.as_ref(), Aggregate::AverageCost, id).await;
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let stored = store.find_by_id(Collection::Bootcamps, id).await.unwrap().unwrap();
        assert_eq!(stored["averageCost"], 1050.0);
    }

    #[test]
    fn mean_of_nothing_is_none() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, 10.0]), Some(5.5));
    }
}
