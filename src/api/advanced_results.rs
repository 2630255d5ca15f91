//! The collection pipeline shared by every list endpoint: translate the query string,
//! count and fetch with the same filter, populate references, wrap in the envelope.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use super::pagination::paginate;
use crate::config::QueryConfig;
use crate::database::{Collection, Document, FindQuery, Store};
use crate::error::ApiError;
use crate::filter::{translate, FilterCondition, FilterSpec, QueryParameters, SelectSpec};
use crate::middleware::CollectionResponse;

/// Replaces a reference id with a summary of the referenced document.
#[derive(Debug, Clone, Copy)]
pub struct Populate {
    pub path: &'static str,
    pub from: Collection,
    pub select: &'static [&'static str],
}

/// `bootcamp: <id>` becomes `bootcamp: {id, name, description}`.
pub const BOOTCAMP_SUMMARY: Populate = Populate {
    path: "bootcamp",
    from: Collection::Bootcamps,
    select: &["name", "description"],
};

impl Populate {
    /// Populates `path` on every document with one lookup. Dangling references become null.
    pub async fn apply(&self, store: &dyn Store, docs: &mut [Document]) -> Result<(), ApiError> {
        let mut ids: Vec<String> = docs
            .iter()
            .filter_map(|d| d.get(self.path).and_then(Value::as_str))
            .map(str::to_string)
            .collect();
        ids.sort();
        ids.dedup();
        if ids.is_empty() {
            return Ok(());
        }

        let query = FindQuery {
            filter: FilterSpec::new().and(FilterCondition::is_in("id", ids)),
            select: SelectSpec::Fields(self.select.iter().map(|s| s.to_string()).collect()),
            ..Default::default()
        };
        let found: HashMap<String, Document> = store
            .find(self.from, &query)
            .await?
            .into_iter()
            .filter_map(|doc| {
                let id = doc.get("id").and_then(Value::as_str)?.to_string();
                Some((id, doc))
            })
            .collect();

        for doc in docs.iter_mut() {
            let Some(Value::String(id)) = doc.get(self.path) else { continue };
            let populated = found.get(id).cloned().map(Value::Object).unwrap_or(Value::Null);
            doc.insert(self.path.to_string(), populated);
        }
        Ok(())
    }

    pub async fn apply_one(&self, store: &dyn Store, doc: Document) -> Result<Document, ApiError> {
        let mut docs = [doc];
        self.apply(store, &mut docs).await?;
        let [doc] = docs;
        Ok(doc)
    }
}

/// A list endpoint over one collection.
#[derive(Debug, Clone)]
pub struct AdvancedResults {
    collection: Collection,
    scope: Option<FilterCondition>,
    populate: Option<Populate>,
}

impl AdvancedResults {
    pub fn new(collection: Collection) -> Self {
        Self { collection, scope: None, populate: None }
    }

    /// Pins a condition the query string cannot override (`bootcamp = <id>` on nested routes).
    pub fn scoped(mut self, condition: FilterCondition) -> Self {
        self.scope = Some(condition);
        self
    }

    pub fn populate(mut self, populate: Populate) -> Self {
        self.populate = Some(populate);
        self
    }

    pub async fn run(
        &self,
        store: &dyn Store,
        params: &QueryParameters,
        config: &QueryConfig,
    ) -> Result<CollectionResponse, ApiError> {
        let plan = translate(params);
        let filter = match &self.scope {
            Some(scope) => plan.filter.scoped(scope.clone()),
            None => plan.filter,
        };
        if config.debug_logging {
            debug!(
                "{}: filter={:?} select={:?} sort={:?}",
                self.collection, filter.conditions, plan.select, plan.sort
            );
        }

        // count and fetch share one filter so `pagination` agrees with `data`
        let total = store.count(self.collection, &filter).await?;
        let (window, links) = paginate(params, total, config);

        let query = FindQuery {
            filter,
            select: plan.select,
            sort: plan.sort,
            skip: window.skip,
            limit: Some(window.limit),
        };
        let mut docs = store.find(self.collection, &query).await?;
        if let Some(populate) = &self.populate {
            populate.apply(store, &mut docs).await?;
        }

        let data = docs.into_iter().map(|doc| self.collection.public_view(doc)).collect();
        Ok(CollectionResponse::new(data, links))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::database::MemoryStore;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[tokio::test]
    async fn nested_scope_cannot_be_widened() {
        let store = MemoryStore::new();
        let (a, b) = (uuid::Uuid::new_v4().to_string(), uuid::Uuid::new_v4().to_string());
        for bootcamp in [&a, &b, &b] {
            store
                .create(Collection::Courses, doc(json!({ "title": "c", "bootcamp": bootcamp })))
                .await
                .unwrap();
        }

        let params = QueryParameters::parse(&format!("bootcamp={}", b));
        let response = AdvancedResults::new(Collection::Courses)
            .scoped(FilterCondition::eq("bootcamp", a.clone()))
            .run(&store, &params, &AppConfig::development().query)
            .await
            .unwrap();
        assert_eq!(response.count, 1);
        assert_eq!(response.data[0]["bootcamp"], a.as_str());
    }

    #[tokio::test]
    async fn populates_bootcamp_summary() {
        let store = MemoryStore::new();
        let bootcamp = store
            .create(
                Collection::Bootcamps,
                doc(json!({ "name": "Devworks", "description": "Full stack", "phone": "555" })),
            )
            .await
            .unwrap();
        let id = bootcamp["id"].as_str().unwrap().to_string();
        store
            .create(Collection::Reviews, doc(json!({ "title": "Great", "bootcamp": id })))
            .await
            .unwrap();

        let response = AdvancedResults::new(Collection::Reviews)
            .populate(BOOTCAMP_SUMMARY)
            .run(&store, &QueryParameters::new(), &AppConfig::development().query)
            .await
            .unwrap();
        assert_eq!(
            Value::Object(response.data[0]["bootcamp"].as_object().unwrap().clone()),
            json!({ "id": id, "name": "Devworks", "description": "Full stack" })
        );
    }

    #[tokio::test]
    async fn users_never_leak_passwords() {
        let store = MemoryStore::new();
        store
            .create(Collection::Users, doc(json!({ "name": "A", "email": "a@b.io", "password": "hash" })))
            .await
            .unwrap();
        let response = AdvancedResults::new(Collection::Users)
            .run(&store, &QueryParameters::parse("select=password,name"), &AppConfig::development().query)
            .await
            .unwrap();
        assert!(response.data[0].get("password").is_none());
        assert_eq!(response.data[0]["name"], "A");
    }
}
