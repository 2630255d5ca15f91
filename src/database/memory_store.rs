use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::aggregates::{mean, Aggregate};
use super::manager::DatabaseError;
use super::schema::{format_timestamp, Collection, Document, Scalar};
use super::store::{FindQuery, Store};
use crate::filter::filter_order::FilterOrder;
use crate::filter::{FilterCondition, FilterOp, FilterSpec, SelectSpec, SortDirection, SortSpec};

#[derive(Default)]
struct Inner {
    collections: HashMap<Collection, Vec<Document>>,
    last_created: Option<DateTime<Utc>>,
}

impl Inner {
    fn docs(&self, collection: Collection) -> &[Document] {
        self.collections.get(&collection).map(Vec::as_slice).unwrap_or(&[])
    }

    fn docs_mut(&mut self, collection: Collection) -> &mut Vec<Document> {
        self.collections.entry(collection).or_default()
    }

    /// Strictly increasing creation stamps so "newest first" is total even within one clock tick.
    fn next_created_at(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = match self.last_created {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_created = Some(stamp);
        stamp
    }
}

/// Process-local store with the same query semantics as the Postgres store.
/// Used when no DATABASE_URL is configured, and by the test-suite.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn doc_id(doc: &Document) -> Option<Uuid> {
    doc.get("id").and_then(Value::as_str).and_then(|s| Uuid::parse_str(s).ok())
}

fn condition_matches(collection: Collection, doc: &Document, condition: &FilterCondition) -> bool {
    let unmatched = condition.op == FilterOp::Ne;
    let Some(field) = collection.field(&condition.field) else {
        return unmatched;
    };
    let stored = field.values(doc.get(field.name));

    if condition.op == FilterOp::In {
        let targets: Vec<Scalar> = condition
            .value
            .items()
            .into_iter()
            .filter_map(|raw| field.kind.coerce_str(raw))
            .collect();
        return stored.iter().any(|v| targets.iter().any(|t| v.compare(t) == Some(Ordering::Equal)));
    }

    let Some(target) = condition.value.first().and_then(|raw| field.kind.coerce_str(raw)) else {
        return unmatched;
    };
    let any = |pred: fn(Ordering) -> bool| stored.iter().any(|v| v.compare(&target).map(pred).unwrap_or(false));

    match condition.op {
        FilterOp::Eq => any(Ordering::is_eq),
        FilterOp::Ne => !any(Ordering::is_eq),
        FilterOp::Gt => any(Ordering::is_gt),
        FilterOp::Gte => any(Ordering::is_ge),
        FilterOp::Lt => any(Ordering::is_lt),
        FilterOp::Lte => any(Ordering::is_le),
        FilterOp::In => unreachable!("handled above"),
    }
}

fn matches(collection: Collection, doc: &Document, filter: &FilterSpec) -> bool {
    filter.conditions.iter().all(|c| condition_matches(collection, doc, c))
}

fn compare_docs(collection: Collection, sort: &SortSpec, a: &Document, b: &Document) -> Ordering {
    for key in FilterOrder::resolve(sort, collection) {
        let Some(field) = collection.field(&key.field) else { continue };
        let left = field.values(a.get(field.name)).into_iter().next();
        let right = field.values(b.get(field.name)).into_iter().next();
        // absent values sort first, like NULLS FIRST ascending
        let ordering = match (&left, &right) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(l), Some(r)) => l.compare(r).unwrap_or(Ordering::Equal),
        };
        let ordering = match key.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn project(collection: Collection, doc: &Document, select: &SelectSpec) -> Document {
    match select.fields() {
        None => doc.clone(),
        Some(fields) => {
            let mut out = Document::new();
            if let Some(id) = doc.get("id") {
                out.insert("id".into(), id.clone());
            }
            for name in fields {
                if let Some(field) = collection.field(name) {
                    if let Some(value) = doc.get(field.name) {
                        out.insert(field.name.to_string(), value.clone());
                    }
                }
            }
            out
        }
    }
}

fn check_unique(
    collection: Collection,
    docs: &[Document],
    candidate: &Document,
    skip_id: Option<Uuid>,
) -> Result<(), DatabaseError> {
    for key in collection.unique_keys() {
        let values: Vec<&Value> = key.iter().filter_map(|f| candidate.get(*f)).collect();
        if values.len() != key.len() || values.iter().any(|v| v.is_null()) {
            continue;
        }
        let clash = docs.iter().any(|other| {
            doc_id(other) != skip_id && key.iter().zip(&values).all(|(f, v)| other.get(*f) == Some(*v))
        });
        if clash {
            return Err(DatabaseError::Duplicate(format!("{}_{}_key", collection, key.join("_"))));
        }
    }
    Ok(())
}

#[async_trait]
impl Store for MemoryStore {
    async fn find(&self, collection: Collection, query: &FindQuery) -> Result<Vec<Document>, DatabaseError> {
        let inner = self.inner.read().await;
        let mut rows: Vec<&Document> = inner
            .docs(collection)
            .iter()
            .filter(|doc| matches(collection, doc, &query.filter))
            .collect();
        rows.sort_by(|a, b| compare_docs(collection, &query.sort, a, b));

        let skip = usize::try_from(query.skip).unwrap_or(usize::MAX);
        let take = query
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);

        Ok(rows
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|doc| project(collection, doc, &query.select))
            .collect())
    }

    async fn count(&self, collection: Collection, filter: &FilterSpec) -> Result<u64, DatabaseError> {
        let inner = self.inner.read().await;
        let n = inner
            .docs(collection)
            .iter()
            .filter(|doc| matches(collection, doc, filter))
            .count();
        Ok(n as u64)
    }

    async fn find_by_id(&self, collection: Collection, id: Uuid) -> Result<Option<Document>, DatabaseError> {
        let inner = self.inner.read().await;
        Ok(inner.docs(collection).iter().find(|d| doc_id(d) == Some(id)).cloned())
    }

    async fn create(&self, collection: Collection, mut doc: Document) -> Result<Document, DatabaseError> {
        let mut inner = self.inner.write().await;

        let id = match doc.get("id") {
            None | Some(Value::Null) => Uuid::new_v4(),
            Some(_) => doc_id(&doc).ok_or_else(|| DatabaseError::InvalidDocument("id must be a UUID".into()))?,
        };
        if inner.docs(collection).iter().any(|d| doc_id(d) == Some(id)) {
            return Err(DatabaseError::Duplicate(format!("{}_pkey", collection)));
        }
        doc.retain(|_, value| !value.is_null());
        doc.insert("id".into(), Value::String(id.to_string()));
        if !doc.contains_key("createdAt") {
            let created = inner.next_created_at();
            doc.insert("createdAt".into(), Value::String(format_timestamp(&created)));
        }

        check_unique(collection, inner.docs(collection), &doc, None)?;
        inner.docs_mut(collection).push(doc.clone());
        Ok(doc)
    }

    async fn update_by_id(
        &self,
        collection: Collection,
        id: Uuid,
        changes: Document,
    ) -> Result<Option<Document>, DatabaseError> {
        let mut inner = self.inner.write().await;
        let Some(index) = inner.docs(collection).iter().position(|d| doc_id(d) == Some(id)) else {
            return Ok(None);
        };

        let mut updated = inner.docs(collection)[index].clone();
        for (key, value) in changes {
            if key == "id" {
                continue;
            }
            // null clears the field, matching json_strip_nulls on the Postgres side
            if value.is_null() {
                updated.remove(&key);
            } else {
                updated.insert(key, value);
            }
        }
        check_unique(collection, inner.docs(collection), &updated, Some(id))?;

        inner.docs_mut(collection)[index] = updated.clone();
        Ok(Some(updated))
    }

    async fn delete_by_id(&self, collection: Collection, id: Uuid) -> Result<Option<Document>, DatabaseError> {
        let mut inner = self.inner.write().await;
        let docs = inner.docs_mut(collection);
        Ok(docs
            .iter()
            .position(|d| doc_id(d) == Some(id))
            .map(|index| docs.remove(index)))
    }

    async fn delete_many(&self, collection: Collection, filter: &FilterSpec) -> Result<u64, DatabaseError> {
        let mut inner = self.inner.write().await;
        let docs = inner.docs_mut(collection);
        let before = docs.len();
        docs.retain(|doc| !matches(collection, doc, filter));
        Ok((before - docs.len()) as u64)
    }

    async fn refresh_average(&self, aggregate: Aggregate, bootcamp: Uuid) -> Result<Option<f64>, DatabaseError> {
        let mut inner = self.inner.write().await;
        let (source, field) = aggregate.source();
        let parent = bootcamp.to_string();
        let values: Vec<f64> = inner
            .docs(source)
            .iter()
            .filter(|doc| doc.get("bootcamp").and_then(Value::as_str) == Some(parent.as_str()))
            .filter_map(|doc| doc.get(field).and_then(Value::as_f64))
            .collect();
        let average = mean(&values);

        let target = aggregate.target_field();
        if let Some(doc) = inner
            .docs_mut(Collection::Bootcamps)
            .iter_mut()
            .find(|d| doc_id(d) == Some(bootcamp))
        {
            match average {
                Some(value) => {
                    doc.insert(target.to_string(), Value::from(value));
                }
                None => {
                    doc.remove(target);
                }
            }
        }
        Ok(average)
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}
