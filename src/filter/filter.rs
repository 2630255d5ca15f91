use crate::database::schema::Collection;

use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{FilterSpec, SelectSpec, SortSpec, SqlResult};

/// SQL builder for one collection. Identifiers only ever come from the collection
/// schema, values only ever travel as bind parameters.
pub struct Filter {
    collection: Collection,
    select_columns: Option<Vec<&'static str>>,
    where_data: FilterSpec,
    order_data: SortSpec,
    limit: Option<u64>,
    offset: u64,
}

impl Filter {
    pub fn new(collection: Collection) -> Self {
        Self {
            collection,
            select_columns: None,
            where_data: FilterSpec::default(),
            order_data: SortSpec(vec![]),
            limit: None,
            offset: 0,
        }
    }

    /// Projection. `id` is always kept; unknown and hidden fields are dropped.
    pub fn select(&mut self, select: &SelectSpec) -> &mut Self {
        self.select_columns = select.fields().map(|fields| {
            let mut columns = vec!["id"];
            for name in fields {
                if let Some(field) = self.collection.field(name) {
                    if !columns.contains(&field.name) {
                        columns.push(field.name);
                    }
                }
            }
            columns
        });
        self
    }

    pub fn where_clause(&mut self, filter: &FilterSpec) -> &mut Self {
        self.where_data = filter.clone();
        self
    }

    pub fn order(&mut self, sort: &SortSpec) -> &mut Self {
        self.order_data = sort.clone();
        self
    }

    pub fn limit(&mut self, limit: Option<u64>, offset: u64) -> &mut Self {
        self.limit = limit;
        self.offset = offset;
        self
    }

    /// `SELECT json_strip_nulls(row_to_json(t)) AS row FROM (...) t` so rows come back as JSON documents.
    pub fn to_sql(&self) -> SqlResult {
        let (where_clause, params) = FilterWhere::generate(&self.where_data, self.collection, 0);
        let inner = [
            format!("SELECT {}", self.build_select_clause()),
            format!("FROM \"{}\"", self.collection.name()),
            format!("WHERE {}", where_clause),
            FilterOrder::generate(&self.order_data, self.collection),
            self.build_limit_clause(),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        SqlResult {
            query: format!("SELECT json_strip_nulls(row_to_json(t)) AS row FROM ({}) t", inner),
            params,
        }
    }

    pub fn to_count_sql(&self) -> SqlResult {
        let (where_clause, params) = FilterWhere::generate(&self.where_data, self.collection, 0);
        SqlResult {
            query: format!(
                "SELECT COUNT(*) AS count FROM \"{}\" WHERE {}",
                self.collection.name(),
                where_clause
            ),
            params,
        }
    }

    pub fn to_delete_sql(&self) -> SqlResult {
        let (where_clause, params) = FilterWhere::generate(&self.where_data, self.collection, 0);
        SqlResult {
            query: format!("DELETE FROM \"{}\" WHERE {}", self.collection.name(), where_clause),
            params,
        }
    }

    fn build_select_clause(&self) -> String {
        match &self.select_columns {
            None => "*".to_string(),
            Some(columns) => columns
                .iter()
                .map(|c| format!("\"{}\"", c))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    fn build_limit_clause(&self) -> String {
        // Postgres takes BIGINT here
        let bigint = |n: u64| n.min(i64::MAX as u64);
        match (self.limit.map(bigint), bigint(self.offset)) {
            (Some(l), 0) => format!("LIMIT {}", l),
            (Some(l), o) => format!("LIMIT {} OFFSET {}", l, o),
            (None, 0) => String::new(),
            (None, o) => format!("OFFSET {}", o),
        }
    }
}
