use serde::{Deserialize, Serialize};

use crate::database::schema::{Scalar, ScalarKind};

/// Comparison operators recognised inside bracketed filter keys (`tuition[lte]=5000`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

impl FilterOp {
    /// Whole-token match only: `in` is an operator, `integer` is not.
    pub fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "eq" => FilterOp::Eq,
            "ne" => FilterOp::Ne,
            "gt" => FilterOp::Gt,
            "gte" => FilterOp::Gte,
            "lt" => FilterOp::Lt,
            "lte" => FilterOp::Lte,
            "in" => FilterOp::In,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Ne => "ne",
            FilterOp::Gt => "gt",
            FilterOp::Gte => "gte",
            FilterOp::Lt => "lt",
            FilterOp::Lte => "lte",
            FilterOp::In => "in",
        }
    }

    /// SQL comparison for the ordering operators. `Eq`, `Ne` and `In` are rendered by FilterWhere.
    pub fn to_sql(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Ne => "<>",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
            FilterOp::In => "IN",
        }
    }
}

/// Raw, still-untyped operand of a condition. Typing happens against the collection schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Single(String),
    List(Vec<String>),
}

impl FilterValue {
    pub fn items(&self) -> Vec<&str> {
        match self {
            FilterValue::Single(s) => vec![s.as_str()],
            FilterValue::List(items) => items.iter().map(String::as_str).collect(),
        }
    }

    /// First operand, used by the scalar operators when a list slipped through.
    pub fn first(&self) -> Option<&str> {
        match self {
            FilterValue::Single(s) => Some(s.as_str()),
            FilterValue::List(items) => items.first().map(String::as_str),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub field: String,
    pub op: FilterOp,
    pub value: FilterValue,
}

impl FilterCondition {
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self { field: field.into(), op: FilterOp::Eq, value: FilterValue::Single(value.into()) }
    }

    pub fn is_in(field: impl Into<String>, values: Vec<String>) -> Self {
        Self { field: field.into(), op: FilterOp::In, value: FilterValue::List(values) }
    }
}

/// Conjunction of conditions. Empty means "no narrowing".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub conditions: Vec<FilterCondition>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn and(mut self, condition: FilterCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Drops every condition on `field`, then pins it with `scope`.
    /// Used by nested routes so a query string cannot widen `bootcamp=<id>`.
    pub fn scoped(mut self, scope: FilterCondition) -> Self {
        self.conditions.retain(|c| c.field != scope.field);
        self.conditions.push(scope);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectSpec {
    #[default]
    All,
    Fields(Vec<String>),
}

impl SelectSpec {
    pub fn fields(&self) -> Option<&[String]> {
        match self {
            SelectSpec::All => None,
            SelectSpec::Fields(fields) => Some(fields),
        }
    }

    /// Space-joined projection, the form a document store's select API takes.
    pub fn to_projection(&self) -> String {
        match self {
            SelectSpec::All => String::new(),
            SelectSpec::Fields(fields) => fields.join(" "),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: SortDirection::Asc }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: SortDirection::Desc }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec(pub Vec<SortKey>);

impl SortSpec {
    pub const CREATED_AT: &'static str = "createdAt";

    pub fn keys(&self) -> &[SortKey] {
        &self.0
    }
}

impl Default for SortSpec {
    /// Newest first.
    fn default() -> Self {
        SortSpec(vec![SortKey::desc(Self::CREATED_AT)])
    }
}

/// Output of the query translator: everything but the pagination window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPlan {
    pub filter: FilterSpec,
    pub select: SelectSpec,
    pub sort: SortSpec,
}

/// A bind parameter, typed by the column it is compared against.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Value(Scalar),
    Null(ScalarKind),
    List(ScalarKind, Vec<Scalar>),
}

/// Positional SQL with its bound parameters.
#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<SqlParam>,
}
