use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A stored document. Every document carries a string UUID `id` and an RFC 3339 `createdAt`.
pub type Document = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Bootcamps,
    Courses,
    Reviews,
    Users,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Bootcamps,
        Collection::Courses,
        Collection::Reviews,
        Collection::Users,
    ];

    /// Table / collection name. Always a valid, unquoted SQL identifier.
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Bootcamps => "bootcamps",
            Collection::Courses => "courses",
            Collection::Reviews => "reviews",
            Collection::Users => "users",
        }
    }

    /// Singular label used in client-facing messages.
    pub fn label(&self) -> &'static str {
        match self {
            Collection::Bootcamps => "bootcamp",
            Collection::Courses => "course",
            Collection::Reviews => "review",
            Collection::Users => "user",
        }
    }

    pub fn fields(&self) -> &'static [FieldDef] {
        match self {
            Collection::Bootcamps => BOOTCAMP_FIELDS,
            Collection::Courses => COURSE_FIELDS,
            Collection::Reviews => REVIEW_FIELDS,
            Collection::Users => USER_FIELDS,
        }
    }

    /// Field lookup for query-driven access. Hidden fields are invisible here.
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields().iter().find(|f| f.name == name && !f.hidden)
    }

    /// Field lookup for internal writes, hidden fields included.
    pub fn column(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields().iter().find(|f| f.name == name)
    }

    /// Sets of fields whose combined value must be unique across the collection.
    pub fn unique_keys(&self) -> &'static [&'static [&'static str]] {
        match self {
            Collection::Bootcamps => &[&["name"]],
            Collection::Courses => &[],
            Collection::Reviews => &[&["bootcamp", "user"]],
            Collection::Users => &[&["email"]],
        }
    }

    /// Strips hidden fields before a document leaves the service.
    pub fn public_view(&self, mut doc: Document) -> Document {
        for field in self.fields().iter().filter(|f| f.hidden) {
            doc.remove(field.name);
        }
        doc
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalarKind {
    Id,
    Text,
    Number,
    Boolean,
    Timestamp,
}

impl ScalarKind {
    pub fn sql_type(&self) -> &'static str {
        match self {
            ScalarKind::Id => "UUID",
            ScalarKind::Text => "TEXT",
            ScalarKind::Number => "DOUBLE PRECISION",
            ScalarKind::Boolean => "BOOLEAN",
            ScalarKind::Timestamp => "TIMESTAMPTZ",
        }
    }

    /// Coerces a query-string operand. `None` means no stored value can equal it.
    pub fn coerce_str(&self, raw: &str) -> Option<Scalar> {
        match self {
            ScalarKind::Id => Uuid::parse_str(raw.trim()).ok().map(Scalar::Id),
            ScalarKind::Text => Some(Scalar::Text(raw.to_string())),
            ScalarKind::Number => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Scalar::Number),
            ScalarKind::Boolean => match raw.trim() {
                "true" => Some(Scalar::Bool(true)),
                "false" => Some(Scalar::Bool(false)),
                _ => None,
            },
            ScalarKind::Timestamp => parse_timestamp(raw).map(Scalar::Timestamp),
        }
    }

    /// Reads a stored JSON value as this kind. Mismatched JSON types read as absent.
    pub fn from_json(&self, value: &Value) -> Option<Scalar> {
        match (self, value) {
            (_, Value::Null) => None,
            (ScalarKind::Number, Value::Number(n)) => n.as_f64().map(Scalar::Number),
            (ScalarKind::Boolean, Value::Bool(b)) => Some(Scalar::Bool(*b)),
            (ScalarKind::Text, Value::String(s)) => Some(Scalar::Text(s.clone())),
            (ScalarKind::Id, Value::String(s)) => Uuid::parse_str(s).ok().map(Scalar::Id),
            (ScalarKind::Timestamp, Value::String(s)) => parse_timestamp(s).map(Scalar::Timestamp),
            _ => None,
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    // Date-only operands: `createdAt[gte]=2024-01-01`
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// A typed value, comparable only with values of the same kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Id(Uuid),
    Text(String),
    Number(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

impl Scalar {
    pub fn compare(&self, other: &Scalar) -> Option<Ordering> {
        match (self, other) {
            (Scalar::Id(a), Scalar::Id(b)) => Some(a.cmp(b)),
            (Scalar::Text(a), Scalar::Text(b)) => Some(a.cmp(b)),
            (Scalar::Number(a), Scalar::Number(b)) => a.partial_cmp(b),
            (Scalar::Bool(a), Scalar::Bool(b)) => Some(a.cmp(b)),
            (Scalar::Timestamp(a), Scalar::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Scalar::Id(id) => Value::String(id.to_string()),
            Scalar::Text(s) => Value::String(s.clone()),
            Scalar::Number(n) => serde_json::Number::from_f64(*n).map(Value::Number).unwrap_or(Value::Null),
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Timestamp(ts) => Value::String(format_timestamp(ts)),
        }
    }
}

/// Canonical timestamp format for stored documents.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: ScalarKind,
    /// Stored as an array of `kind`.
    pub list: bool,
    /// Never selectable, filterable or sortable from a query string, never returned to clients.
    pub hidden: bool,
}

impl FieldDef {
    const fn scalar(name: &'static str, kind: ScalarKind) -> Self {
        Self { name, kind, list: false, hidden: false }
    }

    const fn list(name: &'static str, kind: ScalarKind) -> Self {
        Self { name, kind, list: true, hidden: false }
    }

    const fn hidden(name: &'static str, kind: ScalarKind) -> Self {
        Self { name, kind, list: false, hidden: true }
    }

    /// All scalars held by `value` for this field: zero or one for scalar fields, any number for lists.
    pub fn values(&self, value: Option<&Value>) -> Vec<Scalar> {
        match value {
            None => vec![],
            Some(Value::Array(items)) if self.list => {
                items.iter().filter_map(|v| self.kind.from_json(v)).collect()
            }
            Some(v) => self.kind.from_json(v).into_iter().collect(),
        }
    }

    pub fn sql_type(&self) -> String {
        if self.list {
            format!("{}[]", self.kind.sql_type())
        } else {
            self.kind.sql_type().to_string()
        }
    }
}

use ScalarKind::{Boolean, Id, Number, Text, Timestamp};

static BOOTCAMP_FIELDS: &[FieldDef] = &[
    FieldDef::scalar("id", Id),
    FieldDef::scalar("name", Text),
    FieldDef::scalar("description", Text),
    FieldDef::scalar("website", Text),
    FieldDef::scalar("phone", Text),
    FieldDef::scalar("email", Text),
    FieldDef::scalar("address", Text),
    FieldDef::list("careers", Text),
    FieldDef::scalar("averageRating", Number),
    FieldDef::scalar("averageCost", Number),
    FieldDef::scalar("photo", Text),
    FieldDef::scalar("housing", Boolean),
    FieldDef::scalar("jobAssistance", Boolean),
    FieldDef::scalar("jobGuarantee", Boolean),
    FieldDef::scalar("acceptGi", Boolean),
    FieldDef::scalar("user", Id),
    FieldDef::scalar("createdAt", Timestamp),
];

static COURSE_FIELDS: &[FieldDef] = &[
    FieldDef::scalar("id", Id),
    FieldDef::scalar("title", Text),
    FieldDef::scalar("description", Text),
    FieldDef::scalar("weeks", Text),
    FieldDef::scalar("tuition", Number),
    FieldDef::scalar("minimumSkill", Text),
    FieldDef::scalar("scholarshipAvailable", Boolean),
    FieldDef::scalar("bootcamp", Id),
    FieldDef::scalar("user", Id),
    FieldDef::scalar("createdAt", Timestamp),
];

static REVIEW_FIELDS: &[FieldDef] = &[
    FieldDef::scalar("id", Id),
    FieldDef::scalar("title", Text),
    FieldDef::scalar("text", Text),
    FieldDef::scalar("rating", Number),
    FieldDef::scalar("bootcamp", Id),
    FieldDef::scalar("user", Id),
    FieldDef::scalar("createdAt", Timestamp),
];

static USER_FIELDS: &[FieldDef] = &[
    FieldDef::scalar("id", Id),
    FieldDef::scalar("name", Text),
    FieldDef::scalar("email", Text),
    FieldDef::hidden("password", Text),
    FieldDef::scalar("role", Text),
    FieldDef::scalar("createdAt", Timestamp),
];

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerces_by_kind() {
        assert_eq!(ScalarKind::Number.coerce_str("10000"), Some(Scalar::Number(10000.0)));
        assert_eq!(ScalarKind::Number.coerce_str("ten"), None);
        assert_eq!(ScalarKind::Boolean.coerce_str("true"), Some(Scalar::Bool(true)));
        assert_eq!(ScalarKind::Boolean.coerce_str("yes"), None);
        assert!(ScalarKind::Timestamp.coerce_str("2024-01-01").is_some());
        assert!(ScalarKind::Id.coerce_str("not-a-uuid").is_none());
    }

    #[test]
    fn hidden_fields_are_not_queryable() {
        assert!(Collection::Users.field("password").is_none());
        assert!(Collection::Users.column("password").is_some());
        assert!(Collection::Users.field("email").is_some());
    }

    #[test]
    fn public_view_strips_password() {
        let doc = json!({ "id": "x", "email": "a@b.io", "password": "hash" });
        let Value::Object(doc) = doc else { unreachable!() };
        let public = Collection::Users.public_view(doc);
        assert!(public.get("password").is_none());
        assert!(public.get("email").is_some());
    }

    #[test]
    fn list_fields_yield_every_element() {
        let careers = Collection::Bootcamps.field("careers").unwrap();
        let values = careers.values(Some(&json!(["Web Development", "UI/UX"])));
        assert_eq!(values.len(), 2);
    }
}
