//! Query-string translation: raw parameters in, a filter/select/sort plan out.
//!
//! Filter keys use bracket notation (`averageCost[lte]=10000`). Keys are tokenized
//! segment by segment and only a segment that is exactly an operator name becomes an
//! operator, so `rating[integer]` is a field path and `?name=in` filters on the literal
//! string `in`. Translation never fails: anything malformed is dropped.

use super::types::{
    FilterCondition, FilterOp, FilterSpec, FilterValue, QueryPlan, SelectSpec, SortKey, SortSpec,
};

/// Keys consumed by selection, sorting and pagination. Never filters.
pub const RESERVED_KEYS: &[&str] = &["select", "sortBy", "page", "limit"];

/// Flat key -> value(s) mapping, in first-appearance order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParameters {
    entries: Vec<(String, Vec<String>)>,
}

impl QueryParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses an `application/x-www-form-urlencoded` query string (without the `?`).
    pub fn parse(raw: &str) -> Self {
        let mut params = Self::new();
        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            params.push(key.into_owned(), value.into_owned());
        }
        params
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((key, vec![value])),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    /// First value for `key`; repeated scalar parameters use the first occurrence.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A tokenized filter key: `a[b][gte]` -> path `a.b`, operator `gte`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterKey {
    pub base: String,
    pub path: String,
    pub op: Option<FilterOp>,
    /// `a[]` form: the values are a list.
    pub list: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum KeyToken<'a> {
    Name(&'a str),
    Segment(&'a str),
}

/// Splits a key into its base name and bracket segments. `None` for malformed keys.
fn tokenize_key(key: &str) -> Option<Vec<KeyToken<'_>>> {
    let base_end = key.find('[').unwrap_or(key.len());
    let base = key[..base_end].trim();
    if base.is_empty() || base.contains(']') {
        return None;
    }

    let mut tokens = vec![KeyToken::Name(base)];
    let mut rest = &key[base_end..];
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[')?;
        let close = inner.find(']')?;
        let segment = &inner[..close];
        if segment.contains('[') {
            return None;
        }
        tokens.push(KeyToken::Segment(segment));
        rest = &inner[close + 1..];
    }
    Some(tokens)
}

impl FilterKey {
    pub fn parse(key: &str) -> Option<Self> {
        let tokens = tokenize_key(key)?;
        let mut parts: Vec<&str> = Vec::with_capacity(tokens.len());
        let mut op = None;
        let mut list = false;
        let mut base = "";
        let count = tokens.len();

        for (i, token) in tokens.into_iter().enumerate() {
            let last = i + 1 == count;
            match token {
                KeyToken::Name(name) => {
                    base = name;
                    parts.push(name);
                }
                KeyToken::Segment("") if last => list = true,
                // `a[][b]` has no meaning
                KeyToken::Segment("") => return None,
                KeyToken::Segment(segment) => match FilterOp::from_token(segment) {
                    Some(found) if last => op = Some(found),
                    // an operator must be the final segment
                    Some(_) => return None,
                    None => parts.push(segment),
                },
            }
        }

        Some(Self { base: base.to_string(), path: parts.join("."), op, list })
    }
}

/// Builds the filter from every non-reserved key.
pub fn build_filter(params: &QueryParameters) -> FilterSpec {
    let mut filter = FilterSpec::new();
    for (key, values) in params.iter() {
        let Some(parsed) = FilterKey::parse(key) else {
            tracing::debug!("Ignoring malformed filter key: {}", key);
            continue;
        };
        if RESERVED_KEYS.contains(&parsed.base.as_str()) {
            continue;
        }
        if values.is_empty() {
            continue;
        }

        let op = parsed.op.unwrap_or(if parsed.list || values.len() > 1 {
            FilterOp::In
        } else {
            FilterOp::Eq
        });

        let value = if op == FilterOp::In {
            let items: Vec<String> = values
                .iter()
                .flat_map(|v| v.split(','))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect();
            FilterValue::List(items)
        } else {
            // scalar operators take the first occurrence
            FilterValue::Single(values[0].clone())
        };

        filter.conditions.push(FilterCondition { field: parsed.path, op, value });
    }
    filter
}

fn comma_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

pub fn build_select(params: &QueryParameters) -> SelectSpec {
    match params.first("select") {
        Some(raw) => {
            let mut fields: Vec<String> = Vec::new();
            for field in comma_list(raw) {
                if !fields.iter().any(|f| f == field) {
                    fields.push(field.to_string());
                }
            }
            if fields.is_empty() {
                SelectSpec::All
            } else {
                SelectSpec::Fields(fields)
            }
        }
        None => SelectSpec::All,
    }
}

pub fn build_sort(params: &QueryParameters) -> SortSpec {
    let keys: Vec<SortKey> = params
        .first("sortBy")
        .map(|raw| {
            comma_list(raw)
                .filter_map(|item| match item.strip_prefix('-') {
                    Some(field) if !field.trim().is_empty() => Some(SortKey::desc(field.trim())),
                    Some(_) => None,
                    None => Some(SortKey::asc(item)),
                })
                .collect()
        })
        .unwrap_or_default();

    if keys.is_empty() {
        SortSpec::default()
    } else {
        SortSpec(keys)
    }
}

/// Turns raw query parameters into a filter, a projection and an ordering.
pub fn translate(params: &QueryParameters) -> QueryPlan {
    QueryPlan {
        filter: build_filter(params),
        select: build_select(params),
        sort: build_sort(params),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::types::SortDirection;

    #[test]
    fn reserved_keys_never_filter() {
        let params = QueryParameters::parse("select=name&sortBy=-name&page=2&limit=10&page[gt]=3");
        assert!(build_filter(&params).is_empty());
    }

    #[test]
    fn bracket_operator_becomes_comparison() {
        let params = QueryParameters::parse("averageCost%5Blte%5D=10000");
        let filter = build_filter(&params);
        assert_eq!(
            filter.conditions,
            vec![FilterCondition {
                field: "averageCost".into(),
                op: FilterOp::Lte,
                value: FilterValue::Single("10000".into()),
            }]
        );
    }

    #[test]
    fn substring_of_operator_is_not_rewritten() {
        let filter = build_filter(&QueryParameters::parse("rating[integer]=5&name=in&title=interest"));
        assert_eq!(filter.conditions[0].field, "rating.integer");
        assert_eq!(filter.conditions[0].op, FilterOp::Eq);
        assert_eq!(filter.conditions[1], FilterCondition::eq("name", "in"));
        assert_eq!(filter.conditions[2], FilterCondition::eq("title", "interest"));
    }

    #[test]
    fn in_accepts_commas_and_repeats() {
        let filter = build_filter(&QueryParameters::parse("careers[in]=Business,UI/UX&careers[in]=Other"));
        assert_eq!(
            filter.conditions,
            vec![FilterCondition::is_in(
                "careers",
                vec!["Business".into(), "UI/UX".into(), "Other".into()]
            )]
        );

        let filter = build_filter(&QueryParameters::parse("housing=true&housing=false"));
        assert_eq!(filter.conditions[0].op, FilterOp::In);

        let filter = build_filter(&QueryParameters::parse("careers[]=a&careers[]=b"));
        assert_eq!(filter.conditions[0], FilterCondition::is_in("careers", vec!["a".into(), "b".into()]));
    }

    #[test]
    fn malformed_keys_are_dropped() {
        for raw in ["a[b=1", "[gt]=1", "a]b=1", "a[gt][b]=1", "a[][b]=1", "a[b]c=1"] {
            assert!(build_filter(&QueryParameters::parse(raw)).is_empty(), "{raw}");
        }
    }

    #[test]
    fn multiple_operators_on_one_field_are_conjoined() {
        let filter = build_filter(&QueryParameters::parse("tuition[gte]=1000&tuition[lt]=9000"));
        assert_eq!(filter.len(), 2);
        assert_eq!(filter.conditions[0].op, FilterOp::Gte);
        assert_eq!(filter.conditions[1].op, FilterOp::Lt);
    }

    #[test]
    fn select_is_ordered_and_deduplicated() {
        let select = build_select(&QueryParameters::parse("select=name,description,,name"));
        assert_eq!(select, SelectSpec::Fields(vec!["name".into(), "description".into()]));
        assert_eq!(select.to_projection(), "name description");
        assert_eq!(build_select(&QueryParameters::parse("select=")), SelectSpec::All);
    }

    #[test]
    fn sort_defaults_to_newest_first() {
        let sort = build_sort(&QueryParameters::new());
        assert_eq!(sort.keys(), &[SortKey::desc("createdAt")]);
    }

    #[test]
    fn sort_honours_minus_prefix() {
        let sort = build_sort(&QueryParameters::parse("sortBy=-averageCost,name"));
        assert_eq!(sort.keys()[0].field, "averageCost");
        assert_eq!(sort.keys()[0].direction, SortDirection::Desc);
        assert_eq!(sort.keys()[1].direction, SortDirection::Asc);
        // a bare "-" is ignored and falls back to the default
        assert_eq!(build_sort(&QueryParameters::parse("sortBy=-")), SortSpec::default());
    }
}
