use crate::database::schema::{Collection, FieldDef, Scalar};

use super::types::{FilterCondition, FilterOp, FilterSpec, SqlParam};

/// Renders a FilterSpec as a parameterized WHERE clause for one collection.
///
/// Conditions on fields the collection does not expose behave like conditions on a
/// missing document field: `ne` holds for every row, every other operator for none.
/// Operands that cannot be coerced to the column type behave the same way.
pub struct FilterWhere {
    collection: Collection,
    param_values: Vec<SqlParam>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(collection: Collection, starting_param_index: usize) -> Self {
        Self {
            collection,
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    pub fn generate(
        filter: &FilterSpec,
        collection: Collection,
        starting_param_index: usize,
    ) -> (String, Vec<SqlParam>) {
        let mut filter_where = Self::new(collection, starting_param_index);
        filter_where.build(filter)
    }

    fn build(&mut self, filter: &FilterSpec) -> (String, Vec<SqlParam>) {
        let sql_conditions: Vec<String> = filter
            .conditions
            .iter()
            .map(|condition| self.build_sql_condition(condition))
            .collect();

        let where_clause = if sql_conditions.is_empty() {
            "TRUE".to_string()
        } else {
            sql_conditions.join(" AND ")
        };
        (where_clause, std::mem::take(&mut self.param_values))
    }

    fn build_sql_condition(&mut self, condition: &FilterCondition) -> String {
        let unmatched = if condition.op == FilterOp::Ne { "TRUE" } else { "FALSE" };

        let Some(field) = self.collection.field(&condition.field) else {
            return unmatched.to_string();
        };
        let column = format!("\"{}\"", field.name);

        if condition.op == FilterOp::In {
            let targets: Vec<Scalar> = condition
                .value
                .items()
                .into_iter()
                .filter_map(|raw| field.kind.coerce_str(raw))
                .collect();
            if targets.is_empty() {
                return "FALSE".to_string();
            }
            let param = self.param(SqlParam::List(field.kind, targets));
            return if field.list {
                format!("{} && {}", column, param)
            } else {
                format!("{} = ANY({})", column, param)
            };
        }

        let Some(target) = condition.value.first().and_then(|raw| field.kind.coerce_str(raw)) else {
            return unmatched.to_string();
        };
        let param = self.param(SqlParam::Value(target));

        match (condition.op, field.list) {
            (FilterOp::Eq, false) => format!("{} = {}", column, param),
            (FilterOp::Eq, true) => format!("{} = ANY({})", param, column),
            (FilterOp::Ne, false) => format!("{} IS DISTINCT FROM {}", column, param),
            (FilterOp::Ne, true) => format!("NOT COALESCE({} = ANY({}), FALSE)", param, column),
            (op, false) => format!("{} {} {}", column, op.to_sql(), param),
            (op, true) => Self::any_element(field, op, &param),
        }
    }

    fn any_element(field: &FieldDef, op: FilterOp, param: &str) -> String {
        format!(
            "EXISTS (SELECT 1 FROM unnest(\"{}\") AS e(v) WHERE e.v {} {})",
            field.name,
            op.to_sql(),
            param
        )
    }

    fn param(&mut self, value: SqlParam) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::schema::ScalarKind;
    use crate::filter::query::{build_filter, QueryParameters};

    fn render(collection: Collection, raw: &str) -> (String, Vec<SqlParam>) {
        FilterWhere::generate(&build_filter(&QueryParameters::parse(raw)), collection, 0)
    }

    #[test]
    fn empty_filter_matches_everything() {
        let (sql, params) = render(Collection::Courses, "");
        assert_eq!(sql, "TRUE");
        assert!(params.is_empty());
    }

    #[test]
    fn typed_comparisons_are_parameterized() {
        let (sql, params) = render(Collection::Courses, "tuition[lte]=10000&minimumSkill=beginner");
        assert_eq!(sql, "\"tuition\" <= $1 AND \"minimumSkill\" = $2");
        assert_eq!(params[0], SqlParam::Value(Scalar::Number(10000.0)));
        assert_eq!(params[1], SqlParam::Value(Scalar::Text("beginner".into())));
    }

    #[test]
    fn list_columns_match_any_element() {
        let (sql, params) = render(Collection::Bootcamps, "careers[in]=Business,Other&careers=UI/UX");
        assert_eq!(sql, "\"careers\" && $1 AND $2 = ANY(\"careers\")");
        assert!(matches!(&params[0], SqlParam::List(ScalarKind::Text, items) if items.len() == 2));
    }

    #[test]
    fn unknown_and_hidden_fields_never_reach_sql() {
        let (sql, params) = render(Collection::Users, "password[gt]=a&nope=1&nope2[ne]=1");
        assert_eq!(sql, "FALSE AND FALSE AND TRUE");
        assert!(params.is_empty());
    }

    #[test]
    fn uncoercible_operands_short_circuit() {
        let (sql, _) = render(Collection::Courses, "tuition=cheap&tuition2=1&scholarshipAvailable[ne]=maybe");
        assert_eq!(sql, "FALSE AND FALSE AND TRUE");
    }

    #[test]
    fn parameter_numbering_continues_from_offset() {
        let filter = build_filter(&QueryParameters::parse("rating[gte]=5"));
        let (sql, _) = FilterWhere::generate(&filter, Collection::Reviews, 3);
        assert_eq!(sql, "\"rating\" >= $4");
    }
}
