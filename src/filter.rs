// Optional availability filters composed onto a parameterized base query
// The builder never touches the database: it returns query text and arguments,
// and the caller executes them.

use rusqlite::types::Value;

// Each filter is applied only when present
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    pub max_price: Option<f64>,
    pub floor: Option<i64>,
    pub pets_allowed: Option<bool>,
}

impl FilterSet {
    pub fn is_empty(&self) -> bool {
        self.max_price.is_none() && self.floor.is_none() && self.pets_allowed.is_none()
    }

    pub fn with_max_price(mut self, max_price: f64) -> Self {
        self.max_price = Some(max_price);
        self
    }

    pub fn with_floor(mut self, floor: i64) -> Self {
        self.floor = Some(floor);
        self
    }

    pub fn with_pets_allowed(mut self, pets_allowed: bool) -> Self {
        self.pets_allowed = Some(pets_allowed);
        self
    }
}

// Finished statement: placeholders in `query` line up with `args` one to one
#[derive(Debug, Clone, PartialEq)]
pub struct FilterStatement {
    query: String,
    args: Vec<Value>,
}

impl FilterStatement {
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.query, self.args)
    }
}

pub struct FilterStatementBuilder {
    query: String,
    args: Vec<Value>,
}

impl FilterStatementBuilder {
    pub fn new(query: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            query: query.into(),
            args,
        }
    }

    fn push_clause(&mut self, clause: &str, value: Value) {
        self.query.push_str(" AND ");
        self.query.push_str(clause);
        self.args.push(value);
    }

    // Clauses are appended in declaration order: max price, floor, pet policy
    pub fn build(mut self, filters: &FilterSet) -> FilterStatement {
        if let Some(max_price) = filters.max_price {
            self.push_clause("price <= ?", Value::Real(max_price));
        }
        if let Some(floor) = filters.floor {
            self.push_clause("floor = ?", Value::Integer(floor));
        }
        if let Some(pets_allowed) = filters.pets_allowed {
            self.push_clause("pets_allowed = ?", Value::Integer(i64::from(pets_allowed)));
        }

        FilterStatement {
            query: self.query,
            args: self.args,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const BASE: &str = "SELECT room_type FROM rooms WHERE max_person >= ?";

    fn base_args() -> Vec<Value> {
        vec![Value::Integer(2)]
    }

    #[test]
    fn test_no_filters_is_identity() {
        let statement = FilterStatementBuilder::new(BASE, base_args()).build(&FilterSet::default());

        assert_eq!(statement.query(), BASE);
        assert_eq!(statement.args(), base_args().as_slice());
    }

    #[test_case(FilterSet::default().with_max_price(100.0),
        " AND price <= ?", vec![Value::Real(100.0)]; "#1 max price only")]
    #[test_case(FilterSet::default().with_floor(2),
        " AND floor = ?", vec![Value::Integer(2)]; "#2 floor only")]
    #[test_case(FilterSet::default().with_pets_allowed(true),
        " AND pets_allowed = ?", vec![Value::Integer(1)]; "#3 pets only")]
    #[test_case(FilterSet::default().with_max_price(100.0).with_floor(2),
        " AND price <= ? AND floor = ?", vec![Value::Real(100.0), Value::Integer(2)]; "#4 price then floor")]
    #[test_case(FilterSet::default().with_floor(2).with_max_price(100.0),
        " AND price <= ? AND floor = ?", vec![Value::Real(100.0), Value::Integer(2)]; "#5 set order does not matter")]
    #[test_case(FilterSet::default().with_max_price(80.5).with_pets_allowed(false),
        " AND price <= ? AND pets_allowed = ?", vec![Value::Real(80.5), Value::Integer(0)]; "#6 skipped middle filter")]
    #[test_case(FilterSet { max_price: Some(250.0), floor: Some(3), pets_allowed: Some(true) },
        " AND price <= ? AND floor = ? AND pets_allowed = ?",
        vec![Value::Real(250.0), Value::Integer(3), Value::Integer(1)]; "#7 all filters")]
    fn test_filter_composition(filters: FilterSet, expected_suffix: &str, expected_extra: Vec<Value>) {
        let statement = FilterStatementBuilder::new(BASE, base_args()).build(&filters);

        assert_eq!(statement.query(), format!("{}{}", BASE, expected_suffix));

        let mut expected_args = base_args();
        expected_args.extend(expected_extra);
        assert_eq!(statement.args(), expected_args.as_slice());

        // Base arguments stay first and every placeholder has exactly one argument
        let placeholders = statement.query().matches('?').count();
        assert_eq!(placeholders, statement.args().len());
    }

    #[test]
    fn test_into_parts() {
        let (query, args) = FilterStatementBuilder::new(BASE, base_args())
            .build(&FilterSet::default().with_floor(1))
            .into_parts();

        assert!(query.ends_with("AND floor = ?"));
        assert_eq!(args, vec![Value::Integer(2), Value::Integer(1)]);
    }

    #[test]
    fn test_is_empty() {
        assert!(FilterSet::default().is_empty());
        assert!(!FilterSet::default().with_pets_allowed(false).is_empty());
    }
}
