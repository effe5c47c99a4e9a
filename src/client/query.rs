//! Structured boolean queries against the search index
//!
//! Covers the subset of the upstream query language the resolver needs:
//! term equality, terms membership and must-not exclusions.

use serde_json::{Map, Value, json};

/// Single field clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// `field == value`
    Term { field: String, value: Value },
    /// `field ∈ values`
    Terms { field: String, values: Vec<Value> },
}

impl Clause {
    pub fn field(&self) -> &str {
        match self {
            Clause::Term { field, .. } | Clause::Terms { field, .. } => field,
        }
    }

    fn to_json(&self) -> Value {
        let (kind, field, operand) = match self {
            Clause::Term { field, value } => ("term", field, value.clone()),
            Clause::Terms { field, values } => ("terms", field, Value::Array(values.clone())),
        };
        let mut inner = Map::new();
        inner.insert(field.clone(), operand);
        let mut outer = Map::new();
        outer.insert(kind.to_string(), Value::Object(inner));
        Value::Object(outer)
    }
}

/// Boolean query: every `filter` and `must` clause matches, no `must_not` clause matches.
///
/// # Example
/// ```ignore
/// let query = SearchQuery::new()
///     .must_not_term("Building.status", 0)
///     .filter_terms("Location.location.id", [10u64, 11]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
    filter: Vec<Clause>,
    must: Vec<Clause>,
    must_not: Vec<Clause>,
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter_term(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter.push(Clause::Term {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn filter_terms<V: Into<Value>>(
        mut self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.filter.push(Clause::Terms {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn must_term(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.must.push(Clause::Term {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn must_not_term(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.must_not.push(Clause::Term {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn filter(&self) -> &[Clause] {
        &self.filter
    }

    pub fn must(&self) -> &[Clause] {
        &self.must
    }

    pub fn must_not(&self) -> &[Clause] {
        &self.must_not
    }

    /// Values of the first `terms` clause on `field`, across filter and must.
    pub fn terms_for(&self, field: &str) -> Option<&[Value]> {
        self.filter.iter().chain(&self.must).find_map(|clause| match clause {
            Clause::Terms { field: f, values } if f == field => Some(values.as_slice()),
            _ => None,
        })
    }

    /// Request body in the upstream (Elasticsearch) format.
    pub fn to_request_body(&self, size: usize) -> Value {
        let mut bool_query = Map::new();
        for (key, clauses) in [
            ("filter", &self.filter),
            ("must", &self.must),
            ("must_not", &self.must_not),
        ] {
            if !clauses.is_empty() {
                bool_query.insert(
                    key.to_string(),
                    Value::Array(clauses.iter().map(Clause::to_json).collect()),
                );
            }
        }

        json!({
            "query": { "bool": bool_query },
            "size": size,
        })
    }
}
