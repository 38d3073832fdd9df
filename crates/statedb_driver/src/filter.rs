//! Query documents: filters and sort specifications.

use std::cmp::Ordering;

use statedb_codec::Value;

use crate::ID_FIELD;

/// A filter over documents.
///
/// Field names are dotted paths into nested maps (`bag.gold`). Comparisons
/// only match values of the same kind (integers and floats are both
/// numbers); a missing field never matches a comparison, except through
/// [`Filter::Ne`], [`Filter::Exists`] with `false`, or [`Filter::Eq`] against
/// null.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches every document.
    All,
    /// Field equals value. An array field matches if any element is equal.
    Eq(String, Value),
    /// Negation of [`Filter::Eq`].
    Ne(String, Value),
    /// Field is greater than value.
    Gt(String, Value),
    /// Field is greater than or equal to value.
    Gte(String, Value),
    /// Field is less than value.
    Lt(String, Value),
    /// Field is less than or equal to value.
    Lte(String, Value),
    /// Field equals any of the values.
    In(String, Vec<Value>),
    /// Field presence.
    Exists(String, bool),
    /// All sub-filters match.
    And(Vec<Filter>),
    /// At least one sub-filter matches.
    Or(Vec<Filter>),
    /// The sub-filter does not match.
    Not(Box<Filter>),
}

impl Filter {
    /// Field equals value.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq(field.into(), value.into())
    }

    /// Field does not equal value.
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Ne(field.into(), value.into())
    }

    /// Field is greater than value.
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Gt(field.into(), value.into())
    }

    /// Field is greater than or equal to value.
    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Gte(field.into(), value.into())
    }

    /// Field is less than value.
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Lt(field.into(), value.into())
    }

    /// Field is less than or equal to value.
    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Lte(field.into(), value.into())
    }

    /// Field equals one of `values`.
    pub fn any_of<V: Into<Value>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::In(field.into(), values.into_iter().map(Into::into).collect())
    }

    /// Field is present (`true`) or absent (`false`).
    pub fn exists(field: impl Into<String>, present: bool) -> Self {
        Self::Exists(field.into(), present)
    }

    /// Matches the document with the given id.
    pub fn id(id: i64) -> Self {
        Self::Eq(ID_FIELD.to_string(), Value::Integer(id))
    }

    /// Conjunction of `self` and `other`.
    ///
    /// [`Filter::All`] is the identity and nested conjunctions are flattened.
    #[must_use]
    pub fn and(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::All, f) | (f, Filter::All) => f,
            (Filter::And(mut left), Filter::And(right)) => {
                left.extend(right);
                Filter::And(left)
            }
            (Filter::And(mut left), f) => {
                left.push(f);
                Filter::And(left)
            }
            (f, Filter::And(mut right)) => {
                right.insert(0, f);
                Filter::And(right)
            }
            (a, b) => Filter::And(vec![a, b]),
        }
    }

    /// Disjunction of `self` and `other`.
    #[must_use]
    pub fn or(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::Or(mut left), Filter::Or(right)) => {
                left.extend(right);
                Filter::Or(left)
            }
            (Filter::Or(mut left), f) => {
                left.push(f);
                Filter::Or(left)
            }
            (a, b) => Filter::Or(vec![a, b]),
        }
    }

    /// The id this filter pins, if it contains an `id == n` clause at the
    /// top level or inside a conjunction.
    pub fn id_hint(&self) -> Option<i64> {
        match self {
            Filter::Eq(field, Value::Integer(id)) if field == ID_FIELD => Some(*id),
            Filter::And(filters) => filters.iter().find_map(Filter::id_hint),
            _ => None,
        }
    }

    /// Evaluate this filter against a document.
    pub fn matches(&self, document: &Value) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(field, value) => field_equals(document.get_path(field), value),
            Filter::Ne(field, value) => !field_equals(document.get_path(field), value),
            Filter::Gt(field, value) => compare(document.get_path(field), value, Ordering::is_gt),
            Filter::Gte(field, value) => compare(document.get_path(field), value, Ordering::is_ge),
            Filter::Lt(field, value) => compare(document.get_path(field), value, Ordering::is_lt),
            Filter::Lte(field, value) => compare(document.get_path(field), value, Ordering::is_le),
            Filter::In(field, values) => {
                let found = document.get_path(field);
                values.iter().any(|v| field_equals(found, v))
            }
            Filter::Exists(field, present) => document.get_path(field).is_some() == *present,
            Filter::And(filters) => filters.iter().all(|f| f.matches(document)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(document)),
            Filter::Not(inner) => !inner.matches(document),
        }
    }
}

impl std::ops::Not for Filter {
    type Output = Filter;

    fn not(self) -> Self::Output {
        match self {
            Filter::Not(inner) => *inner,
            other => Filter::Not(Box::new(other)),
        }
    }
}

impl Default for Filter {
    fn default() -> Self {
        Filter::All
    }
}

fn same_kind(a: &Value, b: &Value) -> bool {
    let numeric = |v: &Value| matches!(v, Value::Integer(_) | Value::Float(_));
    (numeric(a) && numeric(b)) || std::mem::discriminant(a) == std::mem::discriminant(b)
}

fn field_equals(found: Option<&Value>, expected: &Value) -> bool {
    match found {
        None => expected.is_null(),
        Some(actual) => {
            let direct = same_kind(actual, expected) && actual.cmp_query(expected).is_eq();
            direct
                || match actual {
                    Value::Array(items) if !matches!(expected, Value::Array(_)) => items
                        .iter()
                        .any(|item| same_kind(item, expected) && item.cmp_query(expected).is_eq()),
                    _ => false,
                }
        }
    }
}

fn compare(found: Option<&Value>, bound: &Value, accept: fn(Ordering) -> bool) -> bool {
    match found {
        Some(actual) if same_kind(actual, bound) => accept(actual.cmp_query(bound)),
        _ => false,
    }
}

/// Sort direction for a [`SortSpec`] or an index key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

impl SortDirection {
    /// `Ascending` when `ascending` is true, otherwise `Descending`.
    pub const fn from_ascending(ascending: bool) -> Self {
        if ascending {
            Self::Ascending
        } else {
            Self::Descending
        }
    }

    /// The numeric form used in index names (`1` / `-1`).
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::Ascending => 1,
            Self::Descending => -1,
        }
    }
}

/// Sort by one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    /// Dotted field path.
    pub field: String,
    /// Direction.
    pub direction: SortDirection,
}

impl SortSpec {
    /// Ascending sort on `field`.
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    /// Descending sort on `field`.
    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }

    /// Compare two documents by this key. Missing fields sort as null.
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        let left = a.get_path(&self.field).unwrap_or(&Value::Null);
        let right = b.get_path(&self.field).unwrap_or(&Value::Null);
        let ordering = left.cmp_query(right);
        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// Compare two documents by a list of sort keys, first key first.
pub fn compare_documents(sort: &[SortSpec], a: &Value, b: &Value) -> Ordering {
    sort.iter()
        .map(|spec| spec.compare(a, b))
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}
