//! Query predicates over conference records.
//!
//! The underlying store composes at most one inequality per query, and an
//! inequality must lead the sort order. [`ConferenceQuery::validate`]
//! enforces that shape before any storage is touched; evaluation itself is
//! shared by the store backends.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::conference::Conference;
use crate::error::QueryShapeError;

/// A filterable/sortable conference field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConferenceField {
    Name,
    City,
    Topic,
    Month,
    MaxAttendees,
    SeatsAvailable,
}

impl ConferenceField {
    /// The value type this field carries.
    fn value_type(&self) -> ValueType {
        match self {
            ConferenceField::Name | ConferenceField::City | ConferenceField::Topic => {
                ValueType::Text
            }
            ConferenceField::Month
            | ConferenceField::MaxAttendees
            | ConferenceField::SeatsAvailable => ValueType::Number,
        }
    }
}

impl fmt::Display for ConferenceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConferenceField::Name => "name",
            ConferenceField::City => "city",
            ConferenceField::Topic => "topic",
            ConferenceField::Month => "month",
            ConferenceField::MaxAttendees => "maxAttendees",
            ConferenceField::SeatsAvailable => "seatsAvailable",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueType {
    Text,
    Number,
}

impl ValueType {
    fn as_str(&self) -> &'static str {
        match self {
            ValueType::Text => "text",
            ValueType::Number => "a number",
        }
    }
}

/// Comparison operator of a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl FilterOp {
    /// Whether this operator constrains a range rather than a point.
    pub fn is_inequality(&self) -> bool {
        matches!(self, FilterOp::Lt | FilterOp::Le | FilterOp::Gt | FilterOp::Ge)
    }

    fn accepts(&self, ord: Ordering) -> bool {
        match self {
            FilterOp::Eq => ord == Ordering::Equal,
            FilterOp::Ne => ord != Ordering::Equal,
            FilterOp::Lt => ord == Ordering::Less,
            FilterOp::Le => ord != Ordering::Greater,
            FilterOp::Gt => ord == Ordering::Greater,
            FilterOp::Ge => ord != Ordering::Less,
        }
    }
}

/// A filter operand value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterValue {
    Text(String),
    Number(i64),
}

impl FilterValue {
    fn value_type(&self) -> ValueType {
        match self {
            FilterValue::Text(_) => ValueType::Text,
            FilterValue::Number(_) => ValueType::Number,
        }
    }

    fn compare(&self, other: &FilterValue) -> Option<Ordering> {
        match (self, other) {
            (FilterValue::Text(a), FilterValue::Text(b)) => Some(a.cmp(b)),
            (FilterValue::Number(a), FilterValue::Number(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// One (field, operator, value) predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub field: ConferenceField,
    pub op: FilterOp,
    pub value: FilterValue,
}

impl Filter {
    pub fn new(field: ConferenceField, op: FilterOp, value: FilterValue) -> Self {
        Self { field, op, value }
    }

    /// Whether a conference satisfies this predicate.
    ///
    /// A multi-valued field (topics) matches when any element satisfies the
    /// operator; an unset optional field matches nothing.
    pub fn matches(&self, conference: &Conference) -> bool {
        match field_values(conference, self.field) {
            FieldValues::One(Some(v)) => self.accepts_value(&v),
            FieldValues::One(None) => false,
            FieldValues::Many(vs) => vs.iter().any(|v| self.accepts_value(v)),
        }
    }

    fn accepts_value(&self, actual: &FilterValue) -> bool {
        actual
            .compare(&self.value)
            .map(|ord| self.op.accepts(ord))
            .unwrap_or(false)
    }
}

/// One sort field, ascending unless `descending` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: ConferenceField,
    pub descending: bool,
}

impl SortKey {
    pub fn asc(field: ConferenceField) -> Self {
        Self {
            field,
            descending: false,
        }
    }

    pub fn desc(field: ConferenceField) -> Self {
        Self {
            field,
            descending: true,
        }
    }
}

/// An ordered set of filters plus an ordered sort list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConferenceQuery {
    pub filters: Vec<Filter>,
    pub sort: Vec<SortKey>,
}

impl ConferenceQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style: add a filter.
    pub fn filter(mut self, field: ConferenceField, op: FilterOp, value: FilterValue) -> Self {
        self.filters.push(Filter::new(field, op, value));
        self
    }

    /// Builder-style: add a sort field.
    pub fn order_by(mut self, key: SortKey) -> Self {
        self.sort.push(key);
        self
    }

    /// Check the query shape without touching storage.
    ///
    /// Rejected shapes:
    /// - a filter value whose type does not match its field;
    /// - inequality operators on two distinct fields;
    /// - an inequality filter whose field is not the first sort field
    ///   (when an explicit sort is given).
    pub fn validate(&self) -> Result<(), QueryShapeError> {
        for filter in &self.filters {
            if filter.field.value_type() != filter.value.value_type() {
                return Err(QueryShapeError::TypeMismatch {
                    field: filter.field,
                    expected: filter.field.value_type().as_str(),
                });
            }
        }

        let mut inequality: Option<ConferenceField> = None;
        for filter in &self.filters {
            if !filter.op.is_inequality() {
                continue;
            }
            match inequality {
                None => inequality = Some(filter.field),
                Some(first) if first != filter.field => {
                    return Err(QueryShapeError::MultipleInequalityFields {
                        first,
                        second: filter.field,
                    });
                }
                Some(_) => {}
            }
        }

        if let (Some(field), Some(first_sort)) = (inequality, self.sort.first()) {
            if first_sort.field != field {
                return Err(QueryShapeError::SortMismatch(field));
            }
        }

        Ok(())
    }

    /// The sort list actually applied: the explicit one, or the inequality
    /// field ascending when no explicit sort was given.
    pub fn effective_sort(&self) -> Vec<SortKey> {
        if !self.sort.is_empty() {
            return self.sort.clone();
        }
        self.filters
            .iter()
            .find(|f| f.op.is_inequality())
            .map(|f| vec![SortKey::asc(f.field)])
            .unwrap_or_default()
    }

    /// Evaluate the query over a loaded set of conferences.
    ///
    /// Shared by the store backends; assumes [`validate`](Self::validate)
    /// has passed.
    pub fn apply(&self, mut conferences: Vec<Conference>) -> Vec<Conference> {
        conferences.retain(|c| self.filters.iter().all(|f| f.matches(c)));

        let sort = self.effective_sort();
        if !sort.is_empty() {
            conferences.sort_by(|a, b| {
                for key in &sort {
                    let va = field_sort_value(a, key.field);
                    let vb = field_sort_value(b, key.field);
                    let ord = compare_sort_values(va.as_ref(), vb.as_ref());
                    let ord = if key.descending { ord.reverse() } else { ord };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }

        conferences
    }
}

enum FieldValues {
    One(Option<FilterValue>),
    Many(Vec<FilterValue>),
}

fn field_values(conference: &Conference, field: ConferenceField) -> FieldValues {
    match field {
        ConferenceField::Name => {
            FieldValues::One(Some(FilterValue::Text(conference.name().to_string())))
        }
        ConferenceField::City => FieldValues::One(
            conference
                .city()
                .map(|c| FilterValue::Text(c.to_string())),
        ),
        ConferenceField::Topic => FieldValues::Many(
            conference
                .topics()
                .iter()
                .map(|t| FilterValue::Text(t.clone()))
                .collect(),
        ),
        ConferenceField::Month => FieldValues::One(
            conference.month().map(|m| FilterValue::Number(i64::from(m))),
        ),
        ConferenceField::MaxAttendees => FieldValues::One(Some(FilterValue::Number(i64::from(
            conference.max_attendees(),
        )))),
        ConferenceField::SeatsAvailable => FieldValues::One(Some(FilterValue::Number(i64::from(
            conference.seats_available(),
        )))),
    }
}

/// The value a conference sorts by for a field; multi-valued fields use
/// their smallest element, unset fields sort first.
fn field_sort_value(conference: &Conference, field: ConferenceField) -> Option<FilterValue> {
    match field_values(conference, field) {
        FieldValues::One(v) => v,
        FieldValues::Many(vs) => vs
            .into_iter()
            .min_by(|a, b| compare_sort_values(Some(a), Some(b))),
    }
}

fn compare_sort_values(a: Option<&FilterValue>, b: Option<&FilterValue>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a.compare(b).unwrap_or(Ordering::Equal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conference::ConferenceForm;
    use crate::types::UserId;

    fn conference(id: u64, name: &str, city: Option<&str>, month: u32, max: u32) -> Conference {
        let form = ConferenceForm {
            name: name.to_string(),
            city: city.map(String::from),
            topics: vec!["rust".to_string(), "testing".to_string()],
            start_date: chrono::NaiveDate::from_ymd_opt(2026, month, 1),
            max_attendees: max,
            ..Default::default()
        };
        Conference::new(id, UserId::new("org"), form)
    }

    #[test]
    fn test_two_inequality_fields_rejected() {
        let query = ConferenceQuery::new()
            .filter(
                ConferenceField::Month,
                FilterOp::Gt,
                FilterValue::Number(3),
            )
            .filter(
                ConferenceField::MaxAttendees,
                FilterOp::Lt,
                FilterValue::Number(100),
            );
        assert!(matches!(
            query.validate(),
            Err(QueryShapeError::MultipleInequalityFields { .. })
        ));
    }

    #[test]
    fn test_two_inequalities_same_field_allowed() {
        let query = ConferenceQuery::new()
            .filter(
                ConferenceField::Month,
                FilterOp::Ge,
                FilterValue::Number(3),
            )
            .filter(
                ConferenceField::Month,
                FilterOp::Le,
                FilterValue::Number(6),
            );
        assert!(query.validate().is_ok());
    }

    #[test]
    fn test_sort_must_lead_with_inequality_field() {
        let query = ConferenceQuery::new()
            .filter(
                ConferenceField::MaxAttendees,
                FilterOp::Gt,
                FilterValue::Number(10),
            )
            .order_by(SortKey::asc(ConferenceField::Name));
        assert!(matches!(
            query.validate(),
            Err(QueryShapeError::SortMismatch(ConferenceField::MaxAttendees))
        ));

        let ok = ConferenceQuery::new()
            .filter(
                ConferenceField::MaxAttendees,
                FilterOp::Gt,
                FilterValue::Number(10),
            )
            .order_by(SortKey::asc(ConferenceField::MaxAttendees))
            .order_by(SortKey::asc(ConferenceField::Name));
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_inequality_without_sort_allowed() {
        let query = ConferenceQuery::new().filter(
            ConferenceField::Month,
            FilterOp::Gt,
            FilterValue::Number(3),
        );
        assert!(query.validate().is_ok());
        // Implicit sort by the inequality field.
        assert_eq!(
            query.effective_sort(),
            vec![SortKey::asc(ConferenceField::Month)]
        );
    }

    #[test]
    fn test_value_type_mismatch_rejected() {
        let query = ConferenceQuery::new().filter(
            ConferenceField::Month,
            FilterOp::Eq,
            FilterValue::Text("June".to_string()),
        );
        assert!(matches!(
            query.validate(),
            Err(QueryShapeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_apply_filters_and_sorts() {
        let conferences = vec![
            conference(1, "Beta", Some("London"), 6, 50),
            conference(2, "Alpha", Some("London"), 6, 20),
            conference(3, "Gamma", Some("Paris"), 7, 30),
        ];

        let query = ConferenceQuery::new()
            .filter(
                ConferenceField::City,
                FilterOp::Eq,
                FilterValue::Text("London".to_string()),
            )
            .order_by(SortKey::asc(ConferenceField::Name));
        let result = query.apply(conferences);
        let names: Vec<_> = result.iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, ["Alpha", "Beta"]);
    }

    #[test]
    fn test_apply_inequality_sorts_by_that_field() {
        let conferences = vec![
            conference(1, "Big", None, 6, 500),
            conference(2, "Small", None, 6, 15),
            conference(3, "Mid", None, 6, 80),
        ];
        let query = ConferenceQuery::new().filter(
            ConferenceField::MaxAttendees,
            FilterOp::Gt,
            FilterValue::Number(10),
        );
        let result = query.apply(conferences);
        let sizes: Vec<_> = result.iter().map(|c| c.max_attendees()).collect();
        assert_eq!(sizes, [15, 80, 500]);
    }

    #[test]
    fn test_topic_filter_matches_any_element() {
        let confs = vec![conference(1, "A", None, 6, 10)];
        let hit = ConferenceQuery::new().filter(
            ConferenceField::Topic,
            FilterOp::Eq,
            FilterValue::Text("testing".to_string()),
        );
        assert_eq!(hit.apply(confs.clone()).len(), 1);

        let miss = ConferenceQuery::new().filter(
            ConferenceField::Topic,
            FilterOp::Eq,
            FilterValue::Text("gardening".to_string()),
        );
        assert!(miss.apply(confs).is_empty());
    }

    #[test]
    fn test_unset_field_matches_nothing() {
        let confs = vec![conference(1, "A", None, 6, 10)];
        let query = ConferenceQuery::new().filter(
            ConferenceField::City,
            FilterOp::Ne,
            FilterValue::Text("London".to_string()),
        );
        assert!(query.apply(confs).is_empty());
    }

    #[test]
    fn test_descending_sort() {
        let conferences = vec![
            conference(1, "A", None, 6, 10),
            conference(2, "B", None, 6, 20),
        ];
        let query =
            ConferenceQuery::new().order_by(SortKey::desc(ConferenceField::MaxAttendees));
        let result = query.apply(conferences);
        let sizes: Vec<_> = result.iter().map(|c| c.max_attendees()).collect();
        assert_eq!(sizes, [20, 10]);
    }
}
