//! Shapes what a store lookup returned into what the invoking field expects.

use crate::registry::Cardinality;
use crate::store::Record;

/// The raw result of [`DataAccess::lookup`](crate::store::DataAccess::lookup).
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Lookup {
    #[default]
    Empty,
    One(Record),
    Many(Vec<Record>),
}

impl From<Record> for Lookup {
    fn from(record: Record) -> Self {
        Self::One(record)
    }
}

impl From<Option<Record>> for Lookup {
    fn from(record: Option<Record>) -> Self {
        record.map_or(Self::Empty, Self::One)
    }
}

impl From<Vec<Record>> for Lookup {
    fn from(records: Vec<Record>) -> Self {
        Self::Many(records)
    }
}

/// What a singular lookup field found.
#[derive(Debug, Clone, PartialEq)]
pub enum SingularMatch {
    NotFound,
    One(Record),
    /// More than one record satisfied a filter the caller expected to be unique.
    ///
    /// Presenting this as a single value is the caller's decision, see
    /// [`AmbiguousMatchPolicy`](crate::AmbiguousMatchPolicy).
    Many(Vec<Record>),
}

impl SingularMatch {
    pub fn into_option(self) -> Option<Record> {
        match self {
            Self::One(record) => Some(record),
            Self::NotFound | Self::Many(_) => None,
        }
    }
}

/// A lookup result shaped for the requesting field.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciled {
    Single(SingularMatch),
    List(Vec<Record>),
}

/// Normalizes a lookup result to the expected cardinality.
///
/// For a single value, an empty result (or empty list) is [`SingularMatch::NotFound`] and a
/// one-element list is unwrapped. Longer lists are passed through as [`SingularMatch::Many`]
/// rather than truncated. For a list, a lone record is wrapped and an empty result becomes an
/// empty list.
pub fn reconcile(raw: Lookup, expected: Cardinality) -> Reconciled {
    match expected {
        Cardinality::Single => Reconciled::Single(reconcile_single(raw)),
        Cardinality::List => Reconciled::List(reconcile_list(raw)),
    }
}

pub fn reconcile_single(raw: Lookup) -> SingularMatch {
    match raw {
        Lookup::Empty => SingularMatch::NotFound,
        Lookup::One(record) => SingularMatch::One(record),
        Lookup::Many(mut records) => match records.len() {
            0 => SingularMatch::NotFound,
            1 => SingularMatch::One(records.remove(0)),
            _ => SingularMatch::Many(records),
        },
    }
}

pub fn reconcile_list(raw: Lookup) -> Vec<Record> {
    match raw {
        Lookup::Empty => Vec::new(),
        Lookup::One(record) => vec![record],
        Lookup::Many(records) => records,
    }
}
