//! Filter-then-sort over in-memory record lists (search results, reviews).
//!
//! [`process`] is pure: it clones the records that pass every active filter
//! and returns them in a stable order, so it is cheap enough to rerun on every
//! filter change or keystroke.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;
pub type Comparator<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    #[must_use]
    pub const fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }

    #[must_use]
    pub const fn toggle(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// A field value extracted for sorting.
#[derive(Debug, Clone, PartialEq)]
pub enum SortValue {
    Missing,
    Bool(bool),
    Number(f64),
    Text(String),
    Date(NaiveDate),
}

impl SortValue {
    #[must_use]
    pub const fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Missing => 0,
            Self::Bool(_) => 1,
            Self::Number(_) => 2,
            Self::Text(_) => 3,
            Self::Date(_) => 4,
        }
    }

    fn compare_present(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    /// Orders two values under `order`; missing values sink to the end in
    /// both directions.
    #[must_use]
    pub fn compare(&self, other: &Self, order: SortOrder) -> Ordering {
        match (self.is_missing(), other.is_missing()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => order.apply(self.compare_present(other)),
        }
    }
}

impl From<bool> for SortValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for SortValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<u32> for SortValue {
    fn from(value: u32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<u8> for SortValue {
    fn from(value: u8) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for SortValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for SortValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<NaiveDate> for SortValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl<T: Into<SortValue>> From<Option<T>> for SortValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Missing, Into::into)
    }
}

/// Records that expose named fields to the sort controls.
pub trait Sortable {
    /// Field names accepted by [`SortBy::Field`].
    fn sort_fields() -> &'static [&'static str];

    fn sort_value(&self, field: &str) -> SortValue;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("unknown sort key `{key}` (expected one of: {})", .allowed.join(", "))]
    InvalidSortKey {
        key: String,
        allowed: &'static [&'static str],
    },
}

pub enum SortBy<T> {
    Field(String),
    Comparator(Comparator<T>),
}

impl<T> Clone for SortBy<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Field(name) => Self::Field(name.clone()),
            Self::Comparator(compare) => Self::Comparator(Arc::clone(compare)),
        }
    }
}

impl<T> fmt::Debug for SortBy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => f.debug_tuple("Field").field(name).finish(),
            Self::Comparator(_) => f.write_str("Comparator(..)"),
        }
    }
}

pub struct SortSpec<T> {
    pub by: SortBy<T>,
    pub order: SortOrder,
}

impl<T> Clone for SortSpec<T> {
    fn clone(&self) -> Self {
        Self {
            by: self.by.clone(),
            order: self.order,
        }
    }
}

impl<T> fmt::Debug for SortSpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortSpec")
            .field("by", &self.by)
            .field("order", &self.order)
            .finish()
    }
}

impl<T> SortSpec<T> {
    #[must_use]
    pub fn field(name: impl Into<String>, order: SortOrder) -> Self {
        Self {
            by: SortBy::Field(name.into()),
            order,
        }
    }

    #[must_use]
    pub fn comparator<F>(compare: F, order: SortOrder) -> Self
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        Self {
            by: SortBy::Comparator(Arc::new(compare)),
            order,
        }
    }
}

impl<T: Sortable> SortSpec<T> {
    pub fn validate(&self) -> Result<(), PipelineError> {
        match &self.by {
            SortBy::Field(name) if !T::sort_fields().contains(&name.as_str()) => {
                Err(PipelineError::InvalidSortKey {
                    key: name.clone(),
                    allowed: T::sort_fields(),
                })
            }
            _ => Ok(()),
        }
    }

    fn ordering(&self, a: &T, b: &T) -> Ordering {
        match &self.by {
            SortBy::Field(name) => a.sort_value(name).compare(&b.sort_value(name), self.order),
            SortBy::Comparator(compare) => self.order.apply(compare(a, b)),
        }
    }
}

/// Serializable sort control state as the shells send it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSelection {
    pub field: String,
    pub order: SortOrder,
}

impl SortSelection {
    #[must_use]
    pub fn new(field: impl Into<String>, order: SortOrder) -> Self {
        Self {
            field: field.into(),
            order,
        }
    }

    #[must_use]
    pub fn to_spec<T>(&self) -> SortSpec<T> {
        SortSpec::field(self.field.clone(), self.order)
    }
}

/// Named predicates, all of which must pass.
pub struct FilterSpec<T> {
    filters: Vec<(String, Predicate<T>)>,
}

impl<T> Default for FilterSpec<T> {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
        }
    }
}

impl<T> Clone for FilterSpec<T> {
    fn clone(&self) -> Self {
        Self {
            filters: self
                .filters
                .iter()
                .map(|(name, predicate)| (name.clone(), Arc::clone(predicate)))
                .collect(),
        }
    }
}

impl<T> fmt::Debug for FilterSpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl<T> FilterSpec<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with<F>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.set(name, predicate);
        self
    }

    /// Installs `predicate` under `name`, replacing any filter of that name.
    pub fn set<F>(&mut self, name: impl Into<String>, predicate: F)
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let name = name.into();
        let predicate: Predicate<T> = Arc::new(predicate);
        match self.filters.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = predicate,
            None => self.filters.push((name, predicate)),
        }
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.filters.len();
        self.filters.retain(|(existing, _)| existing != name);
        self.filters.len() != before
    }

    #[must_use]
    pub fn is_active(&self, name: &str) -> bool {
        self.filters.iter().any(|(existing, _)| existing == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.filters.iter().map(|(name, _)| name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    #[must_use]
    pub fn matches(&self, record: &T) -> bool {
        self.filters.iter().all(|(_, predicate)| predicate(record))
    }
}

/// Returns the records passing every filter, stably ordered by `sort`.
///
/// The sort key is checked up front, so a bad key is reported even when
/// `records` is empty.
pub fn process<T>(
    records: &[T],
    filters: &FilterSpec<T>,
    sort: &SortSpec<T>,
) -> Result<Vec<T>, PipelineError>
where
    T: Sortable + Clone,
{
    sort.validate()?;

    let mut kept: Vec<T> = records
        .iter()
        .filter(|record| filters.matches(record))
        .cloned()
        .collect();
    kept.sort_by(|a, b| sort.ordering(a, b));

    Ok(kept)
}
