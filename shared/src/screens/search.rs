use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{ScreenId, ScreenState};
use crate::pipeline::{FilterSpec, SortOrder, SortSelection, SortValue, Sortable};
use crate::validation::{self, FieldErrors};
use crate::{UnixTimeMs, MAX_GUESTS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SearchCategory {
    #[default]
    Stays,
    Flights,
    Experiences,
    Dining,
}

impl SearchCategory {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stays => "stays",
            Self::Flights => "flights",
            Self::Experiences => "experiences",
            Self::Dining => "dining",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub destination: String,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub guests: u8,
    pub category: SearchCategory,
    pub updated_at: UnixTimeMs,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            destination: String::new(),
            check_in: None,
            check_out: None,
            guests: 2,
            category: SearchCategory::default(),
            updated_at: UnixTimeMs::now(),
        }
    }
}

impl SearchQuery {
    /// Dates are optional for a search, but when both are given they must be
    /// ordered and not in the past.
    #[must_use]
    pub fn validate_on(&self, today: NaiveDate) -> FieldErrors {
        let mut errors = FieldErrors::new();
        validation::required(&mut errors, "destination", &self.destination);
        validation::range(&mut errors, "guests", self.guests, 1, MAX_GUESTS);
        validation::not_before(&mut errors, "checkIn", self.check_in, today);
        if self.check_in.is_some() || self.check_out.is_some() {
            validation::date_order(&mut errors, "checkIn", self.check_in, "checkOut", self.check_out);
        }
        errors
    }
}

impl ScreenState for SearchQuery {
    const SCREEN: ScreenId = ScreenId::Search;

    fn validate(&self) -> FieldErrors {
        self.validate_on(crate::today())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub id: String,
    pub name: String,
    pub category: SearchCategory,
    pub location: String,
    pub price: f64,
    pub currency: String,
    pub rating: f64,
    pub review_count: u32,
    pub distance_m: Option<f64>,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub free_cancellation: bool,
}

impl Sortable for SearchResult {
    fn sort_fields() -> &'static [&'static str] {
        &["price", "rating", "reviews", "distance", "name"]
    }

    fn sort_value(&self, field: &str) -> SortValue {
        match field {
            "price" => self.price.into(),
            "rating" => self.rating.into(),
            "reviews" => self.review_count.into(),
            "distance" => self.distance_m.into(),
            "name" => self.name.as_str().into(),
            _ => SortValue::Missing,
        }
    }
}

#[must_use]
pub fn default_sort() -> SortSelection {
    SortSelection::new("rating", SortOrder::Desc)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    pub min_rating: Option<f64>,
    pub max_price: Option<f64>,
    #[serde(default)]
    pub categories: Vec<SearchCategory>,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub free_cancellation_only: bool,
}

impl SearchFilters {
    /// Compiles the active controls into predicates; unset controls add none.
    #[must_use]
    pub fn to_spec(&self) -> FilterSpec<SearchResult> {
        let mut spec = FilterSpec::new();

        if let Some(min) = self.min_rating {
            spec.set("min_rating", move |r: &SearchResult| r.rating >= min);
        }
        if let Some(max) = self.max_price {
            spec.set("max_price", move |r: &SearchResult| r.price <= max);
        }
        if !self.categories.is_empty() {
            let categories = self.categories.clone();
            spec.set("category", move |r: &SearchResult| categories.contains(&r.category));
        }
        if !self.amenities.is_empty() {
            let required = self.amenities.clone();
            spec.set("amenities", move |r: &SearchResult| {
                required.iter().all(|a| r.amenities.contains(a))
            });
        }
        if self.free_cancellation_only {
            spec.set("free_cancellation", |r: &SearchResult| r.free_cancellation);
        }

        spec
    }
}
