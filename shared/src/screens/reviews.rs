use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ScreenId, ScreenState};
use crate::container::StateError;
use crate::pipeline::{FilterSpec, SortOrder, SortSelection, SortValue, Sortable};
use crate::validation::{self, FieldErrors};
use crate::{tags, UnixTimeMs, MAX_REVIEW_HIGHLIGHTS};

pub const HIGHLIGHT_OPTIONS: &[&str] = &[
    "clean",
    "location",
    "staff",
    "value",
    "quiet",
    "views",
    "breakfast",
    "wifi",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReviewCategory {
    #[default]
    Stay,
    Restaurant,
    Activity,
    Transport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub author: String,
    pub rating: u8,
    pub category: ReviewCategory,
    pub title: String,
    pub body: String,
    pub created_on: NaiveDate,
    pub helpful_count: u32,
    pub verified: bool,
    pub photo_count: u32,
}

impl Sortable for Review {
    fn sort_fields() -> &'static [&'static str] {
        &["rating", "date", "helpful", "author"]
    }

    fn sort_value(&self, field: &str) -> SortValue {
        match field {
            "rating" => self.rating.into(),
            "date" => self.created_on.into(),
            "helpful" => self.helpful_count.into(),
            "author" => self.author.as_str().into(),
            _ => SortValue::Missing,
        }
    }
}

#[must_use]
pub fn default_sort() -> SortSelection {
    SortSelection::new("date", SortOrder::Desc)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewFilters {
    pub min_rating: Option<u8>,
    #[serde(default)]
    pub categories: Vec<ReviewCategory>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    #[serde(default)]
    pub verified_only: bool,
    #[serde(default)]
    pub with_photos: bool,
    /// Case-insensitive match against title and body.
    #[serde(default)]
    pub search: String,
}

impl ReviewFilters {
    #[must_use]
    pub fn to_spec(&self) -> FilterSpec<Review> {
        let mut spec = FilterSpec::new();

        if let Some(min) = self.min_rating {
            spec.set("min_rating", move |r: &Review| r.rating >= min);
        }
        if !self.categories.is_empty() {
            let categories = self.categories.clone();
            spec.set("category", move |r: &Review| categories.contains(&r.category));
        }
        if self.from.is_some() || self.to.is_some() {
            let (from, to) = (self.from, self.to);
            spec.set("date_range", move |r: &Review| {
                from.map_or(true, |d| r.created_on >= d) && to.map_or(true, |d| r.created_on <= d)
            });
        }
        if self.verified_only {
            spec.set("verified", |r: &Review| r.verified);
        }
        if self.with_photos {
            spec.set("photos", |r: &Review| r.photo_count > 0);
        }
        let needle = self.search.trim().to_lowercase();
        if !needle.is_empty() {
            spec.set("search", move |r: &Review| {
                r.title.to_lowercase().contains(&needle) || r.body.to_lowercase().contains(&needle)
            });
        }

        spec
    }
}

/// Mean star rating rounded to one decimal, `None` with no reviews.
#[must_use]
pub fn average_rating(reviews: &[Review]) -> Option<f64> {
    if reviews.is_empty() {
        return None;
    }
    let sum: u32 = reviews.iter().map(|r| u32::from(r.rating)).sum();
    #[allow(clippy::cast_precision_loss)]
    let mean = f64::from(sum) / reviews.len() as f64;
    Some((mean * 10.0).round() / 10.0)
}

/// Count of reviews per star, index 0 holding one-star reviews.
#[must_use]
pub fn histogram(reviews: &[Review]) -> [u32; 5] {
    let mut counts = [0; 5];
    for review in reviews {
        if let Some(slot) = usize::from(review.rating).checked_sub(1).and_then(|i| counts.get_mut(i)) {
            *slot += 1;
        }
    }
    counts
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDraft {
    pub rating: u8,
    pub category: ReviewCategory,
    pub title: String,
    pub body: String,
    pub highlights: Vec<String>,
    pub would_recommend: bool,
    pub updated_at: UnixTimeMs,
}

impl Default for ReviewDraft {
    fn default() -> Self {
        Self {
            rating: 0,
            category: ReviewCategory::default(),
            title: String::new(),
            body: String::new(),
            highlights: Vec::new(),
            would_recommend: true,
            updated_at: UnixTimeMs::now(),
        }
    }
}

impl ReviewDraft {
    #[must_use]
    pub fn into_review(self, author: impl Into<String>, created_on: NaiveDate) -> Review {
        Review {
            id: Uuid::new_v4().to_string(),
            author: author.into(),
            rating: self.rating,
            category: self.category,
            title: self.title.trim().to_owned(),
            body: self.body.trim().to_owned(),
            created_on,
            helpful_count: 0,
            verified: false,
            photo_count: 0,
        }
    }
}

impl ScreenState for ReviewDraft {
    const SCREEN: ScreenId = ScreenId::Reviews;

    fn selection_limit(path: &str) -> Option<usize> {
        (path == "highlights").then_some(MAX_REVIEW_HIGHLIGHTS)
    }

    fn normalize(&mut self) -> Result<(), StateError> {
        Ok(tags::normalize(&mut self.highlights, Some(MAX_REVIEW_HIGHLIGHTS))?)
    }

    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if self.rating == 0 {
            errors.add("rating", "Pick a star rating.");
        } else {
            validation::range(&mut errors, "rating", self.rating, 1, 5);
        }
        validation::length(&mut errors, "title", &self.title, 3, 80);
        validation::length(&mut errors, "body", &self.body, 20, 2000);
        errors
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn review(id: &str, rating: u8, day: u32, helpful: u32) -> Review {
        Review {
            id: id.into(),
            author: format!("guest-{id}"),
            rating,
            category: ReviewCategory::Stay,
            title: format!("Review {id}"),
            body: "Lovely stay close to everything.".into(),
            created_on: NaiveDate::from_ymd_opt(2026, 9, day).unwrap(),
            helpful_count: helpful,
            verified: false,
            photo_count: 0,
        }
    }
}
