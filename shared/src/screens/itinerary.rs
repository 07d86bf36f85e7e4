use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::{ScreenId, ScreenState};
use crate::container::StateError;
use crate::validation::{self, FieldErrors};
use crate::UnixTimeMs;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItineraryError {
    #[error("no itinerary day on {0}")]
    DayNotFound(NaiveDate),
    #[error("a day on {0} already exists")]
    DuplicateDay(NaiveDate),
    #[error("no activity with id {0}")]
    ActivityNotFound(String),
    #[error("invalid activity: {0}")]
    InvalidActivity(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActivityCategory {
    #[default]
    Sightseeing,
    Food,
    Transport,
    Lodging,
    Leisure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub title: String,
    /// 24-hour `HH:MM`; untimed activities sort after timed ones.
    pub start_time: Option<String>,
    pub location: String,
    pub category: ActivityCategory,
    pub completed: bool,
    pub estimated_cost: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDraft {
    pub title: String,
    pub start_time: Option<String>,
    pub location: String,
    pub category: ActivityCategory,
    pub estimated_cost: f64,
}

impl ActivityDraft {
    fn into_activity(self) -> Result<Activity, ItineraryError> {
        if self.title.trim().is_empty() {
            return Err(ItineraryError::InvalidActivity("title is required".into()));
        }
        if let Some(time) = &self.start_time {
            if !is_clock_time(time) {
                return Err(ItineraryError::InvalidActivity(format!("`{time}` is not HH:MM")));
            }
        }
        if !(self.estimated_cost.is_finite() && self.estimated_cost >= 0.0) {
            return Err(ItineraryError::InvalidActivity("cost must be zero or more".into()));
        }

        Ok(Activity {
            id: Uuid::new_v4().to_string(),
            title: self.title.trim().to_owned(),
            start_time: self.start_time,
            location: self.location,
            category: self.category,
            completed: false,
            estimated_cost: self.estimated_cost,
        })
    }
}

fn is_clock_time(value: &str) -> bool {
    let Some((h, m)) = value.split_once(':') else {
        return false;
    };
    let two_digits = |s: &str| s.len() == 2 && s.chars().all(|c| c.is_ascii_digit());
    two_digits(h)
        && two_digits(m)
        && h.parse::<u8>().is_ok_and(|h| h < 24)
        && m.parse::<u8>().is_ok_and(|m| m < 60)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryDay {
    pub date: NaiveDate,
    pub title: String,
    pub activities: Vec<Activity>,
}

impl ItineraryDay {
    fn sort_activities(&mut self) {
        // `None` sorts before `Some`, so compare on presence first.
        self.activities
            .sort_by(|a, b| (a.start_time.is_none(), &a.start_time).cmp(&(b.start_time.is_none(), &b.start_time)));
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Itinerary {
    pub trip_name: String,
    pub destination: String,
    pub start_date: Option<NaiveDate>,
    pub days: Vec<ItineraryDay>,
    pub notes: String,
    pub updated_at: UnixTimeMs,
}

impl Default for Itinerary {
    fn default() -> Self {
        Self {
            trip_name: String::new(),
            destination: String::new(),
            start_date: None,
            days: Vec::new(),
            notes: String::new(),
            updated_at: UnixTimeMs::now(),
        }
    }
}

impl Itinerary {
    /// Adds an empty day, keeping days in date order.
    pub fn add_day(&mut self, date: NaiveDate, title: impl Into<String>) -> Result<(), ItineraryError> {
        if self.days.iter().any(|d| d.date == date) {
            return Err(ItineraryError::DuplicateDay(date));
        }
        let at = self.days.partition_point(|d| d.date < date);
        self.days.insert(
            at,
            ItineraryDay {
                date,
                title: title.into(),
                activities: Vec::new(),
            },
        );
        Ok(())
    }

    pub fn remove_day(&mut self, date: NaiveDate) -> Result<ItineraryDay, ItineraryError> {
        let index = self
            .days
            .iter()
            .position(|d| d.date == date)
            .ok_or(ItineraryError::DayNotFound(date))?;
        Ok(self.days.remove(index))
    }

    /// Returns the new activity's id.
    pub fn add_activity(&mut self, date: NaiveDate, draft: ActivityDraft) -> Result<String, ItineraryError> {
        let day = self
            .days
            .iter_mut()
            .find(|d| d.date == date)
            .ok_or(ItineraryError::DayNotFound(date))?;
        let activity = draft.into_activity()?;
        let id = activity.id.clone();
        day.activities.push(activity);
        day.sort_activities();
        Ok(id)
    }

    pub fn remove_activity(&mut self, id: &str) -> Result<Activity, ItineraryError> {
        for day in &mut self.days {
            if let Some(index) = day.activities.iter().position(|a| a.id == id) {
                return Ok(day.activities.remove(index));
            }
        }
        Err(ItineraryError::ActivityNotFound(id.to_owned()))
    }

    pub fn set_completed(&mut self, id: &str, completed: bool) -> Result<(), ItineraryError> {
        let activity = self
            .days
            .iter_mut()
            .flat_map(|d| d.activities.iter_mut())
            .find(|a| a.id == id)
            .ok_or_else(|| ItineraryError::ActivityNotFound(id.to_owned()))?;
        activity.completed = completed;
        Ok(())
    }

    pub fn activities(&self) -> impl Iterator<Item = &Activity> {
        self.days.iter().flat_map(|d| d.activities.iter())
    }

    #[must_use]
    pub fn total_cost(&self) -> f64 {
        self.activities().map(|a| a.estimated_cost).sum()
    }

    /// Fraction of activities completed, `0.0` for an empty plan.
    #[must_use]
    pub fn completion(&self) -> f64 {
        let total = self.activities().count();
        if total == 0 {
            return 0.0;
        }
        let done = self.activities().filter(|a| a.completed).count();
        #[allow(clippy::cast_precision_loss)]
        let ratio = done as f64 / total as f64;
        ratio
    }
}

impl ScreenState for Itinerary {
    const SCREEN: ScreenId = ScreenId::Itinerary;

    /// A raw write to `days` is re-sorted by date, and each day's activities
    /// by start time. Two days on the same date reject the write.
    fn normalize(&mut self) -> Result<(), StateError> {
        self.days.sort_by_key(|d| d.date);
        if let Some(pair) = self.days.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(StateError::Rejected(ItineraryError::DuplicateDay(pair[0].date).to_string()));
        }
        for day in &mut self.days {
            day.sort_activities();
        }
        Ok(())
    }

    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        validation::required(&mut errors, "tripName", &self.trip_name);
        validation::required(&mut errors, "destination", &self.destination);
        if self.start_date.is_none() {
            errors.add("startDate", "This field is required.");
        }
        if let (Some(start), Some(first)) = (self.start_date, self.days.first()) {
            if first.date < start {
                errors.add("days", "Days can't start before the trip does.");
            }
        }
        errors
    }
}
