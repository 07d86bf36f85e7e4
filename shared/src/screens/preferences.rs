use serde::{Deserialize, Serialize};

use super::{ScreenId, ScreenState};
use crate::container::StateError;
use crate::tags;
use crate::validation::{self, FieldErrors};
use crate::{UnixTimeMs, MAX_CUISINES, MAX_GROUP_SIZE, MAX_TRAVEL_STYLES};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Pace {
    Relaxed,
    #[default]
    Moderate,
    Packed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub daily_amount: f64,
    pub currency: String,
}

impl Default for Budget {
    fn default() -> Self {
        Self {
            daily_amount: 150.0,
            currency: "USD".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelPrefs {
    pub budget: Budget,
    pub pace: Pace,
    pub styles: Vec<String>,
    pub group_size: u8,
}

impl Default for TravelPrefs {
    fn default() -> Self {
        Self {
            budget: Budget::default(),
            pace: Pace::default(),
            styles: Vec::new(),
            group_size: 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccommodationPrefs {
    pub types: Vec<String>,
    pub amenities: Vec<String>,
    pub min_stars: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiningPrefs {
    pub cuisines: Vec<String>,
    pub dietary: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPrefs {
    pub email: bool,
    pub push: bool,
    pub price_alerts: bool,
}

impl Default for NotificationPrefs {
    fn default() -> Self {
        Self {
            email: true,
            push: true,
            price_alerts: false,
        }
    }
}

/// Stamped with `lastUpdated` rather than `updatedAt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelPreferences {
    pub travel: TravelPrefs,
    pub accommodation: AccommodationPrefs,
    pub dining: DiningPrefs,
    pub notifications: NotificationPrefs,
    pub last_updated: UnixTimeMs,
}

impl Default for TravelPreferences {
    fn default() -> Self {
        Self {
            travel: TravelPrefs::default(),
            accommodation: AccommodationPrefs::default(),
            dining: DiningPrefs::default(),
            notifications: NotificationPrefs::default(),
            last_updated: UnixTimeMs::now(),
        }
    }
}

impl ScreenState for TravelPreferences {
    const SCREEN: ScreenId = ScreenId::Preferences;

    fn selection_limit(path: &str) -> Option<usize> {
        match path {
            "travel.styles" => Some(MAX_TRAVEL_STYLES),
            "dining.cuisines" => Some(MAX_CUISINES),
            _ => None,
        }
    }

    fn normalize(&mut self) -> Result<(), StateError> {
        tags::normalize(&mut self.travel.styles, Self::selection_limit("travel.styles"))?;
        tags::normalize(&mut self.dining.cuisines, Self::selection_limit("dining.cuisines"))?;
        for list in [
            &mut self.accommodation.types,
            &mut self.accommodation.amenities,
            &mut self.dining.dietary,
        ] {
            tags::normalize(list, None)?;
        }
        Ok(())
    }

    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        let budget = &self.travel.budget;

        if !(budget.daily_amount.is_finite() && budget.daily_amount > 0.0) {
            errors.add("travel.budget.dailyAmount", "Enter a daily budget above zero.");
        }
        validation::three_letter_code(&mut errors, "travel.budget.currency", &budget.currency);
        validation::range(&mut errors, "travel.groupSize", self.travel.group_size, 1, MAX_GROUP_SIZE);
        validation::range(&mut errors, "accommodation.minStars", self.accommodation.min_stars, 0, 5);

        errors
    }
}
