use serde::{Deserialize, Serialize};

use super::{ScreenId, ScreenState};
use crate::container::StateError;
use crate::tags;
use crate::validation::{self, FieldErrors};
use crate::{UnixTimeMs, MAX_INTERESTS, MAX_TRAVEL_STYLES, ONBOARDING_STEPS};

pub const INTEREST_OPTIONS: &[&str] = &[
    "beaches",
    "mountains",
    "museums",
    "food",
    "nightlife",
    "hiking",
    "history",
    "shopping",
    "wildlife",
    "architecture",
];

pub const TRAVEL_STYLE_OPTIONS: &[&str] = &["budget", "comfort", "luxury", "adventure", "family", "solo"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingState {
    pub display_name: String,
    pub home_city: String,
    pub interests: Vec<String>,
    pub travel_styles: Vec<String>,
    pub notifications_enabled: bool,
    pub updated_at: UnixTimeMs,
}

impl Default for OnboardingState {
    fn default() -> Self {
        Self {
            display_name: String::new(),
            home_city: String::new(),
            interests: Vec::new(),
            travel_styles: Vec::new(),
            notifications_enabled: true,
            updated_at: UnixTimeMs::now(),
        }
    }
}

impl OnboardingState {
    /// Step 1 is the welcome card and always passes.
    #[must_use]
    pub fn validate_step(&self, step: u8) -> FieldErrors {
        let mut errors = FieldErrors::new();
        match step {
            2 => {
                validation::required(&mut errors, "displayName", &self.display_name);
                validation::required(&mut errors, "homeCity", &self.home_city);
            }
            3 if self.interests.is_empty() => {
                errors.add("interests", "Pick at least one interest.");
            }
            3 if self.interests.len() > MAX_INTERESTS => {
                errors.add("interests", format!("Pick at most {MAX_INTERESTS} interests."));
            }
            4 if self.travel_styles.is_empty() => {
                errors.add("travelStyles", "Pick at least one travel style.");
            }
            4 if self.travel_styles.len() > MAX_TRAVEL_STYLES => {
                errors.add("travelStyles", format!("Pick at most {MAX_TRAVEL_STYLES} travel styles."));
            }
            _ => {}
        }
        errors
    }
}

impl ScreenState for OnboardingState {
    const SCREEN: ScreenId = ScreenId::Onboarding;

    fn selection_limit(path: &str) -> Option<usize> {
        match path {
            "interests" => Some(MAX_INTERESTS),
            "travelStyles" => Some(MAX_TRAVEL_STYLES),
            _ => None,
        }
    }

    fn normalize(&mut self) -> Result<(), StateError> {
        tags::normalize(&mut self.interests, Self::selection_limit("interests"))?;
        tags::normalize(&mut self.travel_styles, Self::selection_limit("travelStyles"))?;
        Ok(())
    }

    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        for step in 1..=ONBOARDING_STEPS.get() {
            errors.merge(self.validate_step(step));
        }
        errors
    }
}
