pub mod booking;
pub mod check_in;
pub mod documents;
pub mod itinerary;
pub mod navigation;
pub mod onboarding;
pub mod preferences;
pub mod profile;
pub mod reviews;
pub mod search;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::container::StateError;
use crate::validation::FieldErrors;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScreenId {
    #[default]
    Onboarding,
    Profile,
    Preferences,
    Search,
    Booking,
    Itinerary,
    CheckIn,
    Navigation,
    Reviews,
    Documents,
}

impl ScreenId {
    pub const ALL: [Self; 10] = [
        Self::Onboarding,
        Self::Profile,
        Self::Preferences,
        Self::Search,
        Self::Booking,
        Self::Itinerary,
        Self::CheckIn,
        Self::Navigation,
        Self::Reviews,
        Self::Documents,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Onboarding => "onboarding",
            Self::Profile => "profile",
            Self::Preferences => "preferences",
            Self::Search => "search",
            Self::Booking => "booking",
            Self::Itinerary => "itinerary",
            Self::CheckIn => "check_in",
            Self::Navigation => "navigation",
            Self::Reviews => "reviews",
            Self::Documents => "documents",
        }
    }
}

impl std::fmt::Display for ScreenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The editable state behind one feature screen.
pub trait ScreenState: Serialize + DeserializeOwned + Clone + Default {
    const SCREEN: ScreenId;

    /// Upper bound for the multi-select list at `path`, if it has one.
    fn selection_limit(_path: &str) -> Option<usize> {
        None
    }

    /// Repairs or rejects state produced by a raw path write: tag sets are
    /// deduplicated and held to their limits, ordered collections re-sorted.
    fn normalize(&mut self) -> Result<(), StateError> {
        Ok(())
    }

    fn validate(&self) -> FieldErrors {
        FieldErrors::new()
    }
}
