use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::capabilities::{DelayOutput, Ticket};
use crate::pipeline::SortSelection;
use crate::screens::itinerary::ActivityDraft;
use crate::screens::reviews::{Review, ReviewFilters};
use crate::screens::search::{SearchFilters, SearchResult};
use crate::screens::ScreenId;
use crate::LatLon;

// --- Event enum: large variants boxed ---

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Event {
    // Screens & generic form binding
    ScreenOpened {
        screen: ScreenId,
    },
    FieldEdited {
        path: String,
        value: Value,
    },
    TagToggled {
        path: String,
        tag: String,
    },
    FormReset,

    // Step wizards (onboarding, booking, check-in)
    WizardAdvanced,
    WizardBack,
    WizardJumped {
        step: u8,
    },
    OnboardingCompleted,

    // Search
    SearchRequested,
    SearchResultsLoaded {
        results: Vec<SearchResult>,
    },
    SearchFailed {
        message: String,
    },
    SearchFiltersChanged(Box<SearchFilters>),
    SearchSortChanged(SortSelection),
    ListingSelected {
        id: String,
    },

    // Booking & check-in
    BookingSubmitted,
    BookingCancelled,
    CheckInSubmitted,
    CheckInCancelled,

    // Itinerary
    ItineraryDayAdded {
        date: NaiveDate,
        title: String,
    },
    ItineraryDayRemoved {
        date: NaiveDate,
    },
    ActivityAdded {
        date: NaiveDate,
        draft: Box<ActivityDraft>,
    },
    ActivityRemoved {
        id: String,
    },
    ActivityCompleted {
        id: String,
        completed: bool,
    },

    // Navigation
    PositionUpdated {
        position: LatLon,
    },

    // Reviews
    ReviewsLoaded {
        reviews: Vec<Review>,
    },
    ReviewFiltersChanged(Box<ReviewFilters>),
    ReviewSortChanged(SortSelection),
    ReviewSubmitted,
    ReviewMarkedHelpful {
        id: String,
    },

    // Documents
    DocumentSaved,
    DocumentRemoved {
        id: String,
    },

    // UI chrome
    ErrorDismissed,
    ToastDismissed,

    // Capability responses; never sent by shells
    #[serde(skip)]
    ProcessingFinished {
        ticket: Ticket,
        output: DelayOutput,
    },
}

impl Event {
    /// Variant name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ScreenOpened { .. } => "screen_opened",
            Self::FieldEdited { .. } => "field_edited",
            Self::TagToggled { .. } => "tag_toggled",
            Self::FormReset => "form_reset",
            Self::WizardAdvanced => "wizard_advanced",
            Self::WizardBack => "wizard_back",
            Self::WizardJumped { .. } => "wizard_jumped",
            Self::OnboardingCompleted => "onboarding_completed",
            Self::SearchRequested => "search_requested",
            Self::SearchResultsLoaded { .. } => "search_results_loaded",
            Self::SearchFailed { .. } => "search_failed",
            Self::SearchFiltersChanged(_) => "search_filters_changed",
            Self::SearchSortChanged(_) => "search_sort_changed",
            Self::ListingSelected { .. } => "listing_selected",
            Self::BookingSubmitted => "booking_submitted",
            Self::BookingCancelled => "booking_cancelled",
            Self::CheckInSubmitted => "check_in_submitted",
            Self::CheckInCancelled => "check_in_cancelled",
            Self::ItineraryDayAdded { .. } => "itinerary_day_added",
            Self::ItineraryDayRemoved { .. } => "itinerary_day_removed",
            Self::ActivityAdded { .. } => "activity_added",
            Self::ActivityRemoved { .. } => "activity_removed",
            Self::ActivityCompleted { .. } => "activity_completed",
            Self::PositionUpdated { .. } => "position_updated",
            Self::ReviewsLoaded { .. } => "reviews_loaded",
            Self::ReviewFiltersChanged(_) => "review_filters_changed",
            Self::ReviewSortChanged(_) => "review_sort_changed",
            Self::ReviewSubmitted => "review_submitted",
            Self::ReviewMarkedHelpful { .. } => "review_marked_helpful",
            Self::DocumentSaved => "document_saved",
            Self::DocumentRemoved { .. } => "document_removed",
            Self::ErrorDismissed => "error_dismissed",
            Self::ToastDismissed => "toast_dismissed",
            Self::ProcessingFinished { .. } => "processing_finished",
        }
    }

    /// False for events the core raises itself in response to a capability.
    #[must_use]
    pub const fn is_user_initiated(&self) -> bool {
        !matches!(self, Self::ProcessingFinished { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_edit_deserializes_from_shell_json() {
        let event: Event = serde_json::from_value(json!({
            "FieldEdited": { "path": "travel.budget.dailyAmount", "value": 90 }
        }))
        .unwrap();
        assert_eq!(
            event,
            Event::FieldEdited {
                path: "travel.budget.dailyAmount".into(),
                value: json!(90),
            }
        );
        assert_eq!(event.name(), "field_edited");
    }

    #[test]
    fn test_processing_finished_is_internal() {
        let event = Event::ProcessingFinished {
            ticket: Ticket(1),
            output: DelayOutput::Elapsed,
        };
        assert!(!event.is_user_initiated());
        assert!(serde_json::to_value(&event).is_err());
        assert!(serde_json::from_value::<Event>(json!({
            "ProcessingFinished": { "ticket": 1, "output": "Elapsed" }
        }))
        .is_err());
    }

    #[test]
    fn event_size_is_reasonable() {
        let size = std::mem::size_of::<Event>();
        assert!(size <= 128, "Event enum is {size} bytes, box more variants");
    }
}
