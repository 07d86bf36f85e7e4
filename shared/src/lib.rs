#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod capabilities;
pub mod container;
pub mod event;
pub mod path;
pub mod pipeline;
pub mod screens;
pub mod tags;
pub mod validation;
pub mod wizard;

mod app;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::num::NonZeroU8;
use std::time::Duration;
use thiserror::Error;

pub use app::{App, Model, ScreenView, ToastView, UserFacingError, ViewModel, WizardView};
pub use capabilities::{Capabilities, Effect};
pub use container::{StateContainer, StateError};
pub use crux_core::{render::Render, App as CruxApp};
pub use event::Event;
pub use path::{FieldPath, PathError};
pub use pipeline::{FilterSpec, PipelineError, SortOrder, SortSpec, Sortable};
pub use screens::itinerary::ItineraryError;
pub use screens::ScreenId;
pub use tags::SelectionError;
pub use validation::FieldErrors;
pub use wizard::{StepWizard, WizardError, WizardId};

const fn steps(n: u8) -> NonZeroU8 {
    match NonZeroU8::new(n) {
        Some(n) => n,
        None => panic!("a wizard needs at least one step"),
    }
}

pub const ONBOARDING_STEPS: NonZeroU8 = steps(4);
pub const BOOKING_STEPS: NonZeroU8 = steps(4);
pub const CHECK_IN_STEPS: NonZeroU8 = steps(4);

pub const BOOKING_PROCESSING_DELAY: Duration = Duration::from_millis(2000);
pub const CHECK_IN_PROCESSING_DELAY: Duration = Duration::from_millis(1500);

pub const MAX_INTERESTS: usize = 8;
pub const MAX_TRAVEL_STYLES: usize = 3;
pub const MAX_CUISINES: usize = 10;
pub const MAX_REVIEW_HIGHLIGHTS: usize = 5;
pub const MAX_GUESTS: u8 = 10;
pub const MAX_CHECKED_BAGS: u8 = 3;
pub const MAX_GROUP_SIZE: u8 = 20;
pub const DOCUMENT_EXPIRY_WARNING_DAYS: i64 = 180;
pub const WAYPOINT_ARRIVAL_RADIUS_M: f64 = 30.0;
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Transient,
    Permanent,
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    InvalidPath,
    InvalidSortKey,
    SelectionLimit,
    NotFound,
    Conflict,
    Cancelled,
    SearchFailed,
    InvalidState,
    Internal,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::InvalidPath => "INVALID_PATH",
            Self::InvalidSortKey => "INVALID_SORT_KEY",
            Self::SelectionLimit => "SELECTION_LIMIT",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::Cancelled => "CANCELLED",
            Self::SearchFailed => "SEARCH_FAILED",
            Self::InvalidState => "INVALID_STATE",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    #[must_use]
    pub const fn default_severity(self) -> ErrorSeverity {
        match self {
            Self::SearchFailed | Self::Conflict => ErrorSeverity::Transient,

            Self::InvalidState | Self::Internal => ErrorSeverity::Fatal,

            Self::Validation
            | Self::InvalidPath
            | Self::InvalidSortKey
            | Self::SelectionLimit
            | Self::NotFound
            | Self::Cancelled => ErrorSeverity::Permanent,
        }
    }

    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::SearchFailed | Self::Conflict)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub severity: ErrorSeverity,
    pub message: String,
    pub internal_message: Option<String>,
    pub context: HashMap<String, String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            internal_message: None,
            context: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable() && !matches!(self.severity, ErrorSeverity::Fatal)
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::Validation | ErrorKind::SelectionLimit => self.message.clone(),
            ErrorKind::InvalidPath | ErrorKind::InvalidSortKey => {
                "That change couldn't be applied. Please try again.".into()
            }
            ErrorKind::NotFound => "The requested item could not be found.".into(),
            ErrorKind::Conflict => {
                "Another request is still in progress. Please wait a moment.".into()
            }
            ErrorKind::Cancelled => "The request was cancelled.".into(),
            ErrorKind::SearchFailed => {
                "We couldn't load results right now. Please try again.".into()
            }
            ErrorKind::InvalidState => {
                "The app is in an invalid state. Please restart the app.".into()
            }
            ErrorKind::Internal => {
                "An unexpected error occurred. Please try again or contact support.".into()
            }
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

impl From<PathError> for AppError {
    fn from(e: PathError) -> Self {
        AppError::new(ErrorKind::InvalidPath, "Field could not be updated").with_internal(e.to_string())
    }
}

impl From<PipelineError> for AppError {
    fn from(e: PipelineError) -> Self {
        AppError::new(ErrorKind::InvalidSortKey, "Unsupported sort option").with_internal(e.to_string())
    }
}

impl From<SelectionError> for AppError {
    fn from(e: SelectionError) -> Self {
        match e {
            SelectionError::LimitReached { max } => AppError::new(
                ErrorKind::SelectionLimit,
                format!("You can pick up to {max} options."),
            ),
        }
    }
}

impl From<StateError> for AppError {
    fn from(e: StateError) -> Self {
        match e {
            StateError::Path(e) => e.into(),
            StateError::Selection(e) => e.into(),
            other => AppError::new(ErrorKind::InvalidPath, "Field could not be updated")
                .with_internal(other.to_string()),
        }
    }
}

impl From<WizardError> for AppError {
    fn from(e: WizardError) -> Self {
        AppError::new(ErrorKind::Validation, "That step isn't available.").with_internal(e.to_string())
    }
}

impl From<ItineraryError> for AppError {
    fn from(e: ItineraryError) -> Self {
        let kind = match e {
            ItineraryError::DayNotFound(_) | ItineraryError::ActivityNotFound(_) => ErrorKind::NotFound,
            ItineraryError::DuplicateDay(_) | ItineraryError::InvalidActivity(_) => ErrorKind::Validation,
        };
        AppError::new(kind, capitalize(&e.to_string())).with_internal(e.to_string())
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}

#[derive(Debug, Clone, Error)]
pub enum CoordinateError {
    #[error("Latitude {0} is out of valid range [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("Longitude {0} is out of valid range [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("Coordinate value is not finite (NaN or Infinity)")]
    NonFinite,
}

impl From<CoordinateError> for AppError {
    fn from(e: CoordinateError) -> Self {
        AppError::new(ErrorKind::Validation, e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidatedCoordinate {
    lat: f64,
    lon: f64,
}

impl ValidatedCoordinate {
    pub fn new(lat: f64, lon: f64) -> Result<Self, CoordinateError> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(CoordinateError::NonFinite);
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(CoordinateError::LatitudeOutOfRange(lat));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(CoordinateError::LongitudeOutOfRange(lon));
        }
        Ok(Self { lat, lon })
    }

    #[must_use]
    pub const fn lat(self) -> f64 {
        self.lat
    }

    #[must_use]
    pub const fn lon(self) -> f64 {
        self.lon
    }

    #[must_use]
    pub fn distance_to(self, other: Self) -> f64 {
        haversine_distance(self, other)
    }
}

impl TryFrom<LatLon> for ValidatedCoordinate {
    type Error = CoordinateError;

    fn try_from(value: LatLon) -> Result<Self, Self::Error> {
        Self::new(value.lat, value.lon)
    }
}

/// Raw coordinate pair as it crosses the shell boundary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn validate(self) -> Result<ValidatedCoordinate, CoordinateError> {
        ValidatedCoordinate::new(self.lat, self.lon)
    }
}

#[must_use]
pub fn haversine_distance(p1: ValidatedCoordinate, p2: ValidatedCoordinate) -> f64 {
    const EPSILON: f64 = 1e-10;

    if (p1.lat - p2.lat).abs() < EPSILON && (p1.lon - p2.lon).abs() < EPSILON {
        return 0.0;
    }

    let lat1_rad = p1.lat.to_radians();
    let lat2_rad = p2.lat.to_radians();
    let delta_lat = (p2.lat - p1.lat).to_radians();
    let delta_lon = (p2.lon - p1.lon).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.clamp(0.0, 1.0).sqrt().asin();

    let result = EARTH_RADIUS_M * c;
    if result.is_finite() {
        result
    } else {
        f64::MAX
    }
}

#[must_use]
pub fn format_distance(meters: f64) -> String {
    if !meters.is_finite() || meters < 0.0 {
        return "Unknown".to_string();
    }

    if meters < 1000.0 {
        format!("{meters:.0} m")
    } else if meters < 10_000.0 {
        format!("{:.1} km", meters / 1000.0)
    } else {
        format!("{:.0} km", meters / 1000.0)
    }
}

#[must_use]
pub fn format_time_ago(timestamp_ms: u64, now_ms: u64) -> String {
    if timestamp_ms > now_ms {
        return "Upcoming".into();
    }

    let diff_secs = now_ms.saturating_sub(timestamp_ms) / 1000;
    if diff_secs < 60 {
        return "Just now".into();
    }

    let diff_mins = diff_secs / 60;
    if diff_mins < 60 {
        return format!("{diff_mins}m ago");
    }

    let diff_hours = diff_mins / 60;
    if diff_hours < 24 {
        return format!("{diff_hours}h ago");
    }

    let diff_days = diff_hours / 24;
    if diff_days < 7 {
        return format!("{diff_days}d ago");
    }
    if diff_days < 30 {
        return format!("{}w ago", diff_days / 7);
    }
    if diff_days < 365 {
        return format!("{}mo ago", diff_days / 30);
    }

    format!("{}y ago", diff_days / 365)
}

#[must_use]
pub fn get_current_time_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Today's calendar date in UTC, used by date validation.
#[must_use]
pub fn today() -> chrono::NaiveDate {
    chrono::Utc::now().date_naive()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnixTimeMs(pub u64);

impl UnixTimeMs {
    #[must_use]
    pub fn now() -> Self {
        Self(get_current_time_ms())
    }

    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn elapsed_since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    #[must_use]
    pub fn add_millis(self, ms: u64) -> Self {
        Self(self.0.saturating_add(ms))
    }
}

impl Default for UnixTimeMs {
    fn default() -> Self {
        Self::now()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToastMessage {
    pub message: String,
    pub kind: ToastKind,
    pub created_at: UnixTimeMs,
    pub duration_ms: u64,
}

impl ToastMessage {
    #[must_use]
    pub fn new(message: impl Into<String>, kind: ToastKind) -> Self {
        Self {
            message: message.into(),
            kind,
            created_at: UnixTimeMs::now(),
            duration_ms: kind.default_duration_ms(),
        }
    }

    #[must_use]
    pub fn expires_at(&self) -> UnixTimeMs {
        self.created_at.add_millis(self.duration_ms)
    }

    #[must_use]
    pub fn is_expired(&self, now: UnixTimeMs) -> bool {
        now.elapsed_since(self.created_at) > self.duration_ms
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToastKind {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl ToastKind {
    #[must_use]
    pub const fn default_duration_ms(self) -> u64 {
        match self {
            Self::Info => 3000,
            Self::Success => 2000,
            Self::Warning => 4000,
            Self::Error => 5000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod coordinate_tests {
        use super::*;

        #[test]
        fn test_valid_coordinates() {
            assert!(ValidatedCoordinate::new(0.0, 0.0).is_ok());
            assert!(ValidatedCoordinate::new(90.0, 180.0).is_ok());
            assert!(ValidatedCoordinate::new(-90.0, -180.0).is_ok());
        }

        #[test]
        fn test_invalid_coordinates() {
            assert!(matches!(
                ValidatedCoordinate::new(91.0, 0.0),
                Err(CoordinateError::LatitudeOutOfRange(_))
            ));
            assert!(matches!(
                ValidatedCoordinate::new(0.0, -181.0),
                Err(CoordinateError::LongitudeOutOfRange(_))
            ));
            assert!(matches!(
                ValidatedCoordinate::new(f64::NAN, 0.0),
                Err(CoordinateError::NonFinite)
            ));
        }
    }

    mod distance_tests {
        use super::*;

        #[test]
        fn test_same_point_distance() {
            let p = ValidatedCoordinate::new(41.3874, 2.1686).unwrap();
            assert_eq!(haversine_distance(p, p), 0.0);
        }

        #[test]
        fn test_london_paris_distance() {
            let london = ValidatedCoordinate::new(51.5074, -0.1278).unwrap();
            let paris = ValidatedCoordinate::new(48.8566, 2.3522).unwrap();
            let distance = london.distance_to(paris);
            assert!((distance - 343_500.0).abs() < 10_000.0);
        }
    }

    mod format_tests {
        use super::*;

        #[test]
        fn test_format_distance() {
            assert_eq!(format_distance(0.0), "0 m");
            assert_eq!(format_distance(999.0), "999 m");
            assert_eq!(format_distance(1500.0), "1.5 km");
            assert_eq!(format_distance(15_000.0), "15 km");
            assert_eq!(format_distance(-1.0), "Unknown");
            assert_eq!(format_distance(f64::NAN), "Unknown");
        }

        #[test]
        fn test_format_time_ago() {
            let now = 10_000_000_000;
            assert_eq!(format_time_ago(now, now), "Just now");
            assert_eq!(format_time_ago(now - 5 * 60 * 1000, now), "5m ago");
            assert_eq!(format_time_ago(now - 3 * 3_600_000, now), "3h ago");
            assert_eq!(format_time_ago(now - 2 * 86_400_000, now), "2d ago");
            assert_eq!(format_time_ago(now - 14 * 86_400_000, now), "2w ago");
            assert_eq!(format_time_ago(now + 10_000, now), "Upcoming");
        }
    }

    mod error_tests {
        use super::*;

        #[test]
        fn test_path_error_maps_to_invalid_path() {
            let err: AppError = PathError::Empty.into();
            assert_eq!(err.kind, ErrorKind::InvalidPath);
            assert_eq!(err.code(), "INVALID_PATH");
            assert!(err.internal_message.as_deref().unwrap().contains("empty"));
        }

        #[test]
        fn test_selection_error_message() {
            let err: AppError = SelectionError::LimitReached { max: 3 }.into();
            assert_eq!(err.user_facing_message(), "You can pick up to 3 options.");
            assert!(!err.is_retryable());
        }

        #[test]
        fn test_display_includes_internal() {
            let err = AppError::new(ErrorKind::Internal, "boom").with_internal("detail");
            assert_eq!(err.to_string(), "[INTERNAL_ERROR] boom (internal: detail)");
        }

        #[test]
        fn test_itinerary_errors() {
            let day = chrono::NaiveDate::from_ymd_opt(2026, 11, 2).unwrap();
            let err: AppError = ItineraryError::DuplicateDay(day).into();
            assert_eq!(err.kind, ErrorKind::Validation);
            assert_eq!(err.user_facing_message(), "A day on 2026-11-02 already exists");

            let err: AppError = ItineraryError::ActivityNotFound("x".into()).into();
            assert_eq!(err.kind, ErrorKind::NotFound);
        }

        #[test]
        fn test_wizard_error_is_recoverable() {
            let err: AppError = WizardError::OutOfRange { step: 9, total: 4 }.into();
            assert_eq!(err.severity, ErrorSeverity::Permanent);
            assert_eq!(err.user_facing_message(), "That step isn't available.");
        }

        #[test]
        fn test_search_failure_is_retryable() {
            let err = AppError::new(ErrorKind::SearchFailed, "offline");
            assert_eq!(err.severity, ErrorSeverity::Transient);
            assert!(err.is_retryable());
            assert!(!AppError::new(ErrorKind::Internal, "boom").is_retryable());
        }
    }

    mod toast_tests {
        use super::*;

        #[test]
        fn test_toast_is_expired() {
            let toast = ToastMessage::new("Saved", ToastKind::Success);
            let created = toast.created_at;

            assert_eq!(toast.expires_at(), created.add_millis(2000));
            assert!(!toast.is_expired(created.add_millis(1999)));
            assert!(toast.is_expired(created.add_millis(2001)));
        }
    }

    mod time_tests {
        use super::*;

        #[test]
        fn test_unix_time_arithmetic() {
            let t = UnixTimeMs(1000);
            assert_eq!(t.add_millis(500).as_millis(), 1500);
            assert_eq!(t.add_millis(500).elapsed_since(t), 500);
            assert_eq!(t.elapsed_since(t.add_millis(1)), 0);
        }
    }
}
