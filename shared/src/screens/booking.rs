use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ScreenId, ScreenState};
use crate::container::StateError;
use crate::validation::{self, FieldErrors};
use crate::{tags, UnixTimeMs, BOOKING_STEPS, MAX_GUESTS};

pub const ADD_ON_OPTIONS: &[&str] = &["breakfast", "airport_transfer", "late_checkout", "parking", "spa"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    #[default]
    Standard,
    Deluxe,
    Suite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Card,
    PayAtProperty,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Traveler {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StayDetails {
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub guests: u8,
    pub room_type: RoomType,
}

impl Default for StayDetails {
    fn default() -> Self {
        Self {
            check_in: None,
            check_out: None,
            guests: 1,
            room_type: RoomType::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    pub method: PaymentMethod,
    pub cardholder_name: String,
    pub card_last4: String,
    pub billing_country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDraft {
    pub listing_id: String,
    pub listing_name: String,
    pub traveler: Traveler,
    pub stay: StayDetails,
    pub payment: PaymentDetails,
    pub special_requests: String,
    pub add_ons: Vec<String>,
    pub nightly_rate: f64,
    pub updated_at: UnixTimeMs,
}

impl Default for BookingDraft {
    fn default() -> Self {
        Self {
            listing_id: String::new(),
            listing_name: String::new(),
            traveler: Traveler::default(),
            stay: StayDetails::default(),
            payment: PaymentDetails::default(),
            special_requests: String::new(),
            add_ons: Vec::new(),
            nightly_rate: 0.0,
            updated_at: UnixTimeMs::now(),
        }
    }
}

impl BookingDraft {
    /// Nights between check-in and check-out, zero until both are set and
    /// correctly ordered.
    #[must_use]
    pub fn nights(&self) -> u32 {
        match (self.stay.check_in, self.stay.check_out) {
            (Some(start), Some(end)) if end > start => {
                u32::try_from((end - start).num_days()).unwrap_or(0)
            }
            _ => 0,
        }
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        f64::from(self.nights()) * self.nightly_rate
    }

    #[must_use]
    pub fn validate_step_on(&self, step: u8, today: NaiveDate) -> FieldErrors {
        let mut errors = FieldErrors::new();
        match step {
            1 => {
                let stay = &self.stay;
                validation::not_before(&mut errors, "stay.checkIn", stay.check_in, today);
                validation::date_order(&mut errors, "stay.checkIn", stay.check_in, "stay.checkOut", stay.check_out);
                validation::range(&mut errors, "stay.guests", stay.guests, 1, MAX_GUESTS);
            }
            2 => {
                let traveler = &self.traveler;
                validation::required(&mut errors, "traveler.firstName", &traveler.first_name);
                validation::required(&mut errors, "traveler.lastName", &traveler.last_name);
                validation::email(&mut errors, "traveler.email", &traveler.email);
                validation::phone(&mut errors, "traveler.phone", &traveler.phone);
            }
            3 => {
                validation::length(&mut errors, "specialRequests", &self.special_requests, 0, 500);
            }
            4 if self.payment.method == PaymentMethod::Card => {
                let payment = &self.payment;
                validation::required(&mut errors, "payment.cardholderName", &payment.cardholder_name);
                let last4_ok = payment.card_last4.len() == 4 && payment.card_last4.chars().all(|c| c.is_ascii_digit());
                if !last4_ok {
                    errors.add("payment.cardLast4", "Enter the last four digits of the card.");
                }
                validation::required(&mut errors, "payment.billingCountry", &payment.billing_country);
            }
            _ => {}
        }
        errors
    }

    #[must_use]
    pub fn validate_step(&self, step: u8) -> FieldErrors {
        self.validate_step_on(step, crate::today())
    }
}

impl ScreenState for BookingDraft {
    const SCREEN: ScreenId = ScreenId::Booking;

    fn normalize(&mut self) -> Result<(), StateError> {
        Ok(tags::normalize(&mut self.add_ons, None)?)
    }

    fn validate(&self) -> FieldErrors {
        let today = crate::today();
        let mut errors = FieldErrors::new();
        for step in 1..=BOOKING_STEPS.get() {
            errors.merge(self.validate_step_on(step, today));
        }
        errors
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BookingStatus {
    #[default]
    Draft,
    Processing,
    Confirmed {
        confirmation_code: String,
    },
}

impl BookingStatus {
    #[must_use]
    pub const fn is_processing(&self) -> bool {
        matches!(self, Self::Processing)
    }
}

/// Eight uppercase hex characters derived from a random v4 UUID.
#[must_use]
pub fn generate_confirmation_code() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        date(2026, 10, 17)
    }

    fn ready() -> BookingDraft {
        let mut draft = BookingDraft::default();
        draft.stay.check_in = Some(date(2026, 11, 1));
        draft.stay.check_out = Some(date(2026, 11, 4));
        draft.stay.guests = 2;
        draft.nightly_rate = 120.0;
        draft.traveler.first_name = "Ana".into();
        draft.traveler.last_name = "Silva".into();
        draft.traveler.email = "ana@example.com".into();
        draft.payment.cardholder_name = "Ana Silva".into();
        draft.payment.card_last4 = "4242".into();
        draft.payment.billing_country = "PT".into();
        draft
    }

    #[test]
    fn test_nights_and_total() {
        let draft = ready();
        assert_eq!(draft.nights(), 3);
        assert!((draft.total() - 360.0).abs() < f64::EPSILON);

        let mut reversed = ready();
        reversed.stay.check_out = Some(date(2026, 10, 30));
        assert_eq!(reversed.nights(), 0);
    }

    #[test]
    fn test_ready_draft_passes_every_step() {
        let draft = ready();
        for step in 1..=BOOKING_STEPS.get() {
            assert!(draft.validate_step_on(step, today()).is_empty(), "step {step}");
        }
    }

    #[test]
    fn test_dates_step() {
        let mut draft = ready();
        draft.stay.check_in = Some(date(2026, 10, 1));
        assert!(draft.validate_step_on(1, today()).contains("stay.checkIn"));

        draft.stay.check_in = Some(date(2026, 11, 4));
        assert!(draft.validate_step_on(1, today()).contains("stay.checkOut"));
    }

    #[test]
    fn test_card_payment_requires_last4() {
        let mut draft = ready();
        draft.payment.card_last4 = "42a2".into();
        assert!(draft.validate_step_on(4, today()).contains("payment.cardLast4"));

        draft.payment.method = PaymentMethod::PayAtProperty;
        assert!(draft.validate_step_on(4, today()).is_empty());
    }

    #[test]
    fn test_confirmation_code_shape() {
        let code = generate_confirmation_code();
        assert_eq!(code.len(), 8);
        assert!(code.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        assert_ne!(code, generate_confirmation_code());
    }

    #[test]
    fn test_status_serializes_with_tag() {
        let status = BookingStatus::Confirmed {
            confirmation_code: "AB12CD34".into(),
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["status"], "confirmed");
        assert_eq!(json["confirmation_code"], "AB12CD34");
    }
}
