use serde::{Deserialize, Serialize};

use super::{ScreenId, ScreenState};
use crate::container::StateError;
use crate::validation::{self, FieldErrors};
use crate::{tags, UnixTimeMs, CHECK_IN_STEPS, MAX_CHECKED_BAGS};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Baggage {
    pub checked_bags: u8,
    pub carry_on: bool,
    pub special_items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInState {
    pub booking_reference: String,
    pub last_name: String,
    pub flight_number: String,
    pub seat: Option<String>,
    pub baggage: Baggage,
    pub documents_confirmed: bool,
    pub hazmat_acknowledged: bool,
    pub updated_at: UnixTimeMs,
}

impl Default for CheckInState {
    fn default() -> Self {
        Self {
            booking_reference: String::new(),
            last_name: String::new(),
            flight_number: String::new(),
            seat: None,
            baggage: Baggage::default(),
            documents_confirmed: false,
            hazmat_acknowledged: false,
            updated_at: UnixTimeMs::now(),
        }
    }
}

/// Row number followed by a seat letter, e.g. `14C`.
fn is_seat(value: &str) -> bool {
    let Some(letter) = value.chars().last() else {
        return false;
    };
    let row = &value[..value.len() - letter.len_utf8()];
    ('A'..='K').contains(&letter)
        && (1..=3).contains(&row.len())
        && row.parse::<u16>().is_ok_and(|r| r > 0)
}

/// Airline designator plus 1-4 digits, e.g. `TP1234`.
fn is_flight_number(value: &str) -> bool {
    let value = value.trim();
    if value.len() < 3 || !value.is_ascii() {
        return false;
    }
    let (carrier, number) = value.split_at(2);
    carrier.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        && carrier.chars().any(|c| c.is_ascii_uppercase())
        && (1..=4).contains(&number.len())
        && number.chars().all(|c| c.is_ascii_digit())
}

impl CheckInState {
    #[must_use]
    pub fn validate_step(&self, step: u8) -> FieldErrors {
        let mut errors = FieldErrors::new();
        match step {
            1 => {
                if validation::length(&mut errors, "bookingReference", &self.booking_reference, 6, 6)
                    && !self.booking_reference.trim().chars().all(|c| c.is_ascii_alphanumeric())
                {
                    errors.add("bookingReference", "Booking references are 6 letters or digits.");
                }
                validation::required(&mut errors, "lastName", &self.last_name);
                if !is_flight_number(&self.flight_number) {
                    errors.add("flightNumber", "Enter a flight number like TP1234.");
                }
            }
            2 => match self.seat.as_deref() {
                None => errors.add("seat", "Choose a seat."),
                Some(seat) if !is_seat(seat) => errors.add("seat", "Choose a valid seat."),
                Some(_) => {}
            },
            3 => {
                validation::range(&mut errors, "baggage.checkedBags", self.baggage.checked_bags, 0, MAX_CHECKED_BAGS);
                if !self.hazmat_acknowledged {
                    errors.add("hazmatAcknowledged", "Confirm you are not carrying restricted items.");
                }
            }
            4 if !self.documents_confirmed => {
                errors.add("documentsConfirmed", "Confirm your travel documents.");
            }
            _ => {}
        }
        errors
    }

    #[must_use]
    pub fn boarding_pass(&self, gate: impl Into<String>) -> BoardingPass {
        BoardingPass {
            passenger: self.last_name.trim().to_uppercase(),
            booking_reference: self.booking_reference.trim().to_uppercase(),
            flight_number: self.flight_number.trim().to_owned(),
            seat: self.seat.clone().unwrap_or_default(),
            gate: gate.into(),
            checked_bags: self.baggage.checked_bags,
            issued_at: UnixTimeMs::now(),
        }
    }
}

/// Stable gate assignment per flight so repeat check-ins agree.
#[must_use]
pub fn assign_gate(flight_number: &str) -> String {
    let sum = flight_number
        .trim()
        .bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(u32::from(b)));
    let pier = char::from(b'A' + u8::try_from(sum % 6).unwrap_or(0));
    format!("{pier}{}", sum % 40 + 1)
}

impl ScreenState for CheckInState {
    const SCREEN: ScreenId = ScreenId::CheckIn;

    fn normalize(&mut self) -> Result<(), StateError> {
        Ok(tags::normalize(&mut self.baggage.special_items, None)?)
    }

    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        for step in 1..=CHECK_IN_STEPS.get() {
            errors.merge(self.validate_step(step));
        }
        errors
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardingPass {
    pub passenger: String,
    pub booking_reference: String,
    pub flight_number: String,
    pub seat: String,
    pub gate: String,
    pub checked_bags: u8,
    pub issued_at: UnixTimeMs,
}
