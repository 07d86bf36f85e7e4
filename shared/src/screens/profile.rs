use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{ScreenId, ScreenState};
use crate::container::StateError;
use crate::validation::{self, FieldErrors};
use crate::{tags, UnixTimeMs};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub date_of_birth: Option<NaiveDate>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelDetails {
    pub home_airport: String,
    pub passport_country: String,
    pub frequent_flyer_number: Option<String>,
    pub languages: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContact {
    pub name: String,
    pub relationship: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSetup {
    pub personal: PersonalInfo,
    pub travel: TravelDetails,
    pub emergency_contact: EmergencyContact,
    pub updated_at: UnixTimeMs,
}

impl Default for ProfileSetup {
    fn default() -> Self {
        Self {
            personal: PersonalInfo::default(),
            travel: TravelDetails::default(),
            emergency_contact: EmergencyContact::default(),
            updated_at: UnixTimeMs::now(),
        }
    }
}

impl ProfileSetup {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.personal.first_name.trim(), self.personal.last_name.trim())
            .trim()
            .to_owned()
    }

    #[must_use]
    pub fn validate_on(&self, today: NaiveDate) -> FieldErrors {
        let mut errors = FieldErrors::new();
        let personal = &self.personal;

        validation::required(&mut errors, "personal.firstName", &personal.first_name);
        validation::required(&mut errors, "personal.lastName", &personal.last_name);
        validation::email(&mut errors, "personal.email", &personal.email);
        validation::phone(&mut errors, "personal.phone", &personal.phone);
        validation::not_after(&mut errors, "personal.dateOfBirth", personal.date_of_birth, today);

        if !self.travel.home_airport.is_empty() {
            validation::three_letter_code(&mut errors, "travel.homeAirport", &self.travel.home_airport);
        }

        // An emergency contact is optional, but a partial one is not.
        let contact = &self.emergency_contact;
        if !contact.name.trim().is_empty() || !contact.phone.trim().is_empty() {
            validation::required(&mut errors, "emergencyContact.name", &contact.name);
            validation::required(&mut errors, "emergencyContact.phone", &contact.phone);
            validation::phone(&mut errors, "emergencyContact.phone", &contact.phone);
        }

        errors
    }
}

impl ScreenState for ProfileSetup {
    const SCREEN: ScreenId = ScreenId::Profile;

    fn normalize(&mut self) -> Result<(), StateError> {
        Ok(tags::normalize(&mut self.travel.languages, None)?)
    }

    fn validate(&self) -> FieldErrors {
        self.validate_on(crate::today())
    }
}
