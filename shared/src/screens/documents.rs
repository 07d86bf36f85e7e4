use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ScreenId, ScreenState};
use crate::validation::{self, FieldErrors};
use crate::{UnixTimeMs, DOCUMENT_EXPIRY_WARNING_DAYS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    #[default]
    Passport,
    Visa,
    NationalId,
    DrivingLicence,
    Insurance,
    Vaccination,
}

impl DocumentKind {
    #[must_use]
    pub const fn requires_expiry(self) -> bool {
        matches!(self, Self::Passport | Self::Visa | Self::NationalId | Self::DrivingLicence)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExpiryStatus {
    Valid,
    ExpiringSoon { days_left: i64 },
    Expired,
    NoExpiry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelDocument {
    pub id: String,
    pub kind: DocumentKind,
    pub holder_name: String,
    pub number: String,
    pub issuing_country: String,
    pub issued_on: Option<NaiveDate>,
    pub expires_on: Option<NaiveDate>,
}

impl TravelDocument {
    #[must_use]
    pub fn expiry_status(&self, today: NaiveDate) -> ExpiryStatus {
        let Some(expires) = self.expires_on else {
            return ExpiryStatus::NoExpiry;
        };
        let days_left = (expires - today).num_days();
        if days_left < 0 {
            ExpiryStatus::Expired
        } else if days_left <= DOCUMENT_EXPIRY_WARNING_DAYS {
            ExpiryStatus::ExpiringSoon { days_left }
        } else {
            ExpiryStatus::Valid
        }
    }

    /// Number with all but the last four characters hidden.
    #[must_use]
    pub fn masked_number(&self) -> String {
        let chars: Vec<char> = self.number.chars().collect();
        let visible = chars.len().min(4);
        let hidden = chars.len() - visible;
        "•".repeat(hidden) + &chars[hidden..].iter().collect::<String>()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelDocumentDraft {
    pub kind: DocumentKind,
    pub holder_name: String,
    pub number: String,
    pub issuing_country: String,
    pub issued_on: Option<NaiveDate>,
    pub expires_on: Option<NaiveDate>,
}

impl TravelDocumentDraft {
    #[must_use]
    pub fn validate_on(&self, today: NaiveDate) -> FieldErrors {
        let mut errors = FieldErrors::new();
        validation::required(&mut errors, "draft.holderName", &self.holder_name);
        if self.kind == DocumentKind::Passport {
            validation::passport_number(&mut errors, "draft.number", &self.number);
        } else {
            validation::required(&mut errors, "draft.number", &self.number);
        }
        validation::three_letter_code(&mut errors, "draft.issuingCountry", &self.issuing_country);
        validation::not_after(&mut errors, "draft.issuedOn", self.issued_on, today);

        if self.kind.requires_expiry() && self.expires_on.is_none() {
            errors.add("draft.expiresOn", "This field is required.");
        }
        if let (Some(issued), Some(expires)) = (self.issued_on, self.expires_on) {
            validation::date_order(&mut errors, "draft.issuedOn", Some(issued), "draft.expiresOn", Some(expires));
        }
        errors
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentWallet {
    pub documents: Vec<TravelDocument>,
    pub draft: TravelDocumentDraft,
    pub updated_at: UnixTimeMs,
}

impl Default for DocumentWallet {
    fn default() -> Self {
        Self {
            documents: Vec::new(),
            draft: TravelDocumentDraft::default(),
            updated_at: UnixTimeMs::now(),
        }
    }
}

impl DocumentWallet {
    /// Validates the draft and, when it passes, files it as a document and
    /// clears the form. Returns the new document's id.
    pub fn save_draft_on(&mut self, today: NaiveDate) -> Result<String, FieldErrors> {
        self.draft.validate_on(today).into_result()?;

        let draft = std::mem::take(&mut self.draft);
        let id = Uuid::new_v4().to_string();
        self.documents.push(TravelDocument {
            id: id.clone(),
            kind: draft.kind,
            holder_name: draft.holder_name.trim().to_owned(),
            number: draft.number.trim().to_uppercase(),
            issuing_country: draft.issuing_country,
            issued_on: draft.issued_on,
            expires_on: draft.expires_on,
        });
        Ok(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<TravelDocument> {
        let index = self.documents.iter().position(|d| d.id == id)?;
        Some(self.documents.remove(index))
    }

    /// Documents that are expired or inside the warning window.
    pub fn needing_attention(&self, today: NaiveDate) -> impl Iterator<Item = &TravelDocument> {
        self.documents.iter().filter(move |d| {
            matches!(
                d.expiry_status(today),
                ExpiryStatus::Expired | ExpiryStatus::ExpiringSoon { .. }
            )
        })
    }
}

impl ScreenState for DocumentWallet {
    const SCREEN: ScreenId = ScreenId::Documents;

    /// Only the draft form is user-editable; stored documents were validated
    /// when saved.
    fn validate(&self) -> FieldErrors {
        self.draft.validate_on(crate::today())
    }
}
