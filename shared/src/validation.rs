//! Client-side form checks shared by the feature screens.
//!
//! Each check records at most one message per field; the first failure for a
//! field wins so users see the most basic problem first.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn remove(&mut self, field: &str) -> Option<String> {
        self.0.remove(field)
    }

    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn merge(&mut self, other: Self) {
        for (field, message) in other.0 {
            self.add(field, message);
        }
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

pub fn required(errors: &mut FieldErrors, field: &str, value: &str) -> bool {
    if value.trim().is_empty() {
        errors.add(field, "This field is required.");
        return false;
    }
    true
}

pub fn length(errors: &mut FieldErrors, field: &str, value: &str, min: usize, max: usize) -> bool {
    let len = value.trim().chars().count();
    if len < min {
        errors.add(field, format!("Must be at least {min} characters."));
        return false;
    }
    if len > max {
        errors.add(field, format!("Must be at most {max} characters."));
        return false;
    }
    true
}

pub fn range<T>(errors: &mut FieldErrors, field: &str, value: T, min: T, max: T) -> bool
where
    T: PartialOrd + Display,
{
    if value < min || value > max {
        errors.add(field, format!("Must be between {min} and {max}."));
        return false;
    }
    true
}

pub fn email(errors: &mut FieldErrors, field: &str, value: &str) -> bool {
    if !required(errors, field, value) {
        return false;
    }

    let value = value.trim();
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && domain.split('.').all(|part| !part.is_empty())
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if !valid {
        errors.add(field, "Enter a valid email address.");
    }
    valid
}

/// Optional phone number: digits with `+`, spaces, dashes, dots or
/// parentheses, 7 to 15 digits in total.
pub fn phone(errors: &mut FieldErrors, field: &str, value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() {
        return true;
    }

    let digits = value.chars().filter(char::is_ascii_digit).count();
    let allowed = value
        .chars()
        .enumerate()
        .all(|(i, c)| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')' | '.') || (c == '+' && i == 0));

    if !allowed || !(7..=15).contains(&digits) {
        errors.add(field, "Enter a valid phone number.");
        return false;
    }
    true
}

/// `end` must fall strictly after `start`; missing dates are reported as
/// required.
pub fn date_order(
    errors: &mut FieldErrors,
    start_field: &str,
    start: Option<NaiveDate>,
    end_field: &str,
    end: Option<NaiveDate>,
) -> bool {
    match (start, end) {
        (Some(start), Some(end)) if end <= start => {
            errors.add(end_field, "Must be after the start date.");
            false
        }
        (Some(_), Some(_)) => true,
        (start, end) => {
            if start.is_none() {
                errors.add(start_field, "This field is required.");
            }
            if end.is_none() {
                errors.add(end_field, "This field is required.");
            }
            false
        }
    }
}

pub fn not_before(errors: &mut FieldErrors, field: &str, date: Option<NaiveDate>, earliest: NaiveDate) -> bool {
    match date {
        Some(date) if date < earliest => {
            errors.add(field, "Date can't be in the past.");
            false
        }
        _ => true,
    }
}

pub fn not_after(errors: &mut FieldErrors, field: &str, date: Option<NaiveDate>, latest: NaiveDate) -> bool {
    match date {
        Some(date) if date > latest => {
            errors.add(field, "Date can't be in the future.");
            false
        }
        _ => true,
    }
}

/// 6 to 9 letters or digits, ignoring case and surrounding spaces.
pub fn passport_number(errors: &mut FieldErrors, field: &str, value: &str) -> bool {
    if !required(errors, field, value) {
        return false;
    }

    let value = value.trim();
    let valid = (6..=9).contains(&value.len()) && value.chars().all(|c| c.is_ascii_alphanumeric());
    if !valid {
        errors.add(field, "Passport numbers are 6-9 letters or digits.");
    }
    valid
}

/// Three-letter uppercase code (IATA airport, ISO 4217 currency).
pub fn three_letter_code(errors: &mut FieldErrors, field: &str, value: &str) -> bool {
    let valid = value.len() == 3 && value.chars().all(|c| c.is_ascii_uppercase());
    if !valid {
        errors.add(field, "Use a three-letter code.");
    }
    valid
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_first_message_wins() {
        let mut errors = FieldErrors::new();
        errors.add("email", "first");
        errors.add("email", "second");
        assert_eq!(errors.get("email"), Some("first"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_required_trims() {
        let mut errors = FieldErrors::new();
        assert!(!required(&mut errors, "name", "   "));
        assert!(required(&mut errors, "city", "Lisbon"));
        assert!(errors.contains("name"));
        assert!(!errors.contains("city"));
    }

    #[test]
    fn test_email() {
        let mut errors = FieldErrors::new();
        assert!(email(&mut errors, "a", "ana@example.com"));
        assert!(!email(&mut errors, "b", "ana@example"));
        assert!(!email(&mut errors, "c", "ana@@example.com"));
        assert!(!email(&mut errors, "d", "@example.com"));
        assert!(!email(&mut errors, "e", "ana @example.com"));
        assert_eq!(errors.get("e"), Some("Enter a valid email address."));
    }

    #[test]
    fn test_phone() {
        let mut errors = FieldErrors::new();
        assert!(phone(&mut errors, "a", ""));
        assert!(phone(&mut errors, "b", "+351 912-345-678"));
        assert!(!phone(&mut errors, "c", "12345"));
        assert!(!phone(&mut errors, "d", "91+2345678"));
        assert!(!phone(&mut errors, "e", "call me 912345678"));
    }

    #[test]
    fn test_date_order() {
        let mut errors = FieldErrors::new();
        assert!(date_order(&mut errors, "in", Some(date(2026, 5, 1)), "out", Some(date(2026, 5, 3))));
        assert!(!date_order(&mut errors, "in", Some(date(2026, 5, 3)), "out", Some(date(2026, 5, 3))));
        assert_eq!(errors.get("out"), Some("Must be after the start date."));

        let mut missing = FieldErrors::new();
        assert!(!date_order(&mut missing, "in", None, "out", None));
        assert_eq!(missing.len(), 2);
    }

    #[test]
    fn test_passport_number() {
        let mut errors = FieldErrors::new();
        assert!(passport_number(&mut errors, "a", "X1234567"));
        assert!(!passport_number(&mut errors, "b", "12-345"));
        assert!(!passport_number(&mut errors, "c", "ABC12"));
    }

    #[test]
    fn test_range_and_length() {
        let mut errors = FieldErrors::new();
        assert!(range(&mut errors, "guests", 2u8, 1, 10));
        assert!(!range(&mut errors, "rating", 6u8, 1, 5));
        assert_eq!(errors.get("rating"), Some("Must be between 1 and 5."));
        assert!(!length(&mut errors, "title", "ab", 3, 80));
    }

    #[test]
    fn test_merge_keeps_existing() {
        let mut a = FieldErrors::new();
        a.add("x", "from a");
        let mut b = FieldErrors::new();
        b.add("x", "from b");
        b.add("y", "from b");
        a.merge(b);
        assert_eq!(a.get("x"), Some("from a"));
        assert_eq!(a.get("y"), Some("from b"));
        assert!(a.into_result().is_err());
    }
}
