use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::dates;
use crate::error::{DonationError, FieldErrors, Result};

/// Categories offered by the log form before any data has been loaded.
pub const DEFAULT_CATEGORIES: [&str; 9] = [
    "Pastries",
    "Dairy",
    "Bread",
    "Produce",
    "Vegetables",
    "Proteins",
    "Grains",
    "Fruits",
    "Other",
];

pub const FALLBACK_CATEGORY: &str = "Other";

/// Lifecycle of a logged item. `Completed` items were donated, `Flagged`
/// items expired or went to waste.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Status {
    Completed,
    Pending,
    Flagged,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Completed => "Completed",
            Status::Pending => "Pending",
            Status::Flagged => "Flagged",
        }
    }

    pub fn is_donated(&self) -> bool {
        matches!(self, Status::Completed)
    }

    pub fn is_waste(&self) -> bool {
        matches!(self, Status::Flagged)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = DonationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "completed" => Ok(Status::Completed),
            "pending" => Ok(Status::Pending),
            "flagged" => Ok(Status::Flagged),
            other => Err(DonationError::field(
                "status",
                format!("Unknown status '{}'", other),
            )),
        }
    }
}

/// One surplus-food entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DonationRecord {
    pub id: String,
    pub name: String,
    pub category: String,
    pub status: Status,
    pub quantity: u32,
    #[serde(default)]
    pub calories: u32,
    /// Expiration date
    pub expires: NaiveDate,
    /// Donation (log) date
    pub date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Submitted form data for a new record. Everything is optional so that
/// missing fields can be reported alongside invalid ones.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NewDonation {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub calories: Option<u32>,
    #[serde(default)]
    pub expires: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewDonation {
    /// Check every field and build the record, or return all field errors.
    pub fn validate(self, today: NaiveDate) -> Result<DonationRecord> {
        let mut errors = FieldErrors::new();

        let name = self.name.trim().to_string();
        if name.is_empty() {
            errors.insert("name", "An item is required".to_string());
        }

        let quantity = match self.quantity {
            None => {
                errors.insert("quantity", "Quantity is required".to_string());
                0
            }
            Some(q) if q <= 0 => {
                errors.insert("quantity", "Quantity must be greater than 0".to_string());
                0
            }
            Some(q) => match u32::try_from(q) {
                Ok(q) => q,
                Err(_) => {
                    errors.insert("quantity", "Quantity is too large".to_string());
                    0
                }
            },
        };

        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => Status::Pending,
            Some(s) => match s.parse::<Status>() {
                Ok(status) => status,
                Err(_) => {
                    errors.insert("status", format!("Unknown status '{}'", s));
                    Status::Pending
                }
            },
        };

        let date = match self.date.as_deref().map(str::trim) {
            None | Some("") => Some(today),
            Some(s) => match dates::parse_iso_date(s) {
                Ok(d) => Some(d),
                Err(_) => {
                    errors.insert("date", "Donation date must be YYYY-MM-DD".to_string());
                    None
                }
            },
        };

        let expires = match self.expires.as_deref().map(str::trim) {
            None | Some("") => {
                errors.insert("expires", "Expiration date must be filled".to_string());
                None
            }
            Some(s) => match dates::parse_iso_date(s) {
                Ok(d) => Some(d),
                Err(_) => {
                    errors.insert("expires", "Expiration date must be YYYY-MM-DD".to_string());
                    None
                }
            },
        };

        if let (Some(expires), Some(date)) = (expires, date) {
            if expires < date {
                errors.insert(
                    "expires",
                    "Expiration date cannot be before the donation date".to_string(),
                );
            }
        }

        if !errors.is_empty() {
            return Err(DonationError::Validation(errors));
        }

        let category = match self.category.trim() {
            "" => FALLBACK_CATEGORY.to_string(),
            c => c.to_string(),
        };

        let id = self
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Ok(DonationRecord {
            id,
            name,
            category,
            status,
            quantity,
            calories: self.calories.unwrap_or(0),
            // both were checked above
            expires: expires.unwrap_or(today),
            date: date.unwrap_or(today),
            notes: self
                .notes
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 21).unwrap()
    }

    fn croissants() -> NewDonation {
        NewDonation {
            name: "Croissant Batch".to_string(),
            category: "Pastries".to_string(),
            quantity: Some(20),
            expires: Some("2025-10-24".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn valid_submission_fills_defaults() {
        let record = croissants().validate(today()).unwrap();
        assert_eq!(record.name, "Croissant Batch");
        assert_eq!(record.status, Status::Pending);
        assert_eq!(record.calories, 0);
        assert_eq!(record.date, today());
        assert!(!record.id.is_empty());
    }

    #[test]
    fn blank_category_becomes_other() {
        let mut input = croissants();
        input.category = "  ".to_string();
        assert_eq!(input.validate(today()).unwrap().category, "Other");
    }

    #[test]
    fn collects_every_field_error() {
        let err = NewDonation {
            quantity: Some(0),
            ..Default::default()
        }
        .validate(today())
        .unwrap_err();

        match err {
            DonationError::Validation(fields) => {
                assert_eq!(fields["name"], "An item is required");
                assert_eq!(fields["quantity"], "Quantity must be greater than 0");
                assert_eq!(fields["expires"], "Expiration date must be filled");
                assert!(!fields.contains_key("date"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_quantity_is_reported() {
        let mut input = croissants();
        input.quantity = None;
        let err = input.validate(today()).unwrap_err();
        assert!(err.to_string().contains("Quantity is required"));
    }

    #[test]
    fn expiry_before_donation_date_is_rejected() {
        let mut input = croissants();
        input.date = Some("2025-10-25".to_string());
        assert!(input.validate(today()).is_err());
    }

    #[test]
    fn status_parsing_is_case_insensitive() {
        let mut input = croissants();
        input.status = Some("flagged".to_string());
        assert_eq!(input.validate(today()).unwrap().status, Status::Flagged);
        assert!("Lost".parse::<Status>().is_err());
    }

    #[test]
    fn record_json_uses_seed_field_names() {
        let json = r#"{"id":"1","name":"Milk","category":"Dairy","status":"Completed",
            "quantity":8,"calories":120,"expires":"2025-10-25","date":"2025-10-21"}"#;
        let record: DonationRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.status, Status::Completed);
        assert_eq!(record.date, today());
    }
}
