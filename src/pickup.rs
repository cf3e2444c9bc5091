use chrono::NaiveDate;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::dates;
use crate::error::{DonationError, FieldErrors, Result};
use crate::store::DonationStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PickupWindow {
    Morning,
    Afternoon,
    Evening,
}

impl PickupWindow {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "morning" => Some(PickupWindow::Morning),
            "afternoon" => Some(PickupWindow::Afternoon),
            "evening" => Some(PickupWindow::Evening),
            _ => None,
        }
    }
}

/// Submitted pickup form.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PickupRequest {
    #[serde(default)]
    pub charity: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub window: Option<String>,
    #[serde(default)]
    pub record_ids: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pickup {
    pub id: String,
    pub charity: String,
    pub date: NaiveDate,
    pub window: PickupWindow,
    pub record_ids: Vec<String>,
    pub notes: Option<String>,
}

/// Charity pickups booked against logged records.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PickupSchedule {
    pickups: Vec<Pickup>,
}

impl PickupSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> &[Pickup] {
        &self.pickups
    }

    pub fn len(&self) -> usize {
        self.pickups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pickups.is_empty()
    }

    /// Validate and book a pickup. A record can be in at most one pickup.
    pub fn schedule(
        &mut self,
        request: PickupRequest,
        store: &DonationStore,
        today: NaiveDate,
    ) -> Result<&Pickup> {
        let mut errors = FieldErrors::new();

        let charity = request.charity.trim().to_string();
        if charity.is_empty() {
            errors.insert("charity", "A charity is required".to_string());
        }

        let date = match request.date.as_deref().map(str::trim) {
            None | Some("") => {
                errors.insert("date", "A pickup date is required".to_string());
                None
            }
            Some(s) => match dates::parse_iso_date(s) {
                Ok(d) if d < today => {
                    errors.insert("date", "Pickup date cannot be in the past".to_string());
                    None
                }
                Ok(d) => Some(d),
                Err(_) => {
                    errors.insert("date", "Pickup date must be YYYY-MM-DD".to_string());
                    None
                }
            },
        };

        let window = match request.window.as_deref().map(str::trim) {
            None | Some("") => PickupWindow::Afternoon,
            Some(s) => PickupWindow::parse(s).unwrap_or_else(|| {
                errors.insert("window", format!("Unknown pickup window '{}'", s));
                PickupWindow::Afternoon
            }),
        };

        let mut record_ids: Vec<String> = Vec::new();
        for id in request.record_ids.iter().map(|id| id.trim()) {
            if !id.is_empty() && !record_ids.iter().any(|r| r == id) {
                record_ids.push(id.to_string());
            }
        }
        if record_ids.is_empty() {
            errors.insert("record_ids", "Select at least one item".to_string());
        } else if let Some(missing) = record_ids.iter().find(|id| !store.contains(id)) {
            errors.insert("record_ids", format!("Unknown record '{}'", missing));
        }

        let (Some(date), true) = (date, errors.is_empty()) else {
            return Err(DonationError::Validation(errors));
        };

        let booked: BTreeSet<&str> = self
            .pickups
            .iter()
            .flat_map(|p| p.record_ids.iter().map(String::as_str))
            .collect();
        if let Some(taken) = record_ids.iter().find(|id| booked.contains(id.as_str())) {
            return Err(DonationError::Conflict(format!(
                "record '{}' is already booked for a pickup",
                taken
            )));
        }

        let pickup = Pickup {
            id: Uuid::new_v4().to_string(),
            charity,
            date,
            window,
            record_ids,
            notes: request.notes.filter(|n| !n.trim().is_empty()),
        };
        info!(
            "scheduled pickup {} with {} on {} ({} items)",
            pickup.id,
            pickup.charity,
            pickup.date,
            pickup.record_ids.len()
        );
        self.pickups.push(pickup);
        Ok(&self.pickups[self.pickups.len() - 1])
    }

    pub fn cancel(&mut self, id: &str) -> Result<Pickup> {
        let index = self
            .pickups
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| DonationError::NotFound(format!("pickup '{}'", id)))?;
        info!("cancelled pickup {}", id);
        Ok(self.pickups.remove(index))
    }

    /// Pickups on or after `today`, soonest first.
    pub fn upcoming(&self, today: NaiveDate) -> Vec<&Pickup> {
        let mut out: Vec<&Pickup> = self.pickups.iter().filter(|p| p.date >= today).collect();
        out.sort_by_key(|p| (p.date, p.window));
        out
    }

    pub fn scheduled_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<&Pickup> {
        self.pickups
            .iter()
            .filter(|p| dates::is_in_range(p.date, start, end))
            .collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.pickups.iter().map(|p| p.date).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_iso_date;
    use crate::record::{DonationRecord, Status};

    fn d(s: &str) -> NaiveDate {
        parse_iso_date(s).unwrap()
    }

    fn store() -> DonationStore {
        let rec = |id: &str| DonationRecord {
            id: id.to_string(),
            name: "Bagels".to_string(),
            category: "Bread".to_string(),
            status: Status::Pending,
            quantity: 6,
            calories: 0,
            expires: d("2025-10-30"),
            date: d("2025-10-21"),
            notes: None,
        };
        DonationStore::from_records(vec![rec("a"), rec("b"), rec("c")]).unwrap()
    }

    fn request(date: &str, ids: &[&str]) -> PickupRequest {
        PickupRequest {
            charity: "City Food Bank".to_string(),
            date: Some(date.to_string()),
            window: Some("morning".to_string()),
            record_ids: ids.iter().map(|s| s.to_string()).collect(),
            notes: None,
        }
    }

    #[test]
    fn schedules_and_lists_upcoming() {
        let store = store();
        let mut schedule = PickupSchedule::new();
        schedule.schedule(request("2025-10-25", &["a", "a", "b"]), &store, d("2025-10-22")).unwrap();
        schedule.schedule(request("2025-10-23", &["c"]), &store, d("2025-10-22")).unwrap();

        assert_eq!(schedule.list()[0].record_ids, vec!["a", "b"]);
        assert_eq!(schedule.list()[0].window, PickupWindow::Morning);
        let upcoming = schedule.upcoming(d("2025-10-24"));
        assert_eq!(upcoming.len(), 1);
        assert_eq!(schedule.upcoming(d("2025-10-22"))[0].date, d("2025-10-23"));
        assert_eq!(schedule.scheduled_between(d("2025-10-20"), d("2025-10-26")).len(), 2);
    }

    #[test]
    fn rejects_past_dates_and_unknown_records() {
        let store = store();
        let mut schedule = PickupSchedule::new();
        let err = schedule
            .schedule(request("2025-10-01", &["zzz"]), &store, d("2025-10-22"))
            .unwrap_err();
        match err {
            DonationError::Validation(fields) => {
                assert!(fields.contains_key("date"));
                assert_eq!(fields["record_ids"], "Unknown record 'zzz'");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(schedule.is_empty());
    }

    #[test]
    fn record_cannot_be_booked_twice() {
        let store = store();
        let mut schedule = PickupSchedule::new();
        schedule.schedule(request("2025-10-25", &["a"]), &store, d("2025-10-22")).unwrap();
        let err = schedule
            .schedule(request("2025-10-26", &["b", "a"]), &store, d("2025-10-22"))
            .unwrap_err();
        assert!(matches!(err, DonationError::Conflict(_)));
    }

    #[test]
    fn cancel_frees_records() {
        let store = store();
        let mut schedule = PickupSchedule::new();
        let id = schedule
            .schedule(request("2025-10-25", &["a"]), &store, d("2025-10-22"))
            .unwrap()
            .id
            .clone();
        schedule.cancel(&id).unwrap();
        assert!(matches!(schedule.cancel(&id), Err(DonationError::NotFound(_))));
        assert!(schedule.schedule(request("2025-10-25", &["a"]), &store, d("2025-10-22")).is_ok());
    }
}
