use chrono::NaiveDate;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::dates;
use crate::error::{DonationError, Result};
use crate::record::{DonationRecord, NewDonation};

/// Category filter value that matches every record.
pub const ALL_CATEGORIES: &str = "All";

/// In-memory collection of donation records, kept in insertion order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(try_from = "StoredRecords")]
pub struct DonationStore {
    records: Vec<DonationRecord>,
}

// Deserialized shape of a store; goes through `from_records` so decoded
// snapshots get the same duplicate id check as loaded files.
#[derive(Deserialize)]
struct StoredRecords {
    records: Vec<DonationRecord>,
}

impl TryFrom<StoredRecords> for DonationStore {
    type Error = DonationError;

    fn try_from(stored: StoredRecords) -> Result<Self> {
        DonationStore::from_records(stored.records)
    }
}

impl DonationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from already-parsed records. Duplicate ids are rejected.
    pub fn from_records(records: Vec<DonationRecord>) -> Result<Self> {
        let mut seen = BTreeSet::new();
        for record in &records {
            if !seen.insert(record.id.as_str()) {
                return Err(DonationError::Conflict(format!(
                    "duplicate record id '{}'",
                    record.id
                )));
            }
        }
        Ok(DonationStore { records })
    }

    pub fn records(&self) -> &[DonationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&DonationRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Validate and append a new record.
    pub fn add(&mut self, input: NewDonation, today: NaiveDate) -> Result<&DonationRecord> {
        let record = input.validate(today)?;
        if self.contains(&record.id) {
            return Err(DonationError::Conflict(format!(
                "record '{}' already exists",
                record.id
            )));
        }
        info!(
            "logged {} x{} ({}) for {}",
            record.name, record.quantity, record.category, record.date
        );
        self.records.push(record);
        Ok(&self.records[self.records.len() - 1])
    }

    /// Records for one donation date, optionally narrowed to a category.
    /// `None` or `"All"` disables the category filter.
    pub fn filter(&self, date: Option<NaiveDate>, category: Option<&str>) -> Vec<&DonationRecord> {
        let category = category.map(str::trim).filter(|c| !c.is_empty() && *c != ALL_CATEGORIES);
        self.records
            .iter()
            .filter(|r| date.is_none_or(|d| r.date == d))
            .filter(|r| category.is_none_or(|c| r.category == c))
            .collect()
    }

    /// Sorted, de-duplicated categories present in the data.
    pub fn categories(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Every distinct donation date, ascending. Each one is a selectable week key.
    pub fn week_options(&self) -> Vec<NaiveDate> {
        self.records
            .iter()
            .map(|r| r.date)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Date the dashboard opens on: the newest donation date, else today.
    pub fn default_date(&self, today: NaiveDate) -> NaiveDate {
        dates::latest_date(&self.records).unwrap_or(today)
    }

    /// Week key the weekly views open on: the seven days ending with the
    /// newest donation date.
    pub fn default_week(&self, today: NaiveDate) -> NaiveDate {
        dates::iso_add_days(self.default_date(today), -6)
    }

    /// All records for one item name, compared case-insensitively.
    pub fn items_named(&self, name: &str) -> Vec<&DonationRecord> {
        let needle = name.trim().to_lowercase();
        self.records
            .iter()
            .filter(|r| r.name.to_lowercase() == needle)
            .collect()
    }

    /// Distinct item names, sorted.
    pub fn item_names(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.name.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Status;

    fn d(s: &str) -> NaiveDate {
        dates::parse_iso_date(s).unwrap()
    }

    fn record(id: &str, name: &str, category: &str, date: &str) -> DonationRecord {
        DonationRecord {
            id: id.to_string(),
            name: name.to_string(),
            category: category.to_string(),
            status: Status::Completed,
            quantity: 5,
            calories: 0,
            expires: d(date),
            date: d(date),
            notes: None,
        }
    }

    fn sample() -> DonationStore {
        DonationStore::from_records(vec![
            record("1", "Muffins", "Pastries", "2025-10-20"),
            record("2", "Milk", "Dairy", "2025-10-20"),
            record("3", "Muffins", "Pastries", "2025-10-21"),
        ])
        .unwrap()
    }

    #[test]
    fn decoding_rejects_duplicate_ids() {
        let json = serde_json::to_string(&sample()).unwrap();
        let decoded: DonationStore = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.len(), 3);

        let twice = serde_json::json!({
            "records": [record("7", "Milk", "Dairy", "2025-10-20"), record("7", "Eggs", "Dairy", "2025-10-21")]
        });
        let err = serde_json::from_value::<DonationStore>(twice).unwrap_err();
        assert!(err.to_string().contains("duplicate record id '7'"));
    }

    #[test]
    fn filter_matches_date_and_category() {
        let store = sample();
        assert_eq!(store.filter(Some(d("2025-10-20")), Some("All")).len(), 2);
        assert_eq!(store.filter(Some(d("2025-10-20")), Some("Dairy")).len(), 1);
        assert_eq!(store.filter(Some(d("2025-10-22")), None).len(), 0);
        assert_eq!(store.filter(None, Some("Pastries")).len(), 2);
    }

    #[test]
    fn categories_and_weeks_are_sorted_unique() {
        let store = sample();
        assert_eq!(store.categories(), vec!["Dairy", "Pastries"]);
        assert_eq!(store.week_options(), vec![d("2025-10-20"), d("2025-10-21")]);
        assert_eq!(store.item_names(), vec!["Milk", "Muffins"]);
    }

    #[test]
    fn default_date_is_latest_or_today() {
        assert_eq!(sample().default_date(d("2030-01-01")), d("2025-10-21"));
        assert_eq!(DonationStore::new().default_date(d("2030-01-01")), d("2030-01-01"));
    }

    #[test]
    fn default_week_ends_on_latest_date() {
        let week = sample().default_week(d("2030-01-01"));
        assert_eq!(week, d("2025-10-15"));
        assert_eq!(dates::week_range(week).1, d("2025-10-21"));
    }

    #[test]
    fn add_appends_and_rejects_duplicate_ids() {
        let mut store = sample();
        let input = NewDonation {
            id: Some("9".to_string()),
            name: "Bagels".to_string(),
            category: "Bread".to_string(),
            quantity: Some(4),
            expires: Some("2025-10-25".to_string()),
            ..Default::default()
        };
        store.add(input.clone(), d("2025-10-22")).unwrap();
        assert_eq!(store.len(), 4);
        assert_eq!(store.get("9").unwrap().date, d("2025-10-22"));
        assert!(matches!(
            store.add(input, d("2025-10-22")),
            Err(DonationError::Conflict(_))
        ));
    }

    #[test]
    fn duplicate_seed_ids_are_rejected() {
        let dup = vec![
            record("1", "A", "Dairy", "2025-10-20"),
            record("1", "B", "Dairy", "2025-10-20"),
        ];
        assert!(DonationStore::from_records(dup).is_err());
    }

    #[test]
    fn items_named_ignores_case() {
        assert_eq!(sample().items_named("muffins").len(), 2);
    }
}
