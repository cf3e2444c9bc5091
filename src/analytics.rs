//! Per-item views: the item log table, an item's weekly history and the
//! detailed analytics table.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::dates::{format_week_label, monday_of};
use crate::record::{DonationRecord, Status};
use crate::store::DonationStore;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSort {
    /// Newest first
    #[default]
    Date,
    /// Largest quantity first
    Qty,
    /// Alphabetical by status name
    Status,
}

impl LogSort {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "date" => Some(LogSort::Date),
            "qty" | "quantity" => Some(LogSort::Qty),
            "status" => Some(LogSort::Status),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LogEntry {
    pub id: String,
    pub date: NaiveDate,
    pub qty: u32,
    pub status: Status,
    pub expired: bool,
    pub donated: bool,
    pub notes: String,
}

impl LogEntry {
    fn from_record(record: &DonationRecord, today: NaiveDate) -> Self {
        LogEntry {
            id: record.id.clone(),
            date: record.date,
            qty: record.quantity,
            status: record.status,
            expired: record.status.is_waste() || record.expires < today,
            donated: record.status.is_donated(),
            notes: record.notes.clone().unwrap_or_else(|| "-".to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ItemLog {
    pub item: String,
    pub category: Option<String>,
    /// Distinct log dates, newest first, for the date filter
    pub dates: Vec<NaiveDate>,
    pub entries: Vec<LogEntry>,
}

/// Log table for one item. `date` narrows to a single day; `None` shows all.
pub fn item_log(
    store: &DonationStore,
    name: &str,
    date: Option<NaiveDate>,
    sort: LogSort,
    today: NaiveDate,
) -> ItemLog {
    let records = store.items_named(name);

    let mut dates: Vec<NaiveDate> = records.iter().map(|r| r.date).collect();
    dates.sort_unstable_by(|a, b| b.cmp(a));
    dates.dedup();

    let mut entries: Vec<LogEntry> = records
        .iter()
        .filter(|r| date.is_none_or(|d| r.date == d))
        .map(|r| LogEntry::from_record(r, today))
        .collect();

    match sort {
        LogSort::Date => entries.sort_by(|a, b| b.date.cmp(&a.date)),
        LogSort::Qty => entries.sort_by(|a, b| b.qty.cmp(&a.qty)),
        LogSort::Status => entries.sort_by(|a, b| a.status.as_str().cmp(b.status.as_str())),
    }

    ItemLog {
        item: records
            .first()
            .map_or_else(|| name.trim().to_string(), |r| r.name.clone()),
        category: records.first().map(|r| r.category.clone()),
        dates,
        entries,
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WeeklyPoint {
    pub week_start: NaiveDate,
    pub label: String,
    pub quantity: u64,
    pub waste: u64,
}

/// Quantity and waste for one item, bucketed into Monday-based weeks.
pub fn item_weekly_history(store: &DonationStore, name: &str) -> Vec<WeeklyPoint> {
    let mut weeks: BTreeMap<NaiveDate, (u64, u64)> = BTreeMap::new();
    for r in store.items_named(name) {
        let quantity = r.quantity as u64;
        let bucket = weeks.entry(monday_of(r.date)).or_default();
        bucket.0 += quantity;
        if r.status.is_waste() {
            bucket.1 += quantity;
        }
    }
    weeks
        .into_iter()
        .map(|(week_start, (quantity, waste))| WeeklyPoint {
            week_start,
            label: format_week_label(week_start),
            quantity,
            waste,
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DetailedRow {
    pub item: String,
    pub category: String,
    pub qty: u64,
    /// Percent of quantity flagged as waste
    pub waste_pct: u32,
    /// Percent of quantity donated
    pub donate_pct: u32,
    /// Earliest expiration among the item's records
    pub expires: NaiveDate,
}

fn percent(part: u64, whole: u64) -> u32 {
    if whole == 0 {
        0
    } else {
        (part as f64 / whole as f64 * 100.0).round() as u32
    }
}

/// One row per item name, sorted by name.
pub fn detailed_rows(store: &DonationStore) -> Vec<DetailedRow> {
    struct Acc<'a> {
        category: &'a str,
        qty: u64,
        waste: u64,
        donated: u64,
        expires: NaiveDate,
    }

    let mut items: BTreeMap<&str, Acc> = BTreeMap::new();
    for r in store.records() {
        let acc = items.entry(r.name.as_str()).or_insert(Acc {
            category: r.category.as_str(),
            qty: 0,
            waste: 0,
            donated: 0,
            expires: r.expires,
        });
        let quantity = r.quantity as u64;
        acc.qty += quantity;
        if r.status.is_waste() {
            acc.waste += quantity;
        }
        if r.status.is_donated() {
            acc.donated += quantity;
        }
        acc.expires = acc.expires.min(r.expires);
    }

    items
        .into_iter()
        .map(|(item, acc)| DetailedRow {
            item: item.to_string(),
            category: acc.category.to_string(),
            qty: acc.qty,
            waste_pct: percent(acc.waste, acc.qty),
            donate_pct: percent(acc.donated, acc.qty),
            expires: acc.expires,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_iso_date;

    fn d(s: &str) -> NaiveDate {
        parse_iso_date(s).unwrap()
    }

    fn rec(id: &str, status: Status, qty: u32, date: &str, notes: Option<&str>) -> DonationRecord {
        DonationRecord {
            id: id.to_string(),
            name: "Cinnamon Rolls".to_string(),
            category: "Pastries".to_string(),
            status,
            quantity: qty,
            calories: 240,
            expires: d("2025-10-28"),
            date: d(date),
            notes: notes.map(str::to_string),
        }
    }

    fn store() -> DonationStore {
        DonationStore::from_records(vec![
            rec("1", Status::Completed, 12, "2025-10-21", None),
            rec("2", Status::Flagged, 15, "2025-10-20", Some("Midday batch waste")),
            rec("3", Status::Completed, 10, "2025-10-19", None),
        ])
        .unwrap()
    }

    #[test]
    fn log_sorts_newest_first_by_default() {
        let log = item_log(&store(), "cinnamon rolls", None, LogSort::Date, d("2025-10-22"));
        let ids: Vec<_> = log.entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(log.item, "Cinnamon Rolls");
        assert_eq!(log.dates.len(), 3);
        assert_eq!(log.entries[1].notes, "Midday batch waste");
        assert_eq!(log.entries[0].notes, "-");
        assert!(log.entries[1].expired);
        assert!(!log.entries[0].expired);
        assert!(log.entries[0].donated);
    }

    #[test]
    fn log_sorts_by_quantity_and_status() {
        let s = store();
        let by_qty = item_log(&s, "Cinnamon Rolls", None, LogSort::Qty, d("2025-10-22"));
        assert_eq!(by_qty.entries[0].qty, 15);
        let by_status = item_log(&s, "Cinnamon Rolls", None, LogSort::Status, d("2025-10-22"));
        assert_eq!(by_status.entries[2].status, Status::Flagged);
    }

    #[test]
    fn log_filters_single_date() {
        let log = item_log(&store(), "Cinnamon Rolls", Some(d("2025-10-20")), LogSort::Date, d("2025-10-22"));
        assert_eq!(log.entries.len(), 1);
        assert_eq!(log.dates.len(), 3);
    }

    #[test]
    fn unknown_item_has_empty_log() {
        let log = item_log(&store(), "Bagels", None, LogSort::Date, d("2025-10-22"));
        assert!(log.entries.is_empty());
        assert_eq!(log.category, None);
    }

    #[test]
    fn history_groups_by_monday() {
        let history = item_weekly_history(&store(), "Cinnamon Rolls");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].week_start, d("2025-10-13"));
        assert_eq!(history[0].quantity, 10);
        assert_eq!(history[1].quantity, 27);
        assert_eq!(history[1].waste, 15);
    }

    #[test]
    fn detailed_rows_compute_shares() {
        let rows = detailed_rows(&store());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].qty, 37);
        assert_eq!(rows[0].waste_pct, 41);
        assert_eq!(rows[0].donate_pct, 59);
        assert_eq!(LogSort::parse("Quantity"), Some(LogSort::Qty));
    }

    #[test]
    fn large_quantities_sum_without_wrapping() {
        let s = DonationStore::from_records(vec![
            rec("1", Status::Flagged, u32::MAX, "2025-10-20", None),
            rec("2", Status::Flagged, u32::MAX, "2025-10-21", None),
        ])
        .unwrap();
        let total = 2 * u32::MAX as u64;

        let history = item_weekly_history(&s, "Cinnamon Rolls");
        assert_eq!(history[0].quantity, total);
        assert_eq!(history[0].waste, total);

        let rows = detailed_rows(&s);
        assert_eq!(rows[0].qty, total);
        assert_eq!(rows[0].waste_pct, 100);
    }
}
