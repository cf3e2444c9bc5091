//! KPIs and week-over-week statistics.
//!
//! Everything here is a pure function over a slice of records so the same
//! numbers back the dashboard, the weekly pages, the exports and the CLI.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::dates::{self, format_week_label, is_in_range, week_range, weekday_index};
use crate::record::DonationRecord;

/// Abbreviated day names in series order.
pub const DAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Step used when rounding chart axes.
pub const AXIS_STEP: u64 = 50;

/// Headline numbers for the dashboard table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Kpis {
    pub total_items: usize,
    /// Whole-number percentage of rows marked Completed
    pub donation_rate: u32,
    /// Mean quantity, rounded
    pub avg_quantity: u32,
}

impl Kpis {
    pub fn from_records<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = &'a DonationRecord>,
    {
        let mut total = 0usize;
        let mut completed = 0usize;
        let mut quantity = 0u64;
        for r in rows {
            total += 1;
            quantity += r.quantity as u64;
            if r.status.is_donated() {
                completed += 1;
            }
        }

        if total == 0 {
            return Kpis {
                total_items: 0,
                donation_rate: 0,
                avg_quantity: 0,
            };
        }

        Kpis {
            total_items: total,
            donation_rate: (completed as f64 / total as f64 * 100.0).round() as u32,
            avg_quantity: (quantity as f64 / total as f64).round() as u32,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CategoryStats {
    pub total_items: usize,
    pub completed_items: usize,
    pub avg_quantity: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WeekStats {
    pub week_start: NaiveDate,
    pub label: String,
    pub total_items: usize,
    pub completed_items: usize,
    /// Fraction in 0..=1
    pub completion_rate: f64,
    pub avg_quantity: f64,
    pub per_category: BTreeMap<String, CategoryStats>,
}

fn in_week<'a>(
    records: &'a [DonationRecord],
    week_start: NaiveDate,
) -> impl Iterator<Item = &'a DonationRecord> {
    let (start, end) = week_range(week_start);
    records.iter().filter(move |r| is_in_range(r.date, start, end))
}

fn mean(sum: u64, count: usize) -> f64 {
    if count == 0 { 0.0 } else { sum as f64 / count as f64 }
}

/// Aggregate the records donated within `[week_start, week_start + 6]`.
pub fn compute_week_stats(records: &[DonationRecord], week_start: NaiveDate) -> WeekStats {
    let mut total_items = 0usize;
    let mut completed_items = 0usize;
    let mut total_qty = 0u64;
    // category -> (items, completed, quantity)
    let mut buckets: BTreeMap<String, (usize, usize, u64)> = BTreeMap::new();

    for item in in_week(records, week_start) {
        total_items += 1;
        total_qty += item.quantity as u64;
        let bucket = buckets.entry(item.category.clone()).or_default();
        bucket.0 += 1;
        bucket.2 += item.quantity as u64;
        if item.status.is_donated() {
            completed_items += 1;
            bucket.1 += 1;
        }
    }

    let per_category = buckets
        .into_iter()
        .map(|(name, (items, completed, qty))| {
            (
                name,
                CategoryStats {
                    total_items: items,
                    completed_items: completed,
                    avg_quantity: mean(qty, items),
                },
            )
        })
        .collect();

    WeekStats {
        week_start,
        label: format_week_label(week_start),
        total_items,
        completed_items,
        completion_rate: if total_items == 0 {
            0.0
        } else {
            completed_items as f64 / total_items as f64
        },
        avg_quantity: mean(total_qty, total_items),
        per_category,
    }
}

/// Quantity per weekday (Mon..Sun) for one week.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuantitySeries {
    pub week_start: NaiveDate,
    pub qty_per_day: [u64; 7],
    pub max_qty: u64,
}

impl QuantitySeries {
    pub fn labels(&self) -> [&'static str; 7] {
        DAY_LABELS
    }

    pub fn axis_max(&self) -> u64 {
        axis_max_tick(self.max_qty)
    }
}

/// Bucket a week's quantities by the weekday of each donation date.
pub fn weekly_quantity_series(records: &[DonationRecord], week_start: NaiveDate) -> QuantitySeries {
    let mut qty_per_day = [0u64; 7];
    for item in in_week(records, week_start) {
        qty_per_day[weekday_index(item.date)] += item.quantity as u64;
    }
    let max_qty = qty_per_day.iter().copied().max().unwrap_or(0);
    QuantitySeries {
        week_start,
        qty_per_day,
        max_qty,
    }
}

/// Round an axis maximum up to the next multiple of 50 (never 0).
pub fn axis_max_tick(max: u64) -> u64 {
    let tick = max.div_ceil(AXIS_STEP) * AXIS_STEP;
    if tick == 0 { AXIS_STEP } else { tick }
}

/// Total quantity per category for one week, largest first.
pub fn category_quantities(records: &[DonationRecord], week_start: NaiveDate) -> Vec<(String, u64)> {
    let mut totals: BTreeMap<&str, u64> = BTreeMap::new();
    for item in in_week(records, week_start) {
        *totals.entry(item.category.as_str()).or_default() += item.quantity as u64;
    }
    let mut out: Vec<(String, u64)> = totals
        .into_iter()
        .map(|(name, qty)| (name.to_string(), qty))
        .collect();
    // stable sort keeps alphabetical order on ties
    out.sort_by(|a, b| b.1.cmp(&a.1));
    out
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CategoryComparison {
    pub category: String,
    pub week_a_items: usize,
    pub week_a_avg_qty: Option<f64>,
    pub week_b_items: usize,
    pub week_b_avg_qty: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WeekComparison {
    pub week_a: WeekStats,
    pub week_b: WeekStats,
    pub series_a: QuantitySeries,
    pub series_b: QuantitySeries,
    pub categories: Vec<CategoryComparison>,
}

/// Side-by-side stats for two weeks plus the per-category breakdown over the
/// sorted union of both weeks' categories.
pub fn compare_weeks(records: &[DonationRecord], week_a: NaiveDate, week_b: NaiveDate) -> WeekComparison {
    let a = compute_week_stats(records, week_a);
    let b = compute_week_stats(records, week_b);

    let names: BTreeSet<&String> = a.per_category.keys().chain(b.per_category.keys()).collect();
    let categories = names
        .into_iter()
        .map(|name| {
            let ca = a.per_category.get(name);
            let cb = b.per_category.get(name);
            CategoryComparison {
                category: name.clone(),
                week_a_items: ca.map_or(0, |c| c.total_items),
                week_a_avg_qty: ca.map(|c| c.avg_quantity),
                week_b_items: cb.map_or(0, |c| c.total_items),
                week_b_avg_qty: cb.map(|c| c.avg_quantity),
            }
        })
        .collect();

    WeekComparison {
        series_a: weekly_quantity_series(records, week_a),
        series_b: weekly_quantity_series(records, week_b),
        week_a: a,
        week_b: b,
        categories,
    }
}

/// Weekly waste summary card data.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WeeklySummary {
    pub week_start: NaiveDate,
    pub label: String,
    /// Units from Completed records
    pub items_donated: u64,
    pub top_category: Option<String>,
    pub pickups_scheduled: usize,
    /// Units from Flagged records
    pub waste_quantity: u64,
    pub previous_waste_quantity: u64,
    /// Percent change of waste against the previous week
    pub waste_change_pct: Option<f64>,
    pub waste_delta: String,
}

fn waste_in_week(records: &[DonationRecord], week_start: NaiveDate) -> u64 {
    in_week(records, week_start)
        .filter(|r| r.status.is_waste())
        .map(|r| r.quantity as u64)
        .sum()
}

pub fn describe_waste_change(change: Option<f64>) -> String {
    match change {
        None => "No waste recorded last week".to_string(),
        Some(pct) if pct.abs() < 0.05 => "No change from last week".to_string(),
        Some(pct) if pct > 0.0 => format!("{:.1}% more than last week", pct),
        Some(pct) => format!("{:.1}% less than last week", pct.abs()),
    }
}

/// Build the summary cards for the week starting at `week_start`.
/// `pickup_dates` are the dates of active scheduled pickups.
pub fn weekly_summary(
    records: &[DonationRecord],
    pickup_dates: &[NaiveDate],
    week_start: NaiveDate,
) -> WeeklySummary {
    let (start, end) = week_range(week_start);

    let items_donated = in_week(records, week_start)
        .filter(|r| r.status.is_donated())
        .map(|r| r.quantity as u64)
        .sum();

    let top_category = category_quantities(records, week_start)
        .into_iter()
        .next()
        .map(|(name, _)| name);

    let pickups_scheduled = pickup_dates
        .iter()
        .filter(|d| is_in_range(**d, start, end))
        .count();

    let waste_quantity = waste_in_week(records, week_start);
    let previous_waste_quantity = waste_in_week(records, dates::iso_add_days(week_start, -7));
    let waste_change_pct = if previous_waste_quantity == 0 {
        None
    } else {
        let prev = previous_waste_quantity as f64;
        Some((waste_quantity as f64 - prev) / prev * 100.0)
    };

    WeeklySummary {
        week_start,
        label: format_week_label(week_start),
        items_donated,
        top_category,
        pickups_scheduled,
        waste_quantity,
        previous_waste_quantity,
        waste_change_pct,
        waste_delta: describe_waste_change(waste_change_pct),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_iso_date;
    use crate::record::Status;

    fn d(s: &str) -> NaiveDate {
        parse_iso_date(s).unwrap()
    }

    fn rec(name: &str, category: &str, status: Status, quantity: u32, date: &str) -> DonationRecord {
        DonationRecord {
            id: format!("{}-{}-{}", name, date, quantity),
            name: name.to_string(),
            category: category.to_string(),
            status,
            quantity,
            calories: 0,
            expires: d(date),
            date: d(date),
            notes: None,
        }
    }

    fn sample() -> Vec<DonationRecord> {
        vec![
            rec("Croissants", "Pastries", Status::Completed, 20, "2025-10-20"),
            rec("Muffins", "Pastries", Status::Flagged, 10, "2025-10-21"),
            rec("Milk", "Dairy", Status::Completed, 6, "2025-10-21"),
            rec("Rolls", "Bread", Status::Pending, 4, "2025-10-26"),
            // following week
            rec("Croissants", "Pastries", Status::Flagged, 12, "2025-10-27"),
            rec("Cheese", "Dairy", Status::Completed, 3, "2025-10-29"),
        ]
    }

    #[test]
    fn kpis_round_rate_and_average() {
        let rows = sample();
        let kpis = Kpis::from_records(&rows[..3]);
        assert_eq!(kpis.total_items, 3);
        assert_eq!(kpis.donation_rate, 67);
        assert_eq!(kpis.avg_quantity, 12);
    }

    #[test]
    fn kpis_of_nothing_are_zero() {
        let kpis = Kpis::from_records(std::iter::empty());
        assert_eq!(kpis, Kpis { total_items: 0, donation_rate: 0, avg_quantity: 0 });
    }

    #[test]
    fn week_stats_include_both_window_ends() {
        let stats = compute_week_stats(&sample(), d("2025-10-20"));
        assert_eq!(stats.total_items, 4);
        assert_eq!(stats.completed_items, 2);
        assert!((stats.completion_rate - 0.5).abs() < 1e-9);
        assert!((stats.avg_quantity - 10.0).abs() < 1e-9);

        let pastries = &stats.per_category["Pastries"];
        assert_eq!(pastries.total_items, 2);
        assert_eq!(pastries.completed_items, 1);
        assert!((pastries.avg_quantity - 15.0).abs() < 1e-9);
        assert_eq!(stats.label, "Week of Oct 20");
    }

    #[test]
    fn empty_week_is_all_zero() {
        let stats = compute_week_stats(&sample(), d("2024-01-01"));
        assert_eq!(stats.total_items, 0);
        assert_eq!(stats.completion_rate, 0.0);
        assert_eq!(stats.avg_quantity, 0.0);
        assert!(stats.per_category.is_empty());
    }

    #[test]
    fn week_key_need_not_be_a_monday() {
        // Tuesday key: window is Tue 21 .. Mon 27
        let stats = compute_week_stats(&sample(), d("2025-10-21"));
        assert_eq!(stats.total_items, 4);
    }

    #[test]
    fn series_buckets_by_weekday() {
        let series = weekly_quantity_series(&sample(), d("2025-10-20"));
        assert_eq!(series.qty_per_day, [20, 16, 0, 0, 0, 0, 4]);
        assert_eq!(series.max_qty, 20);
        assert_eq!(series.axis_max(), 50);
        assert_eq!(series.labels()[6], "Sun");
    }

    #[test]
    fn axis_tick_rounds_up_to_fifty() {
        assert_eq!(axis_max_tick(0), 50);
        assert_eq!(axis_max_tick(50), 50);
        assert_eq!(axis_max_tick(51), 100);
        assert_eq!(axis_max_tick(149), 150);
    }

    #[test]
    fn comparison_uses_union_of_categories() {
        let cmp = compare_weeks(&sample(), d("2025-10-20"), d("2025-10-27"));
        let names: Vec<_> = cmp.categories.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(names, vec!["Bread", "Dairy", "Pastries"]);

        let bread = &cmp.categories[0];
        assert_eq!(bread.week_a_items, 1);
        assert_eq!(bread.week_b_items, 0);
        assert_eq!(bread.week_b_avg_qty, None);
        assert_eq!(cmp.week_b.total_items, 2);
    }

    #[test]
    fn summary_reports_waste_change() {
        let rows = sample();
        let pickups = vec![d("2025-10-28"), d("2025-11-10")];
        let summary = weekly_summary(&rows, &pickups, d("2025-10-27"));
        assert_eq!(summary.items_donated, 3);
        assert_eq!(summary.top_category.as_deref(), Some("Pastries"));
        assert_eq!(summary.pickups_scheduled, 1);
        assert_eq!(summary.waste_quantity, 12);
        assert_eq!(summary.previous_waste_quantity, 10);
        assert_eq!(summary.waste_delta, "20.0% more than last week");
    }

    #[test]
    fn summary_without_previous_waste() {
        let summary = weekly_summary(&sample(), &[], d("2025-10-20"));
        assert_eq!(summary.waste_change_pct, None);
        assert_eq!(summary.waste_delta, "No waste recorded last week");
        assert_eq!(describe_waste_change(Some(-25.0)), "25.0% less than last week");
    }

    #[test]
    fn totals_do_not_overflow_on_large_quantities() {
        let rows = vec![
            rec("Flour", "Grains", Status::Flagged, u32::MAX, "2025-10-20"),
            rec("Flour", "Grains", Status::Flagged, u32::MAX - 1, "2025-10-20"),
            rec("Rice", "Grains", Status::Completed, u32::MAX, "2025-10-21"),
            rec("Rice", "Grains", Status::Completed, u32::MAX - 1, "2025-10-21"),
        ];
        let pair = 2 * u32::MAX as u64 - 1;

        let series = weekly_quantity_series(&rows, d("2025-10-20"));
        assert_eq!(series.qty_per_day[0], pair);
        assert_eq!(series.max_qty, pair);
        assert!(series.axis_max() >= pair);

        assert_eq!(category_quantities(&rows, d("2025-10-20")), vec![("Grains".to_string(), 2 * pair)]);

        let summary = weekly_summary(&rows, &[], d("2025-10-20"));
        assert_eq!(summary.items_donated, pair);
        assert_eq!(summary.waste_quantity, pair);
    }
}
