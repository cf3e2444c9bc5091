#![cfg(feature = "web")]
//! Server-rendered HTML pages.
//!
//! Templates live next to this file and are compiled into the binary; each
//! page gets a small view struct so the templates stay free of logic.

use chrono::NaiveDate;
use handlebars::{Handlebars, RenderError, TemplateError, handlebars_helper};
use serde::{Deserialize, Serialize};

use crate::analytics::{DetailedRow, ItemLog, LogSort};
use crate::dates::{format_week_label, to_iso};
use crate::error::{DonationError, FieldErrors};
use crate::pickup::Pickup;
use crate::record::{DEFAULT_CATEGORIES, DonationRecord, NewDonation, Status};
use crate::stats::{Kpis, WeekComparison, WeekStats, WeeklySummary};
use crate::store::ALL_CATEGORIES;

// Percent-encode a value for use as a path segment or query value.
handlebars_helper!(url_encode: |value: str| urlencoding::encode(value).into_owned());

/// Compiled page templates.
pub struct Pages {
    registry: Handlebars<'static>,
}

impl Pages {
    pub fn new() -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        registry.register_helper("url", Box::new(url_encode));
        registry.register_partial("header", include_str!("./static/header.hbs"))?;
        registry.register_partial("footer", include_str!("./static/footer.hbs"))?;
        registry.register_template_string("dashboard", include_str!("./static/dashboard.hbs"))?;
        registry.register_template_string("weekly", include_str!("./static/weekly.hbs"))?;
        registry.register_template_string("compare", include_str!("./static/compare.hbs"))?;
        registry.register_template_string("item", include_str!("./static/item.hbs"))?;
        registry.register_template_string("analytics", include_str!("./static/analytics.hbs"))?;
        Ok(Self { registry })
    }

    pub fn render<T: Serialize>(&self, page: &str, view: &T) -> Result<String, RenderError> {
        self.registry.render(page, view)
    }
}

/// One `<option>` in a select box.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    fn new(value: impl Into<String>, label: impl Into<String>, selected: bool) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            selected,
        }
    }
}

fn date_options(dates: &[NaiveDate], selected: Option<NaiveDate>) -> Vec<SelectOption> {
    dates
        .iter()
        .map(|d| SelectOption::new(to_iso(*d), to_iso(*d), Some(*d) == selected))
        .collect()
}

/// Week pickers list every donation date labelled as a week, newest first.
/// The selected week is added when it has no records of its own.
pub fn week_options(dates: &[NaiveDate], selected: NaiveDate) -> Vec<SelectOption> {
    let mut keys: Vec<NaiveDate> = dates.to_vec();
    if !keys.contains(&selected) {
        keys.push(selected);
    }
    keys.sort_unstable_by(|a, b| b.cmp(a));
    keys.into_iter()
        .map(|d| SelectOption::new(to_iso(d), format_week_label(d), d == selected))
        .collect()
}

/// Raw fields from the HTML log form. Everything arrives as text so a bad
/// number can be reported next to its input instead of rejecting the request.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DonationForm {
    pub name: String,
    pub category: String,
    pub status: String,
    pub quantity: String,
    pub calories: String,
    pub expires: String,
    pub date: String,
    pub notes: String,
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

impl DonationForm {
    /// Convert to a `NewDonation`.
    ///
    /// When a number does not parse, the rest of the form is still validated
    /// so every problem is reported at once. The number format message wins
    /// over the generic "required" one for the same field.
    pub fn to_new_donation(&self, today: NaiveDate) -> Result<NewDonation, FieldErrors> {
        let mut errors = FieldErrors::new();

        let quantity = match non_empty(&self.quantity) {
            None => None,
            Some(q) => match q.parse::<i64>() {
                Ok(q) => Some(q),
                Err(_) => {
                    errors.insert("quantity", "Quantity must be a whole number".to_string());
                    None
                }
            },
        };
        let calories = match non_empty(&self.calories) {
            None => None,
            Some(c) => match c.parse::<u32>() {
                Ok(c) => Some(c),
                Err(_) => {
                    errors.insert("calories", "Calories must be a whole number".to_string());
                    None
                }
            },
        };

        let input = NewDonation {
            id: None,
            name: self.name.clone(),
            category: self.category.clone(),
            status: non_empty(&self.status),
            quantity,
            calories,
            expires: non_empty(&self.expires),
            date: non_empty(&self.date),
            notes: non_empty(&self.notes),
        };

        if errors.is_empty() {
            return Ok(input);
        }
        if let Err(DonationError::Validation(rest)) = input.validate(today) {
            for (field, message) in rest {
                errors.entry(field).or_insert(message);
            }
        }
        Err(errors)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct PickupView {
    pub id: String,
    pub charity: String,
    pub date: String,
    pub window: String,
    pub items: usize,
}

impl From<&Pickup> for PickupView {
    fn from(p: &Pickup) -> Self {
        Self {
            id: p.id.clone(),
            charity: p.charity.clone(),
            date: to_iso(p.date),
            window: format!("{:?}", p.window),
            items: p.record_ids.len(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardView<'a> {
    pub title: &'static str,
    pub all_dates: bool,
    pub dates: Vec<SelectOption>,
    pub categories: Vec<SelectOption>,
    pub kpis: Kpis,
    pub rows: Vec<&'a DonationRecord>,
    pub form: DonationForm,
    pub form_categories: Vec<SelectOption>,
    pub statuses: Vec<SelectOption>,
    pub errors: FieldErrors,
    pub upcoming: Vec<PickupView>,
}

/// Inputs for the dashboard page.
pub struct DashboardParts<'a> {
    pub dates: Vec<NaiveDate>,
    pub categories: Vec<String>,
    pub date: Option<NaiveDate>,
    pub category: Option<String>,
    pub rows: Vec<&'a DonationRecord>,
    pub upcoming: Vec<&'a Pickup>,
    pub form: DonationForm,
    pub errors: FieldErrors,
}

impl<'a> DashboardView<'a> {
    pub fn new(parts: DashboardParts<'a>) -> Self {
        let selected_category = parts
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(ALL_CATEGORIES);

        let mut categories = vec![SelectOption::new(
            ALL_CATEGORIES,
            "All categories",
            selected_category == ALL_CATEGORIES,
        )];
        categories.extend(
            parts
                .categories
                .iter()
                .map(|c| SelectOption::new(c.as_str(), c.as_str(), c == selected_category)),
        );

        let form_category = non_empty(&parts.form.category);
        let form_categories = DEFAULT_CATEGORIES
            .iter()
            .map(|c| SelectOption::new(*c, *c, form_category.as_deref() == Some(*c)))
            .collect();

        let form_status = non_empty(&parts.form.status).unwrap_or_else(|| Status::Pending.to_string());
        let statuses = [Status::Pending, Status::Completed, Status::Flagged]
            .iter()
            .map(|s| SelectOption::new(s.as_str(), s.as_str(), s.as_str() == form_status))
            .collect();

        let mut dates = parts.dates;
        dates.sort_unstable_by(|a, b| b.cmp(a));

        DashboardView {
            title: "Dashboard",
            all_dates: parts.date.is_none(),
            dates: date_options(&dates, parts.date),
            categories,
            kpis: Kpis::from_records(parts.rows.iter().copied()),
            rows: parts.rows,
            form: parts.form,
            form_categories,
            statuses,
            errors: parts.errors,
            upcoming: parts.upcoming.into_iter().map(PickupView::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryQuantity {
    pub category: String,
    pub quantity: u64,
}

#[derive(Debug, Serialize)]
pub struct WeeklyView {
    pub title: &'static str,
    pub week: String,
    pub weeks: Vec<SelectOption>,
    pub summary: WeeklySummary,
    pub categories: Vec<CategoryQuantity>,
    pub pickups: Vec<PickupView>,
}

impl WeeklyView {
    pub fn new(
        week_dates: &[NaiveDate],
        summary: WeeklySummary,
        categories: Vec<(String, u64)>,
        pickups: Vec<&Pickup>,
    ) -> Self {
        WeeklyView {
            title: "Weekly Waste",
            week: to_iso(summary.week_start),
            weeks: week_options(week_dates, summary.week_start),
            categories: categories
                .into_iter()
                .map(|(category, quantity)| CategoryQuantity { category, quantity })
                .collect(),
            pickups: pickups.into_iter().map(PickupView::from).collect(),
            summary,
        }
    }
}

/// One week's column on the compare page.
#[derive(Debug, Serialize)]
pub struct WeekCard {
    pub week: String,
    pub label: String,
    pub total_items: usize,
    pub completed_items: usize,
    pub completion_pct: u32,
    pub avg_quantity: String,
}

impl From<&WeekStats> for WeekCard {
    fn from(stats: &WeekStats) -> Self {
        Self {
            week: to_iso(stats.week_start),
            label: stats.label.clone(),
            total_items: stats.total_items,
            completed_items: stats.completed_items,
            completion_pct: (stats.completion_rate * 100.0).round() as u32,
            avg_quantity: format!("{:.1}", stats.avg_quantity),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryRow {
    pub category: String,
    pub a_items: usize,
    pub a_avg: String,
    pub b_items: usize,
    pub b_avg: String,
}

fn average_cell(avg: Option<f64>) -> String {
    avg.map_or_else(|| "-".to_string(), |a| format!("{:.1}", a))
}

#[derive(Debug, Serialize)]
pub struct CompareView {
    pub title: &'static str,
    pub week_a: String,
    pub week_b: String,
    pub label_a: String,
    pub label_b: String,
    pub weeks_a: Vec<SelectOption>,
    pub weeks_b: Vec<SelectOption>,
    pub cards: Vec<WeekCard>,
    pub categories: Vec<CategoryRow>,
}

impl CompareView {
    pub fn new(week_dates: &[NaiveDate], comparison: &WeekComparison) -> Self {
        let a = &comparison.week_a;
        let b = &comparison.week_b;
        CompareView {
            title: "Compare Weeks",
            week_a: to_iso(a.week_start),
            week_b: to_iso(b.week_start),
            label_a: a.label.clone(),
            label_b: b.label.clone(),
            weeks_a: week_options(week_dates, a.week_start),
            weeks_b: week_options(week_dates, b.week_start),
            cards: vec![WeekCard::from(a), WeekCard::from(b)],
            categories: comparison
                .categories
                .iter()
                .map(|c| CategoryRow {
                    category: c.category.clone(),
                    a_items: c.week_a_items,
                    a_avg: average_cell(c.week_a_avg_qty),
                    b_items: c.week_b_items,
                    b_avg: average_cell(c.week_b_avg_qty),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ItemView {
    pub title: String,
    pub dates: Vec<SelectOption>,
    pub sorts: Vec<SelectOption>,
    pub log: ItemLog,
}

impl ItemView {
    pub fn new(log: ItemLog, date: Option<NaiveDate>, sort: LogSort) -> Self {
        let sorts = [
            (LogSort::Date, "date", "Newest first"),
            (LogSort::Qty, "qty", "Largest quantity"),
            (LogSort::Status, "status", "Status"),
        ]
        .into_iter()
        .map(|(s, value, label)| SelectOption::new(value, label, s == sort))
        .collect();

        ItemView {
            title: log.item.clone(),
            dates: date_options(&log.dates, date),
            sorts,
            log,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyticsView {
    pub title: &'static str,
    pub rows: Vec<DetailedRow>,
}
