use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
#[cfg(feature = "web")]
use std::error::Error;

use crate::dates::to_iso;
use crate::record::DonationRecord;
use crate::stats::WeekComparison;

lazy_static! {
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
}

/// Sections a comparison report can include.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncludeSections {
    pub items: bool,
    pub categories: bool,
    pub waste_trends: bool,
    pub donation_trends: bool,
    pub expiration_risks: bool,
}

impl Default for IncludeSections {
    /// Everything is included unless switched off
    fn default() -> Self {
        Self {
            items: true,
            categories: true,
            waste_trends: true,
            donation_trends: true,
            expiration_risks: true,
        }
    }
}

impl IncludeSections {
    pub const LABELS: [&'static str; 5] = [
        "Items",
        "Categories",
        "Waste Trends",
        "Donation Trends",
        "Expiration Risks",
    ];

    pub fn flags(&self) -> [bool; 5] {
        [
            self.items,
            self.categories,
            self.waste_trends,
            self.donation_trends,
            self.expiration_risks,
        ]
    }
}

/// Labelled values for one chart.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Series {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

/// Data behind an exported chart pair: a category pie and a bar chart.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChartExport {
    pub week_key: String,
    pub pie: Series,
    pub bar: Series,
}

/// Build the export payload for a week comparison.
pub fn comparison_export(comparison: &WeekComparison, include: &IncludeSections) -> ChartExport {
    ChartExport {
        week_key: format!("{} vs {}", comparison.week_a.label, comparison.week_b.label),
        pie: Series {
            labels: IncludeSections::LABELS.iter().map(|l| l.to_string()).collect(),
            values: include
                .flags()
                .iter()
                .map(|on| if *on { 1.0 } else { 0.0 })
                .collect(),
        },
        bar: Series {
            labels: vec!["Week A Items".to_string(), "Week B Items".to_string()],
            values: vec![
                comparison.week_a.total_items as f64,
                comparison.week_b.total_items as f64,
            ],
        },
    }
}

// Whole numbers print without a trailing ".0"
fn format_value(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}

fn escape_csv(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Render a chart export as CSV.
///
/// The layout is a `Week:` header, a blank line, the `Category,Value` table
/// from the pie series, another blank line and the `Day,Value` table from the
/// bar series. Missing values are written as 0.
///
/// # Examples
/// ```
/// use betterbites::downloader::{ChartExport, Series, to_csv};
///
/// let export = ChartExport {
///     week_key: "2025-10-20".to_string(),
///     pie: Series { labels: vec!["Dairy".into()], values: vec![3.0] },
///     bar: Series { labels: vec!["Mon".into(), "Tue".into()], values: vec![5.0] },
/// };
/// let csv = to_csv(&export);
/// assert!(csv.ends_with("Mon,5\nTue,0"));
/// ```
pub fn to_csv(data: &ChartExport) -> String {
    let mut rows: Vec<String> = Vec::new();

    rows.push(format!("Week: {}", data.week_key));
    rows.push(String::new());
    rows.push("Category,Value".to_string());
    for (i, label) in data.pie.labels.iter().enumerate() {
        let value = data.pie.values.get(i).copied().unwrap_or(0.0);
        rows.push(format!("{},{}", escape_csv(label), format_value(value)));
    }

    rows.push(String::new());
    rows.push("Day,Value".to_string());
    for (i, label) in data.bar.labels.iter().enumerate() {
        let value = data.bar.values.get(i).copied().unwrap_or(0.0);
        rows.push(format!("{},{}", escape_csv(label), format_value(value)));
    }

    rows.join("\n")
}

/// `betterbites_export_<A>_vs_<B>.<ext>`, whitespace runs collapsed to `_`.
pub fn export_filename(label_a: &str, label_b: &str, extension: &str) -> String {
    format!(
        "betterbites_export_{}_vs_{}.{}",
        WHITESPACE_RUN.replace_all(label_a.trim(), "_"),
        WHITESPACE_RUN.replace_all(label_b.trim(), "_"),
        extension
    )
}

pub const RECORD_COLUMNS: [&str; 9] = [
    "id", "name", "category", "status", "quantity", "calories", "expires", "date", "notes",
];

/// Convert records to CSV with a header row. The output can be read back by
/// the CSV loader.
pub fn records_to_csv<'a, I>(records: I) -> String
where
    I: IntoIterator<Item = &'a DonationRecord>,
{
    let mut csv_content = RECORD_COLUMNS.join(",");
    csv_content.push('\n');

    for r in records {
        let fields = [
            escape_csv(&r.id),
            escape_csv(&r.name),
            escape_csv(&r.category),
            r.status.to_string(),
            r.quantity.to_string(),
            r.calories.to_string(),
            to_iso(r.expires),
            to_iso(r.date),
            escape_csv(r.notes.as_deref().unwrap_or("")),
        ];
        csv_content.push_str(&fields.join(","));
        csv_content.push('\n');
    }

    csv_content
}

/// Convert a week comparison to an XLSX workbook.
///
/// The first sheet holds the headline numbers for both weeks. A per-category
/// sheet is added when categories are included and a Mon..Sun quantity sheet
/// when donation trends are included.
#[cfg(feature = "web")]
pub fn comparison_to_xlsx(
    comparison: &WeekComparison,
    include: &IncludeSections,
) -> Result<Vec<u8>, Box<dyn Error>> {
    use rust_xlsxwriter::{Format, Workbook, Worksheet};

    let bold = Format::new().set_bold();
    let mut workbook = Workbook::new();

    let mut summary = Worksheet::new();
    summary.set_name("Summary")?;
    summary.write_string_with_format(0, 0, "Metric", &bold)?;
    summary.write_string_with_format(0, 1, comparison.week_a.label.as_str(), &bold)?;
    summary.write_string_with_format(0, 2, comparison.week_b.label.as_str(), &bold)?;

    let a = &comparison.week_a;
    let b = &comparison.week_b;
    let metrics: [(&str, f64, f64); 4] = [
        ("Total items", a.total_items as f64, b.total_items as f64),
        ("Completed items", a.completed_items as f64, b.completed_items as f64),
        ("Completion %", a.completion_rate * 100.0, b.completion_rate * 100.0),
        ("Avg quantity", a.avg_quantity, b.avg_quantity),
    ];
    for (i, (name, va, vb)) in metrics.iter().enumerate() {
        let row = (i + 1) as u32;
        summary.write_string(row, 0, *name)?;
        summary.write_number(row, 1, *va)?;
        summary.write_number(row, 2, *vb)?;
    }
    workbook.push_worksheet(summary);

    if include.categories {
        let mut sheet = Worksheet::new();
        sheet.set_name("Categories")?;
        let headers = [
            "Category",
            "Week A Items",
            "Week A Avg Qty",
            "Week B Items",
            "Week B Avg Qty",
        ];
        for (c, h) in headers.iter().enumerate() {
            sheet.write_string_with_format(0, c as u16, *h, &bold)?;
        }
        for (i, cat) in comparison.categories.iter().enumerate() {
            let row = (i + 1) as u32;
            sheet.write_string(row, 0, cat.category.as_str())?;
            sheet.write_number(row, 1, cat.week_a_items as f64)?;
            match cat.week_a_avg_qty {
                Some(v) => sheet.write_number(row, 2, v)?,
                None => sheet.write_string(row, 2, "-")?,
            };
            sheet.write_number(row, 3, cat.week_b_items as f64)?;
            match cat.week_b_avg_qty {
                Some(v) => sheet.write_number(row, 4, v)?,
                None => sheet.write_string(row, 4, "-")?,
            };
        }
        workbook.push_worksheet(sheet);
    }

    if include.donation_trends {
        let mut sheet = Worksheet::new();
        sheet.set_name("Daily Quantity")?;
        sheet.write_string_with_format(0, 0, "Day", &bold)?;
        sheet.write_string_with_format(0, 1, "Week A", &bold)?;
        sheet.write_string_with_format(0, 2, "Week B", &bold)?;
        for (i, day) in comparison.series_a.labels().iter().enumerate() {
            let row = (i + 1) as u32;
            sheet.write_string(row, 0, *day)?;
            sheet.write_number(row, 1, comparison.series_a.qty_per_day[i] as f64)?;
            sheet.write_number(row, 2, comparison.series_b.qty_per_day[i] as f64)?;
        }
        workbook.push_worksheet(sheet);
    }

    let buffer = workbook.save_to_buffer()?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_iso_date;
    use crate::record::Status;
    use crate::stats::compare_weeks;

    fn rec(id: &str, name: &str, qty: u32, date: &str) -> DonationRecord {
        DonationRecord {
            id: id.to_string(),
            name: name.to_string(),
            category: "Bread".to_string(),
            status: Status::Completed,
            quantity: qty,
            calories: 0,
            expires: parse_iso_date(date).unwrap(),
            date: parse_iso_date(date).unwrap(),
            notes: None,
        }
    }

    #[test]
    fn comparison_csv_has_expected_layout() {
        let records = vec![
            rec("1", "Rolls", 5, "2025-10-20"),
            rec("2", "Loaf", 2, "2025-10-21"),
            rec("3", "Rolls", 4, "2025-10-27"),
        ];
        let cmp = compare_weeks(
            &records,
            parse_iso_date("2025-10-20").unwrap(),
            parse_iso_date("2025-10-27").unwrap(),
        );
        let include = IncludeSections {
            waste_trends: false,
            ..Default::default()
        };
        let csv = to_csv(&comparison_export(&cmp, &include));
        let expected = "Week: Week of Oct 20 vs Week of Oct 27\n\
                        \n\
                        Category,Value\n\
                        Items,1\n\
                        Categories,1\n\
                        Waste Trends,0\n\
                        Donation Trends,1\n\
                        Expiration Risks,1\n\
                        \n\
                        Day,Value\n\
                        Week A Items,2\n\
                        Week B Items,1";
        assert_eq!(csv, expected);
    }

    #[test]
    fn filename_replaces_whitespace() {
        assert_eq!(
            export_filename("Week of Oct 20", "Week of  Oct 27", "csv"),
            "betterbites_export_Week_of_Oct_20_vs_Week_of_Oct_27.csv"
        );
    }

    #[test]
    fn records_csv_escapes_fields() {
        let mut r = rec("1", "Rolls, glazed", 5, "2025-10-20");
        r.notes = Some("say \"hi\"".to_string());
        let csv = records_to_csv([&r]);
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), RECORD_COLUMNS.join(","));
        assert_eq!(
            lines.next().unwrap(),
            "1,\"Rolls, glazed\",Bread,Completed,5,0,2025-10-20,2025-10-20,\"say \"\"hi\"\"\""
        );
    }

    #[test]
    fn fractional_values_keep_decimals() {
        assert_eq!(format_value(2.5), "2.5");
        assert_eq!(format_value(3.0), "3");
    }

    #[cfg(feature = "web")]
    #[test]
    fn xlsx_export_is_a_zip() {
        let records = vec![rec("1", "Rolls", 5, "2025-10-20")];
        let d = parse_iso_date("2025-10-20").unwrap();
        let cmp = compare_weeks(&records, d, d);
        let bytes = comparison_to_xlsx(&cmp, &IncludeSections::default()).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
