use chrono::NaiveDate;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{DonationError, Result};
use crate::record::{DonationRecord, NewDonation};
use crate::store::DonationStore;

/// Load seed records from a JSON array (the `data.json` format).
///
/// # Examples
/// ```no_run
/// use betterbites::loader::from_json;
///
/// match from_json("data/data.json") {
///     Ok(store) => println!("Loaded {} records", store.len()),
///     Err(e) => eprintln!("Error loading JSON: {}", e),
/// }
/// ```
pub fn from_json(filepath: impl AsRef<Path>) -> Result<DonationStore> {
    let mut contents = String::new();
    File::open(filepath)?.read_to_string(&mut contents)?;
    from_json_str(&contents)
}

pub fn from_json_str(contents: &str) -> Result<DonationStore> {
    let records: Vec<DonationRecord> = serde_json::from_str(contents)?;
    DonationStore::from_records(records)
}

/// Load records from a CSV file whose header row names the record fields.
///
/// Recognised columns: `id, name, category, status, quantity, calories,
/// expires, date, notes`. Column order is free and unknown columns are
/// ignored. Rows are validated like form submissions; `today` fills in a
/// missing donation date.
pub fn from_csv(filepath: impl AsRef<Path>, today: NaiveDate) -> Result<DonationStore> {
    let mut contents = String::new();
    File::open(filepath)?.read_to_string(&mut contents)?;
    from_csv_str(&contents, today)
}

/// Same as `from_csv_str` over already split lines. Lines are rejoined first
/// so a quoted field may span several of them.
pub fn from_csv_lines(lines: &[String], today: NaiveDate) -> Result<DonationStore> {
    from_csv_str(&lines.join("\n"), today)
}

pub fn from_csv_str(contents: &str, today: NaiveDate) -> Result<DonationStore> {
    let csv_records = split_csv_records(contents);
    let mut lines = csv_records.iter().filter(|l| !l.trim().is_empty());
    let header = lines
        .next()
        .ok_or_else(|| DonationError::Invalid("CSV file is empty".to_string()))?;
    let columns: Vec<String> = parse_csv_row(header)
        .into_iter()
        .map(|c| c.trim().to_lowercase())
        .collect();

    if !columns.iter().any(|c| c == "name") {
        return Err(DonationError::Invalid(
            "CSV header must contain a 'name' column".to_string(),
        ));
    }

    let mut records = Vec::new();
    for (row, line) in lines.enumerate() {
        let fields = parse_csv_row(line);
        let mut input = NewDonation::default();

        for (column, value) in columns.iter().zip(fields) {
            let value = value.trim().to_string();
            if value.is_empty() {
                continue;
            }
            match column.as_str() {
                "id" => input.id = Some(value),
                "name" => input.name = value,
                "category" => input.category = value,
                "status" => input.status = Some(value),
                "quantity" => {
                    input.quantity = Some(value.parse().map_err(|_| {
                        DonationError::Invalid(format!(
                            "row {}: quantity '{}' is not a number",
                            row + 2,
                            value
                        ))
                    })?)
                }
                "calories" => {
                    input.calories = Some(value.parse().map_err(|_| {
                        DonationError::Invalid(format!(
                            "row {}: calories '{}' is not a number",
                            row + 2,
                            value
                        ))
                    })?)
                }
                "expires" => input.expires = Some(value),
                "date" => input.date = Some(value),
                "notes" => input.notes = Some(value),
                _ => {}
            }
        }

        let record = input.validate(today).map_err(|e| {
            DonationError::Invalid(format!("row {}: {}", row + 2, e))
        })?;
        records.push(record);
    }

    DonationStore::from_records(records)
}

// Split CSV text into records. A newline inside a quoted field belongs to
// the field, so one record can cover several physical lines.
fn split_csv_records(text: &str) -> Vec<String> {
    let mut records = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in text.chars() {
        match c {
            '"' => {
                // "" inside a quoted field toggles twice and stays quoted
                in_quotes = !in_quotes;
                current.push(c);
            }
            '\n' if !in_quotes => {
                if current.ends_with('\r') {
                    current.pop();
                }
                records.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }

    if !current.is_empty() {
        records.push(current);
    }
    records
}

// Parse a CSV row into a vector of strings, honouring quoted fields
fn parse_csv_row(line: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    // Escaped quote inside a quoted field
                    current_field.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => {
                result.push(std::mem::take(&mut current_field));
            }
            _ => current_field.push(c),
        }
    }

    result.push(current_field);
    result
}

/// Detect file type and load the appropriate format.
///
/// # Examples
/// ```no_run
/// use betterbites::dates::today;
/// use betterbites::loader::load_records;
///
/// match load_records("data/data.json", today()) {
///     Ok(store) => println!("Loaded {} records", store.len()),
///     Err(e) => eprintln!("Error loading file: {}", e),
/// }
/// ```
pub fn load_records(filepath: impl AsRef<Path>, today: NaiveDate) -> Result<DonationStore> {
    let path = filepath.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    match extension.as_deref() {
        Some("json") => from_json(path),
        Some("csv") => from_csv(path, today),
        Some(ext) => Err(DonationError::Invalid(format!(
            "Unsupported file extension: {}",
            ext
        ))),
        None => Err(DonationError::Invalid("File has no extension".to_string())),
    }
}
