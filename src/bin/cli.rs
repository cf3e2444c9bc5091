#![cfg(not(tarpaulin_include))]

use betterbites::config::Config;
use betterbites::dates::{self, format_week_label, parse_iso_date, to_iso};
use betterbites::downloader::{self, IncludeSections};
use betterbites::loader;
use betterbites::pickup::PickupSchedule;
use betterbites::record::{DonationRecord, NewDonation};
use betterbites::saving::{self, Snapshot};
use betterbites::stats::{self, Kpis};
use betterbites::store::DonationStore;
use clap::Parser;
use log::warn;
use std::fs;
use std::io::{self, Write};
use std::time::Instant;

fn print_records(rows: &[&DonationRecord]) {
    println!(
        "{:<24} {:<12} {:<10} {:>5} {:>6}  {:<10}  {:<10}",
        "Item", "Category", "Status", "Qty", "Cal", "Expires", "Date"
    );
    for r in rows {
        println!(
            "{:<24} {:<12} {:<10} {:>5} {:>6}  {:<10}  {:<10}",
            r.name,
            r.category,
            r.status,
            r.quantity,
            r.calories,
            to_iso(r.expires),
            to_iso(r.date)
        );
    }
    let kpis = Kpis::from_records(rows.iter().copied());
    println!(
        "Total items: {}  Donation rate: {}%  Avg quantity: {}",
        kpis.total_items, kpis.donation_rate, kpis.avg_quantity
    );
}

fn print_week(store: &DonationStore, pickups: &PickupSchedule, week: chrono::NaiveDate) {
    let summary = stats::weekly_summary(store.records(), &pickups.dates(), week);
    let week_stats = stats::compute_week_stats(store.records(), week);
    let series = stats::weekly_quantity_series(store.records(), week);

    println!("{}", summary.label);
    println!("  Items donated:     {}", summary.items_donated);
    println!(
        "  Top category:      {}",
        summary.top_category.as_deref().unwrap_or("-")
    );
    println!("  Pickups scheduled: {}", summary.pickups_scheduled);
    println!(
        "  Waste:             {} ({})",
        summary.waste_quantity, summary.waste_delta
    );
    println!(
        "  Completion:        {}/{} ({:.0}%)",
        week_stats.completed_items,
        week_stats.total_items,
        week_stats.completion_rate * 100.0
    );
    for (label, qty) in series.labels().iter().zip(series.qty_per_day) {
        println!("  {} {:>5}", label, qty);
    }
}

fn print_comparison(comparison: &stats::WeekComparison) {
    println!(
        "{:<14} {:>10} {:>10} {:>10} {:>10}",
        "Category", "A items", "A avg", "B items", "B avg"
    );
    let avg = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |a| format!("{:.1}", a));
    for c in &comparison.categories {
        println!(
            "{:<14} {:>10} {:>10} {:>10} {:>10}",
            c.category,
            c.week_a_items,
            avg(c.week_a_avg_qty),
            c.week_b_items,
            avg(c.week_b_avg_qty)
        );
    }
    println!(
        "{}: {} items, {:.0}% completed | {}: {} items, {:.0}% completed",
        comparison.week_a.label,
        comparison.week_a.total_items,
        comparison.week_a.completion_rate * 100.0,
        comparison.week_b.label,
        comparison.week_b.total_items,
        comparison.week_b.completion_rate * 100.0
    );
}

// add <name>,<category>,<quantity>,<expires>[,<status>[,<date>]]
fn parse_add(args: &str) -> Result<NewDonation, String> {
    let fields: Vec<&str> = args.split(',').map(str::trim).collect();
    if fields.len() < 4 || fields.len() > 6 {
        return Err(String::from("invalid command"));
    }
    let quantity = match fields[2] {
        "" => None,
        q => Some(
            q.parse()
                .map_err(|_| format!("quantity '{}' is not a whole number", q))?,
        ),
    };
    Ok(NewDonation {
        name: fields[0].to_string(),
        category: fields[1].to_string(),
        quantity,
        expires: Some(fields[3].to_string()),
        status: fields.get(4).map(|s| s.to_string()),
        date: fields.get(5).map(|s| s.to_string()),
        ..Default::default()
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let s = Instant::now(); // Start time for the entire program
    let config = Config::parse();

    let mut store = loader::load_records(&config.data_path, dates::today()).unwrap_or_else(|e| {
        warn!("could not load {}: {}", config.data_path.display(), e);
        DonationStore::new()
    });
    let mut pickups = PickupSchedule::new();

    let mut start_time = Instant::now();
    let mut elapsed_time;
    let mut status = format!("{} records", store.len());
    loop {
        elapsed_time = start_time.elapsed().as_secs_f64();
        print!("[{:.1}] ({}) > ", elapsed_time, status);
        io::stdout().flush()?;

        let mut command = String::new();
        if io::stdin().read_line(&mut command)? == 0 {
            break;
        }
        let command = command.trim();

        start_time = Instant::now();

        if command.is_empty() {
            status = String::from("invalid command");
            continue;
        }

        let (verb, args) = command.split_once(' ').unwrap_or((command, ""));
        let args = args.trim();

        match verb {
            "q" => break,
            "help" => {
                println!("Commands:");
                println!("  q: Quit");
                println!("  filter [<date>|all] [<category>]: List records and KPIs");
                println!("  add <name>,<category>,<qty>,<expires>[,<status>[,<date>]]: Log an item");
                println!("  week [<date>]: Weekly waste summary for the week starting at <date>");
                println!("  compare <weekA> <weekB>: Compare two weeks");
                println!("  export <weekA> <weekB> <file.csv>: Write the comparison export");
                println!("  pickups: List upcoming pickups");
                println!("  save [<file>]: Save a snapshot");
                println!("  load [<file>]: Restore a snapshot");
                status = String::from("ok");
            }
            "filter" => {
                let mut parts = args.splitn(2, ' ');
                let date = match parts.next().filter(|s| !s.is_empty()) {
                    None => Some(store.default_date(dates::today())),
                    Some("all") => None,
                    Some(d) => match parse_iso_date(d) {
                        Ok(d) => Some(d),
                        Err(_) => {
                            status = String::from("invalid date");
                            continue;
                        }
                    },
                };
                let rows = store.filter(date, parts.next().map(str::trim));
                print_records(&rows);
                status = format!("{} rows", rows.len());
            }
            "add" => match parse_add(args) {
                Err(e) => status = e,
                Ok(input) => match store.add(input, dates::today()) {
                    Ok(record) => status = format!("added {}", record.id),
                    Err(e) => status = e.to_string(),
                },
            },
            "week" => {
                let week = if args.is_empty() {
                    Ok(store.default_week(dates::today()))
                } else {
                    parse_iso_date(args)
                };
                match week {
                    Ok(week) => {
                        print_week(&store, &pickups, week);
                        status = String::from("ok");
                    }
                    Err(_) => status = String::from("invalid date"),
                }
            }
            "compare" | "export" => {
                let parts: Vec<&str> = args.split_whitespace().collect();
                let needed = if verb == "compare" { 2 } else { 3 };
                if parts.len() != needed {
                    status = String::from("invalid command");
                    continue;
                }
                let (Ok(a), Ok(b)) = (parse_iso_date(parts[0]), parse_iso_date(parts[1])) else {
                    status = String::from("invalid date");
                    continue;
                };
                let comparison = stats::compare_weeks(store.records(), a, b);
                if verb == "compare" {
                    print_comparison(&comparison);
                    status = String::from("ok");
                } else {
                    let data =
                        downloader::comparison_export(&comparison, &IncludeSections::default());
                    match fs::write(parts[2], downloader::to_csv(&data)) {
                        Ok(()) => status = format!("wrote {}", parts[2]),
                        Err(e) => status = e.to_string(),
                    }
                }
            }
            "pickups" => {
                let upcoming = pickups.upcoming(dates::today());
                for p in &upcoming {
                    println!(
                        "{}  {:<9}  {:<24} {} item(s)  ({})",
                        to_iso(p.date),
                        format!("{:?}", p.window),
                        p.charity,
                        p.record_ids.len(),
                        format_week_label(dates::monday_of(p.date))
                    );
                }
                status = format!("{} upcoming", upcoming.len());
            }
            "save" => {
                let path = if args.is_empty() {
                    config.snapshot_path.clone()
                } else {
                    args.into()
                };
                let snapshot = Snapshot {
                    store: store.clone(),
                    pickups: pickups.clone(),
                };
                match saving::save_snapshot(&snapshot, &path) {
                    Ok(()) => status = String::from("ok"),
                    Err(e) => status = e.to_string(),
                }
            }
            "load" => {
                let path = if args.is_empty() {
                    config.snapshot_path.clone()
                } else {
                    args.into()
                };
                match saving::load_snapshot(&path) {
                    Ok(snapshot) => {
                        store = snapshot.store;
                        pickups = snapshot.pickups;
                        status = format!("{} records", store.len());
                    }
                    Err(e) => status = e.to_string(),
                }
            }
            _ => status = String::from("invalid command"),
        }
    }

    let e = s.elapsed().as_secs_f64(); // Calculate total elapsed time
    println!("Total elapsed time: {:.1} seconds", e);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_reports_unparsable_quantity() {
        let err = parse_add("Rolls,Bread,abc,2025-10-30").unwrap_err();
        assert_eq!(err, "quantity 'abc' is not a whole number");

        let input = parse_add("Rolls,Bread,12,2025-10-30,Completed").unwrap();
        assert_eq!(input.quantity, Some(12));
        assert_eq!(input.status.as_deref(), Some("Completed"));

        assert!(parse_add("Rolls,Bread").is_err());
    }
}
