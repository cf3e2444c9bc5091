/*!
# BetterBites

A food-donation tracking dashboard, built in Rust.

## Overview

Restaurants and kitchens log surplus food items, see how much was donated or
wasted, compare one week against another, book charity pickups and export
reports. The data set is small and lives in memory: records are seeded from a
JSON (or CSV) file at startup and can be snapshotted to disk.

## Architecture

### Core Layer
- **Record Model** - Donation records, statuses and form validation
- **Donation Store** - Insertion-ordered collection with date/category filters
- **Statistics Engine** - KPIs, week bucketing, per-category aggregation and
  week-over-week comparison
- **Item Analytics** - Per-item log, weekly history and the detailed table
- **Pickup Scheduler** - Charity pickups booked against logged records

### Web Layer
- **Technologies**: Rust, axum, handlebars
- Server-rendered dashboard, weekly waste and compare pages
- JSON API for every view, PNG charts rendered with plotters

### Data Persistence Layer
- JSON/CSV seed import
- Gzip compressed bincode snapshots of records and pickups
- CSV and XLSX report export

## Modules

- **record**: Donation record, status and input validation
- **dates**: ISO date helpers and week windows
- **store**: In-memory record collection
- **stats**: KPIs and week-over-week statistics
- **analytics**: Item logs, item history, detailed analytics
- **pickup**: Charity pickup scheduling
- **loader**: Seed data import
- **saving**: Snapshot persistence with compression
- **downloader**: Export functionality (CSV, XLSX)
- **graph**: Chart generation (PNG)
- **pages**: HTML page templates
- **app**: Routing and handlers
- **config**: Command-line and environment settings

## REST API Endpoints

- `GET|POST /api/records`, `GET /api/records/:id`, `GET /api/records.csv`
- `GET /api/categories`, `GET /api/weeks`
- `GET /api/weekly-summary?week=`, `GET /api/compare?weekA=&weekB=`
- `GET /api/export/csv`, `GET /api/export/xlsx`
- `GET /api/charts/weekly.png`, `/api/charts/categories.png`, `/api/charts/item.png`
- `GET /api/items/:name/log`, `GET /api/items/:name/history`, `GET /api/analytics/detailed`
- `GET|POST /api/pickups`, `DELETE /api/pickups/:id`
- `POST /api/save`, `GET /api/snapshot`, `POST /api/load`
*/

pub mod analytics;
pub mod config;
pub mod dates;
pub mod downloader;
pub mod error;
pub mod loader;
pub mod pickup;
pub mod record;
pub mod saving;
pub mod stats;
pub mod store;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod graph;
#[cfg(feature = "web")]
pub mod pages;

pub use error::{DonationError, Result};
pub use record::{DonationRecord, NewDonation, Status};
pub use store::DonationStore;
