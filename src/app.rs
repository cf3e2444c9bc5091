#![cfg(feature = "web")]
use axum::{
    Form, Json, Router,
    body::Bytes,
    extract::{
        FromRequest, FromRequestParts, Path, Query, State,
        rejection::{FormRejection, JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{delete, get, post},
};
use chrono::NaiveDate;
use handlebars::{RenderError, TemplateError};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::analytics::{self, LogSort};
use crate::config::Config;
use crate::dates::{self, to_iso};
use crate::downloader::{self, IncludeSections};
use crate::error::{DonationError, FieldErrors};
use crate::graph::{self, GraphOptions};
use crate::loader;
use crate::pages::{
    AnalyticsView, CompareView, DashboardParts, DashboardView, DonationForm, ItemView, Pages,
    WeeklyView,
};
use crate::pickup::{PickupRequest, PickupSchedule};
use crate::record::{DonationRecord, NewDonation};
use crate::saving::{self, Snapshot};
use crate::stats::{self, Kpis};
use crate::store::DonationStore;

/// Shared state behind every handler. Locks are always taken store first,
/// then pickups.
pub struct AppState {
    store: Mutex<DonationStore>,
    pickups: Mutex<PickupSchedule>,
    pages: Pages,
    config: Config,
}

impl AppState {
    pub fn new(store: DonationStore, config: Config) -> Result<Self, TemplateError> {
        Ok(Self {
            store: Mutex::new(store),
            pickups: Mutex::new(PickupSchedule::new()),
            pages: Pages::new()?,
            config,
        })
    }

    fn store(&self) -> MutexGuard<'_, DonationStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pickups(&self) -> MutexGuard<'_, PickupSchedule> {
        self.pickups.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// JSON error body: `{ "status": "error", "message": ..., "errors": {...} }`.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    errors: Option<FieldErrors>,
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<FieldErrors>,
}

impl AppError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            errors: None,
        }
    }
}

impl From<DonationError> for AppError {
    fn from(err: DonationError) -> Self {
        let status = match &err {
            DonationError::Validation(_) | DonationError::Invalid(_) | DonationError::BadDate(_) => {
                StatusCode::BAD_REQUEST
            }
            DonationError::NotFound(_) => StatusCode::NOT_FOUND,
            DonationError::Conflict(_) => StatusCode::CONFLICT,
            DonationError::Io(_) | DonationError::Json(_) | DonationError::Snapshot(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let errors = match &err {
            DonationError::Validation(fields) => Some(fields.clone()),
            _ => None,
        };
        Self {
            status,
            message: err.to_string(),
            errors,
        }
    }
}

impl From<RenderError> for AppError {
    fn from(err: RenderError) -> Self {
        AppError::new(StatusCode::INTERNAL_SERVER_ERROR, format!("template error: {}", err))
    }
}

impl From<Box<dyn std::error::Error>> for AppError {
    fn from(err: Box<dyn std::error::Error>) -> Self {
        AppError::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
}

impl AppError {
    /// Extractor failures are the caller's fault. Anything axum reports as a
    /// client error becomes a 400, except an unsupported content type.
    fn rejected(status: StatusCode, message: String) -> Self {
        let status = if status.is_client_error() && status != StatusCode::UNSUPPORTED_MEDIA_TYPE {
            StatusCode::BAD_REQUEST
        } else {
            status
        };
        AppError::new(status, message)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::rejected(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::rejected(rejection.status(), rejection.body_text())
    }
}

impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        AppError::rejected(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::rejected(rejection.status(), rejection.body_text())
    }
}

/// `Json` body whose rejection is reported as an `AppError`.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
struct ApiJson<T>(T);

#[derive(FromRequest)]
#[from_request(via(Form), rejection(AppError))]
struct ApiForm<T>(T);

#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(AppError))]
struct ApiQuery<T>(T);

#[derive(FromRequestParts)]
#[from_request(via(Path), rejection(AppError))]
struct ApiPath<T>(T);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("{}", self.message);
        }
        let body = ErrorBody {
            status: "error",
            message: self.message,
            errors: self.errors,
        };
        (self.status, Json(body)).into_response()
    }
}

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    message: Option<String>,
}

impl StatusResponse {
    fn ok(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            status: "ok".to_string(),
            message: Some(message.into()),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct RecordQuery {
    date: Option<String>,
    category: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WeekQuery {
    week: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompareQuery {
    #[serde(rename = "weekA")]
    week_a: Option<String>,
    #[serde(rename = "weekB")]
    week_b: Option<String>,
}

/// Export options. Flags left out count as included unless the request
/// came from the HTML form, where an unchecked box is simply absent.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExportQuery {
    week_a: Option<String>,
    week_b: Option<String>,
    items: Option<bool>,
    categories: Option<bool>,
    waste_trends: Option<bool>,
    donation_trends: Option<bool>,
    expiration_risks: Option<bool>,
    form: Option<bool>,
}

impl ExportQuery {
    fn include(&self) -> IncludeSections {
        let fallback = !self.form.unwrap_or(false);
        IncludeSections {
            items: self.items.unwrap_or(fallback),
            categories: self.categories.unwrap_or(fallback),
            waste_trends: self.waste_trends.unwrap_or(fallback),
            donation_trends: self.donation_trends.unwrap_or(fallback),
            expiration_risks: self.expiration_risks.unwrap_or(fallback),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ItemQuery {
    date: Option<String>,
    sort: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ItemChartQuery {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PickupQuery {
    upcoming: Option<bool>,
}

#[derive(Serialize)]
struct RecordsResponse<'a> {
    kpis: Kpis,
    records: Vec<&'a DonationRecord>,
}

#[derive(Serialize)]
struct WeekOption {
    key: String,
    label: String,
}

fn non_empty(param: Option<&str>) -> Option<&str> {
    param.map(str::trim).filter(|s| !s.is_empty())
}

/// `None`/empty falls back to `default`, `all` disables the date filter.
fn date_filter(
    param: Option<&str>,
    default: Option<NaiveDate>,
) -> Result<Option<NaiveDate>, DonationError> {
    match non_empty(param) {
        None => Ok(default),
        Some(s) if s.eq_ignore_ascii_case("all") => Ok(None),
        Some(s) => dates::parse_iso_date(s).map(Some),
    }
}

fn default_week(store: &DonationStore) -> NaiveDate {
    store.default_week(dates::today())
}

fn parse_week(param: Option<&str>, fallback: NaiveDate) -> Result<NaiveDate, DonationError> {
    match non_empty(param) {
        Some(s) => dates::parse_iso_date(s),
        None => Ok(fallback),
    }
}

/// Week B defaults to the current week and week A to the week before it.
fn resolve_weeks(
    store: &DonationStore,
    week_a: Option<&str>,
    week_b: Option<&str>,
) -> Result<(NaiveDate, NaiveDate), DonationError> {
    let week_b = parse_week(week_b, default_week(store))?;
    let week_a = parse_week(week_a, dates::iso_add_days(week_b, -7))?;
    Ok((week_a, week_b))
}

fn attachment(content_type: &str, filename: &str, body: impl IntoResponse) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response()
}

fn png(bytes: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, "image/png")], bytes).into_response()
}

fn require_item(store: &DonationStore, name: &str) -> Result<(), DonationError> {
    if store.items_named(name).is_empty() {
        return Err(DonationError::NotFound(format!("item '{}'", name.trim())));
    }
    Ok(())
}

/// Build the router over an existing state. Used by `run` and the tests.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(dashboard_page))
        .route("/records", post(submit_record_form))
        .route("/weekly-waste", get(weekly_page))
        .route("/weekly-waste/compare", get(compare_page))
        .route("/items/:name", get(item_page))
        .route("/analytics", get(analytics_page))
        .route("/api/records", get(list_records).post(create_record))
        .route("/api/records.csv", get(records_csv))
        .route("/api/records/:id", get(get_record))
        .route("/api/categories", get(list_categories))
        .route("/api/weeks", get(list_weeks))
        .route("/api/weekly-summary", get(weekly_summary))
        .route("/api/compare", get(compare))
        .route("/api/export/csv", get(export_csv))
        .route("/api/export/xlsx", get(export_xlsx))
        .route("/api/charts/weekly.png", get(weekly_chart))
        .route("/api/charts/categories.png", get(category_chart))
        .route("/api/charts/item.png", get(item_chart))
        .route("/api/items", get(list_items))
        .route("/api/items/:name/log", get(item_log))
        .route("/api/items/:name/history", get(item_history))
        .route("/api/analytics/detailed", get(detailed_analytics))
        .route("/api/pickups", get(list_pickups).post(schedule_pickup))
        .route("/api/pickups/:id", delete(cancel_pickup))
        .route("/api/save", post(save_snapshot))
        .route("/api/snapshot", get(download_snapshot))
        .route("/api/load", post(load_snapshot))
        .nest_service("/static", ServeDir::new("static"))
        .fallback(not_found)
        .with_state(state)
}

/// Load the seed data and serve the dashboard until the process exits.
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let store = match loader::load_records(&config.data_path, dates::today()) {
        Ok(store) => {
            info!(
                "loaded {} records from {}",
                store.len(),
                config.data_path.display()
            );
            store
        }
        Err(e) => {
            warn!(
                "could not load {}: {}; starting with no records",
                config.data_path.display(),
                e
            );
            DonationStore::new()
        }
    };

    let addr = config.addr.clone();
    let app_state = Arc::new(AppState::new(store, config)?);
    let app = router(app_state);

    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn not_found() -> AppError {
    AppError::new(StatusCode::NOT_FOUND, "no such page")
}

fn render_dashboard(
    state: &AppState,
    query: &RecordQuery,
    form: DonationForm,
    errors: FieldErrors,
) -> Result<String, AppError> {
    let today = dates::today();
    let store = state.store();
    let pickups = state.pickups();

    let date = date_filter(query.date.as_deref(), Some(store.default_date(today)))?;
    let view = DashboardView::new(DashboardParts {
        dates: store.week_options(),
        categories: store.categories(),
        date,
        category: query.category.clone(),
        rows: store.filter(date, query.category.as_deref()),
        upcoming: pickups.upcoming(today),
        form,
        errors,
    });
    Ok(state.pages.render("dashboard", &view)?)
}

async fn dashboard_page(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<RecordQuery>,
) -> Result<Html<String>, AppError> {
    render_dashboard(&state, &query, DonationForm::default(), FieldErrors::new()).map(Html)
}

async fn submit_record_form(
    State(state): State<Arc<AppState>>,
    ApiForm(form): ApiForm<DonationForm>,
) -> Result<Response, AppError> {
    let added = match form.to_new_donation(dates::today()) {
        Ok(input) => {
            let mut store = state.store();
            store.add(input, dates::today()).map(|record| record.date)
        }
        Err(errors) => Err(DonationError::Validation(errors)),
    };

    match added {
        Ok(date) => Ok(Redirect::to(&format!("/?date={}", to_iso(date))).into_response()),
        Err(DonationError::Validation(errors)) => {
            let html = render_dashboard(&state, &RecordQuery::default(), form, errors)?;
            Ok((StatusCode::BAD_REQUEST, Html(html)).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

async fn weekly_page(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<WeekQuery>,
) -> Result<Html<String>, AppError> {
    let store = state.store();
    let pickups = state.pickups();

    let week = parse_week(query.week.as_deref(), default_week(&store))?;
    let (start, end) = dates::week_range(week);
    let summary = stats::weekly_summary(store.records(), &pickups.dates(), week);
    let view = WeeklyView::new(
        &store.week_options(),
        summary,
        stats::category_quantities(store.records(), week),
        pickups.scheduled_between(start, end),
    );
    Ok(Html(state.pages.render("weekly", &view)?))
}

async fn compare_page(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<CompareQuery>,
) -> Result<Html<String>, AppError> {
    let store = state.store();
    let (week_a, week_b) = resolve_weeks(&store, query.week_a.as_deref(), query.week_b.as_deref())?;
    let comparison = stats::compare_weeks(store.records(), week_a, week_b);
    let view = CompareView::new(&store.week_options(), &comparison);
    Ok(Html(state.pages.render("compare", &view)?))
}

async fn item_page(
    State(state): State<Arc<AppState>>,
    ApiPath(name): ApiPath<String>,
    ApiQuery(query): ApiQuery<ItemQuery>,
) -> Result<Html<String>, AppError> {
    let store = state.store();
    require_item(&store, &name)?;

    let date = date_filter(query.date.as_deref(), None)?;
    let sort = parse_sort(query.sort.as_deref())?;
    let log = analytics::item_log(&store, &name, date, sort, dates::today());
    Ok(Html(state.pages.render("item", &ItemView::new(log, date, sort))?))
}

async fn analytics_page(State(state): State<Arc<AppState>>) -> Result<Html<String>, AppError> {
    let view = AnalyticsView {
        title: "Analytics",
        rows: analytics::detailed_rows(&state.store()),
    };
    Ok(Html(state.pages.render("analytics", &view)?))
}

async fn list_records(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<RecordQuery>,
) -> Result<Response, AppError> {
    let store = state.store();
    let date = date_filter(query.date.as_deref(), None)?;
    let records = store.filter(date, query.category.as_deref());
    Ok(Json(RecordsResponse {
        kpis: Kpis::from_records(records.iter().copied()),
        records,
    })
    .into_response())
}

async fn create_record(
    State(state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<NewDonation>,
) -> Result<Response, AppError> {
    let mut store = state.store();
    let record = store.add(input, dates::today())?;
    Ok((StatusCode::CREATED, Json(record)).into_response())
}

async fn get_record(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<DonationRecord>, AppError> {
    let store = state.store();
    let record = store
        .get(&id)
        .cloned()
        .ok_or_else(|| DonationError::NotFound(format!("record '{}'", id)))?;
    Ok(Json(record))
}

async fn records_csv(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<RecordQuery>,
) -> Result<Response, AppError> {
    let store = state.store();
    let date = date_filter(query.date.as_deref(), None)?;
    let csv = downloader::records_to_csv(store.filter(date, query.category.as_deref()));
    Ok(attachment("text/csv; charset=utf-8", "betterbites_records.csv", csv))
}

async fn list_categories(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.store().categories())
}

async fn list_weeks(State(state): State<Arc<AppState>>) -> Json<Vec<WeekOption>> {
    let weeks = state
        .store()
        .week_options()
        .into_iter()
        .map(|d| WeekOption {
            key: to_iso(d),
            label: dates::format_week_label(d),
        })
        .collect();
    Json(weeks)
}

async fn weekly_summary(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<WeekQuery>,
) -> Result<Json<stats::WeeklySummary>, AppError> {
    let store = state.store();
    let pickups = state.pickups();
    let week = parse_week(query.week.as_deref(), default_week(&store))?;
    Ok(Json(stats::weekly_summary(
        store.records(),
        &pickups.dates(),
        week,
    )))
}

async fn compare(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<CompareQuery>,
) -> Result<Json<stats::WeekComparison>, AppError> {
    let store = state.store();
    let (week_a, week_b) = resolve_weeks(&store, query.week_a.as_deref(), query.week_b.as_deref())?;
    Ok(Json(stats::compare_weeks(store.records(), week_a, week_b)))
}

async fn export_csv(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ExportQuery>,
) -> Result<Response, AppError> {
    let store = state.store();
    let (week_a, week_b) = resolve_weeks(&store, query.week_a.as_deref(), query.week_b.as_deref())?;
    let comparison = stats::compare_weeks(store.records(), week_a, week_b);

    let data = downloader::comparison_export(&comparison, &query.include());
    let filename = downloader::export_filename(
        &comparison.week_a.label,
        &comparison.week_b.label,
        "csv",
    );
    Ok(attachment(
        "text/csv; charset=utf-8",
        &filename,
        downloader::to_csv(&data),
    ))
}

async fn export_xlsx(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ExportQuery>,
) -> Result<Response, AppError> {
    let store = state.store();
    let (week_a, week_b) = resolve_weeks(&store, query.week_a.as_deref(), query.week_b.as_deref())?;
    let comparison = stats::compare_weeks(store.records(), week_a, week_b);

    let workbook = downloader::comparison_to_xlsx(&comparison, &query.include())?;
    let filename = downloader::export_filename(
        &comparison.week_a.label,
        &comparison.week_b.label,
        "xlsx",
    );
    Ok(attachment(
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        &filename,
        workbook,
    ))
}

async fn weekly_chart(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<WeekQuery>,
) -> Result<Response, AppError> {
    let store = state.store();
    let week = parse_week(query.week.as_deref(), default_week(&store))?;
    let series = stats::weekly_quantity_series(store.records(), week);
    let options = GraphOptions {
        title: format!("Quantity per day, {}", dates::format_week_label(week)),
        x_label: "Day".to_string(),
        ..Default::default()
    };
    Ok(png(graph::weekly_quantity_chart(&series, &options)?))
}

async fn category_chart(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<WeekQuery>,
) -> Result<Response, AppError> {
    let store = state.store();
    let week = parse_week(query.week.as_deref(), default_week(&store))?;
    let categories = stats::category_quantities(store.records(), week);
    let options = GraphOptions {
        title: format!("Quantity per category, {}", dates::format_week_label(week)),
        x_label: "Category".to_string(),
        ..Default::default()
    };
    Ok(png(graph::category_chart(&categories, &options)?))
}

async fn item_chart(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ItemChartQuery>,
) -> Result<Response, AppError> {
    let name = non_empty(query.name.as_deref())
        .ok_or_else(|| DonationError::field("name", "An item name is required"))?;
    let store = state.store();
    require_item(&store, name)?;

    let points = analytics::item_weekly_history(&store, name);
    let options = GraphOptions {
        title: format!("{} by week", name),
        x_label: "Week".to_string(),
        ..Default::default()
    };
    Ok(png(graph::item_timeline_chart(&points, &options)?))
}

async fn list_items(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.store().item_names())
}

fn parse_sort(param: Option<&str>) -> Result<LogSort, DonationError> {
    match non_empty(param) {
        None => Ok(LogSort::default()),
        Some(s) => LogSort::parse(s)
            .ok_or_else(|| DonationError::field("sort", format!("Unknown sort '{}'", s))),
    }
}

async fn item_log(
    State(state): State<Arc<AppState>>,
    ApiPath(name): ApiPath<String>,
    ApiQuery(query): ApiQuery<ItemQuery>,
) -> Result<Json<analytics::ItemLog>, AppError> {
    let store = state.store();
    require_item(&store, &name)?;

    let date = date_filter(query.date.as_deref(), None)?;
    let sort = parse_sort(query.sort.as_deref())?;
    Ok(Json(analytics::item_log(
        &store,
        &name,
        date,
        sort,
        dates::today(),
    )))
}

async fn item_history(
    State(state): State<Arc<AppState>>,
    ApiPath(name): ApiPath<String>,
) -> Result<Json<Vec<analytics::WeeklyPoint>>, AppError> {
    let store = state.store();
    require_item(&store, &name)?;
    Ok(Json(analytics::item_weekly_history(&store, &name)))
}

async fn detailed_analytics(
    State(state): State<Arc<AppState>>,
) -> Json<Vec<analytics::DetailedRow>> {
    Json(analytics::detailed_rows(&state.store()))
}

async fn list_pickups(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<PickupQuery>,
) -> Response {
    let pickups = state.pickups();
    if query.upcoming.unwrap_or(false) {
        Json(pickups.upcoming(dates::today())).into_response()
    } else {
        Json(pickups.list()).into_response()
    }
}

async fn schedule_pickup(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<PickupRequest>,
) -> Result<Response, AppError> {
    let store = state.store();
    let mut pickups = state.pickups();
    let pickup = pickups.schedule(request, &store, dates::today())?;
    Ok((StatusCode::CREATED, Json(pickup)).into_response())
}

async fn cancel_pickup(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<crate::pickup::Pickup>, AppError> {
    let pickup = state.pickups().cancel(&id)?;
    Ok(Json(pickup))
}

fn current_snapshot(state: &AppState) -> Snapshot {
    Snapshot {
        store: state.store().clone(),
        pickups: state.pickups().clone(),
    }
}

async fn save_snapshot(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, AppError> {
    let path = &state.config.snapshot_path;
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(DonationError::from)?;
    }

    saving::save_snapshot(&current_snapshot(&state), path)?;
    info!("saved snapshot to {}", path.display());
    Ok(StatusResponse::ok(path.display().to_string()))
}

async fn download_snapshot(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let bytes = saving::snapshot_to_bytes(&current_snapshot(&state))?;
    Ok(attachment("application/gzip", "betterbites.bin.gz", bytes))
}

/// Restore from the request body when one is sent, otherwise from the
/// configured snapshot file.
async fn load_snapshot(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<StatusResponse>, AppError> {
    let snapshot = if body.is_empty() {
        let path = &state.config.snapshot_path;
        if !path.exists() {
            return Err(DonationError::NotFound(format!("snapshot '{}'", path.display())).into());
        }
        saving::load_snapshot(path)?
    } else {
        saving::snapshot_from_bytes(&body).map_err(|e| {
            DonationError::Invalid(format!("Failed to load snapshot: {}", e))
        })?
    };

    let message = format!(
        "Loaded {} records and {} pickups",
        snapshot.store.len(),
        snapshot.pickups.len()
    );
    let mut store = state.store();
    let mut pickups = state.pickups();
    *store = snapshot.store;
    *pickups = snapshot.pickups;
    info!("{}", message);
    Ok(StatusResponse::ok(message))
}
