// Handlers for the screens' API endpoints

use axum::{
    extract::{Json as JsonExtract, Path, Query, State},
    response::{IntoResponse, Json},
};
use serde::Serialize;

use crate::{
    backend_api,
    error::{AppError, AppResult},
    listing,
    models::{
        BookingRequest, BookingSummary, FilterPredicate, PriceQuote, QuoteRequest, RateCard,
        SearchParams, SortKey, TripQuery, TripWindow, VehicleCategory, VehicleListing,
    },
    pricing, search, trip,
};

use crate::AppState;

// --- Response Wrappers ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SortOption {
    id: &'static str,
    label: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FiltersResponse {
    vehicle_type: VehicleCategory,
    filters: Vec<FilterPredicate>,
    sort_keys: Vec<SortOption>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchResult {
    vehicle: VehicleListing,
    quote: Option<PriceQuote>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    success: bool,
    count: usize,
    results: Vec<SearchResult>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VehicleDetailResponse {
    success: bool,
    vehicle: VehicleListing,
    quote: Option<PriceQuote>,
    trip_start: String,
    trip_end: String,
}

// --- Helpers ---

fn parse_category(raw: &str) -> AppResult<VehicleCategory> {
    raw.parse::<VehicleCategory>().map_err(AppError::BadRequest)
}

fn parse_sort(raw: Option<&str>) -> AppResult<Option<SortKey>> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse::<SortKey>)
        .transpose()
        .map_err(AppError::BadRequest)
}

// Quotes are only shown for windows a booking could actually use
fn quote_for(window: Option<&TripWindow>, rates: &RateCard) -> Option<PriceQuote> {
    window
        .filter(|w| w.is_valid())
        .map(|w| pricing::quote(w, rates))
}

// --- API Handlers ---

pub async fn health() -> &'static str {
    "ok"
}

pub async fn get_filters(Path(vehicle_type): Path<String>) -> AppResult<impl IntoResponse> {
    let category = parse_category(&vehicle_type)?;
    let no_active: [&str; 0] = [];
    tracing::debug!(category = %category, "API call: get_filters");

    Ok(Json(FiltersResponse {
        vehicle_type: category,
        filters: search::filter_options(category, &no_active),
        sort_keys: SortKey::ALL
            .iter()
            .map(|key| SortOption {
                id: key.id(),
                label: key.label(),
            })
            .collect(),
    }))
}

// Filter ids contain '+', so clients must send them percent-encoded (%2B).
pub async fn search_vehicles(
    State(app_state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<impl IntoResponse> {
    tracing::info!("API call: search_vehicles with params: {:?}", params);

    let category = parse_category(&params.vehicle_type)?;
    let sort_key = parse_sort(params.sort.as_deref())?;
    let window = TripWindow::from_optional_parts(
        params.start_date.as_deref(),
        params.start_time.as_deref(),
        params.end_date.as_deref(),
        params.end_time.as_deref(),
    );
    if window.is_none() && params.start_date.is_some() {
        tracing::debug!("Trip window incomplete or unparseable, searching without dates");
    }

    let raw = backend_api::fetch_vehicles(
        &app_state.http_client,
        &app_state.settings,
        category,
        params.location.as_deref(),
        window.as_ref(),
    )
    .await?;

    let listings = listing::normalize_all(&raw, category);
    let filter_ids = params.filter_ids();
    let processed = search::process(category, &listings, &filter_ids, sort_key);
    tracing::info!(
        category = %category,
        fetched = listings.len(),
        shown = processed.len(),
        filters = ?filter_ids,
        sort = ?sort_key,
        "Search processed"
    );

    let results: Vec<SearchResult> = processed
        .into_iter()
        .map(|vehicle| {
            let quote = quote_for(window.as_ref(), &vehicle.rate_card());
            SearchResult { vehicle, quote }
        })
        .collect();

    Ok(Json(SearchResponse {
        success: true,
        count: results.len(),
        results,
    }))
}

pub async fn get_vehicle(
    State(app_state): State<AppState>,
    Path(vehicle_id): Path<String>,
    Query(trip_query): Query<TripQuery>,
) -> AppResult<impl IntoResponse> {
    tracing::info!("API call: get_vehicle for id: {}", vehicle_id);

    let category = match trip_query.vehicle_type.as_deref() {
        Some(raw) => parse_category(raw)?,
        None => VehicleCategory::Car,
    };
    let raw = backend_api::fetch_vehicle_detail(&app_state.http_client, &app_state.settings, &vehicle_id).await?;
    let vehicle = listing::normalize(&raw, category);

    let window = TripWindow::from_optional_parts(
        trip_query.start_date.as_deref(),
        trip_query.start_time.as_deref(),
        trip_query.end_date.as_deref(),
        trip_query.end_time.as_deref(),
    );

    Ok(Json(VehicleDetailResponse {
        success: true,
        quote: quote_for(window.as_ref(), &vehicle.rate_card()),
        trip_start: trip::display_optional(trip_query.start_date.as_deref(), trip_query.start_time.as_deref()),
        trip_end: trip::display_optional(trip_query.end_date.as_deref(), trip_query.end_time.as_deref()),
        vehicle,
    }))
}

// Prices any window, valid or not; the screen decides what to do with it.
pub async fn quote_trip(JsonExtract(request): JsonExtract<QuoteRequest>) -> impl IntoResponse {
    let quote = pricing::quote(&request.window, &request.rates);
    tracing::debug!(label = %quote.duration_label, total = quote.total_price, "API call: quote_trip");
    Json(quote)
}

// Rates the screen displayed must still match the backend within this margin
const RATE_TOLERANCE: f64 = 0.005;

fn check_displayed_rate(displayed: Option<f64>, current: f64) -> AppResult<()> {
    let Some(displayed) = displayed else {
        return Ok(());
    };
    if !displayed.is_finite() || displayed < 0.0 {
        return Err(AppError::BadRequest("Rates must be non-negative numbers".to_string()));
    }
    if (displayed - current).abs() > RATE_TOLERANCE {
        return Err(AppError::BadRequest(
            "Vehicle price has changed, please refresh".to_string(),
        ));
    }
    Ok(())
}

// Prices the booking from the backend's current rates
pub async fn checkout(
    State(app_state): State<AppState>,
    JsonExtract(request): JsonExtract<BookingRequest>,
) -> AppResult<impl IntoResponse> {
    tracing::info!("API call: checkout for user: {}, vehicle: {}", request.user_id, request.vehicle_id);

    if request.user_id.trim().is_empty() {
        return Err(AppError::BadRequest("A user id is required to book".to_string()));
    }

    let window = TripWindow::from_parts(
        &request.start_date,
        &request.start_time,
        &request.end_date,
        &request.end_time,
    )
    .ok_or_else(|| AppError::BadRequest("Invalid trip date or time".to_string()))?;

    if !window.is_valid() {
        return Err(AppError::BadRequest(
            "Trip end must be after the trip start".to_string(),
        ));
    }

    let raw = backend_api::fetch_vehicle_detail(&app_state.http_client, &app_state.settings, &request.vehicle_id).await?;
    let rates = listing::normalize(&raw, VehicleCategory::Car).rate_card();
    check_displayed_rate(request.per_hour, rates.per_hour)?;
    check_displayed_rate(request.per_day, rates.per_day)?;

    let quote = pricing::quote(&window, &rates);

    let summary = BookingSummary {
        user_id: request.user_id,
        vehicle_id: request.vehicle_id,
        total_price: quote.total_price_string(),
        duration_label: quote.duration_label,
        start: trip::display_instant(Some(window.start)),
        end: trip::display_instant(Some(window.end)),
    };
    tracing::info!(
        user_id = %summary.user_id,
        vehicle_id = %summary.vehicle_id,
        total = %summary.total_price,
        "Checkout summary prepared"
    );
    Ok(Json(summary))
}
