// Data structures shared by the pricing engine, the search processor and the API
// e.g. TripWindow, VehicleListing, SearchParams

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fmt, str::FromStr};

// --- Pricing ---

/// User-selected rental period. Not validated on construction: an end before
/// the start still prices deterministically, see `TripWindow::is_valid`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TripWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TripWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        TripWindow { start, end }
    }

    pub fn is_valid(&self) -> bool {
        self.end > self.start
    }

    pub fn duration_hours(&self) -> f64 {
        (self.end - self.start).num_milliseconds() as f64 / 3_600_000.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateCard {
    pub per_hour: f64,
    pub per_day: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub duration_label: String,
    pub total_price: f64,
    // Billed units behind the label
    pub full_days: i64,
    pub hours: i64,
}

impl PriceQuote {
    /// Price as handed to the payment step: a whole number, no decimals.
    pub fn total_price_string(&self) -> String {
        format!("{}", self.total_price.round() as i64)
    }
}

// --- Vehicles ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleCategory {
    #[serde(alias = "scooter")]
    Bike,
    Car,
    #[serde(alias = "bicycle")]
    Cycle,
}

impl VehicleCategory {
    pub const ALL: [VehicleCategory; 3] =
        [VehicleCategory::Bike, VehicleCategory::Car, VehicleCategory::Cycle];

    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleCategory::Bike => "bike",
            VehicleCategory::Car => "car",
            VehicleCategory::Cycle => "cycle",
        }
    }

    pub fn default_seating(&self) -> u32 {
        match self {
            VehicleCategory::Car => 4,
            VehicleCategory::Bike | VehicleCategory::Cycle => 2,
        }
    }
}

impl fmt::Display for VehicleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bike" | "bikes" | "scooter" => Ok(VehicleCategory::Bike),
            "car" | "cars" => Ok(VehicleCategory::Car),
            "cycle" | "cycles" | "bicycle" => Ok(VehicleCategory::Cycle),
            other => {
                let known: Vec<&str> = VehicleCategory::ALL.iter().map(|c| c.as_str()).collect();
                Err(format!(
                    "Unknown vehicle type '{}' (expected one of: {})",
                    other,
                    known.join(", ")
                ))
            }
        }
    }
}

/// A vehicle record exactly as the rental backend sends it. Any field may be
/// missing or carry an unexpected JSON type (numbers as strings, a numeric
/// model name); see `listing::normalize`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RawVehicleRecord {
    pub id: Option<Value>,
    pub brand: Option<Value>,
    pub model: Option<Value>,
    pub year: Option<Value>,
    pub vehicle_type: Option<Value>,
    pub fuel_type: Option<Value>,
    pub transmission: Option<Value>,
    pub seating_capacity: Option<Value>,
    pub rating: Option<Value>,
    pub price_per_hour: Option<Value>,
    pub price_per_day: Option<Value>,
    // Older endpoints send distance_label / image instead; both may appear at once
    pub distance: Option<Value>,
    pub distance_label: Option<Value>,
    pub image_url: Option<Value>,
    pub image: Option<Value>,
    pub features: Option<Value>,
}

// Strict listing shape used by the search processor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleListing {
    pub id: String,
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub vehicle_type: VehicleCategory,
    pub fuel_type: String,
    pub transmission: String,
    pub seating_capacity: u32,
    pub rating: f64, // 0-5
    pub hourly_price: f64,
    pub daily_price: f64,
    pub distance_label: String,
    pub image_url: String,
    pub features: Vec<String>,
}

impl VehicleListing {
    pub fn rate_card(&self) -> RateCard {
        RateCard {
            per_hour: self.hourly_price,
            per_day: self.daily_price,
        }
    }
}

// --- Search ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterPredicate {
    pub id: String,
    pub label: String,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortKey {
    #[serde(rename = "price_asc")]
    PriceAscending,
    #[serde(rename = "price_desc")]
    PriceDescending,
    #[serde(rename = "rating")]
    RatingDescending,
    #[serde(rename = "distance")]
    DistanceAscending,
    #[serde(rename = "year")]
    YearDescending,
    #[serde(rename = "fuel_efficiency")]
    FuelEfficiency,
    #[serde(rename = "popularity")]
    Popularity,
}

impl SortKey {
    pub const ALL: [SortKey; 7] = [
        SortKey::PriceAscending,
        SortKey::PriceDescending,
        SortKey::RatingDescending,
        SortKey::DistanceAscending,
        SortKey::YearDescending,
        SortKey::FuelEfficiency,
        SortKey::Popularity,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            SortKey::PriceAscending => "price_asc",
            SortKey::PriceDescending => "price_desc",
            SortKey::RatingDescending => "rating",
            SortKey::DistanceAscending => "distance",
            SortKey::YearDescending => "year",
            SortKey::FuelEfficiency => "fuel_efficiency",
            SortKey::Popularity => "popularity",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortKey::PriceAscending => "Price: Low to High",
            SortKey::PriceDescending => "Price: High to Low",
            SortKey::RatingDescending => "Top Rated",
            SortKey::DistanceAscending => "Nearest First",
            SortKey::YearDescending => "Newest First",
            SortKey::FuelEfficiency => "Fuel Efficiency",
            SortKey::Popularity => "Popularity",
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        SortKey::ALL
            .into_iter()
            .find(|key| key.id() == wanted)
            .ok_or_else(|| format!("Unknown sort key '{}'", s))
    }
}

// Search parameters received from the search screen (query string)
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct SearchParams {
    pub vehicle_type: String,
    pub location: Option<String>,
    pub start_date: Option<String>, // YYYY-MM-DD
    pub end_date: Option<String>,
    pub start_time: Option<String>, // HH:MM[:SS]
    pub end_time: Option<String>,
    // Comma-separated predicate ids, e.g. "model2020+,rated4.5+"
    pub filters: Option<String>,
    pub sort: Option<String>,
}

impl SearchParams {
    pub fn filter_ids(&self) -> Vec<String> {
        self.filters
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()
    }
}

// Trip parameters forwarded by the detail screen
#[derive(Debug, Deserialize, Clone, Default)]
pub struct TripQuery {
    pub vehicle_type: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    #[serde(flatten)]
    pub window: TripWindow,
    #[serde(flatten)]
    pub rates: RateCard,
}

// --- Checkout ---

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    // Passed explicitly by the screen; the service keeps no session
    pub user_id: String,
    pub vehicle_id: String,
    pub start_date: String,
    pub start_time: String,
    pub end_date: String,
    pub end_time: String,
    // Rates the screen displayed; checked against the backend's current rates
    pub per_hour: Option<f64>,
    pub per_day: Option<f64>,
}

// Parameters handed to the payment step
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingSummary {
    pub user_id: String,
    pub vehicle_id: String,
    pub total_price: String,
    pub duration_label: String,
    pub start: String,
    pub end: String,
}
