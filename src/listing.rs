// Turns loosely typed backend records into strict VehicleListing values.
// Every numeric field may arrive as a JSON number, a string, or not at all;
// anything unparseable becomes 0 so the search processor never sees bad data.

use serde_json::Value;

use crate::models::{RawVehicleRecord, VehicleCategory, VehicleListing};

const DEFAULT_TRANSMISSION: &str = "Manual";
const MAX_RATING: f64 = 5.0;

pub fn normalize(raw: &RawVehicleRecord, fallback: VehicleCategory) -> VehicleListing {
    let vehicle_type = lenient_text(&raw.vehicle_type)
        .parse::<VehicleCategory>()
        .unwrap_or(fallback);

    let seating_capacity = raw
        .seating_capacity
        .as_ref()
        .map(lenient_f64)
        .filter(|seats| *seats >= 1.0)
        .map(|seats| seats as u32)
        .unwrap_or_else(|| vehicle_type.default_seating());

    let mut transmission = lenient_text(&raw.transmission);
    if transmission.is_empty() {
        transmission = DEFAULT_TRANSMISSION.to_string();
    }

    VehicleListing {
        id: lenient_text(&raw.id),
        brand: lenient_text(&raw.brand),
        model: lenient_text(&raw.model),
        year: raw.year.as_ref().map(lenient_f64).unwrap_or(0.0) as i32,
        vehicle_type,
        fuel_type: lenient_text(&raw.fuel_type),
        transmission,
        seating_capacity,
        rating: raw
            .rating
            .as_ref()
            .map(lenient_f64)
            .unwrap_or(0.0)
            .clamp(0.0, MAX_RATING),
        hourly_price: raw.price_per_hour.as_ref().map(lenient_f64).unwrap_or(0.0),
        daily_price: raw.price_per_day.as_ref().map(lenient_f64).unwrap_or(0.0),
        distance_label: first_text(&raw.distance, &raw.distance_label),
        image_url: first_text(&raw.image_url, &raw.image),
        features: raw.features.as_ref().map(feature_list).unwrap_or_default(),
    }
}

pub fn normalize_all(raw: &[RawVehicleRecord], fallback: VehicleCategory) -> Vec<VehicleListing> {
    raw.iter().map(|record| normalize(record, fallback)).collect()
}

/// Reads a number out of a JSON number or a numeric string. Anything else,
/// including NaN and infinities, is 0.
pub fn lenient_f64(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite()).unwrap_or(0.0)
}

/// Leading number of a label such as "2.5 km away". Unparseable labels are 0.
pub fn parse_distance(label: &str) -> f64 {
    let numeric: String = label
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    numeric
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

/// Text out of any scalar: strings are trimmed, numbers and booleans are
/// printed. Missing, null, arrays and objects give an empty string.
pub fn lenient_text(field: &Option<Value>) -> String {
    match field {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

// Preferred field first, then the legacy name
fn first_text(preferred: &Option<Value>, legacy: &Option<Value>) -> String {
    let text = lenient_text(preferred);
    if text.is_empty() { lenient_text(legacy) } else { text }
}

// Arrays of strings, or a single comma-separated string
fn feature_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => s
            .split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> RawVehicleRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn parses_string_numerics() {
        let listing = normalize(
            &record(json!({
                "id": 12,
                "brand": "Royal Enfield",
                "model": "Classic 350",
                "year": "2021",
                "vehicle_type": "bike",
                "fuel_type": "Petrol",
                "rating": 4.6,
                "price_per_hour": "120.50",
                "price_per_day": "900",
                "distance": "3.2 km away",
                "image": "https://cdn.example.com/re.png",
                "features": ["Cruiser", "ABS"]
            })),
            VehicleCategory::Car,
        );
        assert_eq!(listing.id, "12");
        assert_eq!(listing.year, 2021);
        assert_eq!(listing.vehicle_type, VehicleCategory::Bike);
        assert_eq!(listing.hourly_price, 120.5);
        assert_eq!(listing.daily_price, 900.0);
        assert_eq!(listing.image_url, "https://cdn.example.com/re.png");
        assert_eq!(listing.features, vec!["Cruiser", "ABS"]);
        assert_eq!(listing.rate_card().per_day, 900.0);
    }

    #[test]
    fn fills_defaults_for_missing_fields() {
        let bike = normalize(&record(json!({ "id": "b1" })), VehicleCategory::Bike);
        assert_eq!(bike.transmission, "Manual");
        assert_eq!(bike.seating_capacity, 2);
        assert_eq!(bike.hourly_price, 0.0);
        assert_eq!(bike.year, 0);
        assert!(bike.features.is_empty());

        let car = normalize(&record(json!({ "transmission": "  " })), VehicleCategory::Car);
        assert_eq!(car.transmission, "Manual");
        assert_eq!(car.seating_capacity, 4);
        assert_eq!(car.id, "");
    }

    #[test]
    fn garbage_numerics_become_zero() {
        let listing = normalize(
            &record(json!({
                "year": "unknown",
                "rating": "n/a",
                "price_per_hour": { "amount": 5 },
                "price_per_day": "",
                "seating_capacity": "lots"
            })),
            VehicleCategory::Cycle,
        );
        assert_eq!(listing.year, 0);
        assert_eq!(listing.rating, 0.0);
        assert_eq!(listing.hourly_price, 0.0);
        assert_eq!(listing.daily_price, 0.0);
        assert_eq!(listing.seating_capacity, 2);
    }

    #[test]
    fn rating_is_clamped() {
        let high = normalize(&record(json!({ "rating": 7 })), VehicleCategory::Car);
        let low = normalize(&record(json!({ "rating": "-2" })), VehicleCategory::Car);
        assert_eq!(high.rating, 5.0);
        assert_eq!(low.rating, 0.0);
    }

    #[test]
    fn unknown_vehicle_type_falls_back() {
        let listing = normalize(&record(json!({ "vehicle_type": "hovercraft" })), VehicleCategory::Cycle);
        assert_eq!(listing.vehicle_type, VehicleCategory::Cycle);
    }

    #[test]
    fn features_from_comma_string() {
        let listing = normalize(&record(json!({ "features": "Gears, Disc brakes,," })), VehicleCategory::Cycle);
        assert_eq!(listing.features, vec!["Gears", "Disc brakes"]);
    }

    #[test]
    fn non_string_text_fields_are_coerced() {
        let listing = normalize(
            &record(json!({
                "id": 4,
                "brand": "BMW",
                "model": 3,
                "vehicle_type": ["car"],
                "fuel_type": null,
                "transmission": { "kind": "auto" }
            })),
            VehicleCategory::Car,
        );
        assert_eq!(listing.model, "3");
        assert_eq!(listing.brand, "BMW");
        assert_eq!(listing.vehicle_type, VehicleCategory::Car);
        assert_eq!(listing.fuel_type, "");
        assert_eq!(listing.transmission, "Manual");
    }

    #[test]
    fn legacy_and_current_field_names_together() {
        let listing = normalize(
            &record(json!({
                "distance": "",
                "distance_label": "4 km away",
                "image": "https://cdn.example.com/old.png",
                "image_url": "https://cdn.example.com/new.png"
            })),
            VehicleCategory::Bike,
        );
        assert_eq!(listing.distance_label, "4 km away");
        assert_eq!(listing.image_url, "https://cdn.example.com/new.png");
    }

    #[test]
    fn lenient_numbers() {
        assert_eq!(lenient_f64(&json!("1,250")), 1250.0);
        assert_eq!(lenient_f64(&json!(" 42 ")), 42.0);
        assert_eq!(lenient_f64(&json!("NaN")), 0.0);
        assert_eq!(lenient_f64(&json!(null)), 0.0);
        assert_eq!(lenient_f64(&json!(true)), 0.0);
    }

    #[test]
    fn distance_labels() {
        assert_eq!(parse_distance("2.5 km away"), 2.5);
        assert_eq!(parse_distance("12km"), 12.0);
        assert_eq!(parse_distance("far"), 0.0);
        assert_eq!(parse_distance(""), 0.0);
    }

    #[test]
    fn keeps_batch_order() {
        let raw = vec![
            record(json!({ "id": "a" })),
            record(json!({ "id": "b" })),
            record(json!({ "id": "c" })),
        ];
        let ids: Vec<_> = normalize_all(&raw, VehicleCategory::Car)
            .into_iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
