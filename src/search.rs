// Client-facing filter and sort engine for search results.
//
// Each vehicle category owns a static table of named predicates. Active
// predicates combine with logical AND; exactly one optional sort key orders
// the survivors. Both steps are stable, so with no sort key the backend's
// order is kept.

use once_cell::sync::Lazy;
use std::{cmp::Ordering, collections::HashMap};

use crate::{
    listing::parse_distance,
    models::{FilterPredicate, SortKey, VehicleCategory, VehicleListing},
};

const CAR_LUXURY_HOURLY: f64 = 500.0;
const BIKE_PREMIUM_HOURLY: f64 = 200.0;
const CYCLE_PREMIUM_HOURLY: f64 = 50.0;

pub struct PredicateDef {
    pub id: &'static str,
    pub label: &'static str,
    pub test: fn(&VehicleListing) -> bool,
}

impl PredicateDef {
    fn new(id: &'static str, label: &'static str, test: fn(&VehicleListing) -> bool) -> Self {
        PredicateDef { id, label, test }
    }
}

static REGISTRY: Lazy<HashMap<VehicleCategory, Vec<PredicateDef>>> = Lazy::new(|| {
    let mut registry = HashMap::new();
    registry.insert(
        VehicleCategory::Car,
        vec![
            PredicateDef::new("model2020+", "2020 & newer", |l| l.year >= 2020),
            PredicateDef::new("rated4.5+", "Rated 4.5+", |l| l.rating >= 4.5),
            PredicateDef::new("petrol", "Petrol", |l| fuel_is(l, "petrol")),
            PredicateDef::new("diesel", "Diesel", |l| fuel_is(l, "diesel")),
            PredicateDef::new("electric", "Electric", |l| fuel_is(l, "electric")),
            PredicateDef::new("automatic", "Automatic", |l| {
                l.transmission.eq_ignore_ascii_case("automatic")
            }),
            PredicateDef::new("family", "6+ seats", |l| l.seating_capacity >= 6),
            PredicateDef::new("luxury", "Luxury", |l| l.hourly_price >= CAR_LUXURY_HOURLY),
        ],
    );
    registry.insert(
        VehicleCategory::Bike,
        vec![
            PredicateDef::new("model2020+", "2020 & newer", |l| l.year >= 2020),
            PredicateDef::new("rated4.5+", "Rated 4.5+", |l| l.rating >= 4.5),
            PredicateDef::new("sport", "Sport", |l| has_feature(l, "sport")),
            PredicateDef::new("cruiser", "Cruiser", |l| has_feature(l, "cruiser")),
            PredicateDef::new("scooter", "Scooter", |l| has_feature(l, "scooter")),
            PredicateDef::new("petrol", "Petrol", |l| fuel_is(l, "petrol")),
            PredicateDef::new("electric", "Electric", |l| fuel_is(l, "electric")),
            PredicateDef::new("premium", "Premium", |l| l.hourly_price >= BIKE_PREMIUM_HOURLY),
        ],
    );
    registry.insert(
        VehicleCategory::Cycle,
        vec![
            PredicateDef::new("model2020+", "2020 & newer", |l| l.year >= 2020),
            PredicateDef::new("rated4.5+", "Rated 4.5+", |l| l.rating >= 4.5),
            PredicateDef::new("mountain", "Mountain", |l| has_feature(l, "mountain")),
            PredicateDef::new("road", "Road", |l| has_feature(l, "road")),
            PredicateDef::new("geared", "Geared", |l| has_feature(l, "gear")),
            PredicateDef::new("electric", "Electric", |l| fuel_is(l, "electric")),
            PredicateDef::new("premium", "Premium", |l| l.hourly_price >= CYCLE_PREMIUM_HOURLY),
        ],
    );
    registry
});

pub fn predicates_for(category: VehicleCategory) -> &'static [PredicateDef] {
    REGISTRY
        .get(&category)
        .map(|defs| defs.as_slice())
        .unwrap_or(&[])
}

/// Predicate list for a filter panel, with the active ones flagged.
pub fn filter_options<S: AsRef<str>>(category: VehicleCategory, active: &[S]) -> Vec<FilterPredicate> {
    predicates_for(category)
        .iter()
        .map(|def| FilterPredicate {
            id: def.id.to_string(),
            label: def.label.to_string(),
            active: active.iter().any(|id| id.as_ref() == def.id),
        })
        .collect()
}

pub fn process<S: AsRef<str>>(
    category: VehicleCategory,
    listings: &[VehicleListing],
    active_filter_ids: &[S],
    sort_key: Option<SortKey>,
) -> Vec<VehicleListing> {
    let defs = predicates_for(category);
    let active: Vec<&PredicateDef> = active_filter_ids
        .iter()
        .filter_map(|id| {
            let id = id.as_ref();
            let def = defs.iter().find(|def| def.id == id);
            if def.is_none() {
                tracing::debug!(category = %category, filter = id, "Ignoring unknown filter id");
            }
            def
        })
        .collect();

    let mut results: Vec<VehicleListing> = listings
        .iter()
        .filter(|listing| active.iter().all(|def| (def.test)(*listing)))
        .cloned()
        .collect();

    if let Some(key) = sort_key {
        sort_listings(&mut results, key);
    }
    results
}

/// Stable sort by one key; ties keep their relative order.
pub fn sort_listings(listings: &mut [VehicleListing], key: SortKey) {
    listings.sort_by(|a, b| compare(key, a, b));
}

fn compare(key: SortKey, a: &VehicleListing, b: &VehicleListing) -> Ordering {
    match key {
        SortKey::PriceAscending => a.hourly_price.total_cmp(&b.hourly_price),
        SortKey::PriceDescending => b.hourly_price.total_cmp(&a.hourly_price),
        // Popularity has no metric of its own in the listing data; it ranks by rating.
        SortKey::RatingDescending | SortKey::Popularity => b.rating.total_cmp(&a.rating),
        SortKey::DistanceAscending => {
            parse_distance(&a.distance_label).total_cmp(&parse_distance(&b.distance_label))
        }
        SortKey::YearDescending => b.year.cmp(&a.year),
        SortKey::FuelEfficiency => fuel_rank(&b.fuel_type).cmp(&fuel_rank(&a.fuel_type)),
    }
}

/// electric 4, hybrid 3, petrol 2, diesel 1, anything else 0
pub fn fuel_rank(fuel_type: &str) -> u8 {
    match fuel_type.trim().to_lowercase().as_str() {
        "electric" => 4,
        "hybrid" => 3,
        "petrol" => 2,
        "diesel" => 1,
        _ => 0,
    }
}

fn fuel_is(listing: &VehicleListing, fuel: &str) -> bool {
    listing.fuel_type.trim().eq_ignore_ascii_case(fuel)
}

fn has_feature(listing: &VehicleListing, tag: &str) -> bool {
    listing
        .features
        .iter()
        .any(|feature| feature.to_lowercase().contains(tag))
}
