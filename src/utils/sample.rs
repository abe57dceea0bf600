//! Synthetic house listings for demos, tests and benchmarks

use crate::error::Result;
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const LOCATIONS: [(&str, f64); 4] = [
    ("Rural", 0.0),
    ("Suburban", 30_000.0),
    ("Urban", 55_000.0),
    ("Downtown", 80_000.0),
];

/// Legacy condition labels, as historical listings record them
const CONDITIONS: [(&str, f64); 4] = [
    ("Poor", -25_000.0),
    ("Fair", 0.0),
    ("Good", 10_000.0),
    ("Excellent", 35_000.0),
];

/// Generate `n_rows` listings with an `Id`, physical attributes, location,
/// legacy condition labels, garage flag and a `Price` that rises with size.
/// The same seed always yields the same frame.
pub fn sample_houses(n_rows: usize, seed: u64) -> Result<DataFrame> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut ids = Vec::with_capacity(n_rows);
    let mut areas = Vec::with_capacity(n_rows);
    let mut bedrooms = Vec::with_capacity(n_rows);
    let mut bathrooms = Vec::with_capacity(n_rows);
    let mut floors = Vec::with_capacity(n_rows);
    let mut years = Vec::with_capacity(n_rows);
    let mut locations = Vec::with_capacity(n_rows);
    let mut conditions = Vec::with_capacity(n_rows);
    let mut garages = Vec::with_capacity(n_rows);
    let mut prices = Vec::with_capacity(n_rows);

    for i in 0..n_rows {
        let area: f64 = rng.gen_range(500..5000) as f64;
        let beds: i64 = rng.gen_range(1..=5);
        let baths: i64 = rng.gen_range(1..=4);
        let n_floors: i64 = rng.gen_range(1..=3);
        let year: i64 = rng.gen_range(1900..=2023);
        let (location, location_premium) = *LOCATIONS.choose(&mut rng).unwrap_or(&LOCATIONS[0]);
        let (condition, condition_premium) = *CONDITIONS.choose(&mut rng).unwrap_or(&CONDITIONS[0]);
        let garage = if rng.gen_bool(0.5) { "Yes" } else { "No" };

        let noise: f64 = rng.gen_range(-20_000.0..20_000.0);
        let price = 50_000.0
            + 120.0 * area
            + 8_000.0 * beds as f64
            + 12_000.0 * baths as f64
            + 6_000.0 * n_floors as f64
            + 400.0 * (year - 1900) as f64
            + location_premium
            + condition_premium
            + if garage == "Yes" { 15_000.0 } else { 0.0 }
            + noise;

        ids.push(i as i64 + 1);
        areas.push(area);
        bedrooms.push(beds);
        bathrooms.push(baths);
        floors.push(n_floors);
        years.push(year);
        locations.push(location);
        conditions.push(condition);
        garages.push(garage);
        prices.push(price.max(10_000.0));
    }

    let df = df!(
        "Id" => ids,
        "Area" => areas,
        "Bedrooms" => bedrooms,
        "Bathrooms" => bathrooms,
        "Floors" => floors,
        "YearBuilt" => years,
        "Location" => locations,
        "Condition" => conditions,
        "Garage" => garages,
        "Price" => prices
    )?;
    Ok(df)
}
