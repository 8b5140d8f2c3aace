use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;

use crate::models::trip::Trip;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// One bucket per day of the year, indices 1..=366.
    Daily,
    /// One bucket per calendar month, indices 0..=12 with slot 0 always empty.
    Monthly,
}

impl Granularity {
    fn first_index(self) -> u32 {
        match self {
            Granularity::Daily => 1,
            Granularity::Monthly => 0,
        }
    }

    fn last_index(self) -> u32 {
        match self {
            Granularity::Daily => 366,
            Granularity::Monthly => 12,
        }
    }

    pub fn len(self) -> usize {
        (self.last_index() - self.first_index() + 1) as usize
    }

    fn bucket(self, date: NaiveDate) -> u32 {
        match self {
            Granularity::Daily => date.ordinal(),
            Granularity::Monthly => date.month(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImpactPoint {
    pub x: u32,
    pub y: f64,
}

/// Trips must be dated strictly after this day to count towards the series.
pub fn window_start(today: NaiveDate) -> NaiveDate {
    today
        .checked_sub_months(Months::new(12))
        .unwrap_or(NaiveDate::MIN)
}

/// Every bucket of the granularity is present in increasing order, so the
/// result is never empty and never decreases.
pub fn cumulative_series(
    trips: &[Trip],
    granularity: Granularity,
    today: NaiveDate,
) -> Vec<ImpactPoint> {
    let start = window_start(today);
    let first = granularity.first_index();

    let mut raw = vec![0.0_f64; granularity.len()];
    for trip in trips.iter().filter(|trip| trip.trip_date > start) {
        let slot = (granularity.bucket(trip.trip_date) - first) as usize;
        raw[slot] += trip.carbon_impact_kg;
    }

    let mut running = 0.0;
    raw.into_iter()
        .zip(first..)
        .map(|(value, x)| {
            running += value;
            ImpactPoint { x, y: running }
        })
        .collect()
}
