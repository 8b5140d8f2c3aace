use std::collections::{hash_map::Entry, HashMap};

use async_trait::async_trait;
use serde::Serialize;

use crate::{
    error::AppError,
    models::{mode::TransportationMode, trip::Trip},
};

#[async_trait]
pub trait ModeLookup: Send + Sync {
    async fn find_mode(&self, mode_id: i64) -> Result<Option<TransportationMode>, AppError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripsByMode {
    pub mode_id: i64,
    pub mode_name: String,
    pub description: Option<String>,
    pub total_trips: u64,
    pub total_impact: f64,
    pub total_distance: f64,
}

impl TripsByMode {
    fn empty(mode: TransportationMode) -> Self {
        Self {
            mode_id: mode.id,
            mode_name: mode.name,
            description: mode.description,
            total_trips: 0,
            total_impact: 0.0,
            total_distance: 0.0,
        }
    }
}

/// Each mode is looked up once per call. A trip pointing at a mode the
/// lookup does not know is a [`AppError::DataIntegrity`] failure.
pub async fn aggregate_by_mode<M>(trips: &[Trip], modes: &M) -> Result<Vec<TripsByMode>, AppError>
where
    M: ModeLookup + ?Sized,
{
    let mut groups: HashMap<i64, TripsByMode> = HashMap::new();

    for trip in trips {
        let group = match groups.entry(trip.mode_id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let mode = modes.find_mode(trip.mode_id).await?.ok_or_else(|| {
                    AppError::DataIntegrity(format!(
                        "trip {} references missing mode {}",
                        trip.id, trip.mode_id
                    ))
                })?;
                entry.insert(TripsByMode::empty(mode))
            }
        };
        group.total_trips += 1;
        group.total_impact += trip.carbon_impact_kg;
        group.total_distance += trip.distance_km;
    }

    let mut aggregated: Vec<_> = groups.into_values().collect();
    aggregated.sort_by_key(|group| group.mode_id);
    Ok(aggregated)
}
