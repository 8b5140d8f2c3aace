use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, NoneAsEmptyString};
use sqlx::FromRow;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Trip {
    #[serde(rename = "trip_id")]
    pub id: i64,
    pub user_id: i64,
    pub start_address: Option<String>,
    pub end_address: Option<String>,
    pub distance_km: f64,
    pub mode_id: i64,
    pub carbon_impact_kg: f64,
    pub trip_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTrip {
    pub user_id: i64,
    pub start_address: Option<String>,
    pub end_address: Option<String>,
    pub distance_km: f64,
    pub mode_id: i64,
    pub carbon_impact_kg: f64,
    pub trip_date: NaiveDate,
}

/// Body of `POST /trips` and `PUT /trips/:id`.
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TripRequest {
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub start_address: Option<String>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub end_address: Option<String>,
    #[serde(default)]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub mode_id: Option<i64>,
    #[serde(default)]
    pub trip_date: Option<NaiveDate>,
}

/// Where a trip's distance comes from. Exactly one source applies.
#[derive(Debug, Clone, PartialEq)]
pub enum DistanceSource {
    Direct(f64),
    Geocoded { start: String, end: String },
}

impl TripRequest {
    pub fn mode_id(&self) -> Result<i64, AppError> {
        match self.mode_id {
            Some(id) if id > 0 => Ok(id),
            _ => Err(AppError::InvalidInput("mode_id is required".into())),
        }
    }

    pub fn distance_source(&self) -> Result<DistanceSource, AppError> {
        match self.distance_km {
            Some(km) if !km.is_finite() || km < 0.0 => Err(AppError::InvalidInput(
                "distance_km must be a non-negative number".into(),
            )),
            Some(km) if km > 0.0 => Ok(DistanceSource::Direct(km)),
            _ => {
                let start = non_blank(self.start_address.as_deref());
                let end = non_blank(self.end_address.as_deref());
                match (start, end) {
                    (Some(start), Some(end)) => Ok(DistanceSource::Geocoded {
                        start: start.to_string(),
                        end: end.to_string(),
                    }),
                    _ => Err(AppError::InvalidInput(
                        "no distance or address provided".into(),
                    )),
                }
            }
        }
    }
}

fn non_blank(input: Option<&str>) -> Option<&str> {
    input.map(str::trim).filter(|value| !value.is_empty())
}
