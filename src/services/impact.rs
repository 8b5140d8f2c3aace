use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::AppError;

/// Emission factors for a transport mode over a distance.
///
/// `Ok(None)` means the provider has no data for the mode, which is not the
/// same as a mode that legitimately emits nothing (`Ok(Some(0.0))`).
#[async_trait]
pub trait ImpactProvider: Send + Sync {
    async fn lookup(&self, mode_id: i64, distance_km: f64) -> Result<Option<f64>, AppError>;
}

pub async fn carbon_impact<P>(provider: &P, mode_id: i64, distance_km: f64) -> Result<f64, AppError>
where
    P: ImpactProvider + ?Sized,
{
    provider
        .lookup(mode_id, distance_km)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no CO2 data returned for transport id {mode_id}")))
}

#[derive(Debug, Deserialize)]
struct Co2Response {
    #[serde(default)]
    data: Vec<Co2Entry>,
}

#[derive(Debug, Deserialize)]
struct Co2Entry {
    value: f64,
}

pub struct ImpactCo2Client {
    client: reqwest::Client,
    base_url: Url,
}

impl ImpactCo2Client {
    pub fn new(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    fn request_url(&self, mode_id: i64, distance_km: f64) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("km", &format!("{distance_km:.2}"))
            .append_pair("displayAll", "0")
            .append_pair("transports", &mode_id.to_string())
            .append_pair("ignoreRadiativeForcing", "0")
            .append_pair("occupencyRate", "1")
            .append_pair("includeConstruction", "0")
            .append_pair("language", "fr");
        url
    }
}

#[async_trait]
impl ImpactProvider for ImpactCo2Client {
    async fn lookup(&self, mode_id: i64, distance_km: f64) -> Result<Option<f64>, AppError> {
        let response = self
            .client
            .get(self.request_url(mode_id, distance_km))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "impact API returned {}",
                response.status()
            )));
        }

        let body: Co2Response = response.json().await?;
        let value = body.data.first().map(|entry| entry.value);
        debug!(mode_id, distance_km, ?value, "impact lookup");
        Ok(value)
    }
}
