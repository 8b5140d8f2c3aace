use std::{env, net::SocketAddr, str::FromStr, time::Duration};

use url::Url;

use crate::error::AppError;

pub const DEFAULT_GEOCODER_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
pub const DEFAULT_IMPACT_API_URL: &str = "https://impactco2.fr/api/v1/transport";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub listen_addr: SocketAddr,
    pub cookie_secret: String,
    pub session_ttl: chrono::Duration,
    pub google_maps_api_key: Option<String>,
    pub geocoder_url: Url,
    pub impact_api_url: Url,
    pub upstream_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://carbon.db".to_string());

        // PORT alone binds every interface, the way container platforms expect.
        let listen_addr: SocketAddr = match (env::var("APP_LISTEN_ADDR"), env::var("PORT")) {
            (Ok(addr), _) => parse_var("APP_LISTEN_ADDR", &addr)?,
            (Err(_), Ok(port)) => {
                SocketAddr::from(([0, 0, 0, 0], parse_var::<u16>("PORT", &port)?))
            }
            _ => SocketAddr::from(([127, 0, 0, 1], 3000)),
        };

        let cookie_secret = env::var("COOKIE_SECRET")
            .unwrap_or_else(|_| "change-me-carbon-cookie-secret".to_string());

        let ttl_hours: i64 = env::var("SESSION_TTL_HOURS")
            .map(|raw| parse_var("SESSION_TTL_HOURS", &raw))
            .unwrap_or(Ok(24))?;
        if ttl_hours <= 0 {
            return Err(AppError::Config(
                "SESSION_TTL_HOURS must be positive".to_string(),
            ));
        }

        let google_maps_api_key = env::var("GOOGLE_MAPS_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        let geocoder_url = env::var("GEOCODER_URL")
            .unwrap_or_else(|_| DEFAULT_GEOCODER_URL.to_string());
        let impact_api_url = env::var("IMPACT_API_URL")
            .unwrap_or_else(|_| DEFAULT_IMPACT_API_URL.to_string());

        let timeout_secs: u64 = env::var("UPSTREAM_TIMEOUT_SECS")
            .map(|raw| parse_var("UPSTREAM_TIMEOUT_SECS", &raw))
            .unwrap_or(Ok(30))?;

        Ok(Self {
            database_url,
            listen_addr,
            cookie_secret,
            session_ttl: chrono::Duration::hours(ttl_hours),
            google_maps_api_key,
            geocoder_url: parse_var("GEOCODER_URL", &geocoder_url)?,
            impact_api_url: parse_var("IMPACT_API_URL", &impact_api_url)?,
            upstream_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn parse_var<T>(key: &str, raw: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|err| AppError::Config(format!("invalid {key}: {err}")))
}
