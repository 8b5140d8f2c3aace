pub mod geocoder;
pub mod impact;
pub mod modes;
pub mod registration;
pub mod trips;

use std::time::Duration;

use crate::error::AppError;

pub fn http_client(timeout: Duration) -> Result<reqwest::Client, AppError> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .build()?;
    Ok(client)
}
