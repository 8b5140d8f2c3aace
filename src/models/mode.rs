use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TransportationMode {
    #[serde(rename = "mode_id")]
    pub id: i64,
    #[serde(rename = "mode_name")]
    pub name: String,
    pub description: Option<String>,
}
