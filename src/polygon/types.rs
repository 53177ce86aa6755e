use chrono::NaiveDate;
use serde::Deserialize;

/// Body of `GET /v1/open-close/{symbol}/{date}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenCloseResponse {
    pub status: String,
    pub from: NaiveDate,
    pub symbol: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PolygonErrorResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl PolygonErrorResponse {
    pub fn into_message(self) -> Option<String> {
        self.message.or(self.error).or(self.status)
    }
}
