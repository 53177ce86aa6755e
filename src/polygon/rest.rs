use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;
use url::Url;

use crate::config::PolygonConfig;
use crate::error::AppError;
use crate::model::bar::RawBar;
use crate::quote_source::QuoteSource;

use super::credentials::CredentialPool;
use super::types::{OpenCloseResponse, PolygonErrorResponse};

const API_KEY_PARAM: &str = "apiKey";

pub struct PolygonClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: CredentialPool,
    adjusted: bool,
    rate_limit_cooldown: Duration,
}

impl PolygonClient {
    pub fn new(config: &PolygonConfig) -> Result<Self> {
        let credentials = CredentialPool::new(config.api_keys.clone())?;
        Self::with_credentials(
            &config.base_url,
            credentials,
            Duration::from_secs(config.timeout_secs),
            Duration::from_secs(config.rate_limit_cooldown_secs),
            config.adjusted,
        )
    }

    pub fn with_credentials(
        base_url: &str,
        credentials: CredentialPool,
        timeout: Duration,
        rate_limit_cooldown: Duration,
        adjusted: bool,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("invalid Polygon base url '{}'", base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Polygon base url '{}' cannot carry a path", base_url);
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build Polygon HTTP client")?;
        Ok(Self {
            http,
            base_url,
            credentials,
            adjusted,
            rate_limit_cooldown,
        })
    }

    fn open_close_url(&self, symbol: &str, date: NaiveDate, api_key: &str) -> Url {
        let mut url = self.base_url.clone();
        let date = date.format("%Y-%m-%d").to_string();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["v1", "open-close", symbol, date.as_str()]);
        }
        url.query_pairs_mut()
            .append_pair("adjusted", if self.adjusted { "true" } else { "false" })
            .append_pair(API_KEY_PARAM, api_key);
        url
    }

    async fn get(&self, url: &Url) -> Result<reqwest::Response, AppError> {
        Ok(self.http.get(url.clone()).send().await?)
    }
}

/// Request URL with the API key masked, safe to log or surface in errors.
pub fn redact_url(url: &Url) -> String {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == API_KEY_PARAM {
                "REDACTED".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), v)
        })
        .collect();
    let mut out = url.clone();
    if !pairs.is_empty() {
        out.query_pairs_mut().clear().extend_pairs(pairs);
    }
    out.to_string()
}

fn compact_error_body(body: &str) -> String {
    let normalized = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.chars().count() > 180 {
        format!("{}...", normalized.chars().take(180).collect::<String>())
    } else {
        normalized
    }
}

#[async_trait]
impl QuoteSource for PolygonClient {
    async fn fetch_daily_bar(&self, symbol: &str, date: NaiveDate) -> Result<RawBar, AppError> {
        let url = self.open_close_url(symbol, date, self.credentials.next_key());

        let mut resp = self.get(&url).await?;
        if resp.status() == StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!(
                symbol,
                %date,
                cooldown_secs = self.rate_limit_cooldown.as_secs_f64(),
                "Rate limited by Polygon, cooling down before one retry"
            );
            tokio::time::sleep(self.rate_limit_cooldown).await;
            resp = self.get(&url).await?;
        }

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<PolygonErrorResponse>(&body)
                .ok()
                .and_then(PolygonErrorResponse::into_message)
                .unwrap_or_else(|| {
                    let compact = compact_error_body(&body);
                    if compact.is_empty() {
                        status.to_string()
                    } else {
                        compact
                    }
                });
            return Err(AppError::QuoteSource {
                url: redact_url(&url),
                message,
            });
        }

        let body: OpenCloseResponse = resp.json().await?;
        if !body.status.eq_ignore_ascii_case("OK") {
            return Err(AppError::QuoteSource {
                url: redact_url(&url),
                message: format!("unexpected status {}", body.status),
            });
        }

        if body.from != date || !body.symbol.eq_ignore_ascii_case(symbol) {
            return Err(AppError::QuoteSource {
                url: redact_url(&url),
                message: format!(
                    "requested {} {}, received {} {}",
                    symbol, date, body.symbol, body.from
                ),
            });
        }

        tracing::debug!(symbol, %date, close = body.close, "Daily bar received");
        Ok(RawBar {
            symbol: symbol.to_string(),
            date,
            open: body.open,
            high: body.high,
            low: body.low,
            close: body.close,
            volume: body.volume,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str, keys: &[&str]) -> PolygonClient {
        PolygonClient::with_credentials(
            base,
            CredentialPool::new(keys.iter().map(|k| k.to_string()).collect()).unwrap(),
            Duration::from_secs(5),
            Duration::from_millis(10),
            true,
        )
        .unwrap()
    }

    #[test]
    fn open_close_url_layout() {
        let c = client("https://api.polygon.io", &["k1"]);
        let url = c.open_close_url("AAPL", "2025-02-03".parse().unwrap(), "k1");
        assert_eq!(
            url.as_str(),
            "https://api.polygon.io/v1/open-close/AAPL/2025-02-03?adjusted=true&apiKey=k1"
        );
    }

    #[test]
    fn base_url_path_prefix_is_kept() {
        let c = client("http://127.0.0.1:9000/mock/", &["k1"]);
        let url = c.open_close_url("MSFT", "2025-02-04".parse().unwrap(), "k1");
        assert_eq!(url.path(), "/mock/v1/open-close/MSFT/2025-02-04");
    }

    #[test]
    fn redaction_hides_only_the_key() {
        let url = Url::parse("https://api.polygon.io/v1/open-close/A/2025-01-02?adjusted=true&apiKey=secret")
            .unwrap();
        let redacted = redact_url(&url);
        assert!(!redacted.contains("secret"));
        assert!(redacted.contains("adjusted=true"));
        assert!(redacted.contains("apiKey=REDACTED"));
    }

    #[test]
    fn compact_body_truncates_long_text() {
        let long = "x ".repeat(200);
        let out = compact_error_body(&long);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), 183);
    }
}
