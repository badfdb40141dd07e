// SteamDB client - historical low price for the Steam store itself.
// Uses the JSON endpoint the official browser extension talks to, with the
// matching headers; anything else gets walled off.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::service::{Locator, Service};
use super::steam::SteamApp;
use crate::util::parse_price_str;

const PRICE_URL: &str = "https://steamdb.info/api/ExtensionAppPrice/";

#[derive(Debug, Clone, Serialize)]
pub struct SteamDbDetails {
    pub price: f64,
    pub discount: i64,
    /// `None` means the historical low is the current offer.
    pub iso_date: Option<String>,
    pub external_url: String,
}

#[derive(Debug, Deserialize)]
struct PriceResponse {
    success: bool,
    data: Option<PriceData>,
}

#[derive(Debug, Deserialize)]
struct PriceData {
    /// Formatted price, e.g. "9,79€".
    p: String,
    /// Discount percent at the time of the low.
    d: i64,
    /// Unix timestamp of the low.
    t: i64,
}

pub struct SteamDb {
    client: Client,
}

impl SteamDb {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn app_url(appid: u32) -> String {
    format!("https://steamdb.info/app/{appid}/")
}

#[async_trait]
impl Service for SteamDb {
    type Query = SteamApp;
    type Payload = SteamDbDetails;

    fn name(&self) -> &'static str {
        "SteamDB"
    }

    fn fallback_url(&self, app: &SteamApp) -> String {
        app_url(app.appid)
    }

    async fn fetch(&self, app: &SteamApp, _locator: &Locator) -> Result<Option<SteamDbDetails>> {
        tracing::info!(appid = app.appid, "getting historical low");

        let (Some(price), Some(discount)) = (app.price, app.discount) else {
            bail!("steam price or discount not known");
        };

        let response = self
            .client
            .get(PRICE_URL)
            .query(&[
                ("appid", app.appid.to_string()),
                ("currency", "EUR".to_string()),
            ])
            .header("Accept", "application/json")
            .header("Accept-Language", "en-US,en;q=0.5")
            .header("Sec-Fetch-Dest", "empty")
            .header("Sec-Fetch-Mode", "cors")
            .header("Sec-Fetch-Site", "same-origin")
            .header("X-Requested-With", "SteamDB")
            .send()
            .await
            .context("price request failed")?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response
            .error_for_status()
            .context("price request rejected")?;

        let parsed: PriceResponse = response.json().await.context("malformed price response")?;
        if !parsed.success {
            bail!("steamdb reported failure");
        }
        let data = parsed.data.context("steamdb success without data")?;

        let historical_low = parse_price_str(&data.p).context("bad historical low price")?;
        let details = if historical_low < price {
            let date = DateTime::from_timestamp(data.t, 0)
                .with_context(|| format!("timestamp {} out of range", data.t))?;
            SteamDbDetails {
                price: historical_low,
                discount: data.d,
                iso_date: Some(date.to_rfc3339()),
                external_url: app_url(app.appid),
            }
        } else {
            // The current offer is the low; a null date reads as "today"
            SteamDbDetails {
                price,
                discount,
                iso_date: None,
                external_url: app_url(app.appid),
            }
        };

        tracing::info!(?details, "historical low");
        Ok(Some(details))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_price_response_parsing() {
        let parsed: PriceResponse = serde_json::from_value(json!({
            "success": true,
            "data": {"p": "9,79€", "d": 67, "t": 1700000000}
        }))
        .unwrap();
        assert!(parsed.success);
        let data = parsed.data.unwrap();
        assert_eq!(parse_price_str(&data.p).unwrap(), 9.79);
        assert_eq!(data.d, 67);
    }

    #[test]
    fn test_low_timestamp_renders_utc() {
        let date = DateTime::from_timestamp(1700000000, 0).unwrap();
        assert_eq!(date.to_rfc3339(), "2023-11-14T22:13:20+00:00");
    }
}
