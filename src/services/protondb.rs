// ProtonDB client - community-reported Linux compatibility tiers.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::service::{Locator, Service};
use super::steam::SteamApp;

#[derive(Debug, Clone, Serialize)]
pub struct ProtonDbDetails {
    pub tier: String,
    pub confidence: String,
    pub report_count: i64,
    pub external_url: String,
}

#[derive(Debug, Deserialize)]
struct ReportSummary {
    tier: String,
    confidence: String,
    total: i64,
}

pub struct ProtonDb {
    client: Client,
}

impl ProtonDb {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn app_url(appid: u32) -> String {
    format!("https://www.protondb.com/app/{appid}")
}

#[async_trait]
impl Service for ProtonDb {
    type Query = SteamApp;
    type Payload = ProtonDbDetails;

    fn name(&self) -> &'static str {
        "ProtonDB"
    }

    fn fallback_url(&self, app: &SteamApp) -> String {
        app_url(app.appid)
    }

    async fn fetch(&self, app: &SteamApp, _locator: &Locator) -> Result<Option<ProtonDbDetails>> {
        tracing::info!(appid = app.appid, name = %app.name, "getting linux support state");

        let response = self
            .client
            .get(format!(
                "https://www.protondb.com/api/v1/reports/summaries/{}.json",
                app.appid
            ))
            .send()
            .await
            .context("report summary request failed")?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response
            .error_for_status()
            .context("report summary request rejected")?;

        let summary: ReportSummary = response
            .json()
            .await
            .context("malformed report summary")?;

        Ok(Some(ProtonDbDetails {
            tier: summary.tier.to_uppercase(),
            confidence: summary.confidence,
            report_count: summary.total,
            external_url: app_url(app.appid),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_report_summary_parsing() {
        let summary: ReportSummary = serde_json::from_value(json!({
            "bestReportedTier": "platinum",
            "confidence": "strong",
            "score": 0.92,
            "tier": "gold",
            "total": 412,
            "trendingTier": "gold"
        }))
        .unwrap();
        assert_eq!(summary.tier, "gold");
        assert_eq!(summary.tier.to_uppercase(), "GOLD");
        assert_eq!(summary.total, 412);
    }
}
