// Steam storefront client - the authoritative source that establishes a
// game's identity and base attributes. Every other service is queried with
// the subject this one produces.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::service::{Locator, Service};

const STORE_BASE: &str = "https://store.steampowered.com";
const APP_LIST_URL: &str = "https://api.steampowered.com/ISteamApps/GetAppList/v2/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseDate {
    pub display_string: String,
    /// `None` until the game is released.
    pub iso_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallReviews {
    pub desc: String,
    /// Percentage of positive reviews, 0 when there are none.
    pub score: i64,
    pub total_reviews: i64,
}

/// The subject of one aggregation: a single catalog item. Dependent services
/// receive it by reference and must not mutate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SteamApp {
    pub appid: u32,
    pub name: String,
    pub images: Vec<String>,
    pub external_url: String,

    pub released: bool,
    pub price: Option<f64>,
    pub discount: Option<i64>,

    pub release_date: ReleaseDate,
    pub overall_reviews: OverallReviews,
    pub achievement_count: i64,
    pub native_linux_support: bool,
}

#[derive(Debug, Deserialize)]
struct AppListResponse {
    applist: AppList,
}

#[derive(Debug, Deserialize)]
struct AppList {
    apps: Vec<AppListEntry>,
}

#[derive(Debug, Deserialize)]
struct AppListEntry {
    appid: u32,
    name: String,
}

#[derive(Debug, Deserialize)]
struct AppDetailsEnvelope {
    success: bool,
    data: Option<AppDetailsData>,
}

#[derive(Debug, Deserialize)]
struct AppDetailsData {
    name: String,
    header_image: String,
    #[serde(default)]
    screenshots: Vec<Screenshot>,
    is_free: bool,
    price_overview: Option<PriceOverview>,
    release_date: ReleaseDateData,
    achievements: Option<Achievements>,
    platforms: Platforms,
}

#[derive(Debug, Deserialize)]
struct Screenshot {
    path_thumbnail: String,
}

#[derive(Debug, Deserialize)]
struct PriceOverview {
    currency: String,
    /// Cents.
    #[serde(rename = "final")]
    final_price: i64,
    discount_percent: i64,
}

#[derive(Debug, Deserialize)]
struct ReleaseDateData {
    coming_soon: bool,
    date: String,
}

#[derive(Debug, Deserialize)]
struct Achievements {
    total: i64,
}

#[derive(Debug, Deserialize)]
struct Platforms {
    linux: bool,
}

#[derive(Debug, Deserialize)]
struct ReviewsResponse {
    query_summary: ReviewSummary,
}

#[derive(Debug, Deserialize)]
struct ReviewSummary {
    review_score_desc: String,
    total_positive: i64,
    total_reviews: i64,
}

pub struct Steam {
    client: Client,
    country_code: String,
    /// Lowercase name -> appid, populated by `load()`.
    app_list: RwLock<Option<HashMap<String, u32>>>,
}

impl Steam {
    pub fn new(client: Client, country_code: impl Into<String>) -> Self {
        Self {
            client,
            country_code: country_code.into(),
            app_list: RwLock::new(None),
        }
    }

    /// Case-insensitive name -> appid lookup against the loaded app list.
    pub fn lookup_appid(&self, name: &str) -> Option<u32> {
        self.app_list
            .read()
            .unwrap()
            .as_ref()
            .and_then(|apps| apps.get(&name.to_lowercase()).copied())
    }

    /// Fetch a profile's wishlist as appids, priority order. Returns `None`
    /// if the input resolves as neither a profile id nor a vanity name
    /// (private wishlists look the same as missing profiles).
    pub async fn wishlist(&self, profile_name_or_id: &str) -> Result<Option<Vec<u32>>> {
        tracing::info!(profile = profile_name_or_id, "getting wishlist");

        let by_id = format!("{STORE_BASE}/wishlist/profiles/{profile_name_or_id}/wishlistdata/");
        let mut response = self
            .client
            .get(&by_id)
            .query(&[("l", "english")])
            .send()
            .await
            .context("wishlist request failed")?;

        if !response.status().is_success() {
            tracing::info!(
                profile = profile_name_or_id,
                "not a profile id, retrying as profile name"
            );
            let by_name = format!("{STORE_BASE}/wishlist/id/{profile_name_or_id}/wishlistdata/");
            response = self
                .client
                .get(&by_name)
                .query(&[("l", "english")])
                .send()
                .await
                .context("wishlist request failed")?;
            if !response.status().is_success() {
                return Ok(None);
            }
        }

        // serde_json is built with preserve_order, so iteration below follows
        // the document and zero-priority items keep their source order.
        let items: serde_json::Map<String, Value> = response
            .json()
            .await
            .context("malformed wishlist response")?;

        let mut entries = Vec::with_capacity(items.len());
        for (appid, data) in &items {
            let appid: u32 = appid
                .parse()
                .with_context(|| format!("non-numeric wishlist appid {appid:?}"))?;
            let priority = data
                .get("priority")
                .and_then(Value::as_i64)
                .with_context(|| format!("wishlist item {appid} has no priority"))?;
            entries.push((appid, priority));
        }

        Ok(Some(order_by_priority(entries)))
    }
}

/// Prioritized items first, ascending; unprioritized (priority 0) items
/// appended in their original order.
pub(crate) fn order_by_priority(items: Vec<(u32, i64)>) -> Vec<u32> {
    let mut ranked: Vec<(u32, i64)> = items
        .iter()
        .filter(|&&(_, priority)| priority != 0)
        .copied()
        .collect();
    ranked.sort_by_key(|&(_, priority)| priority);

    ranked
        .into_iter()
        .map(|(appid, _)| appid)
        .chain(
            items
                .iter()
                .filter(|&&(_, priority)| priority == 0)
                .map(|&(appid, _)| appid),
        )
        .collect()
}

#[async_trait]
impl Service for Steam {
    type Query = u32;
    type Payload = SteamApp;

    fn name(&self) -> &'static str {
        "Steam"
    }

    fn fallback_url(&self, appid: &u32) -> String {
        format!("{STORE_BASE}/{appid}")
    }

    async fn load(&self) -> Result<()> {
        tracing::info!("downloading app list");
        let response = self
            .client
            .get(APP_LIST_URL)
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .context("app list request failed")?
            .error_for_status()
            .context("app list request rejected")?;
        let list: AppListResponse = response.json().await.context("malformed app list")?;

        let mut apps = HashMap::with_capacity(list.applist.apps.len());
        for app in list.applist.apps {
            apps.insert(app.name.to_lowercase(), app.appid);
        }
        tracing::info!(apps = apps.len(), "app list ready");

        *self.app_list.write().unwrap() = Some(apps);
        Ok(())
    }

    async fn fetch(&self, appid: &u32, _locator: &Locator) -> Result<Option<SteamApp>> {
        let appid = *appid;
        tracing::info!(appid, "getting steam details");

        let response = self
            .client
            .get(format!("{STORE_BASE}/api/appdetails"))
            .query(&[
                ("appids", appid.to_string()),
                ("cc", self.country_code.clone()),
                ("l", "english".to_string()),
            ])
            .send()
            .await
            .context("appdetails request failed")?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response
            .error_for_status()
            .context("appdetails request rejected")?;

        let mut envelope: HashMap<String, AppDetailsEnvelope> = response
            .json()
            .await
            .context("malformed appdetails response")?;
        let Some(details) = envelope.remove(&appid.to_string()) else {
            bail!("appdetails response missing app {appid}");
        };
        if !details.success {
            return Ok(None);
        }
        let data = details.data.context("appdetails success without data")?;

        let mut images = vec![data.header_image.clone()];
        images.extend(
            data.screenshots
                .iter()
                .map(|shot| shot.path_thumbnail.clone()),
        );

        let released = !data.release_date.coming_soon;

        let (price, discount) = if data.is_free {
            (Some(0.0), Some(0))
        } else if let Some(overview) = &data.price_overview {
            if overview.currency != "EUR" {
                bail!("unexpected currency {:?}", overview.currency);
            }
            (
                Some(overview.final_price as f64 / 100.0),
                Some(overview.discount_percent),
            )
        } else {
            (None, None)
        };

        let iso_date = if released {
            let date = NaiveDate::parse_from_str(&data.release_date.date, "%d %b, %Y")
                .with_context(|| {
                    format!("unrecognized release date {:?}", data.release_date.date)
                })?;
            Some(date.format("%Y-%m-%d").to_string())
        } else {
            None
        };

        tracing::info!(appid, "getting review summary");
        let response = self
            .client
            .get(format!("{STORE_BASE}/appreviews/{appid}"))
            .query(&[
                ("json", "1"),
                ("num_per_page", "0"),
                ("l", "english"),
                ("language", "all"),
                ("review_type", "all"),
                ("purchase_type", "all"),
            ])
            .send()
            .await
            .context("appreviews request failed")?
            .error_for_status()
            .context("appreviews request rejected")?;
        let reviews: ReviewsResponse = response
            .json()
            .await
            .context("malformed appreviews response")?;
        let summary = reviews.query_summary;

        let score = if summary.total_reviews > 0 {
            (summary.total_positive as f64 / summary.total_reviews as f64 * 100.0).round() as i64
        } else {
            0
        };

        Ok(Some(SteamApp {
            appid,
            name: data.name,
            images,
            external_url: format!("{STORE_BASE}/app/{appid}/"),

            released,
            price,
            discount,

            release_date: ReleaseDate {
                display_string: data.release_date.date,
                iso_date,
            },
            overall_reviews: OverallReviews {
                desc: summary.review_score_desc,
                score,
                total_reviews: summary.total_reviews,
            },
            achievement_count: data.achievements.map(|a| a.total).unwrap_or(0),
            native_linux_support: data.platforms.linux,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_order_by_priority() {
        // Priority ascending, zero-priority items appended in source order
        let ordered = order_by_priority(vec![(10, 0), (20, 2), (30, 1), (40, 0)]);
        assert_eq!(ordered, vec![30, 20, 10, 40]);

        assert_eq!(order_by_priority(vec![]), Vec::<u32>::new());
        assert_eq!(order_by_priority(vec![(5, 0)]), vec![5]);
    }

    #[test]
    fn test_appdetails_envelope_parsing() {
        let envelope: AppDetailsEnvelope = serde_json::from_value(json!({
            "success": true,
            "data": {
                "name": "Half-Life 2",
                "header_image": "https://cdn.example/header.jpg",
                "screenshots": [{"path_thumbnail": "https://cdn.example/shot1.jpg"}],
                "is_free": false,
                "price_overview": {
                    "currency": "EUR",
                    "final": 979,
                    "discount_percent": 0
                },
                "release_date": {"coming_soon": false, "date": "16 Nov, 2004"},
                "achievements": {"total": 33},
                "platforms": {"windows": true, "mac": true, "linux": true}
            }
        }))
        .unwrap();

        assert!(envelope.success);
        let data = envelope.data.unwrap();
        assert_eq!(data.name, "Half-Life 2");
        assert_eq!(data.price_overview.unwrap().final_price, 979);
        assert!(data.platforms.linux);
    }

    #[test]
    fn test_failed_lookup_has_no_data() {
        let envelope: AppDetailsEnvelope =
            serde_json::from_value(json!({"success": false})).unwrap();
        assert!(!envelope.success);
        assert!(envelope.data.is_none());
    }

    #[test]
    fn test_release_date_format() {
        let date = NaiveDate::parse_from_str("16 Nov, 2004", "%d %b, %Y").unwrap();
        assert_eq!(date.format("%Y-%m-%d").to_string(), "2004-11-16");
    }
}
