// Owns the fixed set of services and the cache-free part of the aggregation:
// warm-up, identifier resolution, and the concurrent fan-out with per-field
// partial failure.

use futures::future::{self, BoxFuture};
use serde_json::{json, Value};

use super::howlongtobeat::HowLongToBeat;
use super::keyforsteam::KeyForSteam;
use super::protondb::ProtonDb;
use super::service::{Instrumented, Service, ServiceError, ServiceStats};
use super::steam::{Steam, SteamApp};
use super::steamdb::SteamDb;
use crate::config::AppConfig;
use crate::models::{ServiceEntry, ServiceMap};
use crate::util;

pub struct ServiceManager {
    pub steam: Instrumented<Steam>,
    pub steamdb: Instrumented<SteamDb>,
    pub protondb: Instrumented<ProtonDb>,
    pub keyforsteam: Instrumented<KeyForSteam>,
    pub howlongtobeat: Instrumented<HowLongToBeat>,
}

impl ServiceManager {
    pub fn new(config: &AppConfig) -> Self {
        let client = util::http_client(&config.fetch.user_agent, config.http_timeout());
        Self {
            steam: Instrumented::new(Steam::new(client.clone(), &config.fetch.country_code)),
            steamdb: Instrumented::new(SteamDb::new(client.clone())),
            protondb: Instrumented::new(ProtonDb::new(client.clone())),
            keyforsteam: Instrumented::new(KeyForSteam::new(client.clone())),
            howlongtobeat: Instrumented::new(HowLongToBeat::new(client)),
        }
    }

    /// Best-effort sequential warm-up. A service whose load fails stays cold
    /// and retries lazily on first use.
    pub async fn load_all(&self) {
        tracing::info!("loading all services");
        Self::load_one(&self.steam).await;
        Self::load_one(&self.steamdb).await;
        Self::load_one(&self.protondb).await;
        Self::load_one(&self.keyforsteam).await;
        Self::load_one(&self.howlongtobeat).await;
        tracing::info!("service loading finished");
    }

    async fn load_one<S: Service>(handle: &Instrumented<S>) {
        if let Err(err) = handle.load().await {
            tracing::warn!(service = handle.name(), %err, "startup load failed, will retry lazily");
        }
    }

    /// Case-insensitive name lookup against the Steam app list.
    pub async fn appid_from_name(&self, name: &str) -> Result<Option<u32>, ServiceError> {
        self.steam.ensure_loaded().await?;
        Ok(self.steam.service().lookup_appid(name))
    }

    /// Wishlist of a profile, in priority order.
    pub async fn wishlist(&self, profile_name_or_id: &str) -> Result<Option<Vec<u32>>, ServiceError> {
        self.steam.ensure_loaded().await?;
        self.steam
            .service()
            .wishlist(profile_name_or_id)
            .await
            .map_err(ServiceError::Fetch)
    }

    /// Fan out to every applicable dependent service and fan the outcomes
    /// back in. Inapplicable fields are preset to literal nulls, one failing
    /// service degrades exactly one field, and nothing here short-circuits.
    pub async fn dispatch(&self, app: &SteamApp) -> ServiceMap {
        let mut services = ServiceMap::new();
        services.insert(
            "steam".to_string(),
            ServiceEntry::success(Some(to_json(app))),
        );

        let plan = TaskPlan::for_app(app);
        for (field, entry) in plan.preset {
            services.insert(field.to_string(), entry);
        }

        let mut tasks: Vec<(&'static str, BoxFuture<'_, ServiceEntry>)> = Vec::new();
        if plan.historical_low {
            tasks.push(("steam_historical_low", Box::pin(run_entry(&self.steamdb, app))));
        }
        if plan.key_sellers {
            tasks.push((
                "key_and_gift_sellers",
                Box::pin(run_entry(&self.keyforsteam, app)),
            ));
        }
        if plan.game_length {
            tasks.push(("game_length", Box::pin(run_entry(&self.howlongtobeat, app))));
        }
        if plan.linux_support {
            tasks.push(("linux_support", Box::pin(run_entry(&self.protondb, app))));
        }

        let outcomes = future::join_all(
            tasks
                .into_iter()
                .map(|(field, task)| async move { (field, task.await) }),
        )
        .await;

        for (field, entry) in outcomes {
            services.insert(field.to_string(), entry);
        }
        services
    }

    pub fn stats(&self) -> Vec<ServiceStats> {
        vec![
            self.steam.stats(),
            self.steamdb.stats(),
            self.protondb.stats(),
            self.keyforsteam.stats(),
            self.howlongtobeat.stats(),
        ]
    }

    pub fn any_loaded(&self) -> bool {
        self.stats().iter().any(|stats| stats.load_time.is_some())
    }
}

/// Run one service task and wrap its outcome. A failure carries the locator
/// recorded during the run (or the service default) so a human can re-check
/// the claim.
async fn run_entry<S: Service>(handle: &Instrumented<S>, query: &S::Query) -> ServiceEntry {
    match handle.run_task(query).await {
        Ok(payload) => ServiceEntry::success(payload.map(to_json)),
        Err(err) => ServiceEntry::failure(err.to_string(), handle.error_url(query)),
    }
}

fn to_json<T: serde::Serialize>(payload: T) -> Value {
    serde_json::to_value(payload).unwrap_or(Value::Null)
}

/// Which dependent services a subject makes applicable, decided statically
/// from the subject's own fields. Fields ruled out here are preset to
/// null/zero equivalents and never produce an error.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct TaskPlan {
    pub preset: Vec<(&'static str, ServiceEntry)>,
    pub historical_low: bool,
    pub key_sellers: bool,
    pub game_length: bool,
    pub linux_support: bool,
}

impl TaskPlan {
    pub(crate) fn for_app(app: &SteamApp) -> Self {
        let mut plan = TaskPlan::default();

        // Unreleased titles have no price history, playtime or compatibility
        // data by construction.
        if !app.released {
            plan.preset = vec![
                ("steam_historical_low", ServiceEntry::success(None)),
                ("key_and_gift_sellers", ServiceEntry::success(None)),
                ("game_length", ServiceEntry::success(None)),
                ("linux_support", ServiceEntry::success(None)),
            ];
            return plan;
        }

        match app.price {
            Some(price) if price > 0.0 => plan.historical_low = true,
            Some(_) => plan.preset.push((
                "steam_historical_low",
                ServiceEntry::success(Some(json!({"price": 0.0, "iso_date": null}))),
            )),
            None => plan
                .preset
                .push(("steam_historical_low", ServiceEntry::success(None))),
        }

        if matches!(app.price, Some(price) if price > 0.0) {
            plan.key_sellers = true;
        } else {
            plan.preset
                .push(("key_and_gift_sellers", ServiceEntry::success(None)));
        }

        plan.game_length = true;

        if app.native_linux_support {
            plan.preset
                .push(("linux_support", ServiceEntry::success(None)));
        } else {
            plan.linux_support = true;
        }

        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::steam::{OverallReviews, ReleaseDate};

    fn app(released: bool, price: Option<f64>, native_linux: bool) -> SteamApp {
        SteamApp {
            appid: 620,
            name: "Portal 2".to_string(),
            images: vec!["https://cdn.example/header.jpg".to_string()],
            external_url: "https://store.steampowered.com/app/620/".to_string(),
            released,
            price,
            discount: price.map(|_| 0),
            release_date: ReleaseDate {
                display_string: "18 Apr, 2011".to_string(),
                iso_date: released.then(|| "2011-04-18".to_string()),
            },
            overall_reviews: OverallReviews {
                desc: "Overwhelmingly Positive".to_string(),
                score: 98,
                total_reviews: 123456,
            },
            achievement_count: 51,
            native_linux_support: native_linux,
        }
    }

    #[test]
    fn test_unreleased_runs_nothing() {
        let plan = TaskPlan::for_app(&app(false, None, false));
        assert!(!plan.historical_low);
        assert!(!plan.key_sellers);
        assert!(!plan.game_length);
        assert!(!plan.linux_support);
        assert_eq!(plan.preset.len(), 4);
        assert!(plan
            .preset
            .iter()
            .all(|(_, entry)| *entry == ServiceEntry::success(None)));
    }

    #[test]
    fn test_paid_title_runs_everything() {
        let plan = TaskPlan::for_app(&app(true, Some(19.99), false));
        assert!(plan.historical_low);
        assert!(plan.key_sellers);
        assert!(plan.game_length);
        assert!(plan.linux_support);
        assert!(plan.preset.is_empty());
    }

    #[test]
    fn test_free_title_gets_zero_price_fields() {
        let plan = TaskPlan::for_app(&app(true, Some(0.0), false));
        assert!(!plan.historical_low);
        assert!(!plan.key_sellers);
        assert!(plan.game_length);
        assert_eq!(
            plan.preset,
            vec![
                (
                    "steam_historical_low",
                    ServiceEntry::success(Some(json!({"price": 0.0, "iso_date": null})))
                ),
                ("key_and_gift_sellers", ServiceEntry::success(None)),
            ]
        );
    }

    #[test]
    fn test_unpriced_title_gets_null_price_fields() {
        let plan = TaskPlan::for_app(&app(true, None, false));
        assert!(!plan.historical_low);
        assert!(!plan.key_sellers);
        assert_eq!(plan.preset[0].1, ServiceEntry::success(None));
    }

    #[tokio::test]
    async fn test_dispatch_unreleased_synthesizes_nulls_without_fetching() {
        let manager = ServiceManager::new(&AppConfig::default());
        let services = manager.dispatch(&app(false, None, false)).await;

        assert_eq!(services.len(), 5);
        assert!(services["steam"].is_success());
        for field in [
            "steam_historical_low",
            "key_and_gift_sellers",
            "game_length",
            "linux_support",
        ] {
            assert_eq!(services[field], ServiceEntry::success(None));
        }
    }

    struct Flaky {
        fail: bool,
    }

    #[async_trait::async_trait]
    impl Service for Flaky {
        type Query = ();
        type Payload = Value;

        fn name(&self) -> &'static str {
            "Flaky"
        }

        fn fallback_url(&self, _query: &()) -> String {
            "https://example.com/flaky".to_string()
        }

        async fn fetch(
            &self,
            _query: &(),
            _locator: &crate::services::service::Locator,
        ) -> anyhow::Result<Option<Value>> {
            if self.fail {
                anyhow::bail!("boom");
            }
            Ok(Some(json!({"ok": 1})))
        }
    }

    #[tokio::test]
    async fn test_one_failing_service_degrades_one_field() {
        let good = Instrumented::new(Flaky { fail: false });
        let bad = Instrumented::new(Flaky { fail: true });

        let (good_entry, bad_entry) = tokio::join!(run_entry(&good, &()), run_entry(&bad, &()));

        assert_eq!(good_entry, ServiceEntry::success(Some(json!({"ok": 1}))));
        match bad_entry {
            ServiceEntry::Failure { success, error, url } => {
                assert!(!success);
                assert!(error.contains("boom"));
                assert_eq!(url, "https://example.com/flaky");
            }
            ServiceEntry::Success { .. } => panic!("expected a failure entry"),
        }
    }

    #[test]
    fn test_native_linux_skips_protondb() {
        let plan = TaskPlan::for_app(&app(true, Some(9.99), true));
        assert!(!plan.linux_support);
        assert!(plan
            .preset
            .iter()
            .any(|(field, entry)| *field == "linux_support"
                && *entry == ServiceEntry::success(None)));
    }
}
