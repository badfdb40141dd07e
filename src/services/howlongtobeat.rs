// HowLongToBeat client - playtime estimates.
//
// The site has no public API: the search endpoint lives inside a Next.js
// bundle and game pages are fetched through a build-id-scoped data route.
// Both go stale whenever the site redeploys, so the resolved endpoint is
// cached and re-derived (once, never recursively) when a request 404s.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::service::{Locator, Service};
use super::steam::SteamApp;

const HLTB_BASE: &str = "https://howlongtobeat.com";

#[derive(Debug, Clone, Serialize)]
pub struct HowLongToBeatDetails {
    /// Main story, in seconds. `None` when nobody reported a time.
    pub main: Option<i64>,
    pub plus: Option<i64>,
    pub completionist: Option<i64>,
    pub external_url: String,
}

#[derive(Debug, Clone)]
struct Endpoint {
    search_url: String,
    build_id: String,
}

#[derive(Debug, Deserialize)]
struct NextData {
    #[serde(rename = "buildId")]
    build_id: String,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    data: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    game_id: i64,
    /// Steam appid, when the search result still carries it directly.
    /// Kept for stability; newer payloads need the game-props fallback.
    profile_steam: Option<SteamRef>,
    comp_main: i64,
    comp_plus: i64,
    #[serde(rename = "comp_100")]
    comp_completionist: i64,
}

/// The appid field has historically flipped between a number and a string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SteamRef {
    Id(u32),
    Text(String),
}

impl SteamRef {
    fn appid(&self) -> Result<u32> {
        match self {
            SteamRef::Id(id) => Ok(*id),
            SteamRef::Text(raw) => raw
                .parse()
                .with_context(|| format!("invalid steam id {raw:?}")),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GameProps {
    #[serde(rename = "pageProps")]
    page_props: PageProps,
}

#[derive(Debug, Deserialize)]
struct PageProps {
    game: PropsGame,
}

#[derive(Debug, Deserialize)]
struct PropsGame {
    data: PropsGameData,
}

#[derive(Debug, Deserialize)]
struct PropsGameData {
    game: Vec<PropsGameEntry>,
}

#[derive(Debug, Deserialize)]
struct PropsGameEntry {
    profile_steam: SteamRef,
}

pub struct HowLongToBeat {
    client: Client,
    next_data_re: Regex,
    app_bundle_re: Regex,
    endpoint: tokio::sync::RwLock<Option<Endpoint>>,
}

impl HowLongToBeat {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            next_data_re: Regex::new(
                r#"(?s)<script id="__NEXT_DATA__" type="application/json"[^>]*>(.*?)</script>"#,
            )
            .unwrap(),
            app_bundle_re: Regex::new(r#"src="(/_next/static/chunks/pages/_app-[^"]+\.js)""#)
                .unwrap(),
            endpoint: tokio::sync::RwLock::new(None),
        }
    }

    async fn current_endpoint(&self) -> Result<Endpoint> {
        self.endpoint
            .read()
            .await
            .clone()
            .context("search endpoint not resolved")
    }

    /// Re-derive the search endpoint and build id and swap them in.
    async fn rediscover(&self) -> Result<Endpoint> {
        let mut slot = self.endpoint.write().await;
        let endpoint = self.discover().await?;
        *slot = Some(endpoint.clone());
        Ok(endpoint)
    }

    /// Scrape the index page for the Next.js build id, then scan the app
    /// bundle's `fetch(...)` call sites for the search endpoint.
    async fn discover(&self) -> Result<Endpoint> {
        tracing::info!("resolving search endpoint");

        let index = self
            .client
            .get(format!("{HLTB_BASE}/"))
            .header("Priority", "u=0, i")
            .header("Referer", "https://duckduckgo.com/")
            .header("Sec-Fetch-Dest", "document")
            .header("Sec-Fetch-Mode", "navigate")
            .header("Sec-Fetch-Site", "cross-site")
            .header("Sec-GPC", "1")
            .send()
            .await
            .context("index request failed")?
            .error_for_status()
            .context("index request rejected")?
            .text()
            .await
            .context("index body unreadable")?;

        let raw_next_data = self
            .next_data_re
            .captures(&index)
            .and_then(|caps| caps.get(1))
            .context("__NEXT_DATA__ tag not found")?
            .as_str();
        let next_data: NextData =
            serde_json::from_str(raw_next_data).context("malformed __NEXT_DATA__")?;
        tracing::info!(build_id = %next_data.build_id, "found build id");

        let bundle_path = self
            .app_bundle_re
            .captures(&index)
            .and_then(|caps| caps.get(1))
            .context("app bundle script not found")?
            .as_str();
        let bundle = self
            .client
            .get(format!("{HLTB_BASE}{bundle_path}"))
            .header("Referer", format!("{HLTB_BASE}/"))
            .header("Sec-Fetch-Dest", "script")
            .header("Sec-Fetch-Mode", "no-cors")
            .header("Sec-Fetch-Site", "same-origin")
            .header("Sec-GPC", "1")
            .send()
            .await
            .context("app bundle request failed")?
            .error_for_status()
            .context("app bundle request rejected")?
            .text()
            .await
            .context("app bundle unreadable")?;

        let search_path = fetch_urls(&bundle)
            .into_iter()
            .find(|url| url.starts_with("/api/search") || url.starts_with("/api/find"))
            .context("no search endpoint in app bundle")?;
        let search_url = format!("{HLTB_BASE}{search_path}");
        tracing::info!(endpoint = %search_url, "found search endpoint");

        Ok(Endpoint {
            search_url,
            build_id: next_data.build_id,
        })
    }

    async fn search(&self, endpoint: &Endpoint, name: &str) -> Result<Response> {
        let search_terms: Vec<&str> = name.split_whitespace().collect();
        tracing::info!(?search_terms, "searching");

        let body = serde_json::json!({
            "searchType": "games",
            "searchTerms": search_terms,
            "searchPage": 1,
            "size": 10,
            "searchOptions": {
                "games": {
                    "userId": 0,
                    "platform": "PC",
                    "sortCategory": "name",
                    "rangeCategory": "main",
                    "rangeTime": {"min": null, "max": null},
                    "gameplay": {"perspective": "", "flow": "", "genre": ""},
                    "rangeYear": {"min": "", "max": ""},
                    "modifier": ""
                },
                "users": {"sortCategory": "postcount"},
                "lists": {"sortCategory": "follows"},
                "filter": "",
                "sort": 0,
                "randomizer": 0
            },
            "useCache": true
        });

        self.client
            .post(&endpoint.search_url)
            .header("Origin", HLTB_BASE)
            .header("Priority", "u=4")
            .header("Referer", format!("{HLTB_BASE}/"))
            .header("Sec-Fetch-Dest", "empty")
            .header("Sec-Fetch-Mode", "cors")
            .header("Sec-Fetch-Site", "same-origin")
            .header("Sec-GPC", "1")
            .json(&body)
            .send()
            .await
            .context("search request failed")
    }

    /// Fetch a game's Next.js props. A 404 means the cached build id went
    /// stale; it is refreshed once and the request retried.
    async fn game_props(&self, game_id: i64, app: &SteamApp) -> Result<GameProps> {
        let mut refreshed = false;
        loop {
            let endpoint = self.current_endpoint().await?;
            let response = self
                .client
                .get(format!(
                    "{HLTB_BASE}/_next/data/{}/game/{game_id}.json",
                    endpoint.build_id
                ))
                .query(&[("gameId", game_id.to_string())])
                .header("Priority", "u=0")
                .header(
                    "Referer",
                    format!("{HLTB_BASE}/?q={}", urlencoding::encode(&app.name)),
                )
                .header("Sec-Fetch-Dest", "empty")
                .header("Sec-Fetch-Mode", "cors")
                .header("Sec-Fetch-Site", "same-origin")
                .header("Sec-GPC", "1")
                .send()
                .await
                .context("game props request failed")?;

            if response.status() == StatusCode::NOT_FOUND && !refreshed {
                tracing::info!(build_id = %endpoint.build_id, "build id went stale, rediscovering");
                self.rediscover().await?;
                refreshed = true;
                continue;
            }

            let response = response
                .error_for_status()
                .context("game props request rejected")?;
            return response.json().await.context("malformed game props");
        }
    }

    async fn match_results(
        &self,
        app: &SteamApp,
        results: SearchResults,
        locator: &Locator,
    ) -> Result<Option<HowLongToBeatDetails>> {
        for hit in results.data {
            let candidate = match &hit.profile_steam {
                Some(profile) => profile.appid()?,
                None => {
                    let props = self.game_props(hit.game_id, app).await?;
                    props
                        .page_props
                        .game
                        .data
                        .game
                        .first()
                        .context("game props without game entry")?
                        .profile_steam
                        .appid()?
                }
            };

            if candidate == app.appid {
                tracing::info!(name = %app.name, game_id = hit.game_id, "found game");
                let url = format!("{HLTB_BASE}/game/{}", hit.game_id);
                locator.set(&url);
                return Ok(Some(HowLongToBeatDetails {
                    main: nonzero(hit.comp_main),
                    plus: nonzero(hit.comp_plus),
                    completionist: nonzero(hit.comp_completionist),
                    external_url: url,
                }));
            }
        }

        tracing::info!(name = %app.name, "no match");
        Ok(None)
    }
}

/// Strip a name down to the characters the HLTB search tolerates.
fn purge_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .collect()
}

fn nonzero(value: i64) -> Option<i64> {
    (value != 0).then_some(value)
}

/// Extract the first argument of every `fetch(...)` call site in a JS
/// bundle. Handles the plain `fetch("...")` form and the minified
/// `fetch("...".concat("..."), ...)` form; anything else is skipped.
fn fetch_urls(java_script: &str) -> Vec<String> {
    let mut urls = Vec::new();

    for call_site in java_script.split("fetch(").skip(1) {
        let mut depth = 1i32;
        let mut end = None;
        for (idx, ch) in call_site.char_indices() {
            match ch {
                '(' => depth += 1,
                ')' => depth -= 1,
                _ => {}
            }
            // End of the call or end of its first argument
            if depth == 0 || (depth == 1 && ch == ',') {
                end = Some(idx);
                break;
            }
        }
        let Some(end) = end else { continue };
        let raw = &call_site[..end];

        let parts: Vec<&str> = raw.split('"').collect();
        let url = match parts.as_slice() {
            ["", url, ""] => Some((*url).to_string()),
            ["", head, ".concat(", tail, ")"] => Some(format!("{head}{tail}")),
            _ => None,
        };
        match url {
            Some(url) => urls.push(url),
            None => tracing::debug!(raw, "skipping unparsable fetch argument"),
        }
    }

    urls
}

#[async_trait]
impl Service for HowLongToBeat {
    type Query = SteamApp;
    type Payload = HowLongToBeatDetails;

    fn name(&self) -> &'static str {
        "HowLongToBeat"
    }

    fn fallback_url(&self, _app: &SteamApp) -> String {
        HLTB_BASE.to_string()
    }

    async fn load(&self) -> Result<()> {
        let endpoint = self.discover().await?;
        *self.endpoint.write().await = Some(endpoint);
        Ok(())
    }

    async fn fetch(
        &self,
        app: &SteamApp,
        locator: &Locator,
    ) -> Result<Option<HowLongToBeatDetails>> {
        tracing::info!(appid = app.appid, name = %app.name, "getting playtime");

        let purged = purge_name(&app.name);
        tracing::debug!(%purged, "purged name");

        let endpoint = self.current_endpoint().await?;
        let mut response = self.search(&endpoint, &purged).await?;
        if response.status() == StatusCode::NOT_FOUND {
            tracing::info!(
                endpoint = %endpoint.search_url,
                "search endpoint went stale, rediscovering"
            );
            let endpoint = self.rediscover().await?;
            response = self.search(&endpoint, &purged).await?;
        }
        let response = response
            .error_for_status()
            .context("search request rejected")?;

        let results: SearchResults = response
            .json()
            .await
            .context("malformed search results")?;

        self.match_results(app, results, locator).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fetch_urls_plain() {
        let js = r#"async function a(){let r=await fetch("/api/search",{method:"POST"});}"#;
        assert_eq!(fetch_urls(js), vec!["/api/search"]);
    }

    #[test]
    fn test_fetch_urls_concat() {
        let js = r#"fetch("/api/".concat("find"), {headers: t})"#;
        assert_eq!(fetch_urls(js), vec!["/api/find"]);
    }

    #[test]
    fn test_fetch_urls_skips_dynamic_arguments() {
        // buildUrl(a, b) and "...".concat(e) have no literal to recover
        let js = r#"fetch(buildUrl(a, b)); fetch("/x/".concat(e)); fetch("/api/search")"#;
        assert_eq!(fetch_urls(js), vec!["/api/search"]);
    }

    #[test]
    fn test_purge_name() {
        assert_eq!(purge_name("Half-Life 2: Episode One"), "HalfLife 2 Episode One");
        assert_eq!(purge_name("NieR:Automata™"), "NieRAutomata");
    }

    #[test]
    fn test_search_hit_parsing_with_either_steam_ref() {
        let numeric: SearchHit = serde_json::from_value(json!({
            "game_id": 10270,
            "profile_steam": 220,
            "comp_main": 46620,
            "comp_plus": 75060,
            "comp_100": 127860
        }))
        .unwrap();
        assert_eq!(numeric.profile_steam.unwrap().appid().unwrap(), 220);

        let text: SearchHit = serde_json::from_value(json!({
            "game_id": 10270,
            "profile_steam": "220",
            "comp_main": 0,
            "comp_plus": 0,
            "comp_100": 0
        }))
        .unwrap();
        assert_eq!(text.profile_steam.unwrap().appid().unwrap(), 220);
        assert_eq!(nonzero(text.comp_main), None);
    }

    #[test]
    fn test_next_data_extraction() {
        let hltb = HowLongToBeat::new(reqwest::Client::new());
        let html = r#"<html><script id="__NEXT_DATA__" type="application/json">
            {"buildId": "abc123", "props": {}}</script></html>"#;
        let raw = hltb
            .next_data_re
            .captures(html)
            .and_then(|caps| caps.get(1))
            .unwrap()
            .as_str();
        let next_data: NextData = serde_json::from_str(raw).unwrap();
        assert_eq!(next_data.build_id, "abc123");
    }

    #[test]
    fn test_app_bundle_extraction() {
        let hltb = HowLongToBeat::new(reqwest::Client::new());
        let html = r#"<script src="/_next/static/chunks/pages/_app-9f8e7d6c.js" defer></script>"#;
        let path = hltb
            .app_bundle_re
            .captures(html)
            .and_then(|caps| caps.get(1))
            .unwrap()
            .as_str();
        assert_eq!(path, "/_next/static/chunks/pages/_app-9f8e7d6c.js");
    }
}
