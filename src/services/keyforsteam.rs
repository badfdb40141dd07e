// KeyForSteam / AllKeyShop client - key and gift seller offers plus the
// historical low across keyshops.
//
// There is no API for third parties: the product page embeds the internal id
// the offer endpoints want, and matching a Steam app to a product relies on
// the same name-purging scheme the official browser add-on uses
// (https://addons.mozilla.org/en-US/firefox/addon/allkeyshop-compare-game-prices/,
// version 3.0.10413).

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use unicode_normalization::UnicodeNormalization;

use super::service::{Locator, Service};
use super::steam::SteamApp;
use crate::util::{parse_price_str, roman_words_to_digits};

const KFS_BASE: &str = "https://www.keyforsteam.de";
const OFFERS_URL: &str = "https://www.keyforsteam.de/wp-admin/admin-ajax.php";
const SEARCH_URL: &str = "https://www.allkeyshop.com/api/latest/vaks.php";
const REDIRECT_URL: &str = "https://www.allkeyshop.com/redirection/offer/eur";
const HISTORY_URL: &str = "https://www.allkeyshop.com/api/price_history_api.php";

const PLATFORMS: &[&str] = &[
    "PlayStation 4",
    "PlayStation4",
    "PlayStation5",
    "PlayStation 5",
    "pc",
    "win/mac",
    "mac",
    "psn",
    "ps vita",
    "ps4 e ps5",
    "ps4 et Ps5",
    "ps4 and ps5",
    "ps3",
    "ps4",
    "ps5",
    "Xbox one/series",
    "series x|s",
    "xbox series x",
    "xbox live",
    "xbox one",
    "xbox 360",
    "xbox",
    "nintendo switch",
    "nintendo",
    "switch",
    "windows 7",
    "windows 10",
    "windows 11",
];

const ADJECTIVES: &[&str] = &["pour", "for", "por", "per", "für", "voor"];

const IGNORED_WORDS: &[&str] = &[
    "buy online",
    "buy",
    "compra",
    "kup",
    "kaufen",
    "cd key",
    "bind retail",
    "retail key",
    "oem key",
    "retail – download link",
    " – online activation",
    "digital code",
    "digital key",
    "key",
    "clé ",
    " / windows 10",
    "green gift",
    "gift",
    "/ V",
    "bethesda",
    "rocksta",
    "ubisoft connect",
    "pc/xbox live",
    "(pc)",
    "(eu)",
    "activision ng",
    "activision",
    "precommande de",
    "précommande",
    "pre-order",
    "preorder",
    "pre order",
    "édition complète",
    "complete pack",
    "enhanced edition",
    "special edition",
    "ultimate bundle",
    "crossgen bundle",
    "complete edition",
    "definitive edition",
    "ultimate edition",
    "digital deluxe",
    "deluxe",
    "edição completa",
    "édition standard",
    "standard edition",
    "gold edition",
    "game of the Year",
    "anniversary edition",
    "edition",
    "edizione",
    "add-on",
    "importación",
    "rockstar games launcher",
    "rockstar games",
    "gog.com",
    "gog",
    "steam row",
    "steam account",
    "row",
    "dlc",
    "steamcd",
    "steam ww",
    "steam",
    "ea play",
    "electronic arts",
    "epic games",
    "microsoft",
    "battle.net",
    "uplay",
    "origin",
    "/ biohazard 4",
    "global",
    "africa",
    "albania",
    "algeria",
    "angola",
    "argentina",
    "armenia",
    "asia",
    "austria",
    "australia",
    "bahrain",
    "bangladesh",
    "barbados",
    "belgium",
    "bolivia",
    "brazil",
    "brunei",
    "bulgaria",
    "cambodia",
    "cameroon",
    "canada",
    "chile",
    "china",
    "colombia",
    "congo",
    "costa rica",
    "croatia",
    "cuba",
    "cyprus",
    "czechia",
    "denmark",
    "djibouti",
    "germany",
    "ecuador",
    "egypt",
    "emea",
    "eritrea",
    "estonia",
    "eswatini",
    "ethiopia",
    "eng",
    "europe",
    "eu",
    "fiji",
    "finland",
    "france",
    "francia",
    "francesa",
    "gabon",
    "gambia",
    "georgia",
    "ghana",
    "greece",
    "grenada",
    "guatemala",
    "guinea",
    "haiti",
    "honduras",
    "hungary",
    "italy",
    "iceland",
    "india",
    "indonesia",
    "ireland",
    "japan",
    "kenya",
    "latam",
    "latvia",
    "lebanon",
    "lesotho",
    "liberia",
    "liechtenstein",
    "mexico",
    "malaysia",
    "nigeria",
    "north america",
    "south america",
    "philippines",
    "ru/cis",
    "spain",
    "turkey",
    "uk",
    "united states",
    "united kingdom",
    "us/ca",
    "us",
    "numérique de luxe",
];

const IGNORED_CHARS: &[char] = &[
    ':', '™', '-', '(', ')', '[', ']', '{', '}', '/', ',', '©', '®',
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheapestOffer {
    pub price: f64,
    /// Activation form, e.g. a region-locked key type.
    pub form: String,
    pub seller: String,
    pub edition: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalLow {
    pub price: f64,
    pub seller: String,
    /// `None` means the low is the current cheapest offer.
    pub iso_date: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyForSteamDetails {
    pub cheapest_offer: CheapestOffer,
    pub historical_low: HistoricalLow,
    /// Whether the product was confirmed via its Steam offer's redirect.
    pub id_verified: bool,
    pub external_url: String,
}

#[derive(Debug, Clone)]
struct Offer {
    id: i64,
    is_available: bool,
    price: f64,
    form: String,
    seller: String,
    edition: String,
}

#[derive(Debug, Clone)]
struct Product {
    internal_id: i64,
    cheapest_offer: Option<CheapestOffer>,
    id_verified: bool,
    page_url: String,
}

/// Lookup tables in the offer payloads are keyed by ids that appear both as
/// numbers and as strings, depending on the field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum Key {
    Num(i64),
    Text(String),
}

impl Key {
    fn as_map_key(&self) -> String {
        match self {
            Key::Num(id) => id.to_string(),
            Key::Text(text) => text.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct NamedEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct OffersResponse {
    success: bool,
    #[serde(default)]
    warnings: Option<Vec<Value>>,
    #[serde(default)]
    errors: Option<Vec<Value>>,
    #[serde(default)]
    offers: Vec<OfferData>,
    #[serde(default)]
    regions: HashMap<String, NamedEntry>,
    #[serde(default)]
    merchants: HashMap<String, NamedEntry>,
    #[serde(default)]
    editions: HashMap<String, NamedEntry>,
}

#[derive(Debug, Deserialize)]
struct OfferData {
    id: i64,
    #[serde(rename = "isActive")]
    is_active: bool,
    stock: String,
    price: OfferPrice,
    region: String,
    merchant: Key,
    edition: Key,
}

#[derive(Debug, Deserialize)]
struct OfferPrice {
    eur: OfferPriceEur,
}

#[derive(Debug, Deserialize)]
struct OfferPriceEur {
    #[serde(rename = "priceCard")]
    price_card: f64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    status: String,
    #[serde(default)]
    warnings: Option<Vec<Value>>,
    #[serde(default)]
    errors: Option<Vec<Value>>,
    #[serde(default)]
    products: Vec<SearchProduct>,
}

#[derive(Debug, Deserialize)]
struct SearchProduct {
    id: i64,
    name: String,
    link: String,
}

#[derive(Debug, Deserialize)]
struct RedirectData {
    #[serde(rename = "clickBody")]
    click_body: ClickBody,
}

#[derive(Debug, Deserialize)]
struct ClickBody {
    #[serde(rename = "redirectionUrl")]
    redirection_url: String,
}

#[derive(Debug, Deserialize)]
struct PriceHistoryResponse {
    lower_keyshops_price: LowerKeyshopsPrice,
    merchants: HashMap<String, NamedEntry>,
}

#[derive(Debug, Deserialize)]
struct LowerKeyshopsPrice {
    price: String,
    merchant_id: Key,
    last_update: String,
}

pub struct KeyForSteam {
    client: Client,
    word_patterns: Vec<Regex>,
    squeeze_re: Regex,
    game_id_re: Regex,
    name_re: Regex,
    tag_re: Regex,
    appdata_re: Regex,
}

impl KeyForSteam {
    pub fn new(client: Client) -> Self {
        // The shop titles prefix platforms with localized adjectives
        // ("für pc", "pour mac"), so those combinations are purged too.
        let mut ignored: Vec<String> = IGNORED_WORDS
            .iter()
            .chain(PLATFORMS.iter())
            .map(|word| (*word).to_string())
            .collect();
        for platform in PLATFORMS {
            for adjective in ADJECTIVES {
                ignored.push(format!("{adjective} {platform}"));
            }
        }

        let word_patterns = ignored
            .iter()
            .map(|word| {
                let folded = normalize_ascii(&word.to_lowercase());
                Regex::new(&format!(r"\b{}\b", regex::escape(&folded)))
                    .expect("ignored-word pattern")
            })
            .collect();

        Self {
            client,
            word_patterns,
            squeeze_re: Regex::new(r"\s\s+").unwrap(),
            game_id_re: Regex::new(r#"var game_id="(\d+)""#).unwrap(),
            name_re: Regex::new(r#"(?s)<span[^>]*data-itemprop="name"[^>]*>(.*?)</span>"#).unwrap(),
            tag_re: Regex::new(r"<[^>]+>").unwrap(),
            appdata_re: Regex::new(r#"(?s)<script[^>]*id="appData"[^>]*>(.*?)</script>"#).unwrap(),
        }
    }

    fn purge_words(&self, name: &str) -> String {
        let mut purged = name.to_string();
        for pattern in &self.word_patterns {
            purged = pattern.replace_all(&purged, "").into_owned();
        }
        purged
    }

    /// Reduce a shop or store title to its comparable core.
    pub(crate) fn purge_name(&self, name: &str) -> String {
        let lowered = roman_words_to_digits(name).to_lowercase();
        let folded = normalize_ascii(&lowered).replace("&#39;", "'");
        let first_pass = self.purge_words(&folded);
        let depunct = purge_chars(&first_pass);
        let second_pass = self.purge_words(&depunct);
        let purged = self
            .squeeze_re
            .replace_all(&second_pass, " ")
            .trim()
            .to_string();
        tracing::debug!(name, %purged, "purged name");
        purged
    }

    /// Read the internal product id and display name off a product page, or
    /// `None` if the page doesn't exist.
    async fn internal_id_and_name(&self, page_url: &str) -> Result<Option<(i64, String)>> {
        let response = self
            .client
            .get(page_url)
            .send()
            .await
            .context("product page request failed")?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let page = response
            .error_for_status()
            .context("product page request rejected")?
            .text()
            .await
            .context("product page unreadable")?;

        let internal_id: i64 = self
            .game_id_re
            .captures(&page)
            .and_then(|caps| caps.get(1))
            .with_context(|| format!("no internal id in {page_url:?}"))?
            .as_str()
            .parse()
            .context("non-numeric internal id")?;
        tracing::info!(internal_id, "internal keyforsteam id");

        let raw_name = self
            .name_re
            .captures(&page)
            .and_then(|caps| caps.get(1))
            .with_context(|| format!("no internal name in {page_url:?}"))?
            .as_str();
        let internal_name = self.tag_re.replace_all(raw_name, "").trim().to_string();
        tracing::info!(%internal_name, "internal name");

        Ok(Some((internal_id, internal_name)))
    }

    /// Validate one candidate product and collect its offers. `None` when
    /// the product turns out to be a different game.
    async fn product(
        &self,
        app: &SteamApp,
        internal_id: i64,
        internal_name: &str,
        page_url: &str,
    ) -> Result<Option<Product>> {
        if self.purge_name(&app.name) != self.purge_name(internal_name) {
            tracing::debug!(internal_id, internal_name, "name mismatch, skipping product");
            return Ok(None);
        }

        tracing::info!(internal_id, "getting offers");
        let product_param = internal_id.to_string();
        let response = self
            .client
            .get(OFFERS_URL)
            .query(&[
                ("action", "get_offers"),
                ("product", product_param.as_str()),
                ("currency", "eur"),
                ("locale", "de-DE"),
            ])
            .send()
            .await
            .context("offers request failed")?
            .error_for_status()
            .context("offers request rejected")?;
        let offers: OffersResponse = response.json().await.context("malformed offers response")?;

        if let Some(warnings) = &offers.warnings {
            for warning in warnings {
                tracing::warn!(?warning, "keyforsteam warning");
            }
        }
        if let Some(errors) = &offers.errors {
            if !errors.is_empty() {
                for error in errors {
                    tracing::error!(?error, "keyforsteam error");
                }
                bail!("keyforsteam errors: {errors:?}");
            }
        }
        if !offers.success {
            bail!("keyforsteam offers endpoint reported failure");
        }

        let mut steam_offer: Option<Offer> = None;
        let mut cheapest: Option<Offer> = None;
        for raw in &offers.offers {
            let offer = Offer {
                id: raw.id,
                is_available: raw.is_active && raw.stock == "InStock",
                price: (raw.price.eur.price_card * 100.0).round() / 100.0,
                form: offers
                    .regions
                    .get(&raw.region)
                    .with_context(|| format!("unknown region {:?}", raw.region))?
                    .name
                    .clone(),
                seller: offers
                    .merchants
                    .get(&raw.merchant.as_map_key())
                    .with_context(|| format!("unknown merchant {:?}", raw.merchant))?
                    .name
                    .clone(),
                edition: offers
                    .editions
                    .get(&raw.edition.as_map_key())
                    .with_context(|| format!("unknown edition {:?}", raw.edition))?
                    .name
                    .clone(),
            };
            tracing::debug!(?offer, "offer");

            if offer.seller == "Steam" {
                steam_offer = Some(offer);
            } else if offer.is_available
                && !offer.form.contains("ACCOUNT")
                && !offer.form.contains("ONLY")
                && !offer.form.contains("AUF")
                && cheapest
                    .as_ref()
                    .map_or(true, |best| offer.price < best.price)
            {
                cheapest = Some(offer);
            }
        }

        // A Steam-sold offer redirects to the store; the appid at the end of
        // that redirect proves (or disproves) the product mapping.
        let mut id_verified = false;
        if let Some(steam_offer) = steam_offer {
            id_verified = true;

            let redirect = self
                .client
                .get(format!("{REDIRECT_URL}/{}", steam_offer.id))
                .send()
                .await
                .context("redirection request failed")?
                .error_for_status()
                .context("redirection request rejected")?
                .text()
                .await
                .context("redirection body unreadable")?;

            let raw_app_data = self
                .appdata_re
                .captures(&redirect)
                .and_then(|caps| caps.get(1))
                .context("appData tag not found")?
                .as_str();
            let redirect_data: RedirectData =
                serde_json::from_str(raw_app_data).context("malformed appData")?;

            let url = redirect_data.click_body.redirection_url;
            if !url.starts_with("https://store.steampowered.com/") {
                bail!("invalid redirection url {url:?}");
            }
            // Bundles and packages carry no appid to compare against
            if let Some(rest) = url.strip_prefix("https://store.steampowered.com/app/") {
                let candidate: u32 = rest
                    .split(['/', '?'])
                    .next()
                    .unwrap_or_default()
                    .parse()
                    .with_context(|| format!("bad appid in redirection url {url:?}"))?;
                if candidate != app.appid {
                    tracing::info!(
                        candidate,
                        appid = app.appid,
                        internal_name,
                        "steam id mismatch, rejecting product"
                    );
                    return Ok(None);
                }
            }
        }

        Ok(Some(Product {
            internal_id,
            cheapest_offer: cheapest.map(|offer| CheapestOffer {
                price: offer.price,
                form: offer.form,
                seller: offer.seller,
                edition: offer.edition,
            }),
            id_verified,
            page_url: page_url.to_string(),
        }))
    }
}

fn normalize_ascii(input: &str) -> String {
    input.nfd().filter(char::is_ascii).collect()
}

fn purge_chars(name: &str) -> String {
    let mut purged = name.to_string();
    for &ch in IGNORED_CHARS {
        purged = purged.replace(ch, " ");
    }
    purged
}

#[async_trait]
impl Service for KeyForSteam {
    type Query = SteamApp;
    type Payload = KeyForSteamDetails;

    fn name(&self) -> &'static str {
        "KeyForSteam"
    }

    fn fallback_url(&self, _app: &SteamApp) -> String {
        KFS_BASE.to_string()
    }

    async fn fetch(
        &self,
        app: &SteamApp,
        locator: &Locator,
    ) -> Result<Option<KeyForSteamDetails>> {
        tracing::info!(appid = app.appid, name = %app.name, "getting key and gift offers");
        locator.set(KFS_BASE);

        let purged = self.purge_name(&app.name);
        let page_url = format!(
            "{KFS_BASE}/{}-key-kaufen-preisvergleich/",
            purged.split_whitespace().collect::<Vec<_>>().join("-")
        );

        let mut products: Vec<Product> = Vec::new();
        let mut direct_id = None;

        if let Some((internal_id, internal_name)) = self.internal_id_and_name(&page_url).await? {
            direct_id = Some(internal_id);
            if let Some(product) = self
                .product(app, internal_id, &internal_name, &page_url)
                .await?
            {
                tracing::info!(?product, "valid product");
                products.push(product);
            }
        }

        if products.first().map_or(true, |product| !product.id_verified) {
            tracing::info!("direct page lookup inconclusive, trying search");

            let response = self
                .client
                .get(SEARCH_URL)
                .query(&[
                    ("action", "products"),
                    ("showOffers", "1"),
                    ("showVouchers", "false"),
                    ("locale", "de_DE"),
                    ("currency", "eur"),
                    ("apiKey", "vaks_extension"),
                    ("search", purged.as_str()),
                ])
                .send()
                .await
                .context("search request failed")?
                .error_for_status()
                .context("search request rejected")?;
            let search: SearchResponse =
                response.json().await.context("malformed search response")?;

            if let Some(warnings) = &search.warnings {
                for warning in warnings {
                    tracing::warn!(?warning, "keyforsteam warning");
                }
            }
            if let Some(errors) = &search.errors {
                if !errors.is_empty() {
                    for error in errors {
                        tracing::error!(?error, "keyforsteam error");
                    }
                    bail!("keyforsteam errors: {errors:?}");
                }
            }
            if search.status != "success" {
                bail!("keyforsteam search status {:?}", search.status);
            }

            for candidate in &search.products {
                tracing::debug!(?candidate, "product candidate");

                if !candidate.link.starts_with("https://www.keyforsteam.de/")
                    || !candidate.link.ends_with("-key-kaufen-preisvergleich/")
                {
                    tracing::debug!(link = %candidate.link, "invalid link");
                    continue;
                }
                // The direct page id already failed verification above
                if direct_id == Some(candidate.id) {
                    tracing::info!(id = candidate.id, "skipping already-checked internal id");
                    continue;
                }

                if let Some(product) = self
                    .product(app, candidate.id, &candidate.name, &candidate.link)
                    .await?
                {
                    tracing::info!(?product, "valid product");
                    if product.id_verified {
                        products = vec![product];
                        break;
                    }
                    products.push(product);
                }
            }
        }

        if products.is_empty() {
            tracing::info!("no keyforsteam products found");
            return Ok(None);
        }
        if products.len() > 1 {
            bail!("ambiguous keyforsteam match: {} products", products.len());
        }
        let product = products.remove(0);
        locator.set(&product.page_url);
        tracing::info!(?product, "found keyforsteam product");

        let Some(cheapest) = product.cheapest_offer else {
            tracing::info!("no purchasable offer");
            return Ok(None);
        };

        tracing::info!(internal_id = product.internal_id, "getting price history");
        let id_param = product.internal_id.to_string();
        let response = self
            .client
            .get(HISTORY_URL)
            .query(&[
                ("normalised_name", id_param.as_str()),
                ("currency", "EUR"),
                ("database", "keyforsteam.de"),
                ("v2", "1"),
            ])
            .send()
            .await
            .context("price history request failed")?
            .error_for_status()
            .context("price history request rejected")?;
        let history: PriceHistoryResponse =
            response.json().await.context("malformed price history")?;

        let merchant_key = history.lower_keyshops_price.merchant_id.as_map_key();
        let seller = history
            .merchants
            .get(&merchant_key)
            .with_context(|| format!("unknown merchant {merchant_key:?}"))?
            .name
            .clone();
        let low_date = NaiveDateTime::parse_from_str(
            &history.lower_keyshops_price.last_update,
            "%Y-%m-%d %H:%M:%S",
        )
        .context("bad price history date")?;

        let mut historical_low = HistoricalLow {
            price: parse_price_str(&history.lower_keyshops_price.price)
                .context("bad historical low price")?,
            seller,
            iso_date: Some(low_date.format("%Y-%m-%dT%H:%M:%S").to_string()),
        };

        // A current offer below the recorded low supersedes it; the null
        // date reads as "now"
        if cheapest.price < historical_low.price {
            historical_low = HistoricalLow {
                price: cheapest.price,
                seller: cheapest.seller.clone(),
                iso_date: None,
            };
        }

        Ok(Some(KeyForSteamDetails {
            cheapest_offer: cheapest,
            historical_low,
            id_verified: product.id_verified,
            external_url: product.page_url,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> KeyForSteam {
        KeyForSteam::new(Client::new())
    }

    #[test]
    fn test_purge_name_roman_numerals() {
        assert_eq!(service().purge_name("Grand Theft Auto V"), "grand theft auto 5");
    }

    #[test]
    fn test_purge_name_editions_and_chars() {
        let kfs = service();
        assert_eq!(kfs.purge_name("DOOM Eternal Deluxe Edition"), "doom eternal");
        assert_eq!(
            kfs.purge_name("Tomb Raider: Game of the Year Edition"),
            "tomb raider"
        );
    }

    #[test]
    fn test_purge_name_accents_and_apostrophes() {
        let kfs = service();
        assert_eq!(
            kfs.purge_name("Sid Meier’s Civilization VI"),
            "sid meiers civilization 6"
        );
        assert_eq!(kfs.purge_name("Pokémon"), "pokemon");
    }

    #[test]
    fn test_purge_name_platforms_and_regions() {
        let kfs = service();
        assert_eq!(kfs.purge_name("Celeste PC"), "celeste");
        assert_eq!(kfs.purge_name("Factorio Steam Key GLOBAL"), "factorio");
    }

    #[test]
    fn test_map_key_accepts_numbers_and_strings() {
        let num: Key = serde_json::from_str("61").unwrap();
        assert_eq!(num.as_map_key(), "61");
        let text: Key = serde_json::from_str(r#""61""#).unwrap();
        assert_eq!(text.as_map_key(), "61");
    }

    #[test]
    fn test_page_scraping_patterns() {
        let kfs = service();
        let page = r#"<script>var game_id="12345"</script>
            <span class="t" data-itemprop="name"> Elden Ring </span>"#;

        let id = kfs
            .game_id_re
            .captures(page)
            .and_then(|caps| caps.get(1))
            .unwrap()
            .as_str();
        assert_eq!(id, "12345");

        let name = kfs
            .name_re
            .captures(page)
            .and_then(|caps| caps.get(1))
            .unwrap()
            .as_str();
        assert_eq!(kfs.tag_re.replace_all(name, "").trim(), "Elden Ring");
    }

    #[test]
    fn test_offers_response_parsing() {
        let offers: OffersResponse = serde_json::from_value(serde_json::json!({
            "success": true,
            "offers": [{
                "id": 9001,
                "isActive": true,
                "stock": "InStock",
                "price": {"eur": {"priceCard": 12.345}},
                "region": "eu-region",
                "merchant": 61,
                "edition": "std"
            }],
            "regions": {"eu-region": {"name": "EUROPE"}},
            "merchants": {"61": {"name": "Kinguin"}},
            "editions": {"std": {"name": "Standard"}}
        }))
        .unwrap();

        assert!(offers.success);
        let raw = &offers.offers[0];
        assert_eq!((raw.price.eur.price_card * 100.0).round() / 100.0, 12.35);
        assert_eq!(
            offers.merchants[&raw.merchant.as_map_key()].name,
            "Kinguin"
        );
    }
}
