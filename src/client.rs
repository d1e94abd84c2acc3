use std::{collections::BTreeMap, sync::Arc, time::Duration};

use futures::{stream, Stream, StreamExt, TryStreamExt};
use rand::seq::SliceRandom;
use reqwest::{
    cookie::Jar,
    header::{HeaderMap, HeaderValue, ACCEPT},
    Url,
};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::{
    build_id::{parse_build_id, FALLBACK_BUILD_ID},
    cache::{TtlCache, DEFAULT_TTL},
    colors, envelope, top,
    uri::{normalize_card_name, Budget, DataRequest, Endpoint, UriOptions},
    AverageDeck, CardList, Error, Result, SimplifiedDeck, Timeframe,
};

pub const DEFAULT_BASE_URL: &str = "https://edhrec.com";
pub const DEFAULT_JSON_URL: &str = "https://json.edhrec.com";

/// Name of the cookie holding the site's session state.
pub const SESSION_COOKIE: &str = "userState";

static USER_AGENTS: [&str; 6] = [
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:119.0) Gecko/20100101 Firefox/119.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:109.0) Gecko/20100101 Firefox/118.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
];

fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Builds the session cookie from a session-state token, which may be given
/// either bare or as a whole `userState=...` cookie.
pub fn session_cookie(token: &str) -> String {
    let value = token
        .strip_prefix(SESSION_COOKIE)
        .and_then(|rest| rest.strip_prefix('='))
        .unwrap_or(token);
    format!("{SESSION_COOKIE}={value}")
}

#[derive(Debug, Clone, Default)]
pub struct EdhrecBuilder {
    base_url: Option<String>,
    json_url: Option<String>,
    default_build_id: Option<String>,
    cookies: Option<String>,
    user_agent: Option<String>,
    cache_ttl: Option<Duration>,
}

impl EdhrecBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Root of the static JSON host serving card details and rankings.
    pub fn json_url(mut self, url: impl Into<String>) -> Self {
        self.json_url = Some(url.into());
        self
    }

    /// Build id used when the live one can't be discovered.
    pub fn default_build_id(mut self, build_id: impl Into<String>) -> Self {
        self.default_build_id = Some(build_id.into());
        self
    }

    pub fn cookies(mut self, session_state: impl Into<String>) -> Self {
        self.cookies = Some(session_state.into());
        self
    }

    /// Fixes the user agent instead of picking a random browser one.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn build(self) -> Result<Edhrec> {
        let base_url = trimmed(self.base_url, DEFAULT_BASE_URL);
        let json_url = trimmed(self.json_url, DEFAULT_JSON_URL);
        let base = parse_url(&base_url)?;
        let json = parse_url(&json_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let user_agent = match self.user_agent {
            Some(ua) => ua,
            None => random_user_agent().to_owned(),
        };
        let mut http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(user_agent);
        if let Some(token) = self.cookies {
            // the session spans both hosts
            let cookie = session_cookie(&token);
            let jar = Jar::default();
            jar.add_cookie_str(&cookie, &base);
            jar.add_cookie_str(&cookie, &json);
            http = http.cookie_provider(Arc::new(jar));
        }

        let ttl = self.cache_ttl.unwrap_or(DEFAULT_TTL);
        Ok(Edhrec {
            http: http.build()?,
            base_url,
            json_url,
            default_build_id: self
                .default_build_id
                .unwrap_or_else(|| FALLBACK_BUILD_ID.to_owned()),
            build_id: OnceCell::new(),
            caches: Caches::new(ttl),
        })
    }
}

fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))
}

fn trimmed(url: Option<String>, default: &str) -> String {
    url.as_deref()
        .unwrap_or(default)
        .trim_end_matches('/')
        .to_owned()
}

type BudgetKey = (String, Option<Budget>);

/// One memo table per memoized operation, so operations never share entries.
#[derive(Debug)]
struct Caches {
    card_details: TtlCache<String, Value>,
    combos: TtlCache<String, Option<Value>>,
    commanders: TtlCache<String, Option<Value>>,
    average_decks: TtlCache<BudgetKey, AverageDeck>,
    decks: TtlCache<BudgetKey, Option<Value>>,
}

impl Caches {
    fn new(ttl: Duration) -> Self {
        Self {
            card_details: TtlCache::new(ttl),
            combos: TtlCache::new(ttl),
            commanders: TtlCache::new(ttl),
            average_decks: TtlCache::new(ttl),
            decks: TtlCache::new(ttl),
        }
    }
}

#[derive(Serialize)]
struct CardListRequest {
    format: &'static str,
    names: Vec<String>,
}

/// A session with edhrec.com.
///
/// Requests are issued one at a time through a single http client that keeps
/// the session's cookies and headers. Results of the expensive lookups are
/// memoized per instance.
#[derive(Debug)]
pub struct Edhrec {
    http: reqwest::Client,
    base_url: String,
    json_url: String,
    default_build_id: String,
    build_id: OnceCell<String>,
    caches: Caches,
}

macro_rules! tagged_lists {
    ($($(#[$doc:meta])* $name:ident => $tag:literal,)*) => {
        $(
            $(#[$doc])*
            pub async fn $name(&self, card_name: &str) -> Result<Option<CardList>> {
                self.commander_list(card_name, $tag).await
            }
        )*
    };
}

impl Edhrec {
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> EdhrecBuilder {
        EdhrecBuilder::default()
    }

    pub(crate) fn page_url(&self, path: &str) -> String {
        format!("{}/pages/{}", self.json_url, path.trim_start_matches('/'))
    }

    pub(crate) async fn get_json(
        &self,
        uri: &str,
        query: Option<&BTreeMap<String, String>>,
    ) -> Result<Value> {
        tracing::debug!(uri, ?query, "GET");
        let mut request = self.http.get(uri);
        if let Some(query) = query {
            request = request.query(query);
        }
        let body = request.send().await?.error_for_status()?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Fetches the landing page and reads the current build id out of it.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_build_id(&self) -> Result<Option<String>> {
        let page = self
            .http
            .get(&self.base_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(parse_build_id(&page))
    }

    /// The build id data routes are namespaced by.
    ///
    /// Resolved on first use and kept for the lifetime of the client. If it
    /// can't be discovered the configured fallback is used instead, so this
    /// never fails.
    pub async fn build_id(&self) -> &str {
        self.build_id
            .get_or_init(|| async move {
                match self.fetch_build_id().await {
                    Ok(Some(id)) => id,
                    Ok(None) => {
                        tracing::warn!(
                            fallback = %self.default_build_id,
                            "no build id on the landing page"
                        );
                        self.default_build_id.clone()
                    }
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            fallback = %self.default_build_id,
                            "failed to fetch the build id"
                        );
                        self.default_build_id.clone()
                    }
                }
            })
            .await
    }

    /// Synthesizes the data route for `subject` under `endpoint`.
    pub async fn data_request(
        &self,
        endpoint: Endpoint,
        subject: &str,
        options: UriOptions<'_>,
    ) -> DataRequest {
        let build_id = self.build_id().await;
        DataRequest::new(&self.base_url, build_id, endpoint, subject, options)
    }

    async fn next_data(
        &self,
        endpoint: Endpoint,
        subject: &str,
        options: UriOptions<'_>,
    ) -> Result<Option<Value>> {
        let request = self.data_request(endpoint, subject, options).await;
        self.fetch_data(&request).await
    }

    async fn fetch_data(&self, request: &DataRequest) -> Result<Option<Value>> {
        let response = self.get_json(&request.uri, Some(&request.query)).await?;
        Ok(envelope::page_data(response))
    }

    /// Looks up many cards at once.
    #[tracing::instrument(skip_all)]
    pub async fn card_list<I, S>(&self, names: I) -> Result<Value>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let body = CardListRequest {
            format: "dict",
            names: names.into_iter().map(Into::into).collect(),
        };
        tracing::debug!(count = body.names.len(), "POST cards");
        let response = self
            .http
            .post(format!("{}/api/cards", self.base_url))
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(serde_json::from_slice(&response)?)
    }

    pub fn card_link(&self, card_name: &str) -> String {
        format!("{}/cards/{}", self.base_url, normalize_card_name(card_name))
    }

    #[tracing::instrument(skip(self))]
    pub async fn card_details(&self, card_name: &str) -> Result<Value> {
        self.caches
            .card_details
            .get_or_try_insert_with(card_name.to_owned(), || {
                let uri = format!("{}/cards/{}", self.json_url, normalize_card_name(card_name));
                async move { self.get_json(&uri, None).await }
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn card_combos(&self, card_name: &str) -> Result<Option<Value>> {
        self.caches
            .combos
            .get_or_try_insert_with(card_name.to_owned(), || {
                self.next_data(Endpoint::Combos, card_name, UriOptions::default())
            })
            .await
    }

    /// Full url of a combo page given its site path, e.g. `/combos/gur/380-703-2557`.
    pub fn combo_url(&self, combo_path: &str) -> String {
        if combo_path.starts_with('/') {
            format!("{}{combo_path}", self.base_url)
        } else {
            format!("{}/{combo_path}", self.base_url)
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn commander_data(&self, card_name: &str) -> Result<Option<Value>> {
        self.caches
            .commanders
            .get_or_try_insert_with(card_name.to_owned(), || {
                self.next_data(Endpoint::Commanders, card_name, UriOptions::default())
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn average_deck(
        &self,
        card_name: &str,
        budget: Option<Budget>,
    ) -> Result<AverageDeck> {
        self.caches
            .average_decks
            .get_or_try_insert_with((card_name.to_owned(), budget), || async move {
                let options = UriOptions {
                    budget,
                    ..Default::default()
                };
                let data = self
                    .next_data(Endpoint::AverageDecks, card_name, options)
                    .await?;
                Ok::<_, Error>(AverageDeck {
                    commander: card_name.to_owned(),
                    decklist: data.and_then(|mut data| data.get_mut("deck").map(Value::take)),
                })
            })
            .await
    }

    /// The table of decks built around a commander.
    #[tracing::instrument(skip(self))]
    pub async fn commander_decks(
        &self,
        card_name: &str,
        budget: Option<Budget>,
    ) -> Result<Option<Value>> {
        self.caches
            .decks
            .get_or_try_insert_with((card_name.to_owned(), budget), || {
                let options = UriOptions {
                    budget,
                    ..Default::default()
                };
                self.next_data(Endpoint::Decks, card_name, options)
            })
            .await
    }

    /// Streams the simplified decks listed in [`Edhrec::commander_decks`], one
    /// request per deck, issued as the stream is polled.
    pub fn commander_decklists<'a>(
        &'a self,
        card_name: &'a str,
        budget: Option<Budget>,
    ) -> impl Stream<Item = Result<Option<SimplifiedDeck>>> + 'a {
        stream::once(self.commander_decks(card_name, budget))
            .map_ok(move |decks| {
                let hashes = decks
                    .as_ref()
                    .and_then(|decks| decks.get("table"))
                    .and_then(Value::as_array)
                    .into_iter()
                    .flatten()
                    .filter_map(|row| row.get("urlhash")?.as_str())
                    .map(ToOwned::to_owned)
                    .collect::<Vec<_>>();
                stream::iter(hashes)
                    .then(move |hash| async move { self.simplified_deck_by_id(&hash).await })
            })
            .try_flatten()
    }

    /// Raw data of a single deck, by its url hash.
    #[tracing::instrument(skip(self))]
    pub async fn deck_by_id(&self, id: &str) -> Result<Option<Value>> {
        let mut request = self
            .data_request(Endpoint::DeckPreview, id, UriOptions::default())
            .await;
        // deck hashes are case sensitive, only the query gets the normalized form
        let normalized = format!("{}.json", normalize_card_name(id));
        if let Some(route) = request.uri.strip_suffix(&normalized) {
            request.uri = format!("{route}{id}.json");
        }
        self.fetch_data(&request).await
    }

    /// A single deck reduced to its commanders and card names.
    pub async fn simplified_deck_by_id(&self, id: &str) -> Result<Option<SimplifiedDeck>> {
        Ok(self
            .deck_by_id(id)
            .await?
            .and_then(|deck| SimplifiedDeck::from_deck(&deck)))
    }

    /// Every ranked card list on a commander's page, in page order.
    pub async fn commander_cards(&self, card_name: &str) -> Result<Vec<CardList>> {
        let Some(data) = self.commander_data(card_name).await? else {
            return Ok(Vec::new());
        };
        Ok(data
            .pointer("/container/json_dict/cardlists")
            .map(CardList::from_cardlists)
            .unwrap_or_default())
    }

    async fn commander_list(&self, card_name: &str, tag: &str) -> Result<Option<CardList>> {
        Ok(self
            .commander_cards(card_name)
            .await?
            .into_iter()
            .find(|list| list.tag.as_deref() == Some(tag)))
    }

    tagged_lists! {
        new_cards => "newcards",
        high_synergy_cards => "highsynergycards",
        top_cards => "topcards",
        top_creatures => "creatures",
        top_instants => "instants",
        top_sorceries => "sorceries",
        /// Non-mana artifacts.
        top_artifacts => "utilityartifacts",
        top_mana_artifacts => "manaartifacts",
        top_enchantments => "enchantments",
        top_battles => "battles",
        top_planeswalkers => "planeswalkers",
        top_lands => "lands",
        top_utility_lands => "utilitylands",
    }

    /// Streams the names of the `n` most popular commanders over `timeframe`.
    pub fn top_commanders(
        &self,
        timeframe: Timeframe,
        n: usize,
    ) -> impl Stream<Item = Result<String>> + '_ {
        top::commander_names(self, timeframe.page(), n)
    }

    /// Streams the names of the `n` most popular commanders of a color
    /// identity, given as color letters (`["w", "u"]` for azorius).
    ///
    /// Fails before anything is requested if the colors don't name an
    /// archetype.
    pub fn top_commanders_by_color<I, S>(
        &self,
        colors: I,
        n: usize,
    ) -> Result<impl Stream<Item = Result<String>> + '_>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let archetype = colors::archetype(colors)?;
        Ok(top::commander_names(
            self,
            &format!("commanders/{archetype}"),
            n,
        ))
    }
}

#[allow(dead_code)]
fn _assert(client: &Edhrec) {
    fn is_send<T: Send>(_: T) {}
    is_send(client.commander_data(""));
    is_send(client.average_deck("", None));
    is_send(client.commander_decklists("", None));
    is_send(client.top_commanders(Timeframe::Week, 1));
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn session_cookie_strips_marker() {
        assert_eq!(session_cookie("userState=abc%3D"), "userState=abc%3D");
        assert_eq!(session_cookie("abc%3D"), "userState=abc%3D");
        assert_eq!(session_cookie("userStateless"), "userState=userStateless");
    }

    #[test]
    fn links() {
        let client = Edhrec::builder()
            .base_url("https://edhrec.test/")
            .build()
            .unwrap();
        assert_eq!(
            client.card_link("Urza's Saga"),
            "https://edhrec.test/cards/urzas-saga"
        );
        assert_eq!(
            client.combo_url("/combos/gur/380-703-2557"),
            "https://edhrec.test/combos/gur/380-703-2557"
        );
        assert_eq!(
            client.combo_url("combos/gur/380-703-2557"),
            "https://edhrec.test/combos/gur/380-703-2557"
        );
    }

    #[test]
    fn invalid_base_url_with_cookies() {
        let err = Edhrec::builder()
            .base_url("not a url")
            .cookies("abc")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }

    #[test]
    fn invalid_urls_without_cookies() {
        let err = Edhrec::builder().base_url("not a url").build().unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
        let err = Edhrec::builder()
            .json_url("json.edhrec.com")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }

    #[test]
    fn user_agents_are_browser_strings() {
        for _ in 0..10 {
            assert!(random_user_agent().starts_with("Mozilla/5.0"));
        }
    }

    #[test]
    fn invalid_colors_fail_before_any_request() {
        // nothing listens here, any request would fail with a reqwest error
        let client = Edhrec::builder()
            .base_url("http://127.0.0.1:9")
            .json_url("http://127.0.0.1:9")
            .build()
            .unwrap();
        let err = client
            .top_commanders_by_color(["x"], 10)
            .err()
            .unwrap();
        assert!(matches!(err, Error::UnknownColors { .. }));
    }
}
