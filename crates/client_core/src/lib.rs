use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use reqwest::{
    cookie::Jar,
    header::{HeaderValue, CONTENT_TYPE},
    Client, RequestBuilder, Response, StatusCode,
};
use serde::{de::DeserializeOwned, Deserialize};
use shared::{
    domain::{Card, CardInfo, Listing, Pack, Template, UserProfile},
    error::ApiError,
    protocol::{
        paths, CardNameQuery, CardRef, LoginQuery, PriceQuery, RegisterForm, SortBy,
        TemplateQuery,
    },
};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use url::Url;

pub mod config;
pub mod controller;
pub mod error;
pub mod freshness;

pub use config::{load_settings, Settings};
pub use controller::MarketplaceController;
pub use error::ClientError;

pub type ClientResult<T> = std::result::Result<T, ClientError>;

const SESSION_COOKIE: &str = "Authorization";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// The backend rejected the session cookie; local auth state was cleared.
    SessionExpired,
    LoggedIn(UserProfile),
    LoggedOut,
}

/// Operations the marketplace backend exposes.
#[async_trait]
pub trait MarketplaceApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> ClientResult<UserProfile>;
    async fn register(&self, username: &str, email: &str, password: &str) -> ClientResult<String>;
    async fn logout(&self) -> ClientResult<()>;
    fn is_authenticated(&self) -> bool;
    async fn balance(&self) -> ClientResult<i64>;
    async fn collection(&self) -> ClientResult<Vec<Card>>;
    async fn templates(&self, sort_by: SortBy) -> ClientResult<Vec<Template>>;
    async fn template(&self, template_id: i64) -> ClientResult<CardInfo>;
    async fn cards_by_name(&self, name: &str) -> ClientResult<Vec<Card>>;
    async fn listings(&self, card_name: &str) -> ClientResult<Vec<Listing>>;
    async fn list_card(&self, card: &CardRef, price: i64) -> ClientResult<String>;
    async fn buy_card(&self, card: &CardRef) -> ClientResult<String>;
    async fn quicksell_card(&self, card: &CardRef) -> ClientResult<String>;
    async fn packs(&self) -> ClientResult<Vec<Pack>>;
    async fn open_pack(&self, pack_name: &str) -> ClientResult<Vec<Card>>;
    fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent>;
}

/// Card lists arrive either bare or wrapped in `{"cards": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum CardsPayload {
    List(Vec<Card>),
    Wrapped { cards: Vec<Card> },
}

impl From<CardsPayload> for Vec<Card> {
    fn from(value: CardsPayload) -> Self {
        match value {
            CardsPayload::List(cards) | CardsPayload::Wrapped { cards } => cards,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PacksPayload {
    List(Vec<Pack>),
    Wrapped { data: Vec<Pack> },
}

/// HTTP client for the marketplace backend, authenticated by session cookie.
pub struct MarketClient {
    http: Client,
    base_url: Url,
    cookies: Arc<Jar>,
    authenticated: AtomicBool,
    events: broadcast::Sender<ClientEvent>,
}

impl MarketClient {
    pub fn new(base_url: &str) -> ClientResult<Self> {
        Self::with_timeout(base_url, Settings::default().request_timeout())
    }

    pub fn from_settings(settings: &Settings) -> ClientResult<Self> {
        Self::with_timeout(&settings.base_url, settings.request_timeout())
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> ClientResult<Self> {
        let base_url =
            Url::parse(base_url).map_err(|_| ClientError::InvalidUrl(base_url.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }

        let cookies = Arc::new(Jar::default());
        let http = Client::builder()
            .cookie_provider(Arc::clone(&cookies))
            .timeout(timeout)
            .build()?;
        let (events, _) = broadcast::channel(64);

        Ok(Self {
            http,
            base_url,
            cookies,
            authenticated: AtomicBool::new(false),
            events,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, base: &[&str], tail: &[&str]) -> ClientResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(base)
            .extend(tail);
        Ok(url)
    }

    fn card_endpoint(&self, base: &[&str], card: &CardRef) -> ClientResult<Url> {
        let number = card.number.to_string();
        self.endpoint(base, &[card.name.as_str(), number.as_str()])
    }

    fn clear_session(&self) {
        self.authenticated.store(false, Ordering::Release);
        self.cookies.add_cookie_str(
            &format!("{SESSION_COOKIE}=; Max-Age=0; Path=/"),
            &self.base_url,
        );
    }

    async fn execute(&self, request: RequestBuilder) -> ClientResult<Response> {
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        debug!(status = status.as_u16(), path = response.url().path(), "backend response");

        if status == StatusCode::UNAUTHORIZED {
            warn!("backend rejected session; clearing local auth state");
            self.clear_session();
            let _ = self.events.send(ClientEvent::SessionExpired);
            return Err(ClientError::Unauthorized);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = ApiError::from_response(status.as_u16(), &body);
            warn!(status = status.as_u16(), message = %error.message, "backend request failed");
            return Err(ClientError::from_api(status.as_u16(), error));
        }

        Ok(response)
    }

    async fn fetch_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        let response = self.execute(request).await?;
        let bytes = response.bytes().await.map_err(transport)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn fetch_message(&self, request: RequestBuilder) -> ClientResult<String> {
        let response = self.execute(request).await?;
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value: &HeaderValue| value.to_str().ok())
            .is_some_and(|value| value.contains("application/json"));
        let body = response.text().await.map_err(transport)?;
        Ok(response_message(&body, is_json))
    }
}

/// Request URLs can carry credentials in the query string.
fn transport(error: reqwest::Error) -> ClientError {
    ClientError::Transport(error.without_url())
}

/// Human-readable text of a successful, non-data response.
fn response_message(body: &str, is_json: bool) -> String {
    if !is_json {
        return body.to_string();
    }
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::String(text)) => text,
        Ok(serde_json::Value::Object(map)) => map
            .get("message")
            .and_then(|message| message.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string()),
        _ => body.to_string(),
    }
}

#[async_trait]
impl MarketplaceApi for MarketClient {
    async fn login(&self, email: &str, password: &str) -> ClientResult<UserProfile> {
        let url = self.endpoint(paths::LOGIN, &[])?;
        let profile: UserProfile = self
            .fetch_json(self.http.get(url).query(&LoginQuery {
                email: email.to_string(),
                password: password.to_string(),
            }))
            .await?;

        self.authenticated.store(true, Ordering::Release);
        info!(username = %profile.username, "logged in");
        let _ = self.events.send(ClientEvent::LoggedIn(profile.clone()));
        Ok(profile)
    }

    async fn register(&self, username: &str, email: &str, password: &str) -> ClientResult<String> {
        let url = self.endpoint(paths::REGISTER, &[])?;
        let message = self
            .fetch_message(self.http.post(url).form(&RegisterForm {
                username: username.to_string(),
                email: email.to_string(),
                password: password.to_string(),
            }))
            .await?;
        info!(%username, "registered account");
        Ok(message)
    }

    async fn logout(&self) -> ClientResult<()> {
        let result = match self.endpoint(paths::LOGOUT, &[]) {
            Ok(url) => self.execute(self.http.get(url)).await.map(|_| ()),
            Err(err) => Err(err),
        };
        self.clear_session();
        let _ = self.events.send(ClientEvent::LoggedOut);
        result
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Acquire)
    }

    async fn balance(&self) -> ClientResult<i64> {
        let url = self.endpoint(paths::BALANCE, &[])?;
        self.fetch_json(self.http.get(url)).await
    }

    async fn collection(&self) -> ClientResult<Vec<Card>> {
        let url = self.endpoint(paths::COLLECTION, &[])?;
        let payload: CardsPayload = self.fetch_json(self.http.get(url)).await?;
        Ok(payload.into())
    }

    async fn templates(&self, sort_by: SortBy) -> ClientResult<Vec<Template>> {
        let url = self.endpoint(paths::TEMPLATES, &[])?;
        let templates: Vec<Template> = self
            .fetch_json(self.http.get(url).query(&TemplateQuery { sort_by }))
            .await?;
        debug!(count = templates.len(), %sort_by, "fetched card templates");
        Ok(templates)
    }

    async fn template(&self, template_id: i64) -> ClientResult<CardInfo> {
        let id = template_id.to_string();
        let url = self.endpoint(paths::TEMPLATES, &[id.as_str()])?;
        self.fetch_json(self.http.get(url)).await
    }

    async fn cards_by_name(&self, name: &str) -> ClientResult<Vec<Card>> {
        let url = self.endpoint(paths::CARDS, &[])?;
        self.fetch_json(self.http.get(url).query(&CardNameQuery {
            name: name.to_string(),
        }))
        .await
    }

    async fn listings(&self, card_name: &str) -> ClientResult<Vec<Listing>> {
        let url = self.endpoint(paths::LISTINGS, &[card_name])?;
        self.fetch_json(self.http.get(url)).await
    }

    async fn list_card(&self, card: &CardRef, price: i64) -> ClientResult<String> {
        let url = self.card_endpoint(paths::LIST_CARD, card)?;
        let message = self
            .fetch_message(self.http.post(url).query(&PriceQuery { price }))
            .await?;
        info!(card = %card.name, number = %card.number, price, "card listed");
        Ok(message)
    }

    async fn buy_card(&self, card: &CardRef) -> ClientResult<String> {
        let url = self.card_endpoint(paths::BUY_CARD, card)?;
        let message = self.fetch_message(self.http.put(url)).await?;
        info!(card = %card.name, number = %card.number, "card bought");
        Ok(message)
    }

    async fn quicksell_card(&self, card: &CardRef) -> ClientResult<String> {
        let url = self.card_endpoint(paths::QUICKSELL, card)?;
        let message = self.fetch_message(self.http.post(url)).await?;
        info!(card = %card.name, number = %card.number, "card quick-sold");
        Ok(message)
    }

    async fn packs(&self) -> ClientResult<Vec<Pack>> {
        let url = self.endpoint(paths::PACKS, &[])?;
        let payload: PacksPayload = self.fetch_json(self.http.get(url)).await?;
        Ok(match payload {
            PacksPayload::List(packs) | PacksPayload::Wrapped { data: packs } => packs,
        })
    }

    async fn open_pack(&self, pack_name: &str) -> ClientResult<Vec<Card>> {
        let url = self.endpoint(paths::PACKS, &[pack_name])?;
        let payload: CardsPayload = self.fetch_json(self.http.get(url)).await?;
        let cards: Vec<Card> = payload.into();
        info!(pack = %pack_name, cards = cards.len(), "pack opened");
        Ok(cards)
    }

    fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
