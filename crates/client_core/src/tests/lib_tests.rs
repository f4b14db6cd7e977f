use std::collections::HashMap;

use super::*;
use axum::{
    extract::{Form, Path, Query, RawQuery, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use shared::{domain::CardNumber, error::ErrorCode};
use tokio::{net::TcpListener, sync::Mutex};

const SESSION_TOKEN: &str = "token-123";

#[derive(Clone, Default)]
struct BackendState {
    sort_requests: Arc<Mutex<Vec<String>>>,
    listing_requests: Arc<Mutex<Vec<String>>>,
    registrations: Arc<Mutex<Vec<HashMap<String, String>>>>,
    list_prices: Arc<Mutex<Vec<(String, i64, String)>>>,
    template_ids: Arc<Mutex<Vec<i64>>>,
    name_queries: Arc<Mutex<Vec<(String, String)>>>,
    logout_fails: Arc<AtomicBool>,
}

fn card_info(name: &str) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "faction": "Neutral",
        "rarity": "Legendary",
        "type": "Unit",
        "power": 15,
        "provision": 10,
        "imageUrl": "https://img.example/geralt.png"
    })
}

fn owned_card(name: &str, number: i64) -> serde_json::Value {
    serde_json::json!({ "cardTemplate": card_info(name), "number": number })
}

fn has_session(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.contains(&format!("Authorization={SESSION_TOKEN}")))
}

async fn login(Query(params): Query<HashMap<String, String>>) -> axum::response::Response {
    if params.get("password").map(String::as_str) != Some("Witcher3Wild") {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "message": "Invalid credentials" })),
        )
            .into_response();
    }
    let cookie = format!("Authorization={SESSION_TOKEN}; Path=/; HttpOnly");
    (
        [(header::SET_COOKIE, cookie)],
        Json(serde_json::json!({
            "username": "geralt",
            "email": params.get("email").cloned().unwrap_or_default(),
            "balance": 1200
        })),
    )
        .into_response()
}

async fn logout(State(state): State<BackendState>) -> axum::response::Response {
    if state.logout_fails.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Session store unavailable").into_response();
    }
    "Logged out".into_response()
}

async fn balance(headers: HeaderMap) -> axum::response::Response {
    if has_session(&headers) {
        Json(1500_i64).into_response()
    } else {
        StatusCode::UNAUTHORIZED.into_response()
    }
}

async fn register(
    State(state): State<BackendState>,
    Form(form): Form<HashMap<String, String>>,
) -> &'static str {
    state.registrations.lock().await.push(form);
    "User registered"
}

async fn templates(
    State(state): State<BackendState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    state
        .sort_requests
        .lock()
        .await
        .push(params.get("sortBy").cloned().unwrap_or_default());
    Json(serde_json::json!([
        { "card": card_info("Geralt of Rivia"), "count": 3 },
        { "card": card_info("Yennefer"), "count": 0 }
    ]))
}

async fn template_by_id(
    State(state): State<BackendState>,
    Path(id): Path<i64>,
) -> Json<serde_json::Value> {
    state.template_ids.lock().await.push(id);
    Json(card_info("Geralt of Rivia"))
}

async fn cards_by_name(
    State(state): State<BackendState>,
    RawQuery(raw): RawQuery,
    Query(params): Query<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    let name = params.get("name").cloned().unwrap_or_default();
    state
        .name_queries
        .lock()
        .await
        .push((raw.unwrap_or_default(), name.clone()));
    Json(serde_json::json!([owned_card(&name, 3), owned_card(&name, 8)]))
}

async fn listings(
    State(state): State<BackendState>,
    Path(name): Path<String>,
) -> Json<serde_json::Value> {
    state.listing_requests.lock().await.push(name.clone());
    Json(serde_json::json!([
        { "seller": null, "card": owned_card(&name, 1), "price": 300 },
        { "seller": { "username": "ciri" }, "card": owned_card(&name, 2), "price": 250 }
    ]))
}

async fn buy(Path((_name, _number)): Path<(String, i64)>) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "message": "Insufficient funds" })),
    )
        .into_response()
}

async fn quicksell(Path((_name, _number)): Path<(String, i64)>) -> axum::response::Response {
    (StatusCode::CONFLICT, "Card not owned").into_response()
}

async fn list_card(
    State(state): State<BackendState>,
    Path((name, number)): Path<(String, i64)>,
    Query(params): Query<HashMap<String, String>>,
) -> axum::response::Response {
    let price = params.get("price").cloned().unwrap_or_default();
    state.list_prices.lock().await.push((name, number, price));
    if number == 0 {
        return StatusCode::BAD_REQUEST.into_response();
    }
    Json(serde_json::json!({ "message": "Card listed" })).into_response()
}

async fn packs() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "data": [{ "name": "Starter", "price": 100, "numberOfCards": 5 }]
    }))
}

async fn open_pack(Path(name): Path<String>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "cards": [owned_card(&format!("{name} Hero"), 9)] }))
}

async fn spawn_backend() -> std::io::Result<(String, BackendState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = BackendState::default();
    let app = Router::new()
        .route("/user/login", get(login))
        .route("/user/logout", get(logout))
        .route("/user/balance", get(balance))
        .route("/user/register", post(register))
        .route("/cards", get(cards_by_name))
        .route("/cards/templates", get(templates))
        .route("/cards/templates/:id", get(template_by_id))
        .route("/cards/listings/:name", get(listings))
        .route("/cards/buy/:name/:number", put(buy))
        .route("/cards/quicksell/:name/:number", post(quicksell))
        .route("/cards/list/:name/:number", post(list_card))
        .route("/pack", get(packs))
        .route("/pack/:name", get(open_pack))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), state))
}

#[tokio::test]
async fn login_cookie_authenticates_later_requests() {
    let (server_url, _state) = spawn_backend().await.expect("spawn server");
    let client = MarketClient::new(&server_url).expect("client");
    let mut events = client.subscribe_events();

    let profile = client
        .login("geralt@kaer.morhen", "Witcher3Wild")
        .await
        .expect("login");
    assert_eq!(profile.username, "geralt");
    assert_eq!(profile.balance, 1200);
    assert!(client.is_authenticated());
    assert_eq!(
        events.try_recv().expect("login event"),
        ClientEvent::LoggedIn(profile)
    );

    assert_eq!(client.balance().await.expect("balance"), 1500);
}

#[tokio::test]
async fn unauthorized_response_expires_session() {
    let (server_url, _state) = spawn_backend().await.expect("spawn server");
    let client = MarketClient::new(&server_url).expect("client");
    client
        .login("geralt@kaer.morhen", "Witcher3Wild")
        .await
        .expect("login");
    client.logout().await.expect("logout");
    assert!(!client.is_authenticated());

    let mut events = client.subscribe_events();
    let err = client.balance().await.expect_err("cookie cleared on logout");
    assert!(err.is_unauthorized());
    assert_eq!(err.to_string(), "Authentication failed");
    assert_eq!(
        events.try_recv().expect("expiry event"),
        ClientEvent::SessionExpired
    );
}

#[tokio::test]
async fn failed_logout_still_drops_session_cookie() {
    let (server_url, state) = spawn_backend().await.expect("spawn server");
    let client = MarketClient::new(&server_url).expect("client");
    client
        .login("geralt@kaer.morhen", "Witcher3Wild")
        .await
        .expect("login");
    assert_eq!(client.balance().await.expect("balance"), 1500);

    state.logout_fails.store(true, Ordering::SeqCst);
    let err = client.logout().await.expect_err("logout fails");
    assert_eq!(err.status(), Some(500));
    assert!(!client.is_authenticated());

    let err = client.balance().await.expect_err("cookie cleared locally");
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn rejected_login_is_unauthorized() {
    let (server_url, _state) = spawn_backend().await.expect("spawn server");
    let client = MarketClient::new(&server_url).expect("client");

    let err = client
        .login("geralt@kaer.morhen", "wrong")
        .await
        .expect_err("bad password");
    assert_eq!(err.status(), Some(401));
    assert!(!client.is_authenticated());
}

#[tokio::test]
async fn backend_error_bodies_become_messages() {
    let (server_url, state) = spawn_backend().await.expect("spawn server");
    let client = MarketClient::new(&server_url).expect("client");

    let err = client
        .buy_card(&CardRef::new("Geralt of Rivia", 4))
        .await
        .expect_err("insufficient funds");
    assert_eq!(err.to_string(), "Insufficient funds");
    assert_eq!(err.status(), Some(400));
    assert_eq!(err.code(), Some(ErrorCode::Validation));

    let err = client
        .quicksell_card(&CardRef::new("Geralt of Rivia", 4))
        .await
        .expect_err("not owned");
    assert_eq!(err.to_string(), "Card not owned");

    let err = client
        .list_card(&CardRef::new("Geralt of Rivia", 0), 250)
        .await
        .expect_err("empty error body");
    assert_eq!(err.to_string(), "HTTP error! status: 400");

    let message = client
        .list_card(&CardRef::new("Geralt of Rivia", 7), 250)
        .await
        .expect("listed");
    assert_eq!(message, "Card listed");

    let prices = state.list_prices.lock().await.clone();
    assert_eq!(
        prices.last(),
        Some(&("Geralt of Rivia".to_string(), 7, "250".to_string()))
    );
}

#[tokio::test]
async fn listing_names_are_percent_encoded() {
    let (server_url, state) = spawn_backend().await.expect("spawn server");
    let client = MarketClient::new(&server_url).expect("client");

    let listings = client.listings("Geralt of Rivia").await.expect("listings");
    assert_eq!(listings.len(), 2);
    assert!(listings[0].is_store_sale());
    assert_eq!(listings[1].seller_label(), "ciri");
    assert_eq!(listings[1].card.number, CardNumber(2));

    let seen = state.listing_requests.lock().await.clone();
    assert_eq!(seen, vec!["Geralt of Rivia".to_string()]);

    let url = client
        .endpoint(shared::protocol::paths::LISTINGS, &["Scoia'tael/Isengrim"])
        .expect("url");
    assert_eq!(url.path(), "/cards/listings/Scoia'tael%2FIsengrim");
}

#[test]
fn endpoints_keep_base_path_prefix() {
    let client = MarketClient::new("http://market.example/api/").expect("client");
    let url = client
        .card_endpoint(shared::protocol::paths::BUY_CARD, &CardRef::new("Triss Merigold", 12))
        .expect("url");
    assert_eq!(url.as_str(), "http://market.example/api/cards/buy/Triss%20Merigold/12");
}

#[test]
fn invalid_base_url_is_rejected() {
    assert!(matches!(
        MarketClient::new("not a url"),
        Err(ClientError::InvalidUrl(_))
    ));
}

#[tokio::test]
async fn templates_request_carries_sort_field() {
    let (server_url, state) = spawn_backend().await.expect("spawn server");
    let client = MarketClient::new(&server_url).expect("client");

    let templates = client.templates(SortBy::Power).await.expect("templates");
    assert_eq!(templates.len(), 2);
    assert_eq!(templates[0].name(), "Geralt of Rivia");
    assert_eq!(templates[0].count, 3);

    client.templates(SortBy::default()).await.expect("templates");
    let seen = state.sort_requests.lock().await.clone();
    assert_eq!(seen, vec!["power".to_string(), "name".to_string()]);
}

#[tokio::test]
async fn pack_payloads_accept_wrapped_shapes() {
    let (server_url, _state) = spawn_backend().await.expect("spawn server");
    let client = MarketClient::new(&server_url).expect("client");

    let packs = client.packs().await.expect("packs");
    assert_eq!(packs.len(), 1);
    assert_eq!(packs[0].number_of_cards, 5);
    assert_eq!(packs[0].drop_rates()[0].label(), "60.0%");

    let cards = client.open_pack("Starter").await.expect("open pack");
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].card_template.name, "Starter Hero");
}

#[tokio::test]
async fn register_posts_form_fields() {
    let (server_url, state) = spawn_backend().await.expect("spawn server");
    let client = MarketClient::new(&server_url).expect("client");

    let message = client
        .register("ciri", "ciri@zireael.dev", "Witcher3Wild")
        .await
        .expect("register");
    assert_eq!(message, "User registered");

    let forms = state.registrations.lock().await.clone();
    assert_eq!(forms.len(), 1);
    assert_eq!(forms[0].get("username").map(String::as_str), Some("ciri"));
    assert_eq!(forms[0].get("email").map(String::as_str), Some("ciri@zireael.dev"));
}

#[test]
fn success_messages_follow_content_type() {
    assert_eq!(response_message("\"Card bought\"", true), "Card bought");
    assert_eq!(response_message(r#"{"message":"Done"}"#, true), "Done");
    assert_eq!(response_message(r#"{"status":"ok"}"#, true), r#"{"status":"ok"}"#);
    assert_eq!(response_message("plain text", false), "plain text");
}

#[tokio::test]
async fn template_lookup_uses_numeric_segment() {
    let (server_url, state) = spawn_backend().await.expect("spawn server");
    let client = MarketClient::new(&server_url).expect("client");

    let card = client.template(42).await.expect("template");
    assert_eq!(card.name, "Geralt of Rivia");
    assert_eq!(card.card_type, "Unit");
    assert_eq!(state.template_ids.lock().await.clone(), vec![42]);
}

#[tokio::test]
async fn cards_by_name_encodes_query() {
    let (server_url, state) = spawn_backend().await.expect("spawn server");
    let client = MarketClient::new(&server_url).expect("client");

    let cards = client
        .cards_by_name("Dandelion & Zoltan")
        .await
        .expect("cards");
    assert_eq!(cards.len(), 2);
    assert_eq!(cards[1].number, CardNumber(8));

    let seen = state.name_queries.lock().await.clone();
    assert_eq!(
        seen,
        vec![(
            "name=Dandelion+%26+Zoltan".to_string(),
            "Dandelion & Zoltan".to_string()
        )]
    );
}
