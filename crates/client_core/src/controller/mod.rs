//! Controller layer: application state, UI events, and orchestration of
//! user actions against the marketplace backend.

pub mod events;
pub mod forms;
pub mod state;

use std::{sync::Arc, time::Instant};

use catalog::{CatalogSubscription, FilterPatch};
use crossbeam_channel::{unbounded, Receiver, Sender};
use shared::{
    domain::{CardNumber, Listing, PackName, Template},
    protocol::CardRef,
};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use crate::{
    config::Settings,
    error::ClientError,
    freshness::{RequestGeneration, RequestTicket, SearchDebouncer},
    ClientEvent, ClientResult, MarketplaceApi,
};

pub use events::{Toast, ToastKind, UiError, UiErrorCategory, UiErrorContext, UiEvent};
pub use forms::{parse_price, PasswordRequirements};
pub use state::{AppState, View};

pub type UiResult<T = ()> = Result<T, UiError>;

/// Drives [`AppState`] from user actions and reports outcomes as [`UiEvent`]s.
///
/// Every operation surfaces its own failure as an error toast; the returned
/// `UiError` is informational for callers that want to branch on it.
pub struct MarketplaceController<A: MarketplaceApi> {
    api: Arc<A>,
    settings: Settings,
    state: AppState,
    ui_tx: Sender<UiEvent>,
    ui_rx: Receiver<UiEvent>,
    client_events: broadcast::Receiver<ClientEvent>,
    catalog_generation: RequestGeneration,
    listings_generation: RequestGeneration,
    debouncer: SearchDebouncer,
}

impl<A: MarketplaceApi> MarketplaceController<A> {
    pub fn new(api: Arc<A>, settings: Settings) -> Self {
        let (ui_tx, ui_rx) = unbounded();
        let client_events = api.subscribe_events();
        let debouncer = SearchDebouncer::new(settings.search_debounce());
        Self {
            api,
            settings,
            state: AppState::default(),
            ui_tx,
            ui_rx,
            client_events,
            catalog_generation: RequestGeneration::new(),
            listings_generation: RequestGeneration::new(),
            debouncer,
        }
    }

    pub fn api(&self) -> Arc<A> {
        Arc::clone(&self.api)
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn events(&self) -> Receiver<UiEvent> {
        self.ui_rx.clone()
    }

    pub fn subscribe_catalog(&mut self) -> CatalogSubscription {
        self.state.catalog.subscribe()
    }

    pub fn search_visible(&self) -> bool {
        self.state.view.shows_search()
    }

    fn emit(&self, event: UiEvent) {
        if self.ui_tx.send(event).is_err() {
            debug!("ui event dropped; no receiver");
        }
    }

    fn toast_success(&self, message: &str) {
        self.emit(UiEvent::Toast(Toast::success(message)));
    }

    fn navigate(&mut self, view: View) {
        if self.state.view != view {
            debug!(from = %self.state.view, to = %view, "view changed");
        }
        self.state.view = view;
        self.emit(UiEvent::ViewChanged(view));
    }

    fn reject(&self, context: UiErrorContext, message: &str) -> UiError {
        let error = UiError::validation(context, message);
        self.emit(UiEvent::Toast(Toast::error(error.message())));
        error
    }

    fn require_login(&self, context: UiErrorContext, message: &str) -> UiResult {
        if self.state.is_logged_in() {
            return Ok(());
        }
        let error = UiError::login_required(context, message);
        self.emit(UiEvent::Toast(Toast::error(error.message())));
        Err(error)
    }

    /// Reports a backend failure. With `prefer_server` the backend's own
    /// message wins over `fallback`.
    fn fail(
        &mut self,
        context: UiErrorContext,
        error: ClientError,
        fallback: &str,
        prefer_server: bool,
    ) -> UiError {
        if error.is_unauthorized() {
            self.expire_session();
        }

        let server_message = error.to_string();
        let message = if prefer_server && !server_message.trim().is_empty() {
            server_message
        } else {
            fallback.to_string()
        };
        warn!(?context, error = %error, "marketplace operation failed");

        let ui_error = UiError::from_client_error(context, &error, message);
        self.emit(UiEvent::Toast(Toast::error(ui_error.message())));
        ui_error
    }

    fn expire_session(&mut self) {
        if self.state.user.take().is_none() {
            return;
        }
        info!("session expired; returning to catalog");
        self.state.collection.clear();
        self.emit(UiEvent::SessionChanged(None));
        self.state.catalog.reset();
        self.navigate(View::Templates);
    }

    /// Applies session notifications broadcast by the API client.
    pub fn pump_client_events(&mut self) -> usize {
        let mut handled = 0;
        loop {
            match self.client_events.try_recv() {
                Ok(ClientEvent::SessionExpired) => {
                    self.expire_session();
                    handled += 1;
                }
                Ok(_) => handled += 1,
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "client event receiver lagged");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        handled
    }

    pub async fn show_view(&mut self, view: View) -> UiResult {
        self.navigate(view);
        match view {
            View::Templates => {
                self.debouncer.flush();
                self.state.catalog.reset();
                self.load_templates().await
            }
            View::Packs => self.load_packs().await,
            View::Collection => self.load_collection().await,
            View::Listings | View::PackOpening | View::Login | View::Register => Ok(()),
        }
    }

    /// Signs in and opens the catalog.
    pub async fn login(&mut self, email: &str, password: &str) -> UiResult {
        self.sign_in(email, password).await?;
        // Catalog failures are reported on their own.
        let _ = self.show_view(View::Templates).await;
        Ok(())
    }

    /// Signs in without leaving the current view.
    pub async fn sign_in(&mut self, email: &str, password: &str) -> UiResult {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(self.reject(UiErrorContext::Login, "Please enter your email and password"));
        }

        self.emit(UiEvent::Loading(true));
        let result = self.api.login(email, password).await;
        self.emit(UiEvent::Loading(false));

        match result {
            Ok(profile) => {
                info!(username = %profile.username, "login succeeded");
                self.state.user = Some(profile.clone());
                self.emit(UiEvent::SessionChanged(Some(profile)));
                self.toast_success("Login successful!");
                Ok(())
            }
            Err(err) => Err(self.fail(UiErrorContext::Login, err, "Login failed", true)),
        }
    }

    pub async fn register(
        &mut self,
        username: &str,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> UiResult {
        if password != confirm_password {
            return Err(self.reject(UiErrorContext::Register, "Passwords do not match"));
        }

        self.emit(UiEvent::Loading(true));
        let result = self.api.register(username.trim(), email.trim(), password).await;
        self.emit(UiEvent::Loading(false));

        match result {
            Ok(_) => {
                self.toast_success("Account created successfully! Please log in.");
                self.show_view(View::Login).await
            }
            Err(err) => Err(self.fail(UiErrorContext::Register, err, "Registration failed", true)),
        }
    }

    pub async fn logout(&mut self) -> UiResult {
        if let Err(err) = self.api.logout().await {
            warn!(error = %err, "logout request failed; clearing local session anyway");
        }
        self.state.user = None;
        self.state.collection.clear();
        self.emit(UiEvent::SessionChanged(None));
        self.toast_success("Logged out successfully");
        let _ = self.show_view(View::Templates).await;
        Ok(())
    }

    /// Starts a catalog fetch; only the newest ticket's result is applied.
    pub fn begin_templates_load(&self) -> RequestTicket {
        self.catalog_generation.issue()
    }

    /// Returns `Ok(false)` when the response was superseded by a newer load.
    pub fn apply_templates(
        &mut self,
        ticket: RequestTicket,
        result: ClientResult<Vec<Template>>,
    ) -> UiResult<bool> {
        if !self.catalog_generation.is_current(ticket) {
            debug!(?ticket, "discarding stale catalog response");
            return Ok(false);
        }

        match result {
            Ok(templates) => {
                self.state.catalog.load_snapshot(templates);
                Ok(true)
            }
            Err(err) => Err(self.fail(
                UiErrorContext::Catalog,
                err,
                "Failed to load card templates",
                false,
            )),
        }
    }

    pub async fn load_templates(&mut self) -> UiResult {
        let ticket = self.begin_templates_load();
        let result = self.api.templates(self.settings.default_sort).await;
        self.apply_templates(ticket, result).map(|_| ())
    }

    /// Records a keystroke; the query reaches the catalog once input settles.
    pub fn type_search(&mut self, query: &str) {
        self.type_search_at(query, Instant::now());
    }

    pub fn type_search_at(&mut self, query: &str, now: Instant) {
        self.debouncer.input(query, now);
    }

    pub fn poll_search(&mut self) -> bool {
        self.poll_search_at(Instant::now())
    }

    pub fn poll_search_at(&mut self, now: Instant) -> bool {
        match self.debouncer.due(now) {
            Some(query) => {
                self.state.catalog.set_search(query);
                true
            }
            None => false,
        }
    }

    /// Applies the pending query immediately, as on pressing enter.
    pub fn submit_search(&mut self) -> bool {
        match self.debouncer.flush() {
            Some(query) => {
                self.state.catalog.set_search(query);
                true
            }
            None => false,
        }
    }

    /// Waits out the debounce window and applies the pending query.
    pub async fn settle_search(&mut self) -> bool {
        if let Some(deadline) = self.debouncer.deadline() {
            tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await;
        }
        self.poll_search()
    }

    pub fn set_filters(&mut self, patch: FilterPatch) {
        self.state.catalog.set_filters(patch);
    }

    pub fn clear_filters(&mut self) {
        self.state.catalog.clear_filters();
    }

    pub fn next_page(&mut self) -> bool {
        self.state.catalog.next_page()
    }

    pub fn previous_page(&mut self) -> bool {
        self.state.catalog.previous_page()
    }

    pub fn go_to_page(&mut self, page: usize) -> bool {
        self.state.catalog.go_to_page(page)
    }

    pub async fn select_template(&mut self, name: &str) -> UiResult {
        let Some(template) = self.state.catalog.find(name).cloned() else {
            return Err(self.reject(UiErrorContext::Listings, "Card not found in catalog"));
        };
        self.state.selected_template = Some(template);
        self.state.listings.clear();
        self.navigate(View::Listings);
        self.load_listings().await
    }

    pub fn begin_listings_load(&self) -> RequestTicket {
        self.listings_generation.issue()
    }

    pub fn apply_listings(
        &mut self,
        ticket: RequestTicket,
        result: ClientResult<Vec<Listing>>,
    ) -> UiResult<bool> {
        if !self.listings_generation.is_current(ticket) {
            debug!(?ticket, "discarding stale listings response");
            return Ok(false);
        }

        match result {
            Ok(listings) => {
                let card_name = self
                    .state
                    .selected_template
                    .as_ref()
                    .map(|template| template.name().to_string())
                    .unwrap_or_default();
                self.state.listings = listings.clone();
                self.emit(UiEvent::ListingsUpdated { card_name, listings });
                Ok(true)
            }
            Err(err) => Err(self.fail(
                UiErrorContext::Listings,
                err,
                "Failed to load listings",
                false,
            )),
        }
    }

    pub async fn load_listings(&mut self) -> UiResult {
        let Some(card_name) = self
            .state
            .selected_template
            .as_ref()
            .map(|template| template.name().to_string())
        else {
            return Ok(());
        };

        let ticket = self.begin_listings_load();
        self.emit(UiEvent::Loading(true));
        let result = self.api.listings(&card_name).await;
        self.emit(UiEvent::Loading(false));
        self.apply_listings(ticket, result).map(|_| ())
    }

    pub async fn buy_card(&mut self, name: &str, number: i64) -> UiResult {
        self.require_login(UiErrorContext::Purchase, "Please log in to purchase cards")?;

        self.emit(UiEvent::Loading(true));
        let result = self.api.buy_card(&CardRef::new(name, number)).await;
        self.emit(UiEvent::Loading(false));

        match result {
            Ok(_) => {
                self.refresh_balance().await;
                self.toast_success("Card purchased successfully!");
                self.load_listings().await
            }
            Err(err) => Err(self.fail(UiErrorContext::Purchase, err, "Purchase failed", true)),
        }
    }

    /// Re-reads the balance for the logged-in user. Failures are only logged.
    pub async fn refresh_balance(&mut self) {
        if !self.state.is_logged_in() {
            return;
        }
        match self.api.balance().await {
            Ok(balance) => {
                if let Some(user) = self.state.user.as_mut() {
                    user.balance = balance;
                }
                self.emit(UiEvent::BalanceUpdated(balance));
            }
            Err(err) => {
                warn!(error = %err, "failed to refresh balance");
                if err.is_unauthorized() {
                    self.expire_session();
                }
            }
        }
    }

    pub async fn load_packs(&mut self) -> UiResult {
        self.emit(UiEvent::Loading(true));
        let result = self.api.packs().await;
        self.emit(UiEvent::Loading(false));

        match result {
            Ok(packs) => {
                self.state.packs = packs.clone();
                self.emit(UiEvent::PacksUpdated(packs));
                Ok(())
            }
            Err(err) => Err(self.fail(UiErrorContext::Packs, err, "Failed to load packs", false)),
        }
    }

    pub async fn open_pack(&mut self, pack_name: &str) -> UiResult {
        self.require_login(UiErrorContext::Packs, "Please log in to purchase packs")?;

        self.emit(UiEvent::Loading(true));
        let result = self.api.open_pack(pack_name).await;
        self.emit(UiEvent::Loading(false));

        match result {
            Ok(cards) => {
                self.refresh_balance().await;
                self.toast_success("Pack purchased successfully!");
                self.state.current_pack = Some(PackName::from(pack_name));
                self.state.pack_results = cards.clone();
                self.navigate(View::PackOpening);
                self.emit(UiEvent::PackOpened {
                    pack_name: pack_name.to_string(),
                    cards,
                });
                Ok(())
            }
            Err(err) => Err(self.fail(UiErrorContext::Packs, err, "Failed to open pack", true)),
        }
    }

    pub fn close_pack(&mut self) {
        self.state.current_pack = None;
        self.state.pack_results.clear();
        self.navigate(View::Packs);
    }

    pub async fn load_collection(&mut self) -> UiResult {
        if !self.state.is_logged_in() {
            self.navigate(View::Login);
        }
        self.require_login(UiErrorContext::Collection, "Please log in to view your collection")?;

        match self.api.collection().await {
            Ok(cards) => {
                self.state.collection = cards.clone();
                self.emit(UiEvent::CollectionUpdated(cards));
                Ok(())
            }
            Err(err) => Err(self.fail(
                UiErrorContext::Collection,
                err,
                "Failed to load collection",
                false,
            )),
        }
    }

    fn drop_from_collection(&mut self, name: &str, number: i64) {
        if self.state.remove_from_collection(name, CardNumber(number)) {
            self.emit(UiEvent::CollectionUpdated(self.state.collection.clone()));
        }
    }

    /// Lists an owned card on the market at the price typed by the user.
    pub async fn sell_card(&mut self, name: &str, number: i64, raw_price: &str) -> UiResult {
        self.require_login(UiErrorContext::Sell, "Please log in to sell cards")?;
        let Some(price) = parse_price(raw_price) else {
            return Err(self.reject(UiErrorContext::Sell, "Please enter a valid price"));
        };

        self.emit(UiEvent::Loading(true));
        let result = self.api.list_card(&CardRef::new(name, number), price).await;
        self.emit(UiEvent::Loading(false));

        match result {
            Ok(_) => {
                self.toast_success("Card listed for sale successfully!");
                self.drop_from_collection(name, number);
                let _ = self.load_collection().await;
                Ok(())
            }
            Err(err) => Err(self.fail(
                UiErrorContext::Sell,
                err,
                "Failed to list card for sale",
                true,
            )),
        }
    }

    pub async fn quicksell_card(&mut self, name: &str, number: i64) -> UiResult {
        self.require_login(UiErrorContext::Sell, "Please log in to sell cards")?;

        self.emit(UiEvent::Loading(true));
        let result = self.api.quicksell_card(&CardRef::new(name, number)).await;
        self.emit(UiEvent::Loading(false));

        match result {
            Ok(_) => {
                self.toast_success("Card sold successfully!");
                self.drop_from_collection(name, number);
                self.refresh_balance().await;
                let _ = self.load_collection().await;
                Ok(())
            }
            Err(err) => Err(self.fail(UiErrorContext::Sell, err, "Failed to sell card", true)),
        }
    }
}

#[cfg(test)]
#[path = "../tests/controller_tests.rs"]
mod tests;
