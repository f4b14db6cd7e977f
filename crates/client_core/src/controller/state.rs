use catalog::CatalogStateEngine;
use shared::domain::{Card, CardNumber, Listing, Pack, PackName, Template, UserProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Templates,
    Listings,
    Packs,
    PackOpening,
    Collection,
    Login,
    Register,
}

impl View {
    pub fn as_str(self) -> &'static str {
        match self {
            View::Templates => "templates",
            View::Listings => "listings",
            View::Packs => "packs",
            View::PackOpening => "pack-opening",
            View::Collection => "collection",
            View::Login => "login",
            View::Register => "register",
        }
    }

    pub fn shows_search(self) -> bool {
        matches!(self, View::Templates | View::Listings)
    }
}

impl std::fmt::Display for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the client remembers between user actions.
#[derive(Default)]
pub struct AppState {
    pub view: View,
    pub user: Option<UserProfile>,
    pub catalog: CatalogStateEngine,
    pub selected_template: Option<Template>,
    pub listings: Vec<Listing>,
    pub packs: Vec<Pack>,
    pub collection: Vec<Card>,
    pub current_pack: Option<PackName>,
    pub pack_results: Vec<Card>,
}

impl AppState {
    pub fn is_logged_in(&self) -> bool {
        self.user.is_some()
    }

    pub fn balance(&self) -> Option<i64> {
        self.user.as_ref().map(|user| user.balance)
    }

    /// Drops a sold or listed card from the cached collection.
    pub fn remove_from_collection(&mut self, name: &str, number: CardNumber) -> bool {
        let before = self.collection.len();
        self.collection.retain(|card| !card.matches(name, number));
        self.collection.len() != before
    }
}
