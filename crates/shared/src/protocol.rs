use serde::{Deserialize, Serialize};

use crate::domain::{CardName, CardNumber};

/// Template ordering the backend accepts for `sortBy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    Faction,
    Rarity,
    Power,
    #[default]
    Name,
    Category,
    Set,
    Type,
}

impl SortBy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Faction => "faction",
            Self::Rarity => "rarity",
            Self::Power => "power",
            Self::Name => "name",
            Self::Category => "category",
            Self::Set => "set",
            Self::Type => "type",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "faction" => Some(Self::Faction),
            "rarity" => Some(Self::Rarity),
            "power" => Some(Self::Power),
            "name" => Some(Self::Name),
            "category" => Some(Self::Category),
            "set" => Some(Self::Set),
            "type" => Some(Self::Type),
            _ => None,
        }
    }
}

impl std::fmt::Display for SortBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateQuery {
    pub sort_by: SortBy,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginQuery {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceQuery {
    pub price: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CardNameQuery {
    pub name: String,
}

/// Identifies one owned card in commerce requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CardRef {
    pub name: CardName,
    pub number: CardNumber,
}

impl CardRef {
    pub fn new(name: impl Into<String>, number: i64) -> Self {
        Self {
            name: CardName(name.into()),
            number: CardNumber(number),
        }
    }
}

/// Backend endpoint paths, relative to the configured base URL.
pub mod paths {
    pub const LOGIN: &[&str] = &["user", "login"];
    pub const REGISTER: &[&str] = &["user", "register"];
    pub const LOGOUT: &[&str] = &["user", "logout"];
    pub const BALANCE: &[&str] = &["user", "balance"];
    pub const COLLECTION: &[&str] = &["user", "collection"];
    pub const TEMPLATES: &[&str] = &["cards", "templates"];
    pub const CARDS: &[&str] = &["cards"];
    pub const LISTINGS: &[&str] = &["cards", "listings"];
    pub const LIST_CARD: &[&str] = &["cards", "list"];
    pub const BUY_CARD: &[&str] = &["cards", "buy"];
    pub const QUICKSELL: &[&str] = &["cards", "quicksell"];
    pub const PACKS: &[&str] = &["pack"];
}
