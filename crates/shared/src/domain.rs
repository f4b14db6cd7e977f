use serde::{Deserialize, Serialize};

macro_rules! name_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

name_newtype!(CardName);
name_newtype!(PackName);

/// Serial number of an owned card instance within its template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardNumber(pub i64);

impl std::fmt::Display for CardNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub const RARITIES: [&str; 4] = ["Common", "Rare", "Epic", "Legendary"];

/// Drop rates shown for packs that do not advertise their own.
pub const DEFAULT_DROP_RATES: [f64; 4] = [60.0, 25.0, 12.0, 3.0];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardInfo {
    pub name: String,
    pub faction: String,
    pub rarity: String,
    #[serde(rename = "type")]
    pub card_type: String,
    pub power: i32,
    #[serde(default)]
    pub provision: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ability: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flavor: Option<String>,
    #[serde(default)]
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faction_url: Option<String>,
}

/// A card definition plus the number of tradable copies currently listed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub card: CardInfo,
    pub count: u64,
}

impl Template {
    pub fn name(&self) -> &str {
        &self.card.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub balance: i64,
}

/// A concrete, numbered copy of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub card_template: CardInfo,
    pub number: CardNumber,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<UserProfile>,
}

impl Card {
    pub fn matches(&self, name: &str, number: CardNumber) -> bool {
        self.card_template.name == name && self.number == number
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    #[serde(default)]
    pub seller: Option<UserProfile>,
    pub card: Card,
    pub price: i64,
}

impl Listing {
    /// Listings without a seller are first-time sales from the store.
    pub fn is_store_sale(&self) -> bool {
        self.seller.is_none()
    }

    pub fn seller_label(&self) -> &str {
        self.seller
            .as_ref()
            .map(|seller| seller.username.as_str())
            .unwrap_or("System Store")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pack {
    pub name: String,
    pub price: i64,
    #[serde(default)]
    pub probabilities: Vec<f64>,
    #[serde(default)]
    pub number_of_cards: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropRate {
    pub rarity: String,
    pub percent: f64,
}

impl DropRate {
    pub fn label(&self) -> String {
        format!("{:.1}%", self.percent)
    }
}

impl Pack {
    pub fn drop_rates(&self) -> Vec<DropRate> {
        let rates: &[f64] = if self.probabilities.is_empty() {
            &DEFAULT_DROP_RATES
        } else {
            &self.probabilities
        };

        rates
            .iter()
            .enumerate()
            .map(|(index, percent)| DropRate {
                rarity: RARITIES
                    .get(index)
                    .map(|rarity| rarity.to_string())
                    .unwrap_or_else(|| format!("Rarity {}", index + 1)),
                percent: *percent,
            })
            .collect()
    }
}
