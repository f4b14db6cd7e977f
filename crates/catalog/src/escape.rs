//! Display-safe renderings of backend-supplied card text.

use shared::domain::{Listing, Template};

const DEFAULT_ABILITY: &str = "Hero. Immune to weather and special effects.";

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Drops control characters so card text cannot drive a terminal.
pub fn strip_control(input: &str) -> String {
    input.chars().filter(|ch| !ch.is_control()).collect()
}

/// Escaped fields for one catalog tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardTile {
    pub name: String,
    pub faction: String,
    pub card_type: String,
    pub rarity: String,
    pub rarity_class: String,
    pub power: i32,
    pub ability: String,
    pub image_url: String,
    pub listings_label: String,
}

impl CardTile {
    pub fn from_template(template: &Template) -> Self {
        let card = &template.card;
        let ability = card
            .ability
            .as_deref()
            .filter(|ability| !ability.trim().is_empty())
            .unwrap_or(DEFAULT_ABILITY);

        Self {
            name: escape_html(&card.name),
            faction: escape_html(&card.faction),
            card_type: escape_html(&card.card_type),
            rarity: escape_html(&card.rarity),
            rarity_class: format!("rarity-{}", escape_html(&card.rarity.to_lowercase())),
            power: card.power,
            ability: escape_html(ability),
            image_url: escape_html(&card.image_url),
            listings_label: format!("{} listings", template.count),
        }
    }
}

/// Escaped fields for one row of the listings table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRow {
    pub seller: String,
    pub first_time_sale: bool,
    pub card_number: String,
    pub price: i64,
}

impl ListingRow {
    pub fn from_listing(listing: &Listing) -> Self {
        Self {
            seller: escape_html(listing.seller_label()),
            first_time_sale: listing.is_store_sale(),
            card_number: format!("#{}", listing.card.number),
            price: listing.price,
        }
    }
}
