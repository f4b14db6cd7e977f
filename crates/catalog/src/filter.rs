use shared::domain::Template;

use crate::criteria::FilterCriteria;

/// Criteria lowered once so each template check is a plain comparison.
struct Matcher {
    needle: Option<String>,
    faction: Option<String>,
    rarity: Option<String>,
    power_min: i32,
    power_max: i32,
}

impl Matcher {
    fn new(criteria: &FilterCriteria) -> Self {
        Self {
            needle: criteria.search_needle(),
            faction: criteria.faction_constraint().map(str::to_lowercase),
            rarity: criteria.rarity_constraint().map(str::to_lowercase),
            power_min: criteria.power_min,
            power_max: criteria.power_max,
        }
    }

    fn matches(&self, template: &Template) -> bool {
        let card = &template.card;

        if let Some(needle) = &self.needle {
            let hit = card.name.to_lowercase().contains(needle.as_str())
                || card.faction.to_lowercase().contains(needle.as_str())
                || card.card_type.to_lowercase().contains(needle.as_str());
            if !hit {
                return false;
            }
        }

        if let Some(faction) = &self.faction {
            if card.faction.to_lowercase() != *faction {
                return false;
            }
        }

        if let Some(rarity) = &self.rarity {
            if card.rarity.to_lowercase() != *rarity {
                return false;
            }
        }

        (self.power_min..=self.power_max).contains(&card.power)
    }
}

/// Returns the templates satisfying every active constraint, in snapshot order.
pub fn apply_filters(snapshot: &[Template], criteria: &FilterCriteria) -> Vec<Template> {
    let matcher = Matcher::new(criteria);
    snapshot
        .iter()
        .filter(|template| matcher.matches(template))
        .cloned()
        .collect()
}
