//! Search and filter criteria for the template catalog.

use serde::{Deserialize, Serialize};

pub const POWER_FLOOR: i32 = 0;
pub const POWER_CEILING: i32 = 20;

/// Neutral value for single-select dimensions.
pub const ANY: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub search_query: String,
    pub faction: String,
    pub rarity: String,
    pub power_min: i32,
    pub power_max: i32,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            search_query: String::new(),
            faction: ANY.to_string(),
            rarity: ANY.to_string(),
            power_min: POWER_FLOOR,
            power_max: POWER_CEILING,
        }
    }
}

impl FilterCriteria {
    pub fn is_neutral(&self) -> bool {
        self.search_needle().is_none()
            && self.faction_constraint().is_none()
            && self.rarity_constraint().is_none()
            && self.power_min <= POWER_FLOOR
            && self.power_max >= POWER_CEILING
    }

    /// Lower-cased query, or `None` when the query is blank.
    pub fn search_needle(&self) -> Option<String> {
        if self.search_query.trim().is_empty() {
            None
        } else {
            Some(self.search_query.to_lowercase())
        }
    }

    pub fn faction_constraint(&self) -> Option<&str> {
        choice_constraint(&self.faction)
    }

    pub fn rarity_constraint(&self) -> Option<&str> {
        choice_constraint(&self.rarity)
    }

    /// Merges a partial update. Power bounds are cross-clamped so the result
    /// never holds an inverted range.
    pub fn merge(&mut self, patch: FilterPatch) {
        if let Some(query) = patch.search_query {
            self.search_query = query;
        }
        if let Some(faction) = patch.faction {
            self.faction = normalize_choice(faction);
        }
        if let Some(rarity) = patch.rarity {
            self.rarity = normalize_choice(rarity);
        }

        match (patch.power_min, patch.power_max) {
            (Some(min), Some(max)) => {
                let min = min.resolve(POWER_FLOOR);
                let max = max.resolve(POWER_CEILING);
                self.power_min = min;
                self.power_max = max.max(min);
            }
            (Some(min), None) => {
                let min = min.resolve(POWER_FLOOR);
                self.power_min = min;
                if min > self.power_max {
                    self.power_max = min;
                }
            }
            (None, Some(max)) => {
                let max = max.resolve(POWER_CEILING);
                self.power_max = max;
                if max < self.power_min {
                    self.power_min = max;
                }
            }
            (None, None) => {}
        }
    }
}

fn choice_constraint(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(ANY) {
        None
    } else {
        Some(trimmed)
    }
}

fn normalize_choice(value: String) -> String {
    if choice_constraint(&value).is_none() {
        ANY.to_string()
    } else {
        value.trim().to_string()
    }
}

/// Raw power bound as it arrives from an input control.
///
/// Values are coerced instead of rejected: `NaN` and unparseable text fall
/// back to the bound's default extreme, infinities saturate, fractions are
/// truncated, and everything is clamped into `[POWER_FLOOR, POWER_CEILING]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerInput(pub f64);

impl PowerInput {
    pub fn parse(raw: &str) -> Self {
        Self(raw.trim().parse::<f64>().unwrap_or(f64::NAN))
    }

    pub fn resolve(self, default: i32) -> i32 {
        let value = self.0;
        if value.is_nan() {
            return default;
        }
        if value.is_infinite() {
            return if value > 0.0 { POWER_CEILING } else { POWER_FLOOR };
        }
        (value.trunc() as i32).clamp(POWER_FLOOR, POWER_CEILING)
    }
}

impl From<i32> for PowerInput {
    fn from(value: i32) -> Self {
        Self(f64::from(value))
    }
}

impl From<f64> for PowerInput {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

/// Partial criteria update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterPatch {
    pub search_query: Option<String>,
    pub faction: Option<String>,
    pub rarity: Option<String>,
    pub power_min: Option<PowerInput>,
    pub power_max: Option<PowerInput>,
}

impl FilterPatch {
    pub fn faction(mut self, faction: impl Into<String>) -> Self {
        self.faction = Some(faction.into());
        self
    }

    pub fn rarity(mut self, rarity: impl Into<String>) -> Self {
        self.rarity = Some(rarity.into());
        self
    }

    pub fn power_min(mut self, value: impl Into<PowerInput>) -> Self {
        self.power_min = Some(value.into());
        self
    }

    pub fn power_max(mut self, value: impl Into<PowerInput>) -> Self {
        self.power_max = Some(value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_neutral() {
        let criteria = FilterCriteria::default();
        assert!(criteria.is_neutral());
        assert_eq!(criteria.faction_constraint(), None);
        assert_eq!(criteria.search_needle(), None);
    }

    #[test]
    fn raising_min_above_max_lifts_max() {
        let mut criteria = FilterCriteria {
            power_max: 10,
            ..FilterCriteria::default()
        };
        criteria.merge(FilterPatch::default().power_min(15));
        assert_eq!((criteria.power_min, criteria.power_max), (15, 15));
    }

    #[test]
    fn lowering_max_below_min_drops_min() {
        let mut criteria = FilterCriteria {
            power_min: 8,
            ..FilterCriteria::default()
        };
        criteria.merge(FilterPatch::default().power_max(3));
        assert_eq!((criteria.power_min, criteria.power_max), (3, 3));
    }

    #[test]
    fn inverted_pair_keeps_min_and_raises_max() {
        let mut criteria = FilterCriteria::default();
        criteria.merge(FilterPatch::default().power_min(12).power_max(4));
        assert_eq!((criteria.power_min, criteria.power_max), (12, 12));
    }

    #[test]
    fn malformed_power_is_coerced() {
        assert_eq!(PowerInput(f64::NAN).resolve(POWER_FLOOR), 0);
        assert_eq!(PowerInput(f64::NAN).resolve(POWER_CEILING), 20);
        assert_eq!(PowerInput::parse("abc").resolve(POWER_CEILING), 20);
        assert_eq!(PowerInput(f64::INFINITY).resolve(POWER_FLOOR), 20);
        assert_eq!(PowerInput(f64::NEG_INFINITY).resolve(POWER_CEILING), 0);
        assert_eq!(PowerInput(7.9).resolve(POWER_FLOOR), 7);
        assert_eq!(PowerInput(-3.0).resolve(POWER_CEILING), 0);
        assert_eq!(PowerInput::parse(" 42 ").resolve(POWER_FLOOR), 20);
    }

    #[test]
    fn blank_choice_becomes_any() {
        let mut criteria = FilterCriteria::default();
        criteria.merge(FilterPatch::default().faction("  ").rarity("Epic"));
        assert_eq!(criteria.faction, ANY);
        assert_eq!(criteria.rarity_constraint(), Some("Epic"));
    }

    #[test]
    fn whitespace_query_is_not_a_constraint() {
        let criteria = FilterCriteria {
            search_query: "   ".into(),
            ..FilterCriteria::default()
        };
        assert!(criteria.is_neutral());
    }
}
