//! Recipe list filtering.
//!
//! The same rule applies to the `/recipes` query string and to the list route:
//! a filter field that is absent or blank is left out entirely, never sent as
//! an empty value.

use serde::{Deserialize, Serialize};

/// Query key for the cuisine tag.
pub const CUISINE_KEY: &str = "cuisine";
/// Query key for the dietary preference tag.
pub const DIETARY_PREFERENCE_KEY: &str = "dietary_preference";

/// Optional tag filter for the recipe list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeFilter {
    /// Cuisine tag, e.g. "Italian".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuisine: Option<String>,
    /// Dietary preference tag, e.g. "Vegetarian".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dietary_preference: Option<String>,
}

impl RecipeFilter {
    /// No filtering: the backend returns every recipe.
    pub fn all() -> Self {
        Self::default()
    }

    /// Filter by cuisine only.
    pub fn by_cuisine(cuisine: impl Into<String>) -> Self {
        Self {
            cuisine: Some(cuisine.into()),
            dietary_preference: None,
        }
    }

    /// Filter by dietary preference only.
    pub fn by_dietary_preference(pref: impl Into<String>) -> Self {
        Self {
            cuisine: None,
            dietary_preference: Some(pref.into()),
        }
    }

    /// True when no usable field is set.
    pub fn is_empty(&self) -> bool {
        self.query_pairs().is_empty()
    }

    /// Key/value pairs to put on the wire, in a stable order.
    pub fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = Vec::with_capacity(2);
        if let Some(v) = present(&self.cuisine) {
            pairs.push((CUISINE_KEY, v));
        }
        if let Some(v) = present(&self.dietary_preference) {
            pairs.push((DIETARY_PREFERENCE_KEY, v));
        }
        pairs
    }
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_has_no_pairs() {
        assert!(RecipeFilter::all().query_pairs().is_empty());
        assert!(RecipeFilter::all().is_empty());
    }

    #[test]
    fn every_combination_omits_absent_fields() {
        let cases = [
            (None, None, vec![]),
            (Some("Thai"), None, vec![("cuisine", "Thai")]),
            (None, Some("Vegan"), vec![("dietary_preference", "Vegan")]),
            (
                Some("Thai"),
                Some("Vegan"),
                vec![("cuisine", "Thai"), ("dietary_preference", "Vegan")],
            ),
        ];

        for (cuisine, diet, expected) in cases {
            let filter = RecipeFilter {
                cuisine: cuisine.map(String::from),
                dietary_preference: diet.map(String::from),
            };
            assert_eq!(filter.query_pairs(), expected, "filter {filter:?}");
        }
    }

    #[test]
    fn blank_values_count_as_absent() {
        let filter = RecipeFilter {
            cuisine: Some("   ".into()),
            dietary_preference: Some(String::new()),
        };
        assert!(filter.is_empty());
    }
}
