//! Risk predicates applied on top of the composite score.
//!
//! Both predicates fail open: missing or malformed data never produces a
//! penalty, because scraper gaps are common and a false positive would zero
//! out legitimate inventory.

use std::collections::{BTreeMap, BTreeSet};

use super::states::normalize_code;

/// Sale year before which a delinquency counts as stale.
pub const STALE_DELINQUENCY_THRESHOLD: i32 = 2015;

/// Arkansas Mississippi Delta counties with persistent population decline and
/// thin resale markets.
const ARKANSAS_DELTA_COUNTIES: [&str; 9] = [
    "PHILLIPS",
    "LEE",
    "CHICOT",
    "MISSISSIPPI",
    "CRITTENDEN",
    "ST FRANCIS",
    "MONROE",
    "DESHA",
    "ARKANSAS",
];

/// True when the property has sat delinquent since before `threshold`.
pub fn is_market_reject(year_sold: Option<i32>, threshold: i32) -> bool {
    matches!(year_sold, Some(year) if year < threshold)
}

/// Per-state sets of economically distressed counties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistressedRegions {
    counties: BTreeMap<String, BTreeSet<String>>,
}

impl DistressedRegions {
    pub fn empty() -> Self {
        Self {
            counties: BTreeMap::new(),
        }
    }

    pub fn standard() -> Self {
        Self::empty().with_state("AR", ARKANSAS_DELTA_COUNTIES)
    }

    pub fn with_state<I, S>(mut self, state_code: &str, counties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entry = self.counties.entry(normalize_code(state_code)).or_default();
        entry.extend(
            counties
                .into_iter()
                .map(|county| normalize_county(county.as_ref())),
        );
        self
    }

    pub fn contains(&self, state_code: &str, county: &str) -> bool {
        let normalized = normalize_county(county);
        if normalized.is_empty() {
            return false;
        }
        self.counties
            .get(&normalize_code(state_code))
            .map(|set| set.contains(&normalized))
            .unwrap_or(false)
    }
}

impl Default for DistressedRegions {
    fn default() -> Self {
        Self::standard()
    }
}

/// True when `county` is in the distressed set registered for `state_code`.
pub fn is_delta_region(
    county: Option<&str>,
    state_code: &str,
    regions: &DistressedRegions,
) -> bool {
    county
        .map(|county| regions.contains(state_code, county))
        .unwrap_or(false)
}

/// Canonical county key: "  St. Francis County " becomes "ST FRANCIS".
pub(crate) fn normalize_county(county: &str) -> String {
    let upper = county.replace('.', " ").to_ascii_uppercase();
    let mut words: Vec<&str> = upper.split_whitespace().collect();
    if words.len() > 1 && words.last() == Some(&"COUNTY") {
        words.pop();
    }
    words.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pre_threshold_years_are_market_rejects() {
        assert!(is_market_reject(Some(1944), STALE_DELINQUENCY_THRESHOLD));
        assert!(is_market_reject(Some(2014), STALE_DELINQUENCY_THRESHOLD));
        assert!(!is_market_reject(Some(2015), STALE_DELINQUENCY_THRESHOLD));
        assert!(!is_market_reject(Some(2023), STALE_DELINQUENCY_THRESHOLD));
    }

    #[test]
    fn unknown_sale_year_is_not_penalized() {
        assert!(!is_market_reject(None, STALE_DELINQUENCY_THRESHOLD));
    }

    #[test]
    fn delta_membership_ignores_case_and_whitespace() {
        let regions = DistressedRegions::standard();
        assert!(is_delta_region(Some("Phillips"), "AR", &regions));
        assert!(is_delta_region(Some("  phillips  "), "ar", &regions));
        assert!(is_delta_region(Some("CHICOT"), "AR", &regions));
        assert!(!is_delta_region(Some("Pulaski"), "AR", &regions));
    }

    #[test]
    fn st_francis_spellings_match() {
        let regions = DistressedRegions::standard();
        assert!(is_delta_region(Some("St. Francis"), "AR", &regions));
        assert!(is_delta_region(Some("ST FRANCIS"), "AR", &regions));
        assert!(is_delta_region(Some("St Francis County"), "AR", &regions));
    }

    #[test]
    fn missing_county_or_unlisted_state_fails_open() {
        let regions = DistressedRegions::standard();
        assert!(!is_delta_region(None, "AR", &regions));
        assert!(!is_delta_region(Some(""), "AR", &regions));
        assert!(!is_delta_region(Some("Phillips"), "AL", &regions));
        assert!(!is_delta_region(Some("Phillips"), "AR", &DistressedRegions::empty()));
    }

    #[test]
    fn arkansas_county_is_not_confused_with_the_state_suffix() {
        let regions = DistressedRegions::standard();
        assert!(is_delta_region(Some("Arkansas County"), "AR", &regions));
        assert_eq!(normalize_county("County"), "COUNTY");
    }

    #[test]
    fn custom_regions_extend_other_states() {
        let regions = DistressedRegions::empty().with_state("MS", ["Coahoma", "Bolivar"]);
        assert!(is_delta_region(Some("coahoma"), "MS", &regions));
        assert!(!is_delta_region(Some("Phillips"), "AR", &regions));
    }
}
