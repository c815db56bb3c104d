use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Legal instrument conveyed at a tax sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaleType {
    /// Debt certificate; title requires waiting out redemption and foreclosing.
    TaxLien,
    /// Deed conveying ownership, subject to a short redemption window.
    TaxDeed,
    /// Deed sale where the prior owner may redeem for a penalty.
    RedeemableDeed,
    /// Lien phase first, converting to a deed auction later.
    Hybrid,
}

impl SaleType {
    pub const fn label(self) -> &'static str {
        match self {
            SaleType::TaxLien => "tax_lien",
            SaleType::TaxDeed => "tax_deed",
            SaleType::RedeemableDeed => "redeemable_deed",
            SaleType::Hybrid => "hybrid",
        }
    }

    /// Whether the buyer walks away holding title that can be resold.
    /// Hybrid sales (FL) are treated as lien-phase and never convey title.
    pub const fn conveys_title(self) -> bool {
        matches!(self, SaleType::TaxDeed | SaleType::RedeemableDeed)
    }
}

/// Legal and financial regime of a single jurisdiction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateConfig {
    pub state_code: String,
    pub state_name: String,
    pub sale_type: SaleType,
    pub redemption_period_days: u32,
    pub interest_rate: Option<f64>,
    pub quiet_title_cost_estimate: f64,
    pub time_to_ownership_days: u32,
    pub auction_platform: String,
    pub is_active: bool,
    pub recommended_for_beginners: bool,
    /// Share of market value recorded by the county assessor.
    pub assessment_ratio: Option<f64>,
}

impl StateConfig {
    /// Market value implied by an assessed value, when the ratio is known.
    pub fn market_value_from_assessed(&self, assessed_value: f64) -> Option<f64> {
        match self.assessment_ratio {
            Some(ratio) if ratio > 0.0 && assessed_value > 0.0 => Some(assessed_value / ratio),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("state '{state_code}' is not registered")]
pub struct UnknownStateError {
    pub state_code: String,
}

/// Immutable lookup table of supported jurisdictions, built once and shared.
#[derive(Debug, Clone, PartialEq)]
pub struct StateRegistry {
    states: BTreeMap<String, StateConfig>,
}

impl StateRegistry {
    pub fn new(configs: impl IntoIterator<Item = StateConfig>) -> Self {
        let states = configs
            .into_iter()
            .map(|config| (normalize_code(&config.state_code), config))
            .collect();
        Self { states }
    }

    /// The jurisdictions the auction tracker currently knows how to score.
    pub fn standard() -> Self {
        Self::new([
            StateConfig {
                state_code: "AL".to_string(),
                state_name: "Alabama".to_string(),
                sale_type: SaleType::TaxLien,
                redemption_period_days: 1460,
                interest_rate: Some(0.12),
                quiet_title_cost_estimate: 4000.0,
                time_to_ownership_days: 2000,
                auction_platform: "GovEase".to_string(),
                is_active: true,
                recommended_for_beginners: false,
                assessment_ratio: Some(0.10),
            },
            StateConfig {
                state_code: "AR".to_string(),
                state_name: "Arkansas".to_string(),
                sale_type: SaleType::TaxDeed,
                redemption_period_days: 30,
                interest_rate: None,
                quiet_title_cost_estimate: 1500.0,
                time_to_ownership_days: 180,
                auction_platform: "COSL Website".to_string(),
                is_active: true,
                recommended_for_beginners: true,
                assessment_ratio: Some(0.20),
            },
            StateConfig {
                state_code: "TX".to_string(),
                state_name: "Texas".to_string(),
                sale_type: SaleType::RedeemableDeed,
                redemption_period_days: 180,
                interest_rate: Some(0.25),
                quiet_title_cost_estimate: 2000.0,
                time_to_ownership_days: 180,
                auction_platform: "County-specific".to_string(),
                is_active: false,
                recommended_for_beginners: true,
                assessment_ratio: Some(1.00),
            },
            StateConfig {
                state_code: "FL".to_string(),
                state_name: "Florida".to_string(),
                sale_type: SaleType::Hybrid,
                redemption_period_days: 0,
                interest_rate: Some(0.18),
                quiet_title_cost_estimate: 1500.0,
                time_to_ownership_days: 730,
                auction_platform: "County + tax-sale.info".to_string(),
                is_active: false,
                recommended_for_beginners: false,
                assessment_ratio: Some(0.85),
            },
        ])
    }

    pub fn get_state_config(&self, state_code: &str) -> Result<&StateConfig, UnknownStateError> {
        self.states
            .get(&normalize_code(state_code))
            .ok_or_else(|| UnknownStateError {
                state_code: state_code.trim().to_string(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &StateConfig> {
        self.states.values()
    }

    pub fn active(&self) -> Vec<&StateConfig> {
        self.iter().filter(|config| config.is_active).collect()
    }

    pub fn beginner_friendly(&self) -> Vec<&StateConfig> {
        self.iter()
            .filter(|config| config.recommended_for_beginners)
            .collect()
    }

    pub fn tax_deed_states(&self) -> Vec<&StateConfig> {
        self.iter()
            .filter(|config| config.sale_type == SaleType::TaxDeed)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl Default for StateRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

pub(crate) fn normalize_code(state_code: &str) -> String {
    state_code.trim().to_ascii_uppercase()
}
