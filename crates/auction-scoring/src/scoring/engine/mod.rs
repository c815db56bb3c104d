mod policy;
mod rules;

pub use policy::{
    ComponentWeights, ScoringPolicy, DEFAULT_CAPITAL_LIMIT, DEFAULT_COST_BUFFER_PCT,
    DEFAULT_DELTA_PENALTY_FACTOR, DEFAULT_EXCELLENT_WHOLESALE_SPREAD,
    DEFAULT_MIN_WHOLESALE_MARGIN, DEFAULT_MIN_WHOLESALE_SPREAD, DEFAULT_TIME_DECAY_RATE,
};

use super::domain::{PropertyScoreInput, ScoreResult};
use super::risk::{self, DistressedRegions};
use super::states::SaleType;

/// Stateless scorer applying the policy to a normalized property input.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    policy: ScoringPolicy,
    regions: DistressedRegions,
}

impl ScoringEngine {
    pub fn new(policy: ScoringPolicy) -> Self {
        Self::with_regions(policy, DistressedRegions::standard())
    }

    pub fn with_regions(policy: ScoringPolicy, regions: DistressedRegions) -> Self {
        Self { policy, regions }
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    pub fn score(&self, input: &PropertyScoreInput) -> ScoreResult {
        let policy = &self.policy;
        let state = &input.state;
        let mut notes = Vec::new();

        let effective_cost = rules::effective_cost(
            input.amount,
            state.quiet_title_cost_estimate,
            policy.cost_buffer_pct,
        );
        let time_penalty_factor =
            rules::time_penalty_factor(state.time_to_ownership_days, policy.time_decay_rate);

        let is_market_reject = risk::is_market_reject(input.year_sold, policy.stale_delinquency_year);
        let is_delta_region =
            risk::is_delta_region(input.county.as_deref(), &state.state_code, &self.regions);
        let delta_penalty_factor = if is_delta_region {
            policy.delta_penalty_factor
        } else {
            1.0
        };

        let estimated_market_value = input.known_market_value.or_else(|| {
            input
                .assessed_value
                .and_then(|assessed| state.market_value_from_assessed(assessed))
        });
        let wholesale_spread = estimated_market_value.map(|value| value - effective_cost);

        match state.sale_type {
            SaleType::TaxLien => notes.push(format!(
                "{}: tax lien, {} day redemption",
                state.state_code, state.redemption_period_days
            )),
            SaleType::TaxDeed => {
                notes.push(format!("{}: tax deed, immediate ownership", state.state_code))
            }
            SaleType::RedeemableDeed | SaleType::Hybrid => notes.push(format!(
                "{}: {}, {} days to marketable title",
                state.state_code,
                state.sale_type.label(),
                state.time_to_ownership_days
            )),
        }

        let capital_viable = effective_cost <= policy.capital_limit;
        if !capital_viable {
            notes.push(format!(
                "exceeds capital limit (${effective_cost:.0} > ${:.0})",
                policy.capital_limit
            ));
            return ScoreResult {
                buy_hold_score: 0.0,
                wholesale_score: 0.0,
                effective_cost,
                time_penalty_factor,
                is_market_reject,
                is_delta_region,
                delta_penalty_factor,
                capital_viable,
                estimated_market_value,
                wholesale_spread,
                components: Vec::new(),
                notes,
            };
        }

        let components = rules::buy_hold_components(input, effective_cost, policy);
        let mut buy_hold_score = rules::composite(&components) * time_penalty_factor;

        let mut wholesale_score = match (estimated_market_value, wholesale_spread) {
            (Some(market_value), Some(spread)) if state.sale_type.conveys_title() => {
                rules::wholesale_score(spread, market_value, policy)
            }
            _ => 0.0,
        };

        if is_market_reject {
            notes.push(format!(
                "market reject: delinquent since {} (pre-{})",
                input.year_sold.unwrap_or_default(),
                policy.stale_delinquency_year
            ));
            buy_hold_score = 0.0;
            wholesale_score = 0.0;
        }

        if is_delta_region {
            notes.push(format!(
                "distressed region: {} county ({:.0}% score penalty)",
                input.county.as_deref().unwrap_or_default(),
                (1.0 - delta_penalty_factor) * 100.0
            ));
            buy_hold_score *= delta_penalty_factor;
            wholesale_score *= delta_penalty_factor;
        }

        ScoreResult {
            buy_hold_score: clamp_score(buy_hold_score),
            wholesale_score: clamp_score(wholesale_score),
            effective_cost,
            time_penalty_factor,
            is_market_reject,
            is_delta_region,
            delta_penalty_factor,
            capital_viable,
            estimated_market_value,
            wholesale_spread,
            components,
            notes,
        }
    }
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new(ScoringPolicy::default())
    }
}

fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::states::{StateConfig, StateRegistry};

    fn state(code: &str) -> StateConfig {
        StateRegistry::standard()
            .get_state_config(code)
            .expect("registered")
            .clone()
    }

    fn input(code: &str, amount: f64) -> PropertyScoreInput {
        PropertyScoreInput {
            amount,
            acreage: Some(3.0),
            water_score: Some(70.0),
            road_access_score: Some(70.0),
            county_market_score: Some(70.0),
            geographic_score: Some(70.0),
            total_description_score: Some(70.0),
            state: state(code),
            county: Some("Pulaski".to_string()),
            year_sold: Some(2022),
            known_market_value: None,
            assessed_value: None,
        }
    }

    #[test]
    fn capital_gate_short_circuits_every_score() {
        let engine = ScoringEngine::default();
        let mut expensive = input("AR", 9_500.0);
        expensive.known_market_value = Some(60_000.0);
        let result = engine.score(&expensive);

        assert!(!result.capital_viable);
        assert_eq!(result.buy_hold_score, 0.0);
        assert_eq!(result.wholesale_score, 0.0);
        assert!(result.components.is_empty());
        assert!(result.notes.iter().any(|note| note.contains("capital limit")));
    }

    #[test]
    fn custom_capital_limit_is_respected() {
        let policy = ScoringPolicy {
            capital_limit: 25_000.0,
            ..ScoringPolicy::default()
        };
        let result = ScoringEngine::new(policy).score(&input("AR", 9_500.0));
        assert!(result.capital_viable);
        assert!(result.buy_hold_score > 0.0);
    }

    #[test]
    fn effective_cost_includes_quiet_title_and_buffer() {
        let result = ScoringEngine::default().score(&input("AL", 500.0));
        assert!((result.effective_cost - 4_950.0).abs() < 1e-9);
    }

    #[test]
    fn market_reject_overrides_attractive_inputs() {
        let mut stale = input("AR", 1_200.0);
        stale.year_sold = Some(1944);
        stale.known_market_value = Some(40_000.0);
        let result = ScoringEngine::default().score(&stale);

        assert!(result.is_market_reject);
        assert_eq!(result.buy_hold_score, 0.0);
        assert_eq!(result.wholesale_score, 0.0);
    }

    #[test]
    fn delta_penalty_halves_buy_hold_exactly() {
        let engine = ScoringEngine::default();
        let baseline = engine.score(&input("AR", 1_200.0));
        let mut delta = input("AR", 1_200.0);
        delta.county = Some("Phillips".to_string());
        let penalized = engine.score(&delta);

        assert!(penalized.is_delta_region);
        assert_eq!(penalized.delta_penalty_factor, 0.5);
        assert!(penalized.buy_hold_score > 0.0);
        assert_eq!(penalized.buy_hold_score, baseline.buy_hold_score * 0.5);
    }

    #[test]
    fn delta_penalty_halves_wholesale_exactly() {
        let engine = ScoringEngine::default();
        let mut plain = input("AR", 1_000.0);
        plain.known_market_value = Some(8_000.0);
        let mut delta = plain.clone();
        delta.county = Some("Phillips".to_string());

        let baseline = engine.score(&plain);
        let penalized = engine.score(&delta);

        assert!(baseline.wholesale_score > 0.0 && baseline.wholesale_score < 100.0);
        assert_eq!(penalized.wholesale_spread, baseline.wholesale_spread);
        assert_eq!(penalized.wholesale_score, baseline.wholesale_score * 0.5);
    }

    #[test]
    fn tax_liens_never_score_for_wholesale() {
        let mut lien = input("AL", 200.0);
        lien.known_market_value = Some(50_000.0);
        let result = ScoringEngine::default().score(&lien);
        assert_eq!(result.wholesale_score, 0.0);
        assert!(result.wholesale_spread.is_some());
    }

    #[test]
    fn deed_with_wide_spread_scores_for_wholesale() {
        let mut deed = input("AR", 1_000.0);
        deed.known_market_value = Some(12_000.0);
        let result = ScoringEngine::default().score(&deed);
        // effective cost 2,750 -> spread 9,250, margin ~0.77
        assert!((result.wholesale_spread.expect("spread") - 9_250.0).abs() < 1e-9);
        assert!(result.wholesale_score > 80.0);
    }

    #[test]
    fn assessed_value_backs_up_missing_market_value() {
        let mut deed = input("AR", 1_000.0);
        deed.assessed_value = Some(2_000.0);
        let result = ScoringEngine::default().score(&deed);
        let estimate = result.estimated_market_value.expect("estimate from assessed value");
        assert!((estimate - 10_000.0).abs() < 1e-6);
        assert!(result.wholesale_score > 0.0);
    }

    #[test]
    fn out_of_range_sub_scores_are_clamped() {
        let mut noisy = input("AR", 800.0);
        noisy.water_score = Some(250.0);
        noisy.road_access_score = Some(-40.0);
        let result = ScoringEngine::default().score(&noisy);

        assert!(result.buy_hold_score <= 100.0);
        let water = result
            .components
            .iter()
            .find(|component| component.factor == crate::scoring::ScoreFactor::Water)
            .expect("water component");
        assert_eq!(water.value, 100.0);
    }
}
