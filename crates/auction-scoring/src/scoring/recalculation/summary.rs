use std::collections::BTreeMap;

use serde::Serialize;

use crate::scoring::domain::{PropertyId, PropertyRecord};
use crate::scoring::states::normalize_code;

/// Averages of the written scores for one state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateScoreSummary {
    pub state_code: String,
    pub count: usize,
    pub average_buy_hold: f64,
    pub average_wholesale: f64,
    pub average_effective_cost: f64,
    pub average_time_penalty: f64,
    pub market_rejects: usize,
    pub delta_region: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedProperty {
    pub id: PropertyId,
    pub state_code: String,
    pub county: Option<String>,
    pub amount: Option<f64>,
    pub acreage: Option<f64>,
    pub buy_hold_score: f64,
    pub wholesale_score: f64,
    pub effective_cost: f64,
}

/// Post-run overview: per-state averages and the best buy-hold candidates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBoard {
    pub states: Vec<StateScoreSummary>,
    pub top_buy_hold: Vec<RankedProperty>,
}

#[derive(Default)]
struct Accumulator {
    count: usize,
    buy_hold: f64,
    wholesale: f64,
    effective_cost: f64,
    time_penalty: f64,
    market_rejects: usize,
    delta_region: usize,
}

impl ScoreBoard {
    /// Only records carrying written scores are counted.
    pub fn from_records(records: &[PropertyRecord], top: usize) -> Self {
        let mut by_state: BTreeMap<String, Accumulator> = BTreeMap::new();
        let mut ranked = Vec::new();

        for record in records {
            let Some(scores) = &record.scores else {
                continue;
            };

            let state_code = normalize_code(&record.state_code);
            let entry = by_state.entry(state_code.clone()).or_default();
            entry.count += 1;
            entry.buy_hold += scores.buy_hold_score;
            entry.wholesale += scores.wholesale_score;
            entry.effective_cost += scores.effective_cost;
            entry.time_penalty += scores.time_penalty_factor;
            entry.market_rejects += usize::from(scores.is_market_reject);
            entry.delta_region += usize::from(scores.is_delta_region);

            ranked.push(RankedProperty {
                id: record.id.clone(),
                state_code,
                county: record.county.clone(),
                amount: record.amount,
                acreage: record.acreage,
                buy_hold_score: scores.buy_hold_score,
                wholesale_score: scores.wholesale_score,
                effective_cost: scores.effective_cost,
            });
        }

        let states = by_state
            .into_iter()
            .map(|(state_code, totals)| {
                let count = totals.count as f64;
                StateScoreSummary {
                    state_code,
                    count: totals.count,
                    average_buy_hold: totals.buy_hold / count,
                    average_wholesale: totals.wholesale / count,
                    average_effective_cost: totals.effective_cost / count,
                    average_time_penalty: totals.time_penalty / count,
                    market_rejects: totals.market_rejects,
                    delta_region: totals.delta_region,
                }
            })
            .collect();

        ranked.sort_by(|left, right| {
            right
                .buy_hold_score
                .total_cmp(&left.buy_hold_score)
                .then_with(|| left.id.cmp(&right.id))
        });
        ranked.truncate(top);

        Self {
            states,
            top_buy_hold: ranked,
        }
    }
}
