//! Preference-weighted offer ranking.
//!
//! Orders scored offers by a blend of normalized price and normalized risk.
//! The preference is purely a sort key: it never alters `risk_score`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::helpers::dec_to_f64;
use crate::risk::blend::RiskAssessment;
use crate::services::amadeus::FlightOffer;

/// Ranking preference: how to weight price against risk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Preference {
    Price,
    Weather,
    #[default]
    Balanced,
}

impl Preference {
    /// (price weight, risk weight).
    fn weights(&self) -> (f64, f64) {
        match self {
            Preference::Price => (0.70, 0.30),
            Preference::Weather => (0.30, 0.70),
            Preference::Balanced => (0.45, 0.55),
        }
    }
}

/// An offer annotated with its risk assessment.
#[derive(Debug, Clone)]
pub struct ScoredOffer {
    pub offer: FlightOffer,
    pub assessment: RiskAssessment,
}

/// Order offers by preference-weighted blend of normalized price and risk.
///
/// Price and risk_score are min-max normalized across the candidate set; a
/// component where all candidates are equal contributes 0 to every offer
/// (no divide-by-zero). Lower combined score ranks first. Ties break by
/// lowest price, then lowest risk_score, then offer id, so the order is
/// total and deterministic.
pub fn rank_offers(mut items: Vec<ScoredOffer>, preference: Preference) -> Vec<ScoredOffer> {
    if items.is_empty() {
        return items;
    }

    let prices: Vec<f64> = items.iter().map(|s| dec_to_f64(s.offer.price_total)).collect();
    let risks: Vec<f64> = items.iter().map(|s| s.assessment.risk_score as f64).collect();

    let (min_price, max_price) = min_max(&prices);
    let (min_risk, max_risk) = min_max(&risks);

    let (w_price, w_risk) = preference.weights();

    let combined: Vec<f64> = items
        .iter()
        .enumerate()
        .map(|(i, _)| {
            let price_norm = normalize(prices[i], min_price, max_price);
            let risk_norm = normalize(risks[i], min_risk, max_risk);
            w_price * price_norm + w_risk * risk_norm
        })
        .collect();

    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by(|&a, &b| {
        combined[a]
            .total_cmp(&combined[b])
            .then_with(|| items[a].offer.price_total.cmp(&items[b].offer.price_total))
            .then_with(|| items[a].assessment.risk_score.cmp(&items[b].assessment.risk_score))
            .then_with(|| items[a].offer.id.cmp(&items[b].offer.id))
    });

    // Reorder in place by taking items out in ranked order.
    let mut ranked = Vec::with_capacity(items.len());
    let mut taken: Vec<Option<ScoredOffer>> = items.drain(..).map(Some).collect();
    for idx in order {
        if let Some(item) = taken[idx].take() {
            ranked.push(item);
        }
    }
    ranked
}

fn min_max(values: &[f64]) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in values {
        min = min.min(v);
        max = max.max(v);
    }
    (min, max)
}

fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if max <= min {
        0.0
    } else {
        (value - min) / (max - min)
    }
}
