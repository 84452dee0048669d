//! Estimate/settlement reconciliation.
//!
//! Settlement values are published once per trading day after the close,
//! estimates update during the session. The settled value wins as soon as its
//! date has caught up with the estimate's date.

use crate::domain::quote::{EstimateQuote, IncomingQuote, Nav, SettlementQuote, ValuationStamp};

/// True when the settlement should replace the estimate.
pub fn settlement_supersedes(
    estimate: Option<&EstimateQuote>,
    settlement: Option<&SettlementQuote>,
) -> bool {
    match (estimate, settlement) {
        (_, None) => false,
        (None, Some(_)) => true,
        (Some(est), Some(set)) => set.as_of_date >= est.as_of.date(),
    }
}

/// Combine whichever feeds answered into the fields shown for `code`.
///
/// Returns `None` when neither feed produced a quote; the caller keeps the
/// record it already has.
pub fn reconcile(
    code: &str,
    estimate: Option<&EstimateQuote>,
    settlement: Option<&SettlementQuote>,
) -> Option<IncomingQuote> {
    if estimate.is_none() && settlement.is_none() {
        return None;
    }

    let display_name = estimate
        .map(|e| e.name.clone())
        .filter(|n| !n.is_empty())
        .or_else(|| settlement.map(|s| s.name.clone()))
        .unwrap_or_default();

    let last_settled_value = match settlement {
        Some(set) => Nav::Value(set.value),
        None => Nav::from(estimate.and_then(|e| e.last_settled)),
    };

    if settlement_supersedes(estimate, settlement) {
        let set = settlement?;
        return Some(IncomingQuote {
            code: code.to_string(),
            display_name,
            last_settled_value,
            current_estimated_value: Nav::Value(set.value),
            estimated_change_percent: Nav::from(set.change_percent),
            valuation_stamp: ValuationStamp::Settled(set.as_of_date),
            is_settled_value_applied: true,
        });
    }

    let est = estimate?;
    Some(IncomingQuote {
        code: code.to_string(),
        display_name,
        last_settled_value,
        current_estimated_value: Nav::Value(est.value),
        estimated_change_percent: Nav::Value(est.change_percent),
        valuation_stamp: ValuationStamp::Intraday(est.as_of),
        is_settled_value_applied: false,
    })
}
