//! Shared numeric helpers.
//!
//! Offer prices arrive from the provider as exact decimal strings and are
//! kept as `Decimal` end to end; ranking math needs them as `f64`.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Convert a Decimal to f64, defaulting to 0.0 for values that can't be represented.
///
/// Replaces the repeated pattern `some_decimal.to_f64().unwrap_or(0.0)`.
pub(crate) fn dec_to_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

/// Format an optional reading rounded to whole units, "n/a" when missing.
/// Used by the fallback summary texts.
pub(crate) fn fmt_reading(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.0}", v),
        None => "n/a".to_string(),
    }
}
