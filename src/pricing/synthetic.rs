//! Deterministic placeholder prices for sources without a live feed.
//!
//! Until real marketplace scraping lands, quotes are synthesized from a hash
//! of the card id and the source name. The same card always prices the same,
//! which keeps responses reproducible and the aggregation logic honest.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::round_cents;

/// Price range one source quotes in, in USD.
pub(crate) struct PriceBand {
    pub low: f64,
    pub high: f64,
}

/// Base price for a card at a source, stable across calls.
pub(crate) fn seeded_base_price(card_id: &str, source: &str, band: &PriceBand) -> f64 {
    let mut hasher = DefaultHasher::new();
    card_id.hash(&mut hasher);
    source.hash(&mut hasher);
    let unit = (hasher.finish() % 10_000) as f64 / 10_000.0;
    round_cents(band.low + unit * (band.high - band.low))
}
