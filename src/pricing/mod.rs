//! Price aggregation across marketplace sources.
//!
//! Sources are queried in parallel and each one is isolated: a failure or
//! timeout in one marketplace costs its quotes, never the whole summary.

mod sources;
mod synthetic;

pub use sources::{CardmarketSource, EbaySource, PriceSource, TcgplayerSource};

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use log::{debug, warn};
use tokio::time::timeout;

use crate::models::{CanonicalCard, PriceQuote, PriceSummary, PriceTrend};

/// How long one marketplace may take before its quotes are dropped
pub const SOURCE_TIMEOUT: Duration = Duration::from_secs(10);

/// Fans a resolved card out to every configured source and folds the
/// answers into a single [`PriceSummary`].
pub struct PriceAggregator {
    sources: Vec<Arc<dyn PriceSource>>,
    source_timeout: Duration,
}

impl PriceAggregator {
    pub fn new(sources: Vec<Arc<dyn PriceSource>>) -> Self {
        Self {
            sources,
            source_timeout: SOURCE_TIMEOUT,
        }
    }

    /// The standard marketplace line-up.
    pub fn with_default_sources() -> Self {
        Self::new(vec![
            Arc::new(TcgplayerSource),
            Arc::new(EbaySource),
            Arc::new(CardmarketSource),
        ])
    }

    pub fn with_source_timeout(mut self, source_timeout: Duration) -> Self {
        self.source_timeout = source_timeout;
        self
    }

    /// Collect quotes from every source in parallel. Always produces a
    /// summary; with no usable quotes it reports a market price of zero and
    /// a stable trend.
    pub async fn aggregate(&self, card: &CanonicalCard) -> PriceSummary {
        let lookups = self.sources.iter().map(|source| {
            let source = Arc::clone(source);
            let per_source_timeout = self.source_timeout;
            async move {
                match timeout(per_source_timeout, source.quotes(card)).await {
                    Ok(Ok(quotes)) => {
                        debug!("{} returned {} quotes for {}", source.name(), quotes.len(), card.card_id);
                        quotes
                    }
                    Ok(Err(err)) => {
                        warn!("price lookup at {} failed: {}", source.name(), err);
                        Vec::new()
                    }
                    Err(_) => {
                        warn!(
                            "price lookup at {} timed out after {:?}",
                            source.name(),
                            per_source_timeout
                        );
                        Vec::new()
                    }
                }
            }
        });

        let mut quotes: Vec<PriceQuote> = join_all(lookups).await.into_iter().flatten().collect();
        quotes.retain(|quote| {
            let keep = quote.price.is_finite() && quote.price >= 0.0;
            if !keep {
                warn!("dropping {} quote with unusable price {}", quote.source, quote.price);
            }
            keep
        });

        summarize(quotes)
    }
}

fn summarize(prices: Vec<PriceQuote>) -> PriceSummary {
    let market_price = mean_price(&prices);
    let price_trend = determine_trend(&prices);
    PriceSummary {
        prices,
        market_price,
        price_trend,
        last_updated: Utc::now(),
    }
}

fn mean_price(quotes: &[PriceQuote]) -> f64 {
    if quotes.is_empty() {
        return 0.0;
    }
    let total: f64 = quotes.iter().map(|quote| quote.price).sum();
    round_cents(total / quotes.len() as f64)
}

/// The most recently collected quote measured against the mean: more than 5%
/// above reads as rising, more than 5% below as falling.
fn determine_trend(quotes: &[PriceQuote]) -> PriceTrend {
    let last = match quotes.last() {
        Some(quote) => quote.price,
        None => return PriceTrend::Stable,
    };
    let mean = quotes.iter().map(|quote| quote.price).sum::<f64>() / quotes.len() as f64;
    if last > mean * 1.05 {
        PriceTrend::Rising
    } else if last < mean * 0.95 {
        PriceTrend::Falling
    } else {
        PriceTrend::Stable
    }
}

pub(crate) fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
pub mod mock {
    use async_trait::async_trait;
    use reqwest::StatusCode;

    use crate::error::{PriceCheckError, Result};
    use crate::models::{CanonicalCard, CardCondition, PriceQuote};

    use super::PriceSource;

    /// Scripted source for aggregator and pipeline tests.
    pub struct MockSource {
        name: &'static str,
        prices: Vec<f64>,
        fail: bool,
    }

    impl MockSource {
        pub fn with_prices(name: &'static str, prices: Vec<f64>) -> Self {
            Self {
                name,
                prices,
                fail: false,
            }
        }

        pub fn failing(name: &'static str) -> Self {
            Self {
                name,
                prices: Vec::new(),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl PriceSource for MockSource {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn quotes(&self, card: &CanonicalCard) -> Result<Vec<PriceQuote>> {
            if self.fail {
                return Err(PriceCheckError::HttpStatus(StatusCode::SERVICE_UNAVAILABLE));
            }
            Ok(self
                .prices
                .iter()
                .map(|&price| PriceQuote {
                    source: self.name.to_string(),
                    price,
                    currency: "USD".to_string(),
                    condition: CardCondition::NearMint,
                    variant: None,
                    url: format!("https://market.example.com/{}", card.card_id),
                    in_stock: true,
                    seller: self.name.to_string(),
                    synthetic: false,
                })
                .collect())
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
