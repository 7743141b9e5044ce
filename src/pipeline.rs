//! The identify, resolve, price pipeline.
//!
//! Failure policy per stage: identification errors stop the run (nothing to
//! price without a card name), resolution always yields a card (falling back
//! to a slug record), and pricing always yields a summary (possibly empty).

use log::{info, warn};

use crate::error::{PriceCheckError, Result};
use crate::models::{
    CardIdentification, IdentifiedCard, ImageBlob, PipelineResult, PriceSummary,
};
use crate::pricing::PriceAggregator;
use crate::resolver::CardResolver;
use crate::vision::VisionIdentifier;

pub struct Pipeline {
    vision: VisionIdentifier,
    resolver: CardResolver,
    aggregator: PriceAggregator,
    retry_parse_failures: bool,
}

impl Pipeline {
    pub fn new(
        vision: VisionIdentifier,
        resolver: CardResolver,
        aggregator: PriceAggregator,
    ) -> Self {
        Self {
            vision,
            resolver,
            aggregator,
            retry_parse_failures: false,
        }
    }

    /// Retry an unparseable model reply once with the strict prompt before
    /// giving up.
    pub fn with_parse_retry(mut self) -> Self {
        self.retry_parse_failures = true;
        self
    }

    /// Full run: photo in, priced card out.
    pub async fn run(&self, image: &ImageBlob) -> Result<PipelineResult> {
        let identification = self.identify(image).await?;
        let card = self.resolver.resolve(&identification).await;
        let pricing = self.aggregator.aggregate(&card).await;
        info!(
            "priced {} at {} from {} quotes",
            card.card_id,
            pricing.market_price,
            pricing.prices.len()
        );
        Ok(PipelineResult { card, pricing })
    }

    /// The raw vision identification, before any database lookup.
    pub async fn identify_only(&self, image: &ImageBlob) -> Result<CardIdentification> {
        self.identify(image).await
    }

    /// Identification resolved against the card database, without pricing.
    pub async fn identify_card(&self, image: &ImageBlob) -> Result<IdentifiedCard> {
        let identification = self.identify(image).await?;
        let confidence = identification.confidence;
        let card = self.resolver.resolve(&identification).await;
        Ok(IdentifiedCard { card, confidence })
    }

    /// Pricing for a card id the caller already knows. Unlike [`Self::run`],
    /// an unknown id is an error here.
    pub async fn price_by_id(&self, card_id: &str) -> Result<PriceSummary> {
        let card = self.resolver.resolve_by_id(card_id).await?;
        Ok(self.aggregator.aggregate(&card).await)
    }

    async fn identify(&self, image: &ImageBlob) -> Result<CardIdentification> {
        match self.vision.identify(image).await {
            Err(PriceCheckError::IdentificationParse(reason)) if self.retry_parse_failures => {
                warn!("unparseable model reply ({}), retrying with strict prompt", reason);
                self.vision.identify_strict(image).await
            }
            other => other,
        }
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
