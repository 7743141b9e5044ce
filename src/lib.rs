//! Card Price Check - photo in, priced card out
//!
//! Identifies a trading card from an uploaded photo with a vision model,
//! resolves it against the card database, and aggregates market prices
//! across marketplace sources.
//!
//! Failure policy per stage: identification errors stop a run, resolution
//! always yields a card (falling back to a deterministic slug record), and
//! pricing always yields a summary, possibly an empty one.

pub mod card_api;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod pricing;
pub mod resolver;
pub mod vision;
pub mod web;

pub use error::{PriceCheckError, Result};
pub use models::{
    CanonicalCard, CardIdentification, ImageBlob, PipelineResult, PriceQuote, PriceSummary,
};
pub use pipeline::Pipeline;
