//! Value objects shared across the identification, resolution and pricing
//! stages.
//!
//! Everything here is created and discarded within one request and is never
//! mutated after construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw uploaded image plus the client-declared content type.
#[derive(Debug, Clone)]
pub struct ImageBlob {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl ImageBlob {
    pub fn new(bytes: Vec<u8>, content_type: Option<String>) -> Self {
        Self {
            bytes,
            content_type,
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// How sure the vision model is about an identification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Default for Confidence {
    // A reply that omits the confidence field reads as a confident answer.
    fn default() -> Self {
        Confidence::High
    }
}

/// The vision model's best guess at which card a photo depicts.
///
/// `card_name` is always non-empty; the remaining fields are whatever the
/// model could read off the photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardIdentification {
    pub card_name: String,
    #[serde(default)]
    pub set_name: Option<String>,
    #[serde(default)]
    pub card_number: Option<String>,
    #[serde(default)]
    pub rarity: Option<String>,
    #[serde(default)]
    pub confidence: Confidence,
}

/// Market price points for one printing category, as published by the card
/// database. Only the market price is consumed here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PricePoints {
    #[serde(default)]
    pub market: Option<f64>,
}

/// Marketplace payload embedded in a card database record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TcgplayerData {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub prices: TcgplayerPrices,
}

/// Per-printing price table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TcgplayerPrices {
    #[serde(default)]
    pub normal: Option<PricePoints>,
    #[serde(default)]
    pub holofoil: Option<PricePoints>,
    #[serde(default, rename = "reverseHolofoil")]
    pub reverse_holofoil: Option<PricePoints>,
    #[serde(default, rename = "1stEdition")]
    pub first_edition: Option<PricePoints>,
}

/// A resolved, canonical card record.
///
/// `card_id` is the stable key used by price lookups. When resolution fell
/// back (database unreachable or no match) the id is a deterministic slug of
/// the identification and `image_url` is `None`, signaling that the uploaded
/// photo is the only artwork available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalCard {
    pub card_id: String,
    pub card_name: String,
    #[serde(default)]
    pub set_name: Option<String>,
    #[serde(default)]
    pub card_number: Option<String>,
    #[serde(default)]
    pub rarity: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Marketplace payload carried through from a successful lookup; never
    /// serialized outward
    #[serde(skip)]
    pub tcgplayer: Option<TcgplayerData>,
}

/// Card condition scale used across all marketplace sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardCondition {
    #[serde(rename = "Near Mint")]
    NearMint,
    #[serde(rename = "Lightly Played")]
    LightlyPlayed,
    #[serde(rename = "Moderately Played")]
    ModeratelyPlayed,
    #[serde(rename = "Heavily Played")]
    HeavilyPlayed,
    Damaged,
    Graded,
}

/// One normalized price listing from a marketplace source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub source: String,
    pub price: f64,
    pub currency: String,
    pub condition: CardCondition,
    /// Printing variant (holofoil, reverse holo, 1st edition, graded) when
    /// the source distinguishes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    pub url: String,
    pub in_stock: bool,
    pub seller: String,
    /// True when the quote was synthesized instead of read from a live
    /// source. Internal only, never serialized.
    #[serde(skip)]
    pub synthetic: bool,
}

/// Direction of the market price, derived from the quotes at hand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceTrend {
    Rising,
    Falling,
    Stable,
}

/// Aggregated pricing for one card, computed fresh per request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSummary {
    pub prices: Vec<PriceQuote>,
    pub market_price: f64,
    pub price_trend: PriceTrend,
    pub last_updated: DateTime<Utc>,
}

/// Terminal response of the full pipeline: resolved card plus pricing.
///
/// The two parts flatten into one JSON object; their field names are
/// disjoint by construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineResult {
    #[serde(flatten)]
    pub card: CanonicalCard,
    #[serde(flatten)]
    pub pricing: PriceSummary,
}

/// Identification endpoint response: the resolved card plus the model's
/// confidence in the underlying identification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentifiedCard {
    #[serde(flatten)]
    pub card: CanonicalCard,
    pub confidence: Confidence,
}

/// Lightweight card record returned by the search endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSummary {
    pub card_id: String,
    pub card_name: String,
    pub set_name: Option<String>,
    pub card_number: Option<String>,
    pub rarity: Option<String>,
    pub image_url: Option<String>,
}
