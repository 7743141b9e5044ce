//! Marketplace price sources.
//!
//! `TcgplayerSource` reads the price table the card database embeds in a
//! resolved record when one is present. Everything else, including the other
//! two marketplaces, falls back to synthesized quotes (see [`super::synthetic`]).

use async_trait::async_trait;
use log::info;

use crate::error::Result;
use crate::models::{CanonicalCard, CardCondition, PriceQuote, TcgplayerData};

use super::round_cents;
use super::synthetic::{seeded_base_price, PriceBand};

const TCGPLAYER: &str = "TCGPlayer";
const EBAY: &str = "eBay";
const CARDMARKET: &str = "Cardmarket";

const TCGPLAYER_BAND: PriceBand = PriceBand { low: 5.0, high: 50.0 };
const EBAY_BAND: PriceBand = PriceBand { low: 8.0, high: 55.0 };
const CARDMARKET_BAND: PriceBand = PriceBand { low: 6.0, high: 45.0 };

/// A marketplace that can quote prices for a resolved card.
#[async_trait]
pub trait PriceSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// All quotes this source has for the card. An error here never fails
    /// aggregation; the source just contributes nothing.
    async fn quotes(&self, card: &CanonicalCard) -> Result<Vec<PriceQuote>>;
}

/// TCGPlayer quotes, preferring the published market prices carried on the
/// card record over synthesized ones.
pub struct TcgplayerSource;

#[async_trait]
impl PriceSource for TcgplayerSource {
    fn name(&self) -> &'static str {
        TCGPLAYER
    }

    async fn quotes(&self, card: &CanonicalCard) -> Result<Vec<PriceQuote>> {
        if let Some(data) = &card.tcgplayer {
            let quotes = published_market_quotes(data);
            if !quotes.is_empty() {
                info!(
                    "using {} published TCGPlayer prices for {}",
                    quotes.len(),
                    card.card_id
                );
                return Ok(quotes);
            }
        }

        info!("synthesizing TCGPlayer quotes for {}", card.card_id);
        let url = format!(
            "https://www.tcgplayer.com/search/pokemon/product?q={}",
            urlencoding::encode(&card.card_name)
        );
        let base = seeded_base_price(&card.card_id, TCGPLAYER, &TCGPLAYER_BAND);
        Ok(vec![
            synthetic_quote(
                TCGPLAYER,
                base,
                CardCondition::NearMint,
                None,
                url.clone(),
                "TCGPlayer Market",
            ),
            synthetic_quote(
                TCGPLAYER,
                round_cents(base * 0.85),
                CardCondition::LightlyPlayed,
                None,
                url,
                "TCGPlayer Market",
            ),
        ])
    }
}

/// eBay sold-listing style quotes, one raw and one graded.
pub struct EbaySource;

#[async_trait]
impl PriceSource for EbaySource {
    fn name(&self) -> &'static str {
        EBAY
    }

    async fn quotes(&self, card: &CanonicalCard) -> Result<Vec<PriceQuote>> {
        info!("synthesizing eBay quotes for {}", card.card_id);
        let mut terms = card.card_name.clone();
        if let Some(set) = &card.set_name {
            terms.push(' ');
            terms.push_str(set);
        }
        terms.push_str(" Pokemon Card");
        let url = format!(
            "https://www.ebay.com/sch/i.html?_nkw={}",
            urlencoding::encode(&terms)
        );
        let graded_url = format!("{}&LH_PrefLoc=1", url);
        let base = seeded_base_price(&card.card_id, EBAY, &EBAY_BAND);
        Ok(vec![
            synthetic_quote(
                EBAY,
                base,
                CardCondition::NearMint,
                None,
                url,
                "Various Sellers",
            ),
            synthetic_quote(
                EBAY,
                round_cents(base * 1.15),
                CardCondition::Graded,
                Some("PSA graded"),
                graded_url,
                "Various Sellers",
            ),
        ])
    }
}

/// Cardmarket quotes. A single near-mint listing for now.
pub struct CardmarketSource;

#[async_trait]
impl PriceSource for CardmarketSource {
    fn name(&self) -> &'static str {
        CARDMARKET
    }

    async fn quotes(&self, card: &CanonicalCard) -> Result<Vec<PriceQuote>> {
        info!("synthesizing Cardmarket quotes for {}", card.card_id);
        let url = format!(
            "https://www.cardmarket.com/en/Pokemon/Products/Search?searchString={}",
            urlencoding::encode(&card.card_name)
        );
        let base = seeded_base_price(&card.card_id, CARDMARKET, &CARDMARKET_BAND);
        Ok(vec![synthetic_quote(
            CARDMARKET,
            base,
            CardCondition::NearMint,
            None,
            url,
            "Cardmarket Sellers",
        )])
    }
}

/// One near-mint quote per printing category that carries a market price.
fn published_market_quotes(data: &TcgplayerData) -> Vec<PriceQuote> {
    let url = data
        .url
        .clone()
        .unwrap_or_else(|| "https://www.tcgplayer.com".to_string());

    let categories = [
        (&data.prices.normal, None),
        (&data.prices.holofoil, Some("Holofoil")),
        (&data.prices.reverse_holofoil, Some("Reverse Holo")),
        (&data.prices.first_edition, Some("1st Edition")),
    ];

    let mut quotes = Vec::new();
    for (points, variant) in categories {
        if let Some(market) = points.as_ref().and_then(|p| p.market) {
            quotes.push(PriceQuote {
                source: TCGPLAYER.to_string(),
                price: round_cents(market),
                currency: "USD".to_string(),
                condition: CardCondition::NearMint,
                variant: variant.map(str::to_string),
                url: url.clone(),
                in_stock: true,
                seller: "TCGPlayer Market".to_string(),
                synthetic: false,
            });
        }
    }
    quotes
}

fn synthetic_quote(
    source: &str,
    price: f64,
    condition: CardCondition,
    variant: Option<&str>,
    url: String,
    seller: &str,
) -> PriceQuote {
    PriceQuote {
        source: source.to_string(),
        price,
        currency: "USD".to_string(),
        condition,
        variant: variant.map(str::to_string),
        url,
        in_stock: true,
        seller: seller.to_string(),
        synthetic: true,
    }
}
