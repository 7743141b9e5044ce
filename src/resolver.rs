//! Resolution of a vision identification into a canonical card record.
//!
//! Resolution never fails outward: when the card database is slow,
//! unreachable or has no match, a fallback record with a deterministic slug
//! id is synthesized from the identification itself.

use std::time::Duration;

use log::{debug, info, warn};
use tokio::time::timeout;

use crate::card_api::{ApiCard, CardApi};
use crate::error::Result;
use crate::models::{CanonicalCard, CardIdentification};

/// Ceiling on one resolution, the broadened retry included
pub const RESOLVE_TIMEOUT: Duration = Duration::from_secs(30);

pub struct CardResolver {
    card_api: CardApi,
    lookup_timeout: Duration,
}

impl CardResolver {
    pub fn new(card_api: CardApi) -> Self {
        Self {
            card_api,
            lookup_timeout: RESOLVE_TIMEOUT,
        }
    }

    /// Override the lookup ceiling (tests)
    pub fn with_lookup_timeout(mut self, lookup_timeout: Duration) -> Self {
        self.lookup_timeout = lookup_timeout;
        self
    }

    /// Resolve an identification to a canonical card.
    ///
    /// Never fails: any lookup problem falls through to the fallback record,
    /// whose `card_id` is stable for the same identification. The returned
    /// card always carries the identification's name.
    pub async fn resolve(&self, identification: &CardIdentification) -> CanonicalCard {
        let lookup = self.card_api.find_cards(
            &identification.card_name,
            identification.set_name.as_deref(),
            identification.card_number.as_deref(),
        );

        match timeout(self.lookup_timeout, lookup).await {
            Ok(Ok(candidates)) if !candidates.is_empty() => {
                let card = pick_best_match(&identification.card_name, candidates).into_canonical();
                info!(
                    "Resolved '{}' to database card '{}'",
                    identification.card_name, card.card_id
                );
                card
            }
            Ok(Ok(_)) => {
                info!(
                    "No database match for '{}', using fallback card",
                    identification.card_name
                );
                fallback_card(identification)
            }
            Ok(Err(e)) => {
                warn!(
                    "Card lookup for '{}' failed: {}, using fallback card",
                    identification.card_name, e
                );
                fallback_card(identification)
            }
            Err(_) => {
                warn!(
                    "Card lookup for '{}' timed out, using fallback card",
                    identification.card_name
                );
                fallback_card(identification)
            }
        }
    }

    /// Resolve a card database id directly.
    ///
    /// Unlike [`Self::resolve`] this propagates errors; with nothing but an
    /// id there is no identification to fall back on.
    pub async fn resolve_by_id(&self, card_id: &str) -> Result<CanonicalCard> {
        let card = self.card_api.card_by_id(card_id).await?;
        Ok(card.into_canonical())
    }
}

/// Choose the best candidate for an identified name.
///
/// An exact (case-insensitive) name match wins outright; otherwise the
/// highest Jaro-Winkler similarity. Ties keep the earlier candidate,
/// preserving the database's relevance order.
fn pick_best_match(name: &str, mut candidates: Vec<ApiCard>) -> ApiCard {
    let target = name.trim().to_lowercase();

    if let Some(exact) = candidates
        .iter()
        .position(|candidate| candidate.name.trim().to_lowercase() == target)
    {
        return candidates.swap_remove(exact);
    }

    let mut best = 0;
    let mut best_score = -1.0f64;
    for (index, candidate) in candidates.iter().enumerate() {
        let score = strsim::jaro_winkler(&target, &candidate.name.trim().to_lowercase());
        if score > best_score {
            best = index;
            best_score = score;
        }
    }

    debug!(
        "Similarity match for '{}': '{}' ({:.3})",
        name, candidates[best].name, best_score
    );
    candidates.swap_remove(best)
}

/// Build the fallback record for an identification the database could not
/// resolve. The id is a slug of name and set, so repeated fallbacks for the
/// same identification agree; `image_url` stays empty, telling the caller to
/// show the uploaded photo instead.
fn fallback_card(identification: &CardIdentification) -> CanonicalCard {
    let mut id_source = identification.card_name.clone();
    if let Some(ref set) = identification.set_name {
        id_source.push(' ');
        id_source.push_str(set);
    }

    CanonicalCard {
        card_id: slugify(&id_source),
        card_name: identification.card_name.clone(),
        set_name: identification.set_name.clone(),
        card_number: identification.card_number.clone(),
        rarity: identification.rarity.clone(),
        image_url: None,
        tcgplayer: None,
    }
}

/// Lowercase slug: alphanumerics kept, every other run collapsed to one '-'.
fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;
    for c in value.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "unknown-card".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
