//! Card database client (Pokemon TCG API v2).
//!
//! Lookups use the `cards` endpoint query grammar
//! (`name:"X" set.name:"Y" number:Z`) with optional `X-Api-Key`
//! authentication.

use std::time::Duration;

use log::{debug, warn};
use serde::Deserialize;

use crate::error::{PriceCheckError, Result};
use crate::models::{CanonicalCard, CardSummary, TcgplayerData};

/// Per-request ceiling on card database lookups
pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Client for the card database API
#[derive(Clone)]
pub struct CardApi {
    pub(crate) client: reqwest::Client,
    pub(crate) api_key: Option<String>,
    pub(crate) base_url: String,
}

/// One card record as returned by the database
#[derive(Debug, Deserialize)]
pub struct ApiCard {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub rarity: Option<String>,
    #[serde(default)]
    pub set: Option<ApiSet>,
    #[serde(default)]
    pub images: Option<ApiImages>,
    #[serde(default)]
    pub tcgplayer: Option<TcgplayerData>,
}

#[derive(Debug, Deserialize)]
pub struct ApiSet {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiImages {
    #[serde(default)]
    pub small: Option<String>,
    #[serde(default)]
    pub large: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CardListResponse {
    #[serde(default)]
    data: Vec<ApiCard>,
}

#[derive(Debug, Deserialize)]
struct CardResponse {
    data: ApiCard,
}

impl ApiCard {
    /// Map into the canonical record, preferring the large artwork.
    pub fn into_canonical(self) -> CanonicalCard {
        let ApiCard {
            id,
            name,
            number,
            rarity,
            set,
            images,
            tcgplayer,
        } = self;

        CanonicalCard {
            card_id: id,
            card_name: name,
            set_name: set.map(|s| s.name),
            card_number: number,
            rarity,
            image_url: images.and_then(|i| i.large.or(i.small)),
            tcgplayer,
        }
    }

    /// Map into the lightweight search record (small artwork).
    pub fn into_summary(self) -> CardSummary {
        let ApiCard {
            id,
            name,
            number,
            rarity,
            set,
            images,
            ..
        } = self;

        CardSummary {
            card_id: id,
            card_name: name,
            set_name: set.map(|s| s.name),
            card_number: number,
            rarity,
            image_url: images.and_then(|i| i.small.or(i.large)),
        }
    }
}

impl CardApi {
    pub fn new(
        client: reqwest::Client,
        api_key: Option<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.into(),
        }
    }

    /// Search for candidate cards matching an identification.
    ///
    /// The query filters on name, set name and card number where available.
    /// When the filtered query matches nothing, the search retries once with
    /// the name alone; a misread set or number should not hide the card.
    pub async fn find_cards(
        &self,
        name: &str,
        set_name: Option<&str>,
        card_number: Option<&str>,
    ) -> Result<Vec<ApiCard>> {
        let name_query = format!("name:\"{}\"", name);
        let mut query_parts = vec![name_query.clone()];
        if let Some(set) = set_name {
            query_parts.push(format!("set.name:\"{}\"", set));
        }
        if let Some(number) = card_number {
            // "25/102" style: the database keys on the part before the slash
            let number = number.split('/').next().unwrap_or(number).trim();
            if !number.is_empty() {
                query_parts.push(format!("number:{}", number));
            }
        }

        let query = query_parts.join(" ");
        debug!("Card database query: {}", query);

        let cards = self.run_query(&query).await?;
        if !cards.is_empty() || query_parts.len() == 1 {
            return Ok(cards);
        }

        debug!("No match for filtered query, retrying with name only");
        self.run_query(&name_query).await
    }

    /// Fetch a single card by its database id.
    ///
    /// Unknown ids and database errors propagate; this path has no fallback.
    pub async fn card_by_id(&self, card_id: &str) -> Result<ApiCard> {
        let url = format!(
            "{}/cards/{}",
            self.base_url,
            urlencoding::encode(card_id)
        );
        let response = self.request(&url).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(PriceCheckError::CardNotFound(card_id.to_string()));
        }
        if !status.is_success() {
            return Err(PriceCheckError::HttpStatus(status));
        }

        let body = response.text().await?;
        let card: CardResponse = serde_json::from_str(&body)?;
        Ok(card.data)
    }

    /// Free-form card search; degrades to an empty list on any failure.
    pub async fn search_cards(&self, query: &str, limit: usize) -> Vec<CardSummary> {
        let limit = if limit == 0 { DEFAULT_SEARCH_LIMIT } else { limit };
        let page_size = limit.to_string();

        let lookup = async {
            let response = self
                .request(&format!("{}/cards", self.base_url))
                .query(&[("q", query), ("pageSize", page_size.as_str())])
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(PriceCheckError::HttpStatus(status));
            }

            let body = response.text().await?;
            let list: CardListResponse = serde_json::from_str(&body)?;
            Ok(list.data)
        };

        match lookup.await {
            Ok(cards) => cards.into_iter().map(ApiCard::into_summary).collect(),
            Err(e) => {
                warn!("Card search for '{}' failed: {}", query, e);
                Vec::new()
            }
        }
    }

    async fn run_query(&self, query: &str) -> Result<Vec<ApiCard>> {
        let response = self
            .request(&format!("{}/cards", self.base_url))
            .query(&[("q", query)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PriceCheckError::HttpStatus(status));
        }

        let body = response.text().await?;
        let list: CardListResponse = serde_json::from_str(&body)?;
        Ok(list.data)
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.get(url).timeout(LOOKUP_TIMEOUT);
        if let Some(ref key) = self.api_key {
            builder = builder.header("X-Api-Key", key);
        }
        builder
    }
}

#[cfg(test)]
#[path = "card_api_tests.rs"]
mod tests;
