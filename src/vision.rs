//! Card identification from photos via a vision-capable chat model.
//!
//! The image travels as a base64 data URL to an OpenAI-compatible
//! `/chat/completions` endpoint; the card fields are parsed back out of the
//! model's free-form reply.

use base64::Engine;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{PriceCheckError, Result};
use crate::models::{CardIdentification, ImageBlob};

/// Upload size ceiling in bytes (10 MB)
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

const VISION_MODEL: &str = "gpt-4o";
const MAX_COMPLETION_TOKENS: u32 = 500;
// Low temperature for consistent structured replies
const TEMPERATURE: f32 = 0.2;

const IDENTIFY_PROMPT: &str = r#"Analyze this trading card image and extract the following information:
1. Card Name (the character or subject name)
2. Set Name (the set or series this card belongs to, usually printed at the bottom)
3. Card Number (e.g. "25/102" - number out of total in set)
4. Rarity (common, uncommon, rare, holo rare, etc.)

Provide the response in this exact JSON format:
{
    "card_name": "name here",
    "set_name": "set name here",
    "card_number": "card number here",
    "rarity": "rarity here",
    "confidence": "high/medium/low"
}

Be as accurate as possible. If you cannot clearly read some information, mark confidence as "medium" or "low"."#;

const STRICT_IDENTIFY_PROMPT: &str = r#"Identify the trading card in this image.

Reply with ONLY a single JSON object and nothing else - no code fences, no explanation:
{"card_name": "...", "set_name": "...", "card_number": "...", "rarity": "...", "confidence": "high/medium/low"}

Use null for any field you cannot read. card_name must never be null."#;

/// Client for the vision identification API.
///
/// Exactly one outbound call per identification; no retries here (retry
/// policy belongs to the orchestrator).
#[derive(Clone)]
pub struct VisionIdentifier {
    pub(crate) client: reqwest::Client,
    pub(crate) api_key: Option<String>,
    pub(crate) base_url: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
    detail: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl VisionIdentifier {
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

    /// Identify the card shown in an uploaded photo.
    ///
    /// Fails with `InvalidImage` before any network call when the bytes are
    /// not a supported raster image or exceed [`MAX_IMAGE_BYTES`], with
    /// `IdentificationUnavailable` when the vision API cannot be used, and
    /// with `IdentificationParse` when the reply holds no identification.
    pub async fn identify(&self, image: &ImageBlob) -> Result<CardIdentification> {
        self.identify_with_prompt(image, IDENTIFY_PROMPT).await
    }

    /// Same contract as [`Self::identify`], with a stricter instruction block
    /// for the orchestrator's one-shot retry after a parse failure.
    pub async fn identify_strict(&self, image: &ImageBlob) -> Result<CardIdentification> {
        self.identify_with_prompt(image, STRICT_IDENTIFY_PROMPT).await
    }

    async fn identify_with_prompt(
        &self,
        image: &ImageBlob,
        prompt: &str,
    ) -> Result<CardIdentification> {
        let mime = validate_image(image)?;
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            PriceCheckError::IdentificationUnavailable("no vision API key configured".to_string())
        })?;

        let encoded = base64::engine::general_purpose::STANDARD.encode(&image.bytes);
        let body = ChatRequest {
            model: VISION_MODEL,
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text { text: prompt },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: format!("data:{};base64,{}", mime, encoded),
                            detail: "high",
                        },
                    },
                ],
            }],
            max_tokens: MAX_COMPLETION_TOKENS,
            temperature: TEMPERATURE,
        };

        debug!("Sending {} byte {} image for identification", image.size(), mime);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                PriceCheckError::IdentificationUnavailable(format!("request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PriceCheckError::IdentificationUnavailable(format!(
                "vision API returned {}",
                status
            )));
        }

        let reply: ChatResponse = response.json().await.map_err(|e| {
            PriceCheckError::IdentificationUnavailable(format!(
                "malformed vision API response: {}",
                e
            ))
        })?;

        let content = reply
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .ok_or_else(|| {
                PriceCheckError::IdentificationParse("empty model reply".to_string())
            })?;

        debug!("Vision model reply: {}", content);

        let identification = parse_identification(content)?;
        info!(
            "Identified card '{}' (confidence {:?})",
            identification.card_name, identification.confidence
        );
        Ok(identification)
    }
}

/// Check that the upload is a supported raster image under the size ceiling.
///
/// Returns the sniffed MIME type; the client-declared content type is
/// advisory only and never trusted here.
fn validate_image(image: &ImageBlob) -> Result<&'static str> {
    if image.bytes.is_empty() {
        return Err(PriceCheckError::InvalidImage("empty upload".to_string()));
    }
    if image.size() > MAX_IMAGE_BYTES {
        return Err(PriceCheckError::InvalidImage(format!(
            "image is {} bytes, limit is {} bytes",
            image.size(),
            MAX_IMAGE_BYTES
        )));
    }
    match infer::get(&image.bytes) {
        Some(kind) if is_supported_image(kind.mime_type()) => Ok(kind.mime_type()),
        Some(kind) => Err(PriceCheckError::InvalidImage(format!(
            "unsupported file type {}",
            kind.mime_type()
        ))),
        None => Err(PriceCheckError::InvalidImage(
            "not a recognizable image".to_string(),
        )),
    }
}

fn is_supported_image(mime: &str) -> bool {
    matches!(mime, "image/jpeg" | "image/png" | "image/jp2" | "image/webp")
}

/// Pull a [`CardIdentification`] out of a free-form model reply.
fn parse_identification(content: &str) -> Result<CardIdentification> {
    let json = extract_json(content);
    let identification: CardIdentification = serde_json::from_str(json)
        .map_err(|e| PriceCheckError::IdentificationParse(e.to_string()))?;

    if identification.card_name.trim().is_empty() {
        return Err(PriceCheckError::IdentificationParse(
            "model reply has no card name".to_string(),
        ));
    }
    Ok(identification)
}

/// Strip code fences and surrounding prose down to the JSON payload.
fn extract_json(content: &str) -> &str {
    if let Some(start) = content.find("```json") {
        let rest = &content[start + 7..];
        if let Some(end) = rest.find("```") {
            return rest[..end].trim();
        }
    }
    if let Some(start) = content.find("```") {
        let rest = &content[start + 3..];
        if let Some(end) = rest.find("```") {
            return rest[..end].trim();
        }
    }
    // No fences: cut any prose around the outermost braces.
    match (content.find('{'), content.rfind('}')) {
        (Some(open), Some(close)) if close > open => &content[open..=close],
        _ => content.trim(),
    }
}

#[cfg(test)]
#[path = "vision_tests.rs"]
mod tests;
