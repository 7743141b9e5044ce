//! Web server for the card price checker
//!
//! Provides REST API endpoints for photo-based identification, price checks
//! and card search.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::card_api::CardApi;
use crate::error::PriceCheckError;
use crate::models::{CardSummary, IdentifiedCard, ImageBlob, PipelineResult, PriceSummary};
use crate::pipeline::Pipeline;
use crate::vision::MAX_IMAGE_BYTES;

/// Shared application state (pipeline + card database client)
#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
    card_api: CardApi,
}

/// Search query parameters
#[derive(Deserialize)]
struct SearchParams {
    q: String,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    10
}

/// Health document served at the root
#[derive(Serialize)]
struct Health {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

/// JSON error body; paired with a status code in handler results
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

fn error_status(err: &PriceCheckError) -> StatusCode {
    match err {
        PriceCheckError::InvalidImage(_) => StatusCode::BAD_REQUEST,
        PriceCheckError::IdentificationParse(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PriceCheckError::IdentificationUnavailable(_) => StatusCode::BAD_GATEWAY,
        PriceCheckError::Network(_) | PriceCheckError::HttpStatus(_) => StatusCode::BAD_GATEWAY,
        PriceCheckError::Parse(_) => StatusCode::INTERNAL_SERVER_ERROR,
        PriceCheckError::CardNotFound(_) => StatusCode::NOT_FOUND,
    }
}

fn is_image_upload(content_type: Option<&str>) -> bool {
    match content_type {
        // The sniffer in the vision stage has the final word; this only
        // rejects uploads that declare themselves as something else.
        Some(declared) => declared.starts_with("image/"),
        None => true,
    }
}

/// First file field of a multipart upload
async fn read_upload(multipart: &mut Multipart) -> Result<ImageBlob, ApiError> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("unreadable upload: {}", e)))?
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "no file in upload"))?;

    let content_type = field.content_type().map(str::to_string);
    if !is_image_upload(content_type.as_deref()) {
        return Err(api_error(StatusCode::BAD_REQUEST, "file must be an image"));
    }

    let bytes = field
        .bytes()
        .await
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("unreadable upload: {}", e)))?;

    Ok(ImageBlob::new(bytes.to_vec(), content_type))
}

/// GET / - service health document
async fn health_handler() -> Json<Health> {
    Json(Health {
        status: "online",
        service: "card_price_check",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// POST /api/identify-card - identify the card on an uploaded photo
async fn identify_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IdentifiedCard>, ApiError> {
    let image = read_upload(&mut multipart).await?;

    match state.pipeline.identify_card(&image).await {
        Ok(identified) => Ok(Json(identified)),
        Err(e) => {
            log::error!("Identification failed: {}", e);
            Err(api_error(error_status(&e), e.to_string()))
        }
    }
}

/// POST /api/check-price - full pipeline: identify, resolve, price
async fn check_price_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PipelineResult>, ApiError> {
    let image = read_upload(&mut multipart).await?;

    match state.pipeline.run(&image).await {
        Ok(result) => Ok(Json(result)),
        Err(e) => {
            log::error!("Price check failed: {}", e);
            Err(api_error(error_status(&e), e.to_string()))
        }
    }
}

/// GET /api/card/{card_id}/prices - prices for an already known card id
async fn card_prices_handler(
    State(state): State<AppState>,
    Path(card_id): Path<String>,
) -> Result<Json<PriceSummary>, ApiError> {
    match state.pipeline.price_by_id(&card_id).await {
        Ok(summary) => Ok(Json(summary)),
        Err(e) => {
            log::error!("Price lookup for {} failed: {}", card_id, e);
            Err(api_error(error_status(&e), e.to_string()))
        }
    }
}

/// GET /api/search?q={query}&limit={limit}
async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<Vec<CardSummary>> {
    Json(state.card_api.search_cards(&params.q, params.limit).await)
}

/// Build the web server router
pub fn create_router(pipeline: Arc<Pipeline>, card_api: CardApi) -> Router {
    let state = AppState { pipeline, card_api };

    // Any-origin CORS; the browser frontends this serves run on their own
    // ports.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(health_handler))
        .route("/api/identify-card", post(identify_handler))
        .route("/api/check-price", post(check_price_handler))
        .route("/api/card/{card_id}/prices", get(card_prices_handler))
        .route("/api/search", get(search_handler))
        .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + 1024 * 1024))
        .layer(cors)
        .with_state(state)
}

/// Start the web server (async)
///
/// Binds to 0.0.0.0 (all interfaces) to work with Docker port mapping.
/// When running locally, use firewall rules to restrict access.
pub async fn serve(
    pipeline: Arc<Pipeline>,
    card_api: CardApi,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(pipeline, card_api);
    let addr = format!("0.0.0.0:{}", port);

    log::info!("Card price API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server shutdown complete");
    Ok(())
}

/// Resolves on ctrl-c or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log::info!("Received ctrl-c, shutting down");
        },
        _ = terminate => {
            log::info!("Received terminate signal, shutting down");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::PriceAggregator;
    use crate::resolver::CardResolver;
    use crate::vision::VisionIdentifier;

    fn test_components() -> (Arc<Pipeline>, CardApi) {
        let client = reqwest::Client::new();
        let card_api = CardApi::new(client.clone(), None, "http://localhost:0");
        let vision = VisionIdentifier::new(client, None, "http://localhost:0");
        let pipeline = Pipeline::new(
            vision,
            CardResolver::new(card_api.clone()),
            PriceAggregator::with_default_sources(),
        );
        (Arc::new(pipeline), card_api)
    }

    #[test]
    fn test_create_router() {
        let (pipeline, card_api) = test_components();

        let _router = create_router(pipeline, card_api);
        // If we got here without panicking, every route pattern parsed
    }

    #[test]
    fn test_search_params_default_limit() {
        let params = SearchParams {
            q: "test".to_string(),
            limit: default_limit(),
        };

        assert_eq!(params.limit, 10);
    }

    #[test]
    fn test_health_serialization() {
        let json = serde_json::to_string(&Health {
            status: "online",
            service: "card_price_check",
            version: "1.0.0",
        })
        .unwrap();

        assert!(json.contains("\"status\":\"online\""));
        assert!(json.contains("\"service\":\"card_price_check\""));
    }

    #[test]
    fn test_api_error_carries_message() {
        let (status, Json(body)) = api_error(StatusCode::BAD_REQUEST, "file must be an image");

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "file must be an image");
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (
                PriceCheckError::InvalidImage("empty upload".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                PriceCheckError::IdentificationParse("empty model reply".to_string()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                PriceCheckError::IdentificationUnavailable("no key".to_string()),
                StatusCode::BAD_GATEWAY,
            ),
            (
                PriceCheckError::HttpStatus(StatusCode::INTERNAL_SERVER_ERROR),
                StatusCode::BAD_GATEWAY,
            ),
            (
                PriceCheckError::CardNotFound("base1-4".to_string()),
                StatusCode::NOT_FOUND,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(error_status(&err), expected, "wrong status for {}", err);
        }

        let parse_err =
            PriceCheckError::from(serde_json::from_str::<serde_json::Value>("not json").unwrap_err());
        assert_eq!(error_status(&parse_err), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_image_upload_check() {
        assert!(is_image_upload(Some("image/png")));
        assert!(is_image_upload(Some("image/jpeg")));
        assert!(is_image_upload(None));
        assert!(!is_image_upload(Some("application/pdf")));
        assert!(!is_image_upload(Some("text/html")));
    }
}
