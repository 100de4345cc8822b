//! HTTP routes for the screener service.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use zero_common::{Error, IndexSymbolConfig};

use crate::data::{CacheStats, DateColumn};
use crate::screener::{
    ColumnChoices, Constraint, ListingOptions, MetricFilter, ScreenRequest, ScreenResponse,
    ScreenResult,
};
use crate::ScreenerState;

// ============================================================================
// Router
// ============================================================================

/// Build the HTTP router over shared state.
pub fn build_router(state: Arc<ScreenerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        // Listings
        .route("/api/v1/listings/options", get(listing_options))
        .route("/api/v1/listings/filter", post(filter_listings))
        // Numerology
        .route("/api/v1/numerology/options", post(numerology_options))
        .route("/api/v1/numerology/filter", post(filter_numerology))
        .route("/api/v1/numerology/lookup", post(lookup))
        .route("/api/v1/numerology/bulk", post(bulk_join))
        // Market
        .route("/api/v1/market/symbols", get(market_symbols))
        .route("/api/v1/market/bars", post(market_bars))
        // Any mode
        .route("/api/v1/screen", post(screen))
        .route("/api/v1/export", post(export))
        .with_state(state)
}

// ============================================================================
// Error Response
// ============================================================================

/// Error body returned by every failing handler.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Adapter turning shared errors into HTTP responses.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let code = match status {
            StatusCode::NOT_FOUND => "NOT_FOUND",
            StatusCode::BAD_REQUEST => "INVALID_REQUEST",
            StatusCode::BAD_GATEWAY => "UPSTREAM_ERROR",
            _ => "INTERNAL_ERROR",
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        } else {
            tracing::debug!(error = %self.0, status = status.as_u16(), "Request rejected");
        }

        let body = serde_json::json!({
            "success": false,
            "error": ErrorBody {
                code: code.to_string(),
                message: self.0.to_string(),
            }
        });

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(Error::InvalidInput(rejection.body_text()))
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// JSON body extractor whose rejections use the shared error body.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

// ============================================================================
// Request & Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service: String,
    pub listings: usize,
    pub numerology: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListingFilterRequest {
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub sectors: Vec<String>,
    #[serde(default)]
    pub sub_sectors: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NumerologyFilterRequest {
    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

#[derive(Debug, Serialize)]
pub struct NumerologyOptionsResponse {
    pub choices: Vec<ColumnChoices>,
    pub remaining: usize,
}

#[derive(Debug, Deserialize)]
pub struct LookupRequest {
    pub symbol: String,
    pub date_source: DateColumn,
}

#[derive(Debug, Default, Deserialize)]
pub struct BulkJoinRequest {
    #[serde(default)]
    pub numerology: Vec<Constraint>,
    #[serde(default)]
    pub listings: Vec<Constraint>,
}

#[derive(Debug, Deserialize)]
pub struct MarketBarsRequest {
    pub symbol: String,
    #[serde(default)]
    pub filters: Vec<MetricFilter>,
}

#[derive(Debug, Serialize)]
pub struct MarketSymbolsResponse {
    pub symbols: Vec<IndexSymbolConfig>,
    pub cache: CacheStats,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Health check endpoint
pub async fn health(State(state): State<Arc<ScreenerState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        service: "zero-screener".to_string(),
        listings: state.screener.listings().len(),
        numerology: state.screener.numerology().len(),
    })
}

/// Distinct values for the listing filter panel
pub async fn listing_options(State(state): State<Arc<ScreenerState>>) -> Json<ListingOptions> {
    Json(state.screener.listing_options())
}

/// Plain listing filter
pub async fn filter_listings(
    State(state): State<Arc<ScreenerState>>,
    ApiJson(req): ApiJson<ListingFilterRequest>,
) -> ApiResult<Json<ScreenResponse>> {
    let request = ScreenRequest::Listings {
        symbols: req.symbols,
        sectors: req.sectors,
        sub_sectors: req.sub_sectors,
    };
    Ok(Json(state.handle(request).await?))
}

/// Choices each numerology column offers after the preceding constraints
pub async fn numerology_options(
    State(state): State<Arc<ScreenerState>>,
    ApiJson(req): ApiJson<NumerologyFilterRequest>,
) -> Json<NumerologyOptionsResponse> {
    let (choices, table) = state.screener.filter_numerology(&req.constraints);
    Json(NumerologyOptionsResponse {
        choices,
        remaining: table.len(),
    })
}

/// Numerology filter
pub async fn filter_numerology(
    State(state): State<Arc<ScreenerState>>,
    ApiJson(req): ApiJson<NumerologyFilterRequest>,
) -> ApiResult<Json<ScreenResponse>> {
    let request = ScreenRequest::Numerology {
        constraints: req.constraints,
    };
    Ok(Json(state.handle(request).await?))
}

/// Single-company numerology lookup
pub async fn lookup(
    State(state): State<Arc<ScreenerState>>,
    ApiJson(req): ApiJson<LookupRequest>,
) -> ApiResult<Json<ScreenResponse>> {
    let request = ScreenRequest::Lookup {
        symbol: req.symbol,
        date_source: req.date_source,
    };
    Ok(Json(state.handle(request).await?))
}

/// Bulk date join
pub async fn bulk_join(
    State(state): State<Arc<ScreenerState>>,
    ApiJson(req): ApiJson<BulkJoinRequest>,
) -> ApiResult<Json<ScreenResponse>> {
    let request = ScreenRequest::BulkJoin {
        numerology: req.numerology,
        listings: req.listings,
    };
    Ok(Json(state.handle(request).await?))
}

/// Known index symbols and cache state
pub async fn market_symbols(
    State(state): State<Arc<ScreenerState>>,
) -> Json<MarketSymbolsResponse> {
    Json(MarketSymbolsResponse {
        symbols: state.market.symbols().to_vec(),
        cache: state.market.cache_stats(),
    })
}

/// Derived metrics for an index
pub async fn market_bars(
    State(state): State<Arc<ScreenerState>>,
    ApiJson(req): ApiJson<MarketBarsRequest>,
) -> ApiResult<Json<ScreenResponse>> {
    let request = ScreenRequest::Market {
        symbol: req.symbol,
        filters: req.filters,
    };
    Ok(Json(state.handle(request).await?))
}

/// Any mode, tagged by `mode`
pub async fn screen(
    State(state): State<Arc<ScreenerState>>,
    ApiJson(request): ApiJson<ScreenRequest>,
) -> ApiResult<Json<ScreenResponse>> {
    Ok(Json(state.handle(request).await?))
}

/// CSV download of any mode's table
pub async fn export(
    State(state): State<Arc<ScreenerState>>,
    ApiJson(request): ApiJson<ScreenRequest>,
) -> ApiResult<Response> {
    let response = state.handle(request).await?;
    let bytes = response.to_csv(state.screener.numerology().columns())?;

    let rows = match &response.result {
        ScreenResult::Listings { table } => table.len(),
        ScreenResult::Numerology { table, .. } => table.len(),
        ScreenResult::Lookup { outcome, .. } => outcome.rows().map_or(0, |t| t.len()),
        ScreenResult::BulkJoin { table, .. } => table.len(),
        ScreenResult::Market { bars, .. } => bars.len(),
    };
    tracing::info!(file = %response.filename(), rows, bytes = bytes.len(), "Exported CSV");

    let disposition = format!("attachment; filename=\"{}\"", response.filename());
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}
