pub mod config;
pub mod error;
pub mod geodesy;
pub mod heatmap;
pub mod models;
pub mod polyline;
pub mod providers;
pub mod refresher;
pub mod suggestions;
pub mod summary;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::heatmap::build_heatmap_with;
use crate::models::{
    DecodeQuery, GazetteerQuery, GeoPoint, HeatmapRequest, HeatmapResult, LocationSuggestion,
    RoutePlan, SummaryReport,
};
use crate::summary::build_summaries_with;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<EngineConfig>,
}

impl AppState {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/routes/summaries", post(summaries_handler))
        .route("/api/heatmap", post(heatmap_handler))
        .route("/api/polyline/decode", get(decode_handler))
        .route("/api/suggestions/gazetteer", get(gazetteer_handler))
        .with_state(state)
}

async fn summaries_handler(
    State(state): State<AppState>,
    Json(plan): Json<RoutePlan>,
) -> Json<SummaryReport> {
    let report = build_summaries_with(&plan.routes, &plan.insights, &state.config.summary);
    Json(report)
}

async fn heatmap_handler(
    State(state): State<AppState>,
    Json(req): Json<HeatmapRequest>,
) -> Result<Json<HeatmapResult>, EngineError> {
    if !req.radius_km.is_finite() || req.radius_km <= 0.0 {
        return Err(EngineError::InvalidRequest(format!(
            "radiusKm must be a positive number, got {}",
            req.radius_km
        )));
    }
    if !valid_point(req.center) {
        return Err(EngineError::InvalidRequest(format!(
            "center {:?} is not a valid coordinate",
            req.center
        )));
    }
    let result = build_heatmap_with(&req.reports, req.center, req.radius_km, &state.config.heatmap);
    Ok(Json(result))
}

async fn decode_handler(Query(query): Query<DecodeQuery>) -> Result<Json<Vec<GeoPoint>>, EngineError> {
    let points = polyline::decode(&query.path)?;
    Ok(Json(points))
}

async fn gazetteer_handler(Query(query): Query<GazetteerQuery>) -> Json<Vec<LocationSuggestion>> {
    Json(suggestions::gazetteer::lookup(&query.q))
}

fn valid_point(point: GeoPoint) -> bool {
    (-90.0..=90.0).contains(&point.latitude) && (-180.0..=180.0).contains(&point.longitude)
}
