//! External collaborators: routing, nearby community reports and area insights.
//!
//! Each collaborator is a trait so the engine can be driven by fakes in tests;
//! the `reqwest` clients below talk to the real backend.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::config::HeatmapConfig;
use crate::heatmap::build_heatmap_with;
use crate::models::{
    AreaInsights, GeoPoint, HeatmapResult, Report, ReportKind, RoutePlan, Severity, SummaryReport,
};
use crate::refresher::InsightFetcher;
use crate::summary::build_summaries;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("upstream returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected upstream payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid upstream url: {0}")]
    Url(String),
    /// The upstream answered 2xx but refused the request in its payload.
    #[error("upstream rejected the request with status {status}: {message}")]
    Rejected { status: String, message: String },
}

impl ProviderError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Send `request` and decode a JSON body, turning non-2xx answers into
/// [`ProviderError::Http`] with the raw body attached.
pub(crate) async fn read_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<T, ProviderError> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ProviderError::Http {
            status: status.as_u16(),
            body,
        });
    }
    Ok(serde_json::from_str(&body)?)
}

fn endpoint(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

#[async_trait]
pub trait RoutingProvider: Send + Sync {
    async fn routes(
        &self,
        origin: &str,
        destination: &str,
        departure_ms: i64,
    ) -> Result<RoutePlan, ProviderError>;
}

#[async_trait]
pub trait NearbyReportsProvider: Send + Sync {
    async fn nearby(&self, center: GeoPoint, radius_km: f64) -> Result<Vec<Report>, ProviderError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RouteQuery<'a> {
    origin: &'a str,
    destination: &'a str,
    departure_time: i64,
}

pub struct DirectionsClient {
    http: reqwest::Client,
    url: String,
}

impl DirectionsClient {
    pub fn new(http: reqwest::Client, api_base_url: &str) -> Self {
        Self {
            http,
            url: endpoint(api_base_url, "/api/v1/routes/plan"),
        }
    }
}

#[async_trait]
impl RoutingProvider for DirectionsClient {
    async fn routes(
        &self,
        origin: &str,
        destination: &str,
        departure_ms: i64,
    ) -> Result<RoutePlan, ProviderError> {
        let query = RouteQuery {
            origin,
            destination,
            departure_time: departure_ms,
        };
        read_json(self.http.post(&self.url).json(&query)).await
    }
}

pub struct NearbyReportsClient {
    http: reqwest::Client,
    url: String,
}

impl NearbyReportsClient {
    pub fn new(http: reqwest::Client, api_base_url: &str) -> Self {
        Self {
            http,
            url: endpoint(api_base_url, "/api/v1/posts/nearby"),
        }
    }
}

#[async_trait]
impl NearbyReportsProvider for NearbyReportsClient {
    async fn nearby(&self, center: GeoPoint, radius_km: f64) -> Result<Vec<Report>, ProviderError> {
        let url = reqwest::Url::parse_with_params(
            &self.url,
            &[
                ("latitude", center.latitude.to_string()),
                ("longitude", center.longitude.to_string()),
                ("radius_km", radius_km.to_string()),
            ],
        )
        .map_err(|err| ProviderError::Url(err.to_string()))?;

        let posts: Vec<Value> = read_json(self.http.get(url)).await?;
        let reports: Vec<Report> = posts
            .iter()
            .enumerate()
            .filter_map(|(index, post)| normalize_post(post, index))
            .collect();
        tracing::info!(
            "{} of {} nearby posts usable as reports",
            reports.len(),
            posts.len()
        );
        Ok(reports)
    }
}

fn parse_kind(raw: Option<&str>) -> ReportKind {
    match raw.map(|kind| kind.trim().to_ascii_lowercase()) {
        None => ReportKind::Issue,
        Some(kind) => match kind.as_str() {
            "" | "issue" => ReportKind::Issue,
            "event" => ReportKind::Event,
            "resolved" => ReportKind::Resolved,
            _ => ReportKind::Other,
        },
    }
}

fn parse_severity(raw: Option<&str>) -> Option<Severity> {
    match raw?.trim().to_ascii_lowercase().as_str() {
        "critical" | "high" => Some(Severity::High),
        "medium" | "moderate" => Some(Severity::Medium),
        "low" => Some(Severity::Low),
        _ => None,
    }
}

/// Map one raw nearby-post record onto a [`Report`].
///
/// Posts without a usable `location` are dropped.
pub fn normalize_post(post: &Value, index: usize) -> Option<Report> {
    let location = post.get("location")?;
    let latitude = location.get("latitude").and_then(Value::as_f64);
    let longitude = location.get("longitude").and_then(Value::as_f64);
    let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
        tracing::debug!("post #{index} has no usable location, skipping");
        return None;
    };
    if !latitude.is_finite() || !longitude.is_finite() {
        return None;
    }

    let text = |key: &str| post.get(key).and_then(Value::as_str);
    let id = match post.get("postId") {
        Some(Value::String(id)) if !id.trim().is_empty() => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => format!("post-{index}"),
    };

    Some(Report {
        id,
        category: text("category")
            .map(str::trim)
            .filter(|category| !category.is_empty())
            .map(str::to_string),
        severity: parse_severity(text("severity")),
        kind: parse_kind(text("type")),
        location: GeoPoint::new(latitude, longitude),
        created_at: text("createdAt").map(str::to_string),
    })
}

#[derive(Debug, Serialize)]
struct PointCoordinates {
    #[serde(rename = "type")]
    kind: &'static str,
    lat: f64,
    lng: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeAreaRequest<'a> {
    coordinates: PointCoordinates,
    analysis_type: &'static str,
    time_range: &'a str,
}

pub struct AreaInsightsClient {
    http: reqwest::Client,
    url: String,
}

impl AreaInsightsClient {
    pub fn new(http: reqwest::Client, api_base_url: &str) -> Self {
        Self {
            http,
            url: endpoint(api_base_url, "/api/v1/insights/analyze-area"),
        }
    }
}

#[async_trait]
impl InsightFetcher for AreaInsightsClient {
    async fn fetch(
        &self,
        location: GeoPoint,
        time_range: &str,
    ) -> Result<AreaInsights, ProviderError> {
        let request = AnalyzeAreaRequest {
            coordinates: PointCoordinates {
                kind: "point",
                lat: location.latitude,
                lng: location.longitude,
            },
            analysis_type: "full",
            time_range,
        };
        read_json(self.http.post(&self.url).json(&request)).await
    }
}

/// Ask the routing provider for candidates and summarize them.
pub async fn plan_routes(
    provider: &dyn RoutingProvider,
    origin: &str,
    destination: &str,
    departure_ms: i64,
) -> Result<SummaryReport, ProviderError> {
    let plan = provider.routes(origin, destination, departure_ms).await?;
    tracing::info!(
        "routing provider returned {} routes and {} insights",
        plan.routes.len(),
        plan.insights.len()
    );
    Ok(build_summaries(&plan.routes, &plan.insights))
}

/// Fetch nearby reports and turn them into heatmap layers.
pub async fn load_heatmap(
    provider: &dyn NearbyReportsProvider,
    center: GeoPoint,
    radius_km: f64,
    config: &HeatmapConfig,
) -> Result<HeatmapResult, ProviderError> {
    let reports = provider.nearby(center, radius_km).await?;
    Ok(build_heatmap_with(&reports, center, radius_km, config))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::models::{Leg, RouteCandidate};

    #[test]
    fn post_fields_are_mapped() {
        let post = json!({
            "postId": "p-17",
            "type": "event",
            "category": "traffic",
            "severity": "critical",
            "location": { "latitude": 12.97, "longitude": 77.59 },
            "createdAt": "2024-05-01T10:00:00Z",
            "content": "Marathon on MG Road"
        });

        let report = normalize_post(&post, 3).expect("post has a location");
        assert_eq!(report.id, "p-17");
        assert_eq!(report.kind, ReportKind::Event);
        assert_eq!(report.category.as_deref(), Some("traffic"));
        assert_eq!(report.severity, Some(Severity::High));
        assert_eq!(report.location, GeoPoint::new(12.97, 77.59));
        assert_eq!(report.created_at.as_deref(), Some("2024-05-01T10:00:00Z"));
    }

    #[test]
    fn missing_fields_get_explicit_defaults() {
        let post = json!({ "location": { "latitude": 12.9, "longitude": 77.6 } });

        let report = normalize_post(&post, 4).expect("post has a location");
        assert_eq!(report.id, "post-4");
        assert_eq!(report.kind, ReportKind::Issue);
        assert_eq!(report.category, None);
        assert_eq!(report.severity, None);
    }

    #[test]
    fn unknown_type_and_severity_are_tolerated() {
        let post = json!({
            "type": "announcement",
            "severity": "apocalyptic",
            "location": { "latitude": 12.9, "longitude": 77.6 }
        });
        let report = normalize_post(&post, 0).expect("post has a location");
        assert_eq!(report.kind, ReportKind::Other);
        assert_eq!(report.severity, None);
    }

    #[test]
    fn posts_without_location_are_dropped() {
        assert!(normalize_post(&json!({ "postId": "x" }), 0).is_none());
        assert!(normalize_post(&json!({ "location": { "latitude": 12.9 } }), 1).is_none());
        assert!(normalize_post(&json!({ "location": "Indiranagar" }), 2).is_none());
    }

    struct FixedRoutes(RoutePlan);

    #[async_trait]
    impl RoutingProvider for FixedRoutes {
        async fn routes(&self, _: &str, _: &str, _: i64) -> Result<RoutePlan, ProviderError> {
            Ok(self.0.clone())
        }
    }

    struct FailingRoutes;

    #[async_trait]
    impl RoutingProvider for FailingRoutes {
        async fn routes(&self, _: &str, _: &str, _: i64) -> Result<RoutePlan, ProviderError> {
            Err(ProviderError::Http {
                status: 503,
                body: "maintenance".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn plan_routes_summarizes_provider_answer() {
        let route = RouteCandidate {
            id: 7,
            legs: vec![Leg {
                distance_meters: 4_200,
                base_duration_sec: 900,
                traffic_duration_sec: Some(1_200),
                ..Default::default()
            }],
            ..Default::default()
        };
        let provider = FixedRoutes(RoutePlan {
            routes: vec![route],
            insights: Vec::new(),
        });

        let report = plan_routes(&provider, "Koramangala", "Hebbal", 0)
            .await
            .expect("provider succeeds");
        assert_eq!(report.summaries.len(), 1);
        assert_eq!(report.summaries[0].route_id, 7);
        assert_eq!(report.summaries[0].delay_minutes, 5);
    }

    #[tokio::test]
    async fn plan_routes_surfaces_http_status() {
        let err = plan_routes(&FailingRoutes, "a", "b", 0)
            .await
            .expect_err("provider fails");
        assert_eq!(err.status(), Some(503));
        assert!(err.to_string().contains("maintenance"));
    }

    struct FixedReports(Vec<Report>);

    #[async_trait]
    impl NearbyReportsProvider for FixedReports {
        async fn nearby(&self, _: GeoPoint, _: f64) -> Result<Vec<Report>, ProviderError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn load_heatmap_builds_layers_from_provider_reports() {
        let center = GeoPoint::new(12.9716, 77.5946);
        let report = Report {
            id: "r1".to_string(),
            category: Some("pothole".to_string()),
            severity: Some(Severity::High),
            kind: ReportKind::Issue,
            location: center,
            created_at: None,
        };
        let provider = FixedReports(vec![report]);

        let heatmap = load_heatmap(&provider, center, 5.0, &HeatmapConfig::default())
            .await
            .expect("provider succeeds");
        assert_eq!(heatmap.high.len(), 1);
        assert_eq!(heatmap.stats.high_priority, 1);
    }
}
