use serde::{Deserialize, Serialize};

pub use shared::{
    ApiError, AreaInsights, BoundingBox, BufferCircle, CoveragePolygon, DataIntegrityWarning,
    GeoPoint, HeatmapResult, HeatmapStats, Incident, IncidentSeverity, Leg, LocationSuggestion,
    Recommendation, Report, ReportKind, ReportMarker, RouteCandidate, RouteSummary,
    SegmentInsight, Severity, Step, SuggestionOrigin, SummaryReport, TrafficInsight,
    TrafficStatus, TypeCounts, WarningKind,
};

/// What the routing provider hands back for one origin/destination query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutePlan {
    #[serde(default)]
    pub routes: Vec<RouteCandidate>,
    #[serde(default)]
    pub insights: Vec<TrafficInsight>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapRequest {
    pub center: GeoPoint,
    #[serde(default = "default_radius_km")]
    pub radius_km: f64,
    #[serde(default)]
    pub reports: Vec<Report>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DecodeQuery {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GazetteerQuery {
    pub q: String,
}

pub fn default_radius_km() -> f64 {
    5.0
}
