use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Coordinates closer than this (in degrees) are treated as the same place.
pub const COORDINATE_TOLERANCE_DEG: f64 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn approx_eq(self, other: Self) -> bool {
        (self.latitude - other.latitude).abs() <= COORDINATE_TOLERANCE_DEG
            && (self.longitude - other.longitude).abs() <= COORDINATE_TOLERANCE_DEG
    }
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoundingBox {
    pub northeast: GeoPoint,
    pub southwest: GeoPoint,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    #[serde(default)]
    pub distance_meters: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoded_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Leg {
    pub distance_meters: u64,
    pub base_duration_sec: u64,
    /// Absent when the provider had no live traffic for this leg.
    #[serde(default)]
    pub traffic_duration_sec: Option<u64>,
    #[serde(default)]
    pub start_address: String,
    #[serde(default)]
    pub end_address: String,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Leg {
    pub fn traffic_duration(&self) -> u64 {
        self.traffic_duration_sec.unwrap_or(self.base_duration_sec)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteCandidate {
    pub id: i64,
    #[serde(default)]
    pub legs: Vec<Leg>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
    #[serde(default)]
    pub summary_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview_path: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficStatus {
    #[default]
    Clear,
    Moderate,
    Heavy,
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    pub severity: IncidentSeverity,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub estimated_delay_minutes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentInsight {
    pub segment_id: String,
    pub overall_status: TrafficStatus,
    pub confidence_score: f64,
    #[serde(default)]
    pub active_incidents: Vec<Incident>,
    #[serde(default)]
    pub summary_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficInsight {
    pub route_id: i64,
    #[serde(default)]
    pub segments: Vec<SegmentInsight>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Proceed,
    Caution,
    Avoid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSummary {
    pub route_id: i64,
    pub is_recommended: bool,
    pub summary_label: String,
    pub distance_meters: u64,
    pub base_duration_sec: u64,
    pub traffic_duration_sec: u64,
    pub distance_text: String,
    pub base_duration_text: String,
    pub traffic_duration_text: String,
    pub delay_minutes: u32,
    pub status: TrafficStatus,
    pub recommendation: Recommendation,
    pub confidence: f64,
    pub incident_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worst_incident: Option<IncidentSeverity>,
    #[serde(default)]
    pub insight_notes: Vec<String>,
    pub path: Vec<GeoPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    NoLegs,
    MalformedPath,
}

/// Non-fatal problem found while summarizing; the rest of the batch still renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataIntegrityWarning {
    pub route_id: i64,
    pub kind: WarningKind,
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub summaries: Vec<RouteSummary>,
    pub warnings: Vec<DataIntegrityWarning>,
}

// ---------------------------------------------------------------------------
// Community reports & heatmap
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    #[default]
    Issue,
    Event,
    Resolved,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub kind: ReportKind,
    pub location: GeoPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoveragePolygon {
    pub group_id: String,
    pub severity: Severity,
    pub category: String,
    pub vertices: Vec<GeoPoint>,
    pub centroid: GeoPoint,
    pub member_report_ids: Vec<String>,
    pub member_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferCircle {
    pub report_id: String,
    pub center: GeoPoint,
    pub radius_m: f64,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMarker {
    pub report_id: String,
    pub kind: ReportKind,
    pub severity: Severity,
    pub category: String,
    pub location: GeoPoint,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCounts {
    pub issue: usize,
    pub event: usize,
    pub resolved: usize,
    pub other: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapStats {
    pub total: usize,
    pub high_priority: usize,
    pub coverage_area_km2: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeatmapResult {
    pub high: Vec<CoveragePolygon>,
    pub medium: Vec<CoveragePolygon>,
    pub low: Vec<CoveragePolygon>,
    pub markers: Vec<ReportMarker>,
    pub buffers: Vec<BufferCircle>,
    pub counts: TypeCounts,
    pub stats: HeatmapStats,
}

impl HeatmapResult {
    pub fn polygons(&self) -> impl Iterator<Item = &CoveragePolygon> {
        self.high.iter().chain(&self.medium).chain(&self.low)
    }
}

// ---------------------------------------------------------------------------
// Location suggestions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionOrigin {
    PredictedIntent,
    Autocomplete,
    Gazetteer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSuggestion {
    pub place_id: String,
    pub label: String,
    pub secondary_label: String,
    pub coordinates: Option<GeoPoint>,
    pub origin: SuggestionOrigin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_metadata: Option<Value>,
}

// ---------------------------------------------------------------------------
// Area insights
// ---------------------------------------------------------------------------

/// Opaque analysis payload returned by the area-insights service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaInsights {
    #[serde(default)]
    pub area: Option<Value>,
    #[serde(default)]
    pub analysis: Option<Value>,
    #[serde(default)]
    pub historical_data: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
}
