use std::collections::HashMap;

use crate::{
    config::SummaryConfig,
    models::{
        DataIntegrityWarning, GeoPoint, Recommendation, RouteCandidate, RouteSummary,
        SummaryReport, TrafficInsight, TrafficStatus, WarningKind,
    },
    polyline::{self, PolylineError},
};

/// Summarize candidate routes with the default confidence settings.
pub fn build_summaries(routes: &[RouteCandidate], insights: &[TrafficInsight]) -> SummaryReport {
    build_summaries_with(routes, insights, &SummaryConfig::default())
}

/// Turn provider routes plus traffic insights into one summary per route.
///
/// # Ordering
/// Output follows input order. The first route that survives is flagged
/// `is_recommended`; the provider's ranking is trusted as-is, summaries are
/// never re-ranked by delay or confidence.
///
/// # Failure modes
/// - A route without legs is skipped and reported as [`WarningKind::NoLegs`].
/// - A path that fails to decode is reported as [`WarningKind::MalformedPath`];
///   the route is still summarized, with an empty `path`.
/// - A route without a matching insight is not an error: it is reported as
///   clear, with zero delay from incidents and the default confidence.
pub fn build_summaries_with(
    routes: &[RouteCandidate],
    insights: &[TrafficInsight],
    config: &SummaryConfig,
) -> SummaryReport {
    let mut by_route: HashMap<i64, &TrafficInsight> = HashMap::with_capacity(insights.len());
    for insight in insights {
        by_route.entry(insight.route_id).or_insert(insight);
    }

    let mut report = SummaryReport::default();

    for route in routes {
        if route.legs.is_empty() {
            tracing::warn!("route {} has no legs, excluded from summaries", route.id);
            report.warnings.push(DataIntegrityWarning {
                route_id: route.id,
                kind: WarningKind::NoLegs,
                detail: "route has no legs".to_string(),
            });
            continue;
        }

        let path = match resolve_path(route) {
            Ok(path) => path,
            Err(err) => {
                tracing::warn!("route {}: {err}", route.id);
                report.warnings.push(DataIntegrityWarning {
                    route_id: route.id,
                    kind: WarningKind::MalformedPath,
                    detail: err.to_string(),
                });
                Vec::new()
            }
        };

        let is_recommended = report.summaries.is_empty();
        let insight = by_route.get(&route.id).copied();
        report.summaries.push(summarize(
            route,
            insight,
            path,
            is_recommended,
            config,
        ));
    }

    tracing::debug!(
        "built {} route summaries ({} warnings)",
        report.summaries.len(),
        report.warnings.len()
    );
    report
}

fn summarize(
    route: &RouteCandidate,
    insight: Option<&TrafficInsight>,
    path: Vec<GeoPoint>,
    is_recommended: bool,
    config: &SummaryConfig,
) -> RouteSummary {
    let distance_meters: u64 = route.legs.iter().map(|leg| leg.distance_meters).sum();
    let base_duration_sec: u64 = route.legs.iter().map(|leg| leg.base_duration_sec).sum();
    let traffic_duration_sec: u64 = route.legs.iter().map(|leg| leg.traffic_duration()).sum();

    let segments = insight.map(|i| i.segments.as_slice()).unwrap_or_default();
    let status = segments
        .iter()
        .map(|segment| segment.overall_status)
        .max()
        .unwrap_or_default();
    let confidence = if segments.is_empty() {
        config.default_confidence
    } else {
        let total: f64 = segments
            .iter()
            .map(|segment| segment.confidence_score.clamp(0.0, 1.0))
            .sum();
        total / segments.len() as f64
    };

    let incidents = segments.iter().flat_map(|segment| &segment.active_incidents);
    let incident_count = incidents.clone().count();
    let worst_incident = incidents.map(|incident| incident.severity).max();
    let insight_notes = segments
        .iter()
        .map(|segment| segment.summary_text.trim())
        .filter(|text| !text.is_empty())
        .map(str::to_string)
        .collect();

    RouteSummary {
        route_id: route.id,
        is_recommended,
        summary_label: route.summary_label.clone(),
        distance_meters,
        base_duration_sec,
        traffic_duration_sec,
        distance_text: format_distance(distance_meters),
        base_duration_text: format_duration(base_duration_sec),
        traffic_duration_text: format_duration(traffic_duration_sec),
        delay_minutes: delay_minutes(base_duration_sec, traffic_duration_sec),
        status,
        recommendation: recommendation_for(status),
        confidence,
        incident_count,
        worst_incident,
        insight_notes,
        path,
    }
}

/// Geometry for a route: the overview path, or the concatenated step
/// fragments when the overview is missing or decodes to nothing.
fn resolve_path(route: &RouteCandidate) -> Result<Vec<GeoPoint>, PolylineError> {
    if let Some(overview) = route.overview_path.as_deref() {
        let path = polyline::decode(overview)?;
        if !path.is_empty() {
            return Ok(path);
        }
    }

    let mut path: Vec<GeoPoint> = Vec::new();
    let fragments = route
        .legs
        .iter()
        .flat_map(|leg| &leg.steps)
        .filter_map(|step| step.encoded_path.as_deref());
    for fragment in fragments {
        for point in polyline::decode(fragment)? {
            // Consecutive steps share their joint point.
            if path.last().is_some_and(|last| last.approx_eq(point)) {
                continue;
            }
            path.push(point);
        }
    }
    Ok(path)
}

pub fn delay_minutes(base_duration_sec: u64, traffic_duration_sec: u64) -> u32 {
    let delay_sec = traffic_duration_sec.saturating_sub(base_duration_sec);
    (delay_sec as f64 / 60.0).round() as u32
}

pub fn recommendation_for(status: TrafficStatus) -> Recommendation {
    match status {
        TrafficStatus::Blocked => Recommendation::Avoid,
        TrafficStatus::Heavy | TrafficStatus::Moderate => Recommendation::Caution,
        TrafficStatus::Clear => Recommendation::Proceed,
    }
}

pub fn format_distance(meters: u64) -> String {
    if meters < 1_000 {
        format!("{meters} m")
    } else {
        format!("{:.1} km", meters as f64 / 1_000.0)
    }
}

pub fn format_duration(seconds: u64) -> String {
    let total_minutes = (seconds + 30) / 60;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    match (hours, minutes) {
        (0, m) => plural(m, "min"),
        (h, 0) => plural(h, "hour"),
        (h, m) => format!("{} {}", plural(h, "hour"), plural(m, "min")),
    }
}

fn plural(count: u64, unit: &str) -> String {
    if count == 1 {
        format!("1 {unit}")
    } else {
        format!("{count} {unit}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Incident, IncidentSeverity, Leg, SegmentInsight, Step};

    fn leg(base: u64, traffic: u64) -> Leg {
        Leg {
            distance_meters: 5_400,
            base_duration_sec: base,
            traffic_duration_sec: Some(traffic),
            start_address: "Koramangala".into(),
            end_address: "Indiranagar".into(),
            steps: Vec::new(),
        }
    }

    fn route(id: i64, base: u64, traffic: u64) -> RouteCandidate {
        RouteCandidate {
            id,
            legs: vec![leg(base, traffic)],
            bounding_box: None,
            summary_label: format!("via route {id}"),
            overview_path: Some(polyline::encode(&[
                GeoPoint::new(12.9349, 77.6055),
                GeoPoint::new(12.9789, 77.6416),
            ])),
        }
    }

    fn segment(status: TrafficStatus, confidence: f64) -> SegmentInsight {
        SegmentInsight {
            segment_id: format!("{status:?}"),
            overall_status: status,
            confidence_score: confidence,
            active_incidents: Vec::new(),
            summary_text: String::new(),
        }
    }

    #[test]
    fn zero_incident_route_uses_defaults() {
        let report = build_summaries(&[route(1, 600, 600)], &[]);
        assert!(report.warnings.is_empty());
        let summary = &report.summaries[0];
        assert_eq!(summary.delay_minutes, 0);
        assert_eq!(summary.status, TrafficStatus::Clear);
        assert_eq!(summary.recommendation, Recommendation::Proceed);
        assert_eq!(summary.confidence, 0.8);
        assert!(summary.is_recommended);
        assert_eq!(summary.path.len(), 2);
    }

    #[test]
    fn blocked_segment_means_avoid() {
        let insight = TrafficInsight {
            route_id: 7,
            segments: vec![
                segment(TrafficStatus::Clear, 0.9),
                segment(TrafficStatus::Blocked, 0.6),
                segment(TrafficStatus::Moderate, 0.3),
            ],
        };
        let report = build_summaries(&[route(7, 600, 900)], &[insight]);
        let summary = &report.summaries[0];
        assert_eq!(summary.status, TrafficStatus::Blocked);
        assert_eq!(summary.recommendation, Recommendation::Avoid);
        assert!((summary.confidence - 0.6).abs() < 1e-9);
        assert_eq!(summary.delay_minutes, 5);
    }

    #[test]
    fn heavy_or_moderate_means_caution() {
        for status in [TrafficStatus::Heavy, TrafficStatus::Moderate] {
            let insight = TrafficInsight {
                route_id: 1,
                segments: vec![segment(status, 1.0)],
            };
            let report = build_summaries(&[route(1, 600, 600)], &[insight]);
            assert_eq!(report.summaries[0].recommendation, Recommendation::Caution);
        }
    }

    #[test]
    fn delay_is_never_negative() {
        let report = build_summaries(&[route(1, 900, 600)], &[]);
        assert_eq!(report.summaries[0].delay_minutes, 0);
    }

    #[test]
    fn route_without_legs_is_excluded_with_warning() {
        let mut empty = route(2, 600, 600);
        empty.legs.clear();
        let report = build_summaries(&[empty, route(3, 600, 660)], &[]);
        assert_eq!(report.summaries.len(), 1);
        assert_eq!(report.summaries[0].route_id, 3);
        assert!(report.summaries[0].is_recommended);
        assert_eq!(
            report.warnings,
            vec![DataIntegrityWarning {
                route_id: 2,
                kind: WarningKind::NoLegs,
                detail: "route has no legs".into(),
            }]
        );
    }

    #[test]
    fn malformed_overview_keeps_route_without_geometry() {
        let mut broken = route(4, 600, 600);
        broken.overview_path = Some("_p~iF".into());
        let report = build_summaries(&[broken], &[]);
        assert_eq!(report.summaries.len(), 1);
        assert!(report.summaries[0].path.is_empty());
        assert_eq!(report.warnings[0].kind, WarningKind::MalformedPath);
    }

    #[test]
    fn falls_back_to_step_fragments() {
        let a = GeoPoint::new(12.9349, 77.6055);
        let b = GeoPoint::new(12.9500, 77.6200);
        let c = GeoPoint::new(12.9789, 77.6416);
        let mut candidate = route(5, 600, 600);
        candidate.overview_path = Some(String::new());
        candidate.legs[0].steps = vec![
            Step {
                distance_meters: 2_000,
                encoded_path: Some(polyline::encode(&[a, b])),
            },
            Step {
                distance_meters: 0,
                encoded_path: None,
            },
            Step {
                distance_meters: 3_400,
                encoded_path: Some(polyline::encode(&[b, c])),
            },
        ];

        let report = build_summaries(&[candidate], &[]);
        let path = &report.summaries[0].path;
        assert_eq!(path.len(), 3);
        assert!(path[0].approx_eq(a));
        assert!(path[1].approx_eq(b));
        assert!(path[2].approx_eq(c));
    }

    #[test]
    fn output_preserves_input_order_and_only_first_is_recommended() {
        // Route 20 is faster, but the provider ranked route 10 first.
        let routes = [route(10, 600, 1_800), route(20, 600, 600)];
        let report = build_summaries(&routes, &[]);
        let ids: Vec<i64> = report.summaries.iter().map(|s| s.route_id).collect();
        assert_eq!(ids, vec![10, 20]);
        assert!(report.summaries[0].is_recommended);
        assert!(!report.summaries[1].is_recommended);
    }

    #[test]
    fn incidents_and_notes_are_collected() {
        let mut seg = segment(TrafficStatus::Heavy, 0.5);
        seg.summary_text = "  Slow traffic near Silk Board  ".into();
        seg.active_incidents = vec![
            Incident {
                severity: IncidentSeverity::Medium,
                description: "stalled bus".into(),
                estimated_delay_minutes: 4,
            },
            Incident {
                severity: IncidentSeverity::Critical,
                description: "water logging".into(),
                estimated_delay_minutes: 20,
            },
        ];
        let insight = TrafficInsight {
            route_id: 1,
            segments: vec![seg],
        };
        let summary = &build_summaries(&[route(1, 600, 600)], &[insight]).summaries[0];
        assert_eq!(summary.incident_count, 2);
        assert_eq!(summary.worst_incident, Some(IncidentSeverity::Critical));
        assert_eq!(summary.insight_notes, vec!["Slow traffic near Silk Board"]);
    }

    #[test]
    fn insight_matching_is_by_route_id() {
        let insight = TrafficInsight {
            route_id: 99,
            segments: vec![segment(TrafficStatus::Blocked, 0.1)],
        };
        let report = build_summaries(&[route(1, 600, 600), route(99, 600, 600)], &[insight]);
        assert_eq!(report.summaries[0].recommendation, Recommendation::Proceed);
        assert_eq!(report.summaries[1].recommendation, Recommendation::Avoid);
    }

    #[test]
    fn display_strings() {
        assert_eq!(format_distance(850), "850 m");
        assert_eq!(format_distance(12_345), "12.3 km");
        assert_eq!(format_duration(25 * 60), "25 mins");
        assert_eq!(format_duration(60), "1 min");
        assert_eq!(format_duration(3_600), "1 hour");
        assert_eq!(format_duration(3_900), "1 hour 5 mins");
        assert_eq!(format_duration(2 * 3_600 + 60), "2 hours 1 min");
    }

    #[test]
    fn repeated_calls_are_identical() {
        let routes = [route(1, 600, 700), route(2, 600, 650)];
        assert_eq!(build_summaries(&routes, &[]), build_summaries(&routes, &[]));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_delay_non_negative(base in 0u64..100_000, traffic in 0u64..100_000) {
                let minutes = delay_minutes(base, traffic);
                if traffic <= base {
                    prop_assert_eq!(minutes, 0);
                } else {
                    let expected = ((traffic - base) as f64 / 60.0).round() as u32;
                    prop_assert_eq!(minutes, expected);
                }
            }
        }
    }
}
