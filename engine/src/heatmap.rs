use std::collections::{BTreeMap, HashMap};

use geo::{ChamberlainDuquetteArea, ConvexHull, MultiPoint, Point, Polygon};
use kdtree::{KdTree, distance::squared_euclidean};
use petgraph::unionfind::UnionFind;

use crate::{
    config::HeatmapConfig,
    geodesy::{centroid, haversine_km, haversine_m, offset_point, project_local},
    models::{
        BufferCircle, CoveragePolygon, GeoPoint, HeatmapResult, HeatmapStats, Report, ReportKind,
        ReportMarker, Severity, TypeCounts,
    },
};

pub const DEFAULT_CATEGORY: &str = "general";
/// Polygons smaller than this are treated as degenerate (collinear members).
const MIN_POLYGON_AREA_M2: f64 = 1.0;
/// Slack on the planar neighbour query; exact distances are re-checked with haversine.
const PREFILTER_MARGIN: f64 = 1.1;

/// Build heatmap polygons with the default thresholds.
pub fn build_heatmap(reports: &[Report], center: GeoPoint, radius_km: f64) -> HeatmapResult {
    build_heatmap_with(reports, center, radius_km, &HeatmapConfig::default())
}

/// Cluster reports around `center` into severity-ranked coverage polygons.
///
/// # Algorithm
/// 1. Keep reports within `radius_km` of `center` (haversine), ordered by id.
/// 2. Partition by `(category, severity)`; missing values land in
///    `general` / `low`.
/// 3. Single-link clustering inside each partition: two reports are
///    connected when they are at most `adjacency_threshold_m` apart, and
///    clusters are the connected components of that graph (union-find).
///    A k-d tree over locally projected coordinates limits the pairs that get
///    an exact haversine check.
/// 4. Each cluster becomes the convex hull of its members. Clusters of one or
///    two members, or whose hull has no area, get the hull of small squares
///    (`synthetic_half_width_m`) around each member instead.
///
/// The result is a pure function of the input set: ids decide every ordering,
/// so repeated refreshes produce identical polygons and group ids.
pub fn build_heatmap_with(
    reports: &[Report],
    center: GeoPoint,
    radius_km: f64,
    config: &HeatmapConfig,
) -> HeatmapResult {
    let mut in_range: Vec<&Report> = reports
        .iter()
        .filter(|report| haversine_km(center, report.location) <= radius_km)
        .collect();
    in_range.sort_by(|a, b| a.id.cmp(&b.id));

    tracing::debug!(
        "heatmap: {} of {} reports within {radius_km} km",
        in_range.len(),
        reports.len()
    );

    let mut result = HeatmapResult::default();
    let mut partitions: BTreeMap<(String, Severity), Vec<&Report>> = BTreeMap::new();

    for report in &in_range {
        let category = category_of(report);
        let severity = report.severity.unwrap_or_default();

        result.markers.push(ReportMarker {
            report_id: report.id.clone(),
            kind: report.kind,
            severity,
            category: category.clone(),
            location: report.location,
        });
        result.buffers.push(BufferCircle {
            report_id: report.id.clone(),
            center: report.location,
            radius_m: config.buffer_radius_m,
            severity,
        });
        count_kind(&mut result.counts, report.kind);
        if report.kind == ReportKind::Issue && severity == Severity::High {
            result.stats.high_priority += 1;
        }

        partitions
            .entry((category, severity))
            .or_default()
            .push(report);
    }

    let mut coverage_m2 = 0.0;
    for ((category, severity), members) in &partitions {
        let locations: Vec<GeoPoint> = members.iter().map(|report| report.location).collect();
        let clusters = single_link_clusters(&locations, config.adjacency_threshold_m);

        for (index, cluster) in clusters.iter().enumerate() {
            let points: Vec<GeoPoint> = cluster.iter().map(|&i| locations[i]).collect();
            let (vertices, area_m2) = coverage_vertices(&points, config.synthetic_half_width_m);
            coverage_m2 += area_m2;

            let polygon = CoveragePolygon {
                group_id: format!("{category}-{}-{index}", severity_label(*severity)),
                severity: *severity,
                category: category.clone(),
                vertices,
                centroid: centroid(&points).unwrap_or(points[0]),
                member_report_ids: cluster.iter().map(|&i| members[i].id.clone()).collect(),
                member_count: cluster.len(),
            };
            match severity {
                Severity::High => result.high.push(polygon),
                Severity::Medium => result.medium.push(polygon),
                Severity::Low => result.low.push(polygon),
            }
        }
    }

    result.stats = HeatmapStats {
        total: in_range.len(),
        high_priority: result.stats.high_priority,
        coverage_area_km2: coverage_m2 / 1_000_000.0,
    };

    tracing::info!(
        "heatmap: {} reports -> {} high / {} medium / {} low polygons",
        result.stats.total,
        result.high.len(),
        result.medium.len(),
        result.low.len()
    );
    result
}

/// Connected components of the "within `threshold_m`" graph.
///
/// Clusters are ordered by their first member and members keep input order,
/// so sorted input gives sorted output.
pub fn single_link_clusters(points: &[GeoPoint], threshold_m: f64) -> Vec<Vec<usize>> {
    if points.len() <= 1 {
        return (0..points.len()).map(|i| vec![i]).collect();
    }

    // Anchor on a member so longitude deltas across the antimeridian stay small.
    let reference = points[0];
    let projected: Vec<[f64; 2]> = points
        .iter()
        .map(|&point| project_local(reference, point))
        .collect();

    let mut tree: KdTree<f64, usize, [f64; 2]> = KdTree::new(2);
    for (idx, xy) in projected.iter().enumerate() {
        if let Err(err) = tree.add(*xy, idx) {
            tracing::debug!("report {idx} left out of the spatial index: {err:?}");
        }
    }

    let search_radius = threshold_m * PREFILTER_MARGIN;
    let search_radius_sq = search_radius * search_radius;
    let mut components = UnionFind::<usize>::new(points.len());

    for (i, xy) in projected.iter().enumerate() {
        let Ok(neighbours) = tree.within(xy, search_radius_sq, &squared_euclidean) else {
            continue;
        };
        for (_, &j) in neighbours {
            if j > i && haversine_m(points[i], points[j]) <= threshold_m {
                components.union(i, j);
            }
        }
    }

    let mut cluster_of_root: HashMap<usize, usize> = HashMap::new();
    let mut clusters: Vec<Vec<usize>> = Vec::new();
    for i in 0..points.len() {
        let root = components.find_mut(i);
        let slot = *cluster_of_root.entry(root).or_insert_with(|| {
            clusters.push(Vec::new());
            clusters.len() - 1
        });
        clusters[slot].push(i);
    }
    clusters
}

/// Polygon vertices (open ring, counter-clockwise) and area in m² for a cluster.
fn coverage_vertices(points: &[GeoPoint], half_width_m: f64) -> (Vec<GeoPoint>, f64) {
    if points.len() >= 3 {
        let hull = hull_of(points.iter().copied());
        let area = hull.chamberlain_duquette_unsigned_area();
        let vertices = open_ring(&hull);
        if vertices.len() >= 3 && area >= MIN_POLYGON_AREA_M2 {
            return (vertices, area);
        }
    }

    let corners = points.iter().flat_map(|&point| {
        [(1.0, 1.0), (1.0, -1.0), (-1.0, -1.0), (-1.0, 1.0)]
            .map(|(north, east)| offset_point(point, north * half_width_m, east * half_width_m))
    });
    let hull = hull_of(corners);
    let area = hull.chamberlain_duquette_unsigned_area();
    (open_ring(&hull), area)
}

fn hull_of(points: impl Iterator<Item = GeoPoint>) -> Polygon<f64> {
    let multi: MultiPoint<f64> = points
        .map(|point| Point::new(point.longitude, point.latitude))
        .collect();
    multi.convex_hull()
}

fn open_ring(polygon: &Polygon<f64>) -> Vec<GeoPoint> {
    let mut ring: Vec<GeoPoint> = Vec::with_capacity(polygon.exterior().0.len());
    for coord in polygon.exterior().coords() {
        let point = GeoPoint::new(coord.y, coord.x);
        if ring.iter().any(|seen| seen.approx_eq(point)) {
            continue;
        }
        ring.push(point);
    }
    ring
}

fn category_of(report: &Report) -> String {
    report
        .category
        .as_deref()
        .map(|category| category.trim().to_lowercase())
        .filter(|category| !category.is_empty())
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string())
}

fn count_kind(counts: &mut TypeCounts, kind: ReportKind) {
    match kind {
        ReportKind::Issue => counts.issue += 1,
        ReportKind::Event => counts.event += 1,
        ReportKind::Resolved => counts.resolved += 1,
        ReportKind::Other => counts.other += 1,
    }
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::High => "high",
        Severity::Medium => "medium",
        Severity::Low => "low",
    }
}
