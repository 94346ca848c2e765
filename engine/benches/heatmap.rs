use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use insight_engine::geodesy::offset_point;
use insight_engine::heatmap::build_heatmap;
use insight_engine::models::{GeoPoint, Report, ReportKind, Severity};
use insight_engine::polyline;

const CENTER: GeoPoint = GeoPoint::new(12.9716, 77.5946);

/// Reports laid out on a jittered grid so clusters of varying size form.
fn synthetic_reports(count: usize) -> Vec<Report> {
    let severities = [Severity::Low, Severity::Medium, Severity::High];
    let categories = ["pothole", "flooding", "traffic"];
    (0..count)
        .map(|i| {
            let row = (i / 40) as f64;
            let col = (i % 40) as f64;
            let jitter = ((i * 7919) % 97) as f64;
            Report {
                id: format!("r{i:05}"),
                category: Some(categories[i % categories.len()].to_string()),
                severity: Some(severities[(i / 3) % severities.len()]),
                kind: ReportKind::Issue,
                location: offset_point(CENTER, row * 90.0 + jitter, col * 90.0 - jitter),
                created_at: None,
            }
        })
        .collect()
}

fn benchmark_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("polyline_decode");

    for points in [100usize, 1_000, 10_000] {
        let path: Vec<GeoPoint> = (0..points)
            .map(|i| offset_point(CENTER, i as f64 * 12.0, (i % 17) as f64 * 5.0))
            .collect();
        let encoded = polyline::encode(&path);

        group.bench_with_input(BenchmarkId::from_parameter(points), &encoded, |b, encoded| {
            b.iter(|| polyline::decode(black_box(encoded)));
        });
    }

    group.finish();
}

fn benchmark_heatmap(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_heatmap");

    for count in [100usize, 1_000, 5_000] {
        let reports = synthetic_reports(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &reports, |b, reports| {
            b.iter(|| build_heatmap(black_box(reports), CENTER, 10.0));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_decode, benchmark_heatmap);
criterion_main!(benches);
