use crate::models::GeoPoint;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;
const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

pub fn haversine_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();

    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    haversine_m(a, b) / 1000.0
}

pub fn path_length_km(path: &[GeoPoint]) -> f64 {
    path.windows(2).map(|w| haversine_km(w[0], w[1])).sum()
}

/// Move `origin` by a local north/east displacement in meters.
///
/// Flat-earth approximation; only meant for offsets of a few hundred meters.
pub fn offset_point(origin: GeoPoint, north_m: f64, east_m: f64) -> GeoPoint {
    let cos_lat = origin.latitude.to_radians().cos().abs().max(1e-6);
    GeoPoint {
        latitude: origin.latitude + north_m / METERS_PER_DEGREE_LAT,
        longitude: origin.longitude + east_m / (METERS_PER_DEGREE_LAT * cos_lat),
    }
}

/// Equirectangular projection around `reference`, in meters (x = east, y = north).
pub fn project_local(reference: GeoPoint, point: GeoPoint) -> [f64; 2] {
    let cos_lat = reference.latitude.to_radians().cos();
    [
        wrap_longitude(point.longitude - reference.longitude) * METERS_PER_DEGREE_LAT * cos_lat,
        (point.latitude - reference.latitude) * METERS_PER_DEGREE_LAT,
    ]
}

/// Fold a longitude difference into [-180, 180).
pub fn wrap_longitude(delta: f64) -> f64 {
    let wrapped = (delta + 180.0).rem_euclid(360.0) - 180.0;
    // rem_euclid can round up to exactly 360.
    if wrapped >= 180.0 { wrapped - 360.0 } else { wrapped }
}

pub fn centroid(points: &[GeoPoint]) -> Option<GeoPoint> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let (lat, lon) = points
        .iter()
        .fold((0.0, 0.0), |(lat, lon), p| (lat + p.latitude, lon + p.longitude));
    Some(GeoPoint::new(lat / n, lon / n))
}
