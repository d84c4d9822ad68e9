//! Geometry helpers for route following.
//!
//! Platform-agnostic distance, bearing and polyline computations. All
//! coordinates use WGS84 (lat/lon in degrees), all distances are meters
//! and all bearings are degrees clockwise from true north.

use serde::{Deserialize, Serialize};

/// A geographic coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Coordinate { lat, lon }
    }

    /// Builds a coordinate from a GeoJSON-ordered `[lon, lat]` pair.
    pub fn from_lon_lat(pair: [f64; 2]) -> Self {
        Coordinate {
            lat: pair[1],
            lon: pair[0],
        }
    }

    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        haversine(self, other)
    }
}

/// Result of projecting a position onto a polyline.
#[derive(Debug, Clone, Serialize)]
pub struct Projection {
    /// Nearest point on the polyline.
    pub coordinate: Coordinate,
    /// Index of the segment start point (0-based).
    pub segment_index: usize,
    /// Distance from the position to the nearest point, in meters.
    pub distance_m: f64,
    /// Distance along the polyline from its start to the projected point, in meters.
    pub distance_along_m: f64,
}

/// Earth radius in meters (WGS84 mean).
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Haversine distance between two points in meters.
pub fn haversine(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Initial bearing from point A to point B in degrees [0, 360).
pub fn bearing(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

    wrap(y.atan2(x).to_degrees(), 0.0, 360.0)
}

/// Point reached by travelling `distance_m` from `origin` along `bearing_deg`.
pub fn destination(origin: &Coordinate, distance_m: f64, bearing_deg: f64) -> Coordinate {
    let delta = distance_m / EARTH_RADIUS_M;
    let theta = bearing_deg.to_radians();
    let lat1 = origin.lat.to_radians();
    let lon1 = origin.lon.to_radians();

    let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos()).asin();
    let lon2 = lon1
        + (theta.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());

    Coordinate {
        lat: lat2.to_degrees(),
        lon: wrap(lon2.to_degrees(), -180.0, 180.0),
    }
}

/// Wraps `value` into the half-open range `[min, max)`.
pub fn wrap(value: f64, min: f64, max: f64) -> f64 {
    let d = max - min;
    if d <= 0.0 {
        return min;
    }
    let wrapped = ((value - min) % d + d) % d + min;
    // `%` can round up to exactly `d` for tiny negative inputs.
    if wrapped >= max {
        min
    } else {
        wrapped
    }
}

/// Smallest angle between two bearings, in degrees [0, 180].
pub fn heading_difference(a: f64, b: f64) -> f64 {
    let diff = (wrap(a, 0.0, 360.0) - wrap(b, 0.0, 360.0)).abs();
    diff.min(360.0 - diff)
}

/// Circular mean of two bearings, in degrees [0, 360).
pub fn mean_bearing(a: f64, b: f64) -> f64 {
    let delta = wrap(b - a, -180.0, 180.0);
    wrap(a + delta / 2.0, 0.0, 360.0)
}

/// Total length of a polyline in meters.
pub fn polyline_length(points: &[Coordinate]) -> f64 {
    points.windows(2).map(|w| haversine(&w[0], &w[1])).sum()
}

/// Project a position onto the nearest segment of a polyline.
///
/// A single-point polyline projects onto that point. Returns None for
/// an empty polyline.
pub fn project_on_polyline(position: &Coordinate, line: &[Coordinate]) -> Option<Projection> {
    match line {
        [] => return None,
        [only] => {
            return Some(Projection {
                coordinate: *only,
                segment_index: 0,
                distance_m: haversine(position, only),
                distance_along_m: 0.0,
            })
        }
        _ => {}
    }

    let mut best: Option<Projection> = None;
    let mut cumulative_distance = 0.0;

    for (i, segment) in line.windows(2).enumerate() {
        let a = &segment[0];
        let b = &segment[1];
        let seg_len = haversine(a, b);

        let projected = project_on_segment(position, a, b);
        let dist = haversine(position, &projected);
        let along = cumulative_distance + haversine(a, &projected);

        let is_better = match &best {
            Some(prev) => dist < prev.distance_m,
            None => true,
        };

        if is_better {
            best = Some(Projection {
                coordinate: projected,
                segment_index: i,
                distance_m: dist,
                distance_along_m: along,
            });
        }

        cumulative_distance += seg_len;
    }

    best
}

/// Distance from a position to the nearest point of a polyline.
pub fn distance_to_polyline(position: &Coordinate, line: &[Coordinate]) -> Option<f64> {
    project_on_polyline(position, line).map(|p| p.distance_m)
}

/// Remaining distance along the polyline from the projection of
/// `position` to the polyline's last point.
pub fn distance_to_end(position: &Coordinate, line: &[Coordinate]) -> Option<f64> {
    let projection = project_on_polyline(position, line)?;
    Some((polyline_length(line) - projection.distance_along_m).max(0.0))
}

/// Point located `distance_m` along the polyline from its start,
/// clamped to the polyline's ends.
pub fn coordinate_along(line: &[Coordinate], distance_m: f64) -> Option<Coordinate> {
    let first = line.first()?;
    if distance_m <= 0.0 {
        return Some(*first);
    }

    let mut travelled = 0.0;
    for segment in line.windows(2) {
        let seg_len = haversine(&segment[0], &segment[1]);
        if travelled + seg_len >= distance_m {
            if seg_len <= f64::EPSILON {
                return Some(segment[0]);
            }
            let t = (distance_m - travelled) / seg_len;
            return Some(Coordinate {
                lat: segment[0].lat + t * (segment[1].lat - segment[0].lat),
                lon: segment[0].lon + t * (segment[1].lon - segment[0].lon),
            });
        }
        travelled += seg_len;
    }

    line.last().copied()
}

/// Expected course of a traveller at `position` along `line`.
///
/// Looks `buffer_m` behind and ahead of the projected position and
/// averages the two directions. At either end of the line only the
/// available side is used. Returns None when the line is too short to
/// have a direction.
pub fn interpolated_course(position: &Coordinate, line: &[Coordinate], buffer_m: f64) -> Option<f64> {
    let projection = project_on_polyline(position, line)?;
    let length = polyline_length(line);
    if length <= f64::EPSILON {
        return None;
    }

    let along = projection.distance_along_m;
    let behind = coordinate_along(line, (along - buffer_m).max(0.0))?;
    let ahead = coordinate_along(line, (along + buffer_m).min(length))?;
    let here = projection.coordinate;

    let behind_len = haversine(&behind, &here);
    let ahead_len = haversine(&here, &ahead);

    match (behind_len > f64::EPSILON, ahead_len > f64::EPSILON) {
        (true, true) => Some(mean_bearing(bearing(&behind, &here), bearing(&here, &ahead))),
        (false, true) => Some(bearing(&here, &ahead)),
        (true, false) => Some(bearing(&behind, &here)),
        (false, false) => None,
    }
}

/// Project a point onto a line segment defined by two endpoints.
///
/// Uses a planar approximation scaled by latitude cosine, which is
/// accurate enough for short segments (< 10 km).
fn project_on_segment(p: &Coordinate, a: &Coordinate, b: &Coordinate) -> Coordinate {
    let cos_lat = ((a.lat + b.lat) / 2.0).to_radians().cos();

    let dx = (b.lon - a.lon) * cos_lat;
    let dy = b.lat - a.lat;
    let px = (p.lon - a.lon) * cos_lat;
    let py = p.lat - a.lat;

    let seg_len_sq = dx * dx + dy * dy;

    if seg_len_sq < 1e-20 {
        // Degenerate segment, return endpoint
        return *a;
    }

    // Clamp parameter t to [0, 1] to stay on the segment
    let t = ((px * dx + py * dy) / seg_len_sq).clamp(0.0, 1.0);

    Coordinate {
        lat: a.lat + t * (b.lat - a.lat),
        lon: a.lon + t * (b.lon - a.lon),
    }
}
