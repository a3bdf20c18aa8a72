//! Geometry extraction: track decimation and bounding-region computation
//!
//! Both operations are pure functions over in-memory point sequences. They
//! perform no I/O, keep no state between calls and never raise errors; empty
//! input yields an empty output or the explicit empty-region signal.

use crate::data::GeoPoint;
use geo::Point;

/// Default minimum distance between kept track points, in degrees.
pub const DEFAULT_MIN_POINT_DELTA: f64 = 0.0001;

/// Minimal lat/lon rectangle containing a set of points.
///
/// The empty state is represented by `Option<GeoBounds>::None`; a present
/// value always satisfies `min_lat <= max_lat` and `min_lon <= max_lon` for
/// ordered inputs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl GeoBounds {
    /// Seed a degenerate region at a single point.
    pub fn from_point(lat: f64, lon: f64) -> Self {
        Self {
            min_lat: lat,
            max_lat: lat,
            min_lon: lon,
            max_lon: lon,
        }
    }

    /// Grow the region to include a point.
    pub fn expand(&mut self, lat: f64, lon: f64) {
        if lat < self.min_lat {
            self.min_lat = lat;
        }
        if lat > self.max_lat {
            self.max_lat = lat;
        }
        if lon < self.min_lon {
            self.min_lon = lon;
        }
        if lon > self.max_lon {
            self.max_lon = lon;
        }
    }

    /// Grow the region to include another region.
    pub fn merge(&mut self, other: &GeoBounds) {
        self.expand(other.min_lat, other.min_lon);
        self.expand(other.max_lat, other.max_lon);
    }

    /// Midpoint of the region per axis, as (lat, lon).
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }

    pub fn lat_span(&self) -> f64 {
        (self.max_lat - self.min_lat).abs()
    }

    pub fn lon_span(&self) -> f64 {
        (self.max_lon - self.min_lon).abs()
    }
}

/// Reduce an ordered point sequence to the points worth rendering.
///
/// The first point is always kept. Every later point is kept iff its planar
/// degree-space distance to the last *kept* point strictly exceeds
/// `min_delta`; skipped points do not move the anchor, so a run of small
/// steps still contributes a point once the accumulated offset grows past
/// the threshold. Greedy and order-preserving, not shape-aware: a sharp turn
/// between points closer than the threshold is dropped silently.
///
/// NaN coordinates pass through rather than being rejected; a NaN distance
/// fails the strict comparison, so such points are culled without disturbing
/// the anchor.
pub fn decimate(points: &[GeoPoint], min_delta: f64) -> Vec<Point<f64>> {
    let mut kept = Vec::new();
    let Some(first) = points.first() else {
        return kept;
    };

    let mut last_lat = first.lat();
    let mut last_lon = first.lon();
    kept.push(first.point());

    for point in &points[1..] {
        let lat_diff = point.lat() - last_lat;
        let lon_diff = point.lon() - last_lon;
        if (lat_diff * lat_diff + lon_diff * lon_diff).sqrt() > min_delta {
            last_lat = point.lat();
            last_lon = point.lon();
            kept.push(point.point());
        }
    }

    kept
}

/// Compute the bounding region over pooled point categories.
///
/// Categories are traversed in order and weighted equally; the region is
/// seeded from the first point encountered and expanded by comparison over
/// every remaining point. Returns `None` when every category is empty, which
/// callers must answer with their own fallback viewport. Never seed from a
/// literal zero: that drags the region toward the origin whenever all real
/// coordinates share a sign.
pub fn compute_bounds<'a, I>(categories: I) -> Option<GeoBounds>
where
    I: IntoIterator<Item = &'a [GeoPoint]>,
{
    let mut bounds: Option<GeoBounds> = None;

    for category in categories {
        for point in category {
            match bounds.as_mut() {
                Some(region) => region.expand(point.lat(), point.lon()),
                None => bounds = Some(GeoBounds::from_point(point.lat(), point.lon())),
            }
        }
    }

    bounds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PointKind;

    fn points(coords: &[(f64, f64)]) -> Vec<GeoPoint> {
        coords
            .iter()
            .map(|&(lat, lon)| GeoPoint::new(PointKind::TrackPoint, lat, lon))
            .collect()
    }

    #[test]
    fn test_decimate_empty_input() {
        assert!(decimate(&[], DEFAULT_MIN_POINT_DELTA).is_empty());
    }

    #[test]
    fn test_decimate_single_point() {
        let input = points(&[(51.5, -0.1)]);
        let kept = decimate(&input, DEFAULT_MIN_POINT_DELTA);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0], geo::Point::new(-0.1, 51.5));
    }

    #[test]
    fn test_decimate_always_keeps_first_point() {
        let input = points(&[(10.0, 20.0), (10.0, 20.0), (10.0, 20.0)]);
        let kept = decimate(&input, DEFAULT_MIN_POINT_DELTA);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0], geo::Point::new(20.0, 10.0));
    }

    #[test]
    fn test_decimate_identical_points_collapse_for_any_nonnegative_delta() {
        let input = points(&[(5.0, 5.0); 10]);
        assert_eq!(decimate(&input, 0.0).len(), 1);
        assert_eq!(decimate(&input, 1.0).len(), 1);
    }

    #[test]
    fn test_decimate_negative_delta_keeps_every_point() {
        let input = points(&[(5.0, 5.0), (5.0, 5.0), (6.0, 6.0)]);
        assert_eq!(decimate(&input, -1.0).len(), 3);
    }

    #[test]
    fn test_decimate_measures_from_last_kept_point() {
        // The middle point is within the threshold of the first, but the
        // third point's distance from the first (the last kept) exceeds it.
        let input = points(&[(0.0, 0.0), (0.0, 0.00005), (0.0, 0.0002)]);
        let kept = decimate(&input, 0.0001);
        assert_eq!(
            kept,
            vec![geo::Point::new(0.0, 0.0), geo::Point::new(0.0002, 0.0)]
        );
    }

    #[test]
    fn test_decimate_kept_pairs_exceed_threshold() {
        let input = points(&[
            (0.0, 0.0),
            (0.00005, 0.0),
            (0.00012, 0.0),
            (0.00013, 0.0),
            (0.0004, 0.0),
        ]);
        let min_delta = 0.0001;
        let kept = decimate(&input, min_delta);

        for pair in kept.windows(2) {
            let lat_diff = pair[1].y() - pair[0].y();
            let lon_diff = pair[1].x() - pair[0].x();
            let distance = (lat_diff * lat_diff + lon_diff * lon_diff).sqrt();
            assert!(distance > min_delta);
        }
    }

    #[test]
    fn test_decimate_is_idempotent_on_its_own_output() {
        let input = points(&[
            (0.0, 0.0),
            (0.00004, 0.00002),
            (0.00015, 0.0001),
            (0.0003, 0.0002),
            (0.00031, 0.00021),
            (0.001, 0.001),
        ]);
        let min_delta = 0.0001;

        let once = decimate(&input, min_delta);
        let rebuilt: Vec<GeoPoint> = once
            .iter()
            .map(|p| GeoPoint::new(PointKind::TrackPoint, p.y(), p.x()))
            .collect();
        let twice = decimate(&rebuilt, min_delta);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_decimate_drops_nan_points_without_moving_anchor() {
        let input = points(&[(0.0, 0.0), (f64::NAN, 0.5), (0.5, 0.5)]);
        let kept = decimate(&input, 0.0001);
        assert_eq!(
            kept,
            vec![geo::Point::new(0.0, 0.0), geo::Point::new(0.5, 0.5)]
        );
    }

    #[test]
    fn test_compute_bounds_empty_signal() {
        assert_eq!(compute_bounds(std::iter::empty()), None);

        let empty: Vec<GeoPoint> = Vec::new();
        assert_eq!(compute_bounds([empty.as_slice(), empty.as_slice()]), None);
    }

    #[test]
    fn test_compute_bounds_single_point() {
        let category = points(&[(5.0, 10.0)]);
        let bounds = compute_bounds([category.as_slice()]).unwrap();
        assert_eq!(bounds.min_lat, 5.0);
        assert_eq!(bounds.max_lat, 5.0);
        assert_eq!(bounds.min_lon, 10.0);
        assert_eq!(bounds.max_lon, 10.0);
    }

    #[test]
    fn test_compute_bounds_mixed_signs() {
        let category = points(&[(1.0, 1.0), (-3.0, 4.0), (2.0, -2.0)]);
        let bounds = compute_bounds([category.as_slice()]).unwrap();
        assert_eq!(bounds.min_lat, -3.0);
        assert_eq!(bounds.max_lat, 2.0);
        assert_eq!(bounds.min_lon, -2.0);
        assert_eq!(bounds.max_lon, 4.0);
    }

    #[test]
    fn test_compute_bounds_all_positive_never_includes_zero() {
        // Regression test for seeding min/max at the origin instead of at
        // the first real data point.
        let category = points(&[(10.0, 20.0), (15.0, 25.0)]);
        let bounds = compute_bounds([category.as_slice()]).unwrap();
        assert_eq!(bounds.min_lat, 10.0);
        assert_eq!(bounds.max_lat, 15.0);
        assert_eq!(bounds.min_lon, 20.0);
        assert_eq!(bounds.max_lon, 25.0);
    }

    #[test]
    fn test_compute_bounds_all_negative_never_includes_zero() {
        let category = points(&[(-10.0, -20.0), (-15.0, -25.0)]);
        let bounds = compute_bounds([category.as_slice()]).unwrap();
        assert_eq!(bounds.min_lat, -15.0);
        assert_eq!(bounds.max_lat, -10.0);
        assert_eq!(bounds.min_lon, -25.0);
        assert_eq!(bounds.max_lon, -20.0);
    }

    #[test]
    fn test_compute_bounds_pools_categories_in_order() {
        let tracks = points(&[(1.0, 1.0)]);
        let routes = points(&[(8.0, -3.0)]);
        let waypoints = points(&[(-4.0, 6.0)]);

        let bounds =
            compute_bounds([tracks.as_slice(), routes.as_slice(), waypoints.as_slice()]).unwrap();
        assert_eq!(bounds.min_lat, -4.0);
        assert_eq!(bounds.max_lat, 8.0);
        assert_eq!(bounds.min_lon, -3.0);
        assert_eq!(bounds.max_lon, 6.0);
    }

    #[test]
    fn test_geo_bounds_center_and_spans() {
        let mut bounds = GeoBounds::from_point(10.0, 20.0);
        bounds.expand(14.0, 26.0);
        assert_eq!(bounds.center(), (12.0, 23.0));
        assert_eq!(bounds.lat_span(), 4.0);
        assert_eq!(bounds.lon_span(), 6.0);

        let mut merged = GeoBounds::from_point(0.0, 0.0);
        merged.merge(&bounds);
        assert_eq!(merged.min_lat, 0.0);
        assert_eq!(merged.max_lat, 14.0);
        assert_eq!(merged.max_lon, 26.0);
    }
}
