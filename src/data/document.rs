//! GPX document storage and parsing
//!
//! One walk over the parsed element tree extracts tracks, routes and
//! waypoints in document order, then precomputes the metadata the viewer
//! asks for repeatedly (bounding region, point count, track distance).

use crate::data::Result;
use crate::data::geometry::{self, GeoBounds};
use crate::data::waypoint::{GeoPoint, PointKind};
use crate::data::xml::{self, XmlNode};
use std::path::Path;
use std::sync::Arc;

/// A recorded path: ordered segments of ordered points.
#[derive(Clone, Debug)]
pub struct Track {
    name: Option<String>,
    segments: Vec<TrackSegment>,
}

/// One contiguous stretch of a track (gaps in recording split segments).
#[derive(Clone, Debug)]
pub struct TrackSegment {
    points: Vec<GeoPoint>,
}

/// A planned sequence of points, with no segment nesting.
#[derive(Clone, Debug)]
pub struct Route {
    name: Option<String>,
    points: Vec<GeoPoint>,
}

impl Track {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn segments(&self) -> &[TrackSegment] {
        &self.segments
    }
}

impl TrackSegment {
    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }
}

impl Route {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }
}

/// A parsed GPX document with precomputed metadata.
///
/// All contents are derived in one parse pass and never mutated afterwards;
/// the viewer shares documents as `Arc<GpxDocument>`.
#[derive(Clone, Debug)]
pub struct GpxDocument {
    tracks: Vec<Track>,
    routes: Vec<Route>,
    waypoints: Vec<GeoPoint>,
    /// Bounding region over every point category, `None` when the document
    /// has no points at all
    bounds: Option<GeoBounds>,
    /// Total number of extracted points across all categories
    cached_total_points: usize,
    /// Total track distance in meters (haversine over consecutive points)
    cached_total_distance: f64,
}

impl GpxDocument {
    /// Parse a GPX document from a file on disk.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Arc<Self>> {
        profiling::scope!("document::from_path");

        let file = std::fs::File::open(path.as_ref())?;
        let reader = std::io::BufReader::new(file);
        let root = xml::parse_reader(reader)?;
        Ok(Self::from_root(&root))
    }

    /// Parse a GPX document from a string.
    pub fn parse_str(input: &str) -> Result<Arc<Self>> {
        let root = xml::parse_str(input)?;
        Ok(Self::from_root(&root))
    }

    /// Extract a document from an already-parsed element tree.
    ///
    /// The walk is permissive: elements outside the expected `trk`/`rte`/
    /// `wpt` shapes are ignored and an element-free tree yields an empty
    /// document rather than an error.
    pub fn from_root(root: &XmlNode) -> Arc<Self> {
        profiling::scope!("document::from_root");

        let tracks: Vec<Track> = root
            .descendants_named("trk")
            .into_iter()
            .map(|trk| Track {
                name: element_name(trk),
                segments: trk
                    .descendants_named("trkseg")
                    .into_iter()
                    .map(|seg| TrackSegment {
                        points: extract_points(seg, "trkpt", PointKind::TrackPoint),
                    })
                    .collect(),
            })
            .collect();

        let routes: Vec<Route> = root
            .descendants_named("rte")
            .into_iter()
            .map(|rte| Route {
                name: element_name(rte),
                points: extract_points(rte, "rtept", PointKind::RoutePoint),
            })
            .collect();

        let waypoints: Vec<GeoPoint> = root
            .descendants_named("wpt")
            .into_iter()
            .map(|wpt| GeoPoint::from_node(PointKind::Waypoint, wpt))
            .collect();

        let bounds = {
            let track_slices = tracks
                .iter()
                .flat_map(|track| track.segments.iter())
                .map(|segment| segment.points.as_slice());
            let route_slices = routes.iter().map(|route| route.points.as_slice());
            geometry::compute_bounds(
                track_slices
                    .chain(route_slices)
                    .chain(std::iter::once(waypoints.as_slice())),
            )
        };

        let total_points = tracks
            .iter()
            .flat_map(|track| track.segments.iter())
            .map(|segment| segment.points.len())
            .sum::<usize>()
            + routes.iter().map(|route| route.points.len()).sum::<usize>()
            + waypoints.len();

        let total_distance = tracks
            .iter()
            .flat_map(|track| track.segments.iter())
            .map(|segment| segment_distance(&segment.points))
            .sum();

        Arc::new(Self {
            tracks,
            routes,
            waypoints,
            bounds,
            cached_total_points: total_points,
            cached_total_distance: total_distance,
        })
    }

    #[inline]
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    #[inline]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    #[inline]
    pub fn waypoints(&self) -> &[GeoPoint] {
        &self.waypoints
    }

    /// Bounding region over all point categories, `None` for a document
    /// without points. Computed once during construction.
    #[inline]
    pub fn bounds(&self) -> Option<GeoBounds> {
        self.bounds
    }

    /// Total number of points across tracks, routes and waypoints.
    ///
    /// This is O(1) as the value is cached during construction.
    #[inline]
    pub fn total_points(&self) -> usize {
        self.cached_total_points
    }

    /// Total track distance in meters.
    ///
    /// This is O(1) as the value is cached during construction.
    #[inline]
    pub fn total_distance(&self) -> f64 {
        self.cached_total_distance
    }
}

fn element_name(node: &XmlNode) -> Option<String> {
    node.children_named("name")
        .next()
        .filter(|n| !n.text.is_empty())
        .map(|n| n.text.clone())
}

fn extract_points(parent: &XmlNode, tag: &str, kind: PointKind) -> Vec<GeoPoint> {
    parent
        .descendants_named(tag)
        .into_iter()
        .map(|node| GeoPoint::from_node(kind, node))
        .collect()
}

/// Sum of haversine distances between consecutive segment points, skipping
/// pairs with malformed coordinates (they still render, but cannot
/// contribute a distance).
fn segment_distance(points: &[GeoPoint]) -> f64 {
    points
        .windows(2)
        .map(|pair| haversine_distance(&pair[0], &pair[1]))
        .filter(|distance| distance.is_finite())
        .sum()
}

/// Haversine distance between two points in meters.
fn haversine_distance(p1: &GeoPoint, p2: &GeoPoint) -> f64 {
    let lat1 = p1.lat().to_radians();
    let lat2 = p2.lat().to_radians();
    let delta_lat = (p2.lat() - p1.lat()).to_radians();
    let delta_lon = (p2.lon() - p1.lon()).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    // Earth's radius in meters
    const EARTH_RADIUS_M: f64 = 6371000.0;
    EARTH_RADIUS_M * c
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test">
  <wpt lat="51.5074" lon="-0.1278">
    <name>Start</name>
    <extensions>
      <html><![CDATA[src="images/start.jpg"|Distance=120m]]></html>
      <exist/>
    </extensions>
  </wpt>
  <wpt lat="51.5080" lon="-0.1270">
    <name>Lookout</name>
    <extensions><feature/></extensions>
  </wpt>
  <trk>
    <name>Morning ride</name>
    <trkseg>
      <trkpt lat="51.5074" lon="-0.1278"/>
      <trkpt lat="51.5076" lon="-0.1276"/>
      <trkpt lat="51.5078" lon="-0.1274"/>
    </trkseg>
    <trkseg>
      <trkpt lat="51.5100" lon="-0.1250"/>
    </trkseg>
  </trk>
  <rte>
    <name>Planned</name>
    <rtept lat="51.5200" lon="-0.1300"/>
    <rtept lat="51.5210" lon="-0.1310"/>
  </rte>
</gpx>"#;

    #[test]
    fn test_document_walk_extracts_all_categories() {
        let doc = GpxDocument::parse_str(SAMPLE).unwrap();

        assert_eq!(doc.tracks().len(), 1);
        assert_eq!(doc.tracks()[0].name(), Some("Morning ride"));
        assert_eq!(doc.tracks()[0].segments().len(), 2);
        assert_eq!(doc.tracks()[0].segments()[0].points().len(), 3);
        assert_eq!(doc.tracks()[0].segments()[1].points().len(), 1);

        assert_eq!(doc.routes().len(), 1);
        assert_eq!(doc.routes()[0].name(), Some("Planned"));
        assert_eq!(doc.routes()[0].points().len(), 2);

        assert_eq!(doc.waypoints().len(), 2);
        assert_eq!(doc.waypoints()[0].name(), Some("Start"));
        assert_eq!(doc.total_points(), 4 + 2 + 2);
    }

    #[test]
    fn test_document_order_is_preserved() {
        let doc = GpxDocument::parse_str(SAMPLE).unwrap();
        let segment = &doc.tracks()[0].segments()[0];

        let lats: Vec<f64> = segment.points().iter().map(|p| p.lat()).collect();
        assert_eq!(lats, vec![51.5074, 51.5076, 51.5078]);
    }

    #[test]
    fn test_waypoint_extension_flags() {
        let doc = GpxDocument::parse_str(SAMPLE).unwrap();

        let start = &doc.waypoints()[0];
        assert!(start.marker().has_image());
        assert!(!start.marker().has_feature());
        assert_eq!(start.html(), Some("src=\"images/start.jpg\"|Distance=120m"));

        let lookout = &doc.waypoints()[1];
        assert!(!lookout.marker().has_image());
        assert!(lookout.marker().has_feature());
    }

    #[test]
    fn test_bounds_cover_every_category() {
        let doc = GpxDocument::parse_str(SAMPLE).unwrap();
        let bounds = doc.bounds().unwrap();

        // Route points extend the region beyond the track and waypoints.
        assert_eq!(bounds.max_lat, 51.5210);
        assert_eq!(bounds.min_lat, 51.5074);
        assert_eq!(bounds.min_lon, -0.1310);
        assert_eq!(bounds.max_lon, -0.1250);
    }

    #[test]
    fn test_empty_document_is_not_an_error() {
        let doc = GpxDocument::parse_str(r#"<gpx version="1.1"></gpx>"#).unwrap();
        assert!(doc.tracks().is_empty());
        assert!(doc.routes().is_empty());
        assert!(doc.waypoints().is_empty());
        assert_eq!(doc.bounds(), None);
        assert_eq!(doc.total_points(), 0);
    }

    #[test]
    fn test_malformed_coordinates_pass_through() {
        let doc = GpxDocument::parse_str(
            r#"<gpx><trk><trkseg><trkpt lat="bogus" lon="1.0"/><trkpt lat="2.0" lon="1.5"/></trkseg></trk></gpx>"#,
        )
        .unwrap();

        let points = doc.tracks()[0].segments()[0].points();
        assert!(points[0].lat().is_nan());
        assert_eq!(points[1].lat(), 2.0);
        // The NaN pair contributes nothing, so distance stays finite.
        assert!(doc.total_distance().is_finite());
    }

    #[test]
    fn test_track_distance_is_plausible() {
        let doc = GpxDocument::parse_str(SAMPLE).unwrap();
        // Points are tens of meters apart around London.
        assert!(doc.total_distance() > 0.0);
        assert!(doc.total_distance() < 1000.0);
    }
}
