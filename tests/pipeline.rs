//! End-to-end pipeline test: GPX text in, render-ready geometry out.

use gpx_viewer::data::{Config, DocumentCollection, GpxDocument, MarkerKind};

const GPX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="pipeline-test"
     xmlns="http://www.topografix.com/GPX/1/1">
  <wpt lat="49.3280" lon="-122.9425">
    <name>Trailhead</name>
    <extensions>
      <html><![CDATA[src="routes/images_0/image_0.jpg"|Distance=150m; Tags: gravel]]></html>
      <exist/>
    </extensions>
  </wpt>
  <wpt lat="49.3310" lon="-122.9380">
    <name>Viewpoint</name>
    <extensions><feature/></extensions>
  </wpt>
  <trk>
    <name>Loop</name>
    <trkseg>
      <trkpt lat="49.3280" lon="-122.9425"/>
      <trkpt lat="49.32805" lon="-122.9425"/>
      <trkpt lat="49.3300" lon="-122.9400"/>
      <trkpt lat="49.3310" lon="-122.9380"/>
    </trkseg>
  </trk>
  <rte>
    <name>Shortcut</name>
    <rtept lat="49.3280" lon="-122.9425"/>
    <rtept lat="49.3310" lon="-122.9380"/>
  </rte>
</gpx>"#;

#[test]
fn gpx_text_becomes_polylines_markers_and_bounds() {
    let document = GpxDocument::parse_str(GPX).expect("sample GPX parses");

    let mut collection = DocumentCollection::new(Config::default());
    collection.add_document(document);

    // One polyline per track segment and per route.
    assert_eq!(collection.polylines().len(), 2);

    // The second track point is within the default threshold of the first
    // and gets culled; the rest survive.
    assert_eq!(collection.polylines()[0].len(), 3);
    assert_eq!(collection.polylines()[1].len(), 2);

    // Waypoints are never decimated and keep their marker categories.
    let markers: Vec<MarkerKind> = collection.waypoints().map(|w| w.marker()).collect();
    assert_eq!(markers, vec![MarkerKind::ImageOnly, MarkerKind::FeatureOnly]);

    let trailhead = collection.waypoint(0).unwrap();
    assert_eq!(trailhead.popup_title(), "Trailhead");
    assert!(trailhead.html().unwrap().starts_with("src="));

    // The bounding region covers every category and feeds viewport fitting.
    let bounds = collection.bounds().expect("points were loaded");
    assert_eq!(bounds.min_lat, 49.3280);
    assert_eq!(bounds.max_lat, 49.3310);
    assert_eq!(bounds.min_lon, -122.9425);
    assert_eq!(bounds.max_lon, -122.9380);

    let (center_lat, center_lon) = bounds.center();
    assert!((center_lat - 49.3295).abs() < 1e-9);
    assert!((center_lon - -122.94025).abs() < 1e-9);

    let info = collection.get_info();
    assert_eq!(info.document_count, 1);
    assert_eq!(info.track_count, 1);
    assert_eq!(info.route_count, 1);
    assert_eq!(info.waypoint_count, 2);
    assert_eq!(info.total_points, 4 + 2 + 2);
    assert_eq!(info.rendered_points, 3 + 2 + 2);
}

#[test]
fn empty_gpx_yields_the_empty_bounds_signal() {
    let document = GpxDocument::parse_str(r#"<gpx version="1.1"></gpx>"#).unwrap();

    let mut collection = DocumentCollection::new(Config::default());
    collection.add_document(document);

    assert!(collection.polylines().is_empty());
    assert_eq!(collection.waypoint_count(), 0);
    // No data: callers must fall back to their default viewport.
    assert_eq!(collection.bounds(), None);
}
