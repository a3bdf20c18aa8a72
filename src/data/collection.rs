//! DocumentCollection - Top-level manager for loaded documents and the
//! geometry derived from them
//!
//! The collection owns the decimated polylines handed to the renderer and
//! keeps incrementally updated statistics and a merged bounding region, so
//! per-frame queries never rescan the raw documents.

use crate::data::geometry::{self, DEFAULT_MIN_POINT_DELTA, GeoBounds};
use crate::data::waypoint::GeoPoint;
use crate::data::{DataError, GpxDocument, Result};

use geo::Point;
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for the document collection.
///
/// Stroke color and width belong to the renderer; the only extraction
/// setting is the decimation threshold.
#[derive(Debug, Clone)]
pub struct Config {
    /// Minimum distance between kept track/route points, in degrees.
    /// Used to cull unneeded points from the rendered polylines.
    pub min_point_delta: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_point_delta: DEFAULT_MIN_POINT_DELTA,
        }
    }
}

/// Information about the document collection
#[derive(Debug, Clone, Default)]
pub struct CollectionInfo {
    /// Number of documents loaded
    pub document_count: usize,
    /// Number of tracks across all documents
    pub track_count: usize,
    /// Number of routes across all documents
    pub route_count: usize,
    /// Number of waypoints across all documents
    pub waypoint_count: usize,
    /// Total number of extracted points
    pub total_points: usize,
    /// Number of points kept after decimation (waypoints included)
    pub rendered_points: usize,
    /// Total track distance in meters
    pub total_distance_meters: f64,
}

/// Cached statistics, updated incrementally as documents are added.
#[derive(Debug, Clone, Default)]
struct CachedStats {
    track_count: usize,
    route_count: usize,
    waypoint_count: usize,
    total_points: usize,
    rendered_points: usize,
    total_distance: f64,
    /// Merged bounding region (None if no document has points)
    bounds: Option<GeoBounds>,
}

/// Top-level manager for all loaded documents
#[derive(Clone, Default)]
pub struct DocumentCollection {
    /// All loaded documents
    documents: Vec<Arc<GpxDocument>>,
    /// Decimated polylines, one per track segment and per route, in
    /// document order
    polylines: Vec<Vec<Point<f64>>>,
    /// Configuration settings
    config: Config,
    /// Cached statistics (incrementally updated)
    cached_stats: CachedStats,
}

impl DocumentCollection {
    /// Create a new collection with the given configuration
    pub fn new(config: Config) -> Self {
        Self {
            documents: Vec::new(),
            polylines: Vec::new(),
            config,
            cached_stats: CachedStats::default(),
        }
    }

    /// Add a document to the collection.
    ///
    /// Decimates its track segments and routes into render-ready polylines
    /// and merges its metadata into the cached statistics.
    pub fn add_document(&mut self, document: Arc<GpxDocument>) {
        profiling::scope!("collection::add_document");

        self.append_polylines(&document);
        self.update_stats_for_added_document(&document);
        self.documents.push(document);
    }

    /// Parse and add multiple GPX files, parsing in parallel.
    ///
    /// Successfully parsed documents are added in input order; failures are
    /// returned per file so the caller can report them individually.
    pub fn load_from_files(&mut self, paths: Vec<PathBuf>) -> Vec<(PathBuf, DataError)> {
        profiling::scope!("collection::load_from_files");

        let results: Vec<(PathBuf, Result<Arc<GpxDocument>>)> = paths
            .into_par_iter()
            .map(|path| {
                let result = GpxDocument::from_path(&path);
                (path, result)
            })
            .collect();

        let mut errors = Vec::new();
        for (path, result) in results {
            match result {
                Ok(document) => self.add_document(document),
                Err(error) => errors.push((path, error)),
            }
        }
        errors
    }

    /// Change the decimation threshold and rebuild the cached polylines.
    pub fn set_min_delta(&mut self, min_point_delta: f64) {
        self.config.min_point_delta = min_point_delta;
        self.rebuild_polylines();
    }

    /// Re-decimate every track segment and route with the current threshold.
    fn rebuild_polylines(&mut self) {
        profiling::scope!("collection::rebuild_polylines");

        self.polylines.clear();
        self.cached_stats.rendered_points = self.cached_stats.waypoint_count;
        let documents = std::mem::take(&mut self.documents);
        for document in &documents {
            self.append_polylines(document);
        }
        self.documents = documents;
    }

    fn append_polylines(&mut self, document: &GpxDocument) {
        let segments = document
            .tracks()
            .iter()
            .flat_map(|track| track.segments().iter())
            .map(|segment| segment.points());
        let routes = document.routes().iter().map(|route| route.points());

        for points in segments.chain(routes) {
            let polyline = geometry::decimate(points, self.config.min_point_delta);
            if polyline.is_empty() {
                continue;
            }
            self.cached_stats.rendered_points += polyline.len();
            self.polylines.push(polyline);
        }
    }

    /// Update cached statistics when a document is added
    fn update_stats_for_added_document(&mut self, document: &GpxDocument) {
        self.cached_stats.track_count += document.tracks().len();
        self.cached_stats.route_count += document.routes().len();
        self.cached_stats.waypoint_count += document.waypoints().len();
        self.cached_stats.rendered_points += document.waypoints().len();
        self.cached_stats.total_points += document.total_points();
        self.cached_stats.total_distance += document.total_distance();

        if let Some(document_bounds) = document.bounds() {
            match &mut self.cached_stats.bounds {
                Some(bounds) => bounds.merge(&document_bounds),
                None => self.cached_stats.bounds = Some(document_bounds),
            }
        }
    }

    /// Decimated polylines for rendering, in document order.
    #[inline]
    pub fn polylines(&self) -> &[Vec<Point<f64>>] {
        &self.polylines
    }

    /// Iterate over all waypoints across documents, in load order.
    pub fn waypoints(&self) -> impl Iterator<Item = &GeoPoint> {
        self.documents
            .iter()
            .flat_map(|document| document.waypoints().iter())
    }

    /// Get a waypoint by its collection-wide index.
    pub fn waypoint(&self, index: usize) -> Option<&GeoPoint> {
        self.waypoints().nth(index)
    }

    /// Number of waypoints across all documents.
    ///
    /// This is O(1) as the value is cached and updated incrementally.
    #[inline]
    pub fn waypoint_count(&self) -> usize {
        self.cached_stats.waypoint_count
    }

    /// The merged bounding region of all documents in lat/lon degrees.
    ///
    /// Returns `None` when no loaded document has any points; callers fall
    /// back to their own default viewport.
    #[inline]
    pub fn bounds(&self) -> Option<GeoBounds> {
        self.cached_stats.bounds
    }

    /// Snapshot of the cached statistics; O(1), nothing is rescanned.
    pub fn get_info(&self) -> CollectionInfo {
        CollectionInfo {
            document_count: self.documents.len(),
            track_count: self.cached_stats.track_count,
            route_count: self.cached_stats.route_count,
            waypoint_count: self.cached_stats.waypoint_count,
            total_points: self.cached_stats.total_points,
            rendered_points: self.cached_stats.rendered_points,
            total_distance_meters: self.cached_stats.total_distance,
        }
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn documents(&self) -> &[Arc<GpxDocument>] {
        &self.documents
    }

    #[inline]
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Drop every document and reset the cached state.
    pub fn clear(&mut self) {
        self.documents.clear();
        self.polylines.clear();
        self.cached_stats = CachedStats::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document(offset: f64) -> Arc<GpxDocument> {
        let gpx = format!(
            r#"<gpx>
  <wpt lat="{lat}" lon="{lon}"><name>W</name></wpt>
  <trk><trkseg>
    <trkpt lat="{lat}" lon="{lon}"/>
    <trkpt lat="{lat2}" lon="{lon2}"/>
    <trkpt lat="{lat3}" lon="{lon3}"/>
  </trkseg></trk>
</gpx>"#,
            lat = 51.0 + offset,
            lon = -0.2 + offset,
            lat2 = 51.0 + offset + 0.00005,
            lon2 = -0.2 + offset,
            lat3 = 51.0 + offset + 0.01,
            lon3 = -0.2 + offset + 0.01,
        );
        GpxDocument::parse_str(&gpx).unwrap()
    }

    #[test]
    fn test_collection_creation() {
        let collection = DocumentCollection::new(Config::default());
        assert_eq!(collection.document_count(), 0);
        assert!(collection.is_empty());
        assert_eq!(collection.bounds(), None);
        assert!(collection.polylines().is_empty());
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.min_point_delta, 0.0001);
    }

    #[test]
    fn test_add_document_builds_decimated_polylines() {
        let mut collection = DocumentCollection::new(Config::default());
        collection.add_document(sample_document(0.0));

        assert_eq!(collection.polylines().len(), 1);
        // The second track point sits under the threshold and is culled.
        assert_eq!(collection.polylines()[0].len(), 2);

        let info = collection.get_info();
        assert_eq!(info.document_count, 1);
        assert_eq!(info.track_count, 1);
        assert_eq!(info.waypoint_count, 1);
        assert_eq!(info.total_points, 4);
        assert_eq!(info.rendered_points, 3); // 2 kept track points + 1 waypoint
    }

    #[test]
    fn test_bounds_merge_across_documents() {
        let mut collection = DocumentCollection::new(Config::default());
        collection.add_document(sample_document(0.0));
        collection.add_document(sample_document(1.0));

        let bounds = collection.bounds().unwrap();
        assert!((bounds.min_lat - 51.0).abs() < 1e-9);
        assert!((bounds.max_lat - 52.01).abs() < 1e-9);
        assert!((bounds.min_lon - -0.2).abs() < 1e-9);
        assert!((bounds.max_lon - 0.81).abs() < 1e-9);
    }

    #[test]
    fn test_set_min_delta_rebuilds_polylines() {
        let mut collection = DocumentCollection::new(Config::default());
        collection.add_document(sample_document(0.0));
        assert_eq!(collection.polylines()[0].len(), 2);

        // A degenerate threshold keeps all distinct positions.
        collection.set_min_delta(0.0);
        assert_eq!(collection.polylines()[0].len(), 3);
        assert_eq!(collection.get_info().rendered_points, 4);

        // A huge threshold collapses each polyline to its first point.
        collection.set_min_delta(10.0);
        assert_eq!(collection.polylines()[0].len(), 1);
    }

    #[test]
    fn test_waypoint_lookup_by_global_index() {
        let mut collection = DocumentCollection::new(Config::default());
        collection.add_document(sample_document(0.0));
        collection.add_document(sample_document(1.0));

        assert_eq!(collection.waypoint_count(), 2);
        assert_eq!(collection.waypoint(0).unwrap().lat(), 51.0);
        assert_eq!(collection.waypoint(1).unwrap().lat(), 52.0);
        assert!(collection.waypoint(2).is_none());
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut collection = DocumentCollection::new(Config::default());
        collection.add_document(sample_document(0.0));
        collection.clear();

        assert!(collection.is_empty());
        assert!(collection.polylines().is_empty());
        assert_eq!(collection.bounds(), None);
        assert_eq!(collection.get_info().total_points, 0);
    }

    #[test]
    fn test_load_from_files_reports_missing_files() {
        let mut collection = DocumentCollection::new(Config::default());
        let errors = collection.load_from_files(vec![PathBuf::from("/nonexistent/file.gpx")]);
        assert_eq!(errors.len(), 1);
        assert!(collection.is_empty());
    }
}
