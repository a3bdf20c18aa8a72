//! GPX Geometry Data Module
//!
//! This module parses GPX documents and derives the geometry the map view
//! renders: decimated polylines for tracks and routes, styled markers for
//! waypoints, and an aggregate bounding region for viewport fitting.
//!
//! # Overview
//!
//! - Raw XML is parsed once into an element tree ([`xml::XmlNode`])
//! - A single walk extracts tracks, routes and waypoints into an immutable
//!   [`GpxDocument`] with precomputed metadata
//! - [`geometry::decimate`] culls track points below a distance threshold
//! - [`geometry::compute_bounds`] pools every point category into one
//!   bounding region, or an explicit empty signal
//! - [`DocumentCollection`] manages loaded documents and caches the
//!   render-ready polylines and statistics
//!
//! # Usage Example
//!
//! ```rust
//! use gpx_viewer::data::{Config, DocumentCollection, GpxDocument};
//!
//! # fn main() -> gpx_viewer::data::Result<()> {
//! let doc = GpxDocument::parse_str(
//!     r#"<gpx><trk><trkseg>
//!         <trkpt lat="51.50" lon="-0.12"/>
//!         <trkpt lat="51.51" lon="-0.13"/>
//!     </trkseg></trk></gpx>"#,
//! )?;
//!
//! let mut collection = DocumentCollection::new(Config::default());
//! collection.add_document(doc);
//!
//! // One decimated polyline per track segment, ready for rendering.
//! assert_eq!(collection.polylines().len(), 1);
//!
//! // The merged bounding region drives viewport fitting; `None` would mean
//! // "no data, use the fallback viewport".
//! let bounds = collection.bounds().expect("points were loaded");
//! let (_center_lat, _center_lon) = bounds.center();
//! # Ok(())
//! # }
//! ```

mod collection;
mod document;
mod waypoint;
pub mod geometry;
pub mod xml;

// Public API exports
pub use collection::{CollectionInfo, Config, DocumentCollection};
pub use document::{GpxDocument, Route, Track, TrackSegment};
pub use geometry::{DEFAULT_MIN_POINT_DELTA, GeoBounds, compute_bounds, decimate};
pub use waypoint::{GeoPoint, MarkerKind, PointKind};

/// Error types for the data module
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed document: {0}")]
    MalformedDocument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DataError>;
