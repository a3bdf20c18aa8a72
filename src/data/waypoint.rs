//! Extracted point model: coordinates plus the open attribute and content
//! surface used for marker popups
//!
//! A [`GeoPoint`] is an immutable read-only view derived from one element of
//! the source document. Coordinate text that fails to parse becomes NaN and
//! flows through unchanged; rendering and decimation tolerate it downstream.

use crate::data::xml::XmlNode;
use geo::Point;

/// Which kind of source element a point was extracted from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointKind {
    Waypoint,
    TrackPoint,
    RoutePoint,
}

impl PointKind {
    /// Human-readable label used as the popup fallback title.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Waypoint => "Waypoint",
            Self::TrackPoint => "Track Point",
            Self::RoutePoint => "Route Point",
        }
    }
}

/// Marker style category for a waypoint.
///
/// Derived from the presence of the `exist` (an associated image) and
/// `feature` (a notable feature) extension markers. The mapping is total:
/// adding a new category means adding a variant and its color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarkerKind {
    /// Both an associated image and a notable feature
    ImageAndFeature,
    /// An associated image only
    ImageOnly,
    /// A notable feature only
    FeatureOnly,
    /// Neither flag present
    Plain,
}

impl MarkerKind {
    /// Total mapping from the two presence flags to a marker category.
    pub fn from_flags(has_image: bool, has_feature: bool) -> Self {
        match (has_image, has_feature) {
            (true, true) => Self::ImageAndFeature,
            (true, false) => Self::ImageOnly,
            (false, true) => Self::FeatureOnly,
            (false, false) => Self::Plain,
        }
    }

    pub fn has_image(&self) -> bool {
        matches!(self, Self::ImageAndFeature | Self::ImageOnly)
    }

    pub fn has_feature(&self) -> bool {
        matches!(self, Self::ImageAndFeature | Self::FeatureOnly)
    }
}

/// A single extracted point: coordinate, source attributes, child element
/// text and the optional opaque rich-content payload.
#[derive(Clone, Debug)]
pub struct GeoPoint {
    /// Coordinate with x = longitude, y = latitude (degrees)
    point: Point<f64>,
    kind: PointKind,
    /// Source element attributes in document order
    attributes: Vec<(String, String)>,
    /// Direct child elements with non-empty text, in document order
    children: Vec<(String, String)>,
    /// Rich-content payload carried opaquely, if the source provides one
    html: Option<String>,
    marker: MarkerKind,
}

impl GeoPoint {
    /// Create a bare point from a coordinate. Used for points that carry no
    /// popup surface (and by tests).
    pub fn new(kind: PointKind, lat: f64, lon: f64) -> Self {
        Self {
            point: Point::new(lon, lat),
            kind,
            attributes: Vec::new(),
            children: Vec::new(),
            html: None,
            marker: MarkerKind::Plain,
        }
    }

    /// Extract a point from a source element.
    ///
    /// The `lat`/`lon` attributes are read through [`coord_attr`]; everything
    /// else on the element is carried along for popup assembly. The marker
    /// flags come from descendant `exist`/`feature` elements, the rich
    /// payload from a descendant `html` element.
    pub fn from_node(kind: PointKind, node: &XmlNode) -> Self {
        let lat = coord_attr(node, "lat");
        let lon = coord_attr(node, "lon");

        let children = node
            .children
            .iter()
            .filter(|child| !child.text.trim().is_empty())
            .map(|child| (child.name.clone(), child.text.clone()))
            .collect();

        let html = node
            .first_descendant("html")
            .filter(|n| !n.text.is_empty())
            .map(|n| n.text.clone());

        let marker =
            MarkerKind::from_flags(node.has_descendant("exist"), node.has_descendant("feature"));

        Self {
            point: Point::new(lon, lat),
            kind,
            attributes: node.attributes.clone(),
            children,
            html,
            marker,
        }
    }

    #[inline]
    pub fn lat(&self) -> f64 {
        self.point.y()
    }

    #[inline]
    pub fn lon(&self) -> f64 {
        self.point.x()
    }

    /// Coordinate with x = longitude, y = latitude
    #[inline]
    pub fn point(&self) -> Point<f64> {
        self.point
    }

    #[inline]
    pub fn kind(&self) -> PointKind {
        self.kind
    }

    #[inline]
    pub fn marker(&self) -> MarkerKind {
        self.marker
    }

    #[inline]
    pub fn html(&self) -> Option<&str> {
        self.html.as_deref()
    }

    /// The `name` child element text, if present.
    pub fn name(&self) -> Option<&str> {
        self.children
            .iter()
            .find(|(tag, _)| tag == "name")
            .map(|(_, text)| text.as_str())
    }

    /// Popup title: the point's name, or the kind label when unnamed.
    pub fn popup_title(&self) -> &str {
        self.name().unwrap_or_else(|| self.kind.label())
    }

    /// Popup body: one `name = value` line per source attribute, then per
    /// non-empty child element. Used when the point carries no rich payload.
    pub fn popup_lines(&self) -> Vec<String> {
        self.attributes
            .iter()
            .chain(self.children.iter())
            .map(|(name, value)| format!("{} = {}", name, value))
            .collect()
    }
}

/// Read a coordinate attribute as f64.
///
/// Missing or unparsable values become NaN rather than an error; the
/// permissive pass-through matches how the rest of the pipeline treats
/// malformed coordinates.
pub(crate) fn coord_attr(node: &XmlNode, name: &str) -> f64 {
    node.attr(name)
        .map(|value| value.trim().parse().unwrap_or(f64::NAN))
        .unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::xml::parse_str;

    #[test]
    fn test_marker_kind_decision_table() {
        assert_eq!(MarkerKind::from_flags(true, true), MarkerKind::ImageAndFeature);
        assert_eq!(MarkerKind::from_flags(true, false), MarkerKind::ImageOnly);
        assert_eq!(MarkerKind::from_flags(false, true), MarkerKind::FeatureOnly);
        assert_eq!(MarkerKind::from_flags(false, false), MarkerKind::Plain);
    }

    #[test]
    fn test_from_node_reads_coordinates_and_attributes() {
        let node = parse_str(r#"<wpt lat="49.5" lon="-122.9"><name>Summit</name><ele>812</ele></wpt>"#)
            .unwrap();
        let point = GeoPoint::from_node(PointKind::Waypoint, &node);

        assert_eq!(point.lat(), 49.5);
        assert_eq!(point.lon(), -122.9);
        assert_eq!(point.kind(), PointKind::Waypoint);
        assert_eq!(point.name(), Some("Summit"));
        assert_eq!(point.popup_title(), "Summit");
        assert_eq!(
            point.popup_lines(),
            vec!["lat = 49.5", "lon = -122.9", "name = Summit", "ele = 812"]
        );
    }

    #[test]
    fn test_unnamed_point_falls_back_to_kind_label() {
        let node = parse_str(r#"<rtept lat="1" lon="2"/>"#).unwrap();
        let point = GeoPoint::from_node(PointKind::RoutePoint, &node);
        assert_eq!(point.popup_title(), "Route Point");
    }

    #[test]
    fn test_malformed_coordinates_become_nan() {
        let node = parse_str(r#"<wpt lat="not-a-number" lon="7.25"/>"#).unwrap();
        let point = GeoPoint::from_node(PointKind::Waypoint, &node);
        assert!(point.lat().is_nan());
        assert_eq!(point.lon(), 7.25);

        let node = parse_str(r#"<wpt lon="7.25"/>"#).unwrap();
        let point = GeoPoint::from_node(PointKind::Waypoint, &node);
        assert!(point.lat().is_nan());
    }

    #[test]
    fn test_extension_markers_set_flags() {
        let node = parse_str(
            r#"<wpt lat="1" lon="2"><extensions><html><![CDATA[src="img.jpg"|notes]]></html><exist/><feature/></extensions></wpt>"#,
        )
        .unwrap();
        let point = GeoPoint::from_node(PointKind::Waypoint, &node);

        assert_eq!(point.marker(), MarkerKind::ImageAndFeature);
        assert!(point.marker().has_image());
        assert!(point.marker().has_feature());
        assert_eq!(point.html(), Some("src=\"img.jpg\"|notes"));
    }

    #[test]
    fn test_plain_waypoint_has_no_flags_or_payload() {
        let node = parse_str(r#"<wpt lat="1" lon="2"><name>Plain</name></wpt>"#).unwrap();
        let point = GeoPoint::from_node(PointKind::Waypoint, &node);
        assert_eq!(point.marker(), MarkerKind::Plain);
        assert_eq!(point.html(), None);
    }
}
