//! Walkers plugin that renders the extracted GPX geometry on the map
//!
//! Draws the decimated polylines with the configured stroke, draws one pin
//! per waypoint in its marker-category colour, and reports click hits and
//! the selected marker's screen position back to the app through a shared
//! feedback slot.

use egui::{Color32, Stroke};
use gpx_viewer::data::{DocumentCollection, MarkerKind};
use std::sync::{Arc, RwLock};
use walkers::{Plugin, Projector};

/// Distance from a pin head within which a click selects the waypoint.
const PIN_HIT_RADIUS: f32 = 10.0;

/// Vertical offset from the anchor coordinate to the pin head centre.
const PIN_HEAD_OFFSET: f32 = 14.0;

/// Per-frame results reported by the plugin back to the app.
#[derive(Debug, Default, Clone)]
pub struct RenderFeedback {
    /// Waypoint index hit by a click this frame, if any
    pub clicked_waypoint: Option<usize>,
    /// Screen position of the currently selected waypoint's anchor
    pub selected_screen_pos: Option<egui::Pos2>,
    /// Number of polylines drawn
    pub polylines_drawn: usize,
    /// Number of polyline points drawn
    pub points_drawn: usize,
}

/// Plugin for rendering GPX tracks, routes and waypoint markers on the map
pub struct GpxMapPlugin {
    /// Reference to the document collection
    collection: Arc<RwLock<DocumentCollection>>,
    /// Stroke for track and route polylines
    stroke: Stroke,
    /// Collection-wide index of the selected waypoint
    selected: Option<usize>,
    /// Shared feedback slot, written once per frame
    feedback: Arc<RwLock<RenderFeedback>>,
}

impl GpxMapPlugin {
    /// Create a new plugin for this frame
    pub fn new(
        collection: Arc<RwLock<DocumentCollection>>,
        colour: Color32,
        width: f32,
        selected: Option<usize>,
        feedback: Arc<RwLock<RenderFeedback>>,
    ) -> Self {
        Self {
            collection,
            stroke: Stroke::new(width, colour),
            selected,
            feedback,
        }
    }
}

/// Marker pin colour per category: green for image and feature, light green
/// for image only, red for feature only, light red for neither.
pub fn pin_colour(kind: MarkerKind) -> Color32 {
    match kind {
        MarkerKind::ImageAndFeature => Color32::from_rgb(0x00, 0x99, 0x33),
        MarkerKind::ImageOnly => Color32::from_rgb(0x66, 0xff, 0x66),
        MarkerKind::FeatureOnly => Color32::from_rgb(0xff, 0x00, 0x00),
        MarkerKind::Plain => Color32::from_rgb(0xff, 0x66, 0x66),
    }
}

/// Draw a map pin anchored at `pos`: a stem up to a filled, outlined head.
fn draw_pin(painter: &egui::Painter, pos: egui::Pos2, colour: Color32, selected: bool) {
    let head = pos - egui::vec2(0.0, PIN_HEAD_OFFSET);
    let outline = Stroke::new(1.0, Color32::BLACK);

    painter.line_segment([pos, head], Stroke::new(2.0, Color32::BLACK));
    let radius = if selected { 8.0 } else { 6.0 };
    painter.circle(head, radius, colour, outline);
    if selected {
        painter.circle_stroke(head, radius + 2.5, Stroke::new(1.5, Color32::WHITE));
    }
}

impl Plugin for GpxMapPlugin {
    fn run(
        self: Box<Self>,
        ui: &mut egui::Ui,
        response: &egui::Response,
        projector: &Projector,
        _map_memory: &walkers::MapMemory,
    ) {
        profiling::scope!("GpxMapPlugin::run");

        let painter = ui.painter();
        let collection = self.collection.read().unwrap();
        let mut feedback = RenderFeedback::default();

        // Track and route polylines
        for polyline in collection.polylines() {
            let screen_points: Vec<egui::Pos2> = polyline
                .iter()
                .map(|point| {
                    let position = walkers::lat_lon(point.y(), point.x());
                    let screen_vec = projector.project(position);
                    egui::Pos2::new(screen_vec.x, screen_vec.y)
                })
                .collect();

            if screen_points.len() >= 2 {
                feedback.polylines_drawn += 1;
                feedback.points_drawn += screen_points.len();
                painter.add(egui::Shape::line(screen_points, self.stroke));
            }
        }

        // Waypoint markers, with click hit-testing against the pin heads
        let click_pos = if response.clicked() {
            response.interact_pointer_pos()
        } else {
            None
        };

        for (index, waypoint) in collection.waypoints().enumerate() {
            let position = walkers::lat_lon(waypoint.lat(), waypoint.lon());
            let screen_vec = projector.project(position);
            let screen_pos = egui::Pos2::new(screen_vec.x, screen_vec.y);

            let is_selected = self.selected == Some(index);
            draw_pin(painter, screen_pos, pin_colour(waypoint.marker()), is_selected);

            if is_selected {
                feedback.selected_screen_pos = Some(screen_pos);
            }

            if let Some(click) = click_pos {
                let head = screen_pos - egui::vec2(0.0, PIN_HEAD_OFFSET);
                if click.distance(head) <= PIN_HIT_RADIUS {
                    feedback.clicked_waypoint = Some(index);
                }
            }
        }

        *self.feedback.write().unwrap() = feedback;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_colour_covers_every_category() {
        assert_eq!(
            pin_colour(MarkerKind::ImageAndFeature),
            Color32::from_rgb(0, 153, 51)
        );
        assert_eq!(
            pin_colour(MarkerKind::ImageOnly),
            Color32::from_rgb(102, 255, 102)
        );
        assert_eq!(pin_colour(MarkerKind::FeatureOnly), Color32::from_rgb(255, 0, 0));
        assert_eq!(pin_colour(MarkerKind::Plain), Color32::from_rgb(255, 102, 102));
    }
}
