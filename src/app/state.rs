//! Runtime state of the viewer
//!
//! Owns the document collection, the adjustable UI settings, the file
//! loading queue and the waypoint popup selection.

use crate::app::settings::Settings;
use egui::Color32;
use gpx_viewer::data::{Config, DocumentCollection, GpxDocument};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// Everything the viewer mutates at runtime
pub struct AppState {
    /// All loaded GPX data
    pub collection: Arc<RwLock<DocumentCollection>>,

    /// Settings adjustable from the sidebar
    pub ui_settings: UiSettings,

    /// File loading queue and results
    pub file_loader: FileLoader,

    /// Counts and totals shown in the statistics panel
    pub stats: Stats,

    /// Collection-wide index of the waypoint whose popup is open.
    /// Owned here rather than by the map plugin so keyboard navigation and
    /// click selection share one source of truth.
    pub selected_waypoint: Option<usize>,

    /// Fit the viewport to the loaded bounds on the next frame
    pub pending_fit_bounds: bool,

    /// Rebuild decimated polylines on the next frame (after a threshold change)
    pub pending_reload: bool,

    /// Whether to show the keyboard navigation hint overlay
    pub show_nav_hint: bool,

    /// Timestamp when the navigation hint was shown
    pub nav_hint_shown_at: Option<Instant>,
}

/// Settings the sidebar edits directly
#[derive(Clone)]
pub struct UiSettings {
    /// Stroke colour for track and route lines
    pub track_colour: Color32,

    /// Stroke width for track and route lines, in pixels
    pub line_width: f32,

    /// Minimum distance between rendered track points, in degrees
    pub min_point_delta: f64,

    /// Which tile server the map pulls from
    pub tiles_provider: TilesProvider,

    /// Sidebar visibility
    pub sidebar_open: bool,

    /// Show statistics section in the sidebar
    pub show_stats: bool,

    /// Fallback viewport centre (lat, lon) when there is no data
    pub default_center: (f64, f64),

    /// Fallback zoom level when there is no data
    pub default_zoom: f64,
}

/// Tile servers the map can pull from
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TilesProvider {
    OpenStreetMap,
    OpenTopoMap,
}

impl TilesProvider {
    pub const ALL: [Self; 2] = [Self::OpenStreetMap, Self::OpenTopoMap];

    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenStreetMap => "OpenStreetMap",
            Self::OpenTopoMap => "OpenTopoMap",
        }
    }

    pub fn attribution(&self) -> &'static str {
        match self {
            Self::OpenStreetMap => "© OpenStreetMap contributors",
            Self::OpenTopoMap => "© OpenTopoMap (CC-BY-SA)",
        }
    }
}

/// File loading queue, results and failures
pub struct FileLoader {
    /// Files queued for loading
    pub pending_files: Vec<PathBuf>,

    /// File currently being parsed, if any
    pub loading_file: Option<PathBuf>,

    /// Per-file load failures, kept for the sidebar error list
    pub errors: Vec<(PathBuf, String)>,

    /// Successfully loaded files with their documents, kept for rebuilds
    pub loaded_files: Vec<(PathBuf, Arc<GpxDocument>)>,

    /// Open the native file picker on the next frame
    pub show_picker: bool,
}

/// Aggregate counts shown in the statistics panel
#[derive(Default)]
pub struct Stats {
    /// Number of loaded documents
    pub document_count: usize,

    /// Number of tracks
    pub track_count: usize,

    /// Number of routes
    pub route_count: usize,

    /// Number of waypoints
    pub waypoint_count: usize,

    /// Total number of extracted points
    pub total_points: usize,

    /// Points kept for rendering after decimation
    pub rendered_points: usize,

    /// Total track distance in meters
    pub total_distance: f64,

    /// Last map render time in milliseconds
    pub last_render_time_ms: f64,
}

impl AppState {
    /// Build the initial state from the CLI settings
    pub fn new(settings: &Settings) -> Self {
        let config = Config {
            min_point_delta: settings.min_point_delta,
        };

        let collection = Arc::new(RwLock::new(DocumentCollection::new(config)));

        let ui_settings = UiSettings {
            track_colour: settings.parse_track_colour(),
            line_width: settings.track_width,
            min_point_delta: settings.min_point_delta,
            tiles_provider: TilesProvider::OpenStreetMap,
            sidebar_open: true,
            show_stats: true,
            default_center: (settings.default_lat, settings.default_lon),
            default_zoom: settings.default_zoom,
        };

        let file_loader = FileLoader {
            pending_files: settings.gpx_files.clone(),
            loading_file: None,
            errors: Vec::new(),
            loaded_files: Vec::new(),
            show_picker: false,
        };

        Self {
            collection,
            ui_settings,
            file_loader,
            stats: Stats::default(),
            selected_waypoint: None,
            pending_fit_bounds: false,
            pending_reload: false,
            show_nav_hint: false,
            nav_hint_shown_at: None,
        }
    }

    /// Parse one GPX file and add it to the collection
    pub fn load_gpx_file(&mut self, path: PathBuf) -> Result<(), String> {
        profiling::scope!("load_gpx_file");

        self.file_loader.loading_file = Some(path.clone());

        // Parsing happens before the write lock is taken
        let result = GpxDocument::from_path(&path).map_err(|e| e.to_string());

        self.file_loader.loading_file = None;

        match result {
            Ok(document) => {
                {
                    let mut collection = self.collection.write().unwrap();
                    collection.add_document(document.clone());
                }
                self.file_loader.loaded_files.push((path, document));
                self.update_stats();
                Ok(())
            }
            Err(e) => {
                self.file_loader.errors.push((path, e.clone()));
                Err(e)
            }
        }
    }

    /// Load every pending file in one parallel batch.
    ///
    /// Used for the initial CLI file list; interactive loads go through
    /// [`Self::process_pending_files`] one file per frame instead.
    pub fn load_pending_batch(&mut self) {
        profiling::scope!("load_pending_batch");

        let paths = std::mem::take(&mut self.file_loader.pending_files);
        if paths.is_empty() {
            return;
        }

        let errors = {
            let mut collection = self.collection.write().unwrap();
            let before = collection.document_count();
            let errors = collection.load_from_files(paths.clone());

            // Documents were appended in input order, skipping failures.
            let failed: std::collections::HashSet<&PathBuf> =
                errors.iter().map(|(path, _)| path).collect();
            let mut added = collection.documents()[before..].iter().cloned();
            for path in &paths {
                if !failed.contains(path)
                    && let Some(document) = added.next()
                {
                    self.file_loader.loaded_files.push((path.clone(), document));
                }
            }

            tracing::info!(
                "Loaded {} of {} files",
                paths.len() - errors.len(),
                paths.len()
            );
            errors
        };

        for (path, error) in errors {
            tracing::warn!("Failed to load {}: {}", path.display(), error);
            self.file_loader.errors.push((path, error.to_string()));
        }

        self.update_stats();
    }

    /// Take one file off the queue per frame so the UI keeps painting
    pub fn process_pending_files(&mut self) {
        if let Some(path) = self.file_loader.pending_files.pop() {
            let _ = self.load_gpx_file(path);
        }
    }

    /// Queue a file for loading unless it is already queued or loaded
    pub fn queue_file(&mut self, path: PathBuf) {
        let already_loaded = self.file_loader.loaded_files.iter().any(|(p, _)| p == &path);
        if !self.file_loader.pending_files.contains(&path) && !already_loaded {
            self.file_loader.pending_files.push(path);
        }
    }

    /// Drop a loaded file by index and rebuild the collection without it
    pub fn remove_file(&mut self, index: usize) {
        if index < self.file_loader.loaded_files.len() {
            self.file_loader.loaded_files.remove(index);
            self.rebuild_collection();
            self.selected_waypoint = None;
            self.update_stats();
        }
    }

    /// Rebuild the collection from the remaining loaded documents
    fn rebuild_collection(&mut self) {
        profiling::scope!("rebuild_collection");

        let config = self.collection.read().unwrap().config().clone();
        let mut new_collection = DocumentCollection::new(config);
        for (_, document) in &self.file_loader.loaded_files {
            new_collection.add_document(document.clone());
        }
        self.collection = Arc::new(RwLock::new(new_collection));
    }

    /// Pull fresh statistics out of the collection
    pub fn update_stats(&mut self) {
        profiling::scope!("update_stats");

        let collection = self.collection.read().unwrap();
        let info = collection.get_info();

        self.stats.document_count = info.document_count;
        self.stats.track_count = info.track_count;
        self.stats.route_count = info.route_count;
        self.stats.waypoint_count = info.waypoint_count;
        self.stats.total_points = info.total_points;
        self.stats.rendered_points = info.rendered_points;
        self.stats.total_distance = info.total_distance_meters;
    }

    /// Clear all loaded documents
    pub fn clear_documents(&mut self) {
        let config = self.collection.read().unwrap().config().clone();
        self.collection = Arc::new(RwLock::new(DocumentCollection::new(config)));
        self.file_loader.loaded_files.clear();
        self.file_loader.errors.clear();
        self.file_loader.pending_files.clear();
        self.stats = Stats::default();
        self.selected_waypoint = None;
    }

    /// Change the decimation threshold; the rebuild happens on the next
    /// frame so the slider stays responsive.
    pub fn update_min_delta(&mut self, min_point_delta: f64) {
        self.ui_settings.min_point_delta = min_point_delta;
        self.pending_reload = true;
    }

    /// Apply a pending polyline rebuild
    pub fn process_pending_reload(&mut self) {
        if !self.pending_reload {
            return;
        }
        self.pending_reload = false;

        {
            let mut collection = self.collection.write().unwrap();
            collection.set_min_delta(self.ui_settings.min_point_delta);
        }
        self.update_stats();
    }

    /// Select the next waypoint popup, wrapping at the end.
    /// With no current selection, starts at the first waypoint.
    pub fn select_next_waypoint(&mut self) -> Option<usize> {
        let count = self.stats.waypoint_count;
        if count == 0 {
            return None;
        }
        let next = match self.selected_waypoint {
            Some(index) if index + 1 < count => index + 1,
            Some(_) => 0,
            None => 0,
        };
        self.selected_waypoint = Some(next);
        Some(next)
    }

    /// Select the previous waypoint popup, wrapping at the start.
    /// With no current selection, starts at the last waypoint.
    pub fn select_prev_waypoint(&mut self) -> Option<usize> {
        let count = self.stats.waypoint_count;
        if count == 0 {
            return None;
        }
        let prev = match self.selected_waypoint {
            Some(0) | None => count - 1,
            Some(index) => index - 1,
        };
        self.selected_waypoint = Some(prev);
        Some(prev)
    }

    /// Show the keyboard navigation hint overlay
    pub fn show_navigation_hint(&mut self) {
        self.show_nav_hint = true;
        self.nav_hint_shown_at = Some(Instant::now());
    }

    /// Check if the hint should auto-hide
    pub fn should_hide_nav_hint(&self) -> bool {
        if let Some(shown_at) = self.nav_hint_shown_at {
            shown_at.elapsed().as_secs_f32() >= 6.0
        } else {
            false
        }
    }

    /// Get fade alpha for the navigation hint (0.0 to 1.0).
    /// Fade in over 0.3s, stay visible, fade out over the last second.
    pub fn nav_hint_alpha(&self) -> f32 {
        if let Some(shown_at) = self.nav_hint_shown_at {
            let elapsed = shown_at.elapsed().as_secs_f32();

            if elapsed < 0.3 {
                elapsed / 0.3
            } else if elapsed < 5.0 {
                1.0
            } else if elapsed < 6.0 {
                1.0 - (elapsed - 5.0)
            } else {
                0.0
            }
        } else {
            0.0
        }
    }
}

impl FileLoader {
    /// Whether any file is being parsed or waiting in the queue
    pub fn is_busy(&self) -> bool {
        self.loading_file.is_some() || !self.pending_files.is_empty()
    }

    /// Fraction of the batch finished so far, in 0.0..=1.0
    pub fn progress(&self, total_files: usize) -> f32 {
        if total_files == 0 {
            return 1.0;
        }
        let in_flight = usize::from(self.loading_file.is_some());
        let remaining = self.pending_files.len() + in_flight;
        1.0 - (remaining as f32 / total_files as f32)
    }
}

impl Stats {
    /// Track distance as a readable string, switching units at 1 km
    pub fn format_distance(&self) -> String {
        let km = self.total_distance / 1000.0;
        if km < 1.0 {
            format!("{:.0} m", self.total_distance)
        } else if km < 100.0 {
            format!("{:.2} km", km)
        } else {
            format!("{:.0} km", km)
        }
    }

    pub fn format_points(&self) -> String {
        group_thousands(self.total_points)
    }

    /// Rendered point count, with the culling reduction when it applies
    pub fn format_rendered_points(&self) -> String {
        if self.total_points > 0 {
            let pct = 100.0 * (1.0 - self.rendered_points as f64 / self.total_points as f64);
            format!("{} ({:.0}% reduced)", group_thousands(self.rendered_points), pct)
        } else {
            group_thousands(self.rendered_points)
        }
    }
}

/// Insert comma separators into a count, e.g. 1234567 -> "1,234,567".
fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    let offset = digits.len() % 3;
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (i + 3 - offset) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state(waypoint_count: usize) -> AppState {
        use clap::Parser;
        let settings = Settings::parse_from(Vec::<String>::new());
        let mut state = AppState::new(&settings);
        state.stats.waypoint_count = waypoint_count;
        state
    }

    #[test]
    fn test_waypoint_navigation_wraps() {
        let mut state = test_state(3);

        // Forward from no selection starts at the first waypoint.
        assert_eq!(state.select_next_waypoint(), Some(0));
        assert_eq!(state.select_next_waypoint(), Some(1));
        assert_eq!(state.select_next_waypoint(), Some(2));
        assert_eq!(state.select_next_waypoint(), Some(0));

        // Backwards wraps to the end.
        assert_eq!(state.select_prev_waypoint(), Some(2));
        assert_eq!(state.select_prev_waypoint(), Some(1));
    }

    #[test]
    fn test_waypoint_navigation_backwards_from_no_selection() {
        let mut state = test_state(4);
        assert_eq!(state.select_prev_waypoint(), Some(3));
    }

    #[test]
    fn test_waypoint_navigation_with_no_waypoints() {
        let mut state = test_state(0);
        assert_eq!(state.select_next_waypoint(), None);
        assert_eq!(state.select_prev_waypoint(), None);
        assert_eq!(state.selected_waypoint, None);
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }
}
