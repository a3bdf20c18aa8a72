//! The eframe application
//!
//! Wires the extracted GPX geometry into the map widget:
//! - Full-screen map with track, route and waypoint rendering
//! - Waypoint popups opened by click or PageUp/PageDown
//! - Toggleable sidebar with file, statistics and settings panels
//! - GPX loading via CLI, file picker and drag-and-drop

mod plugin;
pub(crate) mod settings;
mod state;
mod ui_panels;

use crate::app::plugin::{GpxMapPlugin, RenderFeedback};
use crate::app::settings::Settings;
use crate::app::state::{AppState, TilesProvider};
use eframe::egui;
use std::sync::{Arc, RwLock};
use walkers::{
    HttpTiles, Map, MapMemory, TileId,
    sources::{Attribution, OpenStreetMap, TileSource},
};

/// OpenTopoMap tile source (walkers only ships OpenStreetMap)
pub struct OpenTopoMap;

impl TileSource for OpenTopoMap {
    fn tile_url(&self, tile_id: TileId) -> String {
        format!(
            "https://tile.opentopomap.org/{}/{}/{}.png",
            tile_id.zoom, tile_id.x, tile_id.y
        )
    }

    fn attribution(&self) -> Attribution {
        Attribution {
            text: "© OpenTopoMap (CC-BY-SA)",
            url: "https://opentopomap.org/",
            logo_light: None,
            logo_dark: None,
        }
    }

    fn max_zoom(&self) -> u8 {
        17
    }
}

/// Scalar settings written to eframe storage on exit. Document data is
/// never persisted; the listed files are parsed again on startup.
#[derive(serde::Serialize, serde::Deserialize)]
struct PersistedSettings {
    track_colour: String,
    line_width: f32,
    min_point_delta: f64,
    sidebar_open: bool,
    show_stats: bool,
    tiles_provider: String,
    loaded_file_paths: Vec<String>,
}

pub struct GpxViewerApp {
    /// Documents, UI settings and the loading queue
    state: AppState,

    /// OpenStreetMap tile fetcher
    tiles_osm: HttpTiles,

    /// OpenTopoMap tile fetcher
    tiles_otm: HttpTiles,

    /// Camera position and zoom owned by walkers
    map_memory: MapMemory,

    /// Help overlay visibility
    show_help: bool,

    /// Shared per-frame feedback from the map plugin (clicks, marker
    /// screen position, draw counts)
    feedback: Arc<RwLock<RenderFeedback>>,

    /// Whether the initial batch of CLI/persisted files has been loaded
    started_initial_batch_load: bool,

    /// Whether interactive loads were in flight last frame
    was_loading: bool,
}

impl GpxViewerApp {
    /// eframe storage key for [`PersistedSettings`]
    const STORAGE_KEY: &'static str = "gpx_viewer_settings";

    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let cli_args = Settings::from_cli();

        let mut state = if cli_args.ignore_persisted {
            tracing::info!("Starting fresh, persisted settings ignored");
            AppState::new(&cli_args)
        } else if let Some(storage) = cc.storage {
            Self::load_persisted_settings(storage, &cli_args)
        } else {
            AppState::new(&cli_args)
        };

        // Queue CLI files; queue_file skips anything already scheduled by
        // the restored settings
        for file in &cli_args.gpx_files {
            state.queue_file(file.clone());
        }

        let tiles_osm = HttpTiles::new(OpenStreetMap, cc.egui_ctx.clone());
        let tiles_otm = HttpTiles::new(OpenTopoMap, cc.egui_ctx.clone());

        // The camera starts at the fallback viewport; a successful load
        // replaces it through fit_to_bounds.
        let mut map_memory = MapMemory::default();
        let _ = map_memory.set_zoom(state.ui_settings.default_zoom);

        tracing::info!(
            files_queued = state.file_loader.pending_files.len(),
            "viewer ready"
        );

        Self {
            state,
            tiles_osm,
            tiles_otm,
            map_memory,
            show_help: false,
            feedback: Arc::new(RwLock::new(RenderFeedback::default())),
            started_initial_batch_load: false,
            was_loading: false,
        }
    }

    /// Restore settings saved by a previous run, if there are any
    fn load_persisted_settings(storage: &dyn eframe::Storage, cli_args: &Settings) -> AppState {
        if let Some(json) = storage.get_string(Self::STORAGE_KEY)
            && !json.is_empty()
            && let Ok(persisted) = serde_json::from_str::<PersistedSettings>(&json)
        {
            tracing::info!("Settings restored; previously open files will reload");
            return Self::state_from_persisted_settings(persisted, cli_args);
        }

        tracing::info!("No saved settings, using defaults");
        AppState::new(cli_args)
    }

    fn state_from_persisted_settings(persisted: PersistedSettings, cli_args: &Settings) -> AppState {
        let mut state = AppState::new(cli_args);

        state.ui_settings.track_colour = settings::parse_hex_colour(&persisted.track_colour)
            .unwrap_or_else(|| cli_args.parse_track_colour());
        state.ui_settings.line_width = persisted.line_width;
        state.ui_settings.min_point_delta = persisted.min_point_delta;
        state.ui_settings.sidebar_open = persisted.sidebar_open;
        state.ui_settings.show_stats = persisted.show_stats;
        state.ui_settings.tiles_provider = match persisted.tiles_provider.as_str() {
            "OpenTopoMap" => TilesProvider::OpenTopoMap,
            _ => TilesProvider::OpenStreetMap,
        };

        {
            let mut collection = state.collection.write().unwrap();
            collection.set_min_delta(persisted.min_point_delta);
        }

        // Reload queue: persisted files first, then CLI files, skipping
        // anything that no longer exists and deduplicating by canonical path
        let candidates = persisted
            .loaded_file_paths
            .iter()
            .map(std::path::PathBuf::from)
            .chain(cli_args.gpx_files.iter().cloned());

        state.file_loader.pending_files.clear();
        let mut seen = std::collections::HashSet::new();
        for path in candidates {
            if !path.exists() {
                continue;
            }
            let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
            if seen.insert(canonical) {
                state.file_loader.pending_files.push(path);
            }
        }

        state
    }

    /// Centre the map on the bounding region of the loaded data, or on the
    /// configured fallback viewport when the region is empty.
    fn fit_to_bounds(&mut self) {
        // try_read keeps the UI thread from blocking on a loading write
        let bounds = match self.state.collection.try_read() {
            Ok(collection) => collection.bounds(),
            Err(_) => return,
        };

        if let Some(bounds) = bounds {
            let (center_lat, center_lon) = bounds.center();
            let max_span = bounds.lat_span().max(bounds.lon_span());

            let zoom = if max_span > 0.0 {
                let zoom_estimate = (4.0 * 360.0 / max_span).log2() as f32;
                (zoom_estimate - 0.5).clamp(1.0, 18.0)
            } else {
                // A single point has no span to derive a zoom from
                12.0
            };

            self.map_memory
                .center_at(walkers::lat_lon(center_lat, center_lon));
            let _ = self.map_memory.set_zoom(zoom as f64);

            tracing::trace!(
                min_lat = bounds.min_lat,
                min_lon = bounds.min_lon,
                max_lat = bounds.max_lat,
                max_lon = bounds.max_lon,
                zoom,
                "viewport fitted to data"
            );
        } else {
            let (lat, lon) = self.state.ui_settings.default_center;
            self.map_memory.center_at(walkers::lat_lon(lat, lon));
            let _ = self.map_memory.set_zoom(self.state.ui_settings.default_zoom);

            tracing::trace!("no data, fallback viewport");
        }
    }

    /// Pan the map to a waypoint (after keyboard navigation)
    fn center_on_waypoint(&mut self, index: usize) {
        let position = {
            let collection = match self.state.collection.try_read() {
                Ok(collection) => collection,
                Err(_) => return,
            };
            collection.waypoint(index).map(|w| (w.lat(), w.lon()))
        };

        if let Some((lat, lon)) = position
            && lat.is_finite()
            && lon.is_finite()
        {
            self.map_memory.center_at(walkers::lat_lon(lat, lon));
        }
    }

    /// After a batch of loads completes: fit the viewport and show the
    /// keyboard hint if there are waypoints to cycle through.
    fn on_loads_finished(&mut self) {
        if !self.state.file_loader.loaded_files.is_empty() {
            self.state.pending_fit_bounds = true;
        }
        if self.state.stats.waypoint_count > 0 && self.state.nav_hint_shown_at.is_none() {
            self.state.show_navigation_hint();
        }
    }

    /// Keyboard shortcuts: help, popup navigation, popup dismissal
    fn handle_keyboard(&mut self, ctx: &egui::Context) {
        let mut select_next = false;
        let mut select_prev = false;
        let mut close_popup = false;

        ctx.input(|i| {
            if i.key_pressed(egui::Key::F1) {
                self.show_help = !self.show_help;
            }
            if i.key_pressed(egui::Key::H) && i.modifiers.ctrl {
                self.show_help = !self.show_help;
            }

            select_next = i.key_pressed(egui::Key::PageUp);
            select_prev = i.key_pressed(egui::Key::PageDown);
            close_popup = i.key_pressed(egui::Key::Escape);
        });

        if select_next && let Some(index) = self.state.select_next_waypoint() {
            self.center_on_waypoint(index);
        }
        if select_prev && let Some(index) = self.state.select_prev_waypoint() {
            self.center_on_waypoint(index);
        }
        if close_popup {
            self.state.selected_waypoint = None;
        }
    }

    /// Show the popup window for the selected waypoint, if any
    fn show_waypoint_popup(&mut self, ctx: &egui::Context) {
        let Some(index) = self.state.selected_waypoint else {
            return;
        };

        let (waypoint, count) = {
            let collection = match self.state.collection.try_read() {
                Ok(collection) => collection,
                Err(_) => return,
            };
            (
                collection.waypoint(index).cloned(),
                collection.waypoint_count(),
            )
        };

        let Some(waypoint) = waypoint else {
            // Selection outlived the data (e.g. after a file was removed).
            self.state.selected_waypoint = None;
            return;
        };

        let screen_pos = self
            .feedback
            .try_read()
            .ok()
            .and_then(|feedback| feedback.selected_screen_pos);

        if !ui_panels::waypoint_popup(ctx, &waypoint, screen_pos, index, count) {
            self.state.selected_waypoint = None;
        }
    }
}

impl eframe::App for GpxViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_keyboard(ctx);

        if self.state.pending_fit_bounds {
            self.state.pending_fit_bounds = false;
            self.fit_to_bounds();
        }

        // Polyline rebuild deferred from a threshold slider change
        self.state.process_pending_reload();

        ui_panels::handle_drag_and_drop(ctx, &mut self.state);
        ui_panels::show_file_picker(&mut self.state);

        if self.show_help {
            ui_panels::help_overlay(ctx, &mut self.show_help);
        }

        if self.state.ui_settings.sidebar_open {
            egui::SidePanel::right("sidebar")
                .default_width(300.0)
                .min_width(260.0)
                .resizable(true)
                .show(ctx, |ui| {
                    egui::ScrollArea::vertical()
                        .auto_shrink([false, false])
                        .show(ui, |ui| {
                            ui_panels::file_management_panel(ui, &mut self.state);
                            ui.add_space(8.0);
                            ui.separator();
                            if self.state.ui_settings.show_stats {
                                ui_panels::statistics_panel(ui, &self.state);
                                ui.add_space(8.0);
                                ui.separator();
                            }
                            ui_panels::settings_panel(ui, &mut self.state);
                        });
                });
        }

        // Cloned out of self so the panel closure can borrow self mutably
        let collection = self.state.collection.clone();
        let track_colour = self.state.ui_settings.track_colour;
        let line_width = self.state.ui_settings.line_width;
        let tiles_provider = self.state.ui_settings.tiles_provider;
        let attribution_text = tiles_provider.attribution();
        let selected_waypoint = self.state.selected_waypoint;
        let feedback = self.feedback.clone();

        // The map fills everything the sidebar leaves free
        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                profiling::scope!("map_panel");

                let map_plugin = GpxMapPlugin::new(
                    collection,
                    track_colour,
                    line_width,
                    selected_waypoint,
                    feedback,
                );

                let render_start = std::time::Instant::now();

                let tiles: &mut HttpTiles = match tiles_provider {
                    TilesProvider::OpenStreetMap => &mut self.tiles_osm,
                    TilesProvider::OpenTopoMap => &mut self.tiles_otm,
                };

                let (default_lat, default_lon) = self.state.ui_settings.default_center;
                let map = Map::new(
                    Some(tiles),
                    &mut self.map_memory,
                    walkers::lat_lon(default_lat, default_lon),
                )
                .with_plugin(map_plugin);

                ui.add(map);

                self.state.stats.last_render_time_ms =
                    render_start.elapsed().as_secs_f64() * 1000.0;

                ui_panels::sidebar_toggle_button(ui, &mut self.state);

                let painter = ui.painter();
                let screen_rect = ui.max_rect();
                painter.text(
                    screen_rect.center_bottom() + egui::vec2(0.0, -5.0),
                    egui::Align2::CENTER_BOTTOM,
                    attribution_text,
                    egui::FontId::proportional(10.0),
                    egui::Color32::from_black_alpha(180),
                );

                if self.state.show_nav_hint {
                    if self.state.should_hide_nav_hint() {
                        self.state.show_nav_hint = false;
                    } else {
                        ui_panels::navigation_hint(ui, &mut self.state);
                        ctx.request_repaint();
                    }
                }
            });

        // A click on a marker selects it and opens its popup
        if let Ok(frame_feedback) = self.feedback.try_read()
            && let Some(clicked) = frame_feedback.clicked_waypoint
        {
            self.state.selected_waypoint = Some(clicked);
        }

        self.show_waypoint_popup(ctx);

        // Initial CLI/persisted files load in one parallel batch
        if !self.started_initial_batch_load {
            self.started_initial_batch_load = true;
            if !self.state.file_loader.pending_files.is_empty() {
                self.state.load_pending_batch();
                self.on_loads_finished();
                ctx.request_repaint();
            }
        }

        // Interactive loads (picker, drag and drop) go one file per frame
        if self.state.file_loader.is_busy() {
            self.state.process_pending_files();
            self.was_loading = true;
            ctx.request_repaint();
        } else if self.was_loading {
            self.was_loading = false;
            self.on_loads_finished();
            ctx.request_repaint();
        }
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        // Record loaded, queued and in-flight files alike, so closing the
        // app mid-load loses nothing on the next start
        let loader = &self.state.file_loader;
        let mut file_paths: Vec<String> = Vec::new();
        let loaded = loader.loaded_files.iter().map(|(path, _)| path);
        for path in loaded
            .chain(loader.pending_files.iter())
            .chain(loader.loading_file.iter())
        {
            let path_str = path.to_string_lossy().to_string();
            if !file_paths.contains(&path_str) {
                file_paths.push(path_str);
            }
        }

        let persisted = PersistedSettings {
            track_colour: settings::format_hex_colour(self.state.ui_settings.track_colour),
            line_width: self.state.ui_settings.line_width,
            min_point_delta: self.state.ui_settings.min_point_delta,
            sidebar_open: self.state.ui_settings.sidebar_open,
            show_stats: self.state.ui_settings.show_stats,
            tiles_provider: format!("{:?}", self.state.ui_settings.tiles_provider),
            loaded_file_paths: file_paths,
        };

        if let Ok(json) = serde_json::to_string(&persisted) {
            storage.set_string(Self::STORAGE_KEY, json);
            tracing::debug!("settings saved");
        }
    }
}
