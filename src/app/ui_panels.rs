//! Sidebar panels, the waypoint popup and map overlays

use crate::app::state::{AppState, TilesProvider};
use egui::{Color32, RichText, Ui};
use gpx_viewer::data::GeoPoint;

/// Settings: track appearance, culling threshold, tile provider
pub fn settings_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Settings");
    ui.separator();

    ui.collapsing("Display", |ui| {
        ui.label("Track Appearance");
        ui.add_space(4.0);

        ui.horizontal(|ui| {
            ui.label("Line Width:");
            ui.add(
                egui::Slider::new(&mut state.ui_settings.line_width, 0.5..=10.0)
                    .suffix(" px")
                    .step_by(0.5),
            );
        });

        ui.horizontal(|ui| {
            ui.label("Track Colour:");
            ui.color_edit_button_srgba(&mut state.ui_settings.track_colour);
        });

        ui.add_space(8.0);
    });

    ui.collapsing("Point Culling", |ui| {
        ui.label("Minimum Point Delta (degrees)");
        ui.add_space(4.0);

        let mut min_delta = state.ui_settings.min_point_delta;
        let changed = ui
            .add(
                egui::Slider::new(&mut min_delta, 0.0..=0.01)
                    .logarithmic(true)
                    .custom_formatter(|v, _| format!("{:.5}", v)),
            )
            .changed();

        if changed {
            state.update_min_delta(min_delta);
        }

        ui.add_space(4.0);
        ui.label(
            RichText::new("Points closer together than this are culled from the rendered lines")
                .small()
                .weak(),
        );

        if state.pending_reload {
            ui.label(
                RichText::new("⏳ Re-culling track points...")
                    .small()
                    .color(ui.visuals().warn_fg_color),
            );
        }

        ui.add_space(8.0);
    });

    ui.collapsing("Map Tiles", |ui| {
        ui.label("Select Tile Provider");
        ui.add_space(4.0);

        for provider in TilesProvider::ALL {
            let selected = state.ui_settings.tiles_provider == provider;
            if ui.selectable_label(selected, provider.name()).clicked() {
                state.ui_settings.tiles_provider = provider;
            }
        }

        ui.add_space(4.0);
        ui.label(
            RichText::new(state.ui_settings.tiles_provider.attribution())
                .small()
                .italics(),
        );

        ui.add_space(8.0);
    });

    ui.separator();

    ui.collapsing("Panels", |ui| {
        ui.checkbox(&mut state.ui_settings.show_stats, "Show Statistics");
    });
}

/// Statistics: counts, point reduction, distance, render time
pub fn statistics_panel(ui: &mut Ui, state: &AppState) {
    ui.heading("Statistics");
    ui.separator();

    egui::Grid::new("statistics")
        .num_columns(2)
        .spacing([12.0, 4.0])
        .show(ui, |ui| {
            ui.label("Files:");
            ui.label(RichText::new(format!("{}", state.stats.document_count)).strong());
            ui.end_row();

            ui.label("Tracks:");
            ui.label(RichText::new(format!("{}", state.stats.track_count)).strong());
            ui.end_row();

            ui.label("Routes:");
            ui.label(RichText::new(format!("{}", state.stats.route_count)).strong());
            ui.end_row();

            ui.label("Waypoints:");
            ui.label(RichText::new(format!("{}", state.stats.waypoint_count)).strong());
            ui.end_row();

            ui.label("Total Points:");
            ui.label(RichText::new(state.stats.format_points()).strong());
            ui.end_row();

            ui.label("Points Rendered:");
            ui.label(RichText::new(state.stats.format_rendered_points()).strong());
            ui.end_row();

            ui.label("Track Distance:");
            ui.label(RichText::new(state.stats.format_distance()).strong());
            ui.end_row();

            if state.stats.last_render_time_ms > 0.0 {
                ui.label("Last Render:");
                let colour = if state.stats.last_render_time_ms < 16.0 {
                    Color32::GREEN
                } else if state.stats.last_render_time_ms < 100.0 {
                    Color32::YELLOW
                } else {
                    Color32::RED
                };
                ui.label(
                    RichText::new(format!("{:.1} ms", state.stats.last_render_time_ms))
                        .color(colour),
                );
                ui.end_row();
            }
        });
}

/// Files: picker, loading progress, loaded list, error list
pub fn file_management_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Files");
    ui.separator();

    ui.horizontal(|ui| {
        if ui.button("📂 Open GPX...").clicked() {
            state.file_loader.show_picker = true;
        }

        if ui.button("🎯 Zoom to Data").clicked() {
            state.pending_fit_bounds = true;
        }

        if ui.button("🗑 Remove All").clicked() {
            state.clear_documents();
        }
    });

    ui.add_space(8.0);

    // Loading progress
    if state.file_loader.is_busy() {
        ui.separator();
        ui.label(
            RichText::new("⏳ Loading...")
                .strong()
                .color(ui.visuals().warn_fg_color),
        );

        if let Some(ref loading) = state.file_loader.loading_file {
            ui.label(
                RichText::new(format!(
                    "Current: {}",
                    loading.file_name().unwrap_or_default().to_string_lossy()
                ))
                .small(),
            );
        }

        let total =
            state.file_loader.loaded_files.len() + state.file_loader.pending_files.len() + 1;
        let progress = state.file_loader.progress(total);
        ui.add(egui::ProgressBar::new(progress).show_percentage());

        ui.add_space(8.0);
    }

    // Loaded files list
    if !state.file_loader.loaded_files.is_empty() {
        ui.separator();
        ui.label(
            RichText::new(format!(
                "✓ Loaded ({} files)",
                state.file_loader.loaded_files.len()
            ))
            .strong()
            .color(Color32::GREEN),
        );
        ui.add_space(4.0);

        let mut to_remove = None;

        egui::ScrollArea::vertical()
            .id_salt("loaded_list")
            .max_height(150.0)
            .show(ui, |ui| {
                for (idx, (path, _)) in state.file_loader.loaded_files.iter().enumerate() {
                    ui.horizontal(|ui| {
                        ui.label(
                            RichText::new(format!(
                                "📄 {}",
                                path.file_name().unwrap_or_default().to_string_lossy()
                            ))
                            .small(),
                        );
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.small_button("🗑").clicked() {
                                to_remove = Some(idx);
                            }
                        });
                    });
                }
            });

        if let Some(idx) = to_remove {
            state.remove_file(idx);
        }
    }

    // Error list
    if !state.file_loader.errors.is_empty() {
        ui.separator();
        ui.label(
            RichText::new(format!("⚠ Failed to load ({})", state.file_loader.errors.len()))
                .strong()
                .color(Color32::RED),
        );
        ui.add_space(4.0);

        egui::ScrollArea::vertical()
            .id_salt("error_list")
            .max_height(100.0)
            .show(ui, |ui| {
                for (file, error) in &state.file_loader.errors {
                    ui.label(
                        RichText::new(format!(
                            "• {}: {}",
                            file.file_name().unwrap_or_default().to_string_lossy(),
                            error
                        ))
                        .small()
                        .color(Color32::RED),
                    );
                }
            });

        ui.add_space(4.0);
        if ui.button("Clear Errors").clicked() {
            state.file_loader.errors.clear();
        }
    }
}

/// Sidebar toggle button floating over the top-right corner of the map
pub fn sidebar_toggle_button(ui: &mut Ui, state: &mut AppState) {
    const SIZE: f32 = 40.0;
    const MARGIN: f32 = 10.0;

    let corner = ui.max_rect().right_top();
    let button_rect = egui::Rect::from_min_size(
        corner + egui::vec2(-SIZE - MARGIN, MARGIN),
        egui::vec2(SIZE, SIZE),
    );

    let response = ui.allocate_rect(button_rect, egui::Sense::click());
    if response.clicked() {
        state.ui_settings.sidebar_open = !state.ui_settings.sidebar_open;
    }

    let widgets = &ui.visuals().widgets;
    let fill = if response.hovered() {
        widgets.hovered.bg_fill
    } else {
        widgets.inactive.bg_fill
    };
    ui.painter().rect_filled(button_rect, 5.0, fill);

    let icon = if state.ui_settings.sidebar_open { "✕" } else { "☰" };
    ui.painter().text(
        button_rect.center(),
        egui::Align2::CENTER_CENTER,
        icon,
        egui::FontId::proportional(20.0),
        ui.visuals().text_color(),
    );
}

/// Popup window for the selected waypoint, anchored next to its marker.
///
/// Shows the rich payload opaquely when the point carries one, otherwise the
/// attribute and child lines assembled by the data layer. Returns `false`
/// when the popup asked to close.
pub fn waypoint_popup(
    ctx: &egui::Context,
    waypoint: &GeoPoint,
    screen_pos: Option<egui::Pos2>,
    index: usize,
    count: usize,
) -> bool {
    let mut open = true;

    let mut window = egui::Window::new(RichText::new(waypoint.popup_title()).strong())
        .id(egui::Id::new("waypoint_popup"))
        .collapsible(false)
        .resizable(false)
        .default_width(260.0);

    if let Some(pos) = screen_pos {
        window = window.fixed_pos(pos + egui::vec2(12.0, -12.0));
    }

    window.show(ctx, |ui| {
        if let Some(html) = waypoint.html() {
            ui.label(RichText::new(html).monospace().small());
        } else {
            for line in waypoint.popup_lines() {
                ui.label(RichText::new(line).small());
            }
        }

        if waypoint.marker().has_image() {
            ui.label(RichText::new("📷 Image available").small().weak());
        }
        if waypoint.marker().has_feature() {
            ui.label(RichText::new("★ Notable feature").small().weak());
        }

        ui.separator();
        ui.horizontal(|ui| {
            ui.label(
                RichText::new(format!("{} / {}", index + 1, count))
                    .small()
                    .weak(),
            );
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.small_button("Close").clicked() {
                    open = false;
                }
            });
        });
        ui.label(
            RichText::new("Page Up / Page Down switch waypoints")
                .small()
                .weak(),
        );
    });

    open
}

/// Help window listing mouse and keyboard controls
pub fn help_overlay(ctx: &egui::Context, show: &mut bool) {
    egui::Window::new("Help")
        .open(show)
        .collapsible(false)
        .resizable(true)
        .default_width(400.0)
        .show(ctx, |ui| {
            ui.heading("GPX Viewer");
            ui.separator();

            ui.label("An interactive map viewer for GPX tracks, routes and waypoints.");
            ui.add_space(8.0);

            ui.label(RichText::new("🖱 Map Controls").strong());
            ui.label("• Left drag: Pan the map");
            ui.label("• Mouse wheel: Zoom in/out");
            ui.label("• Double click: Zoom in");
            ui.label("• Click a marker: Open its popup");
            ui.add_space(8.0);

            ui.label(RichText::new("⌨ Keyboard").strong());
            ui.label("• Page Up: Next waypoint popup");
            ui.label("• Page Down: Previous waypoint popup");
            ui.label("• Escape: Close the popup");
            ui.add_space(8.0);

            ui.label(RichText::new("📂 Loading Files").strong());
            ui.label("• Click 'Open GPX' to add data");
            ui.label("• Or drop GPX files onto the window");
            ui.add_space(8.0);

            ui.label(RichText::new("⚙ Settings").strong());
            ui.label("• Change track colour and line width");
            ui.label("• Adjust the point culling threshold");
            ui.label("• Select different map tile providers");
            ui.add_space(8.0);

            ui.separator();
            ui.label(
                RichText::new("Press F1 to toggle this help")
                    .small()
                    .italics(),
            );
        });
}

/// Show the fading keyboard navigation hint over the map
pub fn navigation_hint(ui: &mut Ui, state: &mut AppState) {
    let alpha = state.nav_hint_alpha();
    if alpha <= 0.0 {
        return;
    }

    let rect = ui.max_rect();
    let hint_size = egui::vec2(420.0, 40.0);
    let hint_pos = egui::pos2(
        rect.center().x - hint_size.x / 2.0,
        rect.top() + 20.0,
    );
    let hint_rect = egui::Rect::from_min_size(hint_pos, hint_size);

    let bg_alpha = (180.0 * alpha) as u8;
    ui.painter()
        .rect_filled(hint_rect, 10.0, Color32::from_black_alpha(bg_alpha));

    let text_alpha = (255.0 * alpha) as u8;
    ui.painter().text(
        hint_rect.center(),
        egui::Align2::CENTER_CENTER,
        "Use Page Up and Page Down to switch between waypoint popups",
        egui::FontId::proportional(15.0),
        Color32::from_white_alpha(text_alpha),
    );
}

/// Open the native file picker when the Files panel asked for it
#[cfg(not(target_arch = "wasm32"))]
pub fn show_file_picker(state: &mut AppState) {
    if !state.file_loader.show_picker {
        return;
    }
    state.file_loader.show_picker = false;

    let picked = rfd::FileDialog::new()
        .add_filter("GPX Files", &["gpx"])
        .add_filter("All Files", &["*"])
        .pick_files();

    for path in picked.unwrap_or_default() {
        state.queue_file(path);
    }
}

/// Queue dropped .gpx files and paint an overlay while files hover
pub fn handle_drag_and_drop(ctx: &egui::Context, state: &mut AppState) {
    let dropped: Vec<_> = ctx.input(|i| i.raw.dropped_files.clone());
    for file in dropped {
        if let Some(path) = file.path
            && path.extension().map(|e| e == "gpx").unwrap_or(false)
        {
            state.queue_file(path);
        }
    }

    if ctx.input(|i| !i.raw.hovered_files.is_empty()) {
        let painter = ctx.layer_painter(egui::LayerId::new(
            egui::Order::Foreground,
            egui::Id::new("drop_overlay"),
        ));
        let center = ctx.content_rect().center();
        let banner = egui::Rect::from_center_size(center, egui::vec2(340.0, 80.0));
        painter.rect_filled(banner, 16.0, egui::Color32::from_black_alpha(180));
        painter.text(
            center,
            egui::Align2::CENTER_CENTER,
            "📂 Drop to load GPX",
            egui::FontId::proportional(32.0),
            egui::Color32::WHITE,
        );
    }
}
