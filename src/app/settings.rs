use clap::Parser;
use egui::Color32;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// GPX Viewer - An interactive map viewer for GPX tracks, routes and waypoints
pub struct Settings {
    /// GPX files to load on startup
    #[clap(short, long, value_name = "FILE")]
    pub gpx_files: Vec<PathBuf>,

    /// Track line colour as a hex string
    #[clap(long, default_value = "#ff00ff")]
    pub track_colour: String,

    /// Track line width in pixels
    #[clap(long, default_value = "5.0")]
    pub track_width: f32,

    /// Minimum distance between rendered track points, in degrees.
    /// Points closer than this to the last kept point are culled.
    #[clap(long, default_value = "0.0001")]
    pub min_point_delta: f64,

    /// Fallback map centre latitude, used when the loaded data has no points
    #[clap(long, default_value = "49.327667")]
    pub default_lat: f64,

    /// Fallback map centre longitude, used when the loaded data has no points
    #[clap(long, default_value = "-122.942333")]
    pub default_lon: f64,

    /// Fallback zoom level, used when the loaded data has no points
    #[clap(long, default_value = "14.0")]
    pub default_zoom: f64,

    /// Ignore previously persisted state and start fresh
    #[clap(long, default_value = "false")]
    pub ignore_persisted: bool,
}

impl Settings {
    /// Parse settings from the command line
    pub fn from_cli() -> Self {
        match crate::entrypoints::cli::parse_args::<Settings>() {
            Ok(args) => args,
            Err(e) => e.exit(),
        }
    }

    /// Parse the configured track colour, falling back to the default
    /// magenta when the hex string is malformed.
    pub fn parse_track_colour(&self) -> Color32 {
        parse_hex_colour(&self.track_colour).unwrap_or(Color32::from_rgb(0xff, 0x00, 0xff))
    }
}

/// Parse a `#rrggbb` hex colour string.
pub(crate) fn parse_hex_colour(value: &str) -> Option<Color32> {
    let hex = value.trim().strip_prefix('#').unwrap_or(value.trim());
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color32::from_rgb(r, g, b))
}

/// Format a colour back into the `#rrggbb` form used by the CLI and the
/// persisted settings.
pub(crate) fn format_hex_colour(colour: Color32) -> String {
    format!("#{:02x}{:02x}{:02x}", colour.r(), colour.g(), colour.b())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_colour() {
        assert_eq!(parse_hex_colour("#ff00ff"), Some(Color32::from_rgb(255, 0, 255)));
        assert_eq!(parse_hex_colour("009933"), Some(Color32::from_rgb(0, 153, 51)));
        assert_eq!(parse_hex_colour("#xyzxyz"), None);
        assert_eq!(parse_hex_colour("#fff"), None);
        assert_eq!(parse_hex_colour(""), None);
    }

    #[test]
    fn test_hex_colour_roundtrip() {
        let colour = Color32::from_rgb(0x66, 0xff, 0x66);
        assert_eq!(parse_hex_colour(&format_hex_colour(colour)), Some(colour));
    }
}
