/// Log version info on startup.
pub fn log_version_info() {
    tracing::info!("{}", short_version_info());
}

pub fn short_version_info() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}
