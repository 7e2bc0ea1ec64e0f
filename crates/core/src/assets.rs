use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};

static DEFAULT_DATA_DIR: Lazy<PathBuf> = Lazy::new(|| {
    dirs::data_local_dir()
        .map(|p| p.join("zuschat"))
        .unwrap_or_else(|| PathBuf::from("~/.local/share/zuschat"))
});

// Fallback only, get_config_dir checks XDG_CONFIG_HOME first
static DEFAULT_CONFIG_DIR: Lazy<PathBuf> = Lazy::new(|| {
    dirs::config_dir()
        .map(|p| p.join("zuschat"))
        .unwrap_or_else(|| PathBuf::from("~/.config/zuschat"))
});

/// `$<var>/zuschat` when the variable is set and non-empty, `fallback` otherwise.
fn xdg_app_dir(var: &str, fallback: &Path) -> PathBuf {
    match std::env::var_os(var) {
        Some(base) if !base.is_empty() => PathBuf::from(base).join("zuschat"),
        _ => fallback.to_path_buf(),
    }
}

pub fn get_config_dir() -> PathBuf {
    xdg_app_dir("XDG_CONFIG_HOME", &DEFAULT_CONFIG_DIR)
}

/// Directory holding the log file and the persisted chat state. Created on demand.
pub fn get_data_dir() -> std::io::Result<PathBuf> {
    let path = xdg_app_dir("XDG_DATA_HOME", &DEFAULT_DATA_DIR);
    std::fs::create_dir_all(&path)?;
    Ok(path)
}

pub fn get_default_config() -> String {
    include_str!("../data/config.yml").to_string()
}
