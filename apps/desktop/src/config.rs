use std::collections::HashMap;
use std::fs;

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_base_url: String,
    /// External basemap style consumed read-only for rendering context.
    pub style_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000/api".into(),
            style_url: "https://basemaps.cartocdn.com/gl/dark-matter-gl-style/style.json".into(),
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("aquagrid.toml") {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("api_base_url") {
                settings.api_base_url = v.clone();
            }
            if let Some(v) = file_cfg.get("style_url") {
                settings.style_url = v.clone();
            }
        }
    }

    if let Ok(v) = std::env::var("AQUAGRID__API_BASE_URL") {
        settings.api_base_url = v;
    }
    if let Ok(v) = std::env::var("AQUAGRID__STYLE_URL") {
        settings.style_url = v;
    }

    settings
}
