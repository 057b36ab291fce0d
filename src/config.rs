use crate::scale::ORANGES_9;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub scale: ScaleConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub education: String, // URL or local path
    pub counties: String,  // URL or local path, TopoJSON
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub on_missing: MissingPolicy,
    #[serde(default = "default_fallback_color")]
    pub fallback_color: String,
}

/// What to do with a county that has no education record.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MissingPolicy {
    #[default]
    Abort,
    Skip,
    Fallback,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScaleConfig {
    #[serde(default = "default_intervals")]
    pub intervals: usize,
    #[serde(default = "default_palette")]
    pub palette: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
    #[serde(default = "default_geojson_path")]
    pub geojson: PathBuf,
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(default = "default_height")]
    pub height: f64,
    #[serde(default = "default_padding")]
    pub padding: f64,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_description")]
    pub description: String,
    /// Scale the geometry into the viewport instead of drawing it as-is.
    #[serde(default)]
    pub fit_to_viewport: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_fallback_color() -> String {
    "#cccccc".to_string()
}

fn default_intervals() -> usize {
    8
}

fn default_palette() -> Vec<String> {
    ORANGES_9.iter().map(|c| c.to_string()).collect()
}

fn default_output_path() -> PathBuf {
    PathBuf::from("output/index.html")
}

fn default_geojson_path() -> PathBuf {
    PathBuf::from("output/counties.geojson")
}

fn default_width() -> f64 {
    1024.0
}

fn default_height() -> f64 {
    500.0
}

fn default_padding() -> f64 {
    80.0
}

fn default_title() -> String {
    "USA Educational Data".to_string()
}

fn default_description() -> String {
    "Percentage of adults age 25 and older with a bachelor's degree or higher (2010-2014)".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            intervals: default_intervals(),
            palette: default_palette(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            geojson: default_geojson_path(),
            width: default_width(),
            height: default_height(),
            padding: default_padding(),
            title: default_title(),
            description: default_description(),
            fit_to_viewport: false,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: default_port() }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)
            .with_context(|| "Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let needed = self.scale.intervals + 1;
        if self.scale.palette.len() < needed {
            bail!(
                "scale.palette has {} colors, {} intervals need {}",
                self.scale.palette.len(),
                self.scale.intervals,
                needed
            );
        }
        if self.output.width <= 0.0 || self.output.height <= 0.0 {
            bail!("output.width and output.height must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [input]
            education = "data/education.json"
            counties = "https://example.com/counties.json"
            "#,
        )
        .unwrap();

        assert_eq!(config.input.on_missing, MissingPolicy::Abort);
        assert_eq!(config.input.timeout_secs, 60);
        assert_eq!(config.scale.intervals, 8);
        assert_eq!(config.scale.palette.len(), 9);
        assert_eq!(config.output.width, 1024.0);
        assert_eq!(config.output.path, PathBuf::from("output/index.html"));
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn missing_policy_parses_lowercase() {
        let config = AppConfig::from_toml_str(
            r##"
            [input]
            education = "a.json"
            counties = "b.json"
            on_missing = "fallback"
            fallback_color = "#000000"
            "##,
        )
        .unwrap();
        assert_eq!(config.input.on_missing, MissingPolicy::Fallback);
        assert_eq!(config.input.fallback_color, "#000000");
    }

    #[test]
    fn palette_shorter_than_buckets_is_rejected() {
        let err = AppConfig::from_toml_str(
            r##"
            [input]
            education = "a.json"
            counties = "b.json"

            [scale]
            intervals = 4
            palette = ["#ffffff", "#000000"]
            "##,
        )
        .unwrap_err();
        assert!(err.to_string().contains("palette"));
    }

    #[test]
    fn input_section_is_required() {
        assert!(AppConfig::from_toml_str("[output]\nwidth = 10.0\n").is_err());
    }
}
