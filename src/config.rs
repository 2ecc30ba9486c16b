use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const EDUCATION_URL: &str =
    "https://cdn.freecodecamp.org/testable-projects-fcc/data/choropleth_map/for_user_education.json";
pub const COUNTIES_URL: &str =
    "https://cdn.freecodecamp.org/testable-projects-fcc/data/choropleth_map/counties.json";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub palette: PaletteConfig,
    pub render: RenderConfig,
    pub output: OutputConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InputConfig {
    pub education: String, // URL or local path
    pub counties: String,  // URL or local path
    pub counties_object: String,
    pub states_object: String,
    pub join: JoinStrategy,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum JoinStrategy {
    #[default]
    Keyed,
    Positional,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PaletteConfig {
    pub scheme: String,
    /// Explicit hex colors, lightest first. Overrides `scheme` when set.
    pub colors: Option<Vec<String>>,
    /// Shades dropped from each end of the palette.
    pub trim: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RenderConfig {
    pub title: String,
    pub description: String,
    pub width: f64,
    pub height: f64,
    pub legend_width: f64,
    pub legend_x: f64,
    pub legend_y: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub html: PathBuf,
    pub svg: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            education: EDUCATION_URL.to_string(),
            counties: COUNTIES_URL.to_string(),
            counties_object: "counties".to_string(),
            states_object: "states".to_string(),
            join: JoinStrategy::default(),
        }
    }
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            scheme: "greens".to_string(),
            colors: None,
            trim: 1,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            title: "United States Educational Attainment".to_string(),
            description: "Percentage of adults age 25 and older with a bachelor's degree or higher (2010-2014)".to_string(),
            width: 975.0,
            height: 610.0,
            legend_width: 400.0,
            legend_x: 600.0,
            legend_y: 20.0,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            html: PathBuf::from("output/index.html"),
            svg: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.input.education, EDUCATION_URL);
        assert_eq!(config.input.join, JoinStrategy::Keyed);
        assert_eq!(config.palette.scheme, "greens");
        assert_eq!(config.palette.trim, 1);
        assert_eq!(config.render.width, 975.0);
        assert_eq!(config.render.height, 610.0);
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn loads_partial_sections_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r##"
[input]
education = "data/education.json"
join = "positional"

[palette]
colors = ["#000000", "#ffffff"]
trim = 0

[server]
port = 8080
"##
        )
        .unwrap();

        let config = AppConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.input.education, "data/education.json");
        assert_eq!(config.input.counties, COUNTIES_URL);
        assert_eq!(config.input.join, JoinStrategy::Positional);
        assert_eq!(config.palette.colors.as_deref().map(<[String]>::len), Some(2));
        assert_eq!(config.palette.trim, 0);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.output.html, PathBuf::from("output/index.html"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = AppConfig::load_from_file(Path::new("does/not/exist.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
