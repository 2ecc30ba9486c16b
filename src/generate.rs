use crate::config::AppConfig;
use crate::data;
use crate::render::{self, Choropleth, Page};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{error, info};

/// Renders the header, then loads both datasets and draws the map. On a load
/// or render failure the page keeps only its header.
pub async fn build_page(config: &AppConfig) -> (Page, Result<Choropleth>) {
    let mut page = Page::new(&config.render);
    let container = page.container;

    let result = match data::load_data(config).await {
        Ok(datasets) => render::render(&mut page.doc, container, &datasets, config),
        Err(e) => Err(e),
    };
    if let Err(e) = &result {
        error!("Map was not rendered: {:#}", e);
    }
    (page, result)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create directory: {:?}", dir))?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {:?}", path))
}

pub fn write_outputs(config: &AppConfig, page: &Page) -> Result<()> {
    write_file(&config.output.html, &page.to_html())?;
    info!("Wrote {:?}", config.output.html);

    if let Some(svg_path) = &config.output.svg {
        if let Some(svg) = page.svg_markup() {
            write_file(svg_path, &svg)?;
            info!("Wrote {:?}", svg_path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::TWO_SQUARES;

    const EDUCATION_JSON: &str = r#"[
        {"fips": 1, "state": "AL", "area_name": "A", "bachelorsOrHigher": 10},
        {"fips": 2, "state": "AL", "area_name": "B", "bachelorsOrHigher": 90}
    ]"#;

    fn config_in(dir: &Path) -> AppConfig {
        fs::write(dir.join("education.json"), EDUCATION_JSON).unwrap();
        fs::write(dir.join("counties.json"), TWO_SQUARES).unwrap();

        let mut config = AppConfig::default();
        config.input.education = dir.join("education.json").display().to_string();
        config.input.counties = dir.join("counties.json").display().to_string();
        config.palette.colors = Some(vec!["#aaaaaa".to_string(), "#222222".to_string()]);
        config.palette.trim = 0;
        config.output.html = dir.join("out/index.html");
        config.output.svg = Some(dir.join("out/map.svg"));
        config
    }

    #[tokio::test]
    async fn renders_and_writes_page() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        let (page, result) = build_page(&config).await;
        let map = result.unwrap();
        assert_eq!(map.pairs.len(), 2);
        assert_eq!(page.doc.elements_by_class("county").len(), 2);

        write_outputs(&config, &page).unwrap();
        let html = fs::read_to_string(dir.path().join("out/index.html")).unwrap();
        assert!(html.contains(r##"fill="#222222""##));
        let svg = fs::read_to_string(dir.path().join("out/map.svg")).unwrap();
        assert!(svg.contains("<svg"));
    }

    #[tokio::test]
    async fn failed_education_load_renders_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.input.education = dir.path().join("missing.json").display().to_string();

        let (page, result) = build_page(&config).await;
        assert!(result.is_err());
        assert!(page.doc.elements_by_class("county").is_empty());
        assert!(page.doc.elements_by_tag("svg").is_empty());
        assert!(page.doc.element_by_id("title").is_some());

        write_outputs(&config, &page).unwrap();
        assert!(dir.path().join("out/index.html").exists());
        assert!(!dir.path().join("out/map.svg").exists());
    }
}
