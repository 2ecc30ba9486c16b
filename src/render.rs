use crate::config::{AppConfig, RenderConfig};
use crate::data::Datasets;
use crate::document::{escape, Document, NodeId};
use crate::join;
use crate::path;
use crate::scale::{self, LinearScale, ThresholdScale};
use crate::types::JoinedPair;
use anyhow::{Context, Result};
use rayon::prelude::*;
use tracing::info;

const PAGE_TEMPLATE: &str = include_str!("../templates/index.html");
const HOVER_SCRIPT: &str = include_str!("../templates/hover.js");

const LEGEND_MARGIN: f64 = 30.0;
const LEGEND_TICK_SIZE: f64 = 13.0;

/// The page surface: header plus an empty `#choropleth` container the map is
/// drawn into.
pub struct Page {
    pub doc: Document,
    pub container: NodeId,
    title: String,
}

impl Page {
    pub fn new(config: &RenderConfig) -> Self {
        let mut doc = Document::new("div");
        let root = doc.root();
        doc.set_attr(root, "id", "root");

        let h1 = doc.append(root, "h1");
        doc.set_attr(h1, "id", "title");
        doc.append_text(h1, &config.title);
        doc.append(h1, "br");
        let description = doc.append(h1, "span");
        doc.set_attr(description, "id", "description");
        doc.append_text(description, &config.description);

        let wrapper = doc.append(root, "div");
        doc.set_attr(wrapper, "id", "choroplethWrapper");
        let container = doc.append(wrapper, "div");
        doc.set_attr(container, "id", "choropleth");

        Self {
            doc,
            container,
            title: config.title.clone(),
        }
    }

    pub fn to_html(&self) -> String {
        PAGE_TEMPLATE
            .replace("{{title}}", &escape(&self.title))
            .replace("{{body}}", &self.doc.to_markup(self.doc.root()))
            .replace("{{script}}", HOVER_SCRIPT)
    }

    /// Standalone SVG file contents, once the map has been drawn.
    pub fn svg_markup(&self) -> Option<String> {
        let svg = self.doc.elements_by_tag("svg").into_iter().next()?;
        Some(format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}\n",
            self.doc.to_markup(svg)
        ))
    }
}

/// What a render pass produced, kept for hover lookups.
#[derive(Debug)]
pub struct Choropleth {
    pub scale: ThresholdScale,
    pub legend: LinearScale,
    pub pairs: Vec<JoinedPair>,
    pub svg: NodeId,
}

/// Draws the map, state borders and legend into `container`. Geometry is
/// decoded and the color scale built before the surface is touched, so an
/// error leaves it unchanged.
pub fn render(
    doc: &mut Document,
    container: NodeId,
    datasets: &Datasets,
    config: &AppConfig,
) -> Result<Choropleth> {
    let counties = datasets
        .topology
        .features(&config.input.counties_object)
        .context("Failed to decode county geometry")?;
    let borders = datasets
        .topology
        .interior_mesh(&config.input.states_object)
        .context("Failed to build state border mesh")?;

    let values: Vec<f64> = datasets.education.iter().map(|r| r.bachelors_or_higher).collect();
    let scale = ThresholdScale::from_values(&values, scale::palette(&config.palette)?)?;

    let pairs = join::join(config.input.join, counties, &datasets.education);
    info!(counties = pairs.len(), colors = scale.colors().len(), "Rendering choropleth");

    let r = &config.render;
    let svg = doc.append(container, "svg");
    doc.set_attr(svg, "xmlns", "http://www.w3.org/2000/svg")
        .set_attr(svg, "viewBox", format!("0 0 {} {}", r.width, r.height));

    let paths: Vec<String> = pairs
        .par_iter()
        .map(|pair| path::multi_polygon(&pair.county.geometry))
        .collect();

    let counties_group = doc.append(svg, "g");
    for (pair, d) in pairs.iter().zip(paths) {
        let value = pair.edu.bachelors_or_higher;
        let shape = doc.append(counties_group, "path");
        doc.set_attr(shape, "class", "county")
            .set_attr(shape, "d", d)
            .set_attr(shape, "fill", scale.color_for(value))
            .set_attr(shape, "data-fips", pair.edu.fips.to_string())
            .set_attr(shape, "data-name", pair.edu.area_name.as_str())
            .set_attr(shape, "data-state", pair.edu.state.as_str())
            .set_attr(shape, "data-education", value.to_string());
    }

    let states = doc.append(svg, "path");
    doc.set_attr(states, "class", "states")
        .set_attr(states, "d", path::multi_line_string(&borders))
        .set_attr(states, "fill", "none")
        .set_attr(states, "stroke", "#fff")
        .set_attr(states, "stroke-width", "2px");

    let legend = LinearScale::new(
        scale.domain(),
        (LEGEND_MARGIN, r.legend_width - LEGEND_MARGIN),
    );
    draw_legend(doc, svg, &scale, &legend, r);

    Ok(Choropleth {
        scale,
        legend,
        pairs,
        svg,
    })
}

fn draw_legend(
    doc: &mut Document,
    svg: NodeId,
    scale: &ThresholdScale,
    legend: &LinearScale,
    r: &RenderConfig,
) {
    let group = doc.append(svg, "g");
    doc.set_attr(group, "id", "legend")
        .set_attr(group, "transform", format!("translate({},{})", r.legend_x, r.legend_y))
        .set_attr(group, "fill", "none")
        .set_attr(group, "font-size", "10")
        .set_attr(group, "font-family", "sans-serif")
        .set_attr(group, "text-anchor", "middle");

    let mut first_tick = None;
    for &t in scale.thresholds() {
        let tick = doc.append(group, "g");
        first_tick.get_or_insert(tick);
        doc.set_attr(tick, "class", "tick")
            .set_attr(tick, "transform", format!("translate({},0)", legend.map(t)));
        let line = doc.append(tick, "line");
        doc.set_attr(line, "stroke", "currentColor")
            .set_attr(line, "y2", LEGEND_TICK_SIZE.to_string());
        let label = doc.append(tick, "text");
        doc.set_attr(label, "fill", "currentColor")
            .set_attr(label, "y", (LEGEND_TICK_SIZE + 3.0).to_string())
            .set_attr(label, "dy", "0.71em");
        doc.append_text(label, &scale::format_percent(t));
    }

    // swatches sit behind the ticks
    for bucket in scale.buckets() {
        let x = legend.map(bucket.lower);
        let rect = doc.insert_before(group, "rect", first_tick);
        doc.set_attr(rect, "height", LEGEND_TICK_SIZE.to_string())
            .set_attr(rect, "x", x.to_string())
            .set_attr(rect, "width", (legend.map(bucket.upper) - x).to_string())
            .set_attr(rect, "fill", bucket.color);
    }
}
