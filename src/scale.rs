//! Color quantization: sequential palettes, the equal-width threshold scale
//! that colors counties, and the linear scale that lays out the legend.

use crate::config::PaletteConfig;
use anyhow::{anyhow, ensure, Result};

// ColorBrewer 9-class sequential schemes, lightest first.
const GREENS: [&str; 9] = [
    "#f7fcf5", "#e5f5e0", "#c7e9c0", "#a1d99b", "#74c476", "#41ab5d", "#238b45", "#006d2c", "#00441b",
];
const BLUES: [&str; 9] = [
    "#f7fbff", "#deebf7", "#c6dbef", "#9ecae1", "#6baed6", "#4292c6", "#2171b5", "#08519c", "#08306b",
];
const ORANGES: [&str; 9] = [
    "#fff5eb", "#fee6ce", "#fdd0a2", "#fdae6b", "#fd8d3c", "#f16913", "#d94801", "#a63603", "#7f2704",
];
const PURPLES: [&str; 9] = [
    "#fcfbfd", "#efedf5", "#dadaeb", "#bcbddc", "#9e9ac8", "#807dba", "#6a51a3", "#54278f", "#3f007d",
];
const REDS: [&str; 9] = [
    "#fff5f0", "#fee0d2", "#fcbba1", "#fc9272", "#fb6a4a", "#ef3b2c", "#cb181d", "#a50f15", "#67000d",
];
const GREYS: [&str; 9] = [
    "#ffffff", "#f0f0f0", "#d9d9d9", "#bdbdbd", "#969696", "#737373", "#525252", "#252525", "#000000",
];

pub fn scheme(name: &str) -> Result<&'static [&'static str; 9]> {
    match name.trim().to_ascii_lowercase().as_str() {
        "greens" => Ok(&GREENS),
        "blues" => Ok(&BLUES),
        "oranges" => Ok(&ORANGES),
        "purples" => Ok(&PURPLES),
        "reds" => Ok(&REDS),
        "greys" | "grays" => Ok(&GREYS),
        other => Err(anyhow!("Unknown color scheme: {}", other)),
    }
}

/// Resolves the configured palette and drops `trim` shades from each end.
pub fn palette(config: &PaletteConfig) -> Result<Vec<String>> {
    let full: Vec<String> = match &config.colors {
        Some(colors) => colors.clone(),
        None => scheme(&config.scheme)?.iter().map(|c| c.to_string()).collect(),
    };
    ensure!(
        full.len() > 2 * config.trim,
        "Palette of {} colors cannot be trimmed by {} on each end",
        full.len(),
        config.trim
    );
    Ok(full[config.trim..full.len() - config.trim].to_vec())
}

/// One bucket of a [`ThresholdScale`]: values in `[lower, upper)` get `color`
/// (the last bucket also includes `upper`).
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket<'a> {
    pub lower: f64,
    pub upper: f64,
    pub color: &'a str,
}

/// Step function over `[min, max]` split into `colors.len()` equal-width buckets.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdScale {
    min: f64,
    max: f64,
    thresholds: Vec<f64>,
    colors: Vec<String>,
}

impl ThresholdScale {
    pub fn evenly_spaced(min: f64, max: f64, colors: Vec<String>) -> Result<Self> {
        ensure!(!colors.is_empty(), "Threshold scale needs at least one color");
        let count = colors.len();
        let step = (max - min) / count as f64;
        let thresholds = (1..count).map(|i| min + step * i as f64).collect();
        Ok(Self {
            min,
            max,
            thresholds,
            colors,
        })
    }

    pub fn from_values(values: &[f64], colors: Vec<String>) -> Result<Self> {
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        ensure!(
            min.is_finite() && max.is_finite(),
            "Cannot derive a color domain from {} values",
            values.len()
        );
        Self::evenly_spaced(min, max, colors)
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    pub fn colors(&self) -> &[String] {
        &self.colors
    }

    pub fn bucket_index(&self, value: f64) -> usize {
        self.thresholds.partition_point(|t| *t <= value)
    }

    pub fn color_for(&self, value: f64) -> &str {
        &self.colors[self.bucket_index(value)]
    }

    /// Value range of the first bucket painted `color`, with the open ends
    /// closed by the domain min and max.
    pub fn invert_extent(&self, color: &str) -> Option<(f64, f64)> {
        let index = self.colors.iter().position(|c| c == color)?;
        Some(self.extent(index))
    }

    fn extent(&self, index: usize) -> (f64, f64) {
        let lower = index
            .checked_sub(1)
            .and_then(|i| self.thresholds.get(i))
            .copied()
            .unwrap_or(self.min);
        let upper = self.thresholds.get(index).copied().unwrap_or(self.max);
        (lower, upper)
    }

    pub fn buckets(&self) -> impl Iterator<Item = Bucket<'_>> + '_ {
        self.colors.iter().enumerate().map(|(i, color)| {
            let (lower, upper) = self.extent(i);
            Bucket {
                lower,
                upper,
                color: color.as_str(),
            }
        })
    }
}

/// Affine map from a value domain onto a pixel range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn map(&self, value: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if d1 == d0 {
            return (r0 + r1) / 2.0;
        }
        r0 + (value - d0) / (d1 - d0) * (r1 - r0)
    }
}

/// Whole-number percentage label, e.g. `12.9` -> `"13%"`. Halves round away
/// from zero, so `12.5` is `"13%"`.
pub fn format_percent(value: f64) -> String {
    format!("{:.0}%", value.round())
}
