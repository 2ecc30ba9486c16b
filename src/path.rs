//! SVG path data for projected geometry. The county topology is already laid
//! out in view-box units, so coordinates pass through unchanged.

use geo::{LineString, MultiLineString, MultiPolygon};
use std::fmt::Write;

// Rounds to three decimals; adding 0.0 turns -0 into 0.
fn fmt_coord(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0 + 0.0
}

fn write_line(out: &mut String, line: &LineString<f64>, close: bool) {
    for (i, c) in line.coords().enumerate() {
        let cmd = if i == 0 { 'M' } else { 'L' };
        let _ = write!(out, "{}{},{}", cmd, fmt_coord(c.x), fmt_coord(c.y));
    }
    if close && line.0.len() > 1 {
        out.push('Z');
    }
}

pub fn multi_polygon(geometry: &MultiPolygon<f64>) -> String {
    let mut out = String::new();
    for polygon in geometry {
        write_line(&mut out, polygon.exterior(), true);
        for interior in polygon.interiors() {
            write_line(&mut out, interior, true);
        }
    }
    out
}

pub fn multi_line_string(lines: &MultiLineString<f64>) -> String {
    let mut out = String::new();
    for line in lines {
        write_line(&mut out, line, false);
    }
    out
}
