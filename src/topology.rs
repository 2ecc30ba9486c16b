//! County and state geometry from a TopoJSON topology.
//!
//! A topology stores every boundary once as an "arc"; polygons reference arcs
//! by index, with a negative index `!i` meaning arc `i` walked backwards. When
//! a `transform` is present the arc positions are quantized and delta-encoded.
//! Features are converted through `topojson` -> `geojson` -> `geo`; the border
//! mesh walks the arc references directly.

use crate::types::{CountyFeature, Fips};
use anyhow::{anyhow, ensure, Context, Result};
use geo::{Coord, LineString, MultiLineString, MultiPolygon};
use serde::Deserialize;
use std::collections::BTreeMap;
use topojson::{Geometry, TopoJson, Value};

#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "serde_json::Value")]
pub struct Topology {
    inner: topojson::Topology,
}

impl TryFrom<serde_json::Value> for Topology {
    type Error = anyhow::Error;

    fn try_from(json: serde_json::Value) -> Result<Self> {
        let parsed = json
            .to_string()
            .parse::<TopoJson>()
            .map_err(|e| anyhow!("Failed to parse TopoJSON: {:?}", e))?;
        match parsed {
            TopoJson::Topology(mut inner) => {
                absolutize_arcs(&mut inner);
                Ok(Self { inner })
            }
            _ => Err(anyhow!("TopoJSON must be a Topology")),
        }
    }
}

/// Rewrites quantized arcs to absolute positions and drops the transform.
fn absolutize_arcs(topology: &mut topojson::Topology) {
    let Some(t) = topology.transform.take() else {
        return;
    };
    for arc in &mut topology.arcs {
        let (mut x, mut y) = (0.0, 0.0);
        for p in arc.iter_mut() {
            x += p.first().copied().unwrap_or(0.0);
            y += p.get(1).copied().unwrap_or(0.0);
            *p = vec![x * t.scale[0] + t.translate[0], y * t.scale[1] + t.translate[1]];
        }
    }
}

impl Topology {
    pub fn arc_count(&self) -> usize {
        self.inner.arcs.len()
    }

    fn object(&self, name: &str) -> Result<&Geometry> {
        self.inner
            .objects
            .iter()
            .find(|o| o.name == name)
            .map(|o| &o.geometry)
            .ok_or_else(|| anyhow!("Topology has no object named '{}'", name))
    }

    /// Every arc reference of `geometry` with the index of the leaf geometry
    /// it belongs to. Fails on references past the end of the arc table.
    fn arc_refs(&self, geometry: &Geometry) -> Result<Vec<(i64, usize)>> {
        let mut leaves = Vec::new();
        collect_leaves(geometry, &mut leaves);

        let mut refs = Vec::new();
        for (g, leaf) in leaves.iter().enumerate() {
            let raw: Vec<i64> = match &leaf.value {
                Value::LineString(arcs) => arcs.iter().map(|&r| i64::from(r)).collect(),
                Value::MultiLineString(arcs) | Value::Polygon(arcs) => {
                    arcs.iter().flatten().map(|&r| i64::from(r)).collect()
                }
                Value::MultiPolygon(arcs) => arcs.iter().flatten().flatten().map(|&r| i64::from(r)).collect(),
                _ => continue,
            };
            refs.extend(raw.into_iter().map(|r| (r, g)));
        }

        let count = self.arc_count();
        if let Some(&(r, _)) = refs.iter().find(|(r, _)| arc_index(*r) >= count) {
            return Err(anyhow!("Arc index {} out of range ({} arcs)", r, count));
        }
        Ok(refs)
    }

    /// Decodes the polygonal members of the named object into features.
    /// Non-areal members are skipped.
    pub fn features(&self, name: &str) -> Result<Vec<CountyFeature>> {
        let object = self.object(name)?;
        self.arc_refs(object)?;

        let members: Vec<&Geometry> = match &object.value {
            Value::GeometryCollection(geometries) => geometries.iter().collect(),
            _ => vec![object],
        };
        let collection = topojson::to_geojson(&self.inner, name)
            .map_err(|e| anyhow!("Failed to convert topology object '{}': {:?}", name, e))?;
        ensure!(
            collection.features.len() == members.len(),
            "Object '{}' converted to {} features from {} geometries",
            name,
            collection.features.len(),
            members.len()
        );

        let mut features = Vec::with_capacity(members.len());
        for (member, feature) in members.into_iter().zip(collection.features) {
            let geometry = match feature.geometry {
                Some(geo) => {
                    let shape: geo::Geometry<f64> = geo
                        .value
                        .try_into()
                        .map_err(|e| anyhow!("Failed to convert geojson geometry: {:?}", e))?;
                    match shape {
                        geo::Geometry::MultiPolygon(mp) => mp,
                        geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                        _ => continue,
                    }
                }
                None => continue,
            };
            features.push(CountyFeature {
                id: member.id.as_ref().and_then(parse_fips),
                geometry,
            });
        }
        Ok(features)
    }

    /// Arcs of the named object for which `filter(a, b)` holds, where `a` and
    /// `b` are the indices of the first and last member geometry using the arc.
    /// Arcs used by a single geometry get `a == b`.
    pub fn mesh_by<F>(&self, name: &str, filter: F) -> Result<MultiLineString<f64>>
    where
        F: Fn(usize, usize) -> bool,
    {
        let refs = self
            .arc_refs(self.object(name)?)
            .with_context(|| format!("Invalid arcs in object '{}'", name))?;

        // arc index -> (signed reference, geometry index) in encounter order
        let mut geoms_by_arc: BTreeMap<usize, Vec<(i64, usize)>> = BTreeMap::new();
        for (r, g) in refs {
            geoms_by_arc.entry(arc_index(r)).or_default().push((r, g));
        }

        let mut lines = Vec::new();
        for (_, uses) in geoms_by_arc {
            let (Some(&(first_ref, a)), Some(&(_, b))) = (uses.first(), uses.last()) else {
                continue;
            };
            if filter(a, b) {
                lines.push(LineString::new(self.arc_coords(first_ref)));
            }
        }
        Ok(MultiLineString::new(lines))
    }

    /// Boundaries shared by two distinct member geometries, e.g. state borders
    /// without the coastline.
    pub fn interior_mesh(&self, name: &str) -> Result<MultiLineString<f64>> {
        self.mesh_by(name, |a, b| a != b)
    }

    fn arc_coords(&self, r: i64) -> Vec<Coord<f64>> {
        let mut coords: Vec<Coord<f64>> = self.inner.arcs[arc_index(r)]
            .iter()
            .map(|p| Coord {
                x: p.first().copied().unwrap_or(0.0),
                y: p.get(1).copied().unwrap_or(0.0),
            })
            .collect();
        if r < 0 {
            coords.reverse();
        }
        coords
    }
}

fn collect_leaves<'a>(geometry: &'a Geometry, out: &mut Vec<&'a Geometry>) {
    match &geometry.value {
        Value::GeometryCollection(geometries) => {
            for child in geometries {
                collect_leaves(child, out);
            }
        }
        _ => out.push(geometry),
    }
}

fn arc_index(r: i64) -> usize {
    if r < 0 {
        !r as usize
    } else {
        r as usize
    }
}

fn parse_fips(id: &serde_json::Value) -> Option<Fips> {
    match id {
        serde_json::Value::Number(n) => n.as_u64().and_then(|v| Fips::try_from(v).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Two unit squares side by side sharing the edge x = 1.
#[cfg(test)]
pub(crate) const TWO_SQUARES: &str = r#"{
    "type": "Topology",
    "objects": {
        "counties": {
            "type": "GeometryCollection",
            "geometries": [
                {"type": "Polygon", "id": 1, "arcs": [[0, 1]]},
                {"type": "Polygon", "id": "02", "arcs": [[-1, 2]]}
            ]
        },
        "states": {
            "type": "GeometryCollection",
            "geometries": [
                {"type": "Polygon", "id": "01", "arcs": [[0, 1]]},
                {"type": "Polygon", "id": "02", "arcs": [[-1, 2]]}
            ]
        }
    },
    "arcs": [
        [[1, 0], [1, 1]],
        [[1, 1], [0, 1], [0, 0], [1, 0]],
        [[1, 0], [2, 0], [2, 1], [1, 1]]
    ]
}"#;
