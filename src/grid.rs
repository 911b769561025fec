use crate::types::{Cell, CellId};
use anyhow::{anyhow, bail, Context, Result};
use geo::algorithm::bounding_rect::BoundingRect;
use geo::algorithm::contains::Contains;
use geo::{Coord, LineString, Point, Polygon};
use geojson::{GeoJson, Value};
use rstar::{RTree, RTreeObject, AABB};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

// Wrapper for RTree indexing
struct CellEnvelope {
    id: CellId,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for CellEnvelope {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// The fixed spatial partition plus a bounding-box index over it.
pub struct Grid {
    cells: Vec<Cell>,
    tree: RTree<CellEnvelope>,
}

impl Grid {
    pub fn load(path: &Path) -> Result<Grid> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open grid file: {:?}", path))?;
        Grid::from_reader(BufReader::new(file))
    }

    pub fn from_reader(reader: impl Read) -> Result<Grid> {
        let geojson = GeoJson::from_reader(reader).context("Failed to parse grid GeoJSON")?;

        let collection = match geojson {
            GeoJson::FeatureCollection(fc) => fc,
            _ => return Err(anyhow!("Grid GeoJSON must be a FeatureCollection")),
        };

        let mut cells = Vec::new();

        for (i, feature) in collection.features.into_iter().enumerate() {
            let name = feature
                .properties
                .as_ref()
                .and_then(|props| props.get("id").or_else(|| props.get("name")))
                .and_then(|v| match v {
                    serde_json::Value::String(s) => Some(s.clone()),
                    serde_json::Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .unwrap_or_else(|| format!("cell-{}", i));

            let geometry = feature
                .geometry
                .ok_or_else(|| anyhow!("Grid feature {} has no geometry", i))?;

            let rings = match geometry.value {
                Value::Polygon(rings) => rings,
                _ => bail!("Grid feature {} is not a polygon", i),
            };
            let ring = rings
                .first()
                .ok_or_else(|| anyhow!("Grid feature {} has no exterior ring", i))?;

            // Cells are quadrilaterals: the first four vertices of the
            // exterior ring define the boundary.
            if ring.len() < 4 {
                bail!("Grid feature {} has fewer than four vertices", i);
            }
            let mut corners = Vec::with_capacity(4);
            for pos in &ring[..4] {
                let [x, y, ..] = pos.as_slice() else {
                    bail!("Grid feature {} has a malformed coordinate pair", i);
                };
                corners.push(Coord { x: *x, y: *y });
            }

            cells.push(Cell {
                name,
                boundary: Polygon::new(LineString::from(corners), vec![]),
            });
        }

        let tree_items: Vec<CellEnvelope> = cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let rect = cell.boundary.bounding_rect().ok_or_else(|| {
                    anyhow!("Grid feature {} has a degenerate boundary", i)
                })?;
                Ok(CellEnvelope {
                    id: CellId(i),
                    aabb: AABB::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                })
            })
            .collect::<Result<_>>()?;

        Ok(Grid {
            cells,
            tree: RTree::bulk_load(tree_items),
        })
    }

    /// Which cell contains this point, if any. When cells overlap, the one
    /// earlier in load order wins; output reproducibility depends on this.
    pub fn locate(&self, point: Point<f64>) -> Option<CellId> {
        let envelope = AABB::from_point([point.x(), point.y()]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .filter(|candidate| self.cells[candidate.id.0].boundary.contains(&point))
            .map(|candidate| candidate.id)
            .min()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(name: &str, ring: &str) -> String {
        format!(
            r#"{{"type":"Feature","properties":{{"id":"{}"}},"geometry":{{"type":"Polygon","coordinates":[{}]}}}}"#,
            name, ring
        )
    }

    fn grid_json(features: &[String]) -> String {
        format!(
            r#"{{"type":"FeatureCollection","features":[{}]}}"#,
            features.join(",")
        )
    }

    fn two_cell_grid() -> Grid {
        let json = grid_json(&[
            feature("A1", "[[0.0,0.0],[0.0,1.0],[1.0,1.0],[1.0,0.0],[0.0,0.0]]"),
            feature("A2", "[[2.0,0.0],[2.0,1.0],[3.0,1.0],[3.0,0.0],[2.0,0.0]]"),
        ]);
        Grid::from_reader(json.as_bytes()).unwrap()
    }

    #[test]
    fn locate_finds_containing_cell() {
        let grid = two_cell_grid();
        assert_eq!(grid.locate(Point::new(0.5, 0.5)), Some(CellId(0)));
        assert_eq!(grid.locate(Point::new(2.5, 0.5)), Some(CellId(1)));
    }

    #[test]
    fn locate_outside_every_cell_is_none() {
        let grid = two_cell_grid();
        assert_eq!(grid.locate(Point::new(9.0, 9.0)), None);
        assert_eq!(grid.locate(Point::new(1.5, 0.5)), None);
    }

    #[test]
    fn overlap_goes_to_the_cell_loaded_first() {
        // Two identical cells; both contain the probe point.
        let cell = "[[0.0,0.0],[0.0,1.0],[1.0,1.0],[1.0,0.0],[0.0,0.0]]";
        let json = grid_json(&[feature("first", cell), feature("second", cell)]);
        let grid = Grid::from_reader(json.as_bytes()).unwrap();
        assert_eq!(grid.locate(Point::new(0.5, 0.5)), Some(CellId(0)));
    }

    #[test]
    fn quadrilateral_uses_only_first_four_vertices() {
        // A pentagon ring: the fifth distinct vertex is ignored.
        let json = grid_json(&[feature(
            "P",
            "[[0.0,0.0],[0.0,2.0],[2.0,2.0],[2.0,0.0],[4.0,-2.0],[0.0,0.0]]",
        )]);
        let grid = Grid::from_reader(json.as_bytes()).unwrap();
        assert_eq!(grid.locate(Point::new(1.0, 1.0)), Some(CellId(0)));
        assert_eq!(grid.locate(Point::new(3.0, -1.0)), None);
    }

    #[test]
    fn too_few_vertices_is_a_load_error() {
        let json = grid_json(&[feature("bad", "[[0.0,0.0],[0.0,1.0],[1.0,0.0]]")]);
        assert!(Grid::from_reader(json.as_bytes()).is_err());
    }

    #[test]
    fn non_collection_grid_is_rejected() {
        let json = feature("lone", "[[0.0,0.0],[0.0,1.0],[1.0,1.0],[1.0,0.0],[0.0,0.0]]");
        assert!(Grid::from_reader(json.as_bytes()).is_err());
    }

    #[test]
    fn cell_names_come_from_properties() {
        let grid = two_cell_grid();
        assert_eq!(grid.cells()[0].name, "A1");
        assert_eq!(grid.cells()[1].name, "A2");
    }
}
