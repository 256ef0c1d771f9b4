//! Height queries against a triangle mesh using a 2D grid spatial hash.

use super::HeightField;
use std::collections::HashMap;
use tracing::{debug, warn};

/// A mesh triangle prepared for vertical (Z) queries.
///
/// The triangle is stored as an origin vertex plus two edges projected
/// onto XY, together with the slope of its plane. Triangles seen edge-on
/// from above have no plane slope and never cover a point.
#[derive(Debug, Clone)]
pub struct Triangle {
    vertices: [[f64; 3]; 3],
    bbox: [f64; 4],
    edges: [[f64; 2]; 2],
    /// Reciprocal of the XY cross product of the edges, `None` when edge-on.
    inv_area: Option<f64>,
    /// dz/dx and dz/dy across the plane.
    slope: [f64; 2],
}

impl Triangle {
    /// Prepare a triangle from its three corners.
    pub fn new(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> Self {
        let e1 = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
        let e2 = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
        let cross = e1[0] * e2[1] - e1[1] * e2[0];

        let (inv_area, slope) = if cross.abs() > 1e-12 {
            let slope = [
                (e1[2] * e2[1] - e2[2] * e1[1]) / cross,
                (e1[0] * e2[2] - e2[0] * e1[2]) / cross,
            ];
            (Some(1.0 / cross), slope)
        } else {
            (None, [0.0, 0.0])
        };

        let xs = [a[0], b[0], c[0]];
        let ys = [a[1], b[1], c[1]];
        let bbox = [
            xs.iter().copied().fold(f64::INFINITY, f64::min),
            ys.iter().copied().fold(f64::INFINITY, f64::min),
            xs.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            ys.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        ];

        Self {
            vertices: [a, b, c],
            bbox,
            edges: [[e1[0], e1[1]], [e2[0], e2[1]]],
            inv_area,
            slope,
        }
    }

    /// Corner positions.
    pub fn vertices(&self) -> &[[f64; 3]; 3] {
        &self.vertices
    }

    /// Planar bounding box [min_x, min_y, max_x, max_y].
    pub fn bbox(&self) -> [f64; 4] {
        self.bbox
    }

    /// Z of the triangle's plane above (x, y), `None` when edge-on.
    pub fn z_at_xy(&self, x: f64, y: f64) -> Option<f64> {
        self.inv_area?;
        let [ox, oy, oz] = self.vertices[0];
        Some(oz + self.slope[0] * (x - ox) + self.slope[1] * (y - oy))
    }

    /// Whether (x, y) lies inside the triangle seen from above.
    ///
    /// Points on a shared edge count for both neighbours.
    pub fn contains_xy(&self, x: f64, y: f64) -> bool {
        let [min_x, min_y, max_x, max_y] = self.bbox;
        if x < min_x || x > max_x || y < min_y || y > max_y {
            return false;
        }
        let Some(inv_area) = self.inv_area else {
            return false;
        };

        let [ox, oy, _] = self.vertices[0];
        let (px, py) = (x - ox, y - oy);
        let [[e1x, e1y], [e2x, e2y]] = self.edges;
        let s = (px * e2y - py * e2x) * inv_area;
        let t = (e1x * py - e1y * px) * inv_area;

        const SLACK: f64 = 1e-8;
        s >= -SLACK && t >= -SLACK && s + t <= 1.0 + SLACK
    }

    /// Height of the triangle above (x, y), if it covers the point.
    pub fn height_at(&self, x: f64, y: f64) -> Option<f64> {
        if self.contains_xy(x, y) {
            self.z_at_xy(x, y)
        } else {
            None
        }
    }
}

/// Uniform XY bucket grid mapping cells to the triangles overlapping them.
#[derive(Debug, Clone)]
struct CellIndex {
    origin: [f64; 2],
    cell_size: f64,
    cols: usize,
    rows: usize,
    cells: HashMap<(usize, usize), Vec<usize>>,
}

impl CellIndex {
    /// Cover `bounds`, padded by a tenth of a cell so edge points land inside.
    fn covering(bounds: [f64; 4], cell_size: f64) -> Self {
        let pad = cell_size * 0.1;
        let origin = [bounds[0] - pad, bounds[1] - pad];
        let span_x = bounds[2] - bounds[0] + 2.0 * pad;
        let span_y = bounds[3] - bounds[1] + 2.0 * pad;
        Self {
            origin,
            cell_size,
            cols: (span_x / cell_size).ceil() as usize + 1,
            rows: (span_y / cell_size).ceil() as usize + 1,
            cells: HashMap::new(),
        }
    }

    fn cell_of(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let col = ((x - self.origin[0]) / self.cell_size).floor();
        let row = ((y - self.origin[1]) / self.cell_size).floor();
        let inside = col >= 0.0
            && row >= 0.0
            && col < self.cols as f64
            && row < self.rows as f64;
        inside.then(|| (col as usize, row as usize))
    }

    fn insert(&mut self, id: usize, bbox: [f64; 4]) {
        let (Some((c0, r0)), Some((c1, r1))) =
            (self.cell_of(bbox[0], bbox[1]), self.cell_of(bbox[2], bbox[3]))
        else {
            return;
        };
        for row in r0..=r1 {
            for col in c0..=c1 {
                self.cells.entry((col, row)).or_default().push(id);
            }
        }
    }

    fn at(&self, x: f64, y: f64) -> &[usize] {
        self.cell_of(x, y)
            .and_then(|cell| self.cells.get(&cell))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Height field over a triangle mesh.
///
/// The elevation at a point is the highest triangle whose XY projection
/// covers it; points off the mesh report the background elevation.
#[derive(Debug, Clone)]
pub struct MeshHeightField {
    triangles: Vec<Triangle>,
    index: CellIndex,
    part_bounds: [f64; 4],
    background: f64,
}

impl MeshHeightField {
    /// Build from vertex positions and triangle indices (groups of 3).
    ///
    /// Triangles referencing missing vertices are dropped.
    pub fn new(vertices: &[[f64; 3]], indices: &[u32], cell_size: f64) -> Self {
        let corner = |i: u32| vertices.get(i as usize).copied();
        let triangles: Vec<Triangle> = indices
            .chunks_exact(3)
            .filter_map(|t| Some(Triangle::new(corner(t[0])?, corner(t[1])?, corner(t[2])?)))
            .collect();

        let dropped = indices.len() / 3 - triangles.len();
        if dropped > 0 {
            warn!(dropped, "triangles with out-of-range vertex indices ignored");
        }

        Self::from_triangles(triangles, cell_size)
    }

    /// Build from a triangle soup, as read from an STL file.
    pub fn from_soup(soup: &[[[f64; 3]; 3]], cell_size: f64) -> Self {
        let triangles = soup
            .iter()
            .map(|&[a, b, c]| Triangle::new(a, b, c))
            .collect();
        Self::from_triangles(triangles, cell_size)
    }

    fn from_triangles(triangles: Vec<Triangle>, cell_size: f64) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            1.0
        };

        let part_bounds = triangles
            .iter()
            .map(Triangle::bbox)
            .reduce(|a, b| {
                [
                    a[0].min(b[0]),
                    a[1].min(b[1]),
                    a[2].max(b[2]),
                    a[3].max(b[3]),
                ]
            })
            .unwrap_or([0.0; 4]);

        let mut index = CellIndex::covering(part_bounds, cell_size);
        for (id, tri) in triangles.iter().enumerate() {
            index.insert(id, tri.bbox());
        }

        debug!(
            triangles = triangles.len(),
            cells = index.cells.len(),
            "mesh height field built"
        );

        Self {
            triangles,
            index,
            part_bounds,
            background: 0.0,
        }
    }

    /// Set the elevation reported off the mesh.
    pub fn with_background(mut self, background: f64) -> Self {
        self.background = background;
        self
    }

    /// All triangles.
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Lowest and highest vertex Z.
    pub fn z_bounds(&self) -> (f64, f64) {
        self.triangles
            .iter()
            .flat_map(|tri| tri.vertices().iter().map(|v| v[2]))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), z| {
                (lo.min(z), hi.max(z))
            })
    }
}

impl HeightField for MeshHeightField {
    fn elevation(&self, x: f64, y: f64) -> f64 {
        self.index
            .at(x, y)
            .iter()
            .filter_map(|&idx| self.triangles.get(idx))
            .filter_map(|tri| tri.height_at(x, y))
            .reduce(f64::max)
            .unwrap_or(self.background)
    }

    fn bounds(&self) -> [f64; 4] {
        self.part_bounds
    }
}
