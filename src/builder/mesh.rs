//! Triangle meshes in world pixel coordinates.
//!
//! `x` runs east, `y` south and `z` up. The screen projection is
//! `(x, v)` with `v = y - z`.

use serde::Serialize;

use crate::imaging::Rect;

pub type Vertex = [i32; 3];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Mesh {
    pub tris: Vec<[Vertex; 3]>,
}

/// Projected bounds `[x0, x1) × [v0, v1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds2 {
    pub x0: i32,
    pub v0: i32,
    pub x1: i32,
    pub v1: i32,
}

impl Bounds2 {
    pub fn intersect(&self, other: &Bounds2) -> Option<Bounds2> {
        let b = Bounds2 {
            x0: self.x0.max(other.x0),
            v0: self.v0.max(other.v0),
            x1: self.x1.min(other.x1),
            v1: self.v1.min(other.v1),
        };
        (b.x1 > b.x0 && b.v1 > b.v0).then_some(b)
    }

    /// Bounds of a pixel rectangle whose top-left sits at `base`.
    pub fn from_rect(rect: &Rect, base: (i32, i32)) -> Bounds2 {
        Bounds2 {
            x0: base.0 + rect.x as i32,
            v0: base.1 + rect.y as i32,
            x1: base.0 + rect.right() as i32,
            v1: base.1 + rect.bottom() as i32,
        }
    }
}

pub fn project(v: &Vertex) -> (i32, i32) {
    (v[0], v[1] - v[2])
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Two triangles over the corners `a b c d`, given in winding order.
    pub fn quad(a: Vertex, b: Vertex, c: Vertex, d: Vertex) -> Self {
        Self {
            tris: vec![[a, b, c], [a, c, d]],
        }
    }

    /// Visible faces (top and front) of an axis-aligned box at the origin.
    pub fn cuboid(sx: i32, sy: i32, sz: i32) -> Self {
        let mut mesh = Mesh::new();
        if sx > 0 && sy > 0 {
            mesh.extend(&Mesh::quad(
                [0, 0, sz],
                [sx, 0, sz],
                [sx, sy, sz],
                [0, sy, sz],
            ));
        }
        if sx > 0 && sz > 0 {
            mesh.extend(&Mesh::quad(
                [0, sy, sz],
                [sx, sy, sz],
                [sx, sy, 0],
                [0, sy, 0],
            ));
        }
        mesh
    }

    pub fn extend(&mut self, other: &Mesh) {
        self.tris.extend_from_slice(&other.tris);
    }

    pub fn translate(&self, d: Vertex) -> Mesh {
        Mesh {
            tris: self
                .tris
                .iter()
                .map(|tri| tri.map(|v| [v[0] + d[0], v[1] + d[1], v[2] + d[2]]))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tris.is_empty()
    }

    pub fn projected_bounds(&self) -> Option<Bounds2> {
        let mut points = self.tris.iter().flatten().map(project);
        let (x, v) = points.next()?;
        let init = Bounds2 {
            x0: x,
            v0: v,
            x1: x,
            v1: v,
        };
        Some(points.fold(init, |b, (x, v)| Bounds2 {
            x0: b.x0.min(x),
            v0: b.v0.min(v),
            x1: b.x1.max(x),
            v1: b.v1.max(v),
        }))
    }
}
