//! Depth rasterization.
//!
//! Each covered pixel stores the largest `y + z` of any triangle under it,
//! as a little-endian u16 in the red and green channels with alpha 255.
//! Uncovered pixels stay transparent.

use image::{Rgba, RgbaImage};

use crate::builder::{project, Bounds2, Mesh, Vertex};

/// Rasterize `mesh` over the projected window `bounds`.
pub fn rasterize_depth(mesh: &Mesh, bounds: &Bounds2) -> RgbaImage {
    let width = (bounds.x1 - bounds.x0).max(0) as u32;
    let height = (bounds.v1 - bounds.v0).max(0) as u32;
    let mut depth: Vec<Option<f64>> = vec![None; (width * height) as usize];

    for tri in &mesh.tris {
        let Some(raster) = TriRaster::new(tri) else {
            continue;
        };
        let (tx0, tv0, tx1, tv1) = raster.bounds();
        let x0 = tx0.max(bounds.x0);
        let x1 = tx1.min(bounds.x1);
        let v0 = tv0.max(bounds.v0);
        let v1 = tv1.min(bounds.v1);
        for v in v0..v1 {
            for x in x0..x1 {
                let Some(d) = raster.depth_at(x as f64 + 0.5, v as f64 + 0.5) else {
                    continue;
                };
                let idx = ((v - bounds.v0) as u32 * width + (x - bounds.x0) as u32) as usize;
                depth[idx] = Some(depth[idx].map_or(d, |cur| cur.max(d)));
            }
        }
    }

    let mut img = RgbaImage::new(width, height);
    for (i, d) in depth.iter().enumerate() {
        if let Some(d) = d {
            let value = d.round().clamp(0.0, u16::MAX as f64) as u16;
            let [lo, hi] = value.to_le_bytes();
            let (x, y) = (i as u32 % width, i as u32 / width);
            img.put_pixel(x, y, Rgba([lo, hi, 0, 255]));
        }
    }
    img
}

struct TriRaster {
    p: [(f64, f64); 3],
    d: [f64; 3],
    area: f64,
}

impl TriRaster {
    fn new(tri: &[Vertex; 3]) -> Option<Self> {
        let p = tri.map(|v| {
            let (x, v) = project(&v);
            (x as f64, v as f64)
        });
        let d = tri.map(|v| (v[1] + v[2]) as f64);
        let area = edge(p[0], p[1], p[2]);
        (area != 0.0).then_some(Self { p, d, area })
    }

    fn bounds(&self) -> (i32, i32, i32, i32) {
        let xs = self.p.map(|p| p.0);
        let vs = self.p.map(|p| p.1);
        let min = |a: [f64; 3]| a.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = |a: [f64; 3]| a.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        (
            min(xs).floor() as i32,
            min(vs).floor() as i32,
            max(xs).ceil() as i32,
            max(vs).ceil() as i32,
        )
    }

    /// Interpolated depth at a point, if the triangle covers it.
    fn depth_at(&self, x: f64, v: f64) -> Option<f64> {
        let q = (x, v);
        let w0 = edge(self.p[1], self.p[2], q) / self.area;
        let w1 = edge(self.p[2], self.p[0], q) / self.area;
        let w2 = edge(self.p[0], self.p[1], q) / self.area;
        if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
            return None;
        }
        Some(w0 * self.d[0] + w1 * self.d[1] + w2 * self.d[2])
    }
}

fn edge(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
}

/// Decode one depth pixel.
pub fn depth_value(px: &Rgba<u8>) -> Option<u16> {
    (px.0[3] != 0).then(|| u16::from_le_bytes([px.0[0], px.0[1]]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_depth() {
        let mesh = Mesh::cuboid(32, 32, 32);
        let bounds = mesh.projected_bounds().unwrap();
        let img = rasterize_depth(&mesh, &bounds);
        assert_eq!(img.dimensions(), (32, 64));

        // top face: z = 32 and y = v + 32; the first row samples v = -31.5
        let top = depth_value(img.get_pixel(10, 0)).unwrap();
        assert_eq!(top, 33);
        let ridge = depth_value(img.get_pixel(10, 31)).unwrap();
        assert_eq!(ridge, 64);
        // front face: y = 32, z = 32 - v; depth at the bottom row is ~32
        let front = depth_value(img.get_pixel(10, 63)).unwrap();
        assert!((32..=33).contains(&front), "front depth {}", front);
    }

    #[test]
    fn test_window_clips() {
        let mesh = Mesh::cuboid(32, 32, 0);
        let window = Bounds2 { x0: 16, v0: 0, x1: 48, v1: 16 };
        let img = rasterize_depth(&mesh, &window);
        assert_eq!(img.dimensions(), (32, 16));
        assert!(depth_value(img.get_pixel(0, 0)).is_some());
        assert!(depth_value(img.get_pixel(20, 0)).is_none());
    }
}
