//! Triangle rasterization and depth-tested merge

use log::debug;

use super::math::{barycentric, barycentric_denominator, Vec3, DEGENERATE_EPSILON};
use super::pipeline::{assemble_triangles, transform_vertices};
use super::types::{Color, Fragment, Shading, Uniforms, Vertex};
use crate::error::{RasterError, Result};

/// Depth of a cell nothing has been written to since the last clear.
/// Larger than any depth the viewport can produce.
pub const DEPTH_SENTINEL: f32 = 99_999.0;

/// Color target and depth buffer for software rendering
pub struct Framebuffer {
    pub pixels: Vec<u8>,    // RGBA, 4 bytes per pixel
    pub zbuffer: Vec<f32>,  // Depth buffer
    pub width: usize,
    pub height: usize,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(RasterError::InvalidSize { width, height });
        }
        Ok(Self {
            pixels: vec![0; width * height * 4],
            zbuffer: vec![DEPTH_SENTINEL; width * height],
            width,
            height,
        })
    }

    /// Fill the color target and reset every depth cell to the sentinel
    pub fn clear(&mut self, color: Color) {
        let bytes = color.to_bytes();
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&bytes);
        }
        self.zbuffer.fill(DEPTH_SENTINEL);
    }

    pub fn depth_at(&self, x: usize, y: usize) -> Option<f32> {
        (x < self.width && y < self.height).then(|| self.zbuffer[y * self.width + x])
    }

    pub fn color_at(&self, x: usize, y: usize) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y * self.width + x) * 4;
        let p = &self.pixels[i..i + 4];
        Some(Color::with_alpha(p[0], p[1], p[2], p[3]))
    }

    /// Depth test-and-set for one fragment.
    ///
    /// Writes color and depth when the pixel is on the target and strictly
    /// nearer than what is stored; equal depths keep the first writer.
    /// Returns whether the fragment was accepted.
    pub fn merge_fragment(&mut self, fragment: &Fragment) -> bool {
        let Vec3 { x, y, z } = fragment.position;
        if !(x >= 0.0 && y >= 0.0 && x < self.width as f32 && y < self.height as f32) {
            return false;
        }

        let idx = y as usize * self.width + x as usize;
        // NaN compares false, so it never passes
        if !(z < self.zbuffer[idx]) {
            return false;
        }

        self.zbuffer[idx] = z;
        let bytes = fragment.color.to_bytes();
        self.pixels[idx * 4..idx * 4 + 4].copy_from_slice(&bytes);
        true
    }

    /// Number of depth cells written since the last clear
    pub fn covered_pixels(&self) -> usize {
        self.zbuffer.iter().filter(|&&z| z != DEPTH_SENTINEL).count()
    }
}

/// Integer pixel bounds of a triangle, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl BoundingBox {
    /// x/y extent of the three points, min floored and max ceiled
    pub fn of_triangle(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self {
            min_x: a.x.min(b.x).min(c.x).floor() as i32,
            min_y: a.y.min(b.y).min(c.y).floor() as i32,
            max_x: a.x.max(b.x).max(c.x).ceil() as i32,
            max_y: a.y.max(b.y).max(c.y).ceil() as i32,
        }
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Intersect with a `width` x `height` target. An off-target box ends up
    /// with `min > max` and yields no pixels.
    pub fn clamp(self, width: usize, height: usize) -> Self {
        Self {
            min_x: self.min_x.max(0),
            min_y: self.min_y.max(0),
            max_x: self.max_x.min(width as i32 - 1),
            max_y: self.max_y.min(height as i32 - 1),
        }
    }

    /// Pixels in scan order: rows top to bottom, each row left to right
    pub fn pixels(self) -> impl Iterator<Item = (i32, i32)> {
        (self.min_y..=self.max_y).flat_map(move |y| (self.min_x..=self.max_x).map(move |x| (x, y)))
    }
}

/// Rasterize one screen-space triangle onto a `width` x `height` target.
///
/// Returns `None` for degenerate or non-finite triangles. Otherwise the
/// fragments are produced lazily in scan order, limited to on-target pixels.
///
/// Coverage is the closed barycentric test, so pixels exactly on an edge
/// shared with a neighbour are emitted by both triangles. Color is flat: one
/// lighting intensity from the face normal for the whole triangle.
pub fn rasterize_triangle(
    a: &Vertex,
    b: &Vertex,
    c: &Vertex,
    shading: &Shading,
    width: usize,
    height: usize,
) -> Option<impl Iterator<Item = Fragment>> {
    let (pa, pb, pc) = (a.position, b.position, c.position);

    if !pa.is_finite() || !pb.is_finite() || !pc.is_finite() {
        return None;
    }
    if barycentric_denominator(pa, pb, pc).abs() < DEGENERATE_EPSILON {
        return None;
    }

    let normal = (pb - pa).cross(pc - pa).normalize();
    let intensity = shading.intensity(normal);
    let color = Color::from_float(intensity, intensity, intensity, 1.0);

    let bbox = BoundingBox::of_triangle(pa, pb, pc).clamp(width, height);

    Some(bbox.pixels().filter_map(move |(x, y)| {
        let bc = barycentric(Vec3::new(x as f32, y as f32, 0.0), pa, pb, pc)?;
        let inside = |t: f32| (0.0..=1.0).contains(&t);
        (inside(bc.x) && inside(bc.y) && inside(bc.z)).then(|| {
            let z = pa.z * bc.x + pb.z * bc.y + pc.z * bc.z;
            Fragment::new(x as f32, y as f32, z, color)
        })
    }))
}

/// Counters for one pipeline pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub triangles: usize,
    /// Triangles that were degenerate or had a non-finite vertex
    pub skipped: usize,
    /// On-target fragments produced by the rasterizer
    pub fragments: usize,
    pub accepted: usize,
}

/// Run the full pipeline for one vertex buffer: transform, assemble,
/// rasterize every triangle and merge its fragments in emission order.
///
/// Does not clear `fb`; the caller owns the frame boundary.
pub fn render(
    fb: &mut Framebuffer,
    uniforms: &Uniforms,
    vertices: &[Vertex],
    shading: &Shading,
) -> Result<FrameStats> {
    let transformed = transform_vertices(vertices, uniforms);
    let triangles = assemble_triangles(&transformed)?;

    let mut stats = FrameStats {
        triangles: triangles.len(),
        ..Default::default()
    };

    let (width, height) = (fb.width, fb.height);
    for [a, b, c] in &triangles {
        let Some(fragments) = rasterize_triangle(a, b, c, shading, width, height) else {
            stats.skipped += 1;
            continue;
        };
        for fragment in fragments {
            stats.fragments += 1;
            if fb.merge_fragment(&fragment) {
                stats.accepted += 1;
            }
        }
    }

    debug!(
        "Rendered {} triangles ({} skipped), {} fragments, {} accepted",
        stats.triangles, stats.skipped, stats.fragments, stats.accepted
    );

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screen_vertex(x: f32, y: f32, z: f32) -> Vertex {
        Vertex::from_pos(x, y, z)
    }

    fn lit() -> Shading {
        Shading::new(Vec3::new(0.0, 0.0, 1.0), 1.0)
    }

    /// Rasterize onto a 64x64 target; empty when the triangle is skipped
    fn raster(a: &Vertex, b: &Vertex, c: &Vertex, shading: &Shading) -> Vec<Fragment> {
        rasterize_triangle(a, b, c, shading, 64, 64)
            .map(Iterator::collect)
            .unwrap_or_default()
    }

    #[test]
    fn test_bounding_box_rounds_outward() {
        let bbox = BoundingBox::of_triangle(
            Vec3::new(1.5, 2.2, 0.0),
            Vec3::new(7.1, 3.0, 0.0),
            Vec3::new(4.0, 9.9, 0.0),
        );
        assert_eq!(bbox, BoundingBox { min_x: 1, min_y: 2, max_x: 8, max_y: 10 });
        assert_eq!(bbox.pixels().count(), 8 * 9);
    }

    #[test]
    fn test_bounding_box_clamps_to_target() {
        let bbox = BoundingBox { min_x: -20, min_y: -3, max_x: 500, max_y: 40 }.clamp(64, 32);
        assert_eq!(bbox, BoundingBox { min_x: 0, min_y: 0, max_x: 63, max_y: 31 });

        let off_target = BoundingBox { min_x: 70, min_y: 0, max_x: 90, max_y: 10 }.clamp(64, 64);
        assert_eq!(off_target.pixels().count(), 0);
    }

    #[test]
    fn test_huge_triangle_only_emits_on_target_fragments() {
        let fragments: Vec<Fragment> = rasterize_triangle(
            &screen_vertex(0.0, 0.0, 0.0),
            &screen_vertex(6000.0, 0.0, 0.0),
            &screen_vertex(0.0, 6000.0, 0.0),
            &lit(),
            64,
            64,
        )
        .unwrap()
        .collect();
        // the whole target is inside; rounding may drop a few cells on y = 0
        assert!(fragments.len() > 63 * 63 && fragments.len() <= 64 * 64);
        assert!(fragments
            .iter()
            .all(|f| (0.0..64.0).contains(&f.position.x) && (0.0..64.0).contains(&f.position.y)));
    }

    #[test]
    fn test_degenerate_and_non_finite_are_skipped() {
        let lit = lit();
        let collinear = [
            screen_vertex(0.0, 0.0, 0.0),
            screen_vertex(5.0, 5.0, 1.0),
            screen_vertex(10.0, 10.0, 2.0),
        ];
        assert!(rasterize_triangle(&collinear[0], &collinear[1], &collinear[2], &lit, 64, 64).is_none());

        let nan = screen_vertex(f32::NAN, 0.0, 0.0);
        assert!(rasterize_triangle(&nan, &collinear[1], &screen_vertex(0.0, 10.0, 0.0), &lit, 64, 64).is_none());

        // valid but entirely off the target: not skipped, just empty
        let off = rasterize_triangle(
            &screen_vertex(100.0, 100.0, 0.0),
            &screen_vertex(120.0, 100.0, 0.0),
            &screen_vertex(100.0, 120.0, 0.0),
            &lit,
            64,
            64,
        );
        assert_eq!(off.map(Iterator::count), Some(0));
    }

    #[test]
    fn test_fragments_lie_in_bounding_box() {
        let (a, b, c) = (
            screen_vertex(3.3, 1.7, 0.0),
            screen_vertex(40.2, 12.9, 0.0),
            screen_vertex(11.6, 33.1, 0.0),
        );
        let bbox = BoundingBox::of_triangle(a.position, b.position, c.position);
        let fragments = raster(&a, &b, &c, &lit());
        assert!(!fragments.is_empty());
        for f in &fragments {
            assert!(bbox.contains(f.position.x as i32, f.position.y as i32));
        }
    }

    #[test]
    fn test_depth_interpolates_between_vertices() {
        let (a, b, c) = (
            screen_vertex(0.0, 0.0, 0.0),
            screen_vertex(10.0, 0.0, 1.0),
            screen_vertex(0.0, 10.0, 1.0),
        );
        let fragments = raster(&a, &b, &c, &lit());
        let at = |x: f32, y: f32| fragments.iter().find(|f| f.position.x == x && f.position.y == y);
        assert!(at(0.0, 0.0).unwrap().depth().abs() < 1e-6);
        assert!((at(5.0, 0.0).unwrap().depth() - 0.5).abs() < 1e-5);
        assert!((at(10.0, 0.0).unwrap().depth() - 1.0).abs() < 1e-5);
        assert!(at(10.0, 10.0).is_none());
    }

    #[test]
    fn test_scan_order_is_row_major() {
        let fragments = raster(
            &screen_vertex(0.0, 0.0, 0.0),
            &screen_vertex(6.0, 0.0, 0.0),
            &screen_vertex(0.0, 6.0, 0.0),
            &lit(),
        );
        let keys: Vec<(i32, i32)> = fragments
            .iter()
            .map(|f| (f.position.y as i32, f.position.x as i32))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_collinear_triangle_emits_nothing() {
        let fragments = raster(
            &screen_vertex(0.0, 0.0, 0.0),
            &screen_vertex(5.0, 5.0, 1.0),
            &screen_vertex(10.0, 10.0, 2.0),
            &lit(),
        );
        assert!(fragments.is_empty());
    }

    #[test]
    fn test_non_finite_triangle_emits_nothing() {
        let fragments = raster(
            &screen_vertex(f32::INFINITY, 0.0, 0.0),
            &screen_vertex(5.0, 5.0, 1.0),
            &screen_vertex(0.0, 10.0, 2.0),
            &lit(),
        );
        assert!(fragments.is_empty());
    }

    #[test]
    fn test_flat_color_from_face_normal() {
        // (B - A) x (C - A) points along +z for this winding
        let fragments = raster(
            &screen_vertex(0.0, 0.0, 0.0),
            &screen_vertex(8.0, 0.0, 0.0),
            &screen_vertex(0.0, 8.0, 0.0),
            &Shading::new(Vec3::new(0.0, 0.0, 1.0), 0.5),
        );
        assert!(fragments.iter().all(|f| f.color == Color::with_alpha(127, 127, 127, 255)));
    }

    #[test]
    fn test_backfacing_is_black_and_overbright_saturates() {
        let (a, b, c) = (
            screen_vertex(0.0, 0.0, 0.0),
            screen_vertex(0.0, 8.0, 0.0),
            screen_vertex(8.0, 0.0, 0.0),
        );
        let back = raster(&a, &b, &c, &Shading::new(Vec3::new(0.0, 0.0, 1.0), 10.0));
        assert!(back.iter().all(|f| f.color == Color::BLACK));

        let front = raster(&a, &c, &b, &Shading::new(Vec3::new(0.0, 0.0, 1.0), 10.0));
        assert!(front.iter().all(|f| f.color == Color::WHITE));
    }

    #[test]
    fn test_shared_edge_drawn_by_both_triangles() {
        let shading = lit();
        let left = raster(
            &screen_vertex(0.0, 0.0, 0.0),
            &screen_vertex(8.0, 0.0, 0.0),
            &screen_vertex(0.0, 8.0, 0.0),
            &shading,
        );
        let right = raster(
            &screen_vertex(8.0, 0.0, 0.0),
            &screen_vertex(8.0, 8.0, 0.0),
            &screen_vertex(0.0, 8.0, 0.0),
            &shading,
        );
        // (4, 4) sits on the shared diagonal
        let on_diagonal = |frags: &[Fragment]| frags.iter().any(|f| f.position.x == 4.0 && f.position.y == 4.0);
        assert!(on_diagonal(&left));
        assert!(on_diagonal(&right));
    }

    #[test]
    fn test_merge_keeps_nearest_in_either_order() {
        let far = Fragment::new(2.0, 3.0, 5.0, Color::new(255, 0, 0));
        let near = Fragment::new(2.0, 3.0, 3.0, Color::new(0, 255, 0));

        let mut first = Framebuffer::new(4, 4).unwrap();
        assert!(first.merge_fragment(&far));
        assert!(first.merge_fragment(&near));

        let mut second = Framebuffer::new(4, 4).unwrap();
        assert!(second.merge_fragment(&near));
        assert!(!second.merge_fragment(&far));

        for fb in [&first, &second] {
            assert_eq!(fb.depth_at(2, 3), Some(3.0));
            assert_eq!(fb.color_at(2, 3), Some(Color::new(0, 255, 0)));
        }
        assert_eq!(first.zbuffer, second.zbuffer);
        assert_eq!(first.pixels, second.pixels);
    }

    #[test]
    fn test_merge_equal_depth_keeps_first() {
        let mut fb = Framebuffer::new(4, 4).unwrap();
        assert!(fb.merge_fragment(&Fragment::new(1.0, 1.0, 2.0, Color::new(1, 1, 1))));
        assert!(!fb.merge_fragment(&Fragment::new(1.0, 1.0, 2.0, Color::new(9, 9, 9))));
        assert_eq!(fb.color_at(1, 1), Some(Color::new(1, 1, 1)));
    }

    #[test]
    fn test_merge_discards_out_of_bounds_and_nan() {
        let mut fb = Framebuffer::new(4, 4).unwrap();
        assert!(!fb.merge_fragment(&Fragment::new(-1.0, 0.0, 0.0, Color::WHITE)));
        assert!(!fb.merge_fragment(&Fragment::new(4.0, 0.0, 0.0, Color::WHITE)));
        assert!(!fb.merge_fragment(&Fragment::new(0.0, 4.0, 0.0, Color::WHITE)));
        assert!(!fb.merge_fragment(&Fragment::new(0.0, 0.0, f32::NAN, Color::WHITE)));
        assert!(fb.merge_fragment(&Fragment::new(0.0, 0.0, 0.0, Color::WHITE)));
        assert_eq!(fb.covered_pixels(), 1);
    }

    #[test]
    fn test_clear_resets_depth_and_color() {
        let mut fb = Framebuffer::new(3, 2).unwrap();
        fb.merge_fragment(&Fragment::new(1.0, 1.0, 0.5, Color::WHITE));
        fb.clear(Color::new(10, 20, 30));
        assert_eq!(fb.covered_pixels(), 0);
        assert!(fb.zbuffer.iter().all(|&z| z == DEPTH_SENTINEL));
        assert_eq!(fb.color_at(1, 1), Some(Color::new(10, 20, 30)));
    }

    #[test]
    fn test_zero_size_framebuffer_rejected() {
        assert!(matches!(Framebuffer::new(0, 10), Err(RasterError::InvalidSize { .. })));
    }

    #[test]
    fn test_render_counts_skipped_triangles() {
        let mut fb = Framebuffer::new(16, 16).unwrap();
        let vertices = [
            Vertex::from_pos(1.0, 1.0, 0.0),
            Vertex::from_pos(10.0, 1.0, 0.0),
            Vertex::from_pos(1.0, 10.0, 0.0),
            // collinear
            Vertex::from_pos(0.0, 0.0, 0.0),
            Vertex::from_pos(1.0, 1.0, 0.0),
            Vertex::from_pos(2.0, 2.0, 0.0),
        ];
        let stats = render(&mut fb, &Uniforms::default(), &vertices, &lit()).unwrap();
        assert_eq!(stats.triangles, 2);
        assert_eq!(stats.skipped, 1);
        assert!(stats.fragments > 0);
        assert_eq!(stats.accepted, fb.covered_pixels());
    }

    #[test]
    fn test_render_rejects_partial_buffer() {
        let mut fb = Framebuffer::new(16, 16).unwrap();
        let vertices = [Vertex::from_pos(1.0, 1.0, 0.0); 4];
        assert!(render(&mut fb, &Uniforms::default(), &vertices, &lit()).is_err());
        assert_eq!(fb.covered_pixels(), 0);
    }
}
