//! Heightfield terrain with O(1) height lookups and a grid line walk
//!
//! The terrain is a `width × height` grid of vertices in the X/Z plane, one
//! vertex per heightmap pixel. Map coordinates address the grid: map `(x, y)`
//! corresponds to world `(x, z)`. Every grid quad is split along the same
//! diagonal:
//!
//! ```text
//!  (x,y) ---- (x+1,y)
//!    |  lower /  |
//!    |      /    |
//!    |    / upper|
//!  (x,y+1) -- (x+1,y+1)
//! ```
//!
//! A point whose fractional cell coordinates sum to less than 1 lies in the
//! lower triangle. Height, normal, intersection and drawing all use this
//! split.

use std::ops::Range;
use std::path::Path;

use bytemuck::{Pod, Zeroable};
use thiserror::Error;

use crate::foundation::math::{utils, Quat, Vec2, Vec3};
use crate::physics::collision::{Ray, Triangle};

/// Terrain construction failures
#[derive(Debug, Error)]
pub enum TerrainError {
    /// The heightmap could not be read or decoded
    #[error("failed to load heightmap: {0}")]
    Image(#[from] image::ImageError),

    /// At least one grid cell (2x2 vertices) is needed
    #[error("heightmap of {width}x{height} is too small, at least 2x2 required")]
    MapTooSmall {
        /// Columns
        width: usize,
        /// Rows
        height: usize,
    },

    /// Sample buffer does not match the map dimensions
    #[error("expected {expected} height samples, got {actual}")]
    SampleCount {
        /// `width * height`
        expected: usize,
        /// Samples supplied
        actual: usize,
    },
}

/// GPU-ready vertex record
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TerrainVertex {
    /// World position
    pub position: [f32; 3],
    /// Per-vertex normal of the lower triangle of its cell
    pub normal: [f32; 3],
    /// Map coordinate, used as texture coordinate
    pub tex_coord: [f32; 2],
}

/// Integer grid coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MapPoint {
    /// Column
    pub x: i32,
    /// Row
    pub y: i32,
}

impl MapPoint {
    /// Creates a grid coordinate
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Integer grid rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MapRect {
    /// First column
    pub x: i32,
    /// First row
    pub y: i32,
    /// Columns covered
    pub width: i32,
    /// Rows covered
    pub height: i32,
}

impl MapRect {
    /// Creates a grid rectangle
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Overlap of two rectangles, `None` when they do not overlap
    pub fn intersection(&self, other: &MapRect) -> Option<MapRect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = (self.x + self.width).min(other.x + other.width);
        let bottom = (self.y + self.height).min(other.y + other.height);
        (right > x && bottom > y).then(|| MapRect::new(x, y, right - x, bottom - y))
    }
}

/// Bresenham walk between two grid cells, both ends included
#[derive(Debug, Clone)]
pub struct CellWalk {
    current: MapPoint,
    to: MapPoint,
    dx: i32,
    dy: i32,
    sx: i32,
    sy: i32,
    error: i32,
    done: bool,
}

impl CellWalk {
    /// Walk from `from` to `to`
    pub fn new(from: MapPoint, to: MapPoint) -> Self {
        let dx = (to.x - from.x).abs();
        let dy = (to.y - from.y).abs();
        Self {
            current: from,
            to,
            dx,
            dy,
            sx: if from.x < to.x { 1 } else { -1 },
            sy: if from.y < to.y { 1 } else { -1 },
            error: dx - dy,
            done: false,
        }
    }

    /// Offset to the neighbours across the dominant stepping axis
    pub fn neighbour_offset(&self) -> (i32, i32) {
        if self.dx < self.dy {
            (1, 0)
        } else {
            (0, 1)
        }
    }
}

impl Iterator for CellWalk {
    type Item = MapPoint;

    fn next(&mut self) -> Option<MapPoint> {
        if self.done {
            return None;
        }
        let cell = self.current;
        if cell == self.to {
            self.done = true;
            return Some(cell);
        }
        let error2 = 2 * self.error;
        if error2 > -self.dy {
            self.error -= self.dy;
            self.current.x += self.sx;
        }
        if error2 < self.dx {
            self.error += self.dx;
            self.current.y += self.sy;
        }
        Some(cell)
    }
}

/// XZ components of a world position
pub fn xz(point: &Vec3) -> Vec2 {
    Vec2::new(point.x, point.z)
}

/// Heightfield spatial index
#[derive(Debug, Clone)]
pub struct Terrain {
    width: usize,
    height: usize,
    size: Vec3,
    offset: Vec3,
    to_map_factor: Vec2,
    vertices: Vec<TerrainVertex>,
}

impl Terrain {
    /// Build a terrain from 8-bit height samples in row-major order.
    ///
    /// Sample `s` at `(w, h)` becomes the vertex
    /// `offset + (w·size.x/width, s·size.y/256, h·size.z/height)`.
    pub fn from_heights(
        width: usize,
        height: usize,
        samples: &[u8],
        size: Vec3,
        offset: Vec3,
        smoothing_passes: u32,
    ) -> Result<Self, TerrainError> {
        if width < 2 || height < 2 {
            return Err(TerrainError::MapTooSmall { width, height });
        }
        if samples.len() != width * height {
            return Err(TerrainError::SampleCount {
                expected: width * height,
                actual: samples.len(),
            });
        }

        let mut heights: Vec<f32> = samples
            .iter()
            .map(|&sample| f32::from(sample) * (size.y / 256.0))
            .collect();
        for _ in 0..smoothing_passes {
            heights = smoothed(&heights, width, height);
        }

        let cell = Vec2::new(size.x / width as f32, size.z / height as f32);
        let positions: Vec<Vec3> = (0..height)
            .flat_map(|h| (0..width).map(move |w| (w, h)))
            .map(|(w, h)| offset + Vec3::new(w as f32 * cell.x, heights[w + h * width], h as f32 * cell.y))
            .collect();

        let position = |w: usize, h: usize| positions[w + h * width];
        let vertices = (0..height)
            .flat_map(|h| (0..width).map(move |w| (w, h)))
            .map(|(w, h)| {
                let normal = if w + 1 < width && h + 1 < height {
                    Triangle::new(position(w, h), position(w, h + 1), position(w + 1, h)).normal()
                } else {
                    Vec3::y()
                };
                TerrainVertex {
                    position: position(w, h).into(),
                    normal: normal.into(),
                    tex_coord: [w as f32, h as f32],
                }
            })
            .collect();

        log::debug!("built {width}x{height} terrain, {smoothing_passes} smoothing passes");

        Ok(Self {
            width,
            height,
            size,
            offset,
            to_map_factor: Vec2::new(width as f32 / size.x, height as f32 / size.z),
            vertices,
        })
    }

    /// Build a terrain from the red channel of a heightmap image
    pub fn from_image(
        path: impl AsRef<Path>,
        size: Vec3,
        offset: Vec3,
        smoothing_passes: u32,
    ) -> Result<Self, TerrainError> {
        let path = path.as_ref();
        let image = image::open(path)?.to_rgb8();
        let (width, height) = image.dimensions();
        log::info!("loaded {width}x{height} heightmap from {}", path.display());

        let samples: Vec<u8> = image.pixels().map(|pixel| pixel.0[0]).collect();
        Self::from_heights(width as usize, height as usize, &samples, size, offset, smoothing_passes)
    }

    /// Grid columns
    pub fn map_width(&self) -> usize {
        self.width
    }

    /// Grid rows
    pub fn map_height(&self) -> usize {
        self.height
    }

    /// World extent
    pub fn size(&self) -> Vec3 {
        self.size
    }

    /// World position of vertex (0, 0) at sample height 0
    pub fn offset(&self) -> Vec3 {
        self.offset
    }

    /// Grid cells per world unit on X and Z
    pub fn to_map_factor(&self) -> Vec2 {
        self.to_map_factor
    }

    /// All vertices in row-major order
    pub fn vertices(&self) -> &[TerrainVertex] {
        &self.vertices
    }

    /// Vertex buffer as raw bytes for upload
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Vertex position at grid coordinate; panics outside the grid
    pub fn vertex_position(&self, x: usize, y: usize) -> Vec3 {
        Vec3::from(self.vertices[x + y * self.width].position)
    }

    /// Vertex normal at grid coordinate; panics outside the grid
    pub fn vertex_normal(&self, x: usize, y: usize) -> Vec3 {
        Vec3::from(self.vertices[x + y * self.width].normal)
    }

    /// World XZ to fractional map coordinates
    pub fn to_map_f(&self, point: Vec2) -> Vec2 {
        Vec2::new(
            (point.x - self.offset.x) * self.to_map_factor.x,
            (point.y - self.offset.z) * self.to_map_factor.y,
        )
    }

    /// World XZ to the grid cell containing it
    pub fn to_map(&self, point: Vec2) -> MapPoint {
        let map = self.to_map_f(point);
        MapPoint::new(map.x.floor() as i32, map.y.floor() as i32)
    }

    /// World extent to the number of cells needed to cover it
    pub fn to_map_size(&self, size: Vec2) -> (i32, i32) {
        (
            (size.x * self.to_map_factor.x).ceil() as i32,
            (size.y * self.to_map_factor.y).ceil() as i32,
        )
    }

    /// World rectangle to a grid rectangle covering it
    pub fn to_map_rect(&self, min: Vec2, size: Vec2) -> MapRect {
        let origin = self.to_map(min);
        let (width, height) = self.to_map_size(size);
        MapRect::new(origin.x, origin.y, width, height)
    }

    /// Fractional map coordinates to world XZ
    pub fn from_map_f(&self, map: Vec2) -> Vec2 {
        Vec2::new(
            map.x / self.to_map_factor.x + self.offset.x,
            map.y / self.to_map_factor.y + self.offset.z,
        )
    }

    /// Grid coordinate to world XZ
    pub fn from_map(&self, map: MapPoint) -> Vec2 {
        self.from_map_f(Vec2::new(map.x as f32, map.y as f32))
    }

    /// Cell counts to world extent
    pub fn from_map_size(&self, width: i32, height: i32) -> Vec2 {
        Vec2::new(width as f32 / self.to_map_factor.x, height as f32 / self.to_map_factor.y)
    }

    fn cell_triangle(&self, cell_x: usize, cell_y: usize, fraction: Vec2) -> Triangle {
        if fraction.x + fraction.y < 1.0 {
            self.lower_triangle(cell_x, cell_y)
        } else {
            self.upper_triangle(cell_x, cell_y)
        }
    }

    fn lower_triangle(&self, x: usize, y: usize) -> Triangle {
        Triangle::new(
            self.vertex_position(x, y),
            self.vertex_position(x, y + 1),
            self.vertex_position(x + 1, y),
        )
    }

    fn upper_triangle(&self, x: usize, y: usize) -> Triangle {
        Triangle::new(
            self.vertex_position(x + 1, y + 1),
            self.vertex_position(x + 1, y),
            self.vertex_position(x, y + 1),
        )
    }

    fn clamp_cell(&self, x: i32, y: i32) -> (usize, usize) {
        let max_x = (self.width - 2) as i32;
        let max_y = (self.height - 2) as i32;
        (x.clamp(0, max_x) as usize, y.clamp(0, max_y) as usize)
    }

    /// Triangle under fractional map position, `None` outside the grid
    pub fn try_triangle(&self, map: Vec2) -> Option<Triangle> {
        let cell = Vec2::new(map.x.floor(), map.y.floor());
        if cell.x < 0.0 || cell.y < 0.0 || cell.x >= (self.width - 1) as f32 || cell.y >= (self.height - 1) as f32 {
            return None;
        }
        Some(self.cell_triangle(cell.x as usize, cell.y as usize, map - cell))
    }

    /// Triangle under fractional map position, clamped to the nearest cell
    pub fn triangle(&self, map: Vec2) -> Triangle {
        let (x, y) = self.clamp_cell(map.x.floor() as i32, map.y.floor() as i32);
        let fraction = map - Vec2::new(x as f32, y as f32);
        self.cell_triangle(x, y, fraction)
    }

    /// Terrain height at world XZ, `None` outside the grid
    pub fn try_height(&self, point: Vec2) -> Option<f32> {
        self.try_triangle(self.to_map_f(point))
            .map(|triangle| plane_height(&triangle, point))
    }

    /// Terrain height at world XZ, clamped to the grid
    pub fn height(&self, point: Vec2) -> f32 {
        plane_height(&self.triangle(self.to_map_f(point)), point)
    }

    /// Face normal at world XZ, `None` outside the grid
    pub fn try_normal(&self, point: Vec2) -> Option<Vec3> {
        self.try_triangle(self.to_map_f(point)).map(|triangle| triangle.normal())
    }

    /// Face normal at world XZ, clamped to the grid
    pub fn normal(&self, point: Vec2) -> Vec3 {
        self.triangle(self.to_map_f(point)).normal()
    }

    /// Height of `point` above the terrain, `None` outside the grid
    pub fn try_height_above_ground(&self, point: &Vec3) -> Option<f32> {
        self.try_height(xz(point)).map(|ground| point.y - ground)
    }

    /// Height of `point` above the clamped terrain
    pub fn height_above_ground(&self, point: &Vec3) -> f32 {
        point.y - self.height(xz(point))
    }

    /// Rotation turning `from` onto the terrain normal at world XZ
    pub fn normal_rotation(&self, point: Vec2, from: &Vec3) -> Quat {
        utils::rotation_from_to(from, &self.normal(point))
    }

    /// Nearest hit of the segment `origin + direction * t`, `0 < t < length`.
    ///
    /// Walks the grid cells under the part of the segment that lies over
    /// the map, testing each visited cell together with its two neighbours
    /// across the dominant stepping axis, and stops at the first cell with
    /// a hit. Returns the distance and the terrain normal at the hit point.
    pub fn intersect_line(&self, origin: &Vec3, direction: &Vec3, length: f32) -> Option<(f32, Vec3)> {
        let walk = self.line_cells(origin, direction, length)?;
        let (ox, oy) = walk.neighbour_offset();
        let ray = Ray::new(*origin, *direction);

        let mut nearest = length;
        for cell in walk {
            let mut hit = false;
            for (cx, cy) in [(cell.x, cell.y), (cell.x + ox, cell.y + oy), (cell.x - ox, cell.y - oy)] {
                hit |= self.intersect_quad(&ray, cx, cy, &mut nearest);
            }
            if hit {
                let point = ray.point_at(nearest);
                return Some((nearest, self.normal(xz(&point))));
            }
        }
        None
    }

    /// Cells under the segment `origin + direction * t`, `0 <= t <= length`,
    /// clipped to the grid.
    ///
    /// `None` when the segment never passes over the map. The walk visits
    /// at most `map_width() + map_height()` cells whatever the length.
    pub fn line_cells(&self, origin: &Vec3, direction: &Vec3, length: f32) -> Option<CellWalk> {
        let start = self.to_map_f(xz(origin));
        let step = Vec2::new(direction.x * self.to_map_factor.x, direction.z * self.to_map_factor.y);
        let max = Vec2::new((self.width - 1) as f32, (self.height - 1) as f32);

        // Liang-Barsky against [0, max] in map space, parametrised by t
        let (mut enter, mut leave) = (0.0f32, length);
        for axis in 0..2 {
            for (p, q) in [(-step[axis], start[axis]), (step[axis], max[axis] - start[axis])] {
                if p == 0.0 {
                    if q < 0.0 {
                        return None;
                    }
                } else if p < 0.0 {
                    enter = enter.max(q / p);
                } else {
                    leave = leave.min(q / p);
                }
            }
        }
        if enter > leave {
            return None;
        }

        let at = |t: f32| {
            // axes without movement keep the start even for an unbounded t
            let point = start.zip_map(&step, |s, d| if d == 0.0 { s } else { s + d * t });
            let point = point.zip_map(&max, |c, m| c.clamp(0.0, m));
            let (x, y) = self.clamp_cell(point.x.floor() as i32, point.y.floor() as i32);
            MapPoint::new(x as i32, y as i32)
        };
        Some(CellWalk::new(at(enter), at(leave)))
    }

    fn intersect_quad(&self, ray: &Ray, x: i32, y: i32, nearest: &mut f32) -> bool {
        let (x, y) = self.clamp_cell(x, y);
        let mut hit = false;
        for triangle in [self.lower_triangle(x, y), self.upper_triangle(x, y)] {
            if let Some(t) = triangle.intersect_ray(ray) {
                if t > 0.0 && t < *nearest {
                    *nearest = t;
                    hit = true;
                }
            }
        }
        hit
    }

    /// Index buffer drawing the full map as one triangle strip per row
    pub fn strip_indices(&self) -> Vec<u32> {
        let width = self.width as u32;
        (0..self.height as u32 - 1)
            .flat_map(|h| (0..width).flat_map(move |w| [w + h * width, w + (h + 1) * width]))
            .collect()
    }

    /// Clip `rect` to the drawable cells, `None` when nothing remains
    pub fn clip_patch(&self, rect: &MapRect) -> Option<MapRect> {
        let cells = MapRect::new(0, 0, self.width as i32 - 1, self.height as i32 - 1);
        rect.intersection(&cells)
    }

    /// Ranges into [`Terrain::strip_indices`], one strip per row of the
    /// clipped `rect`
    pub fn patch_ranges(&self, rect: &MapRect) -> Vec<Range<usize>> {
        let Some(rect) = self.clip_patch(rect) else {
            return Vec::new();
        };
        (rect.y..rect.y + rect.height)
            .map(|row| {
                let start = 2 * (rect.x as usize + self.width * row as usize);
                start..start + 2 * rect.width as usize + 2
            })
            .collect()
    }
}

/// 3x3 weighted blur (center 4, neighbours 1); border samples are kept
fn smoothed(heights: &[f32], width: usize, height: usize) -> Vec<f32> {
    let mut out = heights.to_vec();
    let at = |w: usize, h: usize| heights[w + h * width];
    for h in 1..height.saturating_sub(1) {
        for w in 1..width - 1 {
            let neighbours = at(w - 1, h - 1) + at(w, h - 1) + at(w + 1, h - 1)
                + at(w - 1, h) + at(w + 1, h)
                + at(w - 1, h + 1) + at(w, h + 1) + at(w + 1, h + 1);
            out[w + h * width] = (neighbours + 4.0 * at(w, h)) / 12.0;
        }
    }
    out
}

fn plane_height(triangle: &Triangle, point: Vec2) -> f32 {
    let normal = triangle.normal();
    let p = triangle.p;
    (normal.x * (point.x - p.x) + normal.z * (point.y - p.z)) / -normal.y + p.y
}
