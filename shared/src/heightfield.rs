//! Height-field water surface.
//!
//! Two equally sized texel buffers are used ping-pong style: every kernel pass
//! reads the current buffer, writes the other one in full and then the roles
//! swap. No pass ever reads and writes the same buffer.
//!
//! Surface coordinates `(u, v)` span [0, 1] x [0, 1]; texel `(x, y)` sits at
//! `((x + 0.5) / n, (y + 0.5) / n)`. Anything outside the square reads as flat water.

use crate::config::{EnvironmentConfig, TexelFormat};
use crate::vec3::{cross, normalize, Vec3};
use std::f64::consts::PI;

/// Neighbour pull per step; sets the propagation speed
const PROPAGATION: f32 = 2.0;
/// Per-step velocity damping; keeps the field from ringing forever
const DAMPING: f32 = 0.995;
/// Quantization steps per unit for `TexelFormat::Fixed`
const FIXED_STEPS: f32 = 1024.0;
/// Largest drop strength accepted; keeps every texel finite in f32
pub const MAX_DROP_STRENGTH: f64 = 100.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Texel {
    pub height: f32,
    pub velocity: f32,
    pub normal_x: f32,
    pub normal_z: f32,
}

impl Texel {
    /// Heights truncate toward zero; velocity keeps full precision.
    fn quantized(self, format: TexelFormat) -> Self {
        match format {
            TexelFormat::Float => self,
            TexelFormat::Fixed => {
                let round = |v: f32| (v * FIXED_STEPS).round() / FIXED_STEPS;
                Self {
                    height: (self.height * FIXED_STEPS).trunc() / FIXED_STEPS,
                    velocity: self.velocity,
                    normal_x: round(self.normal_x),
                    normal_z: round(self.normal_z),
                }
            }
        }
    }
}

/// One full-field pass: `dst[i] = kernel(src, x, y)` for every texel.
fn kernel_pass<F>(src: &[Texel], dst: &mut [Texel], n: usize, format: TexelFormat, kernel: F)
where
    F: Fn(&[Texel], usize, usize) -> Texel,
{
    for y in 0..n {
        for x in 0..n {
            dst[y * n + x] = kernel(src, x, y).quantized(format);
        }
    }
}

/// Clamp-to-edge texel fetch.
#[inline]
fn fetch(src: &[Texel], n: usize, x: isize, y: isize) -> Texel {
    let max = n as isize - 1;
    let cx = x.clamp(0, max) as usize;
    let cy = y.clamp(0, max) as usize;
    src[cy * n + cx]
}

pub struct HeightFieldSimulator {
    resolution: usize,
    format: TexelFormat,
    water_size: f64,
    current: Vec<Texel>,
    previous: Vec<Texel>,
    passes: u64,
    disposed: bool,
}

impl HeightFieldSimulator {
    /// A zero resolution is raised to a single texel.
    pub fn new(resolution: usize, water_size: f64, format: TexelFormat) -> Self {
        if resolution == 0 {
            tracing::warn!("Height field resolution 0, using 1");
        }
        let resolution = resolution.max(1);
        let cells = resolution * resolution;
        if format == TexelFormat::Fixed {
            tracing::warn!("Float texels unavailable, height field runs at reduced precision");
        }
        Self {
            resolution,
            format,
            water_size,
            current: vec![Texel::default(); cells],
            previous: vec![Texel::default(); cells],
            passes: 0,
            disposed: false,
        }
    }

    pub fn from_config(config: &EnvironmentConfig) -> Self {
        Self::new(
            config.resolution as usize,
            config.water_size,
            config.texel_format,
        )
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn water_size(&self) -> f64 {
        self.water_size
    }

    /// Current buffer, row-major, for upload to the renderer.
    pub fn texels(&self) -> &[Texel] {
        &self.current
    }

    /// Number of kernel passes run so far (each one swapped the buffers).
    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn run_pass<F>(&mut self, kernel: F)
    where
        F: Fn(&[Texel], usize, usize) -> Texel,
    {
        kernel_pass(
            &self.current,
            &mut self.previous,
            self.resolution,
            self.format,
            kernel,
        );
        std::mem::swap(&mut self.current, &mut self.previous);
        self.passes += 1;
    }

    /// Add a smooth circular bump centred at `(u, v)`. Centres outside the
    /// surface and degenerate drops are ignored; strength is clamped to
    /// `±MAX_DROP_STRENGTH`.
    pub fn add_drop(&mut self, u: f64, v: f64, radius: f64, strength: f64) {
        if self.disposed || !in_unit_square(u, v) {
            return;
        }
        if !(radius.is_finite() && radius > 0.0 && strength.is_finite()) {
            return;
        }
        let strength = strength.clamp(-MAX_DROP_STRENGTH, MAX_DROP_STRENGTH);
        let n = self.resolution;
        let inv_n = 1.0 / n as f64;
        self.run_pass(|src, x, y| {
            let mut t = src[y * n + x];
            let tu = (x as f64 + 0.5) * inv_n;
            let tv = (y as f64 + 0.5) * inv_n;
            let dist = ((tu - u).powi(2) + (tv - v).powi(2)).sqrt();
            let drop = (1.0 - dist / radius).max(0.0);
            let drop = 0.5 - 0.5 * (drop * PI).cos();
            t.height += (drop * strength) as f32;
            t
        });
    }

    /// Advance the damped wave equation by one tick.
    pub fn step(&mut self) {
        if self.disposed {
            return;
        }
        let n = self.resolution;
        self.run_pass(|src, x, y| {
            let (xi, yi) = (x as isize, y as isize);
            let mut t = src[y * n + x];
            let average = (fetch(src, n, xi - 1, yi).height
                + fetch(src, n, xi + 1, yi).height
                + fetch(src, n, xi, yi - 1).height
                + fetch(src, n, xi, yi + 1).height)
                * 0.25;
            t.velocity += (average - t.height) * PROPAGATION;
            t.velocity *= DAMPING;
            t.height += t.velocity;
            t
        });
    }

    /// Rebuild per-texel normals from central height differences.
    pub fn recompute_normals(&mut self) {
        if self.disposed {
            return;
        }
        let n = self.resolution;
        let span = 2.0 / n as f64;
        self.run_pass(|src, x, y| {
            let (xi, yi) = (x as isize, y as isize);
            let mut t = src[y * n + x];
            let dh_u = (fetch(src, n, xi + 1, yi).height - fetch(src, n, xi - 1, yi).height) as f64;
            let dh_v = (fetch(src, n, xi, yi + 1).height - fetch(src, n, xi, yi - 1).height) as f64;
            let along_u = Vec3::new(span, dh_u, 0.0);
            let along_v = Vec3::new(0.0, dh_v, span);
            let normal = normalize(cross(along_v, along_u));
            t.normal_x = normal.x as f32;
            t.normal_z = normal.z as f32;
            t
        });
    }

    /// Bilinearly filtered height at surface coordinates; 0 outside the surface.
    pub fn height_at(&self, u: f64, v: f64) -> f64 {
        if self.disposed || !in_unit_square(u, v) {
            return 0.0;
        }
        let n = self.resolution;
        let max = (n - 1) as f64;
        let fx = (u * n as f64 - 0.5).clamp(0.0, max);
        let fy = (v * n as f64 - 0.5).clamp(0.0, max);
        let (x0, y0) = (fx.floor() as usize, fy.floor() as usize);
        let (x1, y1) = ((x0 + 1).min(n - 1), (y0 + 1).min(n - 1));
        let (tx, ty) = (fx - x0 as f64, fy - y0 as f64);
        let h = |x: usize, y: usize| self.current[y * n + x].height as f64;
        let top = h(x0, y0) * (1.0 - tx) + h(x1, y0) * tx;
        let bottom = h(x0, y1) * (1.0 - tx) + h(x1, y1) * tx;
        top * (1.0 - ty) + bottom * ty
    }

    /// Surface normal of the nearest texel; straight up outside the surface.
    pub fn normal_at(&self, u: f64, v: f64) -> Vec3 {
        if self.disposed || !in_unit_square(u, v) {
            return Vec3::new(0.0, 1.0, 0.0);
        }
        let t = self.current[self.texel_index(u, v)];
        let (nx, nz) = (t.normal_x as f64, t.normal_z as f64);
        Vec3::new(nx, (1.0 - nx * nx - nz * nz).max(0.0).sqrt(), nz)
    }

    /// Map world `(x, z)` onto surface coordinates. The water square is centred at the origin.
    pub fn world_to_uv(&self, x: f64, z: f64) -> (f64, f64) {
        (x / self.water_size + 0.5, z / self.water_size + 0.5)
    }

    pub fn height_at_world(&self, x: f64, z: f64) -> f64 {
        let (u, v) = self.world_to_uv(x, z);
        self.height_at(u, v)
    }

    /// Sum of squared heights.
    pub fn energy(&self) -> f64 {
        self.current
            .iter()
            .map(|t| (t.height as f64) * (t.height as f64))
            .sum()
    }

    /// Release both buffers now rather than at drop. Later calls are no-ops
    /// and queries read as flat water.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.current = Vec::new();
        self.previous = Vec::new();
        self.disposed = true;
        tracing::debug!("Height field disposed after {} passes", self.passes);
    }

    fn texel_index(&self, u: f64, v: f64) -> usize {
        let n = self.resolution;
        let x = ((u * n as f64) as usize).min(n - 1);
        let y = ((v * n as f64) as usize).min(n - 1);
        y * n + x
    }
}

pub fn in_unit_square(u: f64, v: f64) -> bool {
    (0.0..=1.0).contains(&u) && (0.0..=1.0).contains(&v)
}
