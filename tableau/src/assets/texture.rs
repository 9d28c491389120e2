use std::f32::consts::{PI, TAU};
use std::fmt;
use std::path::Path;

use glam::{Vec2, Vec3};

use crate::error::AssetError;

#[derive(Clone)]
pub struct Texture {
    colors: Vec<[u8; 4]>,
    width: usize,
    height: usize,
}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl Texture {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Texture, AssetError> {
        let path = path.as_ref();
        let img = image::open(path)
            .map_err(|source| AssetError::Image {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgba8();
        let width = img.width() as usize;
        let height = img.height() as usize;
        let colors = img.pixels().map(|p| p.0).collect();
        Ok(Self {
            colors,
            width,
            height,
        })
    }

    /// Row-major pixels, top row first.
    pub fn from_pixels(width: usize, height: usize, colors: Vec<[u8; 4]>) -> Self {
        assert_eq!(colors.len(), width * height);
        Self {
            colors,
            width,
            height,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Nearest texel, wrapping in both directions. `v` grows upward.
    pub fn sample(&self, uv: Vec2) -> [u8; 4] {
        let x = (uv.x * self.width as f32).floor() as i64;
        let y = ((1.0 - uv.y) * self.height as f32).floor() as i64;
        let x = x.rem_euclid(self.width as i64) as usize;
        let y = y.rem_euclid(self.height as i64) as usize;
        self.color_at(x, y)
    }

    /// Looks up an equirectangular panorama in world direction `direction`.
    pub fn sample_direction(&self, direction: Vec3) -> [u8; 4] {
        let direction = direction.normalize_or_zero();
        let u = direction.z.atan2(direction.x) / TAU + 0.5;
        let v = direction.y.clamp(-1.0, 1.0).asin() / PI + 0.5;
        self.sample(Vec2::new(u, v))
    }

    fn color_at(&self, x: usize, y: usize) -> [u8; 4] {
        self.colors[x + y * self.width]
    }
}
