use glam::Vec2;
use rayon::prelude::*;
use tableau::assets::Texture;
use tableau::{CameraLens, CameraPose};

/// RGBA32 pixels, uploaded to a streaming texture once per frame.
pub struct Framebuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Framebuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; (4 * width * height) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pitch(&self) -> usize {
        4 * self.width as usize
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn clear(&mut self, color: [u8; 4]) {
        self.pixels
            .par_chunks_mut(4)
            .for_each(|pixel| pixel.copy_from_slice(&color));
    }

    /// Fills the frame with the part of an equirectangular panorama the camera
    /// currently looks at. One row per task.
    pub fn paint_backdrop(&mut self, texture: &Texture, camera: &CameraPose, lens: &CameraLens) {
        let forward = (camera.target - camera.position).normalize_or_zero();
        let right = forward.cross(glam::Vec3::Y).normalize_or_zero();
        let up = right.cross(forward);
        let half_height = (lens.fov * 0.5).tan();
        let half_width = half_height * self.width as f32 / self.height as f32;
        let (width, height) = (self.width as f32, self.height as f32);
        let pitch = self.pitch();

        self.pixels
            .par_chunks_mut(pitch)
            .enumerate()
            .for_each(|(y, row)| {
                let ndc_y = 1.0 - 2.0 * (y as f32 + 0.5) / height;
                for (x, pixel) in row.chunks_mut(4).enumerate() {
                    let ndc_x = 2.0 * (x as f32 + 0.5) / width - 1.0;
                    let direction =
                        forward + right * (ndc_x * half_width) + up * (ndc_y * half_height);
                    pixel.copy_from_slice(&texture.sample_direction(direction));
                }
            });
    }

    /// Bresenham line; pixels outside the frame are skipped.
    pub fn draw_line(&mut self, from: Vec2, to: Vec2, color: [u8; 4]) {
        let limit = 4.0 * self.width.max(self.height) as f32;
        if from.abs().max_element() > limit || to.abs().max_element() > limit {
            return;
        }

        let (mut x0, mut y0) = (from.x as i32, from.y as i32);
        let (x1, y1) = (to.x as i32, to.y as i32);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut error = dx + dy;
        loop {
            self.put(x0, y0, color);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let doubled = 2 * error;
            if doubled >= dy {
                error += dy;
                x0 += sx;
            }
            if doubled <= dx {
                error += dx;
                y0 += sy;
            }
        }
    }

    fn put(&mut self, x: i32, y: i32, color: [u8; 4]) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let index = (x as usize + y as usize * self.width as usize) * 4;
        self.pixels[index..index + 4].copy_from_slice(&color);
    }
}
