use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};
use tableau::assets::Mesh;
use tableau::ModelPlacement;

use crate::framebuffer::Framebuffer;

/// A placed mesh, drawn as a wireframe.
struct Renderable {
    positions: Vec<Vec3>,
    edges: Vec<[u32; 2]>,
    transform: Mat4,
    color: [u8; 4],
}

/// Owns everything that has been loaded. Handles are indices into it and
/// stay valid for the whole session.
#[derive(Default)]
pub struct Scene {
    renderables: Vec<Renderable>,
}

impl Scene {
    pub fn add(&mut self, mesh: &Mesh, placement: ModelPlacement, color: [u8; 4]) -> usize {
        self.renderables.push(Renderable {
            positions: mesh.positions.clone(),
            edges: mesh.edges(),
            transform: mesh.fit_transform(placement.size, &placement.pose),
            color,
        });
        self.renderables.len() - 1
    }

    pub fn len(&self) -> usize {
        self.renderables.len()
    }

    pub fn render<I>(&self, frame: &mut Framebuffer, view_projection: Mat4, handles: I)
    where
        I: IntoIterator<Item = usize>,
    {
        let (width, height) = (frame.width() as f32, frame.height() as f32);
        for handle in handles {
            let renderable = match self.renderables.get(handle) {
                Some(r) => r,
                None => continue,
            };
            let mvp = view_projection * renderable.transform;
            let screen: Vec<Option<Vec2>> = renderable
                .positions
                .iter()
                .map(|p| {
                    let clip = mvp * p.extend(1.0);
                    // Behind the near plane.
                    if clip.w <= 1e-3 {
                        return None;
                    }
                    let ndc = clip.xy() / clip.w;
                    Some(Vec2::new(
                        (ndc.x + 1.0) * 0.5 * width,
                        (1.0 - ndc.y) * 0.5 * height,
                    ))
                })
                .collect();

            for [a, b] in &renderable.edges {
                if let (Some(from), Some(to)) = (screen[*a as usize], screen[*b as usize]) {
                    frame.draw_line(from, to, renderable.color);
                }
            }
        }
    }
}
