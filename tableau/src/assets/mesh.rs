use glam::{Mat4, Vec3};
use itertools::Itertools;

use crate::placement::Pose;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Vec3>,
    {
        let mut points = points.into_iter();
        let first = *points.next()?;
        Some(points.fold(Self { min: first, max: first }, |bb, p| Self {
            min: bb.min.min(*p),
            max: bb.max.max(*p),
        }))
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
}

impl Mesh {
    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(&self.positions)
    }

    /// Model matrix that centres the mesh on its bounds, scales its largest
    /// dimension to `size` and then applies `pose`.
    pub fn fit_transform(&self, size: f32, pose: &Pose) -> Mat4 {
        let (center, extent) = self
            .bounds()
            .map(|bb| (bb.center(), bb.size().max_element()))
            .unwrap_or((Vec3::ZERO, 0.0));
        let scale = if extent > 0.0 { size / extent } else { 1.0 };
        Mat4::from_scale_rotation_translation(Vec3::splat(scale), pose.orientation, pose.position)
            * Mat4::from_translation(-center)
    }

    /// Unique undirected edges, for wireframe drawing.
    pub fn edges(&self) -> Vec<[u32; 2]> {
        self.triangles
            .iter()
            .flat_map(|&[a, b, c]| [[a, b], [b, c], [c, a]])
            .map(|[a, b]| if a < b { [a, b] } else { [b, a] })
            .unique()
            .collect()
    }
}
