//! Slot poses for the two fixed layouts of the tableau.
//!
//! Everything in here is a pure function of the slot index and the layout
//! parameters, so the same index always lands on the same pose.

use std::f32::consts::{PI, TAU};

use glam::{Mat3, Quat, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Pose {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            orientation: Quat::IDENTITY,
        }
    }

    /// Orientation whose local +Z axis points from `position` to `focus`.
    pub fn looking_at(position: Vec3, focus: Vec3) -> Self {
        let z = (focus - position).normalize_or_zero();
        let x = Vec3::Y.cross(z).normalize_or_zero();
        let orientation = if z == Vec3::ZERO || x == Vec3::ZERO {
            Quat::IDENTITY
        } else {
            let y = z.cross(x);
            Quat::from_mat3(&Mat3::from_cols(x, y, z))
        };
        Self {
            position,
            orientation,
        }
    }

    /// Rotates about the local vertical axis.
    pub fn turned(self, angle: f32) -> Self {
        Self {
            position: self.position,
            orientation: self.orientation * Quat::from_rotation_y(angle),
        }
    }
}

pub trait Layout {
    fn len(&self) -> usize;
    fn placement(&self, index: usize) -> Pose;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Subjects stand on an arch that rises toward its centre and face a shared
/// focal point.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchLayout {
    pub radius: f32,
    pub height: f32,
    pub angles_deg: Vec<f32>,
    pub max_angle_deg: f32,
    pub dampening: f32,
    pub focus_height_factor: f32,
}

impl ArchLayout {
    pub fn focal_point(&self) -> Vec3 {
        Vec3::new(0.0, self.height * self.focus_height_factor, 0.0)
    }

    /// Slot position without any orientation. Props anchored to a subject
    /// use this as their base.
    pub fn position(&self, index: usize) -> Vec3 {
        let angle_deg = self.angles_deg[index];
        let angle = angle_deg.to_radians();
        let rise = 1.0 - angle_deg.abs() / self.max_angle_deg * self.dampening;
        Vec3::new(angle.sin() * self.radius, self.height * rise, angle.cos() * self.radius)
    }
}

impl Layout for ArchLayout {
    fn len(&self) -> usize {
        self.angles_deg.len()
    }

    /// Panics if `index` is outside the arch.
    fn placement(&self, index: usize) -> Pose {
        // Models are authored facing -Z, so after looking at the focal point
        // they still need half a turn to show their front.
        Pose::looking_at(self.position(index), self.focal_point()).turned(PI)
    }
}

/// Props scattered on a flattened ring in front of the viewer.
#[derive(Debug, Clone, PartialEq)]
pub struct RingLayout {
    pub count: usize,
    pub radius: f32,
    pub base_y: f32,
    pub base_z: f32,
    pub skew: f32,
    /// Per-index height offsets; missing entries mean no offset.
    pub y_offsets: Vec<f32>,
}

impl Layout for RingLayout {
    fn len(&self) -> usize {
        self.count
    }

    fn placement(&self, index: usize) -> Pose {
        let angle = TAU * index as f32 / self.count as f32;
        let y_offset = self.y_offsets.get(index).copied().unwrap_or(0.0);
        Pose::at(Vec3::new(
            angle.cos() * self.radius,
            self.base_y + y_offset,
            self.base_z + angle.sin() * self.radius * self.skew,
        ))
    }
}

/// One stop of the waypoint arc: where the camera goes and what it looks at
/// while travelling there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub position: Vec3,
    pub target: Vec3,
}

/// A camera stop per arch slot, standing `standoff` away from the origin on
/// the opposite side of the slot and `lift` above it.
pub fn arc_waypoints(arch: &ArchLayout, standoff: f32, lift: f32) -> Vec<Waypoint> {
    (0..arch.len())
        .map(|index| {
            let slot = arch.position(index);
            let direction = slot.normalize_or_zero();
            Waypoint {
                position: Vec3::new(
                    -direction.x * standoff,
                    slot.y + lift,
                    -direction.z * standoff,
                ),
                target: slot,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arch() -> ArchLayout {
        ArchLayout {
            radius: 6.0,
            height: 2.0,
            angles_deg: vec![-60.0, -30.0, 0.0, 30.0, 60.0],
            max_angle_deg: 60.0,
            dampening: 0.5,
            focus_height_factor: 0.5,
        }
    }

    fn ring() -> RingLayout {
        RingLayout {
            count: 6,
            radius: 3.5,
            base_y: 0.0,
            base_z: 3.0,
            skew: 0.3,
            y_offsets: vec![0.0, 0.0, 0.0, 0.0, -0.5, -0.5],
        }
    }

    #[test]
    fn test_arch_centre_is_highest() {
        let arch = arch();
        let centre = arch.placement(2).position;
        assert!(centre.x.abs() < 1e-6);
        assert_eq!(centre.y, 2.0);
        assert_eq!(centre.z, 6.0);

        let edge = arch.placement(0).position;
        assert_eq!(edge.y, 1.0);
        assert!((edge.x + 6.0 * (60.0f32).to_radians().sin()).abs() < 1e-5);
        assert_eq!(arch.placement(1).position.y, 1.5);
    }

    #[test]
    fn test_arch_model_front_faces_focal_point() {
        let arch = arch();
        for index in 0..arch.len() {
            let pose = arch.placement(index);
            let front = pose.orientation * Vec3::NEG_Z;
            let to_focus = (arch.focal_point() - pose.position).normalize();
            assert!(front.dot(to_focus) > 0.999, "slot {}", index);
        }
    }

    #[test]
    fn test_placement_is_deterministic() {
        let arch = arch();
        let ring = ring();
        for index in 0..5 {
            assert_eq!(arch.placement(index), arch.placement(index));
            assert_eq!(
                arch.placement(index).position.to_array(),
                arch.clone().placement(index).position.to_array()
            );
        }
        for index in 0..6 {
            assert_eq!(ring.placement(index), ring.placement(index));
        }
    }

    #[test]
    fn test_ring_positions() {
        let ring = ring();
        let first = ring.placement(0).position;
        assert_eq!(first, Vec3::new(3.5, 0.0, 3.0));
        assert_eq!(ring.placement(4).position.y, -0.5);
        assert_eq!(ring.placement(3).position.y, 0.0);
        let quarter = RingLayout { count: 4, ..ring }.placement(1).position;
        assert!((quarter.z - (3.0 + 3.5 * 0.3)).abs() < 1e-6);
    }

    #[test]
    fn test_arc_waypoints_stand_opposite_their_slot() {
        let arch = arch();
        let waypoints = arc_waypoints(&arch, 8.0, 1.0);
        assert_eq!(waypoints.len(), 5);
        let centre = waypoints[2];
        assert!(centre.position.x.abs() < 1e-5);
        assert_eq!(centre.position.y, 3.0);
        // The slot direction includes its height, so the horizontal standoff shrinks.
        assert!((centre.position.z + 48.0 / 40f32.sqrt()).abs() < 1e-5);
        assert_eq!(centre.target, arch.position(2));
    }
}
