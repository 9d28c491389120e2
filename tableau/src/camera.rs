use glam::{Mat4, Vec3};

/// Where the camera sits and what it looks at. This is the only camera state
/// the engine owns; the renderer samples it once per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub target: Vec3,
}

impl Default for CameraPose {
    fn default() -> Self {
        Self {
            position: Vec3::new(3.0, 3.0, 5.0),
            target: Vec3::ZERO,
        }
    }
}

impl CameraPose {
    pub fn new(position: Vec3, target: Vec3) -> Self {
        Self { position, target }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    pub fn spherical(&self) -> SphericalFrame {
        SphericalFrame::capture(self.position, self.target)
    }

    /// Orbit around the target. Used for interactive control only, never while
    /// a choreography owns the camera.
    pub fn orbit(&mut self, d_azimuth: f32, d_polar: f32) {
        let mut frame = self.spherical();
        frame.azimuth += d_azimuth;
        frame.polar = (frame.polar + d_polar)
            .clamp(SphericalFrame::MIN_POLAR, SphericalFrame::MAX_POLAR);
        self.position = frame.position(self.target);
    }

    pub fn zoom(&mut self, factor: f32) {
        let mut frame = self.spherical();
        frame.distance = (frame.distance * factor).clamp(0.5, 100.0);
        self.position = frame.position(self.target);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraLens {
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraLens {
    fn default() -> Self {
        Self {
            fov: 60.0f32.to_radians(),
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl CameraLens {
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov, aspect, self.near, self.far)
    }
}

/// Camera position relative to a look-at target.
///
/// Azimuth is measured around +Y starting at +Z, polar from +Y down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphericalFrame {
    pub distance: f32,
    pub azimuth: f32,
    pub polar: f32,
}

impl SphericalFrame {
    pub const MIN_POLAR: f32 = 0.1;
    pub const MAX_POLAR: f32 = std::f32::consts::PI - 0.1;

    pub fn capture(position: Vec3, target: Vec3) -> Self {
        let offset = position - target;
        let distance = offset.length();
        let direction = offset.normalize_or_zero();
        Self {
            distance,
            azimuth: direction.x.atan2(direction.z),
            polar: direction.y.clamp(-1.0, 1.0).acos(),
        }
    }

    pub fn position(&self, target: Vec3) -> Vec3 {
        let (sin_polar, cos_polar) = self.polar.sin_cos();
        let (sin_azimuth, cos_azimuth) = self.azimuth.sin_cos();
        target
            + Vec3::new(
                self.distance * sin_polar * sin_azimuth,
                self.distance * cos_polar,
                self.distance * sin_polar * cos_azimuth,
            )
    }
}
