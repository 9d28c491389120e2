//! Camera motions.
//!
//! A motion captures the camera once when it begins and from then on maps
//! elapsed time to a pose. It never schedules itself: whoever drives the
//! frame loop calls [`Motion::advance`] with the frame delta until it reports
//! [`MotionStatus::Done`].

use std::f32::consts::TAU;
use std::time::Duration;

use crate::camera::{CameraPose, SphericalFrame};
use crate::placement::Waypoint;

/// The one easing law every motion uses: quadratic in, quadratic out.
pub fn ease_in_out(p: f32) -> f32 {
    if p < 0.5 {
        2.0 * p * p
    } else {
        1.0 - (-2.0 * p + 2.0).powi(2) / 2.0
    }
}

/// Splits `progress` into `count` equal segments, returning the segment
/// index and the progress local to it.
fn segment(progress: f32, count: usize) -> (usize, f32) {
    let scaled = progress * count as f32;
    let index = (scaled.floor() as usize).min(count - 1);
    (index, (scaled - index as f32).min(1.0))
}

/// Azimuth offset in degrees of a stepped sweep at `progress`.
///
/// Every entry of `angles_deg` is an absolute offset from the start azimuth,
/// reached at the end of its own segment. Segment `k` starts where segment
/// `k - 1` ended, the first one starts at 0.
pub fn stepped_angle_deg(angles_deg: &[f32], progress: f32) -> f32 {
    if angles_deg.is_empty() {
        return 0.0;
    }
    if progress >= 1.0 {
        return angles_deg[angles_deg.len() - 1];
    }
    let (index, local) = segment(progress, angles_deg.len());
    let from = if index == 0 { 0.0 } else { angles_deg[index - 1] };
    let to = angles_deg[index];
    from + (to - from) * ease_in_out(local)
}

#[derive(Debug, Clone, PartialEq)]
pub enum MotionKind {
    /// One eased turn around the target.
    FullRotation,
    /// Back-and-forth glances to absolute azimuth offsets.
    Stepped { angles_deg: Vec<f32> },
    /// Two small loops around the start direction.
    DoubleLoop { radius_deg: f32 },
    /// Straight legs through the waypoints, looking at each leg's target.
    WaypointArc { waypoints: Vec<Waypoint> },
}

impl MotionKind {
    pub fn name(&self) -> &'static str {
        match self {
            MotionKind::FullRotation => "full-rotation",
            MotionKind::Stepped { .. } => "stepped",
            MotionKind::DoubleLoop { .. } => "double-loop",
            MotionKind::WaypointArc { .. } => "waypoint-arc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionStatus {
    Running,
    Done,
}

/// Captured when the motion begins and never recomputed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionState {
    pub start: CameraPose,
    pub frame: SphericalFrame,
}

#[derive(Debug, Clone)]
pub struct Motion {
    kind: MotionKind,
    duration: Duration,
    elapsed: Duration,
    state: MotionState,
}

impl Motion {
    pub fn begin(kind: MotionKind, duration: Duration, camera: &CameraPose) -> Self {
        log::debug!("motion '{}' begins ({:?})", kind.name(), duration);
        Self {
            kind,
            duration,
            elapsed: Duration::ZERO,
            state: MotionState {
                start: *camera,
                frame: camera.spherical(),
            },
        }
    }

    pub fn kind(&self) -> &MotionKind {
        &self.kind
    }

    pub fn state(&self) -> &MotionState {
        &self.state
    }

    pub fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
    }

    pub fn advance(&mut self, dt: Duration, camera: &mut CameraPose) -> MotionStatus {
        self.elapsed = self.elapsed.saturating_add(dt);
        let progress = self.progress();
        if progress < 1.0 {
            *camera = self.sample(progress);
            MotionStatus::Running
        } else {
            *camera = self.terminal();
            log::debug!("motion '{}' done", self.kind.name());
            MotionStatus::Done
        }
    }

    /// Azimuth and polar offsets from the captured start direction, for the
    /// motions that move on the sphere around the target.
    pub fn spherical_offset(&self, progress: f32) -> Option<(f32, f32)> {
        match &self.kind {
            MotionKind::FullRotation => Some((ease_in_out(progress) * TAU, 0.0)),
            MotionKind::Stepped { angles_deg } => {
                Some((stepped_angle_deg(angles_deg, progress).to_radians(), 0.0))
            }
            MotionKind::DoubleLoop { radius_deg } => {
                let radius = radius_deg.to_radians();
                let angle = ease_in_out(progress) * 2.0 * TAU;
                // cos - 1 keeps the polar offset at exactly zero when the
                // loop starts.
                Some((angle.sin() * radius, (angle.cos() - 1.0) * radius))
            }
            MotionKind::WaypointArc { .. } => None,
        }
    }

    /// Camera pose at `progress`, without touching the elapsed time.
    pub fn sample(&self, progress: f32) -> CameraPose {
        let progress = progress.clamp(0.0, 1.0);
        let start = self.state.start;

        if let MotionKind::WaypointArc { waypoints } = &self.kind {
            if waypoints.is_empty() {
                return start;
            }
            let (index, local) = segment(progress, waypoints.len());
            let from = if index == 0 {
                start.position
            } else {
                waypoints[index - 1].position
            };
            let to = waypoints[index];
            return CameraPose::new(from.lerp(to.position, ease_in_out(local)), to.target);
        }

        let (d_azimuth, d_polar) = self.spherical_offset(progress).unwrap_or((0.0, 0.0));
        let mut frame = self.state.frame;
        frame.azimuth += d_azimuth;
        frame.polar += d_polar;
        if let MotionKind::DoubleLoop { .. } = self.kind {
            frame.polar = frame
                .polar
                .clamp(SphericalFrame::MIN_POLAR, SphericalFrame::MAX_POLAR);
        }
        CameraPose::new(frame.position(start.target), start.target)
    }

    fn terminal(&self) -> CameraPose {
        match &self.kind {
            // Snap back instead of trusting the loop to close numerically.
            MotionKind::DoubleLoop { .. } => self.state.start,
            MotionKind::WaypointArc { waypoints } => waypoints
                .last()
                .map(|last| CameraPose::new(last.position, last.target))
                .unwrap_or(self.state.start),
            _ => self.sample(1.0),
        }
    }
}
