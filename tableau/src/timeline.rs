//! Choreography timeline.
//!
//! A run walks an ordered list of stages. Each stage finishes before the next
//! one is entered, and a run that is in flight cannot be restarted.

use std::time::Duration;

use crate::camera::CameraPose;
use crate::motion::{Motion, MotionKind, MotionStatus};
use crate::variants::VariantTable;

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Motion {
        kind: MotionKind,
        duration: Duration,
    },
    /// Puts the camera back where it was when the run started.
    Restore,
    /// Advances the visible variant `count` times: once on entry, then once
    /// per `interval`.
    VariantSteps { count: u32, interval: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineStatus {
    Idle,
    Running,
    /// Reported once, on the tick the last stage completed.
    Finished,
}

#[derive(Debug)]
enum Active {
    Motion(Motion),
    Steps {
        remaining: u32,
        interval: Duration,
        since_last: Duration,
    },
}

#[derive(Debug)]
struct Run {
    cursor: usize,
    reference: CameraPose,
    active: Option<Active>,
}

impl Run {
    /// Enters stages from `cursor` on, applying the instantaneous ones, until
    /// one needs time to complete or the list runs out.
    fn enter<H: Copy + PartialEq>(
        &mut self,
        stages: &[Stage],
        mut cursor: usize,
        camera: &mut CameraPose,
        variants: &mut VariantTable<H>,
    ) {
        self.active = None;
        while let Some(stage) = stages.get(cursor) {
            log::trace!("entering stage {}: {:?}", cursor, stage);
            match stage {
                Stage::Restore => *camera = self.reference,
                Stage::Motion { kind, duration } => {
                    self.active = Some(Active::Motion(Motion::begin(
                        kind.clone(),
                        *duration,
                        camera,
                    )));
                }
                Stage::VariantSteps { count, interval } => {
                    if *count > 0 {
                        variants.advance();
                    }
                    if *count > 1 {
                        self.active = Some(Active::Steps {
                            remaining: count - 1,
                            interval: *interval,
                            since_last: Duration::ZERO,
                        });
                    }
                }
            }
            if self.active.is_some() {
                break;
            }
            cursor += 1;
        }
        self.cursor = cursor;
    }

    /// Returns `true` once every stage has completed.
    fn advance<H: Copy + PartialEq>(
        &mut self,
        stages: &[Stage],
        dt: Duration,
        camera: &mut CameraPose,
        variants: &mut VariantTable<H>,
    ) -> bool {
        let stage_done = match self.active.as_mut() {
            None => return true,
            Some(Active::Motion(motion)) => motion.advance(dt, camera) == MotionStatus::Done,
            Some(Active::Steps {
                remaining,
                interval,
                since_last,
            }) => {
                *since_last += dt;
                while *remaining > 0 && *since_last >= *interval {
                    variants.advance();
                    *remaining -= 1;
                    *since_last -= *interval;
                }
                *remaining == 0
            }
        };

        if stage_done {
            self.enter(stages, self.cursor + 1, camera, variants);
        }
        self.active.is_none()
    }
}

#[derive(Debug, Default)]
pub struct Timeline {
    stages: Vec<Stage>,
    run: Option<Run>,
}

impl Timeline {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages, run: None }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn is_animating(&self) -> bool {
        self.run.is_some()
    }

    /// Starts a run from the current camera pose. Does nothing and returns
    /// `false` while another run is in flight.
    pub fn start<H: Copy + PartialEq>(
        &mut self,
        camera: &mut CameraPose,
        variants: &mut VariantTable<H>,
    ) -> bool {
        if self.run.is_some() {
            log::debug!("choreography already running, ignoring start");
            return false;
        }
        if self.stages.is_empty() {
            log::warn!("choreography has no stages");
            return false;
        }

        let mut run = Run {
            cursor: 0,
            reference: *camera,
            active: None,
        };
        run.enter(&self.stages, 0, camera, variants);
        self.run = Some(run);
        true
    }

    pub fn advance<H: Copy + PartialEq>(
        &mut self,
        dt: Duration,
        camera: &mut CameraPose,
        variants: &mut VariantTable<H>,
    ) -> TimelineStatus {
        let run = match self.run.as_mut() {
            Some(run) => run,
            None => return TimelineStatus::Idle,
        };
        if run.advance(&self.stages, dt, camera, variants) {
            self.run = None;
            TimelineStatus::Finished
        } else {
            TimelineStatus::Running
        }
    }
}
