//! The orchestration context.
//!
//! One [`Orchestrator`] lives for the whole session. It owns the loading
//! barrier, the variant table, the camera and the choreography timeline, and
//! is driven from a single thread: load completions, user triggers and frame
//! ticks all come in through `&mut self`.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Duration;

use itertools::Itertools;

use crate::assets::AssetKind;
use crate::backdrop::BackdropRotator;
use crate::barrier::{Barrier, ChannelStatus, Progress};
use crate::camera::{CameraLens, CameraPose};
use crate::config::TableauConfig;
use crate::error::{AssetError, BarrierError, Result};
use crate::placement::{ArchLayout, Layout, Pose, RingLayout};
use crate::timeline::{Timeline, TimelineStatus};
use crate::variants::VariantTable;

pub const FACES_CHANNEL: &str = "faces";
pub const BACKDROP_CHANNEL: &str = "backdrop";
pub const CAMERA_CHANNEL: &str = "camera";

/// Channel names prop groups may not use.
pub const RESERVED_CHANNELS: [&str; 3] = [FACES_CHANNEL, BACKDROP_CHANNEL, CAMERA_CHANNEL];

pub fn face_channel(subject: &str, variant: &str) -> String {
    format!("face:{}:{}", subject, variant)
}

/// Identifies what a load was for when its completion comes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadTicket {
    Face { subject: usize, variant: usize },
    Prop { group: usize, item: usize },
    Backdrop { index: usize },
}

/// Where a loaded model goes and how large it ends up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPlacement {
    pub pose: Pose,
    pub size: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub ticket: LoadTicket,
    pub path: PathBuf,
    pub kind: AssetKind,
    /// `None` for backdrops.
    pub placement: Option<ModelPlacement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    /// Every channel is satisfied. Emitted once.
    Ready,
    VariantChanged(usize),
    ChoreographyStarted,
    ChoreographyFinished,
    BackdropChanged(PathBuf),
}

pub struct Orchestrator<H> {
    config: TableauConfig,
    arch: ArchLayout,
    ring: RingLayout,
    barrier: Barrier,
    variants: VariantTable<H>,
    faces_reported: usize,
    props_reported: Vec<Vec<bool>>,
    props: Vec<H>,
    camera: CameraPose,
    lens: CameraLens,
    timeline: Timeline,
    backdrops: BackdropRotator,
    events: VecDeque<SceneEvent>,
}

impl<H: Copy + PartialEq> Orchestrator<H> {
    pub fn new(config: TableauConfig) -> Result<Self> {
        config.validate()?;

        let variant_table = VariantTable::new(config.subjects.len(), config.variants.len());
        let channels = variant_table
            .coordinates()
            .map(|(s, v)| face_channel(&config.subjects[s], &config.variants[v].key))
            .chain(std::iter::once(FACES_CHANNEL.to_string()))
            .chain(config.props.iter().map(|group| group.name.clone()))
            .chain(std::iter::once(BACKDROP_CHANNEL.to_string()))
            .chain(std::iter::once(CAMERA_CHANNEL.to_string()));
        let barrier = Barrier::new(channels)?;
        log::debug!("registered {} channels", barrier.len());

        Ok(Self {
            arch: config.arch_layout(),
            ring: config.ring_layout(),
            barrier,
            variants: variant_table,
            faces_reported: 0,
            props_reported: config
                .props
                .iter()
                .map(|group| vec![false; group.items.len()])
                .collect(),
            props: Vec::new(),
            camera: CameraPose::default(),
            lens: config.lens(),
            timeline: Timeline::new(config.stages()),
            backdrops: BackdropRotator::default(),
            events: VecDeque::new(),
            config,
        })
    }

    /// Every face cell and prop item that has to be loaded.
    pub fn load_plan(&self) -> Vec<LoadRequest> {
        let faces = self.variants.coordinates().map(|(subject, variant)| LoadRequest {
            ticket: LoadTicket::Face { subject, variant },
            path: self.config.face_path(subject, variant),
            kind: AssetKind::Mesh,
            placement: Some(ModelPlacement {
                pose: self.arch.placement(subject),
                size: self.config.arch.subject_size,
            }),
        });
        let props = self.config.props.iter().enumerate().flat_map(|(group, config)| {
            config.items.iter().enumerate().map(move |(item, prop)| LoadRequest {
                ticket: LoadTicket::Prop { group, item },
                path: self.config.resolve(&prop.path),
                kind: AssetKind::Mesh,
                placement: Some(ModelPlacement {
                    pose: prop.pose(&self.arch, &self.ring),
                    size: prop.size,
                }),
            })
        });
        faces.chain(props).collect()
    }

    fn mark(&mut self, channel: &str) -> Result<Progress, BarrierError> {
        let progress = self.barrier.mark_satisfied(channel)?;
        if progress == Progress::Completed {
            self.events.push_back(SceneEvent::Ready);
        }
        Ok(progress)
    }

    /// Reports the outcome of a model load. A failed load still counts as
    /// reported, so one missing file never holds the scene back. Reporting
    /// the same ticket twice has no effect.
    pub fn complete(
        &mut self,
        ticket: LoadTicket,
        result: Result<H, AssetError>,
    ) -> Result<(), BarrierError> {
        match ticket {
            LoadTicket::Face { subject, variant } => self.complete_face(subject, variant, result),
            LoadTicket::Prop { group, item } => self.complete_prop(group, item, result),
            LoadTicket::Backdrop { index } => self.backdrop_loaded(index, result).map(|_| ()),
        }
    }

    fn complete_face(
        &mut self,
        subject: usize,
        variant: usize,
        result: Result<H, AssetError>,
    ) -> Result<(), BarrierError> {
        let (subject_name, variant_key) = match (
            self.config.subjects.get(subject),
            self.config.variants.get(variant),
        ) {
            (Some(s), Some(v)) => (s.as_str(), v.key.as_str()),
            _ => {
                return Err(BarrierError::UnknownChannel(format!(
                    "face:{}:{}",
                    subject, variant
                )))
            }
        };
        let channel = face_channel(subject_name, variant_key);
        if self.barrier.is_satisfied(&channel)? {
            log::debug!("{} reported twice", channel);
            return Ok(());
        }

        match result {
            Ok(handle) => {
                self.variants.populate(subject, variant, handle);
            }
            Err(err) => log::warn!("failed to load {}: {}", channel, err),
        }
        self.mark(&channel)?;

        self.faces_reported += 1;
        if self.faces_reported == self.variants.subjects() * self.variants.variants() {
            self.mark(FACES_CHANNEL)?;
            self.camera = self.config.start_pose();
            log::info!(
                "camera placed at {} looking at {}",
                self.camera.position,
                self.camera.target
            );
            self.mark(CAMERA_CHANNEL)?;
        }
        Ok(())
    }

    fn complete_prop(
        &mut self,
        group: usize,
        item: usize,
        result: Result<H, AssetError>,
    ) -> Result<(), BarrierError> {
        let reported = match self
            .props_reported
            .get_mut(group)
            .and_then(|items| items.get_mut(item))
        {
            Some(reported) => reported,
            None => {
                return Err(BarrierError::UnknownChannel(format!(
                    "prop {}#{}",
                    group, item
                )))
            }
        };
        if *reported {
            return Ok(());
        }
        *reported = true;

        let name = self.config.props[group].name.clone();
        match result {
            Ok(handle) => self.props.push(handle),
            Err(err) => log::warn!("failed to load {} item {}: {}", name, item, err),
        }
        if self.props_reported[group].iter().all(|r| *r) {
            self.mark(&name)?;
        }
        Ok(())
    }

    /// Installs the backdrop list and returns the load for the first one. An
    /// empty list satisfies the backdrop channel right away.
    pub fn set_backdrops(
        &mut self,
        paths: Vec<PathBuf>,
    ) -> Result<Option<LoadRequest>, BarrierError> {
        self.backdrops = BackdropRotator::new(paths);
        if self.backdrops.is_empty() {
            log::warn!("no backdrops found, continuing without one");
            self.mark(BACKDROP_CHANNEL)?;
            return Ok(None);
        }
        log::info!("{} backdrop(s) available", self.backdrops.len());
        Ok(self.backdrop_request(self.backdrops.current_index()))
    }

    fn backdrop_request(&self, index: usize) -> Option<LoadRequest> {
        self.backdrops.path(index).map(|path| LoadRequest {
            ticket: LoadTicket::Backdrop { index },
            path: path.to_path_buf(),
            kind: AssetKind::Texture,
            placement: None,
        })
    }

    /// Reports a backdrop load. Gives the loaded value back only when it is
    /// still the current backdrop; a swap may have overtaken it.
    pub fn backdrop_loaded<T>(
        &mut self,
        index: usize,
        result: Result<T, AssetError>,
    ) -> Result<Option<T>, BarrierError> {
        let path = match self.backdrops.path(index) {
            Some(path) => path.to_path_buf(),
            None => return Err(BarrierError::UnknownChannel(format!("backdrop #{}", index))),
        };
        let shown = match result {
            Ok(value) if index == self.backdrops.current_index() => {
                log::info!("backdrop {}", path.display());
                self.events.push_back(SceneEvent::BackdropChanged(path));
                Some(value)
            }
            Ok(_) => {
                log::debug!("dropping stale backdrop {}", index);
                None
            }
            Err(err) => {
                log::warn!("failed to load backdrop {}: {}", index, err);
                None
            }
        };
        self.mark(BACKDROP_CHANNEL)?;
        Ok(shown)
    }

    /// Moves to the next backdrop and returns its load.
    pub fn swap_backdrop(&mut self) -> Option<LoadRequest> {
        let (index, _) = self.backdrops.advance()?;
        self.backdrop_request(index)
    }

    pub fn advance_variant(&mut self) -> usize {
        let variant = self.variants.advance();
        log::info!("variant {}: {}", variant, self.config.variants[variant].key);
        self.events.push_back(SceneEvent::VariantChanged(variant));
        variant
    }

    fn note_variant(&mut self, before: usize) {
        let after = self.variants.active_variant();
        if after != before {
            self.events.push_back(SceneEvent::VariantChanged(after));
        }
    }

    /// Starts the choreography. Ignored until the scene is ready and while a
    /// run is in flight.
    pub fn start_choreography(&mut self) -> bool {
        if !self.barrier.is_complete() {
            log::debug!("scene still loading, ignoring choreography");
            return false;
        }
        let before = self.variants.active_variant();
        if !self.timeline.start(&mut self.camera, &mut self.variants) {
            return false;
        }
        log::info!("choreography started");
        self.events.push_back(SceneEvent::ChoreographyStarted);
        self.note_variant(before);
        true
    }

    /// Advances the choreography by one frame.
    pub fn tick(&mut self, dt: Duration) -> TimelineStatus {
        let before = self.variants.active_variant();
        let status = self.timeline.advance(dt, &mut self.camera, &mut self.variants);
        self.note_variant(before);
        if status == TimelineStatus::Finished {
            log::info!("choreography finished");
            self.events.push_back(SceneEvent::ChoreographyFinished);
        }
        status
    }

    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        self.events.drain(..).collect()
    }

    /// Registers a callback for the moment every channel is satisfied.
    pub fn on_ready<F>(&mut self, callback: F)
    where
        F: FnOnce(&[ChannelStatus]) + 'static,
    {
        self.barrier.on_all_satisfied(callback);
    }

    /// Orbits the camera unless the choreography owns it.
    pub fn orbit(&mut self, d_azimuth: f32, d_polar: f32) -> bool {
        if self.timeline.is_animating() {
            return false;
        }
        self.camera.orbit(d_azimuth, d_polar);
        true
    }

    pub fn zoom(&mut self, factor: f32) -> bool {
        if self.timeline.is_animating() {
            return false;
        }
        self.camera.zoom(factor);
        true
    }

    /// Loading state of the aggregate channels; face cells are summarised
    /// as a count.
    pub fn status_line(&self) -> String {
        let (faces, others): (Vec<_>, Vec<_>) = self
            .barrier
            .status()
            .iter()
            .partition(|c| c.name.starts_with("face:"));
        let loaded = faces.iter().filter(|c| c.satisfied).count();
        std::iter::once(format!("models {}/{}", loaded, faces.len()))
            .chain(others.iter().map(|c| c.to_string()))
            .join(", ")
    }

    pub fn prompt(&self) -> &str {
        &self.config.variants[self.variants.active_variant()].prompt
    }

    pub fn is_ready(&self) -> bool {
        self.barrier.is_complete()
    }

    pub fn is_animating(&self) -> bool {
        self.timeline.is_animating()
    }

    pub fn config(&self) -> &TableauConfig {
        &self.config
    }

    pub fn barrier(&self) -> &Barrier {
        &self.barrier
    }

    pub fn variants(&self) -> &VariantTable<H> {
        &self.variants
    }

    pub fn camera(&self) -> &CameraPose {
        &self.camera
    }

    pub fn lens(&self) -> &CameraLens {
        &self.lens
    }

    pub fn backdrops(&self) -> &BackdropRotator {
        &self.backdrops
    }

    /// Every handle that should be drawn this frame.
    pub fn visible_handles(&self) -> impl Iterator<Item = H> + '_ {
        self.variants
            .visible_handles()
            .chain(self.props.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::config::{Anchor, PropGroupConfig, PropItemConfig, StageConfig, VariantConfig};

    fn small_config() -> TableauConfig {
        let mut config = TableauConfig::default();
        config.subjects = vec!["a".to_string(), "b".to_string()];
        config.variants = ["plain", "hat"]
            .iter()
            .map(|key| VariantConfig {
                key: key.to_string(),
                prompt: format!("{} prompt", key),
            })
            .collect();
        config.arch.angles_deg = vec![-30.0, 30.0];
        config.props = vec![PropGroupConfig {
            name: "lamps".to_string(),
            items: vec![
                PropItemConfig {
                    path: PathBuf::from("lamp.obj"),
                    anchor: Anchor::Ring { index: 0 },
                    size: 1.0,
                    rotation_deg: [0.0; 3],
                };
                2
            ],
        }];
        config.backdrop.discovery = None;
        config.choreography = vec![
            StageConfig::VariantSteps {
                count: 2,
                interval_ms: 100,
            },
            StageConfig::FullRotation { duration_ms: 100 },
        ];
        config
    }

    fn io_error() -> AssetError {
        AssetError::Io {
            path: PathBuf::from("missing.obj"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        }
    }

    fn load_everything(orchestrator: &mut Orchestrator<u32>) {
        for (index, request) in orchestrator.load_plan().into_iter().enumerate() {
            orchestrator.complete(request.ticket, Ok(index as u32)).unwrap();
        }
        assert_eq!(orchestrator.set_backdrops(Vec::new()).unwrap(), None);
    }

    #[test]
    fn test_load_plan() {
        let orchestrator = Orchestrator::<u32>::new(small_config()).unwrap();
        let plan = orchestrator.load_plan();
        assert_eq!(plan.len(), 6);
        assert_eq!(plan[1].ticket, LoadTicket::Face { subject: 0, variant: 1 });
        assert_eq!(plan[1].path, Path::new("resources").join("faces/a_hat.obj"));
        assert_eq!(plan[5].ticket, LoadTicket::Prop { group: 0, item: 1 });
        assert_eq!(orchestrator.barrier().len(), 4 + 1 + 1 + 2);
    }

    #[test]
    fn test_ready_once_and_camera_placed() {
        let mut orchestrator = Orchestrator::<u32>::new(small_config()).unwrap();
        let start = orchestrator.config().start_pose();
        assert!(!orchestrator.is_ready());

        load_everything(&mut orchestrator);
        assert!(orchestrator.is_ready());
        assert_eq!(*orchestrator.camera(), start);
        let events = orchestrator.drain_events();
        assert_eq!(
            events.iter().filter(|e| **e == SceneEvent::Ready).count(),
            1
        );

        // Late duplicates change nothing.
        orchestrator
            .complete(LoadTicket::Face { subject: 0, variant: 0 }, Ok(99))
            .unwrap();
        assert!(orchestrator.drain_events().is_empty());
        assert_eq!(orchestrator.variants().handle(0, 0), Some(0));
    }

    #[test]
    fn test_failed_loads_still_count() {
        let mut orchestrator = Orchestrator::<u32>::new(small_config()).unwrap();
        for request in orchestrator.load_plan() {
            orchestrator.complete(request.ticket, Err(io_error())).unwrap();
        }
        assert!(orchestrator.barrier().is_satisfied(FACES_CHANNEL).unwrap());
        assert!(orchestrator.barrier().is_satisfied("lamps").unwrap());
        assert!(!orchestrator.is_ready());
        orchestrator.set_backdrops(Vec::new()).unwrap();
        assert!(orchestrator.is_ready());
        assert_eq!(orchestrator.visible_handles().count(), 0);
    }

    #[test]
    fn test_initial_visibility() {
        let mut orchestrator = Orchestrator::<u32>::new(small_config()).unwrap();
        load_everything(&mut orchestrator);
        let visible: Vec<_> = orchestrator.visible_handles().collect();
        // Variant 0 of both subjects plus both props.
        assert_eq!(visible, vec![0, 2, 4, 5]);
        assert_eq!(orchestrator.prompt(), "plain prompt");
    }

    #[test]
    fn test_unknown_tickets_fail() {
        let mut orchestrator = Orchestrator::<u32>::new(small_config()).unwrap();
        assert!(orchestrator
            .complete(LoadTicket::Face { subject: 2, variant: 0 }, Ok(1))
            .is_err());
        assert!(orchestrator
            .complete(LoadTicket::Prop { group: 0, item: 2 }, Ok(1))
            .is_err());
    }

    #[test]
    fn test_choreography_waits_for_ready() {
        let mut orchestrator = Orchestrator::<u32>::new(small_config()).unwrap();
        assert!(!orchestrator.start_choreography());
        load_everything(&mut orchestrator);
        orchestrator.drain_events();

        assert!(orchestrator.start_choreography());
        assert!(!orchestrator.start_choreography());
        assert!(!orchestrator.orbit(0.1, 0.0));
        assert_eq!(
            orchestrator.drain_events(),
            vec![SceneEvent::ChoreographyStarted, SceneEvent::VariantChanged(1)]
        );

        let frame = Duration::from_millis(50);
        let mut ticks = 0;
        while orchestrator.tick(frame) != TimelineStatus::Finished {
            ticks += 1;
            assert!(ticks < 100);
        }
        assert_eq!(orchestrator.tick(frame), TimelineStatus::Idle);
        assert_eq!(
            orchestrator.drain_events(),
            vec![SceneEvent::VariantChanged(0), SceneEvent::ChoreographyFinished]
        );
        assert!(orchestrator.orbit(0.1, 0.0));
    }

    #[test]
    fn test_advance_variant_wraps() {
        let mut orchestrator = Orchestrator::<u32>::new(small_config()).unwrap();
        load_everything(&mut orchestrator);
        orchestrator.drain_events();
        assert_eq!(orchestrator.advance_variant(), 1);
        assert_eq!(orchestrator.prompt(), "hat prompt");
        assert_eq!(orchestrator.advance_variant(), 0);
        assert_eq!(
            orchestrator.drain_events(),
            vec![SceneEvent::VariantChanged(1), SceneEvent::VariantChanged(0)]
        );
    }

    #[test]
    fn test_stale_backdrop_is_dropped() {
        let mut orchestrator = Orchestrator::<u32>::new(small_config()).unwrap();
        let first = orchestrator
            .set_backdrops(vec![PathBuf::from("one.png"), PathBuf::from("two.png")])
            .unwrap()
            .unwrap();
        assert_eq!(first.ticket, LoadTicket::Backdrop { index: 0 });
        let second = orchestrator.swap_backdrop().unwrap();
        assert_eq!(second.path, PathBuf::from("two.png"));

        assert_eq!(orchestrator.backdrop_loaded(0, Ok("one")).unwrap(), None);
        assert!(orchestrator.barrier().is_satisfied(BACKDROP_CHANNEL).unwrap());
        assert_eq!(orchestrator.backdrop_loaded(1, Ok("two")).unwrap(), Some("two"));
        assert_eq!(
            orchestrator.drain_events(),
            vec![SceneEvent::BackdropChanged(PathBuf::from("two.png"))]
        );
    }

    #[test]
    fn test_unknown_backdrop_is_rejected() {
        let mut orchestrator = Orchestrator::<u32>::new(small_config()).unwrap();
        assert!(matches!(
            orchestrator.backdrop_loaded(0, Ok("early")),
            Err(BarrierError::UnknownChannel(_))
        ));
        orchestrator
            .set_backdrops(vec![PathBuf::from("one.png")])
            .unwrap();
        assert!(matches!(
            orchestrator.backdrop_loaded(3, Ok("far")),
            Err(BarrierError::UnknownChannel(_))
        ));
        assert!(!orchestrator.barrier().is_satisfied(BACKDROP_CHANNEL).unwrap());
        assert_eq!(orchestrator.backdrop_loaded(0, Ok("one")).unwrap(), Some("one"));
        assert!(orchestrator.barrier().is_satisfied(BACKDROP_CHANNEL).unwrap());
    }

    #[test]
    fn test_status_line() {
        let mut orchestrator = Orchestrator::<u32>::new(small_config()).unwrap();
        orchestrator
            .complete(LoadTicket::Face { subject: 0, variant: 0 }, Ok(0))
            .unwrap();
        assert_eq!(
            orchestrator.status_line(),
            "models 1/4, faces: loading..., lamps: loading..., backdrop: loading..., camera: loading..."
        );
    }
}
