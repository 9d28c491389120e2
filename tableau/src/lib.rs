pub mod assets;
pub mod backdrop;
pub mod barrier;
pub mod camera;
pub mod config;
pub mod error;
pub mod motion;
pub mod orchestrator;
pub mod placement;
pub mod probe;
pub mod timeline;
pub mod variants;

pub use backdrop::BackdropRotator;
pub use barrier::{Barrier, ChannelStatus, Progress};
pub use camera::{CameraLens, CameraPose, SphericalFrame};
pub use config::TableauConfig;
pub use error::{AssetError, BarrierError, ConfigError, Result, TableauError};
pub use motion::{ease_in_out, Motion, MotionKind, MotionStatus};
pub use orchestrator::{LoadRequest, LoadTicket, ModelPlacement, Orchestrator, SceneEvent};
pub use placement::{ArchLayout, Layout, Pose, RingLayout};
pub use probe::{Discovery, DiscoveryParams, ImageProbe, Probe};
pub use timeline::{Stage, Timeline, TimelineStatus};
pub use variants::VariantTable;
