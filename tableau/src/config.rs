//! TOML configuration of the tableau.
//!
//! Every section has defaults, so an empty file describes the stock
//! installation. Relative paths are resolved against `asset_root`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use glam::{Quat, Vec3};
use serde::Deserialize;

use crate::camera::{CameraLens, CameraPose};
use crate::error::ConfigError;
use crate::motion::MotionKind;
use crate::orchestrator::RESERVED_CHANNELS;
use crate::placement::{arc_waypoints, ArchLayout, Layout, Pose, RingLayout};
use crate::probe::DiscoveryParams;
use crate::timeline::Stage;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TableauConfig {
    pub asset_root: PathBuf,
    pub subjects: Vec<String>,
    pub variants: Vec<VariantConfig>,
    /// Face model path with `{subject}` and `{variant}` placeholders.
    pub face_path: String,
    pub arch: ArchConfig,
    pub ring: RingConfig,
    pub camera: CameraConfig,
    pub props: Vec<PropGroupConfig>,
    pub backdrop: BackdropConfig,
    pub choreography: Vec<StageConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VariantConfig {
    pub key: String,
    #[serde(default)]
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArchConfig {
    pub radius: f32,
    pub height: f32,
    pub angles_deg: Vec<f32>,
    pub max_angle_deg: f32,
    pub dampening: f32,
    pub focus_height_factor: f32,
    /// Largest dimension of a face model once placed.
    pub subject_size: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RingConfig {
    pub count: usize,
    pub radius: f32,
    pub base_y: f32,
    pub base_z: f32,
    pub skew: f32,
    pub y_offsets: Vec<f32>,
}

/// Where the camera goes once the faces are in, and its lens.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub fov_deg: f32,
    pub near: f32,
    pub far: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropGroupConfig {
    pub name: String,
    pub items: Vec<PropItemConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropItemConfig {
    pub path: PathBuf,
    pub anchor: Anchor,
    pub size: f32,
    /// Euler angles in degrees, applied about Y, then Z, then X.
    #[serde(default)]
    pub rotation_deg: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anchor {
    /// Relative to an arch slot.
    Slot {
        slot: usize,
        #[serde(default)]
        offset: [f32; 3],
    },
    /// On the ring of props in front of the viewer.
    Ring { index: usize },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackdropConfig {
    #[serde(default)]
    pub paths: Vec<PathBuf>,
    #[serde(default)]
    pub discovery: Option<DiscoveryConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscoveryConfig {
    pub dir: PathBuf,
    pub prefix: String,
    pub extension: String,
    pub first_index: u32,
    pub max_index: u32,
    pub max_consecutive_misses: u32,
    pub timeout_ms: u64,
}

fn default_loop_radius() -> f32 {
    5.0
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageConfig {
    FullRotation {
        duration_ms: u64,
    },
    Stepped {
        duration_ms: u64,
        angles_deg: Vec<f32>,
    },
    DoubleLoop {
        duration_ms: u64,
        #[serde(default = "default_loop_radius")]
        radius_deg: f32,
    },
    WaypointArc {
        duration_ms: u64,
        standoff: f32,
        lift: f32,
    },
    Restore,
    VariantSteps {
        count: u32,
        interval_ms: u64,
    },
}

impl Default for TableauConfig {
    fn default() -> Self {
        let variants = [
            ("orig", "a photo of sks face"),
            ("sunglass", "a photo of sks face wearing sunglass"),
            ("hat", "a photo of sks face wearing hat"),
            ("beard", "a photo of sks face wearing beard"),
            ("bald", "a photo of sks face with bald"),
            ("pinkhair", "a photo of sks face with pink hair"),
        ];
        Self {
            asset_root: PathBuf::from("resources"),
            subjects: ["mg", "lee", "jeong", "jenson", "dh"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            variants: variants
                .iter()
                .map(|(key, prompt)| VariantConfig {
                    key: key.to_string(),
                    prompt: prompt.to_string(),
                })
                .collect(),
            face_path: "faces/{subject}_{variant}.obj".to_string(),
            arch: ArchConfig::default(),
            ring: RingConfig::default(),
            camera: CameraConfig::default(),
            props: default_props(),
            backdrop: BackdropConfig::default(),
            choreography: vec![
                StageConfig::FullRotation { duration_ms: 2000 },
                StageConfig::Restore,
                StageConfig::VariantSteps {
                    count: 10,
                    interval_ms: 400,
                },
                StageConfig::Restore,
                StageConfig::DoubleLoop {
                    duration_ms: 4000,
                    radius_deg: default_loop_radius(),
                },
            ],
        }
    }
}

fn default_props() -> Vec<PropGroupConfig> {
    let item = |path: &str, anchor: Anchor, size: f32| PropItemConfig {
        path: PathBuf::from(path),
        anchor,
        size,
        rotation_deg: [0.0; 3],
    };
    let above = |slot: usize, offset: [f32; 3]| Anchor::Slot { slot, offset };

    let headwear = vec![
        PropItemConfig {
            rotation_deg: [-60.0, -60.0, 60.0],
            ..item("objects/samsung_00.obj", above(1, [0.0, 2.5, 0.0]), 1.5)
        },
        item("objects/car_01.obj", above(2, [0.0, 2.0, -0.5]), 1.5),
        item("objects/nvidia_00.obj", above(3, [0.0, 2.0, 0.0]), 1.5),
    ];
    let drinks = (0..5)
        .map(|slot| item("objects/beer_01.obj", above(slot, [0.0, -1.0, -1.0]), 0.8))
        .collect();
    let food = [
        "chicken_00",
        "chicken_01",
        "chicken_02",
        "fries_00",
        "fries_01",
        "fries_02",
    ]
    .iter()
    .enumerate()
    .map(|(index, name)| {
        item(
            &format!("objects/{}.obj", name),
            Anchor::Ring { index },
            1.1,
        )
    })
    .collect();

    vec![
        PropGroupConfig {
            name: "headwear".to_string(),
            items: headwear,
        },
        PropGroupConfig {
            name: "drinks".to_string(),
            items: drinks,
        },
        PropGroupConfig {
            name: "food".to_string(),
            items: food,
        },
    ]
}

impl Default for ArchConfig {
    fn default() -> Self {
        Self {
            radius: 6.0,
            height: 2.0,
            angles_deg: vec![-60.0, -30.0, 0.0, 30.0, 60.0],
            max_angle_deg: 60.0,
            dampening: 0.5,
            focus_height_factor: 0.5,
            subject_size: 2.5,
        }
    }
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            count: 6,
            radius: 3.5,
            base_y: 0.0,
            base_z: 3.0,
            skew: 0.3,
            y_offsets: vec![0.0, 0.0, 0.0, 0.0, -0.5, -0.5],
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, -5.0],
            target: [0.0, 2.0, 6.0],
            fov_deg: 60.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Default for BackdropConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            discovery: Some(DiscoveryConfig::default()),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("backgrounds"),
            prefix: "panorama".to_string(),
            extension: "png".to_string(),
            first_index: 1,
            max_index: 10_000,
            max_consecutive_misses: 20,
            timeout_ms: 1500,
        }
    }
}

impl PropItemConfig {
    pub fn pose(&self, arch: &ArchLayout, ring: &RingLayout) -> Pose {
        let position = match &self.anchor {
            Anchor::Slot { slot, offset } => arch.position(*slot) + Vec3::from(*offset),
            Anchor::Ring { index } => ring.placement(*index).position,
        };
        let [x, y, z] = self.rotation_deg;
        Pose {
            position,
            orientation: Quat::from_rotation_y(y.to_radians())
                * Quat::from_rotation_z(z.to_radians())
                * Quat::from_rotation_x(x.to_radians()),
        }
    }
}

impl StageConfig {
    pub fn to_stage(&self, arch: &ArchLayout) -> Stage {
        let motion = |kind: MotionKind, duration_ms: u64| Stage::Motion {
            kind,
            duration: Duration::from_millis(duration_ms),
        };
        match self {
            StageConfig::FullRotation { duration_ms } => {
                motion(MotionKind::FullRotation, *duration_ms)
            }
            StageConfig::Stepped {
                duration_ms,
                angles_deg,
            } => motion(
                MotionKind::Stepped {
                    angles_deg: angles_deg.clone(),
                },
                *duration_ms,
            ),
            StageConfig::DoubleLoop {
                duration_ms,
                radius_deg,
            } => motion(
                MotionKind::DoubleLoop {
                    radius_deg: *radius_deg,
                },
                *duration_ms,
            ),
            StageConfig::WaypointArc {
                duration_ms,
                standoff,
                lift,
            } => motion(
                MotionKind::WaypointArc {
                    waypoints: arc_waypoints(arch, *standoff, *lift),
                },
                *duration_ms,
            ),
            StageConfig::Restore => Stage::Restore,
            StageConfig::VariantSteps { count, interval_ms } => Stage::VariantSteps {
                count: *count,
                interval: Duration::from_millis(*interval_ms),
            },
        }
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

fn find_duplicate<'a, I: IntoIterator<Item = &'a str>>(names: I) -> Option<&'a str> {
    let mut seen = HashSet::new();
    names.into_iter().find(|name| !seen.insert(*name))
}

impl TableauConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&source)?;
        log::info!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parses and validates a TOML document.
    pub fn parse(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.subjects.is_empty() {
            return Err(invalid("no subjects"));
        }
        if self.variants.is_empty() {
            return Err(invalid("no variants"));
        }
        if let Some(name) = find_duplicate(self.subjects.iter().map(String::as_str)) {
            return Err(invalid(format!("duplicate subject '{}'", name)));
        }
        if let Some(key) = find_duplicate(self.variants.iter().map(|v| v.key.as_str())) {
            return Err(invalid(format!("duplicate variant '{}'", key)));
        }
        if self.arch.angles_deg.len() != self.subjects.len() {
            return Err(invalid(format!(
                "{} arch angles for {} subjects",
                self.arch.angles_deg.len(),
                self.subjects.len()
            )));
        }
        if self.arch.max_angle_deg <= 0.0 {
            return Err(invalid("arch max_angle_deg must be positive"));
        }

        if let Some(name) = find_duplicate(self.props.iter().map(|g| g.name.as_str())) {
            return Err(invalid(format!("duplicate prop group '{}'", name)));
        }
        for group in &self.props {
            if RESERVED_CHANNELS.contains(&group.name.as_str()) || group.name.starts_with("face:")
            {
                return Err(invalid(format!("prop group name '{}' is reserved", group.name)));
            }
            if group.items.is_empty() {
                return Err(invalid(format!("prop group '{}' has no items", group.name)));
            }
            for item in &group.items {
                match item.anchor {
                    Anchor::Slot { slot, .. } if slot >= self.subjects.len() => {
                        return Err(invalid(format!(
                            "'{}' in '{}' is anchored to arch slot {} of {}",
                            item.path.display(),
                            group.name,
                            slot,
                            self.subjects.len()
                        )));
                    }
                    Anchor::Ring { index } if index >= self.ring.count => {
                        return Err(invalid(format!(
                            "'{}' in '{}' is anchored to ring index {} of {}",
                            item.path.display(),
                            group.name,
                            index,
                            self.ring.count
                        )));
                    }
                    _ => {}
                }
            }
        }

        if self.choreography.is_empty() {
            return Err(invalid("empty choreography"));
        }
        for (index, stage) in self.choreography.iter().enumerate() {
            match stage {
                StageConfig::Stepped { angles_deg, .. } if angles_deg.is_empty() => {
                    return Err(invalid(format!("stage {}: stepped without angles", index)));
                }
                StageConfig::VariantSteps {
                    count,
                    interval_ms: 0,
                } if *count > 1 => {
                    return Err(invalid(format!(
                        "stage {}: variant_steps needs a non-zero interval",
                        index
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn resolve<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.asset_root.join(path)
    }

    pub fn face_path(&self, subject: usize, variant: usize) -> PathBuf {
        let relative = self
            .face_path
            .replace("{subject}", &self.subjects[subject])
            .replace("{variant}", &self.variants[variant].key);
        self.resolve(relative)
    }

    pub fn arch_layout(&self) -> ArchLayout {
        ArchLayout {
            radius: self.arch.radius,
            height: self.arch.height,
            angles_deg: self.arch.angles_deg.clone(),
            max_angle_deg: self.arch.max_angle_deg,
            dampening: self.arch.dampening,
            focus_height_factor: self.arch.focus_height_factor,
        }
    }

    pub fn ring_layout(&self) -> RingLayout {
        RingLayout {
            count: self.ring.count,
            radius: self.ring.radius,
            base_y: self.ring.base_y,
            base_z: self.ring.base_z,
            skew: self.ring.skew,
            y_offsets: self.ring.y_offsets.clone(),
        }
    }

    pub fn start_pose(&self) -> CameraPose {
        CameraPose::new(
            Vec3::from(self.camera.position),
            Vec3::from(self.camera.target),
        )
    }

    pub fn lens(&self) -> CameraLens {
        CameraLens {
            fov: self.camera.fov_deg.to_radians(),
            near: self.camera.near,
            far: self.camera.far,
        }
    }

    pub fn stages(&self) -> Vec<Stage> {
        let arch = self.arch_layout();
        self.choreography
            .iter()
            .map(|stage| stage.to_stage(&arch))
            .collect()
    }

    /// Statically listed backdrops, resolved.
    pub fn backdrop_paths(&self) -> Vec<PathBuf> {
        self.backdrop.paths.iter().map(|p| self.resolve(p)).collect()
    }

    pub fn discovery_params(&self) -> Option<DiscoveryParams> {
        self.backdrop.discovery.as_ref().map(|d| DiscoveryParams {
            dir: self.resolve(&d.dir),
            prefix: d.prefix.clone(),
            extension: d.extension.clone(),
            first_index: d.first_index,
            max_index: d.max_index,
            max_consecutive_misses: d.max_consecutive_misses,
            timeout: Duration::from_millis(d.timeout_ms),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = TableauConfig::default();
        config.validate().unwrap();
        assert_eq!(config.subjects.len() * config.variants.len(), 30);
        assert_eq!(config.props.len(), 3);
        assert_eq!(
            config.face_path(1, 2),
            Path::new("resources").join("faces/lee_hat.obj")
        );
        assert_eq!(config.stages().len(), 5);
        let params = config.discovery_params().unwrap();
        assert_eq!(params.max_consecutive_misses, 20);
        assert_eq!(params.timeout, Duration::from_millis(1500));
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(TableauConfig::parse("").unwrap(), TableauConfig::default());
    }

    #[test]
    fn test_parse_sections() {
        let config = TableauConfig::parse(
            r#"
            asset_root = "assets"
            subjects = ["a", "b"]
            variants = [{ key = "plain", prompt = "plain" }, { key = "hat" }]
            face_path = "{subject}-{variant}.obj"

            [arch]
            angles_deg = [-20.0, 20.0]

            [backdrop]
            paths = ["sky.png"]

            [[props]]
            name = "lamps"
            items = [
                { path = "lamp.obj", size = 0.5, anchor = { kind = "slot", slot = 1, offset = [0.0, 1.0, 0.0] } },
                { path = "lamp.obj", size = 0.5, anchor = { kind = "ring", index = 5 } },
            ]

            [[choreography]]
            kind = "stepped"
            duration_ms = 1000
            angles_deg = [-10.0, 20.0, -18.0, 8.0]

            [[choreography]]
            kind = "restore"

            [[choreography]]
            kind = "double_loop"
            duration_ms = 500

            [[choreography]]
            kind = "waypoint_arc"
            duration_ms = 2000
            standoff = 7.0
            lift = 1.5
            "#,
        )
        .unwrap();

        assert_eq!(config.face_path(0, 1), Path::new("assets").join("a-hat.obj"));
        assert_eq!(config.arch.radius, 6.0);
        assert_eq!(config.backdrop_paths(), vec![Path::new("assets").join("sky.png")]);
        assert_eq!(config.discovery_params(), None);
        assert_eq!(config.props[0].items.len(), 2);
        assert_eq!(
            config.choreography[2],
            StageConfig::DoubleLoop {
                duration_ms: 500,
                radius_deg: 5.0
            }
        );
        assert_eq!(config.stages()[1], Stage::Restore);
        assert_eq!(
            config.stages()[3],
            Stage::Motion {
                kind: MotionKind::WaypointArc {
                    waypoints: arc_waypoints(&config.arch_layout(), 7.0, 1.5),
                },
                duration: Duration::from_millis(2000),
            }
        );
    }

    #[test]
    fn test_rejects_invalid() {
        let cases = [
            "subjects = []",
            "variants = []",
            "subjects = [\"a\", \"a\"]\n[arch]\nangles_deg = [0.0, 1.0]",
            "subjects = [\"a\"]",
            "[arch]\nmax_angle_deg = 0.0",
            "choreography = []",
            "[[choreography]]\nkind = \"stepped\"\nduration_ms = 10\nangles_deg = []",
            "[[choreography]]\nkind = \"variant_steps\"\ncount = 2\ninterval_ms = 0",
            "[[props]]\nname = \"faces\"\nitems = [{ path = \"x.obj\", size = 1.0, anchor = { kind = \"ring\", index = 0 } }]",
            "[[props]]\nname = \"empty\"\nitems = []",
            "[[props]]\nname = \"far\"\nitems = [{ path = \"x.obj\", size = 1.0, anchor = { kind = \"slot\", slot = 5 } }]",
            "[[props]]\nname = \"far\"\nitems = [{ path = \"x.obj\", size = 1.0, anchor = { kind = \"ring\", index = 6 } }]",
        ];
        for case in cases.iter() {
            assert!(
                matches!(TableauConfig::parse(case), Err(ConfigError::Invalid(_))),
                "accepted {:?}",
                case
            );
        }
        assert!(matches!(
            TableauConfig::parse("subjects = 3"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_single_variant_step_needs_no_interval() {
        let source = "[[choreography]]\nkind = \"variant_steps\"\ncount = 1\ninterval_ms = 0";
        assert!(TableauConfig::parse(source).is_ok());
    }

    #[test]
    fn test_prop_pose() {
        let config = TableauConfig::default();
        let arch = config.arch_layout();
        let ring = config.ring_layout();

        let car = &config.props[0].items[1];
        let pose = car.pose(&arch, &ring);
        assert_eq!(pose.position, arch.position(2) + Vec3::new(0.0, 2.0, -0.5));
        assert_eq!(pose.orientation, Quat::IDENTITY);

        let fries = &config.props[2].items[4];
        assert_eq!(fries.pose(&arch, &ring).position.y, -0.5);
    }
}
