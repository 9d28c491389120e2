use std::path::PathBuf;

use thiserror::Error;

use crate::assets::AssetKind;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BarrierError {
    /// A completion arrived for a name that was never registered. This means
    /// the declared channels and the actual load sites disagree.
    #[error("unknown channel: {0}")]
    UnknownChannel(String),

    #[error("channel registered twice: {0}")]
    DuplicateChannel(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("failed to read {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("obj syntax error on line {line}: {message}")]
    Obj { line: usize, message: String },

    #[error("mesh has no triangles")]
    EmptyMesh,

    #[error("failed to decode image {}: {}", .path.display(), .source)]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("{} is not a {:?}", .path.display(), .expected)]
    WrongKind { path: PathBuf, expected: AssetKind },
}

#[derive(Error, Debug)]
pub enum TableauError {
    #[error(transparent)]
    Barrier(#[from] BarrierError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Asset(#[from] AssetError),
}

pub type Result<T, E = TableauError> = std::result::Result<T, E>;
