//! The loader collaborator: turns resource paths into meshes and textures
//! off the orchestration thread.

mod loader;
mod mesh;
pub mod obj;
mod texture;

pub use loader::{load, Asset, AssetKind, Completion, ThreadedLoader};
pub use mesh::{Aabb, Mesh};
pub use texture::Texture;
