use std::path::{Path, PathBuf};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};

use super::{obj, Mesh, Texture};
use crate::error::AssetError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Mesh,
    Texture,
}

#[derive(Debug)]
pub enum Asset {
    Mesh(Mesh),
    Texture(Texture),
}

impl Asset {
    pub fn into_mesh(self, path: &Path) -> Result<Mesh, AssetError> {
        match self {
            Asset::Mesh(mesh) => Ok(mesh),
            Asset::Texture(_) => Err(AssetError::WrongKind {
                path: path.to_path_buf(),
                expected: AssetKind::Mesh,
            }),
        }
    }

    pub fn into_texture(self, path: &Path) -> Result<Texture, AssetError> {
        match self {
            Asset::Texture(texture) => Ok(texture),
            Asset::Mesh(_) => Err(AssetError::WrongKind {
                path: path.to_path_buf(),
                expected: AssetKind::Texture,
            }),
        }
    }
}

pub fn load(path: &Path, kind: AssetKind) -> Result<Asset, AssetError> {
    match kind {
        AssetKind::Mesh => obj::read_mesh(path).map(Asset::Mesh),
        AssetKind::Texture => Texture::load(path).map(Asset::Texture),
    }
}

/// Outcome of one request. Exactly one is produced per request.
#[derive(Debug)]
pub struct Completion<T> {
    pub ticket: T,
    pub path: PathBuf,
    pub result: Result<Asset, AssetError>,
}

/// Decodes assets on the rayon pool and hands the results back to the
/// thread that polls it.
pub struct ThreadedLoader<T> {
    sender: Sender<Completion<T>>,
    receiver: Receiver<Completion<T>>,
    in_flight: usize,
}

impl<T: Send + 'static> Default for ThreadedLoader<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> ThreadedLoader<T> {
    pub fn new() -> Self {
        let (sender, receiver) = channel::unbounded();
        Self {
            sender,
            receiver,
            in_flight: 0,
        }
    }

    pub fn request(&mut self, ticket: T, path: PathBuf, kind: AssetKind) {
        log::debug!("loading {:?} {}", kind, path.display());
        let sender = self.sender.clone();
        self.in_flight += 1;
        rayon::spawn(move || {
            let result = load(&path, kind);
            // Only fails if the loader was dropped, and then nobody cares.
            let _ = sender.send(Completion {
                ticket,
                path,
                result,
            });
        });
    }

    /// Every completion that arrived since the last call, without blocking.
    pub fn poll(&mut self) -> Vec<Completion<T>> {
        let completions: Vec<_> = self.receiver.try_iter().collect();
        self.in_flight -= completions.len();
        completions
    }

    /// Blocks for the next completion, up to `timeout`.
    pub fn wait(&mut self, timeout: Duration) -> Option<Completion<T>> {
        let completion = self.receiver.recv_timeout(timeout).ok()?;
        self.in_flight -= 1;
        Some(completion)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(10);

    #[test]
    fn test_every_request_completes_once() {
        let dir = std::env::temp_dir().join("tableau-loader-test");
        std::fs::create_dir_all(&dir).unwrap();
        let good = dir.join("triangle.obj");
        std::fs::write(&good, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        let missing = dir.join("missing.obj");

        let mut loader = ThreadedLoader::new();
        loader.request(1u32, good, AssetKind::Mesh);
        loader.request(2u32, missing, AssetKind::Mesh);
        assert_eq!(loader.in_flight(), 2);

        let mut completions = vec![
            loader.wait(TIMEOUT).unwrap(),
            loader.wait(TIMEOUT).unwrap(),
        ];
        completions.sort_by_key(|c| c.ticket);
        assert!(matches!(
            &completions[0].result,
            Ok(Asset::Mesh(mesh)) if mesh.triangles.len() == 1
        ));
        assert!(matches!(completions[1].result, Err(AssetError::Io { .. })));
        assert_eq!(loader.in_flight(), 0);
        assert!(loader.poll().is_empty());
    }
}
