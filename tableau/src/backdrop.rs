use std::path::{Path, PathBuf};

/// Cycles through the available panoramas.
#[derive(Debug, Clone, Default)]
pub struct BackdropRotator {
    paths: Vec<PathBuf>,
    current: usize,
}

impl BackdropRotator {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths, current: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> Option<&Path> {
        self.paths.get(self.current).map(PathBuf::as_path)
    }

    pub fn path(&self, index: usize) -> Option<&Path> {
        self.paths.get(index).map(PathBuf::as_path)
    }

    /// Moves to the next backdrop, wrapping around.
    pub fn advance(&mut self) -> Option<(usize, &Path)> {
        if self.paths.is_empty() {
            log::warn!("no backdrops available");
            return None;
        }
        self.current = (self.current + 1) % self.paths.len();
        Some((self.current, self.paths[self.current].as_path()))
    }
}
