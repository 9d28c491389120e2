//! Discovery of a numbered resource sequence (`panorama1.png`,
//! `panorama2.png`, ...) whose length is not known up front.
//!
//! Candidates are probed one at a time in index order. The scan gives up
//! after a run of consecutive misses or past a hard index bound, whichever
//! comes first, so a sparse or missing directory never scans forever.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use crossbeam::channel;

pub trait Probe {
    /// Whether `path` exists and is usable. Anything that cannot be decided
    /// within `timeout` counts as missing.
    fn exists(&mut self, path: &Path, timeout: Duration) -> bool;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryParams {
    pub dir: PathBuf,
    pub prefix: String,
    pub extension: String,
    pub first_index: u32,
    pub max_index: u32,
    pub max_consecutive_misses: u32,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Discovery {
    params: DiscoveryParams,
    index: u32,
    misses: u32,
    found: Vec<PathBuf>,
}

impl Discovery {
    pub fn new(params: DiscoveryParams) -> Self {
        let index = params.first_index;
        Self {
            params,
            index,
            misses: 0,
            found: Vec::new(),
        }
    }

    pub fn candidate(&self, index: u32) -> PathBuf {
        self.params.dir.join(format!(
            "{}{}.{}",
            self.params.prefix, index, self.params.extension
        ))
    }

    pub fn is_finished(&self) -> bool {
        self.index > self.params.max_index || self.misses >= self.params.max_consecutive_misses
    }

    /// The path to probe next, or `None` once the scan has stopped.
    pub fn next_candidate(&self) -> Option<PathBuf> {
        if self.is_finished() {
            None
        } else {
            Some(self.candidate(self.index))
        }
    }

    /// Records the outcome for the current candidate and moves on.
    pub fn record(&mut self, exists: bool) {
        if self.is_finished() {
            return;
        }
        if exists {
            let path = self.candidate(self.index);
            log::debug!("discovered {}", path.display());
            self.found.push(path);
            self.misses = 0;
        } else {
            self.misses += 1;
        }
        self.index += 1;
    }

    pub fn found(&self) -> &[PathBuf] {
        &self.found
    }

    /// Drives the scan to the end with `probe`, one candidate at a time.
    pub fn run<P: Probe>(mut self, probe: &mut P) -> Vec<PathBuf> {
        while let Some(path) = self.next_candidate() {
            let exists = probe.exists(&path, self.params.timeout);
            log::trace!("probe {} -> {}", path.display(), exists);
            self.record(exists);
        }
        log::info!(
            "discovered {} file(s) matching {}{{N}}.{} in {}",
            self.found.len(),
            self.params.prefix,
            self.params.extension,
            self.params.dir.display()
        );
        self.found
    }
}

/// Probes a path by decoding only its image header.
///
/// Each probe gets a thread of its own, so the timeout only ever covers the
/// read itself and never time spent queued behind asset decodes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageProbe;

impl Probe for ImageProbe {
    fn exists(&mut self, path: &Path, timeout: Duration) -> bool {
        let (sender, receiver) = channel::bounded(1);
        let path = path.to_path_buf();
        let spawned = thread::Builder::new()
            .name("image-probe".to_string())
            .spawn(move || {
                let readable = image::ImageReader::open(&path)
                    .and_then(|reader| reader.with_guessed_format())
                    .map(|reader| reader.into_dimensions().is_ok())
                    .unwrap_or(false);
                // The prober may have given up already.
                let _ = sender.send(readable);
            });
        if let Err(err) = spawned {
            log::warn!("failed to start image probe: {}", err);
            return false;
        }
        receiver.recv_timeout(timeout).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    struct SetProbe {
        present: HashSet<u32>,
        probed: Vec<PathBuf>,
    }

    impl SetProbe {
        fn new(present: impl IntoIterator<Item = u32>) -> Self {
            Self {
                present: present.into_iter().collect(),
                probed: Vec::new(),
            }
        }
    }

    impl Probe for SetProbe {
        fn exists(&mut self, path: &Path, _timeout: Duration) -> bool {
            self.probed.push(path.to_path_buf());
            let name = path.file_stem().unwrap().to_str().unwrap();
            let index: u32 = name.trim_start_matches("panorama").parse().unwrap();
            self.present.contains(&index)
        }
    }

    fn params() -> DiscoveryParams {
        DiscoveryParams {
            dir: PathBuf::from("resources/backgrounds"),
            prefix: "panorama".to_string(),
            extension: "png".to_string(),
            first_index: 1,
            max_index: 10_000,
            max_consecutive_misses: 20,
            timeout: Duration::from_millis(1500),
        }
    }

    #[test]
    fn test_stops_after_consecutive_misses() {
        let mut probe = SetProbe::new([1, 2, 3, 10, 31, 32]);
        let found = Discovery::new(params()).run(&mut probe);
        // 11..=30 are twenty misses in a row, so 31 is never probed.
        assert_eq!(
            found,
            vec![
                PathBuf::from("resources/backgrounds/panorama1.png"),
                PathBuf::from("resources/backgrounds/panorama2.png"),
                PathBuf::from("resources/backgrounds/panorama3.png"),
                PathBuf::from("resources/backgrounds/panorama10.png"),
            ]
        );
        assert_eq!(probe.probed.len(), 30);
    }

    #[test]
    fn test_empty_directory() {
        let mut probe = SetProbe::new([]);
        let found = Discovery::new(params()).run(&mut probe);
        assert!(found.is_empty());
        assert_eq!(probe.probed.len(), 20);
    }

    #[test]
    fn test_hard_index_bound() {
        let mut probe = SetProbe::new(1..=100);
        let found = Discovery::new(DiscoveryParams {
            max_index: 50,
            ..params()
        })
        .run(&mut probe);
        assert_eq!(found.len(), 50);
        assert_eq!(probe.probed.len(), 50);
    }

    #[test]
    fn test_manual_stepping() {
        let mut discovery = Discovery::new(DiscoveryParams {
            max_consecutive_misses: 2,
            ..params()
        });
        assert_eq!(
            discovery.next_candidate(),
            Some(PathBuf::from("resources/backgrounds/panorama1.png"))
        );
        discovery.record(true);
        discovery.record(false);
        assert!(!discovery.is_finished());
        discovery.record(false);
        assert!(discovery.is_finished());
        assert_eq!(discovery.next_candidate(), None);
        discovery.record(true);
        assert_eq!(discovery.found().len(), 1);
    }

    #[test]
    fn test_image_probe_misses_missing_file() {
        let mut probe = ImageProbe;
        let path = std::env::temp_dir().join("tableau-probe-missing-7f3a.png");
        assert!(!probe.exists(&path, Duration::from_millis(1500)));
    }

    #[test]
    fn test_image_probe_ignores_busy_pool() {
        let dir = std::env::temp_dir().join("tableau-probe-busy");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("panorama1.png");
        image::RgbaImage::new(4, 2).save(&path).unwrap();

        for _ in 0..2 * rayon::current_num_threads() {
            rayon::spawn(|| std::thread::sleep(Duration::from_secs(2)));
        }
        let mut probe = ImageProbe;
        assert!(probe.exists(&path, Duration::from_millis(1500)));
    }
}
