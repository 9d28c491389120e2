//! Asset-loading barrier.
//!
//! A fixed set of named channels, each satisfied independently and in any
//! order. The barrier signals exactly once, the first time every channel is
//! satisfied. Satisfaction is monotonic and after completion every further
//! update is a no-op.

use std::fmt;

use itertools::Itertools;

use crate::error::BarrierError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelStatus {
    pub name: String,
    pub satisfied: bool,
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.satisfied {
            write!(f, "{}: loaded", self.name)
        } else {
            write!(f, "{}: loading...", self.name)
        }
    }
}

/// What a call to [`Barrier::mark_satisfied`] changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// The channel was already satisfied or the barrier already completed.
    Unchanged,
    /// The channel flipped but others are still pending.
    Satisfied,
    /// The channel flipped and it was the last one.
    Completed,
}

type CompletionCallback = Box<dyn FnOnce(&[ChannelStatus])>;

pub struct Barrier {
    channels: Vec<ChannelStatus>,
    pending: usize,
    completed: bool,
    callbacks: Vec<CompletionCallback>,
}

impl fmt::Debug for Barrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Barrier")
            .field("channels", &self.channels)
            .field("pending", &self.pending)
            .field("completed", &self.completed)
            .finish()
    }
}

impl Barrier {
    /// Registers the complete channel set. No channel can be added later.
    pub fn new<I, S>(names: I) -> Result<Self, BarrierError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut channels: Vec<ChannelStatus> = Vec::new();
        for name in names {
            let name = name.into();
            if channels.iter().any(|c| c.name == name) {
                return Err(BarrierError::DuplicateChannel(name));
            }
            channels.push(ChannelStatus {
                name,
                satisfied: false,
            });
        }
        let pending = channels.len();
        Ok(Self {
            channels,
            pending,
            completed: pending == 0,
            callbacks: Vec::new(),
        })
    }

    pub fn mark_satisfied(&mut self, name: &str) -> Result<Progress, BarrierError> {
        let channel = self
            .channels
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| BarrierError::UnknownChannel(name.to_string()))?;

        if self.completed || channel.satisfied {
            return Ok(Progress::Unchanged);
        }

        channel.satisfied = true;
        self.pending -= 1;
        log::info!(
            "channel '{}' satisfied ({}/{})",
            name,
            self.channels.len() - self.pending,
            self.channels.len()
        );

        if self.pending > 0 {
            return Ok(Progress::Satisfied);
        }

        self.completed = true;
        log::info!("all {} channels satisfied", self.channels.len());
        for callback in self.callbacks.drain(..) {
            callback(&self.channels);
        }
        Ok(Progress::Completed)
    }

    /// Runs `callback` once, when the last channel is satisfied. If that
    /// already happened it runs right away.
    pub fn on_all_satisfied<F>(&mut self, callback: F)
    where
        F: FnOnce(&[ChannelStatus]) + 'static,
    {
        if self.completed {
            callback(&self.channels);
        } else {
            self.callbacks.push(Box::new(callback));
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    pub fn is_satisfied(&self, name: &str) -> Result<bool, BarrierError> {
        self.channels
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.satisfied)
            .ok_or_else(|| BarrierError::UnknownChannel(name.to_string()))
    }

    /// Per-channel state in registration order, current as of the last update.
    pub fn status(&self) -> &[ChannelStatus] {
        &self.channels
    }

    pub fn pending(&self) -> impl Iterator<Item = &str> {
        self.channels
            .iter()
            .filter(|c| !c.satisfied)
            .map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn status_line(&self) -> String {
        self.channels.iter().join(", ")
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn counter(barrier: &mut Barrier) -> Rc<Cell<u32>> {
        let fired = Rc::new(Cell::new(0));
        let handle = fired.clone();
        barrier.on_all_satisfied(move |_| handle.set(handle.get() + 1));
        fired
    }

    #[test]
    fn test_fires_once_for_any_order() {
        let mut rng = StdRng::seed_from_u64(0x7ab1e4u64);
        for _ in 0..200 {
            let size = rng.gen_range(1..40);
            let mut names: Vec<String> = (0..size).map(|i| format!("channel-{}", i)).collect();
            let mut barrier = Barrier::new(names.clone()).unwrap();
            let fired = counter(&mut barrier);

            names.shuffle(&mut rng);
            for (i, name) in names.iter().enumerate() {
                assert_eq!(fired.get(), 0);
                let progress = barrier.mark_satisfied(name).unwrap();
                if i + 1 == names.len() {
                    assert_eq!(progress, Progress::Completed);
                } else {
                    assert_eq!(progress, Progress::Satisfied);
                    assert!(!barrier.is_complete());
                }
            }
            assert_eq!(fired.get(), 1);

            // Replaying everything after completion changes nothing.
            for name in names.iter() {
                assert_eq!(barrier.mark_satisfied(name).unwrap(), Progress::Unchanged);
            }
            assert_eq!(fired.get(), 1);
        }
    }

    #[test]
    fn test_mark_is_idempotent() {
        let mut barrier = Barrier::new(["faces", "backdrop"]).unwrap();
        let fired = counter(&mut barrier);
        assert_eq!(barrier.mark_satisfied("faces").unwrap(), Progress::Satisfied);
        assert_eq!(barrier.mark_satisfied("faces").unwrap(), Progress::Unchanged);
        assert_eq!(barrier.pending().collect::<Vec<_>>(), vec!["backdrop"]);
        assert_eq!(fired.get(), 0);
        assert_eq!(barrier.mark_satisfied("backdrop").unwrap(), Progress::Completed);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_unknown_channel_is_an_error() {
        let mut barrier = Barrier::new(["faces"]).unwrap();
        assert_eq!(
            barrier.mark_satisfied("props"),
            Err(BarrierError::UnknownChannel("props".to_string()))
        );
        assert!(barrier.is_satisfied("props").is_err());
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        assert_eq!(
            Barrier::new(["faces", "faces"]).unwrap_err(),
            BarrierError::DuplicateChannel("faces".to_string())
        );
    }

    #[test]
    fn test_status_tracks_every_update() {
        let mut barrier = Barrier::new(["faces", "camera"]).unwrap();
        assert_eq!(barrier.status_line(), "faces: loading..., camera: loading...");
        barrier.mark_satisfied("camera").unwrap();
        assert!(barrier.status()[1].satisfied);
        assert!(!barrier.status()[0].satisfied);
        assert_eq!(barrier.status_line(), "faces: loading..., camera: loaded");
    }

    #[test]
    fn test_late_callback_fires_immediately() {
        let mut barrier = Barrier::new(["faces"]).unwrap();
        barrier.mark_satisfied("faces").unwrap();
        let fired = counter(&mut barrier);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_empty_barrier_is_complete() {
        let mut barrier = Barrier::new(Vec::<String>::new()).unwrap();
        assert!(barrier.is_complete());
        assert!(barrier.is_empty());
        let fired = counter(&mut barrier);
        assert_eq!(fired.get(), 1);
    }
}
