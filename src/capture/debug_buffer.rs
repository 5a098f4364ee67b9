//! Debug Frame Ring
//!
//! Keeps the last few encoded frames and periodically writes them to disk
//! as `frame_0.jpg` (oldest) through `frame_{N-1}.jpg`. Disk errors are
//! logged and otherwise ignored.

use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Frames kept in the ring.
pub const DEBUG_RING_SIZE: usize = 5;

/// Rolling window of recent frames with a best-effort disk dump.
#[derive(Debug)]
pub struct DebugFrameBuffer {
    dir: PathBuf,
    save_every: u64,
    frames: VecDeque<Vec<u8>>,
    seen: u64,
}

impl DebugFrameBuffer {
    /// Ring writing into `dir`, dumping on the first frames and every `save_every`th after.
    pub fn new(dir: impl Into<PathBuf>, save_every: u32) -> Self {
        let dir = dir.into();
        if let Err(e) = fs::create_dir_all(&dir) {
            warn!("Cannot create debug frame dir {}: {}", dir.display(), e);
        }
        Self {
            dir,
            save_every: save_every.max(1) as u64,
            frames: VecDeque::with_capacity(DEBUG_RING_SIZE),
            seen: 0,
        }
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Frames currently held.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// True before the first frame.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Add a frame; returns `true` if the ring was written out.
    pub fn push(&mut self, payload: &[u8]) -> bool {
        if self.frames.len() == DEBUG_RING_SIZE {
            self.frames.pop_front();
        }
        self.frames.push_back(payload.to_vec());
        self.seen += 1;

        if self.seen <= DEBUG_RING_SIZE as u64 || self.seen % self.save_every == 0 {
            match self.flush() {
                Ok(()) => return true,
                Err(e) => warn!("Failed to write debug frames to {}: {}", self.dir.display(), e),
            }
        }
        false
    }

    /// Write every held frame, oldest first.
    pub fn flush(&self) -> io::Result<()> {
        for (i, frame) in self.frames.iter().enumerate() {
            fs::write(self.dir.join(format!("frame_{}.jpg", i)), frame)?;
        }
        debug!("Wrote {} debug frames to {}", self.frames.len(), self.dir.display());
        Ok(())
    }
}
