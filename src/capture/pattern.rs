//! Synthetic frame source: a scrolling gradient with a marker block.

use crate::capture::frame::{CaptureError, FrameSource};

/// Animated test pattern standing in for a real framebuffer.
#[derive(Debug, Clone)]
pub struct TestPatternSource {
    width: u32,
    height: u32,
    frame: u64,
}

impl TestPatternSource {
    /// Pattern of the given framebuffer size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame: 0,
        }
    }

    /// Frames produced so far.
    pub fn frames_read(&self) -> u64 {
        self.frame
    }

    /// Resize, as a window would.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }
}

impl FrameSource for TestPatternSource {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn read_pixels(&mut self, buf: &mut Vec<u8>) -> Result<(), CaptureError> {
        if self.width == 0 || self.height == 0 {
            return Err(CaptureError::EmptyFramebuffer {
                width: self.width,
                height: self.height,
            });
        }

        let (w, h) = (self.width as usize, self.height as usize);
        buf.clear();
        buf.resize(w * h * 4, 0);

        let shift = (self.frame % 256) as usize;
        let marker = (self.frame as usize * 4) % w.max(1);
        for y in 0..h {
            for x in 0..w {
                let i = (y * w + x) * 4;
                let in_marker = x >= marker && x < marker + 8 && y < 8;
                if in_marker {
                    buf[i..i + 4].copy_from_slice(&[255, 255, 255, 255]);
                } else {
                    buf[i] = ((x * 255 / w) + shift) as u8;
                    buf[i + 1] = (y * 255 / h) as u8;
                    buf[i + 2] = shift as u8;
                    buf[i + 3] = 255;
                }
            }
        }

        self.frame += 1;
        Ok(())
    }
}
