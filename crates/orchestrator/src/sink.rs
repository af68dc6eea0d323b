//! Render targets for density frames.

use std::fs::File;
use std::io::BufWriter;
use std::sync::{Arc, Mutex, MutexGuard};

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, DynamicImage, Frame, GrayImage, Luma};

use crate::config::JobConfig;
use crate::error::SinkError;

/// Where rendered frames go.
///
/// A sink holds `frames` frames of a fixed size. Frames are opened one at a
/// time with [`new_frame`](ImageSink::new_frame) and filled with
/// [`set_pixel`](ImageSink::set_pixel); [`save`](ImageSink::save) finalizes
/// the whole animation.
pub trait ImageSink {
    /// Start (or restart) frame `index` as all black.
    fn new_frame(&mut self, index: usize) -> Result<(), SinkError>;

    /// Set one pixel of the open frame.
    fn set_pixel(&mut self, x: usize, y: usize, brightness: u16) -> Result<(), SinkError>;

    /// Write everything out.
    fn save(&mut self) -> Result<(), SinkError>;

    /// Human-readable name of the output target.
    fn target(&self) -> &str;
}

/// Map a density value to a 16-bit grey level.
pub fn brightness(density: f32) -> u16 {
    (density * 65535.0).clamp(0.0, 65535.0) as u16
}

fn check_pixel(x: usize, y: usize, width: usize, height: usize) -> Result<(), SinkError> {
    if x >= width || y >= height {
        return Err(SinkError::PixelOutOfRange {
            x,
            y,
            width,
            height,
        });
    }
    Ok(())
}

/// Animated GIF written to a file on [`save`](ImageSink::save).
///
/// Frames are kept in memory as 8-bit grey until then and expanded to RGBA
/// only while encoding; frames that were never started are encoded black.
pub struct GifSink {
    path: String,
    width: u32,
    height: u32,
    delay: u32,
    frames: Vec<Option<GrayImage>>,
    current: Option<usize>,
}

impl GifSink {
    /// Sink for `frames` frames of `width x height`, each shown for `delay`
    /// hundredths of a second.
    pub fn new(path: &str, width: u32, height: u32, frames: usize, delay: u32) -> Self {
        Self {
            path: path.to_string(),
            width,
            height,
            delay,
            frames: vec![None; frames],
            current: None,
        }
    }

    /// Sink matching a job record: one `size x size` frame per tick.
    pub fn from_config(config: &JobConfig) -> Result<Self, SinkError> {
        let side = u32::try_from(config.size)
            .ok()
            .filter(|&side| side <= u32::from(u16::MAX))
            .ok_or(SinkError::FrameTooLarge { size: config.size })?;
        Ok(Self::new(&config.out_path, side, side, config.frames, config.delay))
    }

    fn blank(&self) -> GrayImage {
        GrayImage::new(self.width, self.height)
    }
}

impl ImageSink for GifSink {
    fn new_frame(&mut self, index: usize) -> Result<(), SinkError> {
        if index >= self.frames.len() {
            return Err(SinkError::FrameOutOfRange {
                index,
                frames: self.frames.len(),
            });
        }
        self.frames[index] = Some(self.blank());
        self.current = Some(index);
        Ok(())
    }

    fn set_pixel(&mut self, x: usize, y: usize, brightness: u16) -> Result<(), SinkError> {
        check_pixel(x, y, self.width as usize, self.height as usize)?;
        let frame = self
            .current
            .and_then(|index| self.frames[index].as_mut())
            .ok_or(SinkError::NoActiveFrame)?;

        frame.put_pixel(x as u32, y as u32, Luma([(brightness >> 8) as u8]));
        Ok(())
    }

    fn save(&mut self) -> Result<(), SinkError> {
        let file = File::create(&self.path)?;
        let mut encoder = GifEncoder::new(BufWriter::new(file));
        encoder.set_repeat(Repeat::Infinite)?;

        // GIF delays are in hundredths of a second.
        let delay = Delay::from_numer_denom_ms(self.delay.saturating_mul(10), 1);
        for index in 0..self.frames.len() {
            let grey = match self.frames[index].take() {
                Some(grey) => grey,
                None => self.blank(),
            };
            let image = DynamicImage::ImageLuma8(grey).to_rgba8();
            encoder.encode_frame(Frame::from_parts(image, 0, 0, delay))?;
        }
        self.current = None;

        tracing::debug!("Encoded {} frame(s) into {}", self.frames.len(), self.path);
        Ok(())
    }

    fn target(&self) -> &str {
        &self.path
    }
}

#[derive(Debug, Default)]
struct Recording {
    frames: Vec<Vec<u16>>,
    current: Option<usize>,
    saved: bool,
}

/// In-memory sink that keeps raw 16-bit frames for inspection.
///
/// Clones share the same recording, so a test can keep one handle and hand
/// another to a job.
#[derive(Debug, Clone)]
pub struct FrameRecorder {
    name: String,
    width: usize,
    height: usize,
    fail_save: bool,
    recording: Arc<Mutex<Recording>>,
}

impl FrameRecorder {
    /// Recorder for `width x height` frames.
    pub fn new(name: &str, width: usize, height: usize) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
            fail_save: false,
            recording: Arc::default(),
        }
    }

    /// A recorder whose `save` always fails with an I/O error.
    pub fn failing(name: &str, width: usize, height: usize) -> Self {
        Self {
            fail_save: true,
            ..Self::new(name, width, height)
        }
    }

    /// Every frame started so far, in index order.
    pub fn frames(&self) -> Vec<Vec<u16>> {
        self.lock().frames.clone()
    }

    /// Whether `save` has completed successfully.
    pub fn is_saved(&self) -> bool {
        self.lock().saved
    }

    fn lock(&self) -> MutexGuard<'_, Recording> {
        self.recording.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ImageSink for FrameRecorder {
    fn new_frame(&mut self, index: usize) -> Result<(), SinkError> {
        let cells = self.width * self.height;
        let mut recording = self.lock();
        if recording.frames.len() <= index {
            recording.frames.resize(index + 1, vec![0; cells]);
        }
        recording.frames[index] = vec![0; cells];
        recording.current = Some(index);
        Ok(())
    }

    fn set_pixel(&mut self, x: usize, y: usize, brightness: u16) -> Result<(), SinkError> {
        check_pixel(x, y, self.width, self.height)?;
        let width = self.width;
        let mut recording = self.lock();
        let index = recording.current.ok_or(SinkError::NoActiveFrame)?;
        recording.frames[index][x + y * width] = brightness;
        Ok(())
    }

    fn save(&mut self) -> Result<(), SinkError> {
        if self.fail_save {
            return Err(SinkError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("{} is read-only", self.name),
            )));
        }
        self.lock().saved = true;
        Ok(())
    }

    fn target(&self) -> &str {
        &self.name
    }
}
