//! Local image sequence source.
//!
//! `ImageSequenceSource` replays a directory of JPEG stills (for example a
//! recorded drone flight exported frame-by-frame) in lexical file order.
//! When the sequence is exhausted capture fails, which ends the broadcast
//! loop, unless `repeat` is set.

use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;

use super::{FrameSource, SourceStats};
use crate::frame::Frame;

/// Configuration for an image sequence source.
#[derive(Clone, Debug, Default)]
pub struct ImageSequenceConfig {
    /// Directory holding `.jpg` / `.jpeg` files.
    pub dir: PathBuf,
    /// Start over from the first file instead of ending the stream.
    pub repeat: bool,
}

pub struct ImageSequenceSource {
    config: ImageSequenceConfig,
    files: Vec<PathBuf>,
    cursor: usize,
    frame_count: u64,
    last_error: Option<String>,
}

impl ImageSequenceSource {
    pub fn new(config: ImageSequenceConfig) -> Self {
        Self {
            config,
            files: Vec::new(),
            cursor: 0,
            frame_count: 0,
            last_error: None,
        }
    }

    /// Number of frames discovered by `connect()`.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FrameSource for ImageSequenceSource {
    fn connect(&mut self) -> Result<()> {
        let entries = std::fs::read_dir(&self.config.dir)
            .with_context(|| format!("read image directory {}", self.config.dir.display()))?;
        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && is_jpeg_path(&path) {
                files.push(path);
            }
        }
        files.sort();
        if files.is_empty() {
            return Err(anyhow!(
                "no JPEG images found in {}",
                self.config.dir.display()
            ));
        }
        log::info!(
            "ImageSequenceSource: connected to {} ({} frames)",
            self.config.dir.display(),
            files.len()
        );
        self.files = files;
        self.cursor = 0;
        self.last_error = None;
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame> {
        if self.files.is_empty() {
            return Err(anyhow!(
                "image sequence {} not connected; call connect() first",
                self.config.dir.display()
            ));
        }
        if self.cursor >= self.files.len() {
            if !self.config.repeat {
                let msg = format!(
                    "image sequence {} exhausted after {} frames",
                    self.config.dir.display(),
                    self.frame_count
                );
                self.last_error = Some(msg.clone());
                return Err(anyhow!(msg));
            }
            self.cursor = 0;
        }

        let path = self.files[self.cursor].clone();
        let image = image::open(&path)
            .with_context(|| format!("decode image {}", path.display()))
            .map_err(|err| {
                self.last_error = Some(err.to_string());
                err
            })?
            .into_rgb8();
        self.cursor += 1;
        self.frame_count += 1;
        Ok(Frame::new(image, self.frame_count))
    }

    fn is_healthy(&self) -> bool {
        !self.files.is_empty() && self.last_error.is_none()
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            source: self.config.dir.display().to_string(),
        }
    }
}

fn is_jpeg_path(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn write_jpeg(dir: &std::path::Path, name: &str, width: u32, height: u32) -> Result<()> {
        let image = RgbImage::from_pixel(width, height, Rgb([90, 40, 10]));
        let bytes = crate::encode::encode_jpeg(&image)?;
        std::fs::write(dir.join(name), bytes)?;
        Ok(())
    }

    #[test]
    fn replays_files_in_order_then_ends() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write_jpeg(dir.path(), "b.jpg", 32, 16)?;
        write_jpeg(dir.path(), "a.jpg", 16, 8)?;
        std::fs::write(dir.path().join("notes.txt"), b"ignored")?;

        let mut source = ImageSequenceSource::new(ImageSequenceConfig {
            dir: dir.path().to_path_buf(),
            repeat: false,
        });
        source.connect()?;
        assert_eq!(source.len(), 2);

        let first = source.capture()?;
        assert_eq!((first.width(), first.height()), (16, 8));
        let second = source.capture()?;
        assert_eq!((second.width(), second.height()), (32, 16));

        assert!(source.capture().is_err());
        assert!(!source.is_healthy());
        Ok(())
    }

    #[test]
    fn repeat_wraps_around() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write_jpeg(dir.path(), "only.jpeg", 8, 8)?;
        let mut source = ImageSequenceSource::new(ImageSequenceConfig {
            dir: dir.path().to_path_buf(),
            repeat: true,
        });
        source.connect()?;
        for _ in 0..3 {
            source.capture()?;
        }
        assert_eq!(source.stats().frames_captured, 3);
        Ok(())
    }

    #[test]
    fn empty_directory_fails_to_connect() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut source = ImageSequenceSource::new(ImageSequenceConfig {
            dir: dir.path().to_path_buf(),
            repeat: false,
        });
        assert!(source.connect().is_err());
        Ok(())
    }
}
