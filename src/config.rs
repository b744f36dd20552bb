use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::render::MAX_RADIUS;

const DEFAULT_ADDR: &str = "0.0.0.0:5005";
const DEFAULT_CAMERA_INDEX: u32 = 0;
const DEFAULT_CAMERA_FPS: u32 = 10;
const DEFAULT_CAMERA_WIDTH: u32 = 640;
const DEFAULT_CAMERA_HEIGHT: u32 = 480;
const DEFAULT_BACKEND: &str = "tract";
const DEFAULT_MODEL_PATH: &str = "yolov8n.onnx";
const DEFAULT_CONFIDENCE: f32 = 0.25;
const DEFAULT_IOU: f32 = 0.7;
const DEFAULT_INTERVAL_MS: u64 = 600;
const DEFAULT_CHANNEL_CAPACITY: usize = 4;
const DEFAULT_HEATMAP_RADIUS: u32 = 50;
const DEFAULT_BASE_LATITUDE: f64 = 24.7136;
const DEFAULT_BASE_LONGITUDE: f64 = 46.6753;
const DEFAULT_JITTER_DEG: f64 = 0.001;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SkyfeedConfigFile {
    server: Option<ServerConfigFile>,
    camera: Option<CameraConfigFile>,
    detector: Option<DetectorConfigFile>,
    stream: Option<StreamConfigFile>,
    heatmap: Option<HeatmapConfigFile>,
    gps: Option<GpsConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ServerConfigFile {
    addr: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    device: Option<String>,
    index: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
    target_fps: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
    confidence: Option<f32>,
    iou: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct StreamConfigFile {
    interval_ms: Option<u64>,
    channel_capacity: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct HeatmapConfigFile {
    radius: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct GpsConfigFile {
    base_latitude: Option<f64>,
    base_longitude: Option<f64>,
    jitter_deg: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct SkyfeedConfig {
    pub server: ServerSettings,
    pub camera: CameraSettings,
    pub detector: DetectorSettings,
    pub stream: StreamSettings,
    pub heatmap: HeatmapSettings,
    pub gps: GpsSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: String,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    /// Explicit device (`/dev/videoN`, `stub://name`, `http://...`, or a directory).
    pub device: Option<String>,
    pub index: u32,
    pub width: u32,
    pub height: u32,
    pub target_fps: u32,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub backend: String,
    pub model_path: PathBuf,
    pub confidence: f32,
    pub iou: f32,
}

#[derive(Debug, Clone)]
pub struct StreamSettings {
    pub interval: Duration,
    pub channel_capacity: usize,
}

#[derive(Debug, Clone)]
pub struct HeatmapSettings {
    pub radius: u32,
}

#[derive(Debug, Clone)]
pub struct GpsSettings {
    pub base_latitude: f64,
    pub base_longitude: f64,
    pub jitter_deg: f64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
        }
    }
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            device: None,
            index: DEFAULT_CAMERA_INDEX,
            width: DEFAULT_CAMERA_WIDTH,
            height: DEFAULT_CAMERA_HEIGHT,
            target_fps: DEFAULT_CAMERA_FPS,
        }
    }
}

impl CameraSettings {
    /// The configured device, or `/dev/video{index}` when none is set.
    pub fn device_path(&self) -> String {
        match self.device.as_deref() {
            Some(device) if !device.trim().is_empty() => device.to_string(),
            _ => format!("/dev/video{}", self.index),
        }
    }
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            backend: DEFAULT_BACKEND.to_string(),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            confidence: DEFAULT_CONFIDENCE,
            iou: DEFAULT_IOU,
        }
    }
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl Default for HeatmapSettings {
    fn default() -> Self {
        Self {
            radius: DEFAULT_HEATMAP_RADIUS,
        }
    }
}

impl Default for GpsSettings {
    fn default() -> Self {
        Self {
            base_latitude: DEFAULT_BASE_LATITUDE,
            base_longitude: DEFAULT_BASE_LONGITUDE,
            jitter_deg: DEFAULT_JITTER_DEG,
        }
    }
}

impl SkyfeedConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SKYFEED_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: SkyfeedConfigFile) -> Self {
        let server = file.server.unwrap_or_default();
        let camera = file.camera.unwrap_or_default();
        let detector = file.detector.unwrap_or_default();
        let stream = file.stream.unwrap_or_default();
        let heatmap = file.heatmap.unwrap_or_default();
        let gps = file.gps.unwrap_or_default();

        Self {
            server: ServerSettings {
                addr: server.addr.unwrap_or_else(|| DEFAULT_ADDR.to_string()),
            },
            camera: CameraSettings {
                device: camera.device,
                index: camera.index.unwrap_or(DEFAULT_CAMERA_INDEX),
                width: camera.width.unwrap_or(DEFAULT_CAMERA_WIDTH),
                height: camera.height.unwrap_or(DEFAULT_CAMERA_HEIGHT),
                target_fps: camera.target_fps.unwrap_or(DEFAULT_CAMERA_FPS),
            },
            detector: DetectorSettings {
                backend: detector
                    .backend
                    .unwrap_or_else(|| DEFAULT_BACKEND.to_string()),
                model_path: detector
                    .model_path
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
                confidence: detector.confidence.unwrap_or(DEFAULT_CONFIDENCE),
                iou: detector.iou.unwrap_or(DEFAULT_IOU),
            },
            stream: StreamSettings {
                interval: Duration::from_millis(
                    stream.interval_ms.unwrap_or(DEFAULT_INTERVAL_MS),
                ),
                channel_capacity: stream.channel_capacity.unwrap_or(DEFAULT_CHANNEL_CAPACITY),
            },
            heatmap: HeatmapSettings {
                radius: heatmap.radius.unwrap_or(DEFAULT_HEATMAP_RADIUS),
            },
            gps: GpsSettings {
                base_latitude: gps.base_latitude.unwrap_or(DEFAULT_BASE_LATITUDE),
                base_longitude: gps.base_longitude.unwrap_or(DEFAULT_BASE_LONGITUDE),
                jitter_deg: gps.jitter_deg.unwrap_or(DEFAULT_JITTER_DEG),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(addr) = std::env::var("SKYFEED_ADDR") {
            if !addr.trim().is_empty() {
                self.server.addr = addr;
            }
        }
        if let Ok(camera) = std::env::var("SKYFEED_CAMERA") {
            if !camera.trim().is_empty() {
                self.camera.device = Some(camera);
            }
        }
        if let Ok(backend) = std::env::var("SKYFEED_BACKEND") {
            if !backend.trim().is_empty() {
                self.detector.backend = backend.trim().to_string();
            }
        }
        if let Ok(model) = std::env::var("SKYFEED_MODEL") {
            if !model.trim().is_empty() {
                self.detector.model_path = PathBuf::from(model);
            }
        }
        if let Ok(interval) = std::env::var("SKYFEED_INTERVAL_MS") {
            let millis: u64 = interval.trim().parse().map_err(|_| {
                anyhow!("SKYFEED_INTERVAL_MS must be an integer number of milliseconds")
            })?;
            self.stream.interval = Duration::from_millis(millis);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.stream.interval.is_zero() {
            return Err(anyhow!("stream interval must be greater than zero"));
        }
        if self.stream.channel_capacity == 0 {
            return Err(anyhow!("stream channel capacity must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&self.detector.confidence) {
            return Err(anyhow!(
                "detector confidence must be within [0, 1], got {}",
                self.detector.confidence
            ));
        }
        if !(0.0..=1.0).contains(&self.detector.iou) {
            return Err(anyhow!(
                "detector iou must be within [0, 1], got {}",
                self.detector.iou
            ));
        }
        if self.heatmap.radius == 0 || self.heatmap.radius > MAX_RADIUS {
            return Err(anyhow!(
                "heatmap radius must be within [1, {}], got {}",
                MAX_RADIUS,
                self.heatmap.radius
            ));
        }
        if self.gps.jitter_deg.is_nan() || self.gps.jitter_deg < 0.0 {
            return Err(anyhow!(
                "gps jitter must be non-negative, got {}",
                self.gps.jitter_deg
            ));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera width and height must be non-zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<SkyfeedConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = toml::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_path_falls_back_to_index() {
        let camera = CameraSettings {
            index: 2,
            ..CameraSettings::default()
        };
        assert_eq!(camera.device_path(), "/dev/video2");

        let camera = CameraSettings {
            device: Some("stub://drone".to_string()),
            ..CameraSettings::default()
        };
        assert_eq!(camera.device_path(), "stub://drone");
    }

    #[test]
    fn empty_file_yields_defaults() -> Result<()> {
        let cfg = SkyfeedConfig::from_file(toml::from_str("")?);
        assert_eq!(cfg.server.addr, "0.0.0.0:5005");
        assert_eq!(cfg.stream.interval, Duration::from_millis(600));
        assert_eq!(cfg.stream.channel_capacity, 4);
        assert_eq!(cfg.heatmap.radius, 50);
        assert_eq!(cfg.detector.backend, "tract");
        cfg.validate()?;
        Ok(())
    }

    #[test]
    fn validation_rejects_out_of_range_values() -> Result<()> {
        let mut cfg = SkyfeedConfig::from_file(SkyfeedConfigFile::default());
        cfg.detector.confidence = 1.5;
        assert!(cfg.validate().is_err());

        let mut cfg = SkyfeedConfig::from_file(SkyfeedConfigFile::default());
        cfg.heatmap.radius = 0;
        assert!(cfg.validate().is_err());
        cfg.heatmap.radius = MAX_RADIUS + 1;
        assert!(cfg.validate().is_err());
        cfg.heatmap.radius = MAX_RADIUS;
        cfg.validate()?;

        let mut cfg = SkyfeedConfig::from_file(SkyfeedConfigFile::default());
        cfg.gps.jitter_deg = -0.5;
        assert!(cfg.validate().is_err());

        let mut cfg = SkyfeedConfig::from_file(toml::from_str("[stream]\nchannel_capacity = 0\n")?);
        assert!(cfg.validate().is_err());
        cfg.stream.channel_capacity = 1;
        cfg.validate()?;
        Ok(())
    }
}
