use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use tempfile::NamedTempFile;

use skyfeed::config::SkyfeedConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "SKYFEED_CONFIG",
        "SKYFEED_ADDR",
        "SKYFEED_CAMERA",
        "SKYFEED_BACKEND",
        "SKYFEED_MODEL",
        "SKYFEED_INTERVAL_MS",
    ] {
        std::env::remove_var(key);
    }
}

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, contents.as_bytes()).expect("write config");
    file
}

#[test]
fn defaults_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = SkyfeedConfig::load().expect("load config");

    assert_eq!(cfg.server.addr, "0.0.0.0:5005");
    assert_eq!(cfg.camera.device_path(), "/dev/video0");
    assert_eq!((cfg.camera.width, cfg.camera.height), (640, 480));
    assert_eq!(cfg.detector.backend, "tract");
    assert_eq!(cfg.detector.model_path, PathBuf::from("yolov8n.onnx"));
    assert_eq!(cfg.detector.confidence, 0.25);
    assert_eq!(cfg.detector.iou, 0.7);
    assert_eq!(cfg.stream.interval, Duration::from_millis(600));
    assert_eq!(cfg.stream.channel_capacity, 4);
    assert_eq!(cfg.heatmap.radius, 50);
    assert_eq!(cfg.gps.base_latitude, 24.7136);
    assert_eq!(cfg.gps.base_longitude, 46.6753);
    assert_eq!(cfg.gps.jitter_deg, 0.001);
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config(
        r#"
[server]
addr = "127.0.0.1:9000"

[camera]
index = 2
width = 1280
height = 720
target_fps = 15

[detector]
backend = "cpu"
confidence = 0.4

[stream]
interval_ms = 250
channel_capacity = 8

[heatmap]
radius = 30

[gps]
base_latitude = 51.5
base_longitude = -0.12
jitter_deg = 0.0
"#,
    );

    std::env::set_var("SKYFEED_CONFIG", file.path());
    std::env::set_var("SKYFEED_CAMERA", "stub://drone");
    std::env::set_var("SKYFEED_INTERVAL_MS", "100");
    std::env::set_var("SKYFEED_MODEL", "/opt/models/yolov8s.onnx");

    let cfg = SkyfeedConfig::load().expect("load config");

    assert_eq!(cfg.server.addr, "127.0.0.1:9000");
    assert_eq!(cfg.camera.index, 2);
    assert_eq!(cfg.camera.device_path(), "stub://drone");
    assert_eq!((cfg.camera.width, cfg.camera.height), (1280, 720));
    assert_eq!(cfg.camera.target_fps, 15);
    assert_eq!(cfg.detector.backend, "cpu");
    assert_eq!(cfg.detector.confidence, 0.4);
    assert_eq!(cfg.detector.iou, 0.7);
    assert_eq!(
        cfg.detector.model_path,
        PathBuf::from("/opt/models/yolov8s.onnx")
    );
    assert_eq!(cfg.stream.interval, Duration::from_millis(100));
    assert_eq!(cfg.stream.channel_capacity, 8);
    assert_eq!(cfg.heatmap.radius, 30);
    assert_eq!(cfg.gps.base_latitude, 51.5);
    assert_eq!(cfg.gps.jitter_deg, 0.0);

    clear_env();
}

#[test]
fn rejects_invalid_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("SKYFEED_INTERVAL_MS", "0");
    assert!(SkyfeedConfig::load().is_err());

    std::env::set_var("SKYFEED_INTERVAL_MS", "soon");
    let err = SkyfeedConfig::load().unwrap_err();
    assert!(err.to_string().contains("SKYFEED_INTERVAL_MS"));
    std::env::remove_var("SKYFEED_INTERVAL_MS");

    let file = write_config("[detector]\niou = 1.5\n");
    std::env::set_var("SKYFEED_CONFIG", file.path());
    assert!(SkyfeedConfig::load().is_err());

    let file = write_config("[heatmap]\nradius = 0\n");
    std::env::set_var("SKYFEED_CONFIG", file.path());
    assert!(SkyfeedConfig::load().is_err());

    let file = write_config("[heatmap]\nradius = 4294967295\n");
    std::env::set_var("SKYFEED_CONFIG", file.path());
    let err = SkyfeedConfig::load().unwrap_err();
    assert!(err.to_string().contains("heatmap radius"));

    let file = write_config("[gps]\njitter_deg = -0.1\n");
    std::env::set_var("SKYFEED_CONFIG", file.path());
    assert!(SkyfeedConfig::load().is_err());

    clear_env();
}

#[test]
fn rejects_unknown_sections_and_bad_toml() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config("[rtsp]\nurl = \"rtsp://camera\"\n");
    std::env::set_var("SKYFEED_CONFIG", file.path());
    assert!(SkyfeedConfig::load().is_err());

    let file = write_config("[server\naddr = ");
    std::env::set_var("SKYFEED_CONFIG", file.path());
    let err = SkyfeedConfig::load().unwrap_err();
    assert!(err.to_string().contains("invalid config file"));

    std::env::set_var("SKYFEED_CONFIG", "/nonexistent/skyfeed.toml");
    let err = SkyfeedConfig::load().unwrap_err();
    assert!(err.to_string().contains("failed to read config file"));

    clear_env();
}
