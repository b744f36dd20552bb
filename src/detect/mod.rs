mod backend;
pub mod backends;
mod registry;
mod result;

use anyhow::{anyhow, Result};

use crate::config::DetectorSettings;

pub use backend::DetectorBackend;
pub use backends::{CpuBackend, FixedBackend};
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use registry::{BackendRegistry, SharedBackend};
pub use result::{class_label, BoundingBox, Detection, COCO_CLASSES, PERSON_CLASS_ID};

/// Build the registry of compiled-in backends and select the configured one.
pub fn build_registry(settings: &DetectorSettings) -> Result<BackendRegistry> {
    let mut registry = BackendRegistry::new();
    registry.register(CpuBackend::new());

    #[cfg(feature = "backend-tract")]
    {
        if settings.backend == "tract" {
            let backend = TractBackend::new(&settings.model_path)?
                .with_thresholds(settings.confidence, settings.iou);
            register_warmed(&mut registry, backend)?;
        }
    }

    if settings.backend == "tract" && registry.get("tract").is_none() {
        return Err(anyhow!(
            "detector backend 'tract' requires the backend-tract feature (or set detector.backend = \"cpu\")"
        ));
    }
    registry.set_default(&settings.backend)?;
    Ok(registry)
}

#[cfg(feature = "backend-tract")]
fn register_warmed(registry: &mut BackendRegistry, mut backend: TractBackend) -> Result<()> {
    backend.warm_up()?;
    registry.register(backend);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_backend_selected_from_settings() -> Result<()> {
        let settings = DetectorSettings {
            backend: "cpu".to_string(),
            ..DetectorSettings::default()
        };
        let registry = build_registry(&settings)?;
        assert_eq!(registry.default_name(), Some("cpu"));
        Ok(())
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let settings = DetectorSettings {
            backend: "hailo".to_string(),
            ..DetectorSettings::default()
        };
        assert!(build_registry(&settings).is_err());
    }

    #[cfg(not(feature = "backend-tract"))]
    #[test]
    fn tract_without_feature_explains_itself() {
        let err = match build_registry(&DetectorSettings::default()) {
            Err(err) => err,
            Ok(registry) => panic!("tract registered without the feature: {:?}", registry.list()),
        };
        assert!(err.to_string().contains("backend-tract"));
    }
}
