//! Position fixes attached to every broadcast.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::GpsSettings;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GpsFix {
    pub latitude: f64,
    pub longitude: f64,
}

/// Anything that can report where the camera currently is.
pub trait PositionSource: Send {
    fn current_fix(&mut self) -> GpsFix;
}

/// Simulated receiver: a fixed base coordinate plus independent uniform
/// jitter on each axis.
pub struct MockGps {
    base_latitude: f64,
    base_longitude: f64,
    jitter_deg: f64,
    rng: StdRng,
}

impl MockGps {
    pub fn new(settings: &GpsSettings) -> Self {
        Self::with_rng(settings, StdRng::from_entropy())
    }

    /// Deterministic sequence of fixes for tests.
    pub fn with_seed(settings: &GpsSettings, seed: u64) -> Self {
        Self::with_rng(settings, StdRng::seed_from_u64(seed))
    }

    fn with_rng(settings: &GpsSettings, rng: StdRng) -> Self {
        Self {
            base_latitude: settings.base_latitude,
            base_longitude: settings.base_longitude,
            jitter_deg: settings.jitter_deg.max(0.0),
            rng,
        }
    }

    fn jitter(&mut self) -> f64 {
        if self.jitter_deg == 0.0 {
            return 0.0;
        }
        self.rng.gen_range(-self.jitter_deg..=self.jitter_deg)
    }
}

impl PositionSource for MockGps {
    fn current_fix(&mut self) -> GpsFix {
        let latitude = self.base_latitude + self.jitter();
        let longitude = self.base_longitude + self.jitter();
        GpsFix {
            latitude,
            longitude,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixes_stay_within_jitter_bounds() {
        let mut gps = MockGps::new(&GpsSettings::default());
        for _ in 0..1000 {
            let fix = gps.current_fix();
            assert!((24.7126..=24.7146).contains(&fix.latitude), "{:?}", fix);
            assert!((46.6743..=46.6763).contains(&fix.longitude), "{:?}", fix);
        }
    }

    #[test]
    fn consecutive_fixes_differ() {
        let mut gps = MockGps::with_seed(&GpsSettings::default(), 7);
        let a = gps.current_fix();
        let b = gps.current_fix();
        assert_ne!(a, b);
    }

    #[test]
    fn seeded_sources_repeat() {
        let mut a = MockGps::with_seed(&GpsSettings::default(), 42);
        let mut b = MockGps::with_seed(&GpsSettings::default(), 42);
        assert_eq!(a.current_fix(), b.current_fix());
    }

    #[test]
    fn zero_jitter_reports_base() {
        let settings = GpsSettings {
            jitter_deg: 0.0,
            ..GpsSettings::default()
        };
        let fix = MockGps::new(&settings).current_fix();
        assert_eq!(fix.latitude, 24.7136);
        assert_eq!(fix.longitude, 46.6753);
    }
}
