//! Displacement sensor read path.

use std::sync::Arc;

use log::debug;
use rand_distr::{Distribution, Normal};

use crate::config::ConfigStore;

// Bench stand-in until the real sensor head is integrated: live reads
// sample around a plausible resting value.
const STANDIN_MEAN: f64 = 10.0;
const STANDIN_SIGMA: f64 = 0.5;

/// Supplies the control loop's process value. Which variant answers is
/// decided per read from the profile configuration, not at startup.
pub struct Profilometer {
    store: Arc<ConfigStore>,
    last_value: f64,
}

impl Profilometer {
    pub fn new(store: Arc<ConfigStore>) -> Self {
        Profilometer {
            store,
            last_value: 0.0,
        }
    }

    /// Current process value. Simulated profiles return the operator-set
    /// value verbatim; live profiles read the sensor; a missing profile
    /// falls back to the last value seen instead of failing the cycle.
    pub fn read_value(&mut self) -> f64 {
        let value = match self.store.profile() {
            Some(profile) if profile.is_simulated => profile.simulated_value,
            Some(_) => self.read_live(),
            None => self.last_value,
        };
        self.last_value = value;
        value
    }

    fn read_live(&mut self) -> f64 {
        let value = match Normal::new(STANDIN_MEAN, STANDIN_SIGMA) {
            Ok(dist) => dist.sample(&mut rand::thread_rng()),
            Err(_) => self.last_value,
        };
        debug!("profilometer read: {:.2}", value);
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProfileConfig;

    fn simulated_profile(value: f64) -> ProfileConfig {
        ProfileConfig {
            name: "bench".to_string(),
            target_value: 12.0,
            tolerance: 0.5,
            is_simulated: true,
            simulated_value: value,
        }
    }

    #[test]
    fn test_simulated_value_verbatim() {
        let store = Arc::new(ConfigStore::new());
        store.set_profile(simulated_profile(15.5));

        let mut sensor = Profilometer::new(Arc::clone(&store));
        for _ in 0..10 {
            assert_eq!(sensor.read_value(), 15.5);
        }
    }

    #[test]
    fn test_missing_profile_falls_back_to_last_value() {
        let store = Arc::new(ConfigStore::new());
        let mut sensor = Profilometer::new(Arc::clone(&store));

        // Nothing configured yet: default fallback.
        assert_eq!(sensor.read_value(), 0.0);

        store.set_profile(simulated_profile(15.5));
        assert_eq!(sensor.read_value(), 15.5);

        // Config pulled out from under the sensor mid-run.
        store.clear_profile();
        assert_eq!(sensor.read_value(), 15.5);
    }

    #[test]
    fn test_live_read_is_finite() {
        let store = Arc::new(ConfigStore::new());
        let mut profile = simulated_profile(0.0);
        profile.is_simulated = false;
        store.set_profile(profile);

        let mut sensor = Profilometer::new(store);
        for _ in 0..10 {
            assert!(sensor.read_value().is_finite());
        }
    }
}
