//! Configuration shared with the administrative side.
//!
//! The core never persists any of this. An external UI mutates the store at
//! any time and the control loop re-reads fresh snapshots every cycle, so a
//! toggle takes effect within one cycle.

use std::sync::RwLock;

use thiserror::Error;

use crate::hardware::POSITION_MAX;
use crate::modbus::frame::{SLAVE_ID_MAX, SLAVE_ID_MIN};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("modbus id {0} outside 1..=247")]
    SlaveIdOutOfRange(u8),
    #[error("duplicate modbus id {0}")]
    DuplicateId(u8),
    #[error("min position {min} above max position {max}")]
    InvalidRange { min: u16, max: u16 },
}

/// Global control loop settings. One instance per system.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlSettings {
    pub is_active: bool,
    pub loop_interval_ms: u64,
    /// Proportional gain.
    pub kp: f64,
    /// Integral gain; carried in configuration, unused by the reference law.
    pub ki: f64,
    /// Derivative gain; carried in configuration, unused by the reference law.
    pub kd: f64,
}

impl Default for ControlSettings {
    fn default() -> Self {
        ControlSettings {
            is_active: false,
            loop_interval_ms: 100,
            kp: 1.0,
            ki: 0.0,
            kd: 0.0,
        }
    }
}

/// Profilometer setpoint, plus the deterministic substitute used on benches
/// without the sensor attached.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileConfig {
    pub name: String,
    pub target_value: f64,
    /// Acceptable deviation (+/-).
    pub tolerance: f64,
    pub is_simulated: bool,
    pub simulated_value: f64,
}

/// Calibration and range limits for one actuator on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActuatorConfig {
    pub name: String,
    pub modbus_id: u8,
    pub min_position: u16,
    pub max_position: u16,
    /// Signed trim applied on top of each computed correction.
    pub offset: i32,
}

impl ActuatorConfig {
    pub fn new(name: &str, modbus_id: u8) -> Self {
        ActuatorConfig {
            name: name.to_string(),
            modbus_id,
            min_position: 0,
            max_position: POSITION_MAX,
            offset: 0,
        }
    }
}

/// Thread-safe snapshot store. Readers get owned copies; the writers are
/// the external administrative side (and tests standing in for it).
#[derive(Default)]
pub struct ConfigStore {
    settings: RwLock<Option<ControlSettings>>,
    profile: RwLock<Option<ProfileConfig>>,
    actuators: RwLock<Vec<ActuatorConfig>>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the settings singleton. A second creation attempt is a no-op
    /// that leaves the existing instance untouched and returns false.
    pub fn create_settings(&self, settings: ControlSettings) -> bool {
        let mut slot = self.settings.write().unwrap();
        if slot.is_some() {
            return false;
        }
        *slot = Some(settings);
        true
    }

    /// Mutates the existing singleton in place; no-op when none exists.
    pub fn update_settings(&self, mutate: impl FnOnce(&mut ControlSettings)) {
        if let Some(settings) = self.settings.write().unwrap().as_mut() {
            mutate(settings);
        }
    }

    pub fn control_settings(&self) -> Option<ControlSettings> {
        self.settings.read().unwrap().clone()
    }

    pub fn set_profile(&self, profile: ProfileConfig) {
        *self.profile.write().unwrap() = Some(profile);
    }

    pub fn clear_profile(&self) {
        *self.profile.write().unwrap() = None;
    }

    pub fn profile(&self) -> Option<ProfileConfig> {
        self.profile.read().unwrap().clone()
    }

    pub fn add_actuator(&self, actuator: ActuatorConfig) -> Result<(), ConfigError> {
        if !(SLAVE_ID_MIN..=SLAVE_ID_MAX).contains(&actuator.modbus_id) {
            return Err(ConfigError::SlaveIdOutOfRange(actuator.modbus_id));
        }
        if actuator.min_position > actuator.max_position {
            return Err(ConfigError::InvalidRange {
                min: actuator.min_position,
                max: actuator.max_position,
            });
        }

        let mut list = self.actuators.write().unwrap();
        if list.iter().any(|a| a.modbus_id == actuator.modbus_id) {
            return Err(ConfigError::DuplicateId(actuator.modbus_id));
        }
        list.push(actuator);
        // Bus-id order is the order the loop commands actuators in.
        list.sort_by_key(|a| a.modbus_id);
        Ok(())
    }

    pub fn actuators(&self) -> Vec<ActuatorConfig> {
        self.actuators.read().unwrap().clone()
    }

    /// Seeds the defaults the system ships with; safe to call on a store
    /// that is already populated.
    pub fn seed_defaults(&self) {
        self.create_settings(ControlSettings::default());

        if self.profile().is_none() {
            self.set_profile(ProfileConfig {
                name: "Default Profile".to_string(),
                target_value: 12.0,
                tolerance: 0.5,
                is_simulated: false,
                simulated_value: 0.0,
            });
        }

        for modbus_id in 1..=3 {
            let _ = self.add_actuator(ActuatorConfig::new(&format!("Actuator {}", modbus_id), modbus_id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_singleton() {
        let store = ConfigStore::new();
        assert!(store.create_settings(ControlSettings {
            is_active: true,
            kp: 2.5,
            ..Default::default()
        }));

        // Second creation is a no-op; the first instance stays authoritative.
        assert!(!store.create_settings(ControlSettings::default()));

        let settings = store.control_settings().unwrap();
        assert!(settings.is_active);
        assert_eq!(settings.kp, 2.5);
    }

    #[test]
    fn test_update_settings_in_place() {
        let store = ConfigStore::new();
        store.create_settings(ControlSettings::default());
        store.update_settings(|s| s.is_active = true);
        assert!(store.control_settings().unwrap().is_active);
    }

    #[test]
    fn test_update_without_settings_is_noop() {
        let store = ConfigStore::new();
        store.update_settings(|s| s.is_active = true);
        assert!(store.control_settings().is_none());
    }

    #[test]
    fn test_actuator_validation() {
        let store = ConfigStore::new();
        assert_eq!(
            store.add_actuator(ActuatorConfig::new("bad", 0)),
            Err(ConfigError::SlaveIdOutOfRange(0))
        );
        assert_eq!(
            store.add_actuator(ActuatorConfig::new("bad", 250)),
            Err(ConfigError::SlaveIdOutOfRange(250))
        );

        let inverted = ActuatorConfig {
            min_position: 100,
            max_position: 50,
            ..ActuatorConfig::new("inverted", 1)
        };
        assert_eq!(
            store.add_actuator(inverted),
            Err(ConfigError::InvalidRange { min: 100, max: 50 })
        );

        assert!(store.add_actuator(ActuatorConfig::new("ok", 1)).is_ok());
        assert_eq!(
            store.add_actuator(ActuatorConfig::new("dup", 1)),
            Err(ConfigError::DuplicateId(1))
        );
    }

    #[test]
    fn test_actuators_sorted_by_bus_id() {
        let store = ConfigStore::new();
        store.add_actuator(ActuatorConfig::new("three", 3)).unwrap();
        store.add_actuator(ActuatorConfig::new("one", 1)).unwrap();
        store.add_actuator(ActuatorConfig::new("two", 2)).unwrap();

        let ids: Vec<u8> = store.actuators().iter().map(|a| a.modbus_id).collect();
        assert_eq!(ids, [1, 2, 3]);
    }

    #[test]
    fn test_seed_defaults_idempotent() {
        let store = ConfigStore::new();
        store.seed_defaults();
        store.seed_defaults();

        assert_eq!(store.actuators().len(), 3);
        let profile = store.profile().unwrap();
        assert_eq!(profile.target_value, 12.0);
        assert_eq!(profile.tolerance, 0.5);
        assert!(!store.control_settings().unwrap().is_active);
    }
}
