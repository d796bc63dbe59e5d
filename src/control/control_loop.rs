//! Periodic position correction loop.
//!
//! Two steady states: idle (inactive or unconfigured, re-checked every
//! second, no bus traffic) and running (read sensor, correct every
//! actuator, sleep the configured interval). Failures never outlive the
//! cycle they happened in.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{error, info, warn};

use crate::config::{ActuatorConfig, ConfigStore, ControlSettings};
use crate::hardware::{ActuatorDriver, DriverError, Profilometer};

/// Converts sensor-unit error into raw position counts.
///
/// Commissioning guess: assumes error and commanded position correlate
/// directly, which may turn out inverse on the real mechanics. Flip here
/// once validated on hardware.
pub const CORRECTION_SCALE: f64 = 10.0;

/// Re-check interval while inactive or unconfigured.
const IDLE_WAIT: Duration = Duration::from_secs(1);
/// Pause after a failed cycle before trying again.
const RETRY_BACKOFF: Duration = Duration::from_secs(1);

enum CycleOutcome {
    Idle,
    Ran(Duration),
}

/// Stop signal for a running loop. Honored at cycle boundaries only, so an
/// in-flight bus exchange always completes before the loop winds down.
#[derive(Clone)]
pub struct LoopHandle {
    running: Arc<AtomicBool>,
}

impl LoopHandle {
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

pub struct ControlLoop {
    store: Arc<ConfigStore>,
    driver: Box<dyn ActuatorDriver>,
    profilometer: Profilometer,
    running: Arc<AtomicBool>,
}

impl ControlLoop {
    pub fn new(store: Arc<ConfigStore>, driver: Box<dyn ActuatorDriver>) -> Self {
        let profilometer = Profilometer::new(Arc::clone(&store));
        ControlLoop {
            store,
            driver,
            profilometer,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn handle(&self) -> LoopHandle {
        LoopHandle {
            running: Arc::clone(&self.running),
        }
    }

    /// Runs until the handle stops it. Every per-cycle failure is contained
    /// here: logged, backed off, retried on the next cycle.
    pub fn run(mut self) {
        info!("starting control loop");

        if let Err(e) = self.driver.connect() {
            // Exchanges degrade to no-response until the port comes back.
            error!("driver connect failed: {}", e);
        }

        while self.running.load(Ordering::SeqCst) {
            match self.cycle() {
                Ok(CycleOutcome::Idle) => thread::sleep(IDLE_WAIT),
                Ok(CycleOutcome::Ran(interval)) => thread::sleep(interval),
                Err(e) => {
                    error!("control cycle failed: {}", e);
                    thread::sleep(RETRY_BACKOFF);
                }
            }
        }

        self.driver.disconnect();
        info!("control loop stopped");
    }

    /// Runs the loop on its own thread.
    pub fn spawn(self) -> (JoinHandle<()>, LoopHandle) {
        let handle = self.handle();
        let join = thread::spawn(move || self.run());
        (join, handle)
    }

    fn cycle(&mut self) -> Result<CycleOutcome, DriverError> {
        // Fresh snapshots every cycle; the administrative side may have
        // changed any of this since the last one.
        let Some(settings) = self.store.control_settings() else {
            info!("no control settings; waiting");
            return Ok(CycleOutcome::Idle);
        };
        if !settings.is_active {
            info!("control inactive; waiting");
            return Ok(CycleOutcome::Idle);
        }
        let Some(profile) = self.store.profile() else {
            warn!("no profile configuration; waiting");
            return Ok(CycleOutcome::Idle);
        };

        let current = self.profilometer.read_value();
        let error = profile.target_value - current;
        info!(
            "target {:.2}, current {:.2}, error {:.2}",
            profile.target_value, current, error
        );

        for actuator in self.store.actuators() {
            self.correct_actuator(&actuator, &settings, error)?;
        }

        Ok(CycleOutcome::Ran(Duration::from_millis(
            settings.loop_interval_ms,
        )))
    }

    fn correct_actuator(
        &mut self,
        actuator: &ActuatorConfig,
        settings: &ControlSettings,
        error: f64,
    ) -> Result<(), DriverError> {
        let current_pos = match self.driver.get_position(actuator.modbus_id) {
            Ok(position) => position,
            Err(DriverError::NoResponse(_)) => {
                // Unknown position; correcting from a guess would be worse
                // than sitting this cycle out.
                warn!("skipping {}: position unknown", actuator.name);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let goal = next_position(current_pos, correction_for(error, settings.kp), actuator);
        self.driver.set_position(actuator.modbus_id, i32::from(goal))
    }
}

/// Proportional correction in raw position counts.
pub fn correction_for(error: f64, kp: f64) -> i32 {
    (error * kp * CORRECTION_SCALE).round() as i32
}

/// Next commanded position for one actuator, held inside its calibrated
/// range.
pub fn next_position(current: u16, correction: i32, actuator: &ActuatorConfig) -> u16 {
    let raw = i32::from(current) + correction + actuator.offset;
    raw.clamp(
        i32::from(actuator.min_position),
        i32::from(actuator.max_position),
    ) as u16
}
