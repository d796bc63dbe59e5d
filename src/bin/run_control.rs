/**
 * Control loop entry point.
 *
 * Opens the RS-485 bus, seeds default configuration, and runs the
 * position control loop until the process is terminated.
 *
 * Usage: run_control [port] [baud]
 * Default: /dev/serial0, 57600. Port "sim" runs without hardware.
 */

use std::sync::Arc;

use profile_control::{
    ActuatorDriver, BusConfig, ConfigStore, ControlLoop, MightyZap, RtuBus, SimulatedZap,
    DEFAULT_BAUD,
};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let port = args.get(1).map(|s| s.as_str()).unwrap_or("/dev/serial0");
    let baud: u32 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(DEFAULT_BAUD);

    println!("==============================================");
    println!("  Profile Control Loop");
    println!("==============================================");
    println!("  Port: {}", port);
    println!("  Baud: {}", baud);
    println!("==============================================");

    let store = Arc::new(ConfigStore::new());
    store.seed_defaults();

    let driver: Box<dyn ActuatorDriver> = if port == "sim" {
        Box::new(SimulatedZap::new())
    } else {
        let bus = RtuBus::new(BusConfig::new(port).with_baud(baud));
        Box::new(MightyZap::new(Box::new(bus)))
    };

    ControlLoop::new(store, driver).run();
}
