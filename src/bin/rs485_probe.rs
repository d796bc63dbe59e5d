/**
 * RS-485 bus diagnostic console.
 *
 * Thin commissioning tool over the core library: read and write actuator
 * positions, read current draw, scan the bus for responding ids.
 *
 * Usage: rs485_probe [port] [baud]
 * Default: /dev/serial0, 57600
 */

use std::io::{self, Write};
use std::thread;
use std::time::Duration;

use profile_control::{ActuatorDriver, BusConfig, MightyZap, RtuBus, DEFAULT_BAUD};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let port = args.get(1).map(|s| s.as_str()).unwrap_or("/dev/serial0");
    let baud: u32 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(DEFAULT_BAUD);

    println!("==============================================");
    println!("  RS-485 Actuator Probe");
    println!("==============================================");
    println!("  Port: {}", port);
    println!("  Baud: {}", baud);
    println!("==============================================\n");

    let bus = RtuBus::new(BusConfig::new(port).with_baud(baud));
    let mut driver = MightyZap::new(Box::new(bus));

    if let Err(e) = driver.connect() {
        eprintln!("Failed to open {}: {}", port, e);
        std::process::exit(1);
    }

    println!("[Commands]");
    println!("  r <id>        - read actuator position");
    println!("  w <id> <pos>  - write goal position (0-4095)");
    println!("  c <id>        - read present current");
    println!("  scan          - probe ids 1-10");
    println!("  q             - quit\n");

    loop {
        print!("> ");
        io::stdout().flush().unwrap();

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() {
            break;
        }

        let parts: Vec<&str> = input.trim().split_whitespace().collect();

        match parts.as_slice() {
            ["q"] | ["quit"] | ["exit"] => break,
            ["r", id] => {
                let Some(id) = parse_id(id) else { continue };
                match driver.get_position(id) {
                    Ok(position) => println!("Actuator {}: position = {}", id, position),
                    Err(_) => println!("Actuator {} did not respond", id),
                }
            }
            ["w", id, pos] => {
                let Some(id) = parse_id(id) else { continue };
                let Ok(position) = pos.parse::<i32>() else {
                    println!("Invalid position: {}", pos);
                    continue;
                };
                match driver.set_position(id, position) {
                    Ok(()) => println!("Sent: actuator {} -> {}", id, position),
                    Err(e) => println!("Write failed: {}", e),
                }
            }
            ["c", id] => {
                let Some(id) = parse_id(id) else { continue };
                match driver.get_current(id) {
                    Ok(current) => println!("Actuator {}: current = {}", id, current),
                    Err(_) => println!("Actuator {} did not respond", id),
                }
            }
            ["scan"] => {
                println!("Scanning ids 1-10...");
                for id in 1..=10u8 {
                    if let Ok(position) = driver.get_position(id) {
                        println!("  id {}: FOUND (position = {})", id, position);
                    }
                    thread::sleep(Duration::from_millis(100));
                }
            }
            [] => {}
            _ => println!("Unknown command: {}", input.trim()),
        }
    }

    driver.disconnect();
    println!("Goodbye!");
}

fn parse_id(raw: &str) -> Option<u8> {
    match raw.parse::<u8>() {
        Ok(id) => Some(id),
        Err(_) => {
            println!("Invalid actuator id: {}", raw);
            None
        }
    }
}
