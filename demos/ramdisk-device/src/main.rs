//! Saves a file to the ramdisk, then loads it back, entirely over the
//! software bus model — no hardware required. Demonstrates the full stack:
//! `iec-sim`'s scripted host driver plays the C64, `bus-engine` drives the
//! handshake, `file-device` frames it into OPEN/WRITE/READ/CLOSE, and
//! `RamdiskApp` is the storage backing it all.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use file_device::FileDevice;
use iec_sim::{BusLines, DevicePins, HostDriver, HostPins, SimClock};
use ramdisk_device::{logging, RamdiskApp};

const DEVNR: u8 = 8;
const CHANNEL: u8 = 1;

fn main() {
    logging::init();

    let lines = BusLines::new();
    let clock = SimClock::new();

    let host_lines = Arc::clone(&lines);
    let host_clock = clock.clone();
    let host = thread::spawn(move || {
        let pins = HostPins::new(host_lines);
        let driver = HostDriver::new(&pins, &host_clock);

        // SAVE "HELLO"
        driver.listen(DEVNR);
        driver.open_secondary(CHANNEL);
        driver.end_atn();
        thread::sleep(Duration::from_micros(300));
        for &b in b"HELLO" {
            driver.send_byte(b, false);
        }
        driver.begin_atn();
        driver.unlisten();
        thread::sleep(Duration::from_millis(2));

        driver.listen(DEVNR);
        driver.select_secondary(CHANNEL);
        driver.end_atn();
        thread::sleep(Duration::from_micros(300));
        let payload = b"HELLO, RAMDISK!\r";
        for (i, &b) in payload.iter().enumerate() {
            driver.send_byte(b, i + 1 == payload.len());
        }
        driver.begin_atn();
        driver.unlisten();
        thread::sleep(Duration::from_millis(2));

        driver.listen(DEVNR);
        driver.close_secondary(CHANNEL);
        driver.end_atn();
        thread::sleep(Duration::from_millis(2));

        // LOAD "HELLO" back
        driver.listen(DEVNR);
        driver.open_secondary(CHANNEL);
        driver.end_atn();
        thread::sleep(Duration::from_micros(300));
        for &b in b"HELLO" {
            driver.send_byte(b, false);
        }
        driver.begin_atn();
        driver.unlisten();
        thread::sleep(Duration::from_millis(2));

        driver.talk(DEVNR);
        driver.select_secondary(CHANNEL);
        driver.end_atn();
        thread::sleep(Duration::from_micros(300));
        let mut received = Vec::new();
        loop {
            match driver.receive_byte() {
                Some((byte, eoi)) => {
                    received.push(byte);
                    if eoi {
                        break;
                    }
                }
                None => break,
            }
        }
        driver.begin_atn();
        driver.untalk();
        thread::sleep(Duration::from_millis(2));

        driver.listen(DEVNR);
        driver.close_secondary(CHANNEL);
        driver.end_atn();

        println!(
            "host received: {:?}",
            String::from_utf8_lossy(&received)
        );
    });

    let mut scratch = [0u8; 128];
    let pins = DevicePins::new(lines);
    let mut device = FileDevice::new(pins, clock, &mut scratch, RamdiskApp::new());
    device.claim(DEVNR).expect("claim devnr 8");
    device.enable_jiffy();
    device.enable_dolphin();

    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline && !host.is_finished() {
        device.task();
    }
    host.join().expect("host thread panicked");
}
