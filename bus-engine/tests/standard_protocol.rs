//! End-to-end tests driving a real `BusEngine` against the software bus
//! model in `iec-sim`, scripted from the host (C64) side of the wire.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use bus_engine::{BusClient, BusEngine};
use iec_sim::{BusLines, DevicePins, HostDriver, HostPins, SimClock};

#[derive(Default)]
struct Recorder {
    opened: Vec<(u8, u8)>,
    written: Vec<(u8, u8, u8, bool)>,
    unlistened: Vec<u8>,
    resets: u32,
}

impl BusClient for Recorder {
    fn open(&mut self, devnr: u8, channel: u8) {
        self.opened.push((devnr, channel));
    }

    fn write(&mut self, devnr: u8, channel: u8, data: u8, eoi: bool) {
        self.written.push((devnr, channel, data, eoi));
    }

    fn unlisten(&mut self, devnr: u8) {
        self.unlistened.push(devnr);
    }

    fn can_write(&mut self, _devnr: u8, _channel: u8) -> i8 {
        1
    }

    fn reset(&mut self) {
        self.resets += 1;
    }
}

fn pump(engine: &mut BusEngine<DevicePins, SimClock>, client: &mut Recorder, until: Instant) {
    while Instant::now() < until {
        engine.task(client);
    }
}

#[test]
fn listen_open_write_unlisten() {
    let lines = BusLines::new();
    let clock = SimClock::new();

    let host_lines = Arc::clone(&lines);
    let host_clock = clock.clone();
    let host = thread::spawn(move || {
        let pins = HostPins::new(host_lines);
        let driver = HostDriver::new(&pins, &host_clock);
        driver.listen(8);
        driver.open_secondary(2);
        driver.end_atn();
        thread::sleep(Duration::from_micros(300));
        driver.send_byte(b'H', false);
        driver.send_byte(b'I', true);
        driver.begin_atn();
        driver.unlisten();
    });

    let mut scratch = [0u8; 128];
    let pins = DevicePins::new(lines);
    let mut engine = BusEngine::new(pins, clock, &mut scratch);
    engine.claim(8).expect("claim devnr 8");

    let mut client = Recorder::default();
    pump(&mut engine, &mut client, Instant::now() + Duration::from_millis(500));
    host.join().expect("host thread panicked");
    // drain whatever the host's final UNLISTEN left in flight
    pump(&mut engine, &mut client, Instant::now() + Duration::from_millis(50));

    assert_eq!(client.opened, vec![(8, 2)]);
    assert_eq!(
        client.written,
        vec![(8, 2, b'H', false), (8, 2, b'I', true)]
    );
    assert_eq!(client.unlistened, vec![8]);
}

#[test]
fn reset_line_triggers_client_reset() {
    let lines = BusLines::new();
    let clock = SimClock::new();

    let host_lines = Arc::clone(&lines);
    let host = thread::spawn(move || {
        let pins = HostPins::new(host_lines);
        thread::sleep(Duration::from_micros(200));
        pins.set_reset(false);
        thread::sleep(Duration::from_micros(600));
        pins.set_reset(true);
    });

    let mut scratch = [0u8; 128];
    let pins = DevicePins::new(lines);
    let mut engine = BusEngine::new(pins, clock, &mut scratch);
    engine.claim(8).expect("claim devnr 8");

    let mut client = Recorder::default();
    pump(&mut engine, &mut client, Instant::now() + Duration::from_millis(50));
    host.join().expect("host thread panicked");

    assert_eq!(client.resets, 1);
}
