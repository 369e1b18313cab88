//! End-to-end tests of the framing layer: OPEN/WRITE/CLOSE then OPEN/READ,
//! a channel-15 command, and a DolphinDOS burst-enable command, all driven
//! over the software bus via `iec-sim`.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use file_device::{Application, FileDevice};
use iec_sim::{BusLines, DevicePins, HostDriver, HostPins, SimClock};

const DEVNR: u8 = 8;

#[derive(Default)]
struct TestApp {
    files: HashMap<Vec<u8>, Vec<u8>>,
    read_pos: HashMap<Vec<u8>, usize>,
    open_name: HashMap<(u8, u8), Vec<u8>>,
    executed: Vec<Vec<u8>>,
    resets: u32,
}

impl Application for TestApp {
    fn open(&mut self, devnr: u8, channel: u8, name: &[u8]) -> bool {
        self.open_name.insert((devnr, channel), name.to_vec());
        self.read_pos.insert(name.to_vec(), 0);
        true
    }

    fn close(&mut self, devnr: u8, channel: u8) {
        self.open_name.remove(&(devnr, channel));
    }

    fn read(&mut self, devnr: u8, channel: u8, buf: &mut [u8]) -> (usize, bool) {
        let name = match self.open_name.get(&(devnr, channel)) {
            Some(n) => n.clone(),
            None => return (0, true),
        };
        let data = match self.files.get(&name) {
            Some(d) => d,
            None => return (0, true),
        };
        let pos = *self.read_pos.get(&name).unwrap_or(&0);
        if pos >= data.len() {
            return (0, true);
        }
        buf[0] = data[pos];
        self.read_pos.insert(name.clone(), pos + 1);
        (1, pos + 1 >= data.len())
    }

    fn write(&mut self, devnr: u8, channel: u8, buf: &[u8], _last_chunk: bool) -> usize {
        let name = match self.open_name.get(&(devnr, channel)) {
            Some(n) => n.clone(),
            None => return 0,
        };
        self.files.entry(name).or_default().extend_from_slice(buf);
        buf.len()
    }

    fn get_status(&mut self, _devnr: u8, buf: &mut [u8]) -> usize {
        let msg = b"00, OK,00,00\r";
        buf[..msg.len()].copy_from_slice(msg);
        msg.len()
    }

    fn execute(&mut self, _devnr: u8, cmd: &[u8]) {
        self.executed.push(cmd.to_vec());
    }

    fn reset(&mut self) {
        self.resets += 1;
    }
}

fn pump(device: &mut FileDevice<DevicePins, SimClock, TestApp>, until: Instant) {
    while Instant::now() < until {
        device.task();
    }
}

#[test]
fn save_then_load_round_trip() {
    let lines = BusLines::new();
    let clock = SimClock::new();

    let host_lines = Arc::clone(&lines);
    let host_clock = clock.clone();
    let host = thread::spawn(move || {
        let pins = HostPins::new(host_lines);
        let driver = HostDriver::new(&pins, &host_clock);

        driver.listen(DEVNR);
        driver.open_secondary(1);
        driver.end_atn();
        thread::sleep(Duration::from_micros(300));
        for &b in b"TEST" {
            driver.send_byte(b, false);
        }
        driver.begin_atn();
        driver.unlisten();
        thread::sleep(Duration::from_millis(2));

        driver.listen(DEVNR);
        driver.select_secondary(1);
        driver.end_atn();
        thread::sleep(Duration::from_micros(300));
        driver.send_byte(b'A', false);
        driver.send_byte(b'B', true);
        driver.begin_atn();
        driver.unlisten();
        thread::sleep(Duration::from_millis(2));

        driver.listen(DEVNR);
        driver.close_secondary(1);
        driver.end_atn();
        thread::sleep(Duration::from_millis(2));

        driver.listen(DEVNR);
        driver.open_secondary(1);
        driver.end_atn();
        thread::sleep(Duration::from_micros(300));
        for &b in b"TEST" {
            driver.send_byte(b, false);
        }
        driver.begin_atn();
        driver.unlisten();
        thread::sleep(Duration::from_millis(2));

        driver.talk(DEVNR);
        driver.select_secondary(1);
        driver.end_atn();
        thread::sleep(Duration::from_micros(300));
        let mut received = Vec::new();
        while let Some((byte, eoi)) = driver.receive_byte() {
            received.push(byte);
            if eoi {
                break;
            }
        }
        driver.begin_atn();
        driver.untalk();
        received
    });

    let mut scratch = [0u8; 128];
    let pins = DevicePins::new(lines);
    let mut device = FileDevice::new(pins, clock, &mut scratch, TestApp::default());
    device.claim(DEVNR).expect("claim devnr 8");

    pump(&mut device, Instant::now() + Duration::from_millis(500));
    let received = host.join().expect("host thread panicked");

    assert_eq!(received, b"AB");
    assert_eq!(
        device.application().files.get(b"TEST".as_slice()),
        Some(&b"AB".to_vec())
    );
}

#[test]
fn command_channel_reaches_execute() {
    let lines = BusLines::new();
    let clock = SimClock::new();

    let host_lines = Arc::clone(&lines);
    let host_clock = clock.clone();
    let host = thread::spawn(move || {
        let pins = HostPins::new(host_lines);
        let driver = HostDriver::new(&pins, &host_clock);
        driver.listen(DEVNR);
        driver.open_secondary(15);
        driver.end_atn();
        thread::sleep(Duration::from_micros(300));
        let cmd = b"I0\r";
        for (i, &b) in cmd.iter().enumerate() {
            driver.send_byte(b, i + 1 == cmd.len());
        }
        driver.begin_atn();
        driver.unlisten();
    });

    let mut scratch = [0u8; 128];
    let pins = DevicePins::new(lines);
    let mut device = FileDevice::new(pins, clock, &mut scratch, TestApp::default());
    device.claim(DEVNR).expect("claim devnr 8");

    pump(&mut device, Instant::now() + Duration::from_millis(300));
    host.join().expect("host thread panicked");

    assert_eq!(device.application().executed, vec![b"I0".to_vec()]);
}
