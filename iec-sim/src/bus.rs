//! Shared open-collector line state plus the two `BusPins` halves (device
//! and host) that read/drive it, all wired through `Arc` + atomics so the
//! device's `task()` loop and a scripted host driver can run on separate
//! threads without a lock in the hot path.
//!
//! Wire-OR is modelled with one atomic per participant per line: a line
//! reads "released" only if every participant that can drive it has
//! released it. With exactly two participants (device, host) that's just
//! "read the other side's atomic" for the lines only one side drives, and a
//! plain store for lines only the host drives (ATN, RESET).

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use bus_engine::gpio::BusPins;

pub struct BusLines {
    atn: AtomicBool,
    reset: AtomicBool,
    clk_device: AtomicBool,
    clk_host: AtomicBool,
    data_device: AtomicBool,
    data_host: AtomicBool,
    ctrl: AtomicBool,
    parallel: AtomicU8,
    handshake_device: AtomicBool,
    handshake_host: AtomicBool,
}

impl BusLines {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            atn: AtomicBool::new(true),
            reset: AtomicBool::new(true),
            clk_device: AtomicBool::new(true),
            clk_host: AtomicBool::new(true),
            data_device: AtomicBool::new(true),
            data_host: AtomicBool::new(true),
            ctrl: AtomicBool::new(false),
            parallel: AtomicU8::new(0),
            handshake_device: AtomicBool::new(false),
            handshake_host: AtomicBool::new(false),
        })
    }
}

/// The `BusPins` half handed to the `BusEngine`/`FileDevice` under test.
pub struct DevicePins {
    lines: Arc<BusLines>,
}

impl DevicePins {
    pub fn new(lines: Arc<BusLines>) -> Self {
        Self { lines }
    }
}

impl BusPins for DevicePins {
    fn read_atn(&self) -> bool {
        self.lines.atn.load(Ordering::Acquire)
    }

    fn read_clk(&self) -> bool {
        self.lines.clk_host.load(Ordering::Acquire)
    }

    fn read_data(&self) -> bool {
        self.lines.data_host.load(Ordering::Acquire)
    }

    fn read_reset(&self) -> bool {
        self.lines.reset.load(Ordering::Acquire)
    }

    fn drive_clk(&mut self, release: bool) {
        self.lines.clk_device.store(release, Ordering::Release);
    }

    fn drive_data(&mut self, release: bool) {
        self.lines.data_device.store(release, Ordering::Release);
    }

    fn drive_ctrl(&mut self, high: bool) {
        self.lines.ctrl.store(high, Ordering::Release);
    }

    fn read_parallel(&self) -> u8 {
        self.lines.parallel.load(Ordering::Acquire)
    }

    fn drive_parallel(&mut self, byte: u8) {
        self.lines.parallel.store(byte, Ordering::Release);
    }

    fn read_handshake_rx(&self) -> bool {
        self.lines.handshake_host.load(Ordering::Acquire)
    }

    fn drive_handshake_tx(&mut self, asserted: bool) {
        self.lines.handshake_device.store(asserted, Ordering::Release);
    }
}

/// The host (C64/drive) side of the same wires, driven by a scripted test
/// rather than by `bus-engine`.
pub struct HostPins {
    lines: Arc<BusLines>,
}

impl HostPins {
    pub fn new(lines: Arc<BusLines>) -> Self {
        Self { lines }
    }

    pub fn set_atn(&self, released: bool) {
        self.lines.atn.store(released, Ordering::Release);
    }

    pub fn set_reset(&self, released: bool) {
        self.lines.reset.store(released, Ordering::Release);
    }

    pub fn drive_clk(&self, release: bool) {
        self.lines.clk_host.store(release, Ordering::Release);
    }

    pub fn drive_data(&self, release: bool) {
        self.lines.data_host.store(release, Ordering::Release);
    }

    pub fn read_clk(&self) -> bool {
        self.lines.clk_device.load(Ordering::Acquire)
    }

    pub fn read_data(&self) -> bool {
        self.lines.data_device.load(Ordering::Acquire)
    }

    pub fn read_ctrl(&self) -> bool {
        self.lines.ctrl.load(Ordering::Acquire)
    }

    pub fn drive_handshake(&self, asserted: bool) {
        self.lines.handshake_host.store(asserted, Ordering::Release);
    }

    pub fn read_handshake(&self) -> bool {
        self.lines.handshake_device.load(Ordering::Acquire)
    }

    pub fn read_parallel(&self) -> u8 {
        self.lines.parallel.load(Ordering::Acquire)
    }

    pub fn drive_parallel(&self, byte: u8) {
        self.lines.parallel.store(byte, Ordering::Release);
    }
}
