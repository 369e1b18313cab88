//! A scripted host (C64/floppy-drive) driver: bit-bangs the same protocol
//! `bus-engine` implements, but from the opposite end of the wire, so tests
//! can script the exact byte sequences from real LISTEN/TALK/OPEN/SAVE/LOAD
//! transactions and assert on what the device under test does in response.
//!
//! Timing is paced against the real constants in `bus_engine::config` (via
//! [`SimClock`]) rather than hand-picked numbers, so a test that passes here
//! reflects real bus timing, not a relaxed imitation of it.

use bus_engine::config;
use bus_engine::gpio::elapsed_since;

use crate::bus::HostPins;
use crate::clock::SimClock;

pub struct HostDriver<'a> {
    pins: &'a HostPins,
    clock: &'a SimClock,
}

impl<'a> HostDriver<'a> {
    pub fn new(pins: &'a HostPins, clock: &'a SimClock) -> Self {
        Self { pins, clock }
    }

    fn sleep_us(&self, us: u32) {
        let deadline = self.clock.micros().wrapping_add(us);
        while elapsed_since(deadline, self.clock.micros()) < 0 {
            std::thread::yield_now();
        }
    }

    fn wait_until<F: Fn() -> bool>(&self, timeout_us: u32, cond: F) -> bool {
        let deadline = self.clock.micros().wrapping_add(timeout_us);
        while !cond() {
            if elapsed_since(deadline, self.clock.micros()) >= 0 {
                return false;
            }
            std::thread::yield_now();
        }
        true
    }

    // ---- ATN framing ----------------------------------------------------

    /// Assert ATN and hold it for the engine's settle window.
    pub fn begin_atn(&self) {
        self.pins.set_atn(false);
        self.sleep_us(config::ATN_SETTLE_US * 2);
    }

    pub fn end_atn(&self) {
        self.pins.set_atn(true);
    }

    /// Send one byte of ATN framing (a primary or secondary address byte),
    /// mirroring `BusEngine::recv_bits_under_atn`'s bit timing.
    pub fn send_atn_byte(&self, byte: u8) {
        self.pins.drive_clk(false);
        self.sleep_us(60);
        for bit in 0..8 {
            self.pins.drive_data((byte >> bit) & 1 != 0);
            self.sleep_us(20);
            self.pins.drive_clk(true);
            self.sleep_us(60);
            self.pins.drive_clk(false);
            self.sleep_us(60);
        }
        self.pins.drive_data(true);
        self.sleep_us(40);
    }

    pub fn listen(&self, devnr: u8) {
        self.begin_atn();
        self.send_atn_byte(0x20 | devnr);
    }

    pub fn talk(&self, devnr: u8) {
        self.begin_atn();
        self.send_atn_byte(0x40 | devnr);
    }

    pub fn open_secondary(&self, channel: u8) {
        self.send_atn_byte(0xF0 | channel);
    }

    pub fn close_secondary(&self, channel: u8) {
        self.send_atn_byte(0xE0 | channel);
    }

    pub fn select_secondary(&self, channel: u8) {
        self.send_atn_byte(0x60 | channel);
    }

    pub fn unlisten(&self) {
        self.send_atn_byte(0x3F);
        self.end_atn();
    }

    pub fn untalk(&self) {
        self.send_atn_byte(0x5F);
        self.end_atn();
    }

    pub fn pulse_reset(&self) {
        self.pins.set_reset(false);
        self.sleep_us(500);
        self.pins.set_reset(true);
    }

    // ---- data phase -------------------------------------------------------

    /// Send one data byte to a listening device, mirroring
    /// `BusEngine::send_bits_standard` from the opposite role.
    pub fn send_byte(&self, byte: u8, eoi: bool) -> bool {
        self.pins.drive_clk(true);
        if !self.wait_until(config::TRANSMIT_ACK_TIMEOUT_US, || self.pins.read_data()) {
            return false;
        }
        if eoi {
            if !self.wait_until(config::RECEIVE_CLK_WAIT_US * 4, || !self.pins.read_data()) {
                return false;
            }
            if !self.wait_until(config::RECEIVE_CLK_WAIT_US * 4, || self.pins.read_data()) {
                return false;
            }
        }
        self.pins.drive_clk(false);
        for bit in 0..8 {
            self.pins.drive_clk(false);
            self.pins.drive_data((byte >> bit) & 1 != 0);
            self.sleep_us(config::TRANSMIT_BIT_SETUP_US);
            self.pins.drive_clk(true);
            self.sleep_us(config::TRANSMIT_BIT_HOLD_US);
        }
        self.pins.drive_data(true);
        self.pins.drive_clk(false);
        self.wait_until(config::TRANSMIT_ACK_TIMEOUT_US, || !self.pins.read_data())
    }

    /// Receive one data byte from a talking device, mirroring
    /// `BusEngine::recv_bits_standard` from the opposite role.
    pub fn receive_byte(&self) -> Option<(u8, bool)> {
        self.pins.drive_data(true);
        let mut eoi = false;
        if !self.wait_until(config::RECEIVE_CLK_WAIT_US, || !self.pins.read_clk()) {
            eoi = true;
            self.pins.drive_data(false);
            self.sleep_us(config::EOI_ACK_PULSE_US);
            self.pins.drive_data(true);
            if !self.wait_until(config::RECEIVE_CLK_WAIT_US * 4, || !self.pins.read_clk()) {
                return None;
            }
        }
        let mut value: u8 = 0;
        for bit in 0..8 {
            if !self.wait_until(config::RECEIVE_CLK_WAIT_US, || self.pins.read_clk()) {
                return None;
            }
            if self.pins.read_data() {
                value |= 1 << bit;
            }
            if !self.wait_until(config::RECEIVE_CLK_WAIT_US, || !self.pins.read_clk()) {
                return None;
            }
        }
        Some((value, eoi))
    }

    /// Receive one JiffyDOS block from a talking device, mirroring
    /// `bus_engine::jiffy::send_block` from the opposite role. Returns
    /// `None` for the zero-length end-of-file block.
    pub fn receive_block(&self) -> Option<Vec<u8>> {
        self.pins.drive_data(true);
        if !self.wait_until(config::TRANSMIT_ACK_TIMEOUT_US, || self.pins.read_clk()) {
            return None;
        }
        let len = self.receive_block_byte();
        if len == 0 {
            return None;
        }
        let mut bytes = Vec::with_capacity(len as usize);
        for _ in 0..len {
            bytes.push(self.receive_block_byte());
        }
        Some(bytes)
    }

    fn receive_block_byte(&self) -> u8 {
        let mut value = 0u8;
        for bit in 0..8 {
            self.wait_until(config::JIFFY_BLOCK_BIT_US * 4, || self.pins.read_clk());
            if self.pins.read_data() {
                value |= 1 << bit;
            }
            self.wait_until(config::JIFFY_BLOCK_BIT_US * 4, || !self.pins.read_clk());
        }
        value
    }
}
