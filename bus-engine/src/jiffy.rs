//! JiffyDOS fast-loader detection and byte transfer.
//!
//! JiffyDOS trades the one-bit-per-CLK-toggle standard handshake for a
//! fixed-timing window: once both sides agree to use it, a whole byte
//! (plus EOI and the ack) rides on sampling DATA and CLK together at four
//! points after the talker releases CLK. The offsets come from
//! [`config::jiffy_offsets`]; nothing here is self-timed beyond that table.

use crate::config::{self, jiffy_offsets};
use crate::flags::FastFlags;
use crate::gpio::{elapsed_since, BusPins, Clock};

/// Watch for a JiffyDOS detection request following an acked primary
/// address byte: the host holds CLK low past the normal release window to
/// ask, we answer with a DATA pulse.
pub(crate) fn maybe_detect<P: BusPins, C: Clock>(
    pins: &mut P,
    clock: &C,
    sflags: &mut FastFlags,
) {
    let start = clock.micros();
    while !pins.read_clk() {
        if elapsed_since(start, clock.micros()) >= config::JIFFY_DETECT_DELAY_US as i32 {
            pins.drive_data(false);
            let pulse_start = clock.micros();
            clock.busy_wait_until(pulse_start.wrapping_add(config::JIFFY_DETECT_ACK_US));
            pins.drive_data(true);
            sflags.insert(FastFlags::JIFFY_DETECTED);
            return;
        }
    }
}

/// Receive one byte in JiffyDOS timing. Two bits are sampled together from
/// DATA and CLK at each of the four offsets; EOI and our ack pulse follow
/// at their own fixed offsets.
pub(crate) fn recv_byte<P: BusPins, C: Clock>(pins: &mut P, clock: &C) -> Option<(u8, bool)> {
    pins.drive_data(true);
    let wait_start = clock.micros();
    while !pins.read_clk() {
        if elapsed_since(wait_start, clock.micros()) >= (config::RECEIVE_CLK_WAIT_US * 4) as i32 {
            return None;
        }
    }
    let t0 = clock.micros();
    let mut value: u8 = 0;

    clock.busy_wait_until(t0.wrapping_add(jiffy_offsets::BITS_4_5));
    if pins.read_data() {
        value |= 1 << 4;
    }
    if pins.read_clk() {
        value |= 1 << 5;
    }

    clock.busy_wait_until(t0.wrapping_add(jiffy_offsets::BITS_6_7));
    if pins.read_data() {
        value |= 1 << 6;
    }
    if pins.read_clk() {
        value |= 1 << 7;
    }

    clock.busy_wait_until(t0.wrapping_add(jiffy_offsets::BITS_3_1));
    if pins.read_data() {
        value |= 1 << 3;
    }
    if pins.read_clk() {
        value |= 1 << 1;
    }

    clock.busy_wait_until(t0.wrapping_add(jiffy_offsets::BITS_2_0));
    if pins.read_data() {
        value |= 1 << 2;
    }
    if pins.read_clk() {
        value |= 1;
    }

    clock.busy_wait_until(t0.wrapping_add(jiffy_offsets::EOI));
    let eoi = !pins.read_data();

    clock.busy_wait_until(t0.wrapping_add(jiffy_offsets::ACK));
    pins.drive_data(false);
    clock.busy_wait_until(t0.wrapping_add(jiffy_offsets::ACK + config::EOI_ACK_PULSE_US));
    pins.drive_data(true);

    Some((value, eoi))
}

/// Stream one JiffyDOS block: used for a TALK on
/// secondary `0x61` instead of the per-byte transfer. The receiver releases
/// DATA to ask for the next block; a length byte (clocked the same way as
/// every data byte) precedes the block's contents. A zero length is the
/// end-of-file block: since every bit of a zero byte leaves DATA released,
/// this is exactly the "release DATA, pulse CLK" wire shape called for, with
/// no separate encoding needed.
pub(crate) fn send_block<P: BusPins, C: Clock>(pins: &mut P, clock: &C, data: &[u8]) -> bool {
    let wait_start = clock.micros();
    while !pins.read_data() {
        if elapsed_since(wait_start, clock.micros()) >= config::TRANSMIT_ACK_TIMEOUT_US as i32 {
            return false;
        }
    }
    send_block_byte(pins, clock, data.len() as u8);
    for &byte in data {
        send_block_byte(pins, clock, byte);
    }
    pins.drive_data(true);
    pins.drive_clk(false);
    true
}

fn send_block_byte<P: BusPins, C: Clock>(pins: &mut P, clock: &C, byte: u8) {
    for bit in 0..8 {
        pins.drive_clk(false);
        pins.drive_data((byte >> bit) & 1 != 0);
        let t = clock.micros();
        clock.busy_wait_until(t.wrapping_add(config::JIFFY_BLOCK_BIT_US));
        pins.drive_clk(true);
        let t2 = clock.micros();
        clock.busy_wait_until(t2.wrapping_add(config::JIFFY_BLOCK_BIT_US));
    }
}

/// Transmit one byte in JiffyDOS timing, the mirror of [`recv_byte`].
pub(crate) fn send_byte<P: BusPins, C: Clock>(pins: &mut P, clock: &C, byte: u8, eoi: bool) -> bool {
    pins.drive_clk(true);
    pins.drive_data(true);
    let t0 = clock.micros();

    clock.busy_wait_until(t0.wrapping_add(jiffy_offsets::BITS_4_5));
    pins.drive_data((byte >> 4) & 1 != 0);
    pins.drive_clk((byte >> 5) & 1 != 0);

    clock.busy_wait_until(t0.wrapping_add(jiffy_offsets::BITS_6_7));
    pins.drive_data((byte >> 6) & 1 != 0);
    pins.drive_clk((byte >> 7) & 1 != 0);

    clock.busy_wait_until(t0.wrapping_add(jiffy_offsets::BITS_3_1));
    pins.drive_data((byte >> 3) & 1 != 0);
    pins.drive_clk((byte >> 1) & 1 != 0);

    clock.busy_wait_until(t0.wrapping_add(jiffy_offsets::BITS_2_0));
    pins.drive_data((byte >> 2) & 1 != 0);
    pins.drive_clk(byte & 1 != 0);

    clock.busy_wait_until(t0.wrapping_add(jiffy_offsets::EOI));
    pins.drive_data(!eoi);

    clock.busy_wait_until(t0.wrapping_add(jiffy_offsets::ACK));
    pins.drive_data(true);
    pins.drive_clk(true);
    let ack_wait = clock.micros();
    while pins.read_data() {
        if elapsed_since(ack_wait, clock.micros()) >= config::TRANSMIT_ACK_TIMEOUT_US as i32 {
            return false;
        }
    }
    true
}
