//! DolphinDOS parallel-cable burst mode.
//!
//! Detection rides on the secondary byte reception under ATN: a short pulse
//! on the inbound handshake line means the host is offering Dolphin, and we
//! answer with a pulse of our own on the outbound line. Once armed, whole
//! bytes move over the 8-bit parallel cable with a two-wire handshake
//! instead of bit-banging CLK/DATA.

use crate::config;
use crate::flags::FastFlags;
use crate::gpio::{elapsed_since, BusPins, Clock};

/// Called once per secondary byte received under ATN while Dolphin is
/// enabled but not yet detected this session.
pub(crate) fn maybe_detect<P: BusPins, C: Clock>(
    pins: &mut P,
    clock: &C,
    sflags: &mut FastFlags,
) {
    let start = clock.micros();
    while elapsed_since(start, clock.micros()) < config::ATN_SETTLE_US as i32 {
        if pins.read_handshake_rx() {
            pins.drive_handshake_tx(true);
            let pulse_start = clock.micros();
            clock.busy_wait_until(pulse_start.wrapping_add(config::JIFFY_DETECT_ACK_US));
            pins.drive_handshake_tx(false);
            sflags.insert(FastFlags::DOLPHIN_DETECTED);
            return;
        }
    }
}

/// Receive one burst byte over the parallel cable: wait for the host's
/// handshake pulse, latch the byte, acknowledge.
pub(crate) fn recv_byte<P: BusPins, C: Clock>(pins: &mut P, clock: &C) -> Option<u8> {
    let start = clock.micros();
    while !pins.read_handshake_rx() {
        if elapsed_since(start, clock.micros()) >= config::TRANSMIT_ACK_TIMEOUT_US as i32 {
            return None;
        }
    }
    let byte = pins.read_parallel();
    pins.drive_handshake_tx(true);
    let ack_start = clock.micros();
    clock.busy_wait_until(ack_start.wrapping_add(config::JIFFY_DETECT_ACK_US));
    pins.drive_handshake_tx(false);
    Some(byte)
}

/// Transmit one burst byte over the parallel cable, the mirror of
/// [`recv_byte`].
pub(crate) fn send_byte<P: BusPins, C: Clock>(pins: &mut P, clock: &C, byte: u8) -> bool {
    pins.drive_parallel(byte);
    pins.drive_handshake_tx(true);
    let start = clock.micros();
    while !pins.read_handshake_rx() {
        if elapsed_since(start, clock.micros()) >= config::TRANSMIT_ACK_TIMEOUT_US as i32 {
            pins.drive_handshake_tx(false);
            return false;
        }
    }
    pins.drive_handshake_tx(false);
    true
}
