//! The GPIO/timer contract the bus engine is generic over.
//!
//! Implement [`BusPins`] and [`Clock`] against real registers on an embedded
//! target, or against a software model on a hosted platform (see the
//! `iec-sim` crate, which implements both for testing). The engine never
//! allocates and never assumes a specific pin layout beyond these traits.

/// The three open-collector lines IEC communication rides on, plus the
/// optional RESET sense line and hardware ATN-assist drive line.
///
/// Reads return the wire-OR of every participant: `true` means *released*
/// (pulled high), `false` means *asserted* (driven low by somebody, possibly
/// us). `drive_*(true)` releases a line; `drive_*(false)` asserts it.
pub trait BusPins {
    /// Read the ATN line. `true` = released (idle), `false` = asserted.
    fn read_atn(&self) -> bool;

    /// Read the CLK line as driven by every *other* participant (never by us
    /// — callers compare this against what we last drove to reason about the
    /// handshake).
    fn read_clk(&self) -> bool;

    /// Read the DATA line, same convention as [`read_clk`](Self::read_clk).
    fn read_data(&self) -> bool;

    /// Read the optional RESET sense line. Boards without a RESET line wire
    /// this to always-released.
    fn read_reset(&self) -> bool {
        true
    }

    /// Drive (or release) CLK. `release = true` lets the pull-up take over.
    fn drive_clk(&mut self, release: bool);

    /// Drive (or release) DATA, same convention as
    /// [`drive_clk`](Self::drive_clk).
    fn drive_data(&mut self, release: bool);

    /// Optional hardware assist: a diode/transistor that mechanically mirrors
    /// ATN-low onto DATA so slow software still meets the ATN deadline.
    /// `high` releases (disables) the assist, for while we are actively
    /// driving DATA ourselves; `low` rearms it. Boards without one leave this
    /// a no-op.
    fn drive_ctrl(&mut self, _high: bool) {}

    /// Read the 8-bit DolphinDOS parallel data cable. Boards without the
    /// cable wired up leave this returning 0; [`crate::FastFlags::DOLPHIN_ENABLED`]
    /// must not be set on such boards.
    fn read_parallel(&self) -> u8 {
        0
    }

    /// Drive the DolphinDOS parallel data cable.
    fn drive_parallel(&mut self, _byte: u8) {}

    /// Read the DolphinDOS inbound handshake line (pulsed by the host).
    fn read_handshake_rx(&self) -> bool {
        false
    }

    /// Pulse the DolphinDOS outbound handshake line.
    fn drive_handshake_tx(&mut self, _asserted: bool) {}
}

/// A monotonic, wraparound-safe microsecond clock.
pub trait Clock {
    /// Current time in microseconds. Implementations may wrap; callers must
    /// compare with wrapping arithmetic (see [`elapsed_since`]).
    fn micros(&self) -> u32;

    /// Busy-wait (bounded, no sleep primitive) until `micros() >= deadline`.
    /// The default spins on [`micros`](Self::micros); embedded
    /// implementations may override this to `wfi` between polls as long as
    /// they still return promptly once the deadline passes.
    fn busy_wait_until(&self, deadline: u32) {
        while elapsed_since(deadline, self.micros()) < 0 {}
    }
}

/// `now - mark`, handling timer wraparound the way a free-running hardware
/// counter does. Returns negative when `now` is still before `mark`.
pub fn elapsed_since(mark: u32, now: u32) -> i32 {
    now.wrapping_sub(mark) as i32
}
