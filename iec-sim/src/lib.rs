//! Hosted test harness for `bus-engine` and `file-device`: a software model
//! of the open-collector wires plus a scripted host driver, so tests can
//! play the part of the C64/drive on the other end of the cable without any
//! hardware.
//!
//! Typical use: spawn the device under test's `task()` loop on one thread
//! (or just call it from a poll loop interleaved with driver calls, since
//! everything here is non-blocking-with-timeout rather than requiring true
//! concurrency), drive a [`HostDriver`] from the test body, and assert on
//! the `Event`s/callbacks observed.

mod bus;
mod clock;
mod host;

pub use bus::{BusLines, DevicePins, HostPins};
pub use clock::SimClock;
pub use host::HostDriver;
