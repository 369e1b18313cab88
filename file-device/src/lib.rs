//! File-operation framing (OPEN/READ/WRITE/CLOSE/EXECUTE) on top of
//! `bus-engine`'s raw IEC byte stream.
//!
//! A [`FileDevice`] owns a `bus_engine::BusEngine` and drives it with an
//! internal [`BusClient`](bus_engine::BusClient) adapter that turns per-byte
//! notifications into the higher-level calls an [`Application`] implements:
//! OPEN (filename assembly across a run of `write` calls, completed at
//! UNLISTEN), READ/WRITE (with the two-byte look-ahead needed for EOI),
//! CLOSE, EXECUTE (command-channel strings, with DolphinDOS burst commands
//! and Epyx `M-W`/`M-E` signatures intercepted before the application ever
//! sees them), and RESET.
#![cfg_attr(not(test), no_std)]

mod application;
mod command;
mod device;
mod lookahead;
mod status;

pub use application::Application;
pub use device::FileDevice;
