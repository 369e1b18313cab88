//! Peripheral-side Commodore IEC serial bus engine.
//!
//! This crate is the bottom layer of a three-layer stack:
//! it owns the ATN/CLK/DATA (and optional RESET/CTRL) lines, drives the
//! standard handshake as a preemptible state machine, and detects/serves the
//! JiffyDOS, DolphinDOS and Epyx FastLoad fast-protocols. It knows nothing
//! about files, channels-as-streams, or command parsing — that's the
//! `file-device` crate, built on top of the [`BusClient`] trait this crate
//! exposes.
//!
//! No heap allocation, `no_std` by default. Hosted tests (and the `iec-sim`
//! dev-dependency) pull in `std` only under `#[cfg(test)]`.
#![cfg_attr(not(test), no_std)]

pub mod client;
pub mod config;
mod dolphin;
pub mod engine;
pub mod epyx;
pub mod error;
pub mod flags;
mod jiffy;
pub mod gpio;

pub use client::BusClient;
pub use engine::{BusEngine, Event, State};
pub use error::ClaimError;
pub use flags::{FastFlags, Flags};
pub use gpio::{elapsed_since, BusPins, Clock};
