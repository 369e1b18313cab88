//! The upward interface the engine calls into as bus events occur.
//!
//! A [`FileDevice`](../file_device/struct.FileDevice.html) is the usual
//! implementor, translating these raw per-channel notifications into framed
//! file operations. Every default is an empty/no-op body, same as the
//! original `IECDevice`'s protected virtuals — a consumer overrides only
//! what it cares about.

/// Raw per-channel bus events, independent of any file/command framing.
pub trait BusClient {
    /// Bus master sent OPEN (secondary `0xF0|ch`) while listening to us.
    fn open(&mut self, _devnr: u8, _channel: u8) {}

    /// Bus master sent CLOSE (secondary `0xE0|ch`).
    fn close(&mut self, _devnr: u8, _channel: u8) {}

    /// Bus master selected `channel` as listen target (secondary `0x60|ch`
    /// or the OPEN secondary above).
    fn listen(&mut self, _devnr: u8, _channel: u8) {}

    /// Bus master selected `channel` as talk target (secondary `0x60|ch`
    /// following a TALK primary).
    fn talk(&mut self, _devnr: u8, _channel: u8) {}

    /// Bus master sent UNTALK; we were the talker.
    fn untalk(&mut self, _devnr: u8) {}

    /// Bus master sent UNLISTEN; we were the listener.
    fn unlisten(&mut self, _devnr: u8) {}

    /// Asked before receiving a byte on `channel`: `<0` means "not ready yet,
    /// ask again" (stalls the bus without producing a byte), `0` means "hard
    /// error" (the byte will still be clocked in, then NAKed on the wire),
    /// `>0` means "ready".
    fn can_write(&mut self, _devnr: u8, _channel: u8) -> i8 {
        0
    }

    /// Asked before transmitting a byte on `channel`, same tri-state
    /// convention as [`can_write`](Self::can_write): `<0` stalls, `0` means
    /// "nothing to send" (signalled as EOI-with-no-data / "file not found"),
    /// `>0` means at least one byte is ready.
    fn can_read(&mut self, _devnr: u8, _channel: u8) -> i8 {
        0
    }

    /// A byte arrived on `channel`. Only called when the preceding
    /// `can_write` call returned `>0`. `eoi` mirrors the talker's EOI signal
    /// on this byte, so a listener never has to ask again afterwards.
    fn write(&mut self, _devnr: u8, _channel: u8, _data: u8, _eoi: bool) {}

    /// Produce the next byte to send on `channel`. Only called when the
    /// preceding `can_read` call returned `>0`.
    fn read(&mut self, _devnr: u8, _channel: u8) -> u8 {
        0
    }

    /// RESET line fell.
    fn reset(&mut self) {}
}
