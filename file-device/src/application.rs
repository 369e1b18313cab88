//! The upward-facing contract a concrete device personality implements.
//!
//! Every method here is tagged with the `devnr` it concerns, so one
//! `FileDevice` serving several claimed device numbers can route correctly.
//! None of this is part of the bus engine's hard timing contract — an
//! implementor is free to take as long as it needs (the callbacks this
//! trait backs are exactly the "safe yield points" the cooperative model
//! allows to block indefinitely).

/// Concrete device personality: disk-on-SD, disk-on-floppy, printer bridge,
/// or (for tests and the shipped demo) an in-memory ramdisk.
pub trait Application {
    /// Open `name` on `channel`. Returns whether the open succeeded; on
    /// failure the next status query should explain why via
    /// [`get_status`](Self::get_status).
    fn open(&mut self, devnr: u8, channel: u8, name: &[u8]) -> bool;

    /// Close `channel`.
    fn close(&mut self, devnr: u8, channel: u8);

    /// Read up to `buf.len()` bytes (the file-device layer only ever asks
    /// for one at a time). Returns the number of
    /// bytes produced and whether this is the last data this channel will
    /// ever produce. Zero bytes produced on the very first call after
    /// `open` is reported to the host as an immediate error.
    fn read(&mut self, devnr: u8, channel: u8, buf: &mut [u8]) -> (usize, bool);

    /// Write `buf` to `channel`; `last_chunk` mirrors the wire's EOI on the
    /// last byte of `buf`. Returns the number of bytes consumed.
    fn write(&mut self, devnr: u8, channel: u8, buf: &[u8], last_chunk: bool) -> usize;

    /// Populate `buf` with a status line, conventionally
    /// `"NN,MESSAGE,TT,SS\r"`. Returns the number of bytes written.
    /// Called only when the status buffer is empty.
    fn get_status(&mut self, devnr: u8, buf: &mut [u8]) -> usize;

    /// A command string arrived on channel 15 that wasn't one of the
    /// DolphinDOS burst commands intercepted by the file-device layer
    /// itself.
    fn execute(&mut self, devnr: u8, cmd: &[u8]);

    /// RESET fell; forget all open files/state.
    fn reset(&mut self);

    /// Bus master selected `channel` as listen target (raw role
    /// notification, not itself an OPEN).
    fn listen(&mut self, _devnr: u8, _channel: u8) {}

    /// Bus master selected `channel` as talk target.
    fn talk(&mut self, _devnr: u8, _channel: u8) {}

    /// Bus master sent UNTALK while we were the talker.
    fn untalk(&mut self, _devnr: u8) {}

    /// Bus master sent UNLISTEN while we were the listener.
    fn unlisten(&mut self, _devnr: u8) {}

    /// Read a 256-byte sector for an armed Epyx FastLoad transfer. Boards
    /// that never enable Epyx leave this at the default.
    fn epyx_read_sector(&mut self, _track: u8, _sector: u8, _buf: &mut [u8]) -> bool {
        false
    }

    /// Write a 256-byte sector for an armed Epyx FastLoad transfer.
    fn epyx_write_sector(&mut self, _track: u8, _sector: u8, _buf: &[u8]) -> bool {
        false
    }
}
